//! HTTP client for a local Ollama-style text-completion service.
//!
//! The only network interface the analyzer is permitted to use: a
//! pre-configured loopback endpoint (enforced by
//! [`AnalyzerConfig::validate`](doclex_core::AnalyzerConfig::validate)).
//! Completions go through [`TextGenerator`], the seam that lets tests and
//! hosts substitute a scripted generator for the live service.

use std::time::Duration;

use async_trait::async_trait;
use doclex_core::LlmConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum LlmError {
    #[error("HTTP request failed: {0}")]
    Http(reqwest::Error),
    #[error("model service returned {status}: {body}")]
    Server { status: u16, body: String },
    #[error("model call timed out after {0}s")]
    Timeout(u64),
    #[error("model returned an empty response")]
    EmptyResponse,
}

impl From<reqwest::Error> for LlmError {
    fn from(err: reqwest::Error) -> Self {
        Self::Http(err)
    }
}

/// Anything that can turn a prompt into raw model text.
///
/// Implemented by [`OllamaClient`] for the live service and by scripted
/// mocks in tests.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, LlmError>;
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    format: &'a str,
    options: GenerateOptions,
}

#[derive(Serialize)]
struct GenerateOptions {
    temperature: f64,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
}

#[derive(Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<ModelEntry>,
}

#[derive(Deserialize)]
struct ModelEntry {
    name: String,
}

/// HTTP client for the local Ollama endpoint.
pub struct OllamaClient {
    client: reqwest::Client,
    base_url: String,
    model: String,
    temperature: f64,
    request_timeout_secs: u64,
    health_check_timeout_secs: u64,
}

impl OllamaClient {
    /// Create a client for the configured endpoint.
    ///
    /// `base_url` is taken from the config with any trailing slash removed.
    pub fn new(config: &LlmConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: config.endpoint.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            temperature: config.temperature,
            request_timeout_secs: config.request_timeout_secs,
            health_check_timeout_secs: config.health_check_timeout_secs,
        }
    }

    /// Whether the service answers its version endpoint.
    pub async fn is_healthy(&self) -> bool {
        let url = format!("{}/api/version", self.base_url);
        match self
            .client
            .get(&url)
            .timeout(Duration::from_secs(self.health_check_timeout_secs))
            .send()
            .await
        {
            Ok(resp) => resp.status().is_success(),
            Err(_) => false,
        }
    }

    /// Names of the models installed on the service.
    pub async fn list_models(&self) -> Result<Vec<String>, LlmError> {
        let url = format!("{}/api/tags", self.base_url);
        let resp = self
            .client
            .get(&url)
            .timeout(Duration::from_secs(self.health_check_timeout_secs))
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(LlmError::Server {
                status: status.as_u16(),
                body,
            });
        }
        let tags: TagsResponse = resp.json().await?;
        Ok(tags.models.into_iter().map(|m| m.name).collect())
    }
}

#[async_trait]
impl TextGenerator for OllamaClient {
    async fn generate(&self, prompt: &str) -> Result<String, LlmError> {
        let url = format!("{}/api/generate", self.base_url);
        let request = GenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
            format: "json",
            options: GenerateOptions {
                temperature: self.temperature,
            },
        };

        debug!(
            model = %self.model,
            prompt_chars = prompt.chars().count(),
            "calling model service"
        );

        let resp = self
            .client
            .post(&url)
            .json(&request)
            .timeout(Duration::from_secs(self.request_timeout_secs))
            .send()
            .await
            .map_err(|err| {
                if err.is_timeout() {
                    LlmError::Timeout(self.request_timeout_secs)
                } else {
                    LlmError::Http(err)
                }
            })?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(LlmError::Server {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: GenerateResponse = resp.json().await?;
        if parsed.response.is_empty() {
            return Err(LlmError::EmptyResponse);
        }

        info!(
            response_chars = parsed.response.chars().count(),
            "model generation complete"
        );
        Ok(parsed.response)
    }
}
