//! Pipeline configuration.
//!
//! Configuration is an explicit struct threaded through the pipeline, never a
//! module-level singleton: hosts construct (or deserialize) an
//! [`AnalyzerConfig`], validate it once, and hand it to each pipeline
//! instance. All fields have serde defaults so partial configs deserialize.

use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    /// The analyzer only ever talks to a local model service. Anything that
    /// is not a loopback endpoint is rejected outright.
    #[error("endpoint '{0}' is not a loopback address; only a local LLM service is permitted")]
    NonLocalEndpoint(String),

    #[error("chunk overlap ({overlap}) must be smaller than chunk size ({max_words})")]
    OverlapTooLarge { overlap: usize, max_words: usize },

    #[error("{name} must be within [0.0, 1.0], got {value}")]
    OutOfRange { name: &'static str, value: f64 },
}

/// Local LLM service settings (Ollama-style API).
#[derive(Debug, Clone, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    /// Total context budget in tokens for one prompt.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_health_timeout")]
    pub health_check_timeout_secs: u64,
    /// Retries after the first attempt; 2 means 3 attempts total.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

fn default_endpoint() -> String {
    "http://localhost:11434".to_string()
}

fn default_model() -> String {
    "llama3.2:3b".to_string()
}

fn default_temperature() -> f64 {
    0.2
}

fn default_max_tokens() -> usize {
    4000
}

fn default_request_timeout() -> u64 {
    120
}

fn default_health_timeout() -> u64 {
    5
}

fn default_max_retries() -> u32 {
    2
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            model: default_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            request_timeout_secs: default_request_timeout(),
            health_check_timeout_secs: default_health_timeout(),
            max_retries: default_max_retries(),
        }
    }
}

/// Word-based chunking settings for long documents.
#[derive(Debug, Clone, Deserialize)]
pub struct ChunkConfig {
    #[serde(default = "default_max_words")]
    pub max_words: usize,
    #[serde(default = "default_overlap")]
    pub overlap: usize,
    /// Below this word count the whole document is processed as one chunk.
    #[serde(default = "default_inline_threshold")]
    pub inline_threshold: usize,
}

fn default_max_words() -> usize {
    2500
}

fn default_overlap() -> usize {
    200
}

fn default_inline_threshold() -> usize {
    3000
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            max_words: default_max_words(),
            overlap: default_overlap(),
            inline_threshold: default_inline_threshold(),
        }
    }
}

/// Verification and confidence-scoring settings.
#[derive(Debug, Clone, Deserialize)]
pub struct VerifyConfig {
    /// Minimum normalized similarity for a party name to count as present.
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f64,
    /// Confidence subtracted per category with verification failures.
    #[serde(default = "default_verification_penalty")]
    pub verification_penalty: f64,
    /// Confidence ceiling when more than half of the categories are empty.
    #[serde(default = "default_completeness_cap")]
    pub completeness_cap: f64,
    /// Relative confidence reduction when consolidation detects conflicts.
    #[serde(default = "default_conflict_penalty")]
    pub conflict_penalty: f64,
}

fn default_similarity_threshold() -> f64 {
    0.90
}

fn default_verification_penalty() -> f64 {
    0.2
}

fn default_completeness_cap() -> f64 {
    0.5
}

fn default_conflict_penalty() -> f64 {
    0.10
}

impl Default for VerifyConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: default_similarity_threshold(),
            verification_penalty: default_verification_penalty(),
            completeness_cap: default_completeness_cap(),
            conflict_penalty: default_conflict_penalty(),
        }
    }
}

/// Complete analyzer configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AnalyzerConfig {
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub chunking: ChunkConfig,
    #[serde(default)]
    pub verify: VerifyConfig,
}

impl AnalyzerConfig {
    /// Check cross-field invariants and the loopback-only privacy rule.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !is_loopback_endpoint(&self.llm.endpoint) {
            return Err(ConfigError::NonLocalEndpoint(self.llm.endpoint.clone()));
        }
        if self.chunking.overlap >= self.chunking.max_words {
            return Err(ConfigError::OverlapTooLarge {
                overlap: self.chunking.overlap,
                max_words: self.chunking.max_words,
            });
        }
        for (name, value) in [
            ("temperature", self.llm.temperature),
            ("similarity_threshold", self.verify.similarity_threshold),
            ("verification_penalty", self.verify.verification_penalty),
            ("completeness_cap", self.verify.completeness_cap),
            ("conflict_penalty", self.verify.conflict_penalty),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::OutOfRange { name, value });
            }
        }
        Ok(())
    }
}

/// Whether a URL points at a loopback host.
fn is_loopback_endpoint(endpoint: &str) -> bool {
    let Some(rest) = endpoint
        .strip_prefix("http://")
        .or_else(|| endpoint.strip_prefix("https://"))
    else {
        return false;
    };
    let authority = rest.split(['/', '?']).next().unwrap_or("");
    let host = if let Some(bracketed) = authority.strip_prefix('[') {
        match bracketed.split_once(']') {
            Some((host, _)) => host,
            None => return false,
        }
    } else {
        authority.split(':').next().unwrap_or("")
    };
    matches!(host, "localhost" | "127.0.0.1" | "::1")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = AnalyzerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.llm.endpoint, "http://localhost:11434");
        assert_eq!(config.llm.model, "llama3.2:3b");
        assert_eq!(config.chunking.max_words, 2500);
        assert_eq!(config.chunking.overlap, 200);
        assert_eq!(config.verify.similarity_threshold, 0.90);
    }

    #[test]
    fn partial_json_fills_defaults() {
        let config: AnalyzerConfig =
            serde_json::from_str(r#"{"llm": {"model": "mistral:7b"}}"#).unwrap();
        assert_eq!(config.llm.model, "mistral:7b");
        assert_eq!(config.llm.temperature, 0.2);
        assert_eq!(config.chunking.inline_threshold, 3000);
    }

    #[test]
    fn rejects_non_local_endpoint() {
        let mut config = AnalyzerConfig::default();
        config.llm.endpoint = "https://api.example.com".into();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::NonLocalEndpoint(_))
        ));
    }

    #[test]
    fn accepts_loopback_variants() {
        for endpoint in [
            "http://localhost:11434",
            "http://127.0.0.1:11434",
            "http://[::1]:11434",
            "http://localhost",
        ] {
            let mut config = AnalyzerConfig::default();
            config.llm.endpoint = endpoint.into();
            assert!(config.validate().is_ok(), "rejected {endpoint}");
        }
    }

    #[test]
    fn rejects_overlap_at_or_above_chunk_size() {
        let mut config = AnalyzerConfig::default();
        config.chunking.max_words = 200;
        config.chunking.overlap = 200;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::OverlapTooLarge { .. })
        ));
    }

    #[test]
    fn rejects_out_of_range_threshold() {
        let mut config = AnalyzerConfig::default();
        config.verify.similarity_threshold = 1.2;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::OutOfRange { .. })
        ));
    }
}
