//! Pipeline orchestration.
//!
//! One `Analyzer` runs one document at a time, strictly sequentially:
//! normalize → chunk (conditional) → per chunk {prompt → model → validate →
//! normalize facts → verify} → consolidate → refine type. Chunk failures are
//! absorbed: a chunk that exhausts its retries contributes nothing, and only
//! the total absence of usable chunks degrades the whole result. The caller
//! always gets back a structurally valid [`Analysis`] or an explicit
//! cancellation — never an unhandled crash from model flakiness.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use doclex_core::normalize::{normalize, remove_page_markers};
use doclex_core::{Analysis, AnalyzerConfig, ChunkResult, DocumentInput};
use doclex_llm::{TextGenerator, build_prompt, generate_validated};
use thiserror::Error;
use tracing::{info, warn};

use crate::{chunker, classify, consolidate::consolidate, facts, verify};

/// Pipeline stages, logged as the run progresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Normalizing,
    Chunking,
    BuildingPrompt,
    CallingModel,
    Validating,
    Verifying,
    Consolidating,
    Done,
    Failed,
    Cancelled,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Normalizing => "normalizing",
            Self::Chunking => "chunking",
            Self::BuildingPrompt => "building_prompt",
            Self::CallingModel => "calling_model",
            Self::Validating => "validating",
            Self::Verifying => "verifying",
            Self::Consolidating => "consolidating",
            Self::Done => "done",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }
}

/// The only error `analyze` surfaces; every processing failure degrades into
/// a valid analysis instead.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("analysis cancelled")]
    Cancelled,
}

/// Cooperative cancellation flag, checked at chunk boundaries. In-flight
/// model calls run to completion or timeout; they are not interrupted.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

const FALLBACK_BULLET_NO_TEXT: &str = "Análisis no disponible: documento sin texto";
const FALLBACK_NOTE_NO_TEXT: &str =
    "Texto no disponible: el documento no contiene texto extraíble";
const FALLBACK_BULLET_VALIDATION: &str = "Análisis no disponible: error de validación";

/// Sequential document-analysis pipeline over a local LLM.
///
/// Holds no shared mutable state: hosts analyzing documents concurrently
/// create one `Analyzer` per document.
pub struct Analyzer<G> {
    config: AnalyzerConfig,
    generator: G,
}

impl<G: TextGenerator> Analyzer<G> {
    /// Build an analyzer. The config should have passed
    /// [`AnalyzerConfig::validate`] before it reaches the pipeline.
    pub fn new(config: AnalyzerConfig, generator: G) -> Self {
        Self { config, generator }
    }

    /// Run the full pipeline on one document.
    pub async fn analyze(
        &self,
        input: &DocumentInput,
        cancel: &CancelToken,
    ) -> Result<Analysis, PipelineError> {
        if input.text.trim().is_empty() {
            warn!("input text is empty, returning degraded analysis");
            return Ok(Analysis::degraded(
                FALLBACK_BULLET_NO_TEXT,
                FALLBACK_NOTE_NO_TEXT,
            ));
        }

        info!(
            stage = Stage::Normalizing.as_str(),
            source = input.source.as_str(),
            pages = input.page_count,
            chars = input.text.chars().count(),
            "starting analysis"
        );
        let cleaned = normalize(&remove_page_markers(&input.text));

        info!(stage = Stage::Chunking.as_str(), "deciding chunking");
        let chunks = chunker::split_words(&cleaned, &self.config.chunking);
        let chunk_count = chunks.len();

        let mut results: Vec<ChunkResult> = Vec::new();
        for (index, chunk) in chunks.iter().enumerate() {
            if cancel.is_cancelled() {
                info!(stage = Stage::Cancelled.as_str(), chunk = index, "analysis cancelled");
                return Err(PipelineError::Cancelled);
            }

            info!(
                stage = Stage::BuildingPrompt.as_str(),
                chunk = index + 1,
                of = chunk_count,
                "processing chunk"
            );
            let prompt = match build_prompt(chunk, index, chunk_count, &self.config.llm) {
                Ok(prompt) => prompt,
                Err(err) => {
                    warn!(chunk = index, error = %err, "prompt build failed, chunk skipped");
                    continue;
                }
            };

            info!(stage = Stage::CallingModel.as_str(), chunk = index + 1, "calling model");
            match generate_validated(&self.generator, &prompt, self.config.llm.max_retries).await
            {
                Ok((analysis, attempts)) => {
                    info!(
                        stage = Stage::Validating.as_str(),
                        chunk = index + 1,
                        attempts,
                        "chunk validated"
                    );
                    let analysis = facts::normalize_facts(analysis);

                    info!(stage = Stage::Verifying.as_str(), chunk = index + 1, "verifying chunk");
                    let analysis = verify::postprocess(&analysis, chunk, &self.config.verify);
                    results.push(ChunkResult { index, analysis });
                }
                Err(err) => {
                    // The chunk is simply missing from consolidation; raw
                    // output stays in the logs for diagnosis.
                    warn!(chunk = index, error = %err, "chunk failed after retries, marked missing");
                }
            }
        }

        if results.is_empty() {
            warn!(
                stage = Stage::Failed.as_str(),
                chunks = chunk_count,
                "no chunk produced a usable analysis"
            );
            return Ok(Analysis::degraded(
                FALLBACK_BULLET_VALIDATION,
                &format!(
                    "Ningún fragmento ({chunk_count}) produjo un análisis válido tras los reintentos"
                ),
            ));
        }

        info!(
            stage = Stage::Consolidating.as_str(),
            usable = results.len(),
            of = chunk_count,
            "consolidating chunk analyses"
        );
        let mut analysis = match consolidate(results, &self.config.verify) {
            Ok(analysis) => analysis,
            Err(err) => {
                warn!(stage = Stage::Failed.as_str(), error = %err, "consolidation failed");
                return Ok(Analysis::degraded(
                    FALLBACK_BULLET_VALIDATION,
                    "La consolidación de fragmentos no fue posible",
                ));
            }
        };

        let (refined, refined_confidence) =
            classify::refine_document_type(&analysis.document_type, &cleaned);
        if refined != analysis.document_type {
            info!(
                from = %analysis.document_type,
                to = %refined,
                confidence = refined_confidence,
                "document type refined by keywords"
            );
            analysis.document_type = refined;
            analysis.confidence = refined_confidence;
        }

        info!(stage = Stage::Done.as_str(), %analysis, "analysis complete");
        Ok(analysis)
    }
}
