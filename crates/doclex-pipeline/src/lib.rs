//! Document analysis pipeline: chunking, fact normalization, verification,
//! consolidation, and orchestration over a local LLM.

pub mod analyzer;
pub mod chunker;
pub mod classify;
pub mod consolidate;
pub mod facts;
pub mod verify;

pub use analyzer::{Analyzer, CancelToken, PipelineError, Stage};
pub use consolidate::{ConsolidateError, consolidate};
