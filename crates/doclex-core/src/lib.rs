pub mod analysis;
pub mod config;
pub mod normalize;
pub mod similarity;

pub use analysis::{Amount, Analysis, ChunkResult, DateFact, DocumentInput, SourceKind};
pub use config::{AnalyzerConfig, ChunkConfig, ConfigError, LlmConfig, VerifyConfig};
