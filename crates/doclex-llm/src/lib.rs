//! Local LLM integration: Ollama-style HTTP client, prompt assembly, and
//! strict JSON validation with bounded retry-with-correction.

pub mod client;
pub mod prompt;
pub mod validate;

pub use client::{LlmError, OllamaClient, TextGenerator};
pub use prompt::{PromptError, build_prompt, correction_prompt};
pub use validate::{SchemaError, ValidationFailure, generate_validated, parse_and_validate};
