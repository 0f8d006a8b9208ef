//! Strict validation of model output against the analysis schema.
//!
//! The model response is untrusted external input: the JSON object is sliced
//! out of whatever prose or code fences surround it, parsed, and checked
//! against explicit bound rules — wrong shapes are rejected and retried with
//! a corrective prompt, never silently coerced.
//!
//! The retry loop is a bounded state machine: an attempt counter plus the
//! last failure reason. `max_retries + 1` attempts total, then
//! [`SchemaError`]. Transport failures (unreachable service, timeout)
//! consume the same budget as malformed output — either way the chunk
//! produced no usable result.

use std::borrow::Cow;
use std::fmt;

use doclex_core::Analysis;
use doclex_core::analysis::{
    MAX_AMOUNTS, MAX_BULLETS, MAX_DATES, MAX_NOTES, MAX_OBLIGATIONS, MAX_PARTIES, MAX_RIGHTS,
    MAX_RISKS,
};
use thiserror::Error;
use tracing::{info, warn};

use crate::client::TextGenerator;
use crate::prompt::correction_prompt;

/// Why a single model response was rejected. The reason is fed back to the
/// model in the correction prompt and logged for diagnosis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationFailure {
    pub reason: String,
}

impl ValidationFailure {
    fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl fmt::Display for ValidationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.reason)
    }
}

/// Validation could not succeed within the retry budget.
#[derive(Debug, Error)]
#[error("no valid analysis after {attempts} attempts: {reason}")]
pub struct SchemaError {
    pub attempts: u32,
    pub reason: String,
}

/// Slice the JSON object out of a raw model response.
///
/// The model may wrap the JSON in prose or markdown fences; everything
/// before the first `{` and after the last `}` is dropped rather than
/// treated as fatal.
pub fn extract_json_block(response: &str) -> Option<&str> {
    let first = response.find('{')?;
    let last = response.rfind('}')?;
    if first >= last {
        return None;
    }
    Some(&response[first..=last])
}

/// Parse a raw model response into a validated [`Analysis`].
pub fn parse_and_validate(response: &str) -> Result<Analysis, ValidationFailure> {
    let block = extract_json_block(response).ok_or_else(|| {
        ValidationFailure::new("no JSON object found in the response (expected {...})")
    })?;

    let mut analysis: Analysis = serde_json::from_str(block)
        .map_err(|err| ValidationFailure::new(format!("invalid JSON: {err}")))?;

    // Models occasionally pad lists with empty strings; drop them instead of
    // failing the whole response.
    for list in [
        &mut analysis.parties,
        &mut analysis.obligations,
        &mut analysis.rights,
        &mut analysis.risks,
        &mut analysis.summary_bullets,
        &mut analysis.notes,
    ] {
        list.retain(|item| !item.trim().is_empty());
    }
    analysis.dates.retain(|d| !d.value.trim().is_empty());
    analysis.amounts.retain(|a| !a.concept.trim().is_empty());

    check_bounds(&analysis)?;
    Ok(analysis)
}

fn check_bounds(analysis: &Analysis) -> Result<(), ValidationFailure> {
    if analysis.document_type.trim().is_empty() {
        return Err(ValidationFailure::new("document_type must not be empty"));
    }
    if analysis.summary_bullets.is_empty() {
        return Err(ValidationFailure::new(
            "summary_bullets must contain at least one entry",
        ));
    }
    if !(0.0..=1.0).contains(&analysis.confidence) {
        return Err(ValidationFailure::new(format!(
            "confidence must be within [0.0, 1.0], got {}",
            analysis.confidence
        )));
    }

    let limits = [
        ("parties", analysis.parties.len(), MAX_PARTIES),
        ("dates", analysis.dates.len(), MAX_DATES),
        ("amounts", analysis.amounts.len(), MAX_AMOUNTS),
        ("obligations", analysis.obligations.len(), MAX_OBLIGATIONS),
        ("rights", analysis.rights.len(), MAX_RIGHTS),
        ("risks", analysis.risks.len(), MAX_RISKS),
        ("summary_bullets", analysis.summary_bullets.len(), MAX_BULLETS),
        ("notes", analysis.notes.len(), MAX_NOTES),
    ];
    for (field, len, max) in limits {
        if len > max {
            return Err(ValidationFailure::new(format!(
                "{field} has {len} entries, maximum is {max}"
            )));
        }
    }
    Ok(())
}

/// Call the model and validate its output, retrying with a corrective prompt
/// on failure. Returns the analysis and the number of attempts used.
pub async fn generate_validated<G: TextGenerator + ?Sized>(
    generator: &G,
    original_prompt: &str,
    max_retries: u32,
) -> Result<(Analysis, u32), SchemaError> {
    let total_attempts = max_retries + 1;
    let mut last_reason = String::new();

    for attempt in 1..=total_attempts {
        let prompt: Cow<'_, str> = if attempt == 1 {
            Cow::Borrowed(original_prompt)
        } else {
            Cow::Owned(correction_prompt(original_prompt, &last_reason))
        };

        match generator.generate(&prompt).await {
            Ok(raw) => match parse_and_validate(&raw) {
                Ok(analysis) => {
                    if attempt > 1 {
                        info!(attempt, "valid analysis after correction");
                    }
                    return Ok((analysis, attempt));
                }
                Err(failure) => {
                    warn!(
                        attempt,
                        reason = %failure,
                        raw = %raw.chars().take(200).collect::<String>(),
                        "model output failed validation"
                    );
                    last_reason = failure.reason;
                }
            },
            Err(err) => {
                warn!(attempt, error = %err, "model call failed");
                last_reason = err.to_string();
            }
        }
    }

    Err(SchemaError {
        attempts: total_attempts,
        reason: last_reason,
    })
}
