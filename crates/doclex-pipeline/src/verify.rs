//! Source-text verification and confidence scoring.
//!
//! Cross-checks extracted dates, amounts, and party names against the chunk
//! they were extracted from. Facts that fail verification are never deleted
//! (formatting drift is common, especially on OCR text); instead the
//! analysis gains an explanatory note and loses a fixed amount of confidence
//! per failing category. A completeness signal caps the score when most
//! categories came back empty. Only `confidence` and `notes` ever change.

use std::sync::LazyLock;

use doclex_core::analysis::MAX_NOTES;
use doclex_core::similarity::fuzzy_contains;
use doclex_core::{Analysis, VerifyConfig};
use regex::Regex;
use tracing::debug;

static NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+(?:[.,]\d+)*").expect("number pattern is valid"));

static ISO_DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("ISO date pattern is valid"));

/// Numeric readings of a token written in European or plain notation.
///
/// "30.000" may mean thirty thousand (Spanish thousands separator) or a
/// decimal; both readings are produced and either may verify a fact.
fn numeric_candidates(token: &str) -> Vec<f64> {
    let mut candidates = Vec::new();

    // Comma as decimal separator, dots as thousands: "30.000,50" → 30000.50
    let european = token.replace('.', "").replace(',', ".");
    if let Ok(value) = european.parse::<f64>() {
        candidates.push(value);
    }

    // Plain reading with comma tolerated as decimal point: "30.5" / "30,5"
    let plain = token.replace(',', ".");
    if plain.matches('.').count() <= 1
        && let Ok(value) = plain.parse::<f64>()
        && !candidates.contains(&value)
    {
        candidates.push(value);
    }

    candidates
}

/// All numeric values present in the source text, under both readings.
fn source_numbers(text: &str) -> Vec<f64> {
    NUMBER
        .find_iter(text)
        .flat_map(|m| numeric_candidates(m.as_str()))
        .collect()
}

fn number_present(numbers: &[f64], value: f64) -> bool {
    numbers.iter().any(|n| (n - value).abs() < 0.01)
}

/// Whether a standalone number (day, year) appears as a token in the text.
fn bare_number_present(text: &str, value: u32) -> bool {
    NUMBER
        .find_iter(text)
        .any(|m| m.as_str().parse::<u32>() == Ok(value))
}

/// Whether a date value is supported by the source text.
///
/// Literal values must appear verbatim (case-insensitive). ISO values were
/// usually normalized from prose ("1 de marzo de 2026"), so they verify when
/// their year and day-of-month both appear as standalone numbers.
fn date_supported(value: &str, source_lower: &str) -> bool {
    let value_trimmed = value.trim();
    if value_trimmed.is_empty() {
        return true;
    }
    if source_lower.contains(&value_trimmed.to_lowercase()) {
        return true;
    }
    if ISO_DATE.is_match(value_trimmed) {
        let mut parts = value_trimmed.split('-');
        let (Some(year), Some(_month), Some(day)) = (parts.next(), parts.next(), parts.next())
        else {
            return false;
        };
        let (Ok(year), Ok(day)) = (year.parse::<u32>(), day.parse::<u32>()) else {
            return false;
        };
        return bare_number_present(source_lower, year) && bare_number_present(source_lower, day);
    }
    false
}

/// Cross-check an analysis against its source text and derive the final
/// confidence. Returns a new analysis; list fields are copied unchanged.
pub fn postprocess(analysis: &Analysis, source_text: &str, config: &VerifyConfig) -> Analysis {
    let source_lower = source_text.to_lowercase();
    let numbers = source_numbers(source_text);

    let mut notes = analysis.notes.clone();
    let mut failing_categories = 0u32;

    let unverified_dates = analysis
        .dates
        .iter()
        .filter(|fact| !date_supported(&fact.value, &source_lower))
        .count();
    if unverified_dates > 0 {
        failing_categories += 1;
        notes.push(format!(
            "{unverified_dates} fecha(s) no localizadas en el texto original (posible deriva de formato)"
        ));
    }

    let unverified_amounts = analysis
        .amounts
        .iter()
        .filter_map(|amount| amount.value)
        .filter(|value| !number_present(&numbers, *value))
        .count();
    if unverified_amounts > 0 {
        failing_categories += 1;
        notes.push(format!(
            "{unverified_amounts} importe(s) no verificados en el texto original (posible inferencia del modelo)"
        ));
    }

    let unverified_parties = analysis
        .parties
        .iter()
        .filter(|party| !fuzzy_contains(&source_lower, party, config.similarity_threshold))
        .count();
    if unverified_parties > 0 {
        failing_categories += 1;
        notes.push(format!(
            "{unverified_parties} parte(s) no localizadas en el texto original"
        ));
    }

    let mut confidence =
        analysis.confidence - f64::from(failing_categories) * config.verification_penalty;
    confidence = confidence.max(0.0);

    // Completeness signal: mostly-empty analyses cannot be highly trusted no
    // matter how well the few facts verify.
    if analysis.filled_categories() < 4 {
        confidence = confidence.min(config.completeness_cap);
        notes.push(format!(
            "Análisis incompleto: solo {}/8 categorías con datos",
            analysis.filled_categories()
        ));
    }

    confidence = confidence.min(analysis.confidence).clamp(0.0, 1.0);

    // Quality observations that do not move the score.
    if source_text.chars().count() < 500 {
        notes.push(format!(
            "Documento muy breve ({} caracteres), información limitada",
            source_text.chars().count()
        ));
    }
    let literal_dates = analysis
        .dates
        .iter()
        .filter(|fact| !ISO_DATE.is_match(fact.value.trim()))
        .count();
    if literal_dates > 0 {
        notes.push(format!(
            "{literal_dates} fecha(s) conservadas en formato literal"
        ));
    }
    if analysis.parties.is_empty() {
        notes.push("No se identificaron partes involucradas".to_string());
    }

    notes.truncate(MAX_NOTES);

    if (confidence - analysis.confidence).abs() > 0.05 {
        debug!(
            from = analysis.confidence,
            to = confidence,
            "confidence adjusted by verification"
        );
    }

    Analysis {
        notes,
        confidence: (confidence * 100.0).round() / 100.0,
        ..analysis.clone()
    }
}
