//! Consolidation of per-chunk analyses into one document-level analysis.
//!
//! Lists are merged in chunk order and fuzzily deduplicated; dates and
//! amounts reconcile conflicts by keeping both readings and flagging them in
//! notes (truthfulness beats tidiness); summary bullets are ranked by
//! information density with earlier chunks winning ties; the document type
//! is a majority vote. The output satisfies every `Analysis` invariant.

use std::collections::HashSet;

use doclex_core::analysis::{
    MAX_AMOUNTS, MAX_BULLETS, MAX_DATES, MAX_NOTES, MAX_OBLIGATIONS, MAX_PARTIES, MAX_RIGHTS,
    MAX_RISKS, UNKNOWN_TYPE,
};
use doclex_core::similarity::{dedupe_fuzzy, fold, similarity};
use doclex_core::{Amount, Analysis, ChunkResult, DateFact, VerifyConfig};
use thiserror::Error;
use tracing::info;

/// Similarity at or above which two list entries are the same fact.
const DEDUPE_THRESHOLD: f64 = 0.90;

#[derive(Debug, Error)]
pub enum ConsolidateError {
    #[error("no chunk analyses to consolidate")]
    Empty,
}

/// Merge chunk analyses into a single analysis.
///
/// The input must be non-empty; a single result passes through unchanged.
/// Chunk order is restored from the indices before merging — it drives
/// tie-breaking for both bullets and the type vote.
pub fn consolidate(
    mut results: Vec<ChunkResult>,
    config: &VerifyConfig,
) -> Result<Analysis, ConsolidateError> {
    if results.is_empty() {
        return Err(ConsolidateError::Empty);
    }
    results.sort_by_key(|r| r.index);
    if results.len() == 1 {
        return Ok(results.remove(0).analysis);
    }

    let analyses: Vec<&Analysis> = results.iter().map(|r| &r.analysis).collect();
    let chunk_count = analyses.len();
    let mut conflict_notes: Vec<String> = Vec::new();

    let parties = merge_string_lists(&analyses, |a| &a.parties, MAX_PARTIES);
    let obligations = merge_string_lists(&analyses, |a| &a.obligations, MAX_OBLIGATIONS);
    let rights = merge_string_lists(&analyses, |a| &a.rights, MAX_RIGHTS);
    let risks = merge_string_lists(&analyses, |a| &a.risks, MAX_RISKS);

    let dates = merge_dates(&analyses, &mut conflict_notes);
    let amounts = merge_amounts(&analyses, &mut conflict_notes);

    let document_type = vote_document_type(&analyses);
    let mut summary_bullets = rank_bullets(&analyses);
    if summary_bullets.is_empty() {
        summary_bullets.push(format!(
            "Documento de tipo «{}» con {} parte(s) identificadas",
            document_type,
            parties.len()
        ));
    }

    let had_conflicts = !conflict_notes.is_empty();
    let mut notes = vec![format!(
        "Análisis consolidado de {chunk_count} fragmentos del documento"
    )];
    let mut seen_notes: HashSet<String> = HashSet::new();
    for note in analyses
        .iter()
        .flat_map(|a| a.notes.iter().cloned())
        .chain(conflict_notes)
    {
        if seen_notes.insert(note.clone()) {
            notes.push(note);
        }
    }
    notes.truncate(MAX_NOTES);

    let mut confidence =
        analyses.iter().map(|a| a.confidence).sum::<f64>() / chunk_count as f64;
    if had_conflicts {
        confidence *= 1.0 - config.conflict_penalty;
    }
    let confidence = ((confidence.clamp(0.0, 1.0)) * 100.0).round() / 100.0;

    info!(
        chunks = chunk_count,
        conflicts = had_conflicts,
        confidence,
        "chunk analyses consolidated"
    );

    Ok(Analysis {
        document_type,
        parties,
        dates,
        amounts,
        obligations,
        rights,
        risks,
        summary_bullets,
        notes,
        confidence,
    })
}

fn merge_string_lists<'a>(
    analyses: &[&'a Analysis],
    field: impl Fn(&'a Analysis) -> &'a Vec<String>,
    max: usize,
) -> Vec<String> {
    let concatenated: Vec<String> = analyses
        .iter()
        .copied()
        .flat_map(|a| field(a).iter().cloned())
        .collect();
    let mut deduped = dedupe_fuzzy(&concatenated, DEDUPE_THRESHOLD);
    deduped.truncate(max);
    deduped
}

fn merge_dates(analyses: &[&Analysis], conflict_notes: &mut Vec<String>) -> Vec<DateFact> {
    let mut kept: Vec<DateFact> = Vec::new();
    let mut seen: HashSet<(String, String)> = HashSet::new();

    for fact in analyses.iter().flat_map(|a| a.dates.iter()) {
        let key = (fold(&fact.label), fold(&fact.value));
        if !seen.insert(key.clone()) {
            continue;
        }
        if let Some(existing) = kept
            .iter()
            .find(|f| fold(&f.label) == key.0 && fold(&f.value) != key.1)
        {
            conflict_notes.push(format!(
                "Fechas en conflicto para «{}»: {} / {}",
                fact.label, existing.value, fact.value
            ));
        }
        kept.push(fact.clone());
    }

    kept.truncate(MAX_DATES);
    kept
}

fn merge_amounts(analyses: &[&Analysis], conflict_notes: &mut Vec<String>) -> Vec<Amount> {
    // Group by fuzzy concept, preserving first-seen group order.
    let mut groups: Vec<(String, Vec<&Amount>)> = Vec::new();
    for amount in analyses.iter().flat_map(|a| a.amounts.iter()) {
        let folded = fold(&amount.concept);
        match groups
            .iter_mut()
            .find(|(concept, _)| similarity(concept, &folded) >= DEDUPE_THRESHOLD)
        {
            Some((_, members)) => members.push(amount),
            None => groups.push((folded, vec![amount])),
        }
    }

    let mut merged: Vec<Amount> = Vec::new();
    for (_, members) in groups {
        let distinct_values = {
            let mut sorted: Vec<f64> = members.iter().filter_map(|a| a.value).collect();
            sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
            sorted.dedup_by(|a, b| (*a - *b).abs() < 0.01);
            sorted.len()
        };

        if distinct_values <= 1 {
            merged.push(members[0].clone());
        } else {
            // Conflicting readings: keep every distinct one, flag it.
            let mut seen_values: Vec<Option<f64>> = Vec::new();
            for member in &members {
                let duplicate = seen_values.iter().any(|v| match (v, member.value) {
                    (Some(a), Some(b)) => (a - b).abs() < 0.01,
                    (None, None) => true,
                    _ => false,
                });
                if !duplicate {
                    seen_values.push(member.value);
                    merged.push((*member).clone());
                }
            }
            let readings: Vec<String> = seen_values
                .iter()
                .map(|v| v.map_or("sin cifra".to_string(), |n| format!("{n}")))
                .collect();
            conflict_notes.push(format!(
                "Importes en conflicto para «{}»: {}",
                members[0].concept,
                readings.join(" / ")
            ));
        }
    }

    merged.truncate(MAX_AMOUNTS);
    merged
}

/// Majority vote over chunk document types, ignoring unknowns. Ties go to
/// the type that appeared in the earliest chunk.
fn vote_document_type(analyses: &[&Analysis]) -> String {
    let mut tally: Vec<(String, usize, usize)> = Vec::new(); // (type, count, first_chunk)
    for (chunk_idx, analysis) in analyses.iter().enumerate() {
        let folded = fold(&analysis.document_type);
        if folded.is_empty() || folded == UNKNOWN_TYPE {
            continue;
        }
        match tally.iter_mut().find(|(t, _, _)| *t == folded) {
            Some((_, count, _)) => *count += 1,
            None => tally.push((folded, 1, chunk_idx)),
        }
    }

    tally
        .into_iter()
        .max_by(|a, b| a.1.cmp(&b.1).then(b.2.cmp(&a.2)))
        .map(|(doc_type, _, _)| doc_type)
        .unwrap_or_else(|| UNKNOWN_TYPE.to_string())
}

/// Information-density score for a summary bullet. Digits and named
/// entities (capitalized non-initial words) carry the signal; length
/// saturates so verbosity alone does not win. The exact formula is a
/// tunable, not a contract.
fn bullet_score(bullet: &str) -> f64 {
    let digits = bullet.chars().filter(char::is_ascii_digit).count();
    let entities = bullet
        .split_whitespace()
        .skip(1)
        .filter(|word| word.chars().next().is_some_and(char::is_uppercase))
        .count();
    let length_saturation = bullet.chars().count().min(120) as f64 / 120.0;
    digits as f64 * 1.5 + entities as f64 + length_saturation * 2.0
}

/// Rank all chunks' bullets by density, earlier chunks first on ties.
fn rank_bullets(analyses: &[&Analysis]) -> Vec<String> {
    let concatenated: Vec<String> = analyses
        .iter()
        .flat_map(|a| a.summary_bullets.iter().cloned())
        .collect();
    let deduped = dedupe_fuzzy(&concatenated, DEDUPE_THRESHOLD);

    let mut scored: Vec<(String, f64)> = deduped
        .into_iter()
        .map(|bullet| {
            let score = bullet_score(&bullet);
            (bullet, score)
        })
        .collect();
    // Stable sort: equal scores keep concatenation (chunk) order.
    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    scored.truncate(MAX_BULLETS);
    scored.into_iter().map(|(bullet, _)| bullet).collect()
}
