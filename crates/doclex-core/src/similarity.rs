//! Fuzzy string similarity and near-duplicate merging.
//!
//! A single similarity primitive backs every fuzzy comparison in the
//! pipeline: party/obligation/risk deduplication during consolidation and
//! party-presence checks during verification. Strings are folded (lowercase,
//! diacritics removed, whitespace collapsed) before comparison so that
//! "Juan Pérez García" and "juan perez garcia" compare as identical.

use strsim::normalized_levenshtein;

/// Fold a string for comparison: lowercase, strip Spanish diacritics,
/// collapse whitespace runs.
pub fn fold(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut last_was_space = true;
    for ch in s.chars() {
        if ch.is_whitespace() {
            if !last_was_space {
                out.push(' ');
                last_was_space = true;
            }
            continue;
        }
        last_was_space = false;
        for lower in ch.to_lowercase() {
            out.push(match lower {
                'á' | 'à' | 'â' | 'ä' => 'a',
                'é' | 'è' | 'ê' | 'ë' => 'e',
                'í' | 'ì' | 'î' | 'ï' => 'i',
                'ó' | 'ò' | 'ô' | 'ö' => 'o',
                'ú' | 'ù' | 'û' | 'ü' => 'u',
                'ñ' => 'n',
                'ç' => 'c',
                other => other,
            });
        }
    }
    out.truncate(out.trim_end().len());
    out
}

/// Normalized similarity in `[0.0, 1.0]` between two folded strings.
pub fn similarity(a: &str, b: &str) -> f64 {
    normalized_levenshtein(&fold(a), &fold(b))
}

/// Collapse near-identical entries, keeping the first occurrence of each
/// group and preserving first-seen order.
///
/// Two entries merge when their folded similarity reaches `threshold`.
pub fn dedupe_fuzzy(items: &[String], threshold: f64) -> Vec<String> {
    let mut kept: Vec<String> = Vec::new();
    let mut kept_folded: Vec<String> = Vec::new();

    for item in items {
        let folded = fold(item);
        if folded.is_empty() {
            continue;
        }
        let duplicate = kept_folded
            .iter()
            .any(|existing| normalized_levenshtein(existing, &folded) >= threshold);
        if !duplicate {
            kept.push(item.clone());
            kept_folded.push(folded);
        }
    }

    kept
}

/// Whether `needle` appears in `haystack`, allowing fuzzy drift.
///
/// Checks folded substring containment first, then slides a window of the
/// needle's word count over the haystack and accepts the best window at or
/// above `threshold`.
pub fn fuzzy_contains(haystack: &str, needle: &str, threshold: f64) -> bool {
    let folded_needle = fold(needle);
    if folded_needle.is_empty() {
        return false;
    }
    let folded_haystack = fold(haystack);
    if folded_haystack.contains(&folded_needle) {
        return true;
    }

    let needle_words = folded_needle.split(' ').count();
    let haystack_words: Vec<&str> = folded_haystack.split(' ').collect();
    if haystack_words.len() < needle_words {
        return normalized_levenshtein(&folded_haystack, &folded_needle) >= threshold;
    }

    haystack_words
        .windows(needle_words)
        .any(|window| normalized_levenshtein(&window.join(" "), &folded_needle) >= threshold)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fold_strips_diacritics_and_case() {
        assert_eq!(fold("Juan Pérez García"), "juan perez garcia");
        assert_eq!(fold("  PEÑA   Núñez "), "pena nunez");
    }

    #[test]
    fn diacritic_variants_are_identical() {
        assert_eq!(similarity("Juan Pérez García", "Juan Perez Garcia"), 1.0);
    }

    #[test]
    fn unrelated_strings_score_low() {
        assert!(similarity("Salario base", "Cláusula de rescisión") < 0.5);
    }

    #[test]
    fn dedupe_collapses_variants_keeping_first() {
        let items = vec![
            "Pago mensual de 1000 EUR".to_string(),
            "pago mensual de 1000 eur".to_string(),
            "Bonificación anual de 2000 EUR".to_string(),
            "Pago mensual de 1000 EUR.".to_string(),
        ];
        let deduped = dedupe_fuzzy(&items, 0.90);
        assert_eq!(
            deduped,
            vec![
                "Pago mensual de 1000 EUR".to_string(),
                "Bonificación anual de 2000 EUR".to_string(),
            ]
        );
    }

    #[test]
    fn dedupe_skips_blank_entries() {
        let items = vec!["".to_string(), "  ".to_string(), "ACME".to_string()];
        assert_eq!(dedupe_fuzzy(&items, 0.90), vec!["ACME".to_string()]);
    }

    #[test]
    fn dedupe_never_grows() {
        let items = vec!["a".to_string(), "b".to_string(), "a".to_string()];
        assert!(dedupe_fuzzy(&items, 0.90).len() <= items.len());
    }

    #[test]
    fn fuzzy_contains_exact_substring() {
        let text = "Contrato entre Empresa X y Juan Pérez, inicio marzo";
        assert!(fuzzy_contains(text, "Juan Pérez", 0.90));
        assert!(fuzzy_contains(text, "juan perez", 0.90));
    }

    #[test]
    fn fuzzy_contains_tolerates_drift() {
        let text = "firmado por Juan Peres Garcia en Madrid";
        assert!(fuzzy_contains(text, "Juan Pérez García", 0.90));
        assert!(!fuzzy_contains(text, "María López Soto", 0.90));
    }
}
