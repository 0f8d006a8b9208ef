//! Normalization of extracted facts.
//!
//! Runs between validation and verification: EU/ES date literals become ISO
//! `YYYY-MM-DD` where unambiguous, currency symbols become ISO 4217 codes.
//! Kept separate from the verifier so that verification itself never
//! rewrites list fields.

use chrono::NaiveDate;
use doclex_core::{Amount, Analysis, DateFact};
use regex::Regex;
use std::sync::LazyLock;

static EU_DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d{1,2})[/-](\d{1,2})[/-](\d{2,4})").expect("EU date pattern is valid")
});

static ISO_DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("ISO date pattern is valid"));

/// ISO 4217 codes the normalizer recognizes as already canonical.
const KNOWN_CODES: &[&str] = &["EUR", "USD", "GBP", "JPY", "CHF", "INR"];

const CURRENCY_SYMBOLS: &[(&str, &str)] = &[
    ("€", "EUR"),
    ("$", "USD"),
    ("£", "GBP"),
    ("¥", "JPY"),
    ("₹", "INR"),
];

/// Normalize a `DD/MM/YYYY`-style literal to ISO, if one is present and
/// forms a real calendar date. Two-digit years map 00–50 → 20xx, 51–99 → 19xx.
pub fn normalize_eu_date(value: &str) -> Option<String> {
    // Already ISO: leave untouched (the EU pattern would misread "26-03-01").
    if ISO_DATE.is_match(value.trim()) {
        return None;
    }
    let caps = EU_DATE.captures(value)?;
    let day: u32 = caps[1].parse().ok()?;
    let month: u32 = caps[2].parse().ok()?;
    let year_raw = &caps[3];
    let year: i32 = match year_raw.len() {
        2 => {
            let short: i32 = year_raw.parse().ok()?;
            if short <= 50 { 2000 + short } else { 1900 + short }
        }
        4 => year_raw.parse().ok()?,
        _ => return None,
    };

    let date = NaiveDate::from_ymd_opt(year, month, day)?;
    Some(date.format("%Y-%m-%d").to_string())
}

/// Map a currency symbol or lowercase code to its ISO 4217 code.
/// Unrecognized strings are preserved verbatim; `None` stays `None`.
pub fn normalize_currency(currency: Option<&str>) -> Option<String> {
    let raw = currency?.trim();
    if raw.is_empty() {
        return None;
    }
    let upper = raw.to_uppercase();
    if KNOWN_CODES.contains(&upper.as_str()) {
        return Some(upper);
    }
    for (symbol, code) in CURRENCY_SYMBOLS {
        if raw.contains(symbol) {
            return Some((*code).to_string());
        }
    }
    Some(raw.to_string())
}

/// Apply date and currency normalization, returning a new analysis.
pub fn normalize_facts(analysis: Analysis) -> Analysis {
    let dates = analysis
        .dates
        .into_iter()
        .map(|fact| match normalize_eu_date(&fact.value) {
            Some(iso) => DateFact {
                label: fact.label,
                value: iso,
            },
            None => fact,
        })
        .collect();

    let amounts = analysis
        .amounts
        .into_iter()
        .map(|amount| Amount {
            currency: normalize_currency(amount.currency.as_deref()),
            ..amount
        })
        .collect();

    Analysis {
        dates,
        amounts,
        ..analysis
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_slash_and_dash_dates() {
        assert_eq!(normalize_eu_date("15/03/2026").as_deref(), Some("2026-03-15"));
        assert_eq!(normalize_eu_date("1-6-2026").as_deref(), Some("2026-06-01"));
        assert_eq!(
            normalize_eu_date("firmado el 02/01/2025").as_deref(),
            Some("2025-01-02")
        );
    }

    #[test]
    fn two_digit_years_pivot_at_fifty() {
        assert_eq!(normalize_eu_date("1/6/26").as_deref(), Some("2026-06-01"));
        assert_eq!(normalize_eu_date("1/6/99").as_deref(), Some("1999-06-01"));
    }

    #[test]
    fn rejects_impossible_dates() {
        assert_eq!(normalize_eu_date("32/01/2026"), None);
        assert_eq!(normalize_eu_date("29/02/2025"), None);
        assert_eq!(normalize_eu_date("antes del tercer trimestre"), None);
    }

    #[test]
    fn iso_values_pass_through_untouched() {
        assert_eq!(normalize_eu_date("2026-03-01"), None);
        let fact = DateFact {
            label: "Inicio".into(),
            value: "2026-03-01".into(),
        };
        let normalized = normalize_facts(Analysis {
            dates: vec![fact.clone()],
            ..Analysis::default()
        });
        assert_eq!(normalized.dates[0], fact);
    }

    #[test]
    fn currency_symbols_become_iso_codes() {
        assert_eq!(normalize_currency(Some("€")).as_deref(), Some("EUR"));
        assert_eq!(normalize_currency(Some("$")).as_deref(), Some("USD"));
        assert_eq!(normalize_currency(Some("eur")).as_deref(), Some("EUR"));
        assert_eq!(normalize_currency(Some("30 €")).as_deref(), Some("EUR"));
    }

    #[test]
    fn unknown_currency_is_preserved_never_inferred() {
        assert_eq!(normalize_currency(Some("pesetas")).as_deref(), Some("pesetas"));
        assert_eq!(normalize_currency(None), None);
        assert_eq!(normalize_currency(Some("  ")), None);
    }

    #[test]
    fn normalize_facts_rewrites_only_dates_and_currencies() {
        let analysis = Analysis {
            dates: vec![
                DateFact {
                    label: "Inicio".into(),
                    value: "01/03/2026".into(),
                },
                DateFact {
                    label: "Vencimiento".into(),
                    value: "31 de diciembre".into(),
                },
            ],
            amounts: vec![Amount {
                concept: "Salario".into(),
                value: Some(30000.0),
                currency: Some("€".into()),
            }],
            parties: vec!["ACME Corp".into()],
            ..Analysis::default()
        };

        let normalized = normalize_facts(analysis);
        assert_eq!(normalized.dates[0].value, "2026-03-01");
        assert_eq!(normalized.dates[1].value, "31 de diciembre");
        assert_eq!(normalized.amounts[0].currency.as_deref(), Some("EUR"));
        assert_eq!(normalized.amounts[0].value, Some(30000.0));
        assert_eq!(normalized.parties, vec!["ACME Corp"]);
    }
}
