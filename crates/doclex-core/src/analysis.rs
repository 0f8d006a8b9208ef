//! Structured analysis types for legal/labor/administrative documents.
//!
//! An [`Analysis`] is the single unit of pipeline output: eight extraction
//! categories plus notes and a heuristic confidence score. Extracted content
//! is Spanish (the target document language); the wire schema keys are the
//! field names below.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Upper bounds per list field. The validator rejects model output that
/// exceeds them; the consolidator clips merged lists back down to them.
pub const MAX_PARTIES: usize = 20;
pub const MAX_DATES: usize = 30;
pub const MAX_AMOUNTS: usize = 30;
pub const MAX_OBLIGATIONS: usize = 50;
pub const MAX_RIGHTS: usize = 50;
pub const MAX_RISKS: usize = 30;
pub const MAX_BULLETS: usize = 10;
pub const MAX_NOTES: usize = 10;

/// Document type used when classification is not possible.
pub const UNKNOWN_TYPE: &str = "desconocido";

/// A dated fact with a descriptive label.
///
/// `value` is ISO `YYYY-MM-DD` when the source is unambiguous, otherwise the
/// literal phrase from the text (e.g. "antes del tercer trimestre").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateFact {
    pub label: String,
    pub value: String,
}

/// A monetary fact with context.
///
/// `value` is `None` when the quantity is not parseable as a number;
/// `currency` is `None` unless the text states it explicitly — it is never
/// inferred.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Amount {
    pub concept: String,
    pub value: Option<f64>,
    pub currency: Option<String>,
}

/// Complete structured analysis of one document.
///
/// Every list field is always present (empty, never null); `summary_bullets`
/// must hold at least one entry — the pipeline synthesizes a fallback bullet
/// rather than violate that invariant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Analysis {
    #[serde(default = "default_document_type")]
    pub document_type: String,
    #[serde(default)]
    pub parties: Vec<String>,
    #[serde(default)]
    pub dates: Vec<DateFact>,
    #[serde(default)]
    pub amounts: Vec<Amount>,
    #[serde(default)]
    pub obligations: Vec<String>,
    #[serde(default)]
    pub rights: Vec<String>,
    #[serde(default)]
    pub risks: Vec<String>,
    #[serde(default)]
    pub summary_bullets: Vec<String>,
    #[serde(default)]
    pub notes: Vec<String>,
    #[serde(default = "default_confidence")]
    pub confidence: f64,
}

fn default_document_type() -> String {
    UNKNOWN_TYPE.to_string()
}

fn default_confidence() -> f64 {
    0.5
}

impl Default for Analysis {
    fn default() -> Self {
        Self {
            document_type: default_document_type(),
            parties: Vec::new(),
            dates: Vec::new(),
            amounts: Vec::new(),
            obligations: Vec::new(),
            rights: Vec::new(),
            risks: Vec::new(),
            summary_bullets: Vec::new(),
            notes: Vec::new(),
            confidence: default_confidence(),
        }
    }
}

impl Analysis {
    /// A structurally valid but information-poor analysis, used when the
    /// pipeline cannot produce a trustworthy result. Always carries exactly
    /// one fallback bullet and one explanatory note, with zero confidence.
    pub fn degraded(bullet: &str, note: &str) -> Self {
        Self {
            document_type: UNKNOWN_TYPE.to_string(),
            summary_bullets: vec![bullet.to_string()],
            notes: vec![note.to_string()],
            confidence: 0.0,
            ..Self::default()
        }
    }

    /// Count of the 8 categories holding data. `document_type` counts when
    /// it is anything other than [`UNKNOWN_TYPE`].
    pub fn filled_categories(&self) -> usize {
        [
            !self.parties.is_empty(),
            !self.dates.is_empty(),
            !self.amounts.is_empty(),
            !self.obligations.is_empty(),
            !self.rights.is_empty(),
            !self.risks.is_empty(),
            !self.summary_bullets.is_empty(),
            self.document_type != UNKNOWN_TYPE,
        ]
        .iter()
        .filter(|b| **b)
        .count()
    }

    /// Whether at least half of the categories hold data.
    pub fn is_complete(&self) -> bool {
        self.filled_categories() >= 4
    }
}

impl fmt::Display for Analysis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Analysis(type={}, parties={}, dates={}, amounts={}, obligations={}, \
             rights={}, risks={}, bullets={}, confidence={:.2})",
            self.document_type,
            self.parties.len(),
            self.dates.len(),
            self.amounts.len(),
            self.obligations.len(),
            self.rights.len(),
            self.risks.len(),
            self.summary_bullets.len(),
            self.confidence,
        )
    }
}

/// Per-chunk analysis paired with its source chunk index. Transient: exists
/// only between per-chunk processing and consolidation.
#[derive(Debug, Clone)]
pub struct ChunkResult {
    pub index: usize,
    pub analysis: Analysis,
}

/// How the upstream extraction layer obtained the text.
///
/// The pipeline treats OCR-derived text identically to native text; the kind
/// is carried through for logging and host-side display only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    NativePdf,
    Ocr,
    Docx,
    Image,
    PlainText,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NativePdf => "pdf_nativo",
            Self::Ocr => "ocr",
            Self::Docx => "docx",
            Self::Image => "imagen",
            Self::PlainText => "texto_plano",
        }
    }
}

/// Input contract from the extraction layer: plain text plus metadata.
#[derive(Debug, Clone)]
pub struct DocumentInput {
    pub text: String,
    pub page_count: Option<u32>,
    pub source: SourceKind,
}

impl DocumentInput {
    pub fn new(text: impl Into<String>, page_count: Option<u32>, source: SourceKind) -> Self {
        Self {
            text: text.into(),
            page_count,
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn analysis_json_roundtrip() {
        let analysis = Analysis {
            document_type: "contrato_laboral".into(),
            parties: vec!["ACME Corp".into(), "Juan Pérez".into()],
            dates: vec![DateFact {
                label: "Inicio".into(),
                value: "2026-03-01".into(),
            }],
            amounts: vec![Amount {
                concept: "Salario bruto anual".into(),
                value: Some(30000.0),
                currency: Some("EUR".into()),
            }],
            obligations: vec!["No competir durante 2 años".into()],
            rights: vec!["30 días de vacaciones".into()],
            risks: vec!["Cláusula de no competencia".into()],
            summary_bullets: vec!["Contrato anual".into()],
            notes: vec![],
            confidence: 0.9,
        };

        let json = serde_json::to_string(&analysis).unwrap();
        let parsed: Analysis = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, analysis);
    }

    #[test]
    fn missing_fields_default_to_empty() {
        let parsed: Analysis =
            serde_json::from_str(r#"{"document_type": "nomina", "confidence": 0.8}"#).unwrap();
        assert_eq!(parsed.document_type, "nomina");
        assert!(parsed.parties.is_empty());
        assert!(parsed.dates.is_empty());
        assert!(parsed.summary_bullets.is_empty());
        assert_eq!(parsed.confidence, 0.8);
    }

    #[test]
    fn empty_object_uses_defaults() {
        let parsed: Analysis = serde_json::from_str("{}").unwrap();
        assert_eq!(parsed.document_type, UNKNOWN_TYPE);
        assert_eq!(parsed.confidence, 0.5);
    }

    #[test]
    fn amount_null_fields_roundtrip() {
        let json = r#"{"concept": "Importe sin cifra", "value": null, "currency": null}"#;
        let amount: Amount = serde_json::from_str(json).unwrap();
        assert!(amount.value.is_none());
        assert!(amount.currency.is_none());
    }

    #[test]
    fn degraded_is_structurally_valid() {
        let analysis = Analysis::degraded(
            "Análisis no disponible: error de validación",
            "El modelo no devolvió JSON válido",
        );
        assert_eq!(analysis.document_type, UNKNOWN_TYPE);
        assert_eq!(analysis.summary_bullets.len(), 1);
        assert_eq!(analysis.notes.len(), 1);
        assert_eq!(analysis.confidence, 0.0);
        assert!(analysis.parties.is_empty());
    }

    #[test]
    fn filled_categories_counts_unknown_type_as_empty() {
        let analysis = Analysis::default();
        assert_eq!(analysis.filled_categories(), 0);
        assert!(!analysis.is_complete());

        let mut full = analysis.clone();
        full.document_type = "contrato".into();
        full.parties.push("ACME".into());
        full.dates.push(DateFact {
            label: "Inicio".into(),
            value: "2026-01-01".into(),
        });
        full.summary_bullets.push("Resumen".into());
        assert_eq!(full.filled_categories(), 4);
        assert!(full.is_complete());
    }

    #[test]
    fn display_summarizes_counts() {
        let analysis = Analysis::degraded("n/d", "sin texto");
        let text = analysis.to_string();
        assert!(text.contains("type=desconocido"));
        assert!(text.contains("bullets=1"));
    }
}
