//! Keyword-based document-type refinement.
//!
//! The model's classification is cross-checked against keyword tables for
//! the common Spanish legal/labor document types. Agreement boosts
//! confidence; a keyword hit overrides an unknown model verdict; on
//! disagreement the higher-confidence side wins.

use doclex_core::analysis::UNKNOWN_TYPE;

// ── Keyword tables per document type ──

const CONTRATO_LABORAL: &[&str] = &[
    "contrato de trabajo",
    "contrato laboral",
    "trabajador",
    "empleador",
    "salario",
    "jornada laboral",
    "vacaciones",
    "despido",
    "periodo de prueba",
    "convenio colectivo",
];

const NOMINA: &[&str] = &[
    "nómina",
    "recibo de salarios",
    "percepciones",
    "deducciones",
    "bases de cotización",
    "irpf",
    "seguridad social",
    "líquido a percibir",
    "base reguladora",
];

const CONVENIO: &[&str] = &[
    "convenio colectivo",
    "representantes de los trabajadores",
    "ámbito de aplicación",
    "clasificación profesional",
    "tabla salarial",
    "jornada anual",
];

const CERTIFICADO: &[&str] = &[
    "certifica que",
    "se expide el presente certificado",
    "en uso de las atribuciones",
    "para que conste",
    "a petición del interesado",
];

const PODER_NOTARIAL: &[&str] = &[
    "poder notarial",
    "otorga poder",
    "ante mí",
    "comparece",
    "representación",
    "mandato",
    "notario",
    "protocolo",
];

const ACTA: &[&str] = &[
    "acta de la reunión",
    "asistentes",
    "orden del día",
    "acuerdos adoptados",
    "se levanta la sesión",
];

const CONTRATO_ARRENDAMIENTO: &[&str] = &[
    "contrato de arrendamiento",
    "arrendador",
    "arrendatario",
    "alquiler",
    "fianza",
    "renta mensual",
    "inmueble",
];

const CONTRATO_COMPRAVENTA: &[&str] = &[
    "contrato de compraventa",
    "vendedor",
    "comprador",
    "precio",
    "transmite la propiedad",
    "bien inmueble",
];

const TYPE_KEYWORDS: &[(&str, &[&str])] = &[
    ("contrato_laboral", CONTRATO_LABORAL),
    ("nomina", NOMINA),
    ("convenio", CONVENIO),
    ("certificado", CERTIFICADO),
    ("poder_notarial", PODER_NOTARIAL),
    ("acta", ACTA),
    ("contrato_arrendamiento", CONTRATO_ARRENDAMIENTO),
    ("contrato_compraventa", CONTRATO_COMPRAVENTA),
];

/// Baseline trust in a non-unknown model classification.
const LLM_BASELINE_CONFIDENCE: f64 = 0.7;

/// Classify a document by keyword presence.
///
/// Returns the best-matching type and a confidence: hit count normalized by
/// table size, reduced 20% when a competing type scores within 70% of the
/// winner.
pub fn classify_by_keywords(text: &str) -> (String, f64) {
    let lower = text.to_lowercase();

    let mut scores: Vec<(&str, usize, usize)> = TYPE_KEYWORDS
        .iter()
        .map(|(doc_type, keywords)| {
            let hits = keywords.iter().filter(|k| lower.contains(*k)).count();
            (*doc_type, hits, keywords.len())
        })
        .filter(|(_, hits, _)| *hits > 0)
        .collect();

    if scores.is_empty() {
        return (UNKNOWN_TYPE.to_string(), 0.0);
    }

    scores.sort_by(|a, b| b.1.cmp(&a.1));
    let (best_type, best_hits, table_size) = scores[0];
    let mut confidence = (best_hits as f64 / table_size as f64).min(1.0);

    if scores.len() > 1 {
        let runner_up_hits = scores[1].1;
        if runner_up_hits as f64 / best_hits as f64 > 0.7 {
            confidence *= 0.8;
        }
    }

    (best_type.to_string(), confidence)
}

/// Reconcile the model's type with the keyword classification.
pub fn refine_document_type(llm_type: &str, text: &str) -> (String, f64) {
    let (keyword_type, keyword_confidence) = classify_by_keywords(text);

    if llm_type == keyword_type {
        if llm_type == UNKNOWN_TYPE {
            return (UNKNOWN_TYPE.to_string(), 0.0);
        }
        return (llm_type.to_string(), (keyword_confidence + 0.15).min(1.0));
    }

    if llm_type == UNKNOWN_TYPE && keyword_type != UNKNOWN_TYPE {
        return (keyword_type, keyword_confidence);
    }

    let llm_confidence = if llm_type == UNKNOWN_TYPE {
        0.0
    } else {
        LLM_BASELINE_CONFIDENCE
    };

    if keyword_confidence > llm_confidence {
        (keyword_type, keyword_confidence)
    } else {
        (llm_type.to_string(), llm_confidence)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_labor_contract() {
        let text = "Este contrato de trabajo establece las condiciones entre empleador y \
                    trabajador, incluyendo salario y vacaciones.";
        let (doc_type, confidence) = classify_by_keywords(text);
        assert_eq!(doc_type, "contrato_laboral");
        assert!(confidence > 0.0);
    }

    #[test]
    fn detects_payslip() {
        let text = "Nómina del mes de enero. Percepciones: salario base. Deducciones: IRPF y \
                    Seguridad Social. Líquido a percibir.";
        let (doc_type, _) = classify_by_keywords(text);
        assert_eq!(doc_type, "nomina");
    }

    #[test]
    fn detects_notarial_power() {
        let text = "El presente poder notarial otorga mandato ante mí, el notario, según \
                    protocolo. Comparece el poderdante.";
        let (doc_type, _) = classify_by_keywords(text);
        assert_eq!(doc_type, "poder_notarial");
    }

    #[test]
    fn no_keywords_yields_unknown() {
        let (doc_type, confidence) = classify_by_keywords("Texto sin términos jurídicos claros");
        assert_eq!(doc_type, UNKNOWN_TYPE);
        assert_eq!(confidence, 0.0);
    }

    #[test]
    fn close_competitor_reduces_confidence() {
        // "convenio colectivo" hits both the labor-contract and convenio tables.
        let ambiguous = "convenio colectivo con ámbito de aplicación, tabla salarial y \
                         jornada laboral del trabajador";
        let clear = "contrato de trabajo entre empleador y trabajador con salario, vacaciones, \
                     jornada laboral y periodo de prueba";
        let (_, ambiguous_conf) = classify_by_keywords(ambiguous);
        let (_, clear_conf) = classify_by_keywords(clear);
        assert!(ambiguous_conf < clear_conf);
    }

    #[test]
    fn agreement_keeps_type() {
        let text = "contrato de trabajo con salario y vacaciones para el trabajador";
        let (refined, confidence) = refine_document_type("contrato_laboral", text);
        assert_eq!(refined, "contrato_laboral");
        assert!(confidence > 0.0);
    }

    #[test]
    fn keywords_override_unknown_model_verdict() {
        let text = "nómina con percepciones, deducciones, irpf y seguridad social";
        let (refined, confidence) = refine_document_type(UNKNOWN_TYPE, text);
        assert_eq!(refined, "nomina");
        assert!(confidence > 0.0);
    }

    #[test]
    fn weak_keywords_do_not_override_model() {
        let text = "documento que menciona un salario una sola vez";
        let (refined, confidence) = refine_document_type("certificado", text);
        assert_eq!(refined, "certificado");
        assert_eq!(confidence, LLM_BASELINE_CONFIDENCE);
    }

    #[test]
    fn both_unknown_stays_unknown() {
        let (refined, confidence) = refine_document_type(UNKNOWN_TYPE, "texto neutro");
        assert_eq!(refined, UNKNOWN_TYPE);
        assert_eq!(confidence, 0.0);
    }
}
