//! Prompt assembly for document analysis.
//!
//! The prompt is three fixed blocks — rules, schema, procedure — followed by
//! the document text. Only the text segment varies between calls; the blocks
//! are compile-time constants so every chunk of every document is analyzed
//! under identical instructions.

use doclex_core::LlmConfig;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PromptError {
    #[error(
        "token budget too small: {available} tokens left for the document, need at least {minimum}"
    )]
    BudgetExhausted { available: usize, minimum: usize },
}

/// Fundamental analysis rules: truthfulness, output format, language, limits.
const RULES: &str = "\
REGLAS FUNDAMENTALES DE ANÁLISIS:

1. VERACIDAD ABSOLUTA:
   - NO inventes información que no esté en el documento
   - NO infieras datos que no estén respaldados por el texto
   - Si una categoría no aparece en el documento, devuélvela vacía o con null

2. FORMATO DE SALIDA:
   - Devuelve ÚNICAMENTE un JSON válido, sin texto fuera del JSON
   - NO uses markdown (nada de ```json, solo el JSON puro)
   - El JSON debe cumplir EXACTAMENTE el schema especificado

3. IDIOMA:
   - El contenido extraído se devuelve siempre en ESPAÑOL

4. LIMITACIONES:
   - NO ofrezcas asesoramiento legal, financiero ni profesional
   - NO hagas interpretaciones jurídicas subjetivas
   - NO predigas resultados o riesgos futuros no explícitos en el documento";

/// Exact output schema with per-field formatting instructions.
const SCHEMA: &str = r#"TAREA: Analizar el contenido textual de un documento legal/laboral/administrativo
y extraer puntos clave estructurados.

SCHEMA JSON EXACTO (devuelve SOLO este JSON):

{
  "document_type": "string",
  "parties": ["string"],
  "dates": [{"label": "string", "value": "string"}],
  "amounts": [{"concept": "string", "value": number|null, "currency": "string|null"}],
  "obligations": ["string"],
  "rights": ["string"],
  "risks": ["string"],
  "summary_bullets": ["string"],
  "notes": ["string"],
  "confidence": number
}

INSTRUCCIONES POR CAMPO:

1. document_type: "contrato_laboral", "nomina", "convenio", "anexo",
   "poder_notarial", "certificado" o "desconocido" si no es determinable.
2. parties: empresas, personas y entidades involucradas, con identificadores
   (CIF, NIF, DNI) cuando aparezcan.
3. dates: fechas relevantes con etiqueta descriptiva. "value" en formato
   YYYY-MM-DD cuando sea inequívoco; si es ambiguo, mantén el literal del texto.
4. amounts: datos económicos con concepto descriptivo. "currency" solo si la
   moneda está explícita en el texto (EUR, USD, €, $); nunca la infieras.
5. obligations: deberes y compromisos, en frases concisas y completas.
6. rights: facultades y beneficios, en frases concisas y completas.
7. risks: cláusulas sensibles: no competencia, penalizaciones,
   confidencialidad, renuncias, plazos de preaviso.
8. summary_bullets: 5-10 puntos clave, una idea concisa por punto.
9. notes: observaciones sobre calidad del texto o limitaciones; vacío si no hay.
10. confidence: número entre 0.0 y 1.0 según claridad y completitud."#;

/// Ordered extraction procedure the model must follow.
const PROCEDURE: &str = "\
PLAN DE ANÁLISIS (pasos a seguir en orden):

PASO 1: Clasifica el tipo de documento a partir del contenido y el formato.
PASO 2: Extrae las PARTES (razones sociales, nombres completos, identificadores).
PASO 3: Extrae las FECHAS (inicio, fin, vencimiento, plazos) normalizando a
        YYYY-MM-DD solo cuando sea claro.
PASO 4: Extrae los IMPORTES con su concepto y moneda explícita.
PASO 5: Extrae las OBLIGACIONES (\"debe\", \"se compromete\", \"está obligado\").
PASO 6: Extrae los DERECHOS (\"tiene derecho\", \"podrá\", \"se le otorga\").
PASO 7: Identifica los RIESGOS (no competencia, confidencialidad,
        penalizaciones, renuncias, preavisos).
PASO 8: Redacta el RESUMEN en 5-10 puntos: qué es, quiénes, cuándo, cuánto.
PASO 9: Evalúa la CONFIANZA según categorías con datos y legibilidad.
PASO 10: Ensambla el JSON con EXACTAMENTE el schema indicado y devuélvelo
         sin ningún texto adicional.";

/// Tokens reserved for the model's JSON response.
const RESPONSE_RESERVE: usize = 200;

/// Minimum document budget below which the configuration is unusable.
const MIN_DOCUMENT_TOKENS: usize = 500;

/// Rough token estimate: ~4 characters per token for Spanish/English text.
pub fn estimate_tokens(text: &str) -> usize {
    text.chars().count() / 4
}

/// Truncate at a word boundary, appending an ellipsis.
fn truncate_safe(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let cut: String = text.chars().take(max_chars).collect();
    let truncated = match cut.rfind(' ') {
        // Only back off to the space when it loses less than 20% of the cut.
        Some(pos) if pos > max_chars * 4 / 5 => &cut[..pos],
        _ => cut.as_str(),
    };
    format!("{}...", truncated.trim_end())
}

/// Assemble the full prompt for one chunk.
///
/// When the document is split (`chunk_count > 1`) the text is preceded by a
/// fragment marker so the model knows it sees a partial document. The chunk
/// text is defensively truncated to the remaining token budget; with the
/// chunker sized correctly this never triggers, but a misconfigured budget
/// must not produce an oversized request.
pub fn build_prompt(
    chunk_text: &str,
    chunk_index: usize,
    chunk_count: usize,
    config: &LlmConfig,
) -> Result<String, PromptError> {
    let system = format!("{RULES}\n\n{SCHEMA}\n\n{PROCEDURE}");
    let system_tokens = estimate_tokens(&system);

    let available = config
        .max_tokens
        .saturating_sub(system_tokens)
        .saturating_sub(RESPONSE_RESERVE);
    if available < MIN_DOCUMENT_TOKENS {
        return Err(PromptError::BudgetExhausted {
            available,
            minimum: MIN_DOCUMENT_TOKENS,
        });
    }

    let available_chars = available * 4;
    let was_truncated = chunk_text.chars().count() > available_chars;
    let body = if was_truncated {
        truncate_safe(chunk_text, available_chars)
    } else {
        chunk_text.to_string()
    };

    let mut prompt = system;
    prompt.push_str("\n\n============================================================\n");
    prompt.push_str("DOCUMENTO A ANALIZAR:\n");
    prompt.push_str("============================================================\n\n");
    if chunk_count > 1 {
        prompt.push_str(&format!(
            "[FRAGMENTO {} de {} del documento]\n\n",
            chunk_index + 1,
            chunk_count
        ));
    }
    prompt.push_str(&body);
    if was_truncated {
        prompt.push_str(
            "\n\n[NOTA: Documento truncado para ajustarse al contexto del modelo. \
             Analiza ÚNICAMENTE el contenido visible.]",
        );
    }

    Ok(prompt)
}

/// Retry prompt: the corrective instruction plus the schema and the tail of
/// the original prompt (which ends with the document text).
pub fn correction_prompt(original_prompt: &str, failure_reason: &str) -> String {
    let tail: String = {
        let chars: Vec<char> = original_prompt.chars().collect();
        let start = chars.len().saturating_sub(1000);
        chars[start..].iter().collect()
    };
    format!(
        "La respuesta anterior no fue JSON válido o no cumplió con el schema.\n\n\
         ERROR: {failure_reason}\n\n\
         Devuelve ÚNICAMENTE un JSON válido que cumpla EXACTAMENTE el schema, \
         sin ningún texto fuera del JSON.\n\n\
         {SCHEMA}\n\n\
         Final del documento original:\n...{tail}"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_chunk_has_no_fragment_marker() {
        let config = LlmConfig::default();
        let prompt = build_prompt("Contrato breve.", 0, 1, &config).unwrap();
        assert!(!prompt.contains("FRAGMENTO"));
        assert!(prompt.contains("DOCUMENTO A ANALIZAR"));
        assert!(prompt.contains("Contrato breve."));
    }

    #[test]
    fn multi_chunk_carries_fragment_marker() {
        let config = LlmConfig::default();
        let prompt = build_prompt("Parte media del documento.", 1, 3, &config).unwrap();
        assert!(prompt.contains("[FRAGMENTO 2 de 3 del documento]"));
    }

    #[test]
    fn fixed_blocks_precede_the_document() {
        let config = LlmConfig::default();
        let prompt = build_prompt("Texto.", 0, 1, &config).unwrap();
        let rules_pos = prompt.find("REGLAS FUNDAMENTALES").unwrap();
        let schema_pos = prompt.find("SCHEMA JSON EXACTO").unwrap();
        let plan_pos = prompt.find("PLAN DE ANÁLISIS").unwrap();
        let doc_pos = prompt.find("Texto.").unwrap();
        assert!(rules_pos < schema_pos && schema_pos < plan_pos && plan_pos < doc_pos);
    }

    #[test]
    fn oversized_chunk_is_truncated_with_note() {
        let config = LlmConfig::default();
        let huge = "palabra ".repeat(20_000);
        let prompt = build_prompt(&huge, 0, 1, &config).unwrap();
        assert!(prompt.contains("Documento truncado"));
        assert!(estimate_tokens(&prompt) <= config.max_tokens + RESPONSE_RESERVE);
    }

    #[test]
    fn tiny_budget_is_rejected() {
        let mut config = LlmConfig::default();
        config.max_tokens = 1000;
        assert!(matches!(
            build_prompt("Texto.", 0, 1, &config),
            Err(PromptError::BudgetExhausted { .. })
        ));
    }

    #[test]
    fn truncate_safe_respects_word_boundary() {
        let text = "Este es un texto que será truncado con cuidado de no cortar palabras";
        let cut = truncate_safe(text, 30);
        assert!(cut.ends_with("..."));
        assert!(cut.chars().count() <= 34);
        let without_ellipsis = cut.trim_end_matches('.');
        assert!(text.starts_with(without_ellipsis.trim_end()));
    }

    #[test]
    fn correction_prompt_names_the_failure() {
        let original = build_prompt("Contrato entre A y B.", 0, 1, &LlmConfig::default()).unwrap();
        let retry = correction_prompt(&original, "summary_bullets must not be empty");
        assert!(retry.contains("summary_bullets must not be empty"));
        assert!(retry.contains("SCHEMA JSON EXACTO"));
        assert!(retry.contains("Contrato entre A y B."));
    }
}
