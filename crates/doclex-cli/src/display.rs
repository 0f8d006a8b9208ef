//! Card rendering for an analysis result.
//!
//! Renders a single analysis as a grouped, human-readable card: header with
//! type and confidence, then one section per non-empty category.

use doclex_core::Analysis;

const MAX_LIST_ITEMS: usize = 10;

/// Render an analysis as a text card.
pub fn render_card(analysis: &Analysis) -> String {
    let mut out = String::new();

    out.push_str(&format!(
        "┌─ {} (confianza {:.2}) ─\n",
        analysis.document_type, analysis.confidence
    ));

    section(&mut out, "Partes", &analysis.parties);
    let dates: Vec<String> = analysis
        .dates
        .iter()
        .map(|fact| format!("{}: {}", fact.label, fact.value))
        .collect();
    section(&mut out, "Fechas", &dates);
    let amounts: Vec<String> = analysis
        .amounts
        .iter()
        .map(|amount| {
            let value = amount
                .value
                .map_or("sin cifra".to_string(), |v| format!("{v}"));
            match &amount.currency {
                Some(currency) => format!("{}: {} {}", amount.concept, value, currency),
                None => format!("{}: {}", amount.concept, value),
            }
        })
        .collect();
    section(&mut out, "Importes", &amounts);
    section(&mut out, "Obligaciones", &analysis.obligations);
    section(&mut out, "Derechos", &analysis.rights);
    section(&mut out, "Riesgos", &analysis.risks);
    section(&mut out, "Resumen", &analysis.summary_bullets);
    section(&mut out, "Notas", &analysis.notes);

    out.push_str("└─\n");
    out
}

fn section(out: &mut String, title: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }
    out.push_str(&format!("│ {title}\n"));
    for item in items.iter().take(MAX_LIST_ITEMS) {
        out.push_str(&format!("│   • {item}\n"));
    }
    if items.len() > MAX_LIST_ITEMS {
        out.push_str(&format!("│   … y {} más\n", items.len() - MAX_LIST_ITEMS));
    }
}
