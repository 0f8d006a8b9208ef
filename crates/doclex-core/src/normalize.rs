//! Text normalization for extracted document text.
//!
//! Extractors (native parse and OCR alike) hand over text with control
//! characters, ragged whitespace, and page markers. [`normalize`] cleans it
//! into analyzable text while preserving paragraph breaks, so the chunker can
//! respect structural boundaries. The function is pure and idempotent:
//! `normalize(normalize(x)) == normalize(x)`.

use std::sync::LazyLock;

use regex::Regex;

/// Clean raw extracted text: drop control characters, collapse space/tab
/// runs, cap newline runs at a paragraph break, strip indentation after
/// newlines, trim. Empty input yields an empty string.
pub fn normalize(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut pending_space = false;
    let mut newline_run = 0usize;

    for ch in raw.chars() {
        if ch == '\n' {
            newline_run += 1;
            pending_space = false;
            continue;
        }
        if ch == ' ' || ch == '\t' {
            pending_space = true;
            continue;
        }
        if ch.is_control() {
            continue;
        }
        if newline_run > 0 {
            if !out.is_empty() {
                out.push_str(if newline_run >= 2 { "\n\n" } else { "\n" });
            }
            newline_run = 0;
        } else if pending_space && !out.is_empty() {
            out.push(' ');
        }
        pending_space = false;
        out.push(ch);
    }

    out
}

static PAGE_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"---\s*Página\s+\d+\s*(\(OCR\))?\s*---").expect("page marker pattern is valid")
});

/// Strip `--- Página N ---` / `--- Página N (OCR) ---` markers inserted by
/// the extraction layer between pages.
pub fn remove_page_markers(text: &str) -> String {
    PAGE_MARKER.replace_all(text, "").into_owned()
}

/// Repair the most common OCR artifact in Spanish legal scans: pipe runs
/// standing in for the letter `l` inside a word ("sue|do" → "sueldo").
pub fn clean_ocr_artifacts(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut i = 0;

    while i < chars.len() {
        if chars[i] == '|' {
            let run_end = chars[i..]
                .iter()
                .position(|c| *c != '|')
                .map_or(chars.len(), |n| i + n);
            let prev_alpha = i > 0 && chars[i - 1].is_alphabetic();
            let next_alpha = run_end < chars.len() && chars[run_end].is_alphabetic();
            if prev_alpha && next_alpha {
                out.push('l');
            } else {
                out.extend(&chars[i..run_end]);
            }
            i = run_end;
        } else {
            out.push(chars[i]);
            i += 1;
        }
    }

    out
}

/// First `n` words of a text, with an ellipsis when truncated.
pub fn first_words(text: &str, n: usize) -> String {
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.len() <= n {
        return text.to_string();
    }
    let mut preview = words[..n].join(" ");
    preview.push_str("...");
    preview
}
