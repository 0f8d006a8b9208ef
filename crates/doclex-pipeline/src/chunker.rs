//! Word-bounded chunking for documents that exceed the model's context.
//!
//! A sliding window of `max_words` words advances `max_words - overlap`
//! words per step, so consecutive chunks share exactly `overlap` words at
//! the boundary and the de-overlapped concatenation reconstructs the
//! original word sequence. Documents below `inline_threshold` words are
//! passed through as a single untouched chunk.

use doclex_core::ChunkConfig;
use tracing::info;

/// Split text into overlapping word-bounded chunks.
///
/// Returns exactly one chunk (the whole text, unmodified) when the word
/// count is below the inline-processing threshold; never splits mid-word.
pub fn split_words(text: &str, config: &ChunkConfig) -> Vec<String> {
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.len() < config.inline_threshold {
        return vec![text.to_string()];
    }

    // Validated upstream; clamp anyway so a bad config cannot loop forever.
    let step = config.max_words.saturating_sub(config.overlap).max(1);
    let mut chunks = Vec::new();
    let mut start = 0;

    loop {
        let end = (start + config.max_words).min(words.len());
        chunks.push(words[start..end].join(" "));
        if end == words.len() {
            break;
        }
        start += step;
    }

    info!(
        words = words.len(),
        chunks = chunks.len(),
        max_words = config.max_words,
        overlap = config.overlap,
        "document split into chunks"
    );
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(max_words: usize, overlap: usize, inline_threshold: usize) -> ChunkConfig {
        ChunkConfig {
            max_words,
            overlap,
            inline_threshold,
        }
    }

    fn numbered_words(n: usize) -> String {
        (0..n).map(|i| format!("w{i}")).collect::<Vec<_>>().join(" ")
    }

    #[test]
    fn short_text_is_a_single_untouched_chunk() {
        let text = "Contrato breve\n\ncon dos párrafos.";
        let chunks = split_words(text, &config(2500, 200, 3000));
        assert_eq!(chunks, vec![text.to_string()]);
    }

    #[test]
    fn six_thousand_words_make_three_chunks() {
        let text = numbered_words(6000);
        let chunks = split_words(&text, &config(2500, 200, 3000));
        assert_eq!(chunks.len(), 3);
    }

    #[test]
    fn consecutive_chunks_share_exactly_overlap_words() {
        let text = numbered_words(6000);
        let chunks = split_words(&text, &config(2500, 200, 3000));
        for pair in chunks.windows(2) {
            let left: Vec<&str> = pair[0].split_whitespace().collect();
            let right: Vec<&str> = pair[1].split_whitespace().collect();
            assert_eq!(&left[left.len() - 200..], &right[..200]);
        }
    }

    #[test]
    fn deoverlapped_concatenation_reconstructs_word_sequence() {
        for total in [3000, 4999, 6000, 7100] {
            let text = numbered_words(total);
            let chunks = split_words(&text, &config(2500, 200, 3000));

            let mut rebuilt: Vec<String> = Vec::new();
            for (i, chunk) in chunks.iter().enumerate() {
                let words: Vec<&str> = chunk.split_whitespace().collect();
                let skip = if i == 0 { 0 } else { 200 };
                rebuilt.extend(words[skip..].iter().map(|w| w.to_string()));
            }
            let original: Vec<String> =
                text.split_whitespace().map(|w| w.to_string()).collect();
            assert_eq!(rebuilt, original, "coverage broken for {total} words");
        }
    }

    #[test]
    fn single_chunk_iff_below_threshold() {
        let below = numbered_words(2999);
        assert_eq!(split_words(&below, &config(2500, 200, 3000)).len(), 1);

        let at = numbered_words(3000);
        assert!(split_words(&at, &config(2500, 200, 3000)).len() > 1);
    }

    #[test]
    fn never_splits_mid_word() {
        let text = numbered_words(3000);
        let original_words: std::collections::HashSet<&str> = text.split_whitespace().collect();
        for chunk in split_words(&text, &config(1000, 100, 1500)) {
            for word in chunk.split_whitespace() {
                assert!(original_words.contains(word), "fragment {word:?}");
            }
        }
    }

    #[test]
    fn last_chunk_may_be_shorter() {
        let text = numbered_words(5000);
        let chunks = split_words(&text, &config(2500, 200, 3000));
        let last = chunks.last().unwrap();
        assert!(last.split_whitespace().count() <= 2500);
    }
}
