//! Sentence-preserving chunking for remote summarization.

use crate::textprep::split_sentences;

/// Default chunk bound used by the page summary pipeline.
pub const DEFAULT_MAX_CHUNK_CHARS: usize = 2_000;

/// Split `text` into chunks of at most `max_chars` characters, never cutting a sentence.
///
/// Sentences are accumulated greedily and joined with a single space. A sentence that
/// is longer than `max_chars` on its own becomes a single oversized chunk.
pub fn chunk_text(text: &str, max_chars: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_chars = 0usize;

    for sentence in split_sentences(text) {
        let s = sentence.text();
        let s_chars = s.chars().count();
        if current.is_empty() {
            current = s;
            current_chars = s_chars;
            continue;
        }
        if current_chars + 1 + s_chars <= max_chars {
            current.push(' ');
            current.push_str(&s);
            current_chars += 1 + s_chars;
        } else {
            chunks.push(std::mem::take(&mut current));
            current = s;
            current_chars = s_chars;
        }
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::textprep::Sentence;
    use proptest::prelude::*;

    #[test]
    fn short_text_stays_in_one_chunk() {
        let text = "Cats are mammals. They purr when content. Many people keep cats as pets. Cats sleep most of the day.";
        let chunks = chunk_text(text, DEFAULT_MAX_CHUNK_CHARS);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0], text);
    }

    #[test]
    fn closes_chunk_before_limit_is_exceeded() {
        let chunks = chunk_text("Aaaa. Bbbb. Cccc.", 11);
        assert_eq!(chunks, vec!["Aaaa. Bbbb.", "Cccc."]);
    }

    #[test]
    fn oversized_sentence_is_emitted_whole() {
        let long = "x".repeat(50);
        let text = format!("Short one. {long}. Tail.");
        let chunks = chunk_text(&text, 20);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[1], format!("{long}."));
        assert_eq!(chunks[2], "Tail.");
    }

    #[test]
    fn trailing_fragment_without_terminator_is_kept() {
        let chunks = chunk_text("First! second part without end", 1_000);
        assert_eq!(chunks, vec!["First! second part without end"]);
    }

    #[test]
    fn empty_and_punctuation_only_inputs_yield_no_chunks() {
        assert!(chunk_text("", 100).is_empty());
        assert!(chunk_text("  ?!. ", 100).is_empty());
    }

    proptest! {
        #[test]
        fn chunks_respect_limit_unless_single_sentence(
            text in "[a-zA-Z !.?\n]{0,300}",
            max in 1usize..80,
        ) {
            for c in chunk_text(&text, max) {
                let n = c.chars().count();
                if n > max {
                    prop_assert_eq!(split_sentences(&c).len(), 1, "oversized multi-sentence chunk: {:?}", c);
                }
            }
        }

        #[test]
        fn chunks_preserve_every_sentence_in_order(
            text in "[a-z ,!.?]{0,300}",
            max in 1usize..80,
        ) {
            let original: Vec<Sentence> = split_sentences(&text);
            let rebuilt: Vec<Sentence> = chunk_text(&text, max)
                .iter()
                .flat_map(|c| split_sentences(c))
                .collect();
            prop_assert_eq!(original, rebuilt);
        }
    }
}
