//! Local extractive summary: picks a few original sentences, no network.

use crate::textprep::{clip, split_sentences};

/// Sentences this short (in characters, after trim) are ignored.
const MIN_SENTENCE_CHARS: usize = 10;
/// Prefix length used when there are too few sentences to rank.
const SHORT_PREFIX_CHARS: usize = 200;
const MAX_PICKED: usize = 3;

#[derive(Debug, Clone)]
struct Scored {
    text: String,
    score: f64,
    index: usize,
}

fn position_score(index: usize, total: usize) -> f64 {
    // First third of the document gets a boost.
    if (index as f64) < (total as f64) / 3.0 {
        1.2
    } else {
        1.0
    }
}

fn length_score(sentence: &str) -> f64 {
    let words = sentence.split_whitespace().count();
    if words > 5 && words < 30 {
        1.1
    } else {
        0.9
    }
}

/// Number of sentences picked for a text with `total` ranked sentences.
pub fn selection_size(total: usize) -> usize {
    MAX_PICKED.min(total.div_ceil(3))
}

/// Deterministic extractive summary of `text`.
pub fn extractive_summary(text: &str) -> String {
    let sentences: Vec<String> = split_sentences(text)
        .into_iter()
        .map(|s| s.body)
        .filter(|s| s.chars().count() > MIN_SENTENCE_CHARS)
        .collect();

    if sentences.len() <= 3 {
        return format!("{}...", clip(text, SHORT_PREFIX_CHARS));
    }

    let total = sentences.len();
    let mut scored: Vec<Scored> = sentences
        .into_iter()
        .enumerate()
        .map(|(index, text)| Scored {
            score: position_score(index, total) * length_score(&text),
            text,
            index,
        })
        .collect();

    // `sort_by` is stable: equal scores keep their original order.
    scored.sort_by(|a, b| b.score.total_cmp(&a.score));
    scored.truncate(selection_size(total));
    scored.sort_by_key(|s| s.index);

    let picked: Vec<String> = scored.into_iter().map(|s| s.text).collect();
    format!("{}.", picked.join(". "))
}
