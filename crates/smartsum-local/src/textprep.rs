//! Minimal, deterministic text normalization helpers shared by the extractor,
//! chunker, summarizer and live page.

/// Collapse every whitespace run to a single space and trim the ends.
pub fn norm_ws(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub fn has_any_text(s: &str) -> bool {
    s.chars().any(|c| !c.is_whitespace())
}

/// Keep at most `max_chars` characters. Returns the prefix and whether it was clipped.
pub fn truncate_chars(s: &str, max_chars: usize) -> (String, bool) {
    if max_chars == 0 {
        return (String::new(), !s.is_empty());
    }
    let mut out = String::new();
    for (n, ch) in s.chars().enumerate() {
        if n >= max_chars {
            return (out, true);
        }
        out.push(ch);
    }
    (out, false)
}

/// Prefix of `s` bounded to `max_chars`, without the clipped flag.
pub fn clip(s: &str, max_chars: usize) -> String {
    truncate_chars(s, max_chars).0
}

/// Sentence-terminal punctuation.
pub fn is_terminal(ch: char) -> bool {
    matches!(ch, '.' | '!' | '?')
}

/// A sentence fragment split on runs of terminal punctuation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sentence {
    /// Fragment text with surrounding whitespace trimmed and no terminator.
    pub body: String,
    /// The punctuation run that closed the fragment (empty for a trailing fragment).
    pub terminator: String,
}

impl Sentence {
    /// Body followed by its terminator, as it reads in the source.
    pub fn text(&self) -> String {
        format!("{}{}", self.body, self.terminator)
    }
}

/// Split on runs of `.`, `!` and `?`, dropping fragments that are empty after trim.
pub fn split_sentences(text: &str) -> Vec<Sentence> {
    let mut out = Vec::new();
    let mut body = String::new();
    let mut term = String::new();

    fn flush(out: &mut Vec<Sentence>, body: &mut String, term: &mut String) {
        let b = body.trim();
        if !b.is_empty() {
            out.push(Sentence {
                body: b.to_string(),
                terminator: std::mem::take(term),
            });
        }
        body.clear();
        term.clear();
    }

    for ch in text.chars() {
        if is_terminal(ch) {
            term.push(ch);
            continue;
        }
        if !term.is_empty() {
            flush(&mut out, &mut body, &mut term);
        }
        body.push(ch);
    }
    flush(&mut out, &mut body, &mut term);
    out
}

/// Lowercased, whitespace-normalized key for case-insensitive matching.
pub fn match_key(s: &str) -> String {
    norm_ws(s).to_lowercase()
}

pub mod stopwords {
    /// Short function words skipped when picking highlight terms (English + Persian).
    pub const HIGHLIGHT: [&str; 19] = [
        "the", "and", "or", "but", "in", "on", "at", "to", "for", "of", "with", "by", "از", "در",
        "به", "با", "که", "این", "آن",
    ];

    pub fn is_stopword(w: &str) -> bool {
        HIGHLIGHT.contains(&w.to_lowercase().as_str())
    }
}
