//! In-memory model of the page being read: locating sections and
//! temporarily highlighting text, with marks that revert on their own.

use crate::textprep::{clip, match_key, norm_ws, stopwords};
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

pub const SECTION_MARK_TTL: Duration = Duration::from_secs(3);
pub const HIGHLIGHT_TTL: Duration = Duration::from_secs(10);
pub const MAX_HIGHLIGHTS: usize = 10;
const MIN_HIGHLIGHT_CHARS: usize = 3;
const MAX_EXTRA_TERMS: usize = 3;
const EXTRA_TERM_MIN_CHARS: usize = 4;
/// Leading content used to find a section that has no matching heading.
const CONTENT_PREVIEW_CHARS: usize = 50;

#[derive(Debug, Clone)]
struct TextRun {
    text: String,
    parent_tag: String,
    excluded: bool,
}

#[derive(Debug, Clone)]
struct Heading {
    tag: String,
    text: String,
}

/// Element a section lookup landed on.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ScrollTarget {
    pub tag: String,
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Region {
    run: usize,
    start: usize,
    end: usize,
}

#[derive(Debug, Default)]
struct Marks {
    scroll_target: Option<ScrollTarget>,
    section: Option<ScrollTarget>,
    section_generation: u64,
    highlights: Vec<Region>,
    highlight_generation: u64,
}

#[derive(Debug, Clone, Copy)]
enum MarkKind {
    Section,
    Highlight,
}

pub struct LivePage {
    runs: Vec<TextRun>,
    headings: Vec<Heading>,
    marks: Arc<Mutex<Marks>>,
    section_ttl: Duration,
    highlight_ttl: Duration,
}

fn heading_tag(tag: &str) -> bool {
    matches!(tag, "h1" | "h2" | "h3" | "h4" | "h5" | "h6")
}

/// Byte length of the case-insensitive match of `needle` at the start of `hay`.
fn match_len_ci(hay: &str, needle: &[char]) -> Option<usize> {
    let mut chars = hay.char_indices();
    for n in needle {
        let (_, h) = chars.next()?;
        if !h.to_lowercase().eq(n.to_lowercase()) {
            return None;
        }
    }
    Some(chars.next().map(|(i, _)| i).unwrap_or(hay.len()))
}

fn find_ci(hay: &str, needle: &[char]) -> Vec<(usize, usize)> {
    let mut out = Vec::new();
    if needle.is_empty() {
        return out;
    }
    let mut i = 0usize;
    while i < hay.len() {
        if let Some(len) = match_len_ci(&hay[i..], needle) {
            out.push((i, i + len));
            i += len;
            continue;
        }
        i += hay[i..].chars().next().map(char::len_utf8).unwrap_or(1);
    }
    out
}

/// Title plus up to three significant words from `extra`.
pub fn highlight_terms(text: &str, extra: &str) -> Vec<String> {
    let mut terms = vec![text.to_string()];
    terms.extend(
        extra
            .split_whitespace()
            .filter(|w| w.chars().count() > EXTRA_TERM_MIN_CHARS)
            .filter(|w| !stopwords::is_stopword(w))
            .take(MAX_EXTRA_TERMS)
            .map(str::to_string),
    );
    terms
}

impl LivePage {
    pub fn from_html(html: &str) -> Self {
        Self::with_ttls(html, SECTION_MARK_TTL, HIGHLIGHT_TTL)
    }

    pub fn with_ttls(html: &str, section_ttl: Duration, highlight_ttl: Duration) -> Self {
        let doc = html_scraper::Html::parse_document(html);
        let root = html_scraper::Selector::parse("body")
            .ok()
            .and_then(|sel| doc.select(&sel).next())
            .unwrap_or_else(|| doc.root_element());

        let mut runs = Vec::new();
        let mut headings = Vec::new();
        for node in root.descendants() {
            if let Some(el) = html_scraper::ElementRef::wrap(node) {
                let tag = el.value().name();
                if heading_tag(tag) {
                    headings.push(Heading {
                        tag: tag.to_string(),
                        text: norm_ws(&el.text().collect::<String>()),
                    });
                }
                continue;
            }
            let Some(text) = node.value().as_text() else {
                continue;
            };
            let text: &str = text;
            let parent_tag = node
                .parent()
                .and_then(|p| p.value().as_element().map(|e| e.name().to_string()))
                .unwrap_or_default();
            runs.push(TextRun {
                text: text.to_string(),
                excluded: matches!(parent_tag.as_str(), "script" | "style"),
                parent_tag,
            });
        }

        Self {
            runs,
            headings,
            marks: Arc::new(Mutex::new(Marks::default())),
            section_ttl,
            highlight_ttl,
        }
    }

    fn marks(&self) -> MutexGuard<'_, Marks> {
        self.marks.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Clear `kind` after `ttl` unless a newer mark of that kind replaced it.
    fn schedule_revert(&self, kind: MarkKind, generation: u64, ttl: Duration) {
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            tracing::debug!(?kind, "no runtime; mark stays until replaced");
            return;
        };
        let marks = Arc::clone(&self.marks);
        handle.spawn(async move {
            tokio::time::sleep(ttl).await;
            let mut m = marks.lock().unwrap_or_else(|e| e.into_inner());
            match kind {
                MarkKind::Section if m.section_generation == generation => m.section = None,
                MarkKind::Highlight if m.highlight_generation == generation => {
                    m.highlights.clear()
                }
                _ => {}
            }
        });
    }

    fn find_section(&self, title: &str, content: &str) -> Option<ScrollTarget> {
        let title_lc = match_key(title);
        let by_heading = self.headings.iter().find(|h| {
            let h_lc = h.text.to_lowercase();
            !h_lc.is_empty() && (h_lc.contains(&title_lc) || title_lc.contains(&h_lc))
        });
        if let Some(h) = by_heading {
            return Some(ScrollTarget {
                tag: h.tag.clone(),
                text: h.text.clone(),
            });
        }
        if content.is_empty() {
            return None;
        }
        // Page text keeps its source line breaks; compare on normalized keys.
        let preview = match_key(&clip(content, CONTENT_PREVIEW_CHARS));
        self.runs
            .iter()
            .filter(|r| !r.excluded)
            .find(|r| match_key(&r.text).contains(&preview))
            .map(|r| ScrollTarget {
                tag: r.parent_tag.clone(),
                text: norm_ws(&r.text),
            })
    }

    /// Locate a section by heading text, falling back to its leading content.
    pub fn scroll_to_section(&self, title: &str, content: &str) -> bool {
        let found = self.find_section(title, content);
        let generation = {
            let mut m = self.marks();
            m.section = None;
            m.section_generation += 1;
            let Some(target) = found else {
                tracing::debug!(title, "section not found on page");
                return false;
            };
            m.scroll_target = Some(target.clone());
            m.section = Some(target);
            m.section_generation
        };
        self.schedule_revert(MarkKind::Section, generation, self.section_ttl);
        true
    }

    /// Mark occurrences of `text` and a few words of `extra`. Returns whether anything matched.
    pub fn highlight(&self, text: &str, extra: &str) -> bool {
        if text.chars().count() < MIN_HIGHLIGHT_CHARS {
            return false;
        }
        let terms: Vec<Vec<char>> = highlight_terms(text, extra)
            .iter()
            .map(|t| t.chars().collect())
            .collect();

        let mut regions: Vec<Region> = Vec::new();
        'runs: for (run_idx, run) in self.runs.iter().enumerate() {
            if run.excluded {
                continue;
            }
            let mut in_run: Vec<(usize, usize)> = Vec::new();
            for term in &terms {
                for (start, end) in find_ci(&run.text, term) {
                    if in_run.iter().any(|&(s, e)| start < e && s < end) {
                        continue;
                    }
                    in_run.push((start, end));
                }
            }
            in_run.sort_unstable();
            for (start, end) in in_run {
                if regions.len() >= MAX_HIGHLIGHTS {
                    break 'runs;
                }
                regions.push(Region {
                    run: run_idx,
                    start,
                    end,
                });
            }
        }

        let marked = !regions.is_empty();
        let generation = {
            let mut m = self.marks();
            m.highlights = regions;
            m.highlight_generation += 1;
            m.highlight_generation
        };
        tracing::debug!(text, marked, "highlight applied");
        if marked {
            self.schedule_revert(MarkKind::Highlight, generation, self.highlight_ttl);
        }
        marked
    }

    /// Text of every active highlight, in page order.
    pub fn active_highlights(&self) -> Vec<String> {
        self.marks()
            .highlights
            .iter()
            .map(|r| self.runs[r.run].text[r.start..r.end].to_string())
            .collect()
    }

    pub fn section_mark(&self) -> Option<ScrollTarget> {
        self.marks().section.clone()
    }

    /// Last located section; unlike the mark, this does not expire.
    pub fn scroll_target(&self) -> Option<ScrollTarget> {
        self.marks().scroll_target.clone()
    }

    /// Visible page text with active highlights wrapped in `«…»`.
    pub fn render_marked(&self) -> String {
        let highlights = self.marks().highlights.clone();
        let mut parts = Vec::with_capacity(self.runs.len());
        for (idx, run) in self.runs.iter().enumerate() {
            if run.excluded {
                continue;
            }
            let mut out = String::with_capacity(run.text.len());
            let mut pos = 0usize;
            for r in highlights.iter().filter(|r| r.run == idx) {
                out.push_str(&run.text[pos..r.start]);
                out.push('«');
                out.push_str(&run.text[r.start..r.end]);
                out.push('»');
                pos = r.end;
            }
            out.push_str(&run.text[pos..]);
            parts.push(out);
        }
        norm_ws(&parts.join(" "))
    }
}
