//! Terminal-facing presentation of summaries and the section tree.

use serde::Serialize;
use smartsum_core::{PageStats, Section};

/// Cycled over the lines of a flat summary.
pub const SUMMARY_EMOJIS: [&str; 8] = ["📌", "🔍", "💡", "⭐", "🎯", "📊", "🔑", "💭"];
pub const EMPTY_TREE_MESSAGE: &str = "📭 No structured content found";
/// Content longer than this also shows its full text when expanded.
pub const FULL_TEXT_MIN_CHARS: usize = 200;
/// Prefix of section content passed along with a highlight request.
const HIGHLIGHT_EXTRA_CHARS: usize = 100;

pub fn format_summary(summary: &str, title: &str) -> String {
    let mut out = format!("🌟 Summary: {title}\n\n");
    for (i, line) in summary
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .enumerate()
    {
        let emoji = SUMMARY_EMOJIS[i % SUMMARY_EMOJIS.len()];
        out.push_str(&format!("{emoji} {line}\n\n"));
    }
    out
}

pub fn level_icon(level: u8) -> &'static str {
    match level {
        1 => "📚",
        2 => "📖",
        3 => "📝",
        4 => "📄",
        5 => "📋",
        6 => "📌",
        _ => "📎",
    }
}

/// Style class for a heading level; 4 and deeper share one.
pub fn level_tone(level: u8) -> &'static str {
    match level {
        1 => "level-1",
        2 => "level-2",
        3 => "level-3",
        _ => "level-4",
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TreeNode {
    pub section: Section,
    pub summary: String,
    pub icon: &'static str,
    pub tone: &'static str,
    pub expanded: bool,
}

impl TreeNode {
    pub fn new(section: Section, summary: String) -> Self {
        Self {
            icon: level_icon(section.level),
            tone: level_tone(section.level),
            section,
            summary,
            expanded: false,
        }
    }

    pub fn header_line(&self) -> String {
        let arrow = if self.expanded { "▼" } else { "▶" };
        format!(
            "{arrow} {} {}  [H{}]",
            self.icon, self.section.title, self.section.level
        )
    }

    fn shows_full_text(&self) -> bool {
        self.section.content.chars().count() > FULL_TEXT_MIN_CHARS
    }
}

/// What the live page needs to scroll to a section.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct LocateRequest {
    pub title: String,
    pub content: String,
}

/// What the live page needs to highlight a section.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct HighlightRequest {
    pub text: String,
    pub extra: String,
}

/// Section tree for one run. Built fresh each time; see [`Presenter::replace`].
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TreeView {
    pub title: String,
    pub url: String,
    nodes: Vec<TreeNode>,
    stats: PageStats,
}

impl TreeView {
    pub fn new(title: String, url: String, nodes: Vec<TreeNode>, stats: PageStats) -> Self {
        Self {
            title,
            url,
            nodes,
            stats,
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn nodes(&self) -> &[TreeNode] {
        &self.nodes
    }

    pub fn get(&self, index: usize) -> Option<&TreeNode> {
        self.nodes.get(index)
    }

    /// Flip a node's expansion; returns the new state, or `None` for a bad index.
    pub fn toggle(&mut self, index: usize) -> Option<bool> {
        let node = self.nodes.get_mut(index)?;
        node.expanded = !node.expanded;
        Some(node.expanded)
    }

    pub fn locate_request(&self, index: usize) -> Option<LocateRequest> {
        self.get(index).map(|n| LocateRequest {
            title: n.section.title.clone(),
            content: n.section.content.clone(),
        })
    }

    pub fn highlight_request(&self, index: usize) -> Option<HighlightRequest> {
        self.get(index).map(|n| HighlightRequest {
            text: n.section.title.clone(),
            extra: n
                .section
                .content
                .chars()
                .take(HIGHLIGHT_EXTRA_CHARS)
                .collect(),
        })
    }

    pub fn stats(&self) -> PageStats {
        self.stats
    }

    pub fn render_text(&self) -> String {
        if self.nodes.is_empty() {
            return EMPTY_TREE_MESSAGE.to_string();
        }
        let mut out = String::from("🌳 Page Content Structure:\n");
        for (i, node) in self.nodes.iter().enumerate() {
            let indent = "  ".repeat(usize::from(node.section.level.saturating_sub(1)));
            out.push_str(&format!("{indent}{i:>2}. {}\n", node.header_line()));
            if !node.expanded {
                continue;
            }
            out.push_str(&format!("{indent}      💡 Summary: {}\n", node.summary));
            if node.shows_full_text() {
                out.push_str(&format!("{indent}      📖 Full Text: {}\n", node.section.content));
            }
        }
        out
    }
}

/// Owns the tree shown to the user.
#[derive(Debug, Default)]
pub struct Presenter {
    current: Option<TreeView>,
}

impl Presenter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Swap in `view`, dropping the previous tree and its expansion state.
    pub fn replace(&mut self, view: TreeView) -> &mut TreeView {
        self.current.insert(view)
    }

    pub fn current(&self) -> Option<&TreeView> {
        self.current.as_ref()
    }

    pub fn current_mut(&mut self) -> Option<&mut TreeView> {
        self.current.as_mut()
    }
}
