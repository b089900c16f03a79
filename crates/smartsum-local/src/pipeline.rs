use crate::chunk::{chunk_text, DEFAULT_MAX_CHUNK_CHARS};
use crate::present::{format_summary, TreeNode, TreeView};
use crate::summarize::Summarizer;
use serde::Serialize;
use smartsum_core::{PageDocument, PageStats, StructuredPage, SummaryChunk};

/// Sections with more content than this are summarized; shorter ones are shown as-is.
pub const SECTION_SUMMARY_MIN_CHARS: usize = 200;

#[derive(Debug, Clone, Copy)]
pub struct PipelineCfg {
    pub max_chunk_chars: usize,
    pub max_chunks: usize,
}

impl Default for PipelineCfg {
    fn default() -> Self {
        Self {
            max_chunk_chars: DEFAULT_MAX_CHUNK_CHARS,
            max_chunks: 3,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FlatReport {
    pub title: String,
    pub url: String,
    pub chunks: Vec<SummaryChunk>,
    /// Strategy that produced each chunk summary, parallel to `chunks`.
    pub strategies: Vec<&'static str>,
    /// Presenter-formatted summary.
    pub text: String,
    pub stats: PageStats,
}

/// Chunk the page text and summarize the leading chunks one after another.
pub async fn summarize_document(
    doc: &PageDocument,
    summarizer: &Summarizer,
    cfg: &PipelineCfg,
) -> FlatReport {
    let mut pieces = chunk_text(&doc.raw_text, cfg.max_chunk_chars.max(1));
    if pieces.is_empty() {
        pieces.push(doc.raw_text.clone());
    }
    let total = pieces.len();

    let mut chunks = Vec::new();
    let mut strategies = Vec::new();
    for source_text in pieces.into_iter().take(cfg.max_chunks.max(1)) {
        let outcome = summarizer.summarize_with_outcome(&source_text).await;
        strategies.push(outcome.strategy);
        chunks.push(SummaryChunk {
            source_text,
            summary_text: outcome.summary,
        });
    }
    tracing::debug!(url = %doc.url, total, summarized = chunks.len(), "document summarized");

    let joined = chunks
        .iter()
        .map(|c| c.summary_text.as_str())
        .collect::<Vec<_>>()
        .join("\n\n");
    FlatReport {
        title: doc.title.clone(),
        url: doc.url.clone(),
        text: format_summary(&joined, &doc.title),
        stats: PageStats::from_text(&doc.raw_text, 0),
        chunks,
        strategies,
    }
}

/// One tree node per section, in page order.
pub async fn build_tree(page: &StructuredPage, summarizer: &Summarizer) -> TreeView {
    let mut nodes = Vec::with_capacity(page.sections.len());
    for section in &page.sections {
        let summary = if section.content.chars().count() > SECTION_SUMMARY_MIN_CHARS {
            summarizer.summarize(&section.content).await
        } else {
            section.content.clone()
        };
        nodes.push(TreeNode::new(section.clone(), summary));
    }
    TreeView::new(
        page.title.clone(),
        page.url.clone(),
        nodes,
        PageStats::from_text(&page.full_text, page.sections.len()),
    )
}
