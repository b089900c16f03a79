use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("invalid url: {0}")]
    InvalidUrl(String),
    #[error("fetch failed: {0}")]
    Fetch(String),
    #[error("summarize failed: {0}")]
    Summarize(String),
    #[error("not configured: {0}")]
    NotConfigured(String),
    #[error("not found: {0}")]
    NotFound(String),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Title used when a page has no usable `<title>`.
pub const UNTITLED: &str = "Untitled";

/// Flat extraction of a page: bounded readable text plus identifying metadata.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PageDocument {
    pub title: String,
    pub raw_text: String,
    pub url: String,
    /// Two-letter language hint (`<html lang>` / content-language meta), if present.
    pub language: Option<String>,
}

/// A titled span of page content bounded by headings (or a long paragraph
/// when the page has no headings).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Section {
    /// Heading rank, 1-6.
    pub level: u8,
    pub title: String,
    /// Bounded content captured after the heading.
    pub content: String,
    /// Position of the source heading (or paragraph) in the document.
    pub original_index: usize,
}

/// Structured extraction of a page: sections in document order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StructuredPage {
    pub title: String,
    pub url: String,
    pub sections: Vec<Section>,
    /// Bounded body text, used for page statistics.
    pub full_text: String,
}

/// One chunk of source text and the summary produced for it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SummaryChunk {
    pub source_text: String,
    pub summary_text: String,
}

/// Payload of a single remote summarization attempt.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SummaryRequest {
    pub inputs: String,
    pub max_length: usize,
    pub min_length: usize,
    pub do_sample: Option<bool>,
    pub temperature: Option<f64>,
}

/// Word count, section count and estimated reading time for a page.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct PageStats {
    pub words: usize,
    pub sections: usize,
    pub read_minutes: usize,
}

impl PageStats {
    /// Average reading speed used for `read_minutes`.
    pub const WORDS_PER_MINUTE: usize = 200;

    pub fn from_text(text: &str, sections: usize) -> Self {
        let words = text.split_whitespace().count();
        Self {
            words,
            sections,
            read_minutes: words.div_ceil(Self::WORDS_PER_MINUTE),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchRequest {
    pub url: String,
    /// Timeout for the operation (network + processing).
    pub timeout_ms: Option<u64>,
    /// Hard cap on bytes read from the response body.
    pub max_bytes: Option<u64>,
}

impl FetchRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            timeout_ms: None,
            max_bytes: None,
        }
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }

    /// Parse and validate the request URL (http/https only).
    pub fn parsed_url(&self) -> Result<url::Url> {
        let u = url::Url::parse(self.url.trim()).map_err(|e| Error::InvalidUrl(e.to_string()))?;
        match u.scheme() {
            "http" | "https" => Ok(u),
            other => Err(Error::InvalidUrl(format!("unsupported scheme: {other}"))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchResponse {
    pub url: String,
    pub final_url: String,
    pub status: u16,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
    pub truncated: bool,
}

impl FetchResponse {
    pub fn text_lossy(&self) -> String {
        String::from_utf8_lossy(&self.bytes).to_string()
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[async_trait::async_trait]
pub trait FetchBackend: Send + Sync {
    async fn fetch(&self, req: &FetchRequest) -> Result<FetchResponse>;
}

/// One strategy in the summarization fallback chain.
///
/// Implementations report failure through `Err`; the chain owner decides what to
/// try next. A strategy must not retry internally.
#[async_trait::async_trait]
pub trait SummaryBackend: Send + Sync {
    fn name(&self) -> &'static str;
    async fn summarize(&self, text: &str) -> Result<String>;
}
