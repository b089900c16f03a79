use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use smartsum_core::{FetchBackend, FetchRequest, PageDocument, PageStats, StructuredPage};
use smartsum_local::extract::{
    bytes_look_like_html, extract_page_from_bytes, extract_structured_from_bytes, is_summarizable,
};
use smartsum_local::page::LivePage;
use smartsum_local::pipeline::{build_tree, summarize_document, PipelineCfg};
use smartsum_local::present::{Presenter, EMPTY_TREE_MESSAGE};
use smartsum_local::summarize::{Summarizer, SummarizerConfig};
use smartsum_local::LocalFetcher;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

const DEFAULT_TIMEOUT_MS: u64 = 20_000;
const DEFAULT_MAX_BYTES: u64 = 5_000_000;

#[derive(Parser, Debug)]
#[command(name = "smartsum")]
#[command(about = "Summarize web pages: flat summary, section tree, locate + highlight", long_about = None)]
struct Cli {
    /// Debug logging on stderr (overrides SMARTSUM_LOG).
    #[arg(long, short, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Extract readable text (or heading sections with --structured) from a page.
    Extract(ExtractCmd),
    /// Summarize a page (or a text) chunk by chunk.
    Summarize(SummarizeCmd),
    /// Outline a page as a tree of summarized sections.
    Tree(TreeCmd),
    /// Find one tree section on the page and optionally highlight it.
    Locate(LocateCmd),
    /// Run as an MCP stdio server (for Cursor / MCP clients).
    #[cfg(feature = "stdio")]
    McpStdio,
    /// Diagnose configuration/launch issues (json; no secrets).
    Doctor(DoctorCmd),
    /// Print version info.
    Version(VersionCmd),
}

#[derive(clap::Args, Debug)]
struct SourceArgs {
    /// Page URL (http/https).
    #[arg(long, conflicts_with = "file")]
    url: Option<String>,
    /// Local HTML or plain-text file.
    #[arg(long)]
    file: Option<PathBuf>,
    /// Fetch timeout (ms).
    #[arg(long, default_value_t = DEFAULT_TIMEOUT_MS)]
    timeout_ms: u64,
    /// Maximum response bytes read when fetching.
    #[arg(long, default_value_t = DEFAULT_MAX_BYTES)]
    max_bytes: u64,
}

#[derive(clap::Args, Debug)]
struct ModelArgs {
    /// Use only the local extractive summary (no network).
    #[arg(long)]
    offline: bool,
    /// Model for long inputs (overrides SMARTSUM_MODEL_HEAVY).
    #[arg(long)]
    heavy_model: Option<String>,
    /// Model for short inputs (overrides SMARTSUM_MODEL_LIGHT).
    #[arg(long)]
    light_model: Option<String>,
    /// Model for the alternative attempt (overrides SMARTSUM_MODEL_FALLBACK).
    #[arg(long)]
    fallback_model: Option<String>,
}

impl ModelArgs {
    fn summarizer(&self) -> Result<Summarizer> {
        if self.offline {
            return Ok(Summarizer::extractive_only());
        }
        let mut cfg = SummarizerConfig::from_env();
        if let Some(m) = &self.heavy_model {
            cfg.heavy_model = m.clone();
        }
        if let Some(m) = &self.light_model {
            cfg.light_model = m.clone();
        }
        if let Some(m) = &self.fallback_model {
            cfg.fallback_model = m.clone();
        }
        if cfg.api_key.is_none() {
            tracing::info!("no inference API key configured; remote calls are anonymous");
        }
        Ok(Summarizer::new(&cfg)?)
    }
}

#[derive(clap::Args, Debug)]
struct ExtractCmd {
    #[command(flatten)]
    source: SourceArgs,
    /// Emit heading-keyed sections instead of flat text.
    #[arg(long)]
    structured: bool,
    /// Output format: json|text
    #[arg(long = "output", alias = "format", default_value = "json")]
    output: String,
}

#[derive(clap::Args, Debug)]
struct SummarizeCmd {
    #[command(flatten)]
    source: SourceArgs,
    /// Summarize this text instead of a page ("-" reads stdin).
    #[arg(long, conflicts_with_all = ["url", "file"])]
    text: Option<String>,
    #[command(flatten)]
    models: ModelArgs,
    /// Maximum characters per chunk.
    #[arg(long, default_value_t = PipelineCfg::default().max_chunk_chars)]
    max_chunk_chars: usize,
    /// Maximum chunks summarized.
    #[arg(long, default_value_t = PipelineCfg::default().max_chunks)]
    max_chunks: usize,
    /// Output format: json|text
    #[arg(long = "output", alias = "format", default_value = "text")]
    output: String,
}

#[derive(clap::Args, Debug)]
struct TreeCmd {
    #[command(flatten)]
    source: SourceArgs,
    #[command(flatten)]
    models: ModelArgs,
    /// Expand the node at this index (repeatable).
    #[arg(long)]
    expand: Vec<usize>,
    /// Output format: json|text
    #[arg(long = "output", alias = "format", default_value = "text")]
    output: String,
}

#[derive(clap::Args, Debug)]
struct LocateCmd {
    #[command(flatten)]
    source: SourceArgs,
    /// Tree node index (as printed by `tree`).
    #[arg(long)]
    section: usize,
    /// Also highlight the section title and key words on the page.
    #[arg(long)]
    highlight: bool,
    /// Print the page text with highlights wrapped in «…».
    #[arg(long)]
    show_page: bool,
    /// Output format: json|text
    #[arg(long = "output", alias = "format", default_value = "text")]
    output: String,
}

#[derive(clap::Args, Debug)]
struct DoctorCmd {
    /// Output format: json|text
    #[arg(long = "output", alias = "format", default_value = "json")]
    output: String,
    /// Attempt a local stdio MCP handshake (list_tools) to prove a client can start the server.
    ///
    /// This spawns a child `smartsum mcp-stdio` process and calls `list_tools`. It does not
    /// contact the inference endpoint and never prints secret values.
    #[arg(long, action = clap::ArgAction::Set, default_value_t = true)]
    check_stdio: bool,
    /// Timeout for the stdio handshake (ms).
    #[arg(long, default_value_t = 3000)]
    timeout_ms: u64,
}

#[derive(clap::Args, Debug)]
struct VersionCmd {
    /// Output format: json|text
    #[arg(long = "output", alias = "format", default_value = "json")]
    output: String,
}

/// Page bytes plus where they came from.
pub(crate) struct LoadedPage {
    url: String,
    bytes: Vec<u8>,
    content_type: Option<String>,
    truncated: bool,
}

impl LoadedPage {
    fn from_html(html: &str) -> Self {
        Self {
            url: "inline:html".to_string(),
            bytes: html.as_bytes().to_vec(),
            content_type: Some("text/html".to_string()),
            truncated: false,
        }
    }

    fn from_file(path: &Path) -> Result<Self> {
        let bytes =
            std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
        Ok(Self {
            url: path.display().to_string(),
            bytes,
            content_type: None,
            truncated: false,
        })
    }

    fn is_html(&self) -> bool {
        self.content_type
            .as_deref()
            .is_some_and(|ct| ct.to_ascii_lowercase().contains("html"))
            || bytes_look_like_html(&self.bytes)
    }

    fn html(&self) -> String {
        String::from_utf8_lossy(&self.bytes).into_owned()
    }

    fn document(&self) -> PageDocument {
        extract_page_from_bytes(&self.bytes, self.content_type.as_deref(), &self.url)
    }

    fn structured(&self) -> StructuredPage {
        extract_structured_from_bytes(&self.bytes, self.content_type.as_deref(), &self.url)
    }

    /// Warning codes that apply to any result built from this page.
    fn warnings(&self) -> Vec<&'static str> {
        let mut w = Vec::new();
        if self.truncated {
            w.push("fetch_truncated");
        }
        if self.is_html() && !is_summarizable(&self.html()) {
            w.push("page_not_summarizable");
        }
        w
    }
}

pub(crate) async fn fetch_page(
    fetcher: &LocalFetcher,
    url: &str,
    timeout_ms: u64,
    max_bytes: u64,
) -> smartsum_core::Result<LoadedPage> {
    let mut req = FetchRequest::new(url);
    req.timeout_ms = Some(timeout_ms);
    req.max_bytes = Some(max_bytes);
    let resp = fetcher.fetch(&req).await?;
    if !resp.is_success() {
        return Err(smartsum_core::Error::Fetch(format!(
            "HTTP {} for {url}",
            resp.status
        )));
    }
    Ok(LoadedPage {
        url: resp.final_url,
        bytes: resp.bytes,
        content_type: resp.content_type,
        truncated: resp.truncated,
    })
}

impl SourceArgs {
    async fn load(&self) -> Result<LoadedPage> {
        match (&self.url, &self.file) {
            (Some(url), _) => {
                let fetcher = LocalFetcher::new()?;
                Ok(fetch_page(&fetcher, url, self.timeout_ms, self.max_bytes).await?)
            }
            (None, Some(path)) => LoadedPage::from_file(path),
            (None, None) => anyhow::bail!("one of --url or --file is required"),
        }
    }
}

fn stats_line(s: &PageStats) -> String {
    format!(
        "📊 {} words · {} sections · ~{} min read",
        s.words, s.sections, s.read_minutes
    )
}

fn is_text_output(output: &str) -> bool {
    output.eq_ignore_ascii_case("text")
}

fn print_json(mut payload: serde_json::Value, kind: &str) {
    payload["schema_version"] = serde_json::json!(1);
    payload["kind"] = serde_json::json!(kind);
    payload["ok"] = serde_json::json!(true);
    println!("{payload}");
}

#[cfg(feature = "stdio")]
mod mcp {
    use super::*;
    use rmcp::{
        handler::server::router::tool::ToolRouter as RmcpToolRouter,
        handler::server::wrapper::Parameters,
        model::{CallToolResult, Content, ServerCapabilities, ServerInfo},
        tool, tool_handler, tool_router,
        transport::stdio,
        ErrorData as McpError, ServiceExt,
    };
    use schemars::JsonSchema;
    use serde::Deserialize;
    use std::sync::Arc;

    const SCHEMA_VERSION: u64 = 1;

    #[path = "envelope.rs"]
    mod envelope;
    use envelope::*;

    pub(crate) const TOOL_NAMES: [&str; 7] = [
        "smartsum_meta",
        "page_extract",
        "page_extract_structured",
        "text_summarize",
        "page_summarize",
        "page_tree",
        "page_locate",
    ];

    fn tool_result(payload: serde_json::Value) -> CallToolResult {
        // Always attach structured content for machine consumers, and include a text fallback
        // for older clients/tests that only read `content[0].text`.
        let mut r = CallToolResult::structured(payload.clone());
        r.content = vec![Content::text(payload.to_string())];
        r
    }

    #[derive(Debug, Deserialize, JsonSchema, Default)]
    struct PageArgs {
        /// Page URL (http/https). Pass exactly one of `url` or `html`.
        #[serde(default)]
        url: Option<String>,
        /// Raw page HTML, used instead of fetching.
        #[serde(default)]
        html: Option<String>,
        /// Fetch timeout (ms).
        #[serde(default)]
        timeout_ms: Option<u64>,
        /// Maximum response bytes read when fetching.
        #[serde(default)]
        max_bytes: Option<u64>,
    }

    impl PageArgs {
        fn request_json(&self) -> serde_json::Value {
            serde_json::json!({
                "url": self.url,
                "html_chars": self.html.as_ref().map(|h| h.chars().count()),
                "timeout_ms": self.timeout_ms.unwrap_or(DEFAULT_TIMEOUT_MS),
                "max_bytes": self.max_bytes.unwrap_or(DEFAULT_MAX_BYTES),
            })
        }
    }

    #[derive(Debug, Deserialize, JsonSchema, Default)]
    struct TextSummarizeArgs {
        /// Text to summarize.
        #[serde(default)]
        text: Option<String>,
    }

    #[derive(Debug, Deserialize, JsonSchema, Default)]
    struct PageSummarizeArgs {
        #[serde(flatten)]
        page: PageArgs,
        /// Maximum chunks summarized (default 3).
        #[serde(default)]
        max_chunks: Option<usize>,
        /// Maximum characters per chunk (default 2000).
        #[serde(default)]
        max_chunk_chars: Option<usize>,
    }

    #[derive(Debug, Deserialize, JsonSchema, Default)]
    struct PageTreeArgs {
        #[serde(flatten)]
        page: PageArgs,
        /// Node indexes to return expanded.
        #[serde(default)]
        expand: Option<Vec<usize>>,
    }

    #[derive(Debug, Deserialize, JsonSchema, Default)]
    struct PageLocateArgs {
        #[serde(flatten)]
        page: PageArgs,
        /// Tree node index (as returned by page_tree).
        #[serde(default)]
        section: Option<usize>,
        /// Also highlight the section title and key words.
        #[serde(default)]
        highlight: Option<bool>,
    }

    type ToolError = (ErrorCode, String);

    #[derive(Clone)]
    pub(crate) struct SmartsumMcp {
        tool_router: RmcpToolRouter<Self>,
        fetcher: Arc<LocalFetcher>,
        summarizer: Arc<Summarizer>,
        api_key_configured: bool,
        remote: bool,
    }

    #[tool_router]
    impl SmartsumMcp {
        pub(crate) fn new() -> Result<Self, McpError> {
            let cfg = SummarizerConfig::from_env();
            let summarizer = Summarizer::new(&cfg)
                .map_err(|e| McpError::internal_error(e.to_string(), None))?;
            let mut svc = Self::with_summarizer(summarizer)?;
            svc.api_key_configured = cfg.api_key.is_some();
            Ok(svc)
        }

        pub(crate) fn with_summarizer(summarizer: Summarizer) -> Result<Self, McpError> {
            let fetcher =
                LocalFetcher::new().map_err(|e| McpError::internal_error(e.to_string(), None))?;
            let remote = summarizer.strategy_names().len() > 1;
            Ok(Self {
                tool_router: Self::tool_router(),
                fetcher: Arc::new(fetcher),
                summarizer: Arc::new(summarizer),
                api_key_configured: false,
                remote,
            })
        }

        async fn load(&self, a: &PageArgs) -> Result<LoadedPage, ToolError> {
            let url = a.url.as_deref().map(str::trim).filter(|s| !s.is_empty());
            match (url, a.html.as_deref()) {
                (Some(_), Some(_)) => Err((
                    ErrorCode::InvalidParams,
                    "pass either url or html, not both".to_string(),
                )),
                (None, None) => Err((
                    ErrorCode::InvalidParams,
                    "one of url or html is required".to_string(),
                )),
                (None, Some(html)) => Ok(LoadedPage::from_html(html)),
                (Some(url), None) => fetch_page(
                    &self.fetcher,
                    url,
                    a.timeout_ms.unwrap_or(DEFAULT_TIMEOUT_MS),
                    a.max_bytes.unwrap_or(DEFAULT_MAX_BYTES),
                )
                .await
                .map_err(|e| (ErrorCode::from_core(&e), e.to_string())),
            }
        }

        fn summary_warnings(&self, strategies: &[&'static str]) -> Vec<&'static str> {
            let mut w = Vec::new();
            if strategies.contains(&"too_short") {
                w.push("text_too_short");
            }
            if self.remote {
                if !self.api_key_configured {
                    w.push("hf_api_key_missing");
                }
                if strategies.contains(&"extractive") {
                    w.push("extractive_fallback_used");
                }
            }
            w
        }

        fn finish(
            mut payload: serde_json::Value,
            warnings: Vec<&'static str>,
            kind: &str,
            t0: std::time::Instant,
        ) -> CallToolResult {
            if payload["ok"].as_bool() == Some(true) {
                payload["warning_hints"] = warning_hints_from(&warnings);
                payload["warnings"] = serde_json::json!(warnings);
            }
            add_envelope_fields(&mut payload, kind, t0.elapsed().as_millis());
            tool_result(payload)
        }

        #[tool(description = "Report smartsum configuration + version (no secrets)")]
        async fn smartsum_meta(&self) -> Result<CallToolResult, McpError> {
            let t0 = std::time::Instant::now();
            let cfg = SummarizerConfig::from_env();
            let payload = serde_json::json!({
                "ok": true,
                "name": "smartsum",
                "version": env!("CARGO_PKG_VERSION"),
                "configured": {
                    "hf_api_key": self.api_key_configured,
                    "hf_base_url": cfg.base_url,
                    "models": {
                        "heavy": cfg.heavy_model,
                        "light": cfg.light_model,
                        "fallback": cfg.fallback_model,
                    },
                },
                "strategies": self.summarizer.strategy_names(),
                "tools": TOOL_NAMES,
            });
            Ok(Self::finish(payload, Vec::new(), "smartsum_meta", t0))
        }

        #[tool(description = "Extract a page's main readable text (boilerplate removed, bounded)")]
        async fn page_extract(
            &self,
            params: Parameters<Option<PageArgs>>,
        ) -> Result<CallToolResult, McpError> {
            let t0 = std::time::Instant::now();
            let args = params.0.unwrap_or_default();
            let (payload, warnings) = match self.load(&args).await {
                Ok(page) => {
                    let doc = page.document();
                    let mut warnings = page.warnings();
                    if doc.raw_text.trim().is_empty() {
                        warnings.push("empty_extraction");
                    }
                    let stats = PageStats::from_text(&doc.raw_text, 0);
                    (
                        serde_json::json!({
                            "ok": true,
                            "request": args.request_json(),
                            "page": doc,
                            "stats": stats,
                        }),
                        warnings,
                    )
                }
                Err((code, msg)) => (error_payload(code, msg), Vec::new()),
            };
            Ok(Self::finish(payload, warnings, "page_extract", t0))
        }

        #[tool(description = "Extract a page as heading-keyed sections in document order")]
        async fn page_extract_structured(
            &self,
            params: Parameters<Option<PageArgs>>,
        ) -> Result<CallToolResult, McpError> {
            let t0 = std::time::Instant::now();
            let args = params.0.unwrap_or_default();
            let (payload, warnings) = match self.load(&args).await {
                Ok(page) => {
                    let structured = page.structured();
                    let mut warnings = page.warnings();
                    if structured.sections.is_empty() {
                        warnings.push("no_sections_found");
                    }
                    let stats =
                        PageStats::from_text(&structured.full_text, structured.sections.len());
                    (
                        serde_json::json!({
                            "ok": true,
                            "request": args.request_json(),
                            "page": structured,
                            "stats": stats,
                        }),
                        warnings,
                    )
                }
                Err((code, msg)) => (error_payload(code, msg), Vec::new()),
            };
            Ok(Self::finish(payload, warnings, "page_extract_structured", t0))
        }

        #[tool(description = "Summarize a text (remote models with local extractive fallback)")]
        async fn text_summarize(
            &self,
            params: Parameters<Option<TextSummarizeArgs>>,
        ) -> Result<CallToolResult, McpError> {
            let t0 = std::time::Instant::now();
            let args = params.0.unwrap_or_default();
            let Some(text) = args.text else {
                let payload = error_payload(ErrorCode::InvalidParams, "text is required");
                return Ok(Self::finish(payload, Vec::new(), "text_summarize", t0));
            };
            let outcome = self.summarizer.summarize_with_outcome(&text).await;
            let warnings = self.summary_warnings(&[outcome.strategy]);
            let payload = serde_json::json!({
                "ok": true,
                "request": { "text_chars": text.chars().count() },
                "summary": outcome.summary,
                "strategy": outcome.strategy,
            });
            Ok(Self::finish(payload, warnings, "text_summarize", t0))
        }

        #[tool(description = "Summarize a page chunk by chunk and return an emoji-formatted summary")]
        async fn page_summarize(
            &self,
            params: Parameters<Option<PageSummarizeArgs>>,
        ) -> Result<CallToolResult, McpError> {
            let t0 = std::time::Instant::now();
            let args = params.0.unwrap_or_default();
            let d = PipelineCfg::default();
            let cfg = PipelineCfg {
                max_chunk_chars: args.max_chunk_chars.unwrap_or(d.max_chunk_chars),
                max_chunks: args.max_chunks.unwrap_or(d.max_chunks),
            };
            let (payload, warnings) = match self.load(&args.page).await {
                Ok(page) => {
                    let doc = page.document();
                    let report = summarize_document(&doc, &self.summarizer, &cfg).await;
                    let mut warnings = page.warnings();
                    warnings.extend(self.summary_warnings(&report.strategies));
                    (
                        serde_json::json!({
                            "ok": true,
                            "request": args.page.request_json(),
                            "report": report,
                        }),
                        warnings,
                    )
                }
                Err((code, msg)) => (error_payload(code, msg), Vec::new()),
            };
            Ok(Self::finish(payload, warnings, "page_summarize", t0))
        }

        #[tool(description = "Outline a page as a tree of sections, each with a short summary")]
        async fn page_tree(
            &self,
            params: Parameters<Option<PageTreeArgs>>,
        ) -> Result<CallToolResult, McpError> {
            let t0 = std::time::Instant::now();
            let args = params.0.unwrap_or_default();
            let (payload, warnings) = match self.load(&args.page).await {
                Ok(page) => {
                    let mut view = build_tree(&page.structured(), &self.summarizer).await;
                    let mut warnings = page.warnings();
                    if view.is_empty() {
                        warnings.push("no_sections_found");
                    }
                    let bad: Vec<usize> = args
                        .expand
                        .unwrap_or_default()
                        .into_iter()
                        .filter(|i| view.toggle(*i).is_none())
                        .collect();
                    if bad.is_empty() {
                        (
                            serde_json::json!({
                                "ok": true,
                                "request": args.page.request_json(),
                                "tree": view,
                                "rendered": view.render_text(),
                            }),
                            warnings,
                        )
                    } else {
                        (
                            error_payload(
                                ErrorCode::NotFound,
                                format!("no section at index {bad:?} ({} sections)", view.len()),
                            ),
                            Vec::new(),
                        )
                    }
                }
                Err((code, msg)) => (error_payload(code, msg), Vec::new()),
            };
            Ok(Self::finish(payload, warnings, "page_tree", t0))
        }

        #[tool(description = "Locate a tree section on the page and optionally highlight it")]
        async fn page_locate(
            &self,
            params: Parameters<Option<PageLocateArgs>>,
        ) -> Result<CallToolResult, McpError> {
            let t0 = std::time::Instant::now();
            let args = params.0.unwrap_or_default();
            let Some(index) = args.section else {
                let payload = error_payload(ErrorCode::InvalidParams, "section is required");
                return Ok(Self::finish(payload, Vec::new(), "page_locate", t0));
            };
            let page = match self.load(&args.page).await {
                Ok(p) => p,
                Err((code, msg)) => {
                    return Ok(Self::finish(error_payload(code, msg), Vec::new(), "page_locate", t0))
                }
            };
            // Only titles and content matter here; skip remote summaries.
            let view = build_tree(&page.structured(), &Summarizer::extractive_only()).await;
            let (Some(loc), Some(hl)) = (view.locate_request(index), view.highlight_request(index))
            else {
                let payload = error_payload(
                    ErrorCode::NotFound,
                    format!("no section at index {index} ({} sections)", view.len()),
                );
                return Ok(Self::finish(payload, Vec::new(), "page_locate", t0));
            };

            let live = LivePage::from_html(&page.html());
            let located = live.scroll_to_section(&loc.title, &loc.content);
            let highlighted = args.highlight.unwrap_or(false) && live.highlight(&hl.text, &hl.extra);
            let mut warnings = Vec::new();
            if !located {
                warnings.push("section_not_located");
            }
            let payload = serde_json::json!({
                "ok": true,
                "request": args.page.request_json(),
                "section": { "index": index, "title": loc.title },
                "located": located,
                "target": live.scroll_target(),
                "highlighted": highlighted,
                "highlights": live.active_highlights(),
            });
            Ok(Self::finish(payload, warnings, "page_locate", t0))
        }
    }

    #[tool_handler]
    impl rmcp::ServerHandler for SmartsumMcp {
        fn get_info(&self) -> ServerInfo {
            ServerInfo {
                instructions: Some(
                    "Page summarization: extract, summarize, outline as a section tree, locate + highlight. Outputs are JSON and schema-versioned."
                        .to_string(),
                ),
                capabilities: ServerCapabilities::builder().enable_tools().build(),
                ..Default::default()
            }
        }
    }

    pub(crate) async fn serve_stdio() -> Result<(), McpError> {
        let svc = SmartsumMcp::new()?;
        let running = svc
            .serve(stdio())
            .await
            .map_err(|e| McpError::internal_error(e.to_string(), None))?;
        // Keep the stdio server alive until the client closes.
        running
            .waiting()
            .await
            .map_err(|e| McpError::internal_error(e.to_string(), None))?;
        Ok(())
    }

}

/// Opt-in env file (SMARTSUM_ENV_FILE). Never overrides variables already set.
fn load_env_file() {
    let Ok(p) = std::env::var("SMARTSUM_ENV_FILE") else {
        return;
    };
    let p = p.trim();
    if p.is_empty() {
        return;
    }
    let Ok(txt) = std::fs::read_to_string(p) else {
        return;
    };
    for raw in txt.lines() {
        let s = raw.trim();
        if s.is_empty() || s.starts_with('#') {
            continue;
        }
        let Some((k, v)) = s.split_once('=') else {
            continue;
        };
        let k = k.trim();
        let v = v.trim();
        if k.is_empty() {
            continue;
        }
        // Don't override explicit process env.
        if std::env::var_os(k).is_none() {
            std::env::set_var(k, v);
        }
    }
}

/// Logs go to stderr: stdout carries command output and the MCP transport.
fn init_tracing(verbose: bool) {
    use tracing_subscriber::EnvFilter;
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_env("SMARTSUM_LOG").unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        #[cfg(feature = "stdio")]
        Commands::McpStdio => {
            mcp::serve_stdio()
                .await
                .map_err(|e| anyhow::anyhow!(e.to_string()))?;
        }
        Commands::Extract(args) => {
            let page = args.source.load().await?;
            if args.structured {
                let s = page.structured();
                let stats = PageStats::from_text(&s.full_text, s.sections.len());
                if is_text_output(&args.output) {
                    println!("📄 {}\n🔗 {}\n", s.title, s.url);
                    if s.sections.is_empty() {
                        println!("{EMPTY_TREE_MESSAGE}");
                    }
                    for sec in &s.sections {
                        let indent = "  ".repeat(usize::from(sec.level.saturating_sub(1)));
                        println!("{indent}H{} {}", sec.level, sec.title);
                        if !sec.content.is_empty() {
                            println!("{indent}   {}", sec.content);
                        }
                    }
                    println!("\n{}", stats_line(&stats));
                } else {
                    print_json(
                        serde_json::json!({ "page": s, "stats": stats }),
                        "extract_structured",
                    );
                }
            } else {
                let doc = page.document();
                let stats = PageStats::from_text(&doc.raw_text, 0);
                if is_text_output(&args.output) {
                    println!("📄 {}\n🔗 {}\n\n{}\n", doc.title, doc.url, doc.raw_text);
                    println!("{}", stats_line(&stats));
                } else {
                    print_json(serde_json::json!({ "page": doc, "stats": stats }), "extract");
                }
            }
        }
        Commands::Summarize(args) => {
            let summarizer = args.models.summarizer()?;
            let doc = match args.text.as_deref() {
                Some("-") => PageDocument {
                    title: smartsum_core::UNTITLED.to_string(),
                    raw_text: std::io::read_to_string(std::io::stdin())
                        .context("reading text from stdin")?,
                    url: String::new(),
                    language: None,
                },
                Some(t) => PageDocument {
                    title: smartsum_core::UNTITLED.to_string(),
                    raw_text: t.to_string(),
                    url: String::new(),
                    language: None,
                },
                None => args.source.load().await?.document(),
            };
            let cfg = PipelineCfg {
                max_chunk_chars: args.max_chunk_chars,
                max_chunks: args.max_chunks,
            };
            let report = summarize_document(&doc, &summarizer, &cfg).await;
            if is_text_output(&args.output) {
                print!("{}", report.text);
                println!("{}", stats_line(&report.stats));
            } else {
                print_json(serde_json::json!({ "report": report }), "summarize");
            }
        }
        Commands::Tree(args) => {
            let page = args.source.load().await?;
            let summarizer = args.models.summarizer()?;
            let mut presenter = Presenter::new();
            let view = presenter.replace(build_tree(&page.structured(), &summarizer).await);
            for &i in &args.expand {
                if view.toggle(i).is_none() {
                    anyhow::bail!("no section at index {i} ({} sections)", view.len());
                }
            }
            if is_text_output(&args.output) {
                println!("{}", view.render_text());
                println!("{}", stats_line(&view.stats()));
            } else {
                print_json(serde_json::json!({ "tree": view }), "tree");
            }
        }
        Commands::Locate(args) => {
            let page = args.source.load().await?;
            // Only titles and content matter here; skip remote summaries.
            let view = build_tree(&page.structured(), &Summarizer::extractive_only()).await;
            let (Some(loc), Some(hl)) = (
                view.locate_request(args.section),
                view.highlight_request(args.section),
            ) else {
                anyhow::bail!(
                    "no section at index {} ({} sections)",
                    args.section,
                    view.len()
                );
            };
            let live = LivePage::from_html(&page.html());
            let located = live.scroll_to_section(&loc.title, &loc.content);
            let highlighted = args.highlight && live.highlight(&hl.text, &hl.extra);
            if is_text_output(&args.output) {
                match live.scroll_target() {
                    Some(t) if located => println!("🎯 Located <{}>: {}", t.tag, t.text),
                    _ => println!("⚠️ Section not found on page: {}", loc.title),
                }
                if args.highlight {
                    if highlighted {
                        println!("✨ Highlighted {} region(s)", live.active_highlights().len());
                    } else {
                        println!("✨ Nothing to highlight");
                    }
                }
                if args.show_page {
                    println!("\n{}", live.render_marked());
                }
            } else {
                print_json(
                    serde_json::json!({
                        "section": { "index": args.section, "title": loc.title },
                        "located": located,
                        "target": live.scroll_target(),
                        "highlighted": highlighted,
                        "highlights": live.active_highlights(),
                        "marked_text": args.show_page.then(|| live.render_marked()),
                    }),
                    "locate",
                );
            }
        }
        Commands::Doctor(args) => {
            let t0 = std::time::Instant::now();
            let cfg = SummarizerConfig::from_env();
            let mut checks: Vec<serde_json::Value> = Vec::new();

            let base_ok = FetchRequest::new(cfg.base_url.clone()).parsed_url().is_ok();
            checks.push(serde_json::json!({
                "name": "hf_base_url_valid",
                "ok": base_ok,
                "message": if base_ok { "inference base URL is a valid http(s) URL" } else { "inference base URL is not a valid http(s) URL" },
                "hint": if base_ok { "" } else { "Set SMARTSUM_HF_BASE_URL to an absolute http:// or https:// URL, or unset it." },
            }));

            // Check: stdio MCP handshake (optional).
            let mut stdio_ok: Option<bool> = None;
            let mut stdio_tool_count: Option<usize> = None;
            let mut stdio_error: Option<serde_json::Value> = None;
            let mut stdio_elapsed_ms: Option<u128> = None;

            #[cfg(feature = "stdio")]
            if args.check_stdio {
                use rmcp::service::ServiceExt;
                use rmcp::transport::{ConfigureCommandExt, TokioChildProcess};
                use tokio::process::Command;

                let exe = std::env::current_exe()
                    .unwrap_or_else(|_| std::path::PathBuf::from("smartsum"));
                let child = TokioChildProcess::new(Command::new(exe).configure(|cmd| {
                    cmd.args(["mcp-stdio"]);
                    // The handshake lists tools only; keep secrets out of the child.
                    cmd.env_remove("SMARTSUM_HF_API_KEY");
                    cmd.env_remove("HF_API_TOKEN");
                    cmd.env("SMARTSUM_LOG", "error");
                }))?;

                let service = ().serve(child).await?;
                let check_t0 = std::time::Instant::now();
                let res = tokio::time::timeout(
                    std::time::Duration::from_millis(args.timeout_ms),
                    service.list_tools(Default::default()),
                )
                .await;
                stdio_elapsed_ms = Some(check_t0.elapsed().as_millis());

                match res {
                    Ok(Ok(tools)) => {
                        stdio_ok = Some(true);
                        stdio_tool_count = Some(tools.tools.len());
                    }
                    Ok(Err(e)) => {
                        stdio_ok = Some(false);
                        stdio_error = Some(serde_json::json!({
                            "code": "handshake_failed",
                            "message": e.to_string(),
                            "hint": "The child process closed the stdio transport early. Check that nothing prints to stdout in mcp-stdio mode and that the client runs `smartsum mcp-stdio`."
                        }));
                    }
                    Err(_elapsed) => {
                        stdio_ok = Some(false);
                        stdio_error = Some(serde_json::json!({
                            "code": "timeout",
                            "message": format!("stdio handshake timed out after {}ms", args.timeout_ms),
                            "hint": "The child did not respond to list_tools in time."
                        }));
                    }
                }

                let _ = service.cancel().await;
            }

            #[cfg(not(feature = "stdio"))]
            if args.check_stdio {
                stdio_ok = Some(false);
            }

            checks.push(serde_json::json!({
                "name": "mcp_stdio_handshake",
                "ok": if args.check_stdio { stdio_ok.unwrap_or(false) } else { true },
                "skipped": !args.check_stdio,
                "message": if !args.check_stdio {
                    "stdio MCP handshake skipped"
                } else if stdio_ok.unwrap_or(false) {
                    "stdio MCP handshake succeeded"
                } else {
                    "stdio MCP handshake failed"
                },
                "hint": if !args.check_stdio || stdio_ok.unwrap_or(false) {
                    ""
                } else if cfg!(feature = "stdio") {
                    "Check that the MCP client points at the correct `smartsum` binary with args: [\"mcp-stdio\"]."
                } else {
                    "`mcp-stdio` requires building with feature `stdio`."
                },
                "tool_count": stdio_tool_count,
                "elapsed_ms": stdio_elapsed_ms,
                "error": stdio_error,
            }));

            let ok = checks.iter().all(|c| c["ok"].as_bool().unwrap_or(false));
            let payload = serde_json::json!({
                "schema_version": 1,
                "kind": "doctor",
                "ok": ok,
                "name": "smartsum",
                "version": env!("CARGO_PKG_VERSION"),
                "platform": {
                    "os": std::env::consts::OS,
                    "arch": std::env::consts::ARCH,
                },
                "features": {
                    "stdio": cfg!(feature = "stdio"),
                },
                "elapsed_ms": t0.elapsed().as_millis(),
                "configured": {
                    "hf_api_key": cfg.api_key.is_some(),
                    "hf_base_url": cfg.base_url,
                    "models": {
                        "heavy": cfg.heavy_model,
                        "light": cfg.light_model,
                        "fallback": cfg.fallback_model,
                    },
                    "timeout_ms": cfg.timeout.as_millis(),
                },
                "checks": checks,
            });

            match args.output.to_ascii_lowercase().as_str() {
                "text" => {
                    println!("smartsum {}", env!("CARGO_PKG_VERSION"));
                    println!(
                        "hf_api_key: {}",
                        if cfg.api_key.is_some() { "configured" } else { "missing (anonymous)" }
                    );
                    println!(
                        "models: heavy={} light={} fallback={}",
                        payload["configured"]["models"]["heavy"].as_str().unwrap_or("?"),
                        payload["configured"]["models"]["light"].as_str().unwrap_or("?"),
                        payload["configured"]["models"]["fallback"].as_str().unwrap_or("?"),
                    );
                    println!("checks:");
                    if let Some(arr) = payload["checks"].as_array() {
                        for c in arr {
                            let name = c["name"].as_str().unwrap_or("?");
                            let ok = c["ok"].as_bool().unwrap_or(false);
                            let skipped = c["skipped"].as_bool().unwrap_or(false);
                            if skipped {
                                println!("- {}: skipped", name);
                            } else {
                                println!("- {}: {}", name, if ok { "ok" } else { "fail" });
                            }
                        }
                    }
                }
                _ => println!("{payload}"),
            }
        }
        Commands::Version(args) => {
            let v = serde_json::json!({
                "schema_version": 1,
                "kind": "version",
                "ok": true,
                "name": "smartsum",
                "version": env!("CARGO_PKG_VERSION"),
            });
            match args.output.to_ascii_lowercase().as_str() {
                "text" => println!("smartsum {}", env!("CARGO_PKG_VERSION")),
                _ => println!("{}", v),
            }
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    load_env_file();
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("❌ Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
