use crate::textprep::{clip, has_any_text, norm_ws};
use smartsum_core::{PageDocument, Section, StructuredPage, UNTITLED};
use std::io::Cursor;

/// Bound on flat page text.
pub const FLAT_MAX_CHARS: usize = 8_000;
/// Bound on the content captured for one section.
pub const SECTION_MAX_CHARS: usize = 1_500;
/// Bound on `StructuredPage::full_text`.
pub const FULL_TEXT_MAX_CHARS: usize = 10_000;
/// Paragraphs must be longer than this to stand in for sections.
const PARAGRAPH_MIN_CHARS: usize = 100;
const PSEUDO_TITLE_CHARS: usize = 50;
/// Width used when rendering HTML through html2text on the degraded path.
const RENDER_WIDTH: usize = 100;

/// Elements removed from the working copy before any text is read.
pub const BOILERPLATE_SELECTORS: &[&str] = &[
    "script",
    "style",
    "noscript",
    "nav",
    "footer",
    "header",
    ".advertisement",
    ".ads",
    ".ad",
    ".sidebar",
    ".cookie-banner",
    ".popup",
    ".modal",
    "[class*=\"ad-\"]",
    "[id*=\"ad-\"]",
];

/// Main-content candidates, tried in order; the first match wins.
pub const MAIN_CONTENT_SELECTORS: &[&str] = &[
    "main",
    "article",
    "[role=\"main\"]",
    ".main-content",
    ".content",
    "#content",
    ".post-content",
    ".entry-content",
    ".article-content",
    ".page-content",
];

const HEADING_SELECTOR: &str = "h1, h2, h3, h4, h5, h6";

/// Convert HTML to readable plain text.
///
/// Used as the coarse fallback when selector-based extraction yields nothing.
pub fn html_to_text(html: &str, width: usize) -> String {
    // html2text expects bytes; Cursor avoids allocating a second large buffer.
    rendered_or_body(html2text::from_read(Cursor::new(html.as_bytes()), width), html)
}

/// A failed render degrades to the body's text nodes, never to raw markup.
fn rendered_or_body<E: std::fmt::Display>(
    rendered: std::result::Result<String, E>,
    html: &str,
) -> String {
    rendered.unwrap_or_else(|e| {
        tracing::debug!(error = %e, "html2text render failed; using body text");
        body_text(&html_scraper::Html::parse_document(html))
    })
}

/// Best-effort guess for whether bytes are HTML-ish.
pub fn bytes_look_like_html(bytes: &[u8]) -> bool {
    let mut i = 0usize;
    while i < bytes.len() && bytes[i].is_ascii_whitespace() {
        i += 1;
    }
    if i >= bytes.len() {
        return false;
    }
    let rest = &bytes[i..];
    // Common prefixes; keep it conservative.
    rest.starts_with(b"<!doctype")
        || rest.starts_with(b"<!DOCTYPE")
        || rest.starts_with(b"<html")
        || rest.starts_with(b"<HTML")
        || rest.starts_with(b"<head")
        || rest.starts_with(b"<body")
}

fn content_type_lc_prefix(ct: Option<&str>) -> String {
    ct.unwrap_or("")
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase()
}

fn is_html_input(bytes: &[u8], content_type: Option<&str>) -> bool {
    let ct = content_type_lc_prefix(content_type);
    ct == "text/html" || ct == "application/xhtml+xml" || bytes_look_like_html(bytes)
}

fn selector(s: &str) -> Option<html_scraper::Selector> {
    html_scraper::Selector::parse(s).ok()
}

fn heading_level(tag: &str) -> Option<u8> {
    match tag {
        "h1" => Some(1),
        "h2" => Some(2),
        "h3" => Some(3),
        "h4" => Some(4),
        "h5" => Some(5),
        "h6" => Some(6),
        _ => None,
    }
}

/// Tags whose boundaries separate words in rendered text.
fn is_block(tag: &str) -> bool {
    heading_level(tag).is_some()
        || matches!(
            tag,
            "address"
                | "article"
                | "aside"
                | "blockquote"
                | "br"
                | "dd"
                | "div"
                | "dl"
                | "dt"
                | "figcaption"
                | "figure"
                | "footer"
                | "form"
                | "header"
                | "hr"
                | "li"
                | "main"
                | "nav"
                | "ol"
                | "p"
                | "pre"
                | "section"
                | "table"
                | "td"
                | "th"
                | "tr"
                | "ul"
        )
}

/// Append a node's contribution to rendered text: a space at block boundaries,
/// text nodes verbatim so inline markup never splits a word.
///
/// `prev` is the node's previous sibling, so text after a closed block is separated too.
fn push_node_text(
    out: &mut String,
    node: &html_scraper::Node,
    prev: Option<&html_scraper::Node>,
) {
    match node {
        html_scraper::Node::Element(e) if is_block(e.name()) => out.push(' '),
        html_scraper::Node::Text(t) => {
            if prev
                .and_then(|p| p.as_element())
                .is_some_and(|e| is_block(e.name()))
            {
                out.push(' ');
            }
            out.push_str(t);
        }
        _ => {}
    }
}

fn element_text(el: &html_scraper::ElementRef) -> String {
    let mut out = String::new();
    for node in el.descendants() {
        push_node_text(&mut out, node.value(), node.prev_sibling().map(|p| p.value()));
    }
    norm_ws(&out)
}

fn first_text(doc: &html_scraper::Html, sel: &str) -> Option<String> {
    let sel = selector(sel)?;
    let el = doc.select(&sel).next()?;
    let t = element_text(&el);
    (!t.is_empty()).then_some(t)
}

fn first_attr(doc: &html_scraper::Html, sel: &str, attr: &str) -> Option<String> {
    let sel = selector(sel)?;
    let el = doc.select(&sel).next()?;
    let v = el.value().attr(attr)?.trim().to_string();
    (!v.is_empty()).then_some(v)
}

/// Working copy of `doc` with boilerplate subtrees detached. `doc` itself is untouched.
pub fn strip_boilerplate(doc: &html_scraper::Html) -> html_scraper::Html {
    let mut clean = doc.clone();
    let mut ids = Vec::new();
    for s in BOILERPLATE_SELECTORS {
        let Some(sel) = selector(s) else { continue };
        ids.extend(doc.select(&sel).map(|el| el.id()));
    }
    // Node ids are stable across the clone.
    for id in ids {
        if let Some(mut node) = clean.tree.get_mut(id) {
            node.detach();
        }
    }
    clean
}

fn page_title(doc: &html_scraper::Html) -> String {
    first_text(doc, "title").unwrap_or_else(|| UNTITLED.to_string())
}

/// Two-letter language hint from `<html lang>` or language meta tags.
pub fn page_language(doc: &html_scraper::Html) -> Option<String> {
    let raw = doc
        .root_element()
        .value()
        .attr("lang")
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .or_else(|| first_attr(doc, "meta[http-equiv=\"content-language\"]", "content"))
        .or_else(|| first_attr(doc, "meta[name=\"language\"]", "content"))?;
    let lang: String = raw.chars().take(2).collect::<String>().to_lowercase();
    (!lang.is_empty()).then_some(lang)
}

fn body_text(doc: &html_scraper::Html) -> String {
    match selector("body").and_then(|sel| doc.select(&sel).next()) {
        Some(body) => element_text(&body),
        None => element_text(&doc.root_element()),
    }
}

/// Text of the first main-content candidate, else of `<body>`.
fn main_text(clean: &html_scraper::Html) -> String {
    for s in MAIN_CONTENT_SELECTORS {
        let Some(sel) = selector(s) else { continue };
        if let Some(el) = clean.select(&sel).next() {
            let t = element_text(&el);
            if has_any_text(&t) {
                return t;
            }
        }
    }
    body_text(clean)
}

/// Flat extraction: main-content text (bounded) plus title, URL and language.
pub fn extract_page(html: &str, url: &str) -> PageDocument {
    let doc = html_scraper::Html::parse_document(html);
    let clean = strip_boilerplate(&doc);
    let mut text = main_text(&clean);
    if !has_any_text(&text) {
        tracing::debug!(url, "main-content extraction empty; rendering whole document");
        text = norm_ws(&html_to_text(html, RENDER_WIDTH));
    }
    PageDocument {
        title: page_title(&doc),
        raw_text: clip(&text, FLAT_MAX_CHARS),
        url: url.to_string(),
        language: page_language(&doc),
    }
}

fn push_section(
    sections: &mut Vec<Section>,
    level: u8,
    title: String,
    content: &str,
    original_index: usize,
) {
    if title.is_empty() {
        return;
    }
    sections.push(Section {
        level,
        title,
        content: clip(&norm_ws(content), SECTION_MAX_CHARS),
        original_index,
    });
}

/// Sections keyed by headings, in document order.
///
/// Each heading captures the text that follows it up to the next heading of any level.
fn sections_from_headings(clean: &html_scraper::Html) -> Vec<Section> {
    struct Open {
        level: u8,
        title: String,
        index: usize,
        content: String,
    }

    let mut sections = Vec::new();
    let mut open: Option<Open> = None;
    let mut heading_count = 0usize;
    // Raw capture bound per section; normalization can only shrink it.
    let raw_cap = SECTION_MAX_CHARS * 4;

    for node in clean.root_element().descendants() {
        if let Some(el) = html_scraper::ElementRef::wrap(node) {
            if let Some(level) = heading_level(el.value().name()) {
                if let Some(o) = open.take() {
                    push_section(&mut sections, o.level, o.title, &o.content, o.index);
                }
                open = Some(Open {
                    level,
                    title: element_text(&el),
                    index: heading_count,
                    content: String::new(),
                });
                heading_count += 1;
                continue;
            }
        }
        let Some(o) = open.as_mut() else { continue };
        let in_heading = node.ancestors().any(|a| {
            a.value()
                .as_element()
                .is_some_and(|e| heading_level(e.name()).is_some())
        });
        if in_heading || o.content.len() >= raw_cap {
            continue;
        }
        push_node_text(&mut o.content, node.value(), node.prev_sibling().map(|p| p.value()));
    }
    if let Some(o) = open.take() {
        push_section(&mut sections, o.level, o.title, &o.content, o.index);
    }
    sections
}

/// Long paragraphs as level-2 pseudo-sections, for pages without headings.
fn sections_from_paragraphs(clean: &html_scraper::Html) -> Vec<Section> {
    let Some(sel) = selector("p") else {
        return Vec::new();
    };
    clean
        .select(&sel)
        .enumerate()
        .filter_map(|(index, p)| {
            let text = element_text(&p);
            (text.chars().count() > PARAGRAPH_MIN_CHARS).then(|| Section {
                level: 2,
                title: format!("{}...", clip(&text, PSEUDO_TITLE_CHARS)),
                content: clip(&text, SECTION_MAX_CHARS),
                original_index: index,
            })
        })
        .collect()
}

/// Structured extraction: heading-keyed sections, or paragraphs when there are no headings.
pub fn extract_structured(html: &str, url: &str) -> StructuredPage {
    let doc = html_scraper::Html::parse_document(html);
    let clean = strip_boilerplate(&doc);
    let has_headings = selector(HEADING_SELECTOR)
        .map(|sel| clean.select(&sel).next().is_some())
        .unwrap_or(false);
    let mut sections = if has_headings {
        sections_from_headings(&clean)
    } else {
        Vec::new()
    };
    if sections.is_empty() {
        sections = sections_from_paragraphs(&clean);
    }
    tracing::debug!(url, sections = sections.len(), "structured extraction");
    StructuredPage {
        title: page_title(&doc),
        url: url.to_string(),
        sections,
        full_text: clip(&body_text(&clean), FULL_TEXT_MAX_CHARS),
    }
}

/// Plain-text bodies become a single untitled document.
fn page_from_plain_text(text: &str, url: &str) -> PageDocument {
    PageDocument {
        title: UNTITLED.to_string(),
        raw_text: clip(text.trim(), FLAT_MAX_CHARS),
        url: url.to_string(),
        language: None,
    }
}

/// Plain-text bodies: blank-line separated paragraphs stand in for sections.
fn structured_from_plain_text(text: &str, url: &str) -> StructuredPage {
    let sections = text
        .split("\n\n")
        .map(norm_ws)
        .enumerate()
        .filter(|(_, p)| p.chars().count() > PARAGRAPH_MIN_CHARS)
        .map(|(index, p)| Section {
            level: 2,
            title: format!("{}...", clip(&p, PSEUDO_TITLE_CHARS)),
            content: clip(&p, SECTION_MAX_CHARS),
            original_index: index,
        })
        .collect();
    StructuredPage {
        title: UNTITLED.to_string(),
        url: url.to_string(),
        sections,
        full_text: clip(&norm_ws(text), FULL_TEXT_MAX_CHARS),
    }
}

/// Flat extraction from a fetched body (HTML or plain text).
pub fn extract_page_from_bytes(bytes: &[u8], content_type: Option<&str>, url: &str) -> PageDocument {
    let body = String::from_utf8_lossy(bytes);
    if is_html_input(bytes, content_type) {
        extract_page(&body, url)
    } else {
        page_from_plain_text(&body, url)
    }
}

/// Structured extraction from a fetched body (HTML or plain text).
pub fn extract_structured_from_bytes(
    bytes: &[u8],
    content_type: Option<&str>,
    url: &str,
) -> StructuredPage {
    let body = String::from_utf8_lossy(bytes);
    if is_html_input(bytes, content_type) {
        extract_structured(&body, url)
    } else {
        structured_from_plain_text(&body, url)
    }
}

/// Whether a page looks like an article worth summarizing (vs. forms or link farms).
pub fn is_summarizable(html: &str) -> bool {
    let doc = html_scraper::Html::parse_document(html);
    let text = body_text(&doc);
    if text.split_whitespace().count() < 100 {
        return false;
    }
    let count = |s: &str| selector(s).map(|sel| doc.select(&sel).count()).unwrap_or(0);
    let forms = count("form");
    let links = count("a");
    !(forms > 5 || (links > 50 && text.chars().count() < 2_000))
}
