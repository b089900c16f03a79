use serde::Serialize;

pub(crate) fn warning_hint(code: &'static str) -> Option<&'static str> {
    match code {
        "hf_api_key_missing" => Some(
            "No inference API key is configured; remote calls are anonymous and may be rate-limited. Set SMARTSUM_HF_API_KEY (or HF_API_TOKEN).",
        ),
        "extractive_fallback_used" => Some(
            "Both remote summarization attempts failed, so the summary was built from the page's own sentences. Check the API key and model names (smartsum doctor).",
        ),
        "text_too_short" => Some(
            "The input had fewer than 50 characters after whitespace normalization, so nothing was summarized.",
        ),
        "empty_extraction" => Some(
            "The page had bytes but no readable text was extracted. It may be a JS-rendered app shell; try a different URL or pass the rendered HTML directly.",
        ),
        "fetch_truncated" => Some(
            "The page body was larger than max_bytes and was cut off; the tail of the page was not considered. Increase max_bytes to include it.",
        ),
        "no_sections_found" => Some(
            "No headings or long paragraphs were found, so the tree is empty. Use page_summarize for a flat summary instead.",
        ),
        "page_not_summarizable" => Some(
            "The page looks like a form or a link directory rather than an article; the summary may be low quality.",
        ),
        "section_not_located" => Some(
            "No heading or text on the page matched this section. The page may have changed since the tree was built.",
        ),
        _ => None,
    }
}

pub(crate) fn warning_hints_from(codes: &[&'static str]) -> serde_json::Value {
    let mut m = serde_json::Map::new();
    for c in codes {
        if let Some(h) = warning_hint(c) {
            m.insert((*c).to_string(), serde_json::json!(h));
        }
    }
    serde_json::Value::Object(m)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum ErrorCode {
    InvalidParams,
    InvalidUrl,
    NotConfigured,
    NotFound,
    FetchFailed,
    SummarizeFailed,
}

impl ErrorCode {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::InvalidParams => "invalid_params",
            Self::InvalidUrl => "invalid_url",
            Self::NotConfigured => "not_configured",
            Self::NotFound => "not_found",
            Self::FetchFailed => "fetch_failed",
            Self::SummarizeFailed => "summarize_failed",
        }
    }

    pub(crate) fn retryable(self) -> bool {
        match self {
            Self::FetchFailed | Self::SummarizeFailed => true,
            // Configuration + invalid input are not retryable without changing something.
            Self::NotConfigured | Self::InvalidParams | Self::InvalidUrl | Self::NotFound => false,
        }
    }

    pub(crate) fn from_core(e: &smartsum_core::Error) -> Self {
        use smartsum_core::Error;
        match e {
            Error::InvalidUrl(_) => Self::InvalidUrl,
            Error::Fetch(_) => Self::FetchFailed,
            Error::Summarize(_) => Self::SummarizeFailed,
            Error::NotConfigured(_) => Self::NotConfigured,
            Error::NotFound(_) => Self::NotFound,
        }
    }

    pub(crate) fn default_hint(self) -> &'static str {
        match self {
            Self::InvalidParams => "Pass exactly one of url or html.",
            Self::InvalidUrl => "Only absolute http:// and https:// URLs are supported.",
            Self::NotConfigured => "Run `smartsum doctor` to see which settings are missing.",
            Self::NotFound => "Check the index against the node list returned by page_tree.",
            Self::FetchFailed => "The page could not be fetched; check the URL and retry.",
            Self::SummarizeFailed => "Remote summarization failed; retry later.",
        }
    }
}

pub(crate) fn add_envelope_fields(payload: &mut serde_json::Value, kind: &str, elapsed_ms: u128) {
    payload["schema_version"] = serde_json::json!(super::SCHEMA_VERSION);
    payload["kind"] = serde_json::json!(kind);
    payload["elapsed_ms"] = serde_json::json!(elapsed_ms);
    // Keep `request` and `warnings` present on every payload so clients can skip
    // missing-vs-null branching.
    if payload.get("request").is_none() {
        payload["request"] = serde_json::Value::Null;
    }
    if payload.get("warnings").is_none() {
        payload["warnings"] = serde_json::json!([]);
    }
}

pub(crate) fn error_obj(
    code: ErrorCode,
    message: impl ToString,
    hint: impl ToString,
) -> serde_json::Value {
    #[derive(Serialize)]
    struct ErrorObject {
        code: &'static str,
        message: String,
        hint: String,
        retryable: bool,
    }

    let e = ErrorObject {
        code: code.as_str(),
        message: message.to_string(),
        hint: hint.to_string(),
        retryable: code.retryable(),
    };
    match serde_json::to_value(e) {
        Ok(v) => v,
        Err(_) => serde_json::json!({
            "code": code.as_str(),
            "message": message.to_string(),
            "hint": hint.to_string(),
            "retryable": code.retryable()
        }),
    }
}

/// `{ ok: false, error }` payload for a failed tool call.
pub(crate) fn error_payload(code: ErrorCode, message: impl ToString) -> serde_json::Value {
    serde_json::json!({
        "ok": false,
        "error": error_obj(code, message, code.default_hint()),
    })
}
