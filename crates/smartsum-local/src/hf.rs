use crate::env;
use serde::{Deserialize, Serialize};
use smartsum_core::{Error, Result, SummaryRequest};

pub const DEFAULT_BASE_URL: &str = "https://api-inference.huggingface.co/models";
pub const DEFAULT_HEAVY_MODEL: &str = "facebook/bart-large-cnn";
pub const DEFAULT_LIGHT_MODEL: &str = "sshleifer/distilbart-cnn-12-6";
pub const DEFAULT_FALLBACK_MODEL: &str = "sshleifer/distilbart-cnn-12-6";

pub fn hf_api_key_from_env() -> Option<String> {
    env("SMARTSUM_HF_API_KEY").or_else(|| env("HF_API_TOKEN"))
}

pub fn hf_base_url_from_env() -> Option<String> {
    env("SMARTSUM_HF_BASE_URL")
}

/// Client for the hosted summarization endpoint (`POST {base}/{model}`).
#[derive(Debug, Clone)]
pub struct HfInferenceClient {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl HfInferenceClient {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
        }
    }

    /// Anonymous calls are valid: a missing key only drops the Authorization header.
    pub fn from_env(client: reqwest::Client) -> Self {
        let base_url = hf_base_url_from_env().unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        Self::new(client, base_url, hf_api_key_from_env())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    fn endpoint_model(&self, model: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            model.trim_start_matches('/')
        )
    }

    /// One request, no retries. Fails on transport errors, non-2xx, or a body without
    /// a non-empty `summary_text` in its first element.
    pub async fn summarize(&self, model: &str, req: &SummaryRequest) -> Result<String> {
        let body = InferenceRequest {
            inputs: &req.inputs,
            parameters: InferenceParameters {
                max_length: req.max_length,
                min_length: req.min_length,
                do_sample: req.do_sample,
                temperature: req.temperature,
            },
        };

        let mut rb = self
            .client
            .post(self.endpoint_model(model))
            .header(reqwest::header::CONTENT_TYPE, "application/json");
        if let Some(k) = &self.api_key {
            rb = rb.header(reqwest::header::AUTHORIZATION, format!("Bearer {k}"));
        }

        let resp = rb
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Summarize(e.to_string()))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(Error::Summarize(format!("{model} HTTP {status}")));
        }

        let parsed: Vec<InferenceItem> = resp
            .json()
            .await
            .map_err(|e| Error::Summarize(format!("{model} malformed body: {e}")))?;
        parsed
            .into_iter()
            .next()
            .and_then(|item| item.summary_text)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| Error::Summarize(format!("{model} response missing summary_text")))
    }
}

#[derive(Debug, Serialize)]
struct InferenceRequest<'a> {
    inputs: &'a str,
    parameters: InferenceParameters,
}

#[derive(Debug, Serialize)]
struct InferenceParameters {
    max_length: usize,
    min_length: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    do_sample: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct InferenceItem {
    #[serde(default)]
    summary_text: Option<String>,
}
