//! Summarization as an ordered fallback chain: primary remote model, alternative
//! remote model, then the local extractive summary.

use crate::env;
use crate::extractive::extractive_summary;
use crate::hf::{self, HfInferenceClient};
use crate::textprep::{clip, norm_ws};
use smartsum_core::{Result, SummaryBackend, SummaryRequest};
use std::sync::Arc;
use std::time::Duration;

/// Inputs shorter than this (in characters, after whitespace normalization) are not summarized.
pub const MIN_SUMMARY_CHARS: usize = 50;
pub const TOO_SHORT_MESSAGE: &str = "Text is too short to summarize.";

const PRIMARY_INPUT_CAP: usize = 1_024;
const FALLBACK_INPUT_CAP: usize = 512;

#[derive(Debug, Clone)]
pub struct SummarizerConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    /// Model for inputs at or above `light_threshold_chars`.
    pub heavy_model: String,
    /// Model for inputs below `light_threshold_chars`.
    pub light_model: String,
    /// Model for the single alternative attempt.
    pub fallback_model: String,
    pub light_threshold_chars: usize,
    pub timeout: Duration,
}

impl Default for SummarizerConfig {
    fn default() -> Self {
        Self {
            base_url: hf::DEFAULT_BASE_URL.to_string(),
            api_key: None,
            heavy_model: hf::DEFAULT_HEAVY_MODEL.to_string(),
            light_model: hf::DEFAULT_LIGHT_MODEL.to_string(),
            fallback_model: hf::DEFAULT_FALLBACK_MODEL.to_string(),
            light_threshold_chars: 500,
            timeout: Duration::from_secs(30),
        }
    }
}

impl SummarizerConfig {
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            base_url: hf::hf_base_url_from_env().unwrap_or(d.base_url),
            api_key: hf::hf_api_key_from_env(),
            heavy_model: env("SMARTSUM_MODEL_HEAVY").unwrap_or(d.heavy_model),
            light_model: env("SMARTSUM_MODEL_LIGHT").unwrap_or(d.light_model),
            fallback_model: env("SMARTSUM_MODEL_FALLBACK").unwrap_or(d.fallback_model),
            light_threshold_chars: d.light_threshold_chars,
            timeout: env("SMARTSUM_TIMEOUT_MS")
                .and_then(|s| s.parse::<u64>().ok())
                .map(Duration::from_millis)
                .unwrap_or(d.timeout),
        }
    }
}

/// Primary request: length-proportional output bounds, sampling disabled.
pub fn primary_request(clean: &str) -> SummaryRequest {
    let len = clean.chars().count();
    SummaryRequest {
        inputs: clip(clean, PRIMARY_INPUT_CAP),
        max_length: 150usize.min(len / 4),
        min_length: 30usize.min(len / 10),
        do_sample: Some(false),
        temperature: Some(0.3),
    }
}

/// Alternative request: smaller payload, fixed output bounds.
pub fn fallback_request(clean: &str) -> SummaryRequest {
    SummaryRequest {
        inputs: clip(clean, FALLBACK_INPUT_CAP),
        max_length: 100,
        min_length: 20,
        do_sample: None,
        temperature: None,
    }
}

/// First attempt: routes by input length between a light and a heavy model.
pub struct PrimaryRemote {
    client: Arc<HfInferenceClient>,
    heavy_model: String,
    light_model: String,
    light_threshold_chars: usize,
}

impl PrimaryRemote {
    pub fn model_for(&self, clean: &str) -> &str {
        if clean.chars().count() < self.light_threshold_chars {
            &self.light_model
        } else {
            &self.heavy_model
        }
    }
}

#[async_trait::async_trait]
impl SummaryBackend for PrimaryRemote {
    fn name(&self) -> &'static str {
        "primary_remote"
    }

    async fn summarize(&self, text: &str) -> Result<String> {
        let model = self.model_for(text);
        self.client.summarize(model, &primary_request(text)).await
    }
}

/// Second attempt: one fixed model, smaller payload.
pub struct AlternativeRemote {
    client: Arc<HfInferenceClient>,
    model: String,
}

#[async_trait::async_trait]
impl SummaryBackend for AlternativeRemote {
    fn name(&self) -> &'static str {
        "alternative_remote"
    }

    async fn summarize(&self, text: &str) -> Result<String> {
        self.client
            .summarize(&self.model, &fallback_request(text))
            .await
    }
}

/// Terminal strategy: never fails, never touches the network.
pub struct Extractive;

#[async_trait::async_trait]
impl SummaryBackend for Extractive {
    fn name(&self) -> &'static str {
        "extractive"
    }

    async fn summarize(&self, text: &str) -> Result<String> {
        Ok(extractive_summary(text))
    }
}

/// Which strategy produced a summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub summary: String,
    /// Strategy name, or `"too_short"` when the input was below the threshold.
    pub strategy: &'static str,
}

pub struct Summarizer {
    chain: Vec<Box<dyn SummaryBackend>>,
}

impl Summarizer {
    pub fn new(cfg: &SummarizerConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent("smartsum-local/0.1")
            .timeout(cfg.timeout)
            .build()
            .map_err(|e| smartsum_core::Error::Summarize(e.to_string()))?;
        let client = Arc::new(HfInferenceClient::new(
            http,
            cfg.base_url.clone(),
            cfg.api_key.clone(),
        ));
        Ok(Self::with_chain(vec![
            Box::new(PrimaryRemote {
                client: client.clone(),
                heavy_model: cfg.heavy_model.clone(),
                light_model: cfg.light_model.clone(),
                light_threshold_chars: cfg.light_threshold_chars,
            }),
            Box::new(AlternativeRemote {
                client,
                model: cfg.fallback_model.clone(),
            }),
            Box::new(Extractive),
        ]))
    }

    /// Chain without remote strategies; useful offline.
    pub fn extractive_only() -> Self {
        Self::with_chain(vec![Box::new(Extractive)])
    }

    pub fn with_chain(chain: Vec<Box<dyn SummaryBackend>>) -> Self {
        Self { chain }
    }

    pub fn strategy_names(&self) -> Vec<&'static str> {
        self.chain.iter().map(|s| s.name()).collect()
    }

    /// Summarize `text`; always returns some string.
    pub async fn summarize(&self, text: &str) -> String {
        self.summarize_with_outcome(text).await.summary
    }

    pub async fn summarize_with_outcome(&self, text: &str) -> Outcome {
        let clean = norm_ws(text);
        if clean.chars().count() < MIN_SUMMARY_CHARS {
            return Outcome {
                summary: TOO_SHORT_MESSAGE.to_string(),
                strategy: "too_short",
            };
        }

        for strategy in &self.chain {
            tracing::debug!(strategy = strategy.name(), chars = clean.chars().count(), "summarize attempt");
            match strategy.summarize(&clean).await {
                Ok(summary) => {
                    return Outcome {
                        summary,
                        strategy: strategy.name(),
                    }
                }
                Err(e) => {
                    tracing::warn!(strategy = strategy.name(), error = %e, "summarize strategy failed");
                }
            }
        }

        Outcome {
            summary: extractive_summary(&clean),
            strategy: "extractive",
        }
    }
}
