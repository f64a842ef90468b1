// Runner configuration
//
// Passed explicitly into every run; nothing in the pipeline reads the
// environment on its own. Binaries build one with `from_env`.

use anyhow::Context;
use std::time::Duration;

pub const DEFAULT_RUNNER_URL: &str = "https://emkc.org/api/v2/piston/execute";
pub const DEFAULT_LLM_URL: &str = "https://openrouter.ai/api/v1/chat/completions";
pub const DEFAULT_MODEL: &str = "google/gemini-3-pro-preview";
pub const DEFAULT_SIMULATION_MODEL: &str = "google/gemini-3-flash-preview";

/// Settings for the execution pipeline and the LLM client
#[derive(Debug, Clone, PartialEq)]
pub struct RunnerConfig {
    /// Compile-and-run sandbox endpoint
    pub runner_url: String,
    /// Bearer key for the LLM endpoint; enables AI simulation when present
    pub api_key: Option<String>,
    /// OpenAI-compatible chat completions endpoint
    pub llm_url: String,
    /// More capable model, used for tutoring and as simulation fallback
    pub default_model: String,
    /// Fast model tried first for execution simulation
    pub simulation_model: String,
    /// Pause inserted before every sandbox request except the first
    pub request_delay: Duration,
    pub compile_timeout_ms: u64,
    pub run_timeout_ms: u64,
    /// Whole-request timeout for outbound HTTP calls
    pub http_timeout: Duration,
    /// Extra sandbox endpoints API clients may pick per request
    pub allowed_runner_urls: Vec<String>,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            runner_url: DEFAULT_RUNNER_URL.to_string(),
            api_key: None,
            llm_url: DEFAULT_LLM_URL.to_string(),
            default_model: DEFAULT_MODEL.to_string(),
            simulation_model: DEFAULT_SIMULATION_MODEL.to_string(),
            request_delay: Duration::from_millis(300),
            compile_timeout_ms: 10_000,
            run_timeout_ms: 5_000,
            http_timeout: Duration::from_secs(60),
            allowed_runner_urls: Vec::new(),
        }
    }
}

/// Blank and whitespace-only values count as unset
fn non_blank(value: impl AsRef<str>) -> Option<String> {
    let trimmed = value.as_ref().trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

impl RunnerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from environment variables
    ///
    /// Supported variables:
    /// - `ALGOMASTER_RUNNER_URL`: sandbox endpoint
    /// - `OPENROUTER_API_KEY`: LLM credential
    /// - `ALGOMASTER_LLM_URL`: chat completions endpoint
    /// - `ALGOMASTER_MODEL`: default model
    /// - `ALGOMASTER_SIM_MODEL`: execution simulation model
    /// - `ALGOMASTER_REQUEST_DELAY_MS`: delay between sandbox requests
    /// - `ALGOMASTER_HTTP_TIMEOUT_SECS`: outbound request timeout
    /// - `ALGOMASTER_ALLOWED_RUNNER_URLS`: comma-separated endpoints API clients may select
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build a configuration from any variable source
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let var = |name: &str| lookup(name).and_then(non_blank);
        let mut config = Self::default();

        if let Some(url) = var("ALGOMASTER_RUNNER_URL") {
            config.runner_url = url;
        }
        config.api_key = var("OPENROUTER_API_KEY");
        if let Some(url) = var("ALGOMASTER_LLM_URL") {
            config.llm_url = url;
        }
        if let Some(model) = var("ALGOMASTER_MODEL") {
            config.default_model = model;
        }
        if let Some(model) = var("ALGOMASTER_SIM_MODEL") {
            config.simulation_model = model;
        }
        if let Some(ms) = var("ALGOMASTER_REQUEST_DELAY_MS") {
            let ms: u64 = ms
                .parse()
                .with_context(|| format!("Invalid ALGOMASTER_REQUEST_DELAY_MS value: {}", ms))?;
            config.request_delay = Duration::from_millis(ms);
        }
        if let Some(secs) = var("ALGOMASTER_HTTP_TIMEOUT_SECS") {
            let secs: u64 = secs
                .parse()
                .with_context(|| format!("Invalid ALGOMASTER_HTTP_TIMEOUT_SECS value: {}", secs))?;
            config.http_timeout = Duration::from_secs(secs);
        }
        if let Some(urls) = var("ALGOMASTER_ALLOWED_RUNNER_URLS") {
            config.allowed_runner_urls = urls.split(',').filter_map(non_blank).collect();
        }

        Ok(config)
    }

    /// Whether an LLM credential is configured
    pub fn has_api_key(&self) -> bool {
        self.api_key.as_deref().map_or(false, |k| !k.trim().is_empty())
    }

    /// Set the sandbox endpoint; a blank URL restores the default
    pub fn with_runner_url(mut self, url: impl AsRef<str>) -> Self {
        self.runner_url = non_blank(url).unwrap_or_else(|| DEFAULT_RUNNER_URL.to_string());
        self
    }

    /// Set the LLM credential; a blank key clears it
    pub fn with_api_key(mut self, key: impl AsRef<str>) -> Self {
        self.api_key = non_blank(key);
        self
    }

    pub fn with_llm_url(mut self, url: impl Into<String>) -> Self {
        self.llm_url = url.into();
        self
    }

    pub fn with_models(mut self, default_model: impl Into<String>, simulation_model: impl Into<String>) -> Self {
        self.default_model = default_model.into();
        self.simulation_model = simulation_model.into();
        self
    }

    pub fn with_request_delay(mut self, delay: Duration) -> Self {
        self.request_delay = delay;
        self
    }

    pub fn with_http_timeout(mut self, timeout: Duration) -> Self {
        self.http_timeout = timeout;
        self
    }

    pub fn with_allowed_runner_urls<I, S>(mut self, urls: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.allowed_runner_urls = urls.into_iter().filter_map(non_blank).collect();
        self
    }

    /// Whether an API client may run against `url`
    ///
    /// The configured endpoint is always allowed; anything else must be listed.
    pub fn permits_runner_url(&self, url: &str) -> bool {
        let url = url.trim();
        url == self.runner_url || self.allowed_runner_urls.iter().any(|allowed| allowed == url)
    }

    /// Whether the sandbox endpoint is the public default
    pub fn is_default_runner_url(&self) -> bool {
        self.runner_url.trim() == DEFAULT_RUNNER_URL
    }
}
