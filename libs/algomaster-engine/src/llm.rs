//! Chat completions client
//!
//! Thin wrapper over an OpenAI-compatible `/chat/completions` endpoint
//! (OpenRouter by default). Shared by the execution simulator and the tutor.

use algomaster_common::types::ChatMessage;
use algomaster_common::RunnerConfig;
use lazy_static::lazy_static;
use regex::Regex;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Errors raised while talking to the LLM endpoint
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("OpenRouter API key not configured. Please provide an API key.")]
    MissingApiKey,

    #[error("OpenRouter API error: {status} - {body}")]
    Http { status: u16, body: String },

    #[error("OpenRouter request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Invalid authorization header")]
    InvalidHeader,
}

/// Per-request knobs
#[derive(Debug, Clone, Default)]
pub struct ChatOptions {
    /// Ask for `response_format: {type: "json_object"}`
    pub json_mode: bool,
    /// Model override; the configured default model otherwise
    pub model: Option<String>,
    pub temperature: Option<f32>,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    #[serde(default)]
    message: Option<ChoiceMessage>,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Clone)]
pub struct ChatClient {
    http: reqwest::Client,
    url: String,
    api_key: Option<String>,
    default_model: String,
}

impl ChatClient {
    pub fn new(http: reqwest::Client, config: &RunnerConfig) -> Self {
        Self {
            http,
            url: config.llm_url.clone(),
            api_key: config.api_key.clone(),
            default_model: config.default_model.clone(),
        }
    }

    /// Send a conversation and return the first choice's text
    ///
    /// A reply without choices or content yields an empty string.
    pub async fn complete(&self, messages: &[ChatMessage], options: &ChatOptions) -> Result<String, LlmError> {
        let api_key = self.api_key.as_deref().filter(|k| !k.trim().is_empty()).ok_or(LlmError::MissingApiKey)?;
        let model = options.model.as_deref().unwrap_or(&self.default_model);

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", api_key)).map_err(|_| LlmError::InvalidHeader)?,
        );
        headers.insert("X-Title", HeaderValue::from_static("AI AlgoMaster"));

        let body = ChatRequest {
            model,
            messages,
            temperature: options.temperature,
            response_format: options.json_mode.then_some(ResponseFormat { kind: "json_object" }),
        };

        debug!(model = model, messages = messages.len(), json_mode = options.json_mode, "Sending chat request");

        let response = self.http.post(&self.url).headers(headers).json(&body).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Http { status: status.as_u16(), body });
        }

        let data: ChatResponse = response.json().await?;
        Ok(data
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message)
            .and_then(|m| m.content)
            .unwrap_or_default())
    }
}

lazy_static! {
    static ref FENCE: Regex = Regex::new(r"```[\s\S]*?```").expect("valid fence regex");
    static ref FENCE_TAG: Regex = Regex::new(r"^```[\w+\-.]*").expect("valid fence tag regex");
}

/// Pull the JSON object text out of a model reply
///
/// Models wrap JSON in markdown fences or surround it with prose despite
/// instructions. Takes the first fenced block (minus its language tag) if
/// any, then narrows to the span from the first `{` to the last `}`.
pub fn extract_json_object_text(response_text: &str) -> &str {
    let mut json_str = response_text;

    if let Some(block) = FENCE.find(response_text) {
        let block = block.as_str();
        let without_close = &block[..block.len() - 3];
        let tag_len = FENCE_TAG.find(without_close).map_or(3, |m| m.end());
        json_str = &without_close[tag_len..];
    }

    if let (Some(first_open), Some(last_close)) = (json_str.find('{'), json_str.rfind('}')) {
        if last_close > first_open {
            json_str = &json_str[first_open..=last_close];
        }
    }

    json_str
}
