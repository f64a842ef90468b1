// HTTP route handlers for the AlgoMaster API

use algomaster_common::types::{ChatMessage, Problem, RunSummary, TestCase};
use algomaster_common::RunnerConfig;
use algomaster_engine::llm::ChatClient;
use algomaster_engine::{Executor, Tutor};
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::metrics;
use crate::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunRequest {
    pub code: String,
    /// Accepted for older clients; programs carry their own `main`
    #[serde(default)]
    pub function_name: Option<String>,
    pub test_cases: Vec<TestCase>,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub runner_url: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HintRequest {
    pub problem: Problem,
    pub code: String,
    #[serde(default)]
    pub history: Vec<ChatMessage>,
    #[serde(default)]
    pub question: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct HintResponse {
    pub hint: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackRequest {
    pub problem: Problem,
    pub code: String,
    pub summary: RunSummary,
    #[serde(default)]
    pub api_key: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct FeedbackResponse {
    pub feedback: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    pub prompt: String,
    #[serde(default)]
    pub api_key: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct GenerateResponse {
    pub problems: Vec<Problem>,
}

/// Server configuration with this request's overrides applied
///
/// Blank overrides keep the server's values. A runner URL outside the
/// server's allow-list is refused.
fn request_config(base: &RunnerConfig, api_key: Option<&str>, runner_url: Option<&str>) -> Result<RunnerConfig, String> {
    let mut config = base.clone();
    if let Some(key) = api_key.filter(|k| !k.trim().is_empty()) {
        config = config.with_api_key(key);
    }
    if let Some(url) = runner_url.filter(|u| !u.trim().is_empty()) {
        if !base.permits_runner_url(url) {
            return Err(format!("Runner URL {} is not allowed by this server", url.trim()));
        }
        config = config.with_runner_url(url);
    }
    Ok(config)
}

fn tutor_for(state: &AppState, api_key: Option<&str>) -> (Tutor, bool) {
    let mut config = state.config.clone();
    if let Some(key) = api_key.filter(|k| !k.trim().is_empty()) {
        config = config.with_api_key(key);
    }
    let has_key = config.has_api_key();
    (Tutor::new(ChatClient::new(state.http.clone(), &config)), has_key)
}

/// GET /health - Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

/// GET /metrics - Prometheus text exposition
pub async fn export_metrics() -> Response {
    match metrics::render() {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            body,
        )
            .into_response(),
        Err(e) => {
            error!(error = %e, "Failed to encode metrics");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

/// POST /run - Run code against test cases and return the summary
pub async fn run_code(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<RunRequest>,
) -> Response {
    let request_id = Uuid::new_v4();
    let config = match request_config(&state.config, payload.api_key.as_deref(), payload.runner_url.as_deref()) {
        Ok(config) => config,
        Err(message) => {
            warn!(request_id = %request_id, error = %message, "Run refused");
            return (StatusCode::BAD_REQUEST, Json(serde_json::json!({ "error": message }))).into_response();
        }
    };

    info!(
        request_id = %request_id,
        test_cases = payload.test_cases.len(),
        function_name = payload.function_name.as_deref().unwrap_or("main"),
        ai_simulation = config.has_api_key(),
        "Run requested"
    );

    let started = Instant::now();
    let executor = Executor::with_client(state.http.clone(), &config);
    let outcome = executor.execute(&payload.code, &payload.test_cases).await;

    metrics::record_run(&outcome.backend.to_string(), &outcome.summary, started.elapsed());

    info!(
        request_id = %request_id,
        backend = %outcome.backend,
        passed = outcome.summary.passed,
        total = outcome.summary.total,
        "Run finished"
    );

    (StatusCode::OK, Json(outcome.summary)).into_response()
}

/// POST /hint - Ask the tutor about the current problem
pub async fn hint(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<HintRequest>,
) -> impl IntoResponse {
    let (tutor, _) = tutor_for(&state, payload.api_key.as_deref());
    let hint = tutor
        .hint(&payload.problem, &payload.code, &payload.history, payload.question.as_deref())
        .await;
    Json(HintResponse { hint })
}

/// POST /feedback - Explain a run's failures
pub async fn feedback(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<FeedbackRequest>,
) -> impl IntoResponse {
    let (tutor, _) = tutor_for(&state, payload.api_key.as_deref());
    let feedback = tutor.feedback(&payload.problem, &payload.code, &payload.summary).await;
    Json(FeedbackResponse { feedback })
}

/// POST /problems/generate - Generate new practice problems
pub async fn generate_problems(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<GenerateRequest>,
) -> Response {
    let (tutor, has_key) = tutor_for(&state, payload.api_key.as_deref());
    if !has_key {
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({
                "error": "OpenRouter API key not configured. Please provide an API key."
            })),
        )
            .into_response();
    }

    match tutor.generate_problems(&payload.prompt).await {
        Ok(problems) => {
            info!(count = problems.len(), "Problems generated");
            (StatusCode::OK, Json(GenerateResponse { problems })).into_response()
        }
        Err(e) => {
            error!(error = %e, "Problem generation failed");
            (
                StatusCode::BAD_GATEWAY,
                Json(serde_json::json!({
                    "error": format!("Failed to generate problems: {}", e)
                })),
            )
                .into_response()
        }
    }
}
