/// AI Simulation Backend
///
/// Asks an LLM to act as a strict, deterministic C++17 compiler/runtime.
/// All stdin cases go out in one batched request; the reply must be JSON:
///
/// ```text
/// { "compile_error": string | null,
///   "case_results": [ { "stdout": string, "runtime_error": string | null } ] }
/// ```
///
/// **Model fallback:** the fast simulation model is tried first. If that call
/// fails with an error that looks like model unavailability, exactly one
/// retry goes to the more capable default model, still at temperature 0.
///
/// **Contract:** without a compile error, the number of case results must
/// equal the number of submitted cases. Anything else is an error, never a
/// silent truncation or padding.

use crate::llm::{extract_json_object_text, ChatClient, ChatOptions, LlmError};
use algomaster_common::types::{AiCaseResult, AiSimulatedExecution, ChatMessage};
use algomaster_common::RunnerConfig;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, instrument, warn};

#[derive(Debug, Error)]
pub enum SimulationError {
    #[error(transparent)]
    Llm(#[from] LlmError),

    #[error("AI simulation returned invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("AI simulation returned {actual} case results for {expected} stdin cases")]
    CaseCountMismatch { expected: usize, actual: usize },
}

const SYSTEM_PROMPT: &str = "You are a strict and deterministic C++17 compiler/runtime simulator.
Return ONLY valid JSON with no markdown and no extra keys.";

/// Substrings marking an error as "the requested model is not usable"
const MODEL_UNAVAILABLE_MARKERS: [&str; 4] = ["model", "unsupported", "not found", "unavailable"];

fn build_user_prompt(code: &str, stdin_cases: &[String]) -> String {
    let cases_json = serde_json::to_string_pretty(stdin_cases).unwrap_or_else(|_| "[]".to_string());
    format!(
        r#"
Simulate this C++ code against each stdin case in order.

C++ code:
```cpp
{code}
```

stdin_cases_json:
{cases_json}

Rules:
1. First do compile checking exactly like a strict C++17 compiler:
   - Syntax/parsing errors
   - Missing symbols/includes
   - Type errors and signature mismatches
   - Any other compile-time error
2. If code does not compile, return "compile_error" (string) and set "case_results" to [].
3. If code compiles, set "compile_error" to null.
4. For each stdin case, return one object in "case_results" with:
   - "stdout": exact output text from stdout (string, can be empty)
   - "runtime_error": null when none, otherwise a short error message
5. Simulate stdin/stdout behavior faithfully (token parsing like std::cin >> by whitespace).
6. Keep case_results length exactly equal to stdin_cases_json length when compile_error is null.
7. Be conservative: if uncertain about a case, prefer runtime_error over invented stdout.
8. No explanations. JSON only.

Required output format:
{{
  "compile_error": null,
  "case_results": [
    {{ "stdout": "text", "runtime_error": null }}
  ]
}}"#
    )
}

/// Whether a failed call should be retried against the fallback model
pub fn is_model_unavailable(error: &LlmError) -> bool {
    let message = error.to_string().to_lowercase();
    MODEL_UNAVAILABLE_MARKERS.iter().any(|marker| message.contains(marker))
}

#[derive(Debug, Deserialize)]
struct RawExecution {
    #[serde(default)]
    compile_error: serde_json::Value,
    #[serde(default)]
    case_results: serde_json::Value,
}

/// Parse a model reply into a simulated execution
///
/// Lenient about field types the way the model tends to drift: a non-string
/// `compile_error` or `runtime_error` counts as absent, a non-string `stdout`
/// is stringified, and a missing `case_results` is an empty list.
pub fn parse_simulation(response_text: &str) -> Result<AiSimulatedExecution, SimulationError> {
    let raw: RawExecution = serde_json::from_str(extract_json_object_text(response_text))?;

    let compile_error = match raw.compile_error {
        serde_json::Value::String(s) => Some(s),
        _ => None,
    };

    let case_results = match raw.case_results {
        serde_json::Value::Array(items) => items.into_iter().map(parse_case_result).collect(),
        _ => Vec::new(),
    };

    Ok(AiSimulatedExecution { compile_error, case_results })
}

fn parse_case_result(item: serde_json::Value) -> AiCaseResult {
    let stdout = match item.get("stdout") {
        Some(serde_json::Value::String(s)) => s.clone(),
        None | Some(serde_json::Value::Null) => String::new(),
        Some(other) => other.to_string(),
    };
    let runtime_error = match item.get("runtime_error") {
        Some(serde_json::Value::String(s)) => Some(s.clone()),
        _ => None,
    };
    AiCaseResult { stdout, runtime_error }
}

/// Enforce the case-count contract on a parsed simulation
pub fn validate_simulation(
    execution: AiSimulatedExecution,
    case_count: usize,
) -> Result<AiSimulatedExecution, SimulationError> {
    if execution.compile_error.is_none() && execution.case_results.len() != case_count {
        return Err(SimulationError::CaseCountMismatch {
            expected: case_count,
            actual: execution.case_results.len(),
        });
    }
    Ok(execution)
}

pub struct Simulator {
    chat: ChatClient,
    simulation_model: String,
    fallback_model: String,
}

impl Simulator {
    pub fn new(chat: ChatClient, config: &RunnerConfig) -> Self {
        Self {
            chat,
            simulation_model: config.simulation_model.clone(),
            fallback_model: config.default_model.clone(),
        }
    }

    /// Simulate the program against every stdin case in a single request
    #[instrument(skip(self, code, stdin_cases), fields(cases = stdin_cases.len()))]
    pub async fn simulate(&self, code: &str, stdin_cases: &[String]) -> Result<AiSimulatedExecution, SimulationError> {
        let messages = vec![
            ChatMessage::system(SYSTEM_PROMPT),
            ChatMessage::user(build_user_prompt(code, stdin_cases)),
        ];

        let response_text = match self.chat.complete(&messages, &self.options(&self.simulation_model)).await {
            Ok(text) => text,
            Err(e) if is_model_unavailable(&e) => {
                warn!(
                    model = %self.simulation_model,
                    fallback = %self.fallback_model,
                    error = %e,
                    "Simulation model unavailable, retrying with fallback model"
                );
                self.chat.complete(&messages, &self.options(&self.fallback_model)).await?
            }
            Err(e) => return Err(e.into()),
        };

        debug!(response_len = response_text.len(), "Received simulation response");

        validate_simulation(parse_simulation(&response_text)?, stdin_cases.len())
    }

    fn options(&self, model: &str) -> ChatOptions {
        ChatOptions { json_mode: true, model: Some(model.to_string()), temperature: Some(0.0) }
    }
}
