/// Sandbox Engine - Remote Compile-and-Run Backend
///
/// **Core Responsibility:**
/// Send one program + one stdin to a Piston-compatible execution service and
/// classify the raw reply.
///
/// **Critical Architectural Boundary:**
/// - Engine knows HOW to reach the sandbox (HTTP, request shape, timeouts)
/// - Engine does NOT compare output
/// - Engine does NOT decide whether the run continues
/// - Engine returns a classified reply for the executor to act on
///
/// **Request Rules:**
/// - Exactly one test case per request, never batched
/// - Language `cpp`, version `10.2.0`, a single file named `solution`
/// - stdin is always sent, even when the source was wrapped for file I/O
///
/// **Reply Classification:**
/// - Non-zero compile exit code → compile error (global for the run)
/// - HTTP 401 with a whitelist message → endpoint rejection (global for the run)
/// - Other non-OK HTTP status → per-case API error
/// - Transport failure or unreadable body → per-case network error
/// - Non-zero run exit code with stderr → per-case runtime error
/// - Otherwise → stdout for comparison

use crate::evaluator::CaseOutput;
use algomaster_common::RunnerConfig;
use lazy_static::lazy_static;
use regex::Regex;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

const LANGUAGE: &str = "cpp";
const LANGUAGE_VERSION: &str = "10.2.0";
const SOURCE_FILE_NAME: &str = "solution";

#[derive(Debug, Serialize)]
struct SourceFile<'a> {
    name: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ExecuteRequest<'a> {
    language: &'a str,
    version: &'a str,
    files: Vec<SourceFile<'a>>,
    stdin: &'a str,
    compile_timeout: u64,
    run_timeout: u64,
}

/// One stage (compile or run) of a sandbox reply
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StageResult {
    #[serde(default)]
    pub code: Option<i64>,
    #[serde(default)]
    pub stdout: Option<String>,
    #[serde(default)]
    pub stderr: Option<String>,
    #[serde(default)]
    pub output: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExecuteResponse {
    #[serde(default)]
    pub compile: Option<StageResult>,
    #[serde(default)]
    pub run: Option<StageResult>,
}

/// Classified sandbox reply for one test case
#[derive(Debug, Clone, PartialEq)]
pub enum SandboxReply {
    /// The program did not compile; carries the compiler diagnostic
    CompileError(String),
    /// The endpoint only serves whitelisted clients
    Rejected { status: u16, body: String },
    /// Anything that is scoped to this one case
    Case(CaseOutput),
}

lazy_static! {
    static ref WHITELIST: Regex = Regex::new(r"(?i)white\s*-?\s*list").expect("valid whitelist regex");
}

/// Whether a non-OK reply means the endpoint rejects every request from us
pub fn is_whitelist_rejection(status: u16, body: &str) -> bool {
    status == StatusCode::UNAUTHORIZED.as_u16() && WHITELIST.is_match(body)
}

fn non_empty(text: &Option<String>) -> Option<&str> {
    text.as_deref().filter(|s| !s.is_empty())
}

/// Classify a successfully decoded sandbox reply
pub fn classify_response(response: ExecuteResponse) -> SandboxReply {
    if let Some(compile) = &response.compile {
        if compile.code != Some(0) {
            let diagnostic = non_empty(&compile.stderr).or(non_empty(&compile.output)).unwrap_or_default();
            return SandboxReply::CompileError(diagnostic.to_string());
        }
    }

    let run = response.run.unwrap_or_default();
    if run.code != Some(0) {
        if let Some(stderr) = non_empty(&run.stderr) {
            return SandboxReply::Case(CaseOutput::RuntimeError { message: stderr.to_string() });
        }
    }

    SandboxReply::Case(CaseOutput::Completed { stdout: run.stdout.unwrap_or_default() })
}

/// HTTP client for a Piston-compatible execution service
#[derive(Clone)]
pub struct SandboxEngine {
    http: reqwest::Client,
    url: String,
    compile_timeout_ms: u64,
    run_timeout_ms: u64,
}

impl SandboxEngine {
    pub fn new(http: reqwest::Client, config: &RunnerConfig) -> Self {
        Self {
            http,
            url: config.runner_url.clone(),
            compile_timeout_ms: config.compile_timeout_ms,
            run_timeout_ms: config.run_timeout_ms,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Compile and run `source` against `stdin`, classifying the reply
    ///
    /// Never fails: transport problems come back as a per-case network error.
    pub async fn execute_case(&self, source: &str, stdin: &str) -> SandboxReply {
        let request = ExecuteRequest {
            language: LANGUAGE,
            version: LANGUAGE_VERSION,
            files: vec![SourceFile { name: SOURCE_FILE_NAME, content: source }],
            stdin,
            compile_timeout: self.compile_timeout_ms,
            run_timeout: self.run_timeout_ms,
        };

        let response = match self.http.post(&self.url).json(&request).send().await {
            Ok(response) => response,
            Err(e) => {
                warn!(url = %self.url, error = %e, "Sandbox request failed");
                return SandboxReply::Case(CaseOutput::NetworkError { message: e.to_string() });
            }
        };

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(url = %self.url, status = status.as_u16(), "Sandbox returned non-OK status");
            if is_whitelist_rejection(status.as_u16(), &body) {
                return SandboxReply::Rejected { status: status.as_u16(), body };
            }
            return SandboxReply::Case(CaseOutput::ApiError { status: status.as_u16(), body });
        }

        match response.json::<ExecuteResponse>().await {
            Ok(data) => {
                debug!(
                    compile_code = ?data.compile.as_ref().and_then(|c| c.code),
                    run_code = ?data.run.as_ref().and_then(|r| r.code),
                    "Sandbox reply received"
                );
                classify_response(data)
            }
            Err(e) => {
                warn!(url = %self.url, error = %e, "Sandbox reply could not be decoded");
                SandboxReply::Case(CaseOutput::NetworkError { message: e.to_string() })
            }
        }
    }
}
