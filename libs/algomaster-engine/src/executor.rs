/// Run Executor - High-Level Orchestration
///
/// **Responsibility:**
/// Pick a backend, feed it every test case, and produce the final summary.
///
/// **State machine:**
/// ```text
/// SelectBackend ──key configured──▶ Simulate ──ok──────────────▶ Done
///       │                             │
///       │                             └──unavailable(reason)──┐
///       └──no key─────────────────────────────────────────────▶ Sandbox ──▶ Done
/// ```
/// - Simulate sends all cases in one batched request
/// - Sandbox runs cases strictly one after another, pausing before every
///   request but the first, and stops early on a compile error or when the
///   endpoint rejects us outright
///
/// This module is the glue layer - it knows nothing about:
/// - How requests are shaped (engine's and simulator's job)
/// - How output is compared (evaluator's job)

use crate::engine::{SandboxEngine, SandboxReply};
use crate::evaluator::{self, CaseOutput};
use crate::llm::ChatClient;
use crate::rewriter;
use crate::serializer::serialize_input;
use crate::simulator::Simulator;
use algomaster_common::types::{AiSimulatedExecution, RunSummary, TestCase};
use algomaster_common::RunnerConfig;
use std::fmt;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

/// Which backend produced a summary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Simulation,
    Sandbox,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendKind::Simulation => write!(f, "simulation"),
            BackendKind::Sandbox => write!(f, "sandbox"),
        }
    }
}

/// Result of trying a backend that is allowed to fail over
#[derive(Debug, Clone, PartialEq)]
pub enum BackendOutcome {
    Completed(RunSummary),
    /// The backend could not produce a trustworthy answer
    Unavailable(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunOutcome {
    pub backend: BackendKind,
    pub summary: RunSummary,
}

enum RunState {
    SelectBackend,
    Simulate,
    Sandbox { ai_error: Option<String> },
    Done(RunOutcome),
}

/// Build the shared HTTP client used by both backends
pub fn build_http_client(config: &RunnerConfig) -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder()
        .timeout(config.http_timeout)
        .user_agent(concat!("algomaster-engine/", env!("CARGO_PKG_VERSION")))
        .build()
}

pub struct Executor {
    sandbox: SandboxEngine,
    simulator: Option<Simulator>,
    request_delay: Duration,
}

impl Executor {
    pub fn new(config: &RunnerConfig) -> Result<Self, reqwest::Error> {
        Ok(Self::with_client(build_http_client(config)?, config))
    }

    /// Build an executor around an existing client; the simulator is only
    /// enabled when an API key is configured
    pub fn with_client(http: reqwest::Client, config: &RunnerConfig) -> Self {
        let simulator = config
            .has_api_key()
            .then(|| Simulator::new(ChatClient::new(http.clone(), config), config));

        Self {
            sandbox: SandboxEngine::new(http, config),
            simulator,
            request_delay: config.request_delay,
        }
    }

    /// Run every test case and summarize
    pub async fn run(&self, code: &str, test_cases: &[TestCase]) -> RunSummary {
        self.execute(code, test_cases).await.summary
    }

    /// Run every test case, also reporting which backend answered
    #[instrument(skip(self, code, test_cases), fields(run_id = %Uuid::new_v4(), cases = test_cases.len()))]
    pub async fn execute(&self, code: &str, test_cases: &[TestCase]) -> RunOutcome {
        let stdin_cases: Vec<String> = test_cases.iter().map(|tc| serialize_input(&tc.input)).collect();

        let mut state = RunState::SelectBackend;
        loop {
            state = match state {
                RunState::SelectBackend => {
                    if self.simulator.is_some() {
                        RunState::Simulate
                    } else {
                        RunState::Sandbox { ai_error: None }
                    }
                }
                RunState::Simulate => match self.run_simulation(code, test_cases, &stdin_cases).await {
                    BackendOutcome::Completed(summary) => {
                        RunState::Done(RunOutcome { backend: BackendKind::Simulation, summary })
                    }
                    BackendOutcome::Unavailable(reason) => {
                        warn!(error = %reason, "AI simulation failed, falling back to sandbox");
                        RunState::Sandbox { ai_error: Some(reason) }
                    }
                },
                RunState::Sandbox { ai_error } => {
                    let summary = self.run_sandbox(code, test_cases, &stdin_cases, ai_error.as_deref()).await;
                    RunState::Done(RunOutcome { backend: BackendKind::Sandbox, summary })
                }
                RunState::Done(outcome) => {
                    info!(
                        backend = %outcome.backend,
                        total = outcome.summary.total,
                        passed = outcome.summary.passed,
                        global_error = outcome.summary.error.is_some(),
                        "Run completed"
                    );
                    return outcome;
                }
            };
        }
    }

    async fn run_simulation(&self, code: &str, test_cases: &[TestCase], stdin_cases: &[String]) -> BackendOutcome {
        let Some(simulator) = &self.simulator else {
            return BackendOutcome::Unavailable("AI simulation is not configured".to_string());
        };

        match simulator.simulate(code, stdin_cases).await {
            Ok(execution) => BackendOutcome::Completed(summarize_simulation(test_cases, stdin_cases, execution)),
            Err(e) => BackendOutcome::Unavailable(e.to_string()),
        }
    }

    async fn run_sandbox(
        &self,
        code: &str,
        test_cases: &[TestCase],
        stdin_cases: &[String],
        ai_error: Option<&str>,
    ) -> RunSummary {
        let total = test_cases.len();
        let mut results = Vec::with_capacity(total);
        let mut runner_answered = false;

        for (idx, (test_case, stdin)) in test_cases.iter().zip(stdin_cases).enumerate() {
            if idx > 0 && !self.request_delay.is_zero() {
                tokio::time::sleep(self.request_delay).await;
            }

            let source = match rewriter::prepare_source(code, stdin) {
                Ok(source) => source,
                Err(e) => return evaluator::global_error_summary(total, results, e.to_string()),
            };

            let output = match self.sandbox.execute_case(&source, stdin).await {
                SandboxReply::Case(output) => output,
                SandboxReply::CompileError(diagnostic) => {
                    info!(case = idx + 1, "Compilation failed; skipping remaining cases");
                    return evaluator::compile_error_summary(total, &diagnostic);
                }
                SandboxReply::Rejected { status, body } => {
                    let message = rejection_message(self.sandbox.url(), status, &body, ai_error);
                    warn!(case = idx + 1, url = %self.sandbox.url(), "Runner endpoint rejected the request");
                    return evaluator::global_error_summary(total, results, message);
                }
            };

            runner_answered |= matches!(output, CaseOutput::Completed { .. } | CaseOutput::RuntimeError { .. });
            let result = evaluator::evaluate_test(stdin, &test_case.expected, &output);
            debug!(case = idx + 1, passed = result.passed, actual = %result.actual, "Case evaluated");
            results.push(result);
        }

        // Neither backend produced a program result
        match ai_error {
            Some(ai_error) if total > 0 && !runner_answered => {
                warn!(url = %self.sandbox.url(), "Sandbox fallback failed for every case");
                evaluator::global_error_summary(total, results, fallback_failed_message(ai_error))
            }
            _ => evaluator::aggregate_results(total, results),
        }
    }
}

/// Turn a validated simulation into a summary
pub fn summarize_simulation(
    test_cases: &[TestCase],
    stdin_cases: &[String],
    execution: AiSimulatedExecution,
) -> RunSummary {
    let total = test_cases.len();
    if let Some(diagnostic) = execution.compile_error {
        return evaluator::compile_error_summary(total, &diagnostic);
    }

    let results = test_cases
        .iter()
        .zip(stdin_cases)
        .zip(execution.case_results)
        .map(|((test_case, stdin), case)| {
            let output = match case.runtime_error {
                Some(message) => CaseOutput::RuntimeError { message },
                None => CaseOutput::Completed { stdout: case.stdout },
            };
            evaluator::evaluate_test(stdin, &test_case.expected, &output)
        })
        .collect();

    evaluator::aggregate_results(total, results)
}

fn rejection_message(url: &str, status: u16, body: &str, ai_error: Option<&str>) -> String {
    let mut message = format!(
        "Runner API at {} rejected the request (HTTP {}): {}\nThis endpoint only accepts whitelisted clients; configure a runner URL you have access to.",
        url,
        status,
        body.trim()
    );
    if let Some(ai_error) = ai_error {
        message.push('\n');
        message.push_str(&fallback_failed_message(ai_error));
    }
    message
}

fn fallback_failed_message(ai_error: &str) -> String {
    format!("AI simulation fallback also failed: {}", ai_error)
}

/// Run `code` against `test_cases` with the given configuration
///
/// `_function_name` is accepted for compatibility with callers that still
/// pass it; submissions are whole programs with their own `main`.
pub async fn run_cpp_code(
    config: &RunnerConfig,
    code: &str,
    _function_name: &str,
    test_cases: &[TestCase],
) -> Result<RunSummary, reqwest::Error> {
    Ok(Executor::new(config)?.run(code, test_cases).await)
}
