/// Test Evaluator - Backend-Agnostic Comparison Logic
///
/// **Core Responsibility:**
/// Compare raw program outputs against expected values and build results.
///
/// **Critical Properties:**
/// - Knows nothing about HTTP
/// - Knows nothing about which backend produced the output
/// - Pure functions: (raw outputs, expected values) → results
///
/// **Normalization Rules:**
/// - Expected values are flattened depth-first, without length prefixes
/// - Output is trimmed and split on any run of whitespace (spaces, tabs, \n, \r\n)
/// - Tokens compare as exact text: "10" does not match "10.0"
/// - Token count and order must match
///
/// **Aggregation Rules:**
/// - passed = number of passing results
/// - total = number of submitted test cases, even when the run stopped early
/// - A compile error yields no per-case results at all

use algomaster_common::types::{
    RunSummary, TestResult, Value, ACTUAL_API_ERROR, ACTUAL_COMPILATION_ERROR, ACTUAL_NETWORK_ERROR, ACTUAL_RUNTIME_ERROR,
};

/// Raw outcome of a single test case, as reported by a backend
#[derive(Debug, Clone, PartialEq)]
pub enum CaseOutput {
    /// Program ran to completion; stdout is compared
    Completed { stdout: String },
    /// Program crashed or reported an error
    RuntimeError { message: String },
    /// Backend answered with a non-OK HTTP status
    ApiError { status: u16, body: String },
    /// Backend could not be reached or its reply was unreadable
    NetworkError { message: String },
}

/// Split raw output into comparison tokens
pub fn normalize_output(output: &str) -> Vec<String> {
    output.split_whitespace().map(str::to_string).collect()
}

/// Flatten an expected value into comparison tokens
///
/// Nested arrays flatten in element order. Each scalar goes through the
/// same whitespace split as program output, so a string element like
/// "Hello USACO" yields two tokens.
pub fn flatten_expected(expected: &Value) -> Vec<String> {
    let mut parts = Vec::new();
    collect_scalars(expected, &mut parts);
    normalize_output(&parts.join(" "))
}

fn collect_scalars(value: &Value, parts: &mut Vec<String>) {
    match value {
        Value::List(items) => items.iter().for_each(|item| collect_scalars(item, parts)),
        scalar => parts.push(scalar.to_string()),
    }
}

/// Positional token comparison
pub fn tokens_match<A: AsRef<str>, B: AsRef<str>>(actual: &[A], expected: &[B]) -> bool {
    actual.len() == expected.len()
        && actual.iter().zip(expected).all(|(a, e)| a.as_ref() == e.as_ref())
}

/// Evaluate a single test case
///
/// ## Arguments
/// * `stdin` - The exact stdin fed to the program
/// * `expected` - Expected value from the test case
/// * `output` - Raw outcome reported by the backend
pub fn evaluate_test(stdin: &str, expected: &Value, output: &CaseOutput) -> TestResult {
    let expected_tokens = flatten_expected(expected);

    let (passed, actual, error) = match output {
        CaseOutput::Completed { stdout } => {
            let actual_tokens = normalize_output(stdout);
            (tokens_match(&actual_tokens, &expected_tokens), actual_tokens.join(" "), None)
        }
        CaseOutput::RuntimeError { message } => {
            (false, ACTUAL_RUNTIME_ERROR.to_string(), Some(message.clone()))
        }
        CaseOutput::ApiError { status, body } => (
            false,
            ACTUAL_API_ERROR.to_string(),
            Some(format!("API Error: {} - {}", status, body)),
        ),
        CaseOutput::NetworkError { message } => {
            (false, ACTUAL_NETWORK_ERROR.to_string(), Some(message.clone()))
        }
    };

    TestResult {
        passed,
        input: stdin.to_string(),
        expected: expected_tokens.join(" "),
        actual,
        error,
        execution_time: 0,
    }
}

/// Aggregate per-case results into the run summary
pub fn aggregate_results(total: usize, results: Vec<TestResult>) -> RunSummary {
    let passed = results.iter().filter(|r| r.passed).count();
    RunSummary { total, passed, results, error: None }
}

/// Summary for a run stopped by a compiler failure
pub fn compile_error_summary(total: usize, diagnostic: &str) -> RunSummary {
    RunSummary {
        total,
        passed: 0,
        results: Vec::new(),
        error: Some(format!("{}:\n{}", ACTUAL_COMPILATION_ERROR, diagnostic)),
    }
}

/// Summary for a run stopped by an infrastructure failure
///
/// Results gathered before the failure are kept so partial progress stays visible.
pub fn global_error_summary(total: usize, results: Vec<TestResult>, message: String) -> RunSummary {
    RunSummary { error: Some(message), ..aggregate_results(total, results) }
}
