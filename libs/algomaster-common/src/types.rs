use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Sentinel placed in `TestResult::actual` when the sandbox reports a compiler failure
pub const ACTUAL_COMPILATION_ERROR: &str = "Compilation Error";
/// Sentinel placed in `TestResult::actual` when the program crashed
pub const ACTUAL_RUNTIME_ERROR: &str = "Runtime Error";
/// Sentinel placed in `TestResult::actual` when the runner answered with a non-OK status
pub const ACTUAL_API_ERROR: &str = "API Error";
/// Sentinel placed in `TestResult::actual` when the runner could not be reached
pub const ACTUAL_NETWORK_ERROR: &str = "Network Error";

/// A test-case argument or expected value, in the JSON shapes problem files use
///
/// Variant order matters for untagged deserialization: integers are tried
/// before floats so `5` stays `Int(5)` and prints without a decimal point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    List(Vec<Value>),
}

/// Format a float the way JavaScript's `String(x)` does
///
/// Magnitudes from 1e-6 up to 1e21 print as plain decimals; anything
/// outside that range switches to exponent form with an explicit sign.
fn js_number(x: f64) -> String {
    if x.is_nan() {
        return "NaN".to_string();
    }
    if x.is_infinite() {
        return if x > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if x == 0.0 {
        return "0".to_string();
    }

    let magnitude = x.abs();
    if (1e-6..1e21).contains(&magnitude) {
        // f64 Display already drops a zero fraction (2.0 -> "2")
        return x.to_string();
    }

    let exponent_form = format!("{:e}", x);
    match exponent_form.split_once('e') {
        Some((mantissa, exp)) if !exp.starts_with('-') => format!("{}e+{}", mantissa, exp),
        _ => exponent_form,
    }
}

/// Scalars print like JavaScript's `String(x)`.
/// Lists print their elements comma-joined, which only matters for log output.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(n) => write!(f, "{}", n),
            Value::Float(x) => f.write_str(&js_number(*x)),
            Value::Text(s) => f.write_str(s),
            Value::List(items) => {
                for (idx, item) in items.iter().enumerate() {
                    if idx > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{}", item)?;
                }
                Ok(())
            }
        }
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::List(items.into_iter().map(Into::into).collect())
    }
}

/// Converts loosely-typed JSON (e.g. produced by an LLM) into a `Value`.
/// Objects have no stdin encoding, so they are kept as their JSON text.
impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Float(n.as_f64().unwrap_or(0.0)),
            },
            serde_json::Value::String(s) => Value::Text(s),
            serde_json::Value::Array(items) => {
                Value::List(items.into_iter().map(Value::from).collect())
            }
            obj @ serde_json::Value::Object(_) => Value::Text(obj.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestCase {
    /// Arguments, serialized in order onto stdin
    pub input: Vec<Value>,
    pub expected: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestResult {
    pub passed: bool,
    /// Exact stdin fed to the program
    pub input: String,
    /// Flattened expected tokens, space-joined
    pub expected: String,
    /// Flattened actual tokens, or one of the `ACTUAL_*` sentinels
    pub actual: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default)]
    pub execution_time: u64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RunSummary {
    pub total: usize,
    pub passed: usize,
    pub results: Vec<TestResult>,
    /// Global error: compile failure or an endpoint rejecting every request
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RunSummary {
    pub fn all_passed(&self) -> bool {
        self.error.is_none() && self.passed == self.total
    }
}

/// One simulated stdin case as reported by the model
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AiCaseResult {
    pub stdout: String,
    pub runtime_error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AiSimulatedExecution {
    pub compile_error: Option<String>,
    pub case_results: Vec<AiCaseResult>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Problem {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub difficulty: String,
    #[serde(default = "default_function_name")]
    pub function_name: String,
    #[serde(default)]
    pub starter_code: String,
    pub test_cases: Vec<TestCase>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_code: Option<String>,
    #[serde(default)]
    pub completed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_date: Option<DateTime<Utc>>,
}

fn default_function_name() -> String {
    "main".to_string()
}

impl Problem {
    /// The code the user is currently working on
    pub fn current_code(&self) -> &str {
        self.user_code.as_deref().unwrap_or(&self.starter_code)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: ChatRole::System, content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: ChatRole::User, content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: ChatRole::Assistant, content: content.into() }
    }
}
