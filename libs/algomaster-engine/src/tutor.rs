//! AI tutor: problem generation, run feedback and hints
//!
//! Feedback and hints never fail from the caller's point of view; a broken
//! LLM call degrades to a fixed encouragement so the practice loop goes on.
//! Problem generation does fail, since there is nothing sensible to return.

use crate::llm::{extract_json_object_text, ChatClient, ChatOptions, LlmError};
use algomaster_common::types::{ChatMessage, Problem, RunSummary, TestCase, Value};
use serde::Deserialize;
use thiserror::Error;
use tracing::{instrument, warn};

pub const FEEDBACK_FALLBACK: &str = "Unable to generate feedback.";
pub const FEEDBACK_EMPTY: &str = "Keep going!";
pub const HINT_FALLBACK: &str = "Unable to get hint. Check your approach and edge cases!";
pub const HINT_EMPTY: &str = "Try thinking about what data structure would help here.";
pub const DEFAULT_HINT_QUESTION: &str = "I'm stuck. What approach should I consider?";

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error(transparent)]
    Llm(#[from] LlmError),

    #[error("Invalid response format: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("Invalid response format: 'problems' array missing.")]
    MissingProblems,

    #[error("Invalid response format: problem \"{0}\" is missing testCases.")]
    MissingTestCases(String),
}

const GENERATOR_SYSTEM_PROMPT: &str =
    "You are a C++ coding interview generator. Output ONLY valid JSON, no markdown.";

const HINT_SYSTEM_PROMPT: &str = "You are a straightforward coding tutor helping a student solve a C++ problem.

RULES:
- Be direct and helpful - no fluff
- Give clear, actionable guidance
- You can mention specific techniques, data structures (like unordered_map, vector, etc.), or STL algorithms to try
- If they ask a follow-up question, answer it directly
- Don't write the full solution, but you can show small code snippets or examples if it helps explain a concept
- Keep responses concise (2-4 sentences usually)";

fn generator_prompt(user_prompt: &str) -> String {
    format!(
        r##"
User Request: "{user_prompt}"

Generate a list of C++ coding problems based on the user's request.
If the user does not specify a quantity, generate at least 3 problems.

For EACH problem, provide:
1. A clear, Markdown-formatted description. Include strict Input/Output format specifications (e.g. "Line 1: Two integers...").
2. A C++ starter code template with a `main` function and standard includes.
3. Exactly 25 diverse test cases covering edge cases.
4. Deterministic solutions.

CRITICAL:
- 'input_json' must be valid JSON arguments. Note: The system converts arrays to "Length Elements..." in stdin automatically.
- 'expected_json' must be valid JSON return value.
- Use standard C++ types.

Output strictly in this JSON format:
{{
  "problems": [
    {{
      "title": "Problem Title",
      "description": "Markdown description. Explicitly state Input/Output format.",
      "difficulty": "Beg/Easy/Med/Hard",
      "functionName": "main",
      "starterCode": "#include <bits/stdc++.h>\nusing namespace std;\n\nint main() {{\n    // Your code here\n    return 0;\n}}",
      "testCases": [
        {{ "input_json": "[[1, 2], 9]", "expected_json": "[0, 1]" }}
      ]
    }}
  ]
}}"##
    )
}

#[derive(Debug, Deserialize)]
struct GeneratedCatalog {
    problems: Option<Vec<GeneratedProblem>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeneratedProblem {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    description: String,
    #[serde(default)]
    difficulty: String,
    #[serde(default)]
    function_name: Option<String>,
    #[serde(default)]
    starter_code: String,
    #[serde(default)]
    test_cases: Vec<GeneratedTestCase>,
}

#[derive(Debug, Deserialize)]
struct GeneratedTestCase {
    #[serde(default)]
    input_json: serde_json::Value,
    #[serde(default)]
    expected_json: serde_json::Value,
}

/// Decode a JSON-encoded field, keeping the raw text when it is not JSON
fn decode_json_field(raw: serde_json::Value) -> serde_json::Value {
    match raw {
        serde_json::Value::String(text) => serde_json::from_str(&text).unwrap_or_else(|_| {
            warn!(raw = %text, "Generated test case field is not valid JSON; keeping raw text");
            serde_json::Value::String(text)
        }),
        other => other,
    }
}

fn convert_test_case(tc: GeneratedTestCase) -> TestCase {
    let input = match Value::from(decode_json_field(tc.input_json)) {
        Value::List(args) => args,
        single => vec![single],
    };
    TestCase { input, expected: Value::from(decode_json_field(tc.expected_json)) }
}

/// Parse a generator reply into problems
pub fn parse_generated_problems(response_text: &str) -> Result<Vec<Problem>, GenerationError> {
    let catalog: GeneratedCatalog = serde_json::from_str(extract_json_object_text(response_text))?;
    let generated = catalog.problems.ok_or(GenerationError::MissingProblems)?;

    generated
        .into_iter()
        .map(|prob| {
            let title = prob.title.unwrap_or_else(|| "Untitled".to_string());
            if prob.test_cases.is_empty() {
                return Err(GenerationError::MissingTestCases(title));
            }
            Ok(Problem {
                title,
                description: prob.description,
                difficulty: prob.difficulty,
                function_name: prob.function_name.unwrap_or_else(|| "main".to_string()),
                starter_code: prob.starter_code,
                test_cases: prob.test_cases.into_iter().map(convert_test_case).collect(),
                user_code: None,
                completed: false,
                completed_date: None,
            })
        })
        .collect()
}

fn feedback_prompt(problem: &Problem, user_code: &str, summary: &RunSummary) -> String {
    let failed: Vec<_> = summary.results.iter().filter(|r| !r.passed).take(3).collect();
    let failures = serde_json::to_string(&failed).unwrap_or_else(|_| "[]".to_string());

    format!(
        r####"
The user is solving: "{title}".

User's C++ Code:
```cpp
{user_code}
```

Test Results: Passed {passed}/{total}.
Failures: {failures}
Error: {error}

INSTRUCTIONS:
1. **Analyze the user's code** and identify why it failed the specific test cases or produced the error.
2. **Prioritize FIXING** the user's existing logic/approach if possible, rather than suggesting a completely different solution. Only suggest a new approach if the current one is fundamentally flawed.
3. **Format your response** using clear Markdown:
   - Use **Bold** for key terms, variable names, and emphasis.
   - Use `Code blocks` for code snippets.
   - Use > Blockquotes for important notes.
   - Use ### Headers to structure your feedback (e.g., "### Error Analysis", "### Suggested Fix").
4. Provide a **Corrected Code Snippet** at the end that fixes the specific issue.

Keep the explanation concise but helpful.
"####,
        title = problem.title,
        passed = summary.passed,
        total = summary.total,
        error = summary.error.as_deref().unwrap_or("None"),
    )
}

/// Build the hint conversation sent to the model
pub fn hint_messages(
    problem: &Problem,
    user_code: &str,
    history: &[ChatMessage],
    question: Option<&str>,
) -> Vec<ChatMessage> {
    let context = format!(
        "\nProblem: **{}** ({})\n\n{}\n\nCurrent code:\n```cpp\n{}\n```",
        problem.title, problem.difficulty, problem.description, user_code
    );

    let mut messages = vec![ChatMessage::system(HINT_SYSTEM_PROMPT), ChatMessage::user(context)];
    messages.extend(history.iter().cloned());

    match question {
        Some(q) => messages.push(ChatMessage::user(q)),
        None if history.is_empty() => messages.push(ChatMessage::user(DEFAULT_HINT_QUESTION)),
        None => {}
    }

    messages
}

#[derive(Clone)]
pub struct Tutor {
    chat: ChatClient,
}

impl Tutor {
    pub fn new(chat: ChatClient) -> Self {
        Self { chat }
    }

    /// Generate new practice problems from a free-form request
    #[instrument(skip(self, user_prompt))]
    pub async fn generate_problems(&self, user_prompt: &str) -> Result<Vec<Problem>, GenerationError> {
        let messages = vec![ChatMessage::system(GENERATOR_SYSTEM_PROMPT), ChatMessage::user(generator_prompt(user_prompt))];
        let options = ChatOptions { json_mode: true, ..Default::default() };

        let response_text = self.chat.complete(&messages, &options).await?;
        parse_generated_problems(&response_text)
    }

    /// Explain a run's failures and suggest a fix
    #[instrument(skip_all, fields(problem = %problem.title))]
    pub async fn feedback(&self, problem: &Problem, user_code: &str, summary: &RunSummary) -> String {
        let messages = vec![ChatMessage::user(feedback_prompt(problem, user_code, summary))];

        match self.chat.complete(&messages, &ChatOptions::default()).await {
            Ok(text) if text.trim().is_empty() => FEEDBACK_EMPTY.to_string(),
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, "Feedback request failed");
                FEEDBACK_FALLBACK.to_string()
            }
        }
    }

    /// Answer a question (or give a first nudge) about the current problem
    #[instrument(skip_all, fields(problem = %problem.title, turns = history.len()))]
    pub async fn hint(
        &self,
        problem: &Problem,
        user_code: &str,
        history: &[ChatMessage],
        question: Option<&str>,
    ) -> String {
        let messages = hint_messages(problem, user_code, history, question);

        match self.chat.complete(&messages, &ChatOptions::default()).await {
            Ok(text) if text.trim().is_empty() => HINT_EMPTY.to_string(),
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, "Hint request failed");
                HINT_FALLBACK.to_string()
            }
        }
    }
}
