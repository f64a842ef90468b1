/// Integration tests for the run pipeline against mock HTTP services
///
/// These tests verify end-to-end behaviour of both backends:
/// 1. Sandbox runs cases one request at a time and aggregates results
/// 2. Compile errors and whitelist rejections stop the run
/// 3. Per-case API and network failures do not stop the run
/// 4. AI simulation answers when it can and falls back when it cannot
/// 5. File-I/O programs are wrapped before submission

#[cfg(test)]
mod sandbox_tests {
    use crate::executor::{BackendKind, Executor};
    use crate::run_cpp_code;
    use algomaster_common::types::{TestCase, Value, ACTUAL_API_ERROR, ACTUAL_NETWORK_ERROR, ACTUAL_RUNTIME_ERROR};
    use algomaster_common::RunnerConfig;
    use serde_json::json;
    use std::time::{Duration, Instant};
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const ADD_PROGRAM: &str = r#"
#include <iostream>
int main() { int a, b; std::cin >> a >> b; std::cout << a + b << std::endl; }
"#;

    fn config(server: &MockServer) -> RunnerConfig {
        RunnerConfig::default()
            .with_runner_url(format!("{}/execute", server.uri()))
            .with_request_delay(Duration::ZERO)
    }

    fn ok_run(stdout: &str) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(json!({
            "language": "c++",
            "version": "10.2.0",
            "compile": {"code": 0, "stdout": "", "stderr": "", "output": ""},
            "run": {"code": 0, "signal": null, "stdout": stdout, "stderr": "", "output": stdout}
        }))
    }

    fn add_case(a: i64, b: i64, expected: i64) -> TestCase {
        TestCase { input: vec![Value::Int(a), Value::Int(b)], expected: Value::Int(expected) }
    }

    async fn mount_stdin(server: &MockServer, stdin: &str, response: ResponseTemplate) {
        Mock::given(method("POST"))
            .and(path("/execute"))
            .and(body_partial_json(json!({"stdin": stdin})))
            .respond_with(response)
            .expect(1)
            .mount(server)
            .await;
    }

    /// Test: Passing and failing cases through the sandbox
    #[tokio::test]
    async fn test_sandbox_scores_each_case() {
        let server = MockServer::start().await;
        mount_stdin(&server, "5 3", ok_run("8\n")).await;
        mount_stdin(&server, "2 2", ok_run("5\n")).await;

        let executor = Executor::new(&config(&server)).unwrap();
        let outcome = executor.execute(ADD_PROGRAM, &[add_case(5, 3, 8), add_case(2, 2, 4)]).await;

        assert_eq!(outcome.backend, BackendKind::Sandbox);
        let summary = outcome.summary;
        assert_eq!(summary.total, 2);
        assert_eq!(summary.passed, 1);
        assert_eq!(summary.error, None);
        assert_eq!(summary.results[0].input, "5 3");
        assert_eq!(summary.results[0].actual, "8");
        assert!(summary.results[0].passed);
        assert_eq!(summary.results[1].expected, "4");
        assert_eq!(summary.results[1].actual, "5");
        assert!(!summary.results[1].passed);
    }

    /// Test: Request body follows the runner's execute contract
    #[tokio::test]
    async fn test_sandbox_request_shape() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/execute"))
            .and(body_partial_json(json!({
                "language": "cpp",
                "version": "10.2.0",
                "files": [{"name": "solution", "content": ADD_PROGRAM}],
                "stdin": "5 3",
                "compile_timeout": 10000,
                "run_timeout": 5000
            })))
            .respond_with(ok_run("8"))
            .expect(1)
            .mount(&server)
            .await;

        let summary = run_cpp_code(&config(&server), ADD_PROGRAM, "main", &[add_case(5, 3, 8)]).await.unwrap();
        assert!(summary.all_passed());
    }

    /// Test: A compile error stops the run after the first request
    #[tokio::test]
    async fn test_compile_error_short_circuits() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/execute"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "compile": {"code": 1, "stdout": "", "stderr": "solution.cpp:2: error: expected ';'", "output": ""},
                "run": {"code": null, "stdout": "", "stderr": ""}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let executor = Executor::new(&config(&server)).unwrap();
        let cases = vec![add_case(1, 1, 2), add_case(2, 2, 4), add_case(3, 3, 6)];
        let summary = executor.run("int main() { return 0 }", &cases).await;

        assert_eq!(summary.total, 3);
        assert_eq!(summary.passed, 0);
        assert!(summary.results.is_empty());
        assert_eq!(summary.error.as_deref(), Some("Compilation Error:\nsolution.cpp:2: error: expected ';'"));
    }

    /// Test: Non-OK status and runtime crash are scoped to their case
    #[tokio::test]
    async fn test_per_case_failures_continue() {
        let server = MockServer::start().await;
        mount_stdin(&server, "1 1", ResponseTemplate::new(500).set_body_string("boom")).await;
        mount_stdin(
            &server,
            "2 2",
            ResponseTemplate::new(200).set_body_json(json!({
                "compile": {"code": 0},
                "run": {"code": 139, "stdout": "", "stderr": "Segmentation fault"}
            })),
        )
        .await;
        mount_stdin(&server, "3 3", ok_run("6")).await;

        let executor = Executor::new(&config(&server)).unwrap();
        let cases = vec![add_case(1, 1, 2), add_case(2, 2, 4), add_case(3, 3, 6)];
        let summary = executor.run(ADD_PROGRAM, &cases).await;

        assert_eq!(summary.error, None);
        assert_eq!(summary.passed, 1);
        assert_eq!(summary.results.len(), 3);
        assert_eq!(summary.results[0].actual, ACTUAL_API_ERROR);
        assert_eq!(summary.results[0].error.as_deref(), Some("API Error: 500 - boom"));
        assert_eq!(summary.results[1].actual, ACTUAL_RUNTIME_ERROR);
        assert_eq!(summary.results[1].error.as_deref(), Some("Segmentation fault"));
        assert!(summary.results[2].passed);
    }

    /// Test: A whitelist rejection ends the run and keeps earlier results
    #[tokio::test]
    async fn test_whitelist_rejection_is_global() {
        let server = MockServer::start().await;
        mount_stdin(&server, "1 1", ok_run("2")).await;
        mount_stdin(
            &server,
            "2 2",
            ResponseTemplate::new(401).set_body_string(r#"{"message":"Public Piston API is now whitelist only"}"#),
        )
        .await;

        let executor = Executor::new(&config(&server)).unwrap();
        let cases = vec![add_case(1, 1, 2), add_case(2, 2, 4), add_case(3, 3, 6)];
        let summary = executor.run(ADD_PROGRAM, &cases).await;

        assert_eq!(summary.total, 3);
        assert_eq!(summary.passed, 1);
        assert_eq!(summary.results.len(), 1);
        let error = summary.error.unwrap();
        assert!(error.contains("HTTP 401"));
        assert!(error.contains(&server.uri()));
        assert!(!error.contains("AI simulation"));
    }

    /// Test: Unreadable replies and unreachable runners become network errors
    #[tokio::test]
    async fn test_network_errors_are_per_case() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/execute"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>gateway</html>"))
            .expect(2)
            .mount(&server)
            .await;

        let executor = Executor::new(&config(&server)).unwrap();
        let summary = executor.run(ADD_PROGRAM, &[add_case(1, 1, 2), add_case(2, 2, 4)]).await;
        assert_eq!(summary.error, None);
        assert_eq!(summary.results.len(), 2);
        assert!(summary.results.iter().all(|r| r.actual == ACTUAL_NETWORK_ERROR));

        let unreachable = RunnerConfig::default()
            .with_runner_url("http://127.0.0.1:1/execute")
            .with_request_delay(Duration::ZERO);
        let summary = Executor::new(&unreachable).unwrap().run(ADD_PROGRAM, &[add_case(1, 1, 2)]).await;
        assert_eq!(summary.results[0].actual, ACTUAL_NETWORK_ERROR);
        assert!(summary.results[0].error.is_some());
    }

    /// Test: Requests are spaced by the configured delay
    #[tokio::test]
    async fn test_requests_are_throttled() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/execute"))
            .respond_with(ok_run("2"))
            .expect(3)
            .mount(&server)
            .await;

        let config = config(&server).with_request_delay(Duration::from_millis(60));
        let executor = Executor::new(&config).unwrap();

        let started = Instant::now();
        let summary = executor.run(ADD_PROGRAM, &[add_case(1, 1, 2), add_case(1, 1, 2), add_case(1, 1, 2)]).await;

        assert_eq!(summary.passed, 3);
        assert!(started.elapsed() >= Duration::from_millis(120));
    }

    /// Test: File-I/O programs are wrapped, stdin is still sent
    #[tokio::test]
    async fn test_file_io_program_is_wrapped() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/execute"))
            .and(body_partial_json(json!({"stdin": "5 3"})))
            .respond_with(ok_run("8"))
            .expect(1)
            .mount(&server)
            .await;

        let code = r#"#include <cstdio>
int main() {
    freopen("problem.in", "r", stdin);
    freopen("problem.out", "w", stdout);
    int a, b; scanf("%d %d", &a, &b); printf("%d\n", a + b);
}"#;
        let executor = Executor::new(&config(&server)).unwrap();
        let summary = executor.run(code, &[add_case(5, 3, 8)]).await;
        assert!(summary.all_passed());

        let requests = server.received_requests().await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
        let content = body["files"][0]["content"].as_str().unwrap();
        assert!(content.contains("#define main _user_main"));
        assert!(content.contains(r#"in << "5 3";"#));
        assert!(content.contains(code));
    }
}

#[cfg(test)]
mod simulation_tests {
    use crate::executor::{BackendKind, Executor};
    use algomaster_common::types::{TestCase, Value, ACTUAL_API_ERROR};
    use algomaster_common::RunnerConfig;
    use serde_json::json;
    use std::time::Duration;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const PROGRAM: &str = "#include <iostream>\nint main() { int n; std::cin >> n; std::cout << n * 2; }";

    fn config(server: &MockServer) -> RunnerConfig {
        RunnerConfig::default()
            .with_runner_url(format!("{}/execute", server.uri()))
            .with_llm_url(format!("{}/chat", server.uri()))
            .with_api_key("sk-test")
            .with_models("pro-model", "flash-model")
            .with_request_delay(Duration::ZERO)
    }

    fn chat_reply(content: serde_json::Value) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(json!({
            "id": "gen-1",
            "choices": [{"message": {"role": "assistant", "content": content.to_string()}}]
        }))
    }

    fn double_case(n: i64) -> TestCase {
        TestCase { input: vec![Value::Int(n)], expected: Value::Int(n * 2) }
    }

    async fn mount_sandbox(server: &MockServer, stdout: &str, times: u64) {
        Mock::given(method("POST"))
            .and(path("/execute"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "compile": {"code": 0},
                "run": {"code": 0, "stdout": stdout, "stderr": ""}
            })))
            .expect(times)
            .mount(server)
            .await;
    }

    /// Test: A valid simulation answers the whole run in one request
    #[tokio::test]
    async fn test_simulation_answers_run() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat"))
            .and(header("authorization", "Bearer sk-test"))
            .and(body_partial_json(json!({
                "model": "flash-model",
                "temperature": 0.0,
                "response_format": {"type": "json_object"}
            })))
            .respond_with(chat_reply(json!({
                "compile_error": null,
                "case_results": [
                    {"stdout": "10\n", "runtime_error": null},
                    {"stdout": "", "runtime_error": "Floating point exception"}
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;
        mount_sandbox(&server, "", 0).await;

        let executor = Executor::new(&config(&server)).unwrap();
        let outcome = executor.execute(PROGRAM, &[double_case(5), double_case(0)]).await;

        assert_eq!(outcome.backend, BackendKind::Simulation);
        assert_eq!(outcome.summary.total, 2);
        assert_eq!(outcome.summary.passed, 1);
        assert_eq!(outcome.summary.results[1].error.as_deref(), Some("Floating point exception"));
    }

    /// Test: A simulated compile error is reported like a real one
    #[tokio::test]
    async fn test_simulation_compile_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat"))
            .respond_with(chat_reply(json!({"compile_error": "error: 'cout' was not declared", "case_results": []})))
            .expect(1)
            .mount(&server)
            .await;
        mount_sandbox(&server, "", 0).await;

        let executor = Executor::new(&config(&server)).unwrap();
        let outcome = executor.execute(PROGRAM, &[double_case(1), double_case(2)]).await;

        assert_eq!(outcome.backend, BackendKind::Simulation);
        assert!(outcome.summary.results.is_empty());
        assert_eq!(outcome.summary.error.as_deref(), Some("Compilation Error:\nerror: 'cout' was not declared"));
    }

    /// Test: Too few simulated results falls back to the sandbox
    #[tokio::test]
    async fn test_case_count_mismatch_falls_back() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat"))
            .respond_with(chat_reply(json!({
                "compile_error": null,
                "case_results": [{"stdout": "2", "runtime_error": null}]
            })))
            .expect(1)
            .mount(&server)
            .await;
        mount_sandbox(&server, "2", 2).await;

        let executor = Executor::new(&config(&server)).unwrap();
        let outcome = executor.execute(PROGRAM, &[double_case(1), double_case(1)]).await;

        assert_eq!(outcome.backend, BackendKind::Sandbox);
        assert_eq!(outcome.summary.passed, 2);
        assert_eq!(outcome.summary.error, None);
    }

    /// Test: An unavailable simulation model is retried once with the default model
    #[tokio::test]
    async fn test_model_fallback_retry() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat"))
            .and(body_partial_json(json!({"model": "flash-model"})))
            .respond_with(ResponseTemplate::new(404).set_body_string("No endpoints found for this model"))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/chat"))
            .and(body_partial_json(json!({"model": "pro-model", "temperature": 0.0})))
            .respond_with(chat_reply(json!({
                "compile_error": null,
                "case_results": [{"stdout": "6", "runtime_error": null}]
            })))
            .expect(1)
            .mount(&server)
            .await;
        mount_sandbox(&server, "", 0).await;

        let executor = Executor::new(&config(&server)).unwrap();
        let outcome = executor.execute(PROGRAM, &[double_case(3)]).await;

        assert_eq!(outcome.backend, BackendKind::Simulation);
        assert!(outcome.summary.all_passed());
    }

    /// Test: Other LLM failures skip the retry and go straight to the sandbox
    #[tokio::test]
    async fn test_llm_failure_without_retry() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat"))
            .and(body_partial_json(json!({"model": "flash-model"})))
            .respond_with(ResponseTemplate::new(402).set_body_string("Insufficient credits"))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/chat"))
            .and(body_partial_json(json!({"model": "pro-model"})))
            .respond_with(ResponseTemplate::new(500))
            .expect(0)
            .mount(&server)
            .await;
        mount_sandbox(&server, "6", 1).await;

        let executor = Executor::new(&config(&server)).unwrap();
        let outcome = executor.execute(PROGRAM, &[double_case(3)]).await;

        assert_eq!(outcome.backend, BackendKind::Sandbox);
        assert!(outcome.summary.all_passed());
    }

    /// Test: The whitelist message carries the AI failure that led to the sandbox
    #[tokio::test]
    async fn test_whitelist_rejection_reports_ai_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat"))
            .respond_with(ResponseTemplate::new(402).set_body_string("Insufficient credits"))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/execute"))
            .respond_with(ResponseTemplate::new(401).set_body_string("whitelist only"))
            .expect(1)
            .mount(&server)
            .await;

        let executor = Executor::new(&config(&server)).unwrap();
        let summary = executor.run(PROGRAM, &[double_case(1), double_case(2)]).await;

        assert!(summary.results.is_empty());
        let error = summary.error.unwrap();
        assert!(error.contains("whitelist only"));
        assert!(error.contains("AI simulation fallback also failed: OpenRouter API error: 402 - Insufficient credits"));
    }

    /// Test: When both backends fail for every case the AI failure is still reported
    #[tokio::test]
    async fn test_both_backends_down_reports_ai_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat"))
            .respond_with(ResponseTemplate::new(402).set_body_string("Insufficient credits"))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/execute"))
            .respond_with(ResponseTemplate::new(503).set_body_string("down"))
            .expect(2)
            .mount(&server)
            .await;

        let executor = Executor::new(&config(&server)).unwrap();
        let outcome = executor.execute(PROGRAM, &[double_case(1), double_case(2)]).await;

        assert_eq!(outcome.backend, BackendKind::Sandbox);
        assert_eq!(outcome.summary.total, 2);
        assert_eq!(outcome.summary.passed, 0);
        assert_eq!(outcome.summary.results.len(), 2);
        assert!(outcome.summary.results.iter().all(|r| r.actual == ACTUAL_API_ERROR));
        assert_eq!(
            outcome.summary.error.as_deref(),
            Some("AI simulation fallback also failed: OpenRouter API error: 402 - Insufficient credits")
        );
    }

    /// Test: A sandbox that runs the program clears the AI failure from the summary
    #[tokio::test]
    async fn test_sandbox_answer_hides_ai_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat"))
            .respond_with(ResponseTemplate::new(402).set_body_string("Insufficient credits"))
            .mount(&server)
            .await;
        mount_sandbox(&server, "0", 2).await;

        let executor = Executor::new(&config(&server)).unwrap();
        let summary = executor.run(PROGRAM, &[double_case(1), double_case(2)]).await;

        assert_eq!(summary.passed, 0);
        assert!(summary.error.is_none());
    }
}

#[cfg(test)]
mod tutor_tests {
    use crate::executor::build_http_client;
    use crate::llm::ChatClient;
    use crate::tutor::{Tutor, FEEDBACK_EMPTY, FEEDBACK_FALLBACK, HINT_FALLBACK};
    use algomaster_common::types::{Problem, RunSummary};
    use algomaster_common::RunnerConfig;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn tutor(server: &MockServer) -> Tutor {
        let config = RunnerConfig::default()
            .with_llm_url(format!("{}/chat", server.uri()))
            .with_api_key("sk-test")
            .with_models("pro-model", "flash-model");
        Tutor::new(ChatClient::new(build_http_client(&config).unwrap(), &config))
    }

    fn text_reply(content: &str) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(json!({"choices": [{"message": {"content": content}}]}))
    }

    fn problem() -> Problem {
        serde_json::from_value(json!({
            "title": "Double It",
            "description": "Print twice the input.",
            "difficulty": "Beg",
            "testCases": [{"input": [2], "expected": 4}]
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn test_generate_problems_uses_default_model() {
        let server = MockServer::start().await;
        let catalog = json!({"problems": [{
            "title": "Sum",
            "description": "Add.",
            "difficulty": "Easy",
            "functionName": "main",
            "starterCode": "int main() {}",
            "testCases": [{"input_json": "[1, 2]", "expected_json": "3"}]
        }]});
        Mock::given(method("POST"))
            .and(path("/chat"))
            .and(body_partial_json(json!({"model": "pro-model", "response_format": {"type": "json_object"}})))
            .respond_with(text_reply(&catalog.to_string()))
            .expect(1)
            .mount(&server)
            .await;

        let problems = tutor(&server).generate_problems("two easy array problems").await.unwrap();
        assert_eq!(problems.len(), 1);
        assert_eq!(problems[0].title, "Sum");
        assert_eq!(problems[0].test_cases[0].input.len(), 2);
        assert!(!problems[0].completed);
    }

    #[tokio::test]
    async fn test_generate_problems_propagates_http_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat"))
            .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
            .mount(&server)
            .await;

        let err = tutor(&server).generate_problems("anything").await.unwrap_err();
        assert_eq!(err.to_string(), "OpenRouter API error: 429 - rate limited");
    }

    #[tokio::test]
    async fn test_feedback_fallbacks() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat"))
            .respond_with(text_reply("   "))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/chat"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let tutor = tutor(&server);
        let summary = RunSummary { total: 1, passed: 0, results: vec![], error: Some("Compilation Error:\nx".to_string()) };
        assert_eq!(tutor.feedback(&problem(), "int main() {}", &summary).await, FEEDBACK_EMPTY);
        assert_eq!(tutor.feedback(&problem(), "int main() {}", &summary).await, FEEDBACK_FALLBACK);
    }

    #[tokio::test]
    async fn test_hint_returns_model_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat"))
            .and(body_partial_json(json!({"messages": [{"role": "system"}]})))
            .respond_with(text_reply("Read the number and multiply by **2**."))
            .up_to_n_times(1)
            .mount(&server)
            .await;

        let tutor = tutor(&server);
        let hint = tutor.hint(&problem(), "int main() {}", &[], None).await;
        assert_eq!(hint, "Read the number and multiply by **2**.");

        // Mock exhausted: the server now answers 404
        let hint = tutor.hint(&problem(), "int main() {}", &[], Some("Again?")).await;
        assert_eq!(hint, HINT_FALLBACK);
    }
}
