pub mod engine;
pub mod evaluator;
pub mod executor;
pub mod llm;
pub mod rewriter;
pub mod serializer;
pub mod simulator;
pub mod tutor;

#[cfg(test)]
mod executor_tests;

pub use executor::{build_http_client, run_cpp_code, BackendKind, Executor, RunOutcome};
pub use tutor::Tutor;
