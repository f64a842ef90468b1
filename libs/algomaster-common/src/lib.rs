//! Shared types for the AlgoMaster runner: test data, run results,
//! problems, and the runner configuration.

pub mod config;
pub mod problems;
pub mod types;

pub use config::RunnerConfig;
