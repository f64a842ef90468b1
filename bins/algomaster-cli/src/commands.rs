// CLI commands for practicing with AlgoMaster
use algomaster_common::problems::{load_problems, preset_problems, record_run, save_problems, PRESET_CATALOG_NAME};
use algomaster_common::types::{Problem, RunSummary};
use algomaster_common::RunnerConfig;
use algomaster_engine::llm::ChatClient;
use algomaster_engine::{build_http_client, Executor, Tutor};
use anyhow::{bail, Context, Result};
use chrono::Utc;
use std::fs;
use std::path::Path;

/// Environment configuration with command-line overrides
pub fn load_config(runner_url: Option<&str>, api_key: Option<&str>) -> Result<RunnerConfig> {
    let mut config = RunnerConfig::from_env()?;
    if let Some(url) = runner_url {
        config = config.with_runner_url(url);
    }
    if let Some(key) = api_key {
        config = config.with_api_key(key);
    }
    Ok(config)
}

/// Load the catalog at `path`, or the bundled set when none is given
fn load_catalog(path: Option<&Path>) -> Result<Vec<Problem>> {
    match path {
        Some(path) => load_problems(path),
        None => preset_problems(),
    }
}

fn catalog_name(path: Option<&Path>) -> String {
    path.map_or_else(|| PRESET_CATALOG_NAME.to_string(), |p| p.display().to_string())
}

/// Resolve a 1-based problem number
fn problem_slot(problems: &[Problem], index: usize) -> Result<usize> {
    if index == 0 || index > problems.len() {
        bail!("Problem {} does not exist (catalog has {} problems)", index, problems.len());
    }
    Ok(index - 1)
}

fn read_code(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("Failed to read code file {}", path.display()))
}

fn tutor(config: &RunnerConfig) -> Result<Tutor> {
    if !config.has_api_key() {
        bail!("OpenRouter API key not configured. Set OPENROUTER_API_KEY or pass --api-key");
    }
    let http = build_http_client(config).context("Failed to build HTTP client")?;
    Ok(Tutor::new(ChatClient::new(http, config)))
}

/// Run a solution against a problem's test cases
pub async fn run_problem(
    config: &RunnerConfig,
    problems_path: Option<&Path>,
    index: usize,
    code_path: &Path,
    save: bool,
) -> Result<()> {
    let save_path = match (save, problems_path) {
        (false, _) => None,
        (true, Some(path)) => Some(path),
        (true, None) => bail!("The bundled catalog is read-only; pass --problems <file> to save progress"),
    };
    let mut problems = load_catalog(problems_path)?;
    let slot = problem_slot(&problems, index)?;
    let code = read_code(code_path)?;

    let problem = &problems[slot];
    println!("🚀 Running \"{}\" ({} test cases)", problem.title, problem.test_cases.len());
    if config.has_api_key() {
        println!("   Backend: AI simulation ({}), sandbox fallback", config.simulation_model);
    } else {
        println!("   Backend: sandbox at {}", config.runner_url);
    }

    let executor = Executor::new(config).context("Failed to build HTTP client")?;
    let outcome = executor.execute(&code, &problem.test_cases).await;

    println!();
    print_summary(&outcome.summary);

    if let Some(path) = save_path {
        let newly_completed = record_run(&mut problems[slot], &code, &outcome.summary, Utc::now());
        save_problems(path, &problems)?;
        println!();
        println!("💾 Saved progress to {}", path.display());
        if newly_completed {
            println!("🏆 Problem completed!");
        }
    }

    Ok(())
}

fn print_summary(summary: &RunSummary) {
    for (idx, result) in summary.results.iter().enumerate() {
        let mark = if result.passed { "✅" } else { "❌" };
        println!("{} Test {}: input \"{}\"", mark, idx + 1, result.input);
        if !result.passed {
            println!("     expected: {}", result.expected);
            println!("     actual:   {}", result.actual);
            if let Some(error) = &result.error {
                println!("     error:    {}", error.trim_end());
            }
        }
    }

    if let Some(error) = &summary.error {
        println!();
        println!("⚠️  {}", error.trim_end());
    }

    println!();
    println!("Passed {}/{}", summary.passed, summary.total);
}

/// List problems in a catalog
pub fn list_problems(problems_path: Option<&Path>) -> Result<()> {
    let problems = load_catalog(problems_path)?;
    if problems.is_empty() {
        println!("No problems in {}", catalog_name(problems_path));
        return Ok(());
    }

    let completed = problems.iter().filter(|p| p.completed).count();
    println!("📚 {}: {} problems ({} completed)", catalog_name(problems_path), problems.len(), completed);
    println!();

    for (idx, problem) in problems.iter().enumerate() {
        let mark = if problem.completed { "✓" } else { " " };
        let date = problem
            .completed_date
            .map(|d| format!(" on {}", d.format("%Y-%m-%d")))
            .unwrap_or_default();
        println!(
            "  [{}] {:>3}. {} ({}, {} tests){}",
            mark,
            idx + 1,
            problem.title,
            if problem.difficulty.is_empty() { "?" } else { problem.difficulty.as_str() },
            problem.test_cases.len(),
            date
        );
    }

    Ok(())
}

/// Ask the AI tutor for a hint on a problem
pub async fn ask_hint(
    config: &RunnerConfig,
    problems_path: Option<&Path>,
    index: usize,
    code_path: &Path,
    question: Option<&str>,
) -> Result<()> {
    let problems = load_catalog(problems_path)?;
    let slot = problem_slot(&problems, index)?;
    let code = read_code(code_path)?;

    let hint = tutor(config)?.hint(&problems[slot], &code, &[], question).await;

    println!("💡 {}", hint);
    Ok(())
}

/// Generate problems and optionally append them to a catalog
pub async fn generate(config: &RunnerConfig, prompt: &str, out: Option<&Path>) -> Result<()> {
    println!("🧠 Generating problems for: {}", prompt);

    let generated = tutor(config)?
        .generate_problems(prompt)
        .await
        .context("Failed to generate problems")?;

    for problem in &generated {
        println!("  + {} ({}, {} tests)", problem.title, problem.difficulty, problem.test_cases.len());
    }

    match out {
        Some(path) => {
            let total = append_problems(path, generated)?;
            println!();
            println!("💾 Catalog {} now has {} problems", path.display(), total);
        }
        None => {
            println!();
            println!("{}", serde_json::to_string_pretty(&generated).context("Failed to serialize problems")?);
        }
    }

    Ok(())
}

/// Append problems to a catalog, creating it if needed; returns the new size
fn append_problems(path: &Path, generated: Vec<Problem>) -> Result<usize> {
    let mut problems = if path.exists() { load_problems(path)? } else { Vec::new() };
    problems.extend(generated);
    save_problems(path, &problems)?;
    Ok(problems.len())
}
