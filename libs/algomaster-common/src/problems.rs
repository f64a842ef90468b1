// Problem catalog files and progress bookkeeping
use crate::types::{Problem, RunSummary};
use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Serialize, Deserialize)]
struct ProblemsJson {
    problems: Vec<Problem>,
}

/// Catalogs come either wrapped (`{"problems": [...]}`) or as a bare array
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CatalogFile {
    Wrapped(ProblemsJson),
    Bare(Vec<Problem>),
}

/// USACO Bronze practice set shipped with the runner
const USACO_BRONZE: &str = include_str!("../problems/usaco_bronze.json");

/// Name shown for the bundled catalog wherever a path would be
pub const PRESET_CATALOG_NAME: &str = "usaco_bronze.json (bundled)";

/// The bundled USACO Bronze catalog
pub fn preset_problems() -> Result<Vec<Problem>> {
    parse_problems(USACO_BRONZE).context("Bundled problem catalog is malformed")
}

/// Load a problem catalog from a JSON file
pub fn load_problems(path: &Path) -> Result<Vec<Problem>> {
    if !path.exists() {
        bail!("Problem catalog not found: {}", path.display());
    }

    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    parse_problems(&content).with_context(|| format!("Failed to parse {}", path.display()))
}

pub fn parse_problems(content: &str) -> Result<Vec<Problem>> {
    let catalog: CatalogFile = serde_json::from_str(content)?;
    Ok(match catalog {
        CatalogFile::Wrapped(json) => json.problems,
        CatalogFile::Bare(problems) => problems,
    })
}

/// Save a problem catalog, always in the wrapped form
pub fn save_problems(path: &Path, problems: &[Problem]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let json_content = serde_json::to_string_pretty(&ProblemsJson { problems: problems.to_vec() })
        .context("Failed to serialize problem catalog")?;
    fs::write(path, json_content).with_context(|| format!("Failed to write {}", path.display()))?;

    Ok(())
}

/// Record the outcome of a run on the problem it belongs to
///
/// The submitted code is always kept. Completion is sticky, and the
/// completion date is only stamped the first time every test passes.
/// Returns true when this run newly completed the problem.
pub fn record_run(problem: &mut Problem, code: &str, summary: &RunSummary, now: DateTime<Utc>) -> bool {
    let all_passed = summary.all_passed();
    let newly_completed = all_passed && !problem.completed;

    problem.user_code = Some(code.to_string());
    problem.completed = problem.completed || all_passed;
    if newly_completed {
        problem.completed_date = Some(now);
    }

    newly_completed
}
