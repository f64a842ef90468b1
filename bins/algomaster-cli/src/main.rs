mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "algomaster")]
#[command(about = "AlgoMaster CLI - Practice C++ problems against generated test cases", long_about = None)]
struct Cli {
    /// Runner endpoint (overrides ALGOMASTER_RUNNER_URL)
    #[arg(long, global = true)]
    runner_url: Option<String>,

    /// OpenRouter API key; enables AI simulation and tutoring
    #[arg(long, global = true, env = "OPENROUTER_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a solution against a problem's test cases
    Run {
        /// Problem catalog (JSON); defaults to the bundled USACO Bronze set
        #[arg(short, long)]
        problems: Option<PathBuf>,

        /// Problem number, as shown by `list`
        #[arg(short, long)]
        index: usize,

        /// C++ source file
        #[arg(short, long)]
        code: PathBuf,

        /// Save the code and completion state back into the catalog (needs --problems)
        #[arg(long, default_value = "false", requires = "problems")]
        save: bool,
    },

    /// List problems in a catalog
    List {
        /// Problem catalog (JSON); defaults to the bundled USACO Bronze set
        #[arg(short, long)]
        problems: Option<PathBuf>,
    },

    /// Ask the AI tutor for a hint
    Hint {
        /// Problem catalog (JSON); defaults to the bundled USACO Bronze set
        #[arg(short, long)]
        problems: Option<PathBuf>,

        /// Problem number, as shown by `list`
        #[arg(short, long)]
        index: usize,

        /// C++ source file
        #[arg(short, long)]
        code: PathBuf,

        /// Specific question for the tutor
        #[arg(short, long)]
        question: Option<String>,
    },

    /// Generate new problems with AI
    Generate {
        /// What to practice (e.g. "3 medium sliding window problems")
        #[arg(long)]
        prompt: String,

        /// Catalog to append the new problems to
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"))
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = commands::load_config(cli.runner_url.as_deref(), cli.api_key.as_deref())?;

    match cli.command {
        Commands::Run { problems, index, code, save } => {
            commands::run_problem(&config, problems.as_deref(), index, &code, save).await?;
        }
        Commands::List { problems } => {
            commands::list_problems(problems.as_deref())?;
        }
        Commands::Hint { problems, index, code, question } => {
            commands::ask_hint(&config, problems.as_deref(), index, &code, question.as_deref()).await?;
        }
        Commands::Generate { prompt, out } => {
            commands::generate(&config, &prompt, out.as_deref()).await?;
        }
    }

    Ok(())
}
