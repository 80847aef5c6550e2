use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use storefront_harness::orchestrator::LATEST_HISTORY_FILE;
use storefront_harness::{report, HarnessConfig, ScenarioBook, TestOrchestrator};

#[derive(Parser)]
#[command(name = "storefront-harness", about = "LLM-driven storefront UI tests")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run scenarios in one browser session; exits non-zero if any fails
    Run {
        /// Scenario names, run in order
        #[arg(required = true, value_name = "SCENARIO")]
        names: Vec<String>,

        /// CSV file with Test Name / Step Description / Expected Result / Expected Cart Items columns
        #[arg(long = "scenarios", value_name = "FILE")]
        scenarios_file: Option<PathBuf>,

        /// Directory for run-history JSON files
        #[arg(long, default_value = ".")]
        history_dir: PathBuf,

        /// Show the browser window
        #[arg(long)]
        headed: bool,

        /// Chrome binary to launch; overrides CHROME_PATH
        #[arg(long)]
        chrome_path: Option<String>,
    },
    /// Render a run-history JSON file as an HTML table
    Report {
        #[arg(long, default_value = LATEST_HISTORY_FILE)]
        input: PathBuf,

        #[arg(long, default_value = "report.html")]
        output: PathBuf,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Run {
            names,
            scenarios_file,
            history_dir,
            headed,
            chrome_path,
        } => run(names, scenarios_file, history_dir, headed, chrome_path).await,
        Command::Report { input, output } => match report::render(&input, &output) {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                tracing::error!("report generation failed: {e}");
                ExitCode::FAILURE
            }
        },
    }
}

async fn run(
    names: Vec<String>,
    scenarios_file: Option<PathBuf>,
    history_dir: PathBuf,
    headed: bool,
    chrome_path: Option<String>,
) -> ExitCode {
    let setup = || -> storefront_harness::Result<_> {
        let mut config = HarnessConfig::from_env()?;
        config.history_dir = history_dir;
        if chrome_path.is_some() {
            config.chrome_path = chrome_path;
        }
        let book = match &scenarios_file {
            Some(path) => ScenarioBook::from_csv_path(path)?,
            None => ScenarioBook::builtin(&config.storefront_url, &config.credentials),
        };
        TestOrchestrator::from_config(&config, book, !headed)
    };

    let orchestrator = match setup() {
        Ok(orchestrator) => orchestrator,
        Err(e) => {
            tracing::error!(kind = ?e.kind(), "{e}");
            return ExitCode::FAILURE;
        }
    };

    let outcomes = orchestrator.run_suite(&names).await;
    let mut failed = 0;
    for outcome in &outcomes {
        match &outcome.outcome {
            Ok(result) => println!("PASS {}: {:?}", outcome.scenario, result),
            Err(e) => {
                failed += 1;
                println!("FAIL {}: {e}", outcome.scenario);
            }
        }
    }

    if failed == 0 {
        ExitCode::SUCCESS
    } else {
        tracing::error!(failed, total = outcomes.len(), "scenarios failed");
        ExitCode::FAILURE
    }
}
