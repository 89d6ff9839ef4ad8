use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

use topten_keywords::config;
use topten_keywords::extract::KeywordExtractor;
use topten_keywords::logging;
use topten_keywords::prompt::{AutoConfirm, Confirm, TimedConsolePrompt};
use topten_keywords::runner::{print_summary, RunOptions, Runner};
use topten_keywords::store::SheetsClient;

#[derive(Debug, Parser)]
#[command(name = "topten_keywords", version, about = "Log top-10 keyword ranks from saved category pages")]
struct Cli {
    /// Project root holding config/topten.yml (defaults to $ROOT or ".")
    #[arg(long)]
    root: Option<String>,

    /// Explicit config file path
    #[arg(long)]
    config: Option<PathBuf>,

    /// Write without asking for confirmation
    #[arg(long, short = 'y')]
    yes: bool,

    /// Seconds before the confirmation prompt takes its default
    #[arg(long)]
    timeout: Option<u64>,

    /// Process at most this many pending rows
    #[arg(long)]
    limit: Option<usize>,
}

fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    logging::init();

    let cli = Cli::parse();
    let root = cli
        .root
        .clone()
        .unwrap_or_else(|| std::env::var("ROOT").unwrap_or_else(|_| ".".to_string()));

    let mut config = config::load_config(&root, cli.config.as_deref())?;
    if let Some(timeout) = cli.timeout {
        config.prompt.timeout_secs = timeout;
    }

    let extractor = KeywordExtractor::new(&config.selectors)?;
    let mut store = SheetsClient::from_env(&config).context("Failed to set up Sheets client")?;

    let mut confirm: Box<dyn Confirm> = if cli.yes {
        Box::new(AutoConfirm)
    } else {
        Box::new(TimedConsolePrompt::new(
            Duration::from_secs(config.prompt.timeout_secs),
            config.prompt.default_proceed,
        ))
    };

    let options = RunOptions {
        limit: cli.limit,
        ..RunOptions::default()
    };

    println!("Reading pending rows from '{}'...", config.source_sheet);
    println!("{}", "-".repeat(50));

    let summary = Runner::new(&mut store, confirm.as_mut(), &extractor, options).run()?;
    print_summary(&summary);
    Ok(())
}
