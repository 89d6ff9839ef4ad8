//! Snapshot Preview Binary
//!
//! Parses a saved category page from disk and prints what a run would
//! extract from it. Never touches the sheet.

use anyhow::{Context, Result};
use chrono::Local;
use clap::Parser;
use std::fs;
use std::path::PathBuf;

use topten_keywords::config;
use topten_keywords::extract::KeywordExtractor;
use topten_keywords::report;

#[derive(Debug, Parser)]
#[command(name = "preview", about = "Print the keywords parsed from a saved category page")]
struct Args {
    /// Saved HTML snapshot
    file: PathBuf,

    /// Category id stamped on the records
    #[arg(long, default_value = "")]
    category_id: String,

    /// Project root holding config/topten.yml (defaults to $ROOT or ".")
    #[arg(long)]
    root: Option<String>,

    /// Explicit config file path
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let root = args
        .root
        .clone()
        .unwrap_or_else(|| std::env::var("ROOT").unwrap_or_else(|_| ".".to_string()));

    let config = config::read_config(&root, args.config.as_deref())?;
    let extractor = KeywordExtractor::new(&config.selectors)?;

    let html = fs::read_to_string(&args.file)
        .with_context(|| format!("Failed to read snapshot {:?}", args.file))?;

    let extraction = extractor.extract(&html, &args.category_id, Local::now().date_naive());

    println!("=== Snapshot Preview ===");
    println!("Category: {}", if extraction.category.is_empty() { "-" } else { extraction.category.as_str() });
    println!(
        "Containers: {}  Records: {}\n",
        extraction.candidates,
        extraction.records.len()
    );

    if extraction.records.is_empty() {
        println!("No keywords found.");
        std::process::exit(1);
    }

    report::print_report(&extraction.records);
    Ok(())
}
