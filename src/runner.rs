//! Orchestrator
//!
//! Drives each pending source row through
//! extract → check → annotate → confirm → write → mark, one row at a time.
//! Every row ends in exactly one [`RowOutcome`]; no row failure stops the run.

use crate::delta;
use crate::error::RowError;
use crate::extract::KeywordExtractor;
use crate::history::HistoryLoad;
use crate::prompt::{Confirm, DecisionSource};
use crate::report;
use crate::selector;
use crate::sink;
use crate::store::SheetPort;
use crate::types::{KeywordRecord, RowOutcome, SourceRow, TIMESTAMP_FORMAT};
use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use std::collections::BTreeMap;
use tracing::{error, info, warn};

#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Date stamped on every extracted record.
    pub today: NaiveDate,
    /// Process at most this many pending rows.
    pub limit: Option<usize>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            today: Local::now().date_naive(),
            limit: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub pending: usize,
    pub outcomes: Vec<(u32, RowOutcome)>,
    /// The operator pressed Ctrl-C; rows after the last outcome were not touched.
    pub interrupted: bool,
}

impl RunSummary {
    pub fn counts(&self) -> BTreeMap<&'static str, usize> {
        let mut counts = BTreeMap::new();
        for (_, outcome) in &self.outcomes {
            *counts.entry(outcome.label()).or_insert(0) += 1;
        }
        counts
    }

    pub fn completed(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|(_, o)| matches!(o, RowOutcome::Completed { .. }))
            .count()
    }
}

pub struct Runner<'a, P: SheetPort + ?Sized, C: Confirm + ?Sized> {
    port: &'a mut P,
    confirm: &'a mut C,
    extractor: &'a KeywordExtractor,
    options: RunOptions,
    interrupted: bool,
}

impl<'a, P: SheetPort + ?Sized, C: Confirm + ?Sized> Runner<'a, P, C> {
    pub fn new(
        port: &'a mut P,
        confirm: &'a mut C,
        extractor: &'a KeywordExtractor,
        options: RunOptions,
    ) -> Self {
        Self {
            port,
            confirm,
            extractor,
            options,
            interrupted: false,
        }
    }

    /// Process every pending row. Only a failure to read the source sheet
    /// is fatal.
    pub fn run(&mut self) -> Result<RunSummary> {
        let mut rows = selector::pending_rows(&mut *self.port).context("Failed to read source rows")?;
        if let Some(limit) = self.options.limit {
            rows.truncate(limit);
        }

        let mut summary = RunSummary {
            pending: rows.len(),
            outcomes: Vec::with_capacity(rows.len()),
            interrupted: false,
        };

        if rows.is_empty() {
            println!("Nothing to process (no rows with an empty marker).");
            return Ok(summary);
        }
        println!("Found {} pending row(s).", rows.len());

        let total = rows.len();
        for (idx, row) in rows.iter().enumerate() {
            println!("\n{}", "=".repeat(60));
            println!("[{}/{}] Row {}", idx + 1, total, row.row_number);
            if !row.category_id.is_empty() {
                println!("Category ID: {}", row.category_id);
            }
            if !row.category_name.is_empty() {
                println!("Expected category: {}", row.category_name);
            }
            println!("{}\n", "=".repeat(60));

            let outcome = self.process_row(row, idx + 1, total);
            self.record_outcome(row, &outcome);
            summary.outcomes.push((row.row_number, outcome));

            if self.interrupted {
                warn!(row = row.row_number, "interrupted by operator, stopping run");
                println!("\nInterrupted; remaining rows are left for the next run.");
                summary.interrupted = true;
                break;
            }
        }

        Ok(summary)
    }

    /// Run one row to a terminal state. Does not touch the marker column.
    pub fn process_row(&mut self, row: &SourceRow, position: usize, total: usize) -> RowOutcome {
        match self.try_process_row(row, position, total) {
            Ok(outcome) => outcome,
            Err(RowError::InputEmpty) => RowOutcome::Skipped,
            Err(RowError::ExtractionEmpty) => RowOutcome::ExtractFailed,
            Err(RowError::CategoryMismatch { expected, parsed }) => {
                RowOutcome::CategoryMismatch { expected, parsed }
            }
            Err(e @ RowError::WriteFailure(_)) => RowOutcome::WriteErrored(e.to_string()),
        }
    }

    fn try_process_row(
        &mut self,
        row: &SourceRow,
        position: usize,
        total: usize,
    ) -> Result<RowOutcome, RowError> {
        if row.raw_html.trim().is_empty() {
            return Err(RowError::InputEmpty);
        }

        let extraction = self
            .extractor
            .extract(&row.raw_html, &row.category_id, self.options.today);
        info!(
            row = row.row_number,
            candidates = extraction.candidates,
            records = extraction.records.len(),
            "extracted keywords"
        );
        if extraction.records.is_empty() {
            return Err(RowError::ExtractionEmpty);
        }

        check_category(&row.category_name, &extraction.category)?;

        let load = HistoryLoad::from_read(self.port.read_destination_rows());
        if let HistoryLoad::LookupFailure(e) = &load {
            warn!(row = row.row_number, error = %e, "history lookup failed, treating every keyword as new");
        }
        let (history, existing_rows) = load.into_parts();

        let mut records = extraction.records;
        delta::annotate(&mut records, &history);

        println!("=== Extracted keywords ===\n");
        report::print_report(&records);

        let question = format!("[{}/{}] Write these rows to the sheet? (y/n):", position, total);
        let decision = self.confirm.confirm(&question);
        match decision.source {
            DecisionSource::Timeout => {
                info!(row = row.row_number, proceed = decision.proceed, "confirmation timed out, using default")
            }
            DecisionSource::Interrupted => self.interrupted = true,
            DecisionSource::Operator | DecisionSource::Auto => {}
        }
        if !decision.proceed {
            println!("Write cancelled.");
            return Ok(RowOutcome::UserCancelled);
        }

        self.write(row, &records, existing_rows)
    }

    fn write(
        &mut self,
        row: &SourceRow,
        records: &[KeywordRecord],
        existing_rows: Option<usize>,
    ) -> Result<RowOutcome, RowError> {
        let written = sink::write_results(&mut *self.port, records, existing_rows)
            .map_err(RowError::WriteFailure)?;

        println!(
            "\n✓ {} row(s) appended ({})",
            written.rows_written, written.range
        );
        if let Some(err) = &written.formatting_error {
            println!("  formatting was not applied: {}", err);
        }
        info!(
            row = row.row_number,
            rows_written = written.rows_written,
            range = %written.range,
            band = ?written.band,
            "rows appended"
        );

        Ok(RowOutcome::Completed {
            rows_written: written.rows_written,
            range: written.range,
            at: Local::now().format(TIMESTAMP_FORMAT).to_string(),
        })
    }

    fn record_outcome(&mut self, row: &SourceRow, outcome: &RowOutcome) {
        match outcome {
            RowOutcome::Skipped => println!("Row {}: HTML is empty, skipped.", row.row_number),
            RowOutcome::ExtractFailed => println!("No keywords found."),
            RowOutcome::CategoryMismatch { expected, parsed } => {
                println!("\n⚠️ Category mismatch on row {}", row.row_number);
                println!("  expected (sheet): {}", expected);
                println!("  parsed (HTML):    {}", parsed);
                println!("  The HTML probably belongs to another category; cancelled automatically.");
            }
            RowOutcome::WriteErrored(msg) => {
                error!(row = row.row_number, error = %msg, "write failed, row left unmarked for the next run");
                println!("✗ Write failed: {}", msg);
            }
            RowOutcome::UserCancelled | RowOutcome::Completed { .. } => {}
        }

        let Some(message) = outcome.marker_message() else {
            return;
        };
        match self.port.mark_row(row.row_number, &message) {
            Ok(()) => {
                info!(row = row.row_number, outcome = outcome.label(), "row marked");
                if let RowOutcome::Completed { .. } = outcome {
                    println!("✓ Row {} done and logged", row.row_number);
                }
            }
            Err(e) => warn!(row = row.row_number, error = %e, message = %message, "could not write marker"),
        }
    }
}

/// Both names must be present for a mismatch to count.
pub fn check_category(expected: &str, parsed: &str) -> Result<(), RowError> {
    let expected = expected.trim();
    let parsed = parsed.trim();
    if !expected.is_empty() && !parsed.is_empty() && expected != parsed {
        return Err(RowError::CategoryMismatch {
            expected: expected.to_string(),
            parsed: parsed.to_string(),
        });
    }
    Ok(())
}

pub fn print_summary(summary: &RunSummary) {
    println!("\n{}", "=".repeat(60));
    println!("All rows processed ({} pending).", summary.pending);
    for (label, count) in summary.counts() {
        println!("  {:<18} {}", label, count);
    }
    if summary.interrupted {
        println!("  stopped early by operator");
    }
    println!("{}", "=".repeat(60));
}
