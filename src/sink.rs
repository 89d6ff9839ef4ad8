//! Sink Writer
//!
//! Appends annotated records to the destination sheet, then colors the
//! rank-change cells and sets the block's background band.

use crate::error::StoreError;
use crate::format::{
    decide_band, rank_change_color, BandDecision, FormatRequest, BAND_COLUMNS, RANK_CHANGE_COLUMN,
};
use crate::store::{parse_row_span, SheetPort};
use crate::types::KeywordRecord;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteOutcome {
    pub rows_written: usize,
    pub range: String,
    pub band: BandDecision,
    /// Set when the rows landed but formatting did not.
    pub formatting_error: Option<String>,
}

/// Pick the band for a block appended after `existing_rows` data rows.
///
/// `existing_rows` is `None` when the row count could not be read. Any
/// failure reading the previous row's color falls back to a plain block.
pub fn choose_band<P: SheetPort + ?Sized>(port: &mut P, existing_rows: Option<usize>) -> BandDecision {
    let last_row = match existing_rows {
        Some(n) if n > 0 => n,
        Some(_) => {
            debug!("destination is empty, first block stays plain");
            return BandDecision::Plain;
        }
        None => return BandDecision::Plain,
    };

    match port.row_background(last_row) {
        Ok(color) => {
            let decision = decide_band(color.as_ref());
            debug!(last_row, ?color, ?decision, "band decided from previous row");
            decision
        }
        Err(e) => {
            warn!(last_row, error = %e, "could not read previous row background, leaving block plain");
            BandDecision::Plain
        }
    }
}

/// Formatting requests for a block whose first row is the 1-based `start_row`.
pub fn format_requests(records: &[KeywordRecord], start_row: usize, end_row: usize, band: BandDecision) -> Vec<FormatRequest> {
    let first = start_row.saturating_sub(1);
    let mut requests: Vec<FormatRequest> = records
        .iter()
        .enumerate()
        .filter_map(|(idx, record)| {
            record.rank_change.as_ref().map(|change| FormatRequest::TextColor {
                row: first + idx,
                column: RANK_CHANGE_COLUMN,
                color: rank_change_color(change),
            })
        })
        .collect();

    requests.push(FormatRequest::Background {
        start_row: first,
        end_row,
        columns: BAND_COLUMNS,
        color: band.color(),
    });
    requests
}

/// Append `records` and format them.
///
/// An append failure is returned as an error; a formatting failure after a
/// successful append is reported in the outcome instead, since the rows are
/// already in the sheet.
pub fn write_results<P: SheetPort + ?Sized>(
    port: &mut P,
    records: &[KeywordRecord],
    existing_rows: Option<usize>,
) -> Result<WriteOutcome, StoreError> {
    let band = choose_band(port, existing_rows);

    let values: Vec<Vec<String>> = records.iter().map(KeywordRecord::to_sheet_row).collect();
    let receipt = port.append_results(&values)?;

    let mut outcome = WriteOutcome {
        rows_written: receipt.updated_rows,
        range: receipt.updated_range.clone(),
        band,
        formatting_error: None,
    };

    let Some(span) = parse_row_span(&receipt.updated_range) else {
        warn!(range = %receipt.updated_range, "could not locate appended rows, skipping formatting");
        outcome.formatting_error = Some(format!("unrecognized range {:?}", receipt.updated_range));
        return Ok(outcome);
    };

    let requests = format_requests(records, span.start, span.end, band);
    if let Err(e) = port.apply_formatting(&requests) {
        warn!(range = %receipt.updated_range, error = %e, "rows appended but formatting failed");
        outcome.formatting_error = Some(e.to_string());
    }

    Ok(outcome)
}
