//! Tabular store port
//!
//! Row processing only talks to the sheet through [`SheetPort`], so the
//! workflow runs the same against the live Sheets API and the in-memory
//! store used by tests.

pub mod memory;
pub mod sheets;

use crate::error::StoreError;
use crate::format::{FormatRequest, Rgb};
use crate::types::{HistoryRow, SourceRow};
use regex::Regex;

pub use memory::MemoryStore;
pub use sheets::SheetsClient;

/// What the store reported after an append.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppendReceipt {
    /// e.g. `'Sheet'!A10:H19`
    pub updated_range: String,
    pub updated_rows: usize,
    pub updated_cells: usize,
}

pub trait SheetPort {
    /// Every source row, 1-based, header included.
    fn read_source_rows(&mut self) -> Result<Vec<SourceRow>, StoreError>;

    /// Overwrite the marker cell of one source row.
    fn mark_row(&mut self, row_number: u32, message: &str) -> Result<(), StoreError>;

    /// Every destination row (columns A..H) in sheet order.
    fn read_destination_rows(&mut self) -> Result<Vec<HistoryRow>, StoreError>;

    /// Background of column A in a destination row; `None` when unset.
    fn row_background(&mut self, row_number: usize) -> Result<Option<Rgb>, StoreError>;

    /// Append rows after the existing data.
    fn append_results(&mut self, rows: &[Vec<String>]) -> Result<AppendReceipt, StoreError>;

    fn apply_formatting(&mut self, requests: &[FormatRequest]) -> Result<(), StoreError>;
}

/// 1-based inclusive row span of an A1 range such as `'Sheet'!A10:H19`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowSpan {
    pub start: usize,
    pub end: usize,
}

const ROW_SPAN_PATTERN: &str = r"^\$?[A-Za-z]+\$?(\d+)(?::\$?[A-Za-z]+\$?(\d+))?$";

pub fn parse_row_span(updated_range: &str) -> Option<RowSpan> {
    let cells = updated_range.rsplit('!').next()?.trim();
    let re = Regex::new(ROW_SPAN_PATTERN).ok()?;
    let caps = re.captures(cells)?;
    let start: usize = caps.get(1)?.as_str().parse().ok()?;
    let end: usize = match caps.get(2) {
        Some(m) => m.as_str().parse().ok()?,
        None => start,
    };
    if start == 0 || end < start {
        return None;
    }
    Some(RowSpan { start, end })
}

/// Quote a sheet title for use in an A1 range.
pub fn quoted_sheet(title: &str) -> String {
    format!("'{}'", title.replace('\'', "''"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_row_span() {
        assert_eq!(
            parse_row_span("'0.(DB)쿠팡_탑텐키워드'!A10:H19"),
            Some(RowSpan { start: 10, end: 19 })
        );
        assert_eq!(parse_row_span("Sheet1!A5:H5"), Some(RowSpan { start: 5, end: 5 }));
        assert_eq!(parse_row_span("Sheet1!$A$7"), Some(RowSpan { start: 7, end: 7 }));
        assert_eq!(parse_row_span("Sheet1!A:H"), None);
        assert_eq!(parse_row_span(""), None);
        assert_eq!(parse_row_span("Sheet1!A9:H3"), None);
    }

    #[test]
    fn test_quoted_sheet() {
        assert_eq!(quoted_sheet("Top 10"), "'Top 10'");
        assert_eq!(quoted_sheet("Bob's"), "'Bob''s'");
    }
}
