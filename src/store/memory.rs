//! In-memory sheet pair
//!
//! Mirrors the live store's observable behavior closely enough to drive the
//! runner end to end: appends report an A1 range, formatting sticks to rows,
//! and individual calls can be made to fail.

use super::{quoted_sheet, AppendReceipt, SheetPort};
use crate::error::StoreError;
use crate::format::{FormatRequest, Rgb};
use crate::types::{HistoryRow, SourceRow};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FailPoints {
    pub read_source: bool,
    pub read_destination: bool,
    pub row_background: bool,
    pub append: bool,
    pub formatting: bool,
    pub mark: bool,
}

#[derive(Debug, Clone)]
pub struct MemoryStore {
    pub destination_title: String,
    pub source: Vec<SourceRow>,
    pub destination: Vec<HistoryRow>,
    /// Column A background per 1-based destination row.
    pub backgrounds: HashMap<usize, Rgb>,
    /// Rank-change cell foreground per 1-based destination row.
    pub text_colors: HashMap<usize, Rgb>,
    pub fail: FailPoints,
    pub append_calls: usize,
    pub mark_calls: Vec<(u32, String)>,
    pub format_calls: Vec<Vec<FormatRequest>>,
}

impl MemoryStore {
    pub fn new(source: Vec<SourceRow>) -> Self {
        Self {
            destination_title: "Top10".to_string(),
            source,
            destination: Vec::new(),
            backgrounds: HashMap::new(),
            text_colors: HashMap::new(),
            fail: FailPoints::default(),
            append_calls: 0,
            mark_calls: Vec::new(),
            format_calls: Vec::new(),
        }
    }

    pub fn with_destination(mut self, rows: Vec<HistoryRow>) -> Self {
        self.destination = rows;
        self
    }

    pub fn marker(&self, row_number: u32) -> Option<&str> {
        self.source
            .iter()
            .find(|r| r.row_number == row_number)
            .map(|r| r.marker.as_str())
    }

    fn unavailable(what: &str) -> StoreError {
        StoreError::Unavailable(format!("{} failed (injected)", what))
    }
}

impl SheetPort for MemoryStore {
    fn read_source_rows(&mut self) -> Result<Vec<SourceRow>, StoreError> {
        if self.fail.read_source {
            return Err(Self::unavailable("read_source_rows"));
        }
        Ok(self.source.clone())
    }

    fn mark_row(&mut self, row_number: u32, message: &str) -> Result<(), StoreError> {
        if self.fail.mark {
            return Err(Self::unavailable("mark_row"));
        }
        let row = self
            .source
            .iter_mut()
            .find(|r| r.row_number == row_number)
            .ok_or_else(|| StoreError::Malformed(format!("no source row {}", row_number)))?;
        row.marker = message.to_string();
        self.mark_calls.push((row_number, message.to_string()));
        Ok(())
    }

    fn read_destination_rows(&mut self) -> Result<Vec<HistoryRow>, StoreError> {
        if self.fail.read_destination {
            return Err(Self::unavailable("read_destination_rows"));
        }
        Ok(self.destination.clone())
    }

    fn row_background(&mut self, row_number: usize) -> Result<Option<Rgb>, StoreError> {
        if self.fail.row_background {
            return Err(Self::unavailable("row_background"));
        }
        Ok(self.backgrounds.get(&row_number).copied())
    }

    fn append_results(&mut self, rows: &[Vec<String>]) -> Result<AppendReceipt, StoreError> {
        if self.fail.append {
            return Err(Self::unavailable("append_results"));
        }
        self.append_calls += 1;

        let start = self.destination.len() + 1;
        let updated_cells = rows.iter().map(Vec::len).sum();
        self.destination
            .extend(rows.iter().map(|r| HistoryRow { cells: r.clone() }));
        let end = self.destination.len();

        Ok(AppendReceipt {
            updated_range: format!("{}!A{}:H{}", quoted_sheet(&self.destination_title), start, end),
            updated_rows: rows.len(),
            updated_cells,
        })
    }

    fn apply_formatting(&mut self, requests: &[FormatRequest]) -> Result<(), StoreError> {
        if self.fail.formatting {
            return Err(Self::unavailable("apply_formatting"));
        }
        for request in requests {
            match request {
                FormatRequest::TextColor { row, color, .. } => {
                    self.text_colors.insert(row + 1, *color);
                }
                FormatRequest::Background {
                    start_row,
                    end_row,
                    color,
                    ..
                } => {
                    for row in *start_row..*end_row {
                        self.backgrounds.insert(row + 1, *color);
                    }
                }
            }
        }
        self.format_calls.push(requests.to_vec());
        Ok(())
    }
}
