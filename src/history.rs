//! History Lookup
//!
//! Resolves the last recorded rank of a category/keyword pair strictly before
//! a reference date. Rows that do not parse are skipped with a typed reason.

use crate::error::StoreError;
use crate::types::{HistoryEntry, HistoryRow, DATE_FORMAT};
use chrono::NaiveDate;

const COL_DATE: usize = 0;
const COL_CATEGORY_ID: usize = 2;
const COL_RANK: usize = 4;
const COL_KEYWORD: usize = 5;
const MIN_CELLS: usize = 7;

/// Why a destination row was not usable as history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    TooShort(usize),
    UnparseableDate(String),
    UnparseableRank(String),
}

/// Outcome of parsing an integer cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParsedRank {
    Valid(i64),
    Unparseable,
}

impl ParsedRank {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().parse::<i64>() {
            Ok(v) => ParsedRank::Valid(v),
            Err(_) => ParsedRank::Unparseable,
        }
    }
}

pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT).ok()
}

impl HistoryEntry {
    pub fn parse(row: &HistoryRow) -> Result<HistoryEntry, SkipReason> {
        if row.cells.len() < MIN_CELLS {
            return Err(SkipReason::TooShort(row.cells.len()));
        }

        let date = parse_date(row.cell(COL_DATE))
            .ok_or_else(|| SkipReason::UnparseableDate(row.cell(COL_DATE).to_string()))?;

        let rank = match ParsedRank::parse(row.cell(COL_RANK)) {
            ParsedRank::Valid(v) => v,
            ParsedRank::Unparseable => {
                return Err(SkipReason::UnparseableRank(row.cell(COL_RANK).to_string()))
            }
        };

        Ok(HistoryEntry {
            date,
            category_id: row.cell(COL_CATEGORY_ID).to_string(),
            keyword: row.cell(COL_KEYWORD).to_string(),
            rank,
        })
    }
}

/// Parsed history, built once per processed source row.
#[derive(Debug, Clone, Default)]
pub struct History {
    entries: Vec<HistoryEntry>,
    skipped: usize,
}

impl History {
    pub fn from_rows(rows: &[HistoryRow]) -> Self {
        let mut entries = Vec::with_capacity(rows.len());
        let mut skipped = 0;
        for row in rows {
            match HistoryEntry::parse(row) {
                Ok(entry) => entries.push(entry),
                Err(_) => skipped += 1,
            }
        }
        Self { entries, skipped }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Rows excluded because they were short or unparseable (headers included).
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    pub fn latest_before(
        &self,
        category_id: &str,
        keyword: &str,
        reference: NaiveDate,
    ) -> Option<&HistoryEntry> {
        latest_entry_before(&self.entries, category_id, keyword, reference)
    }

    pub fn previous_rank(&self, category_id: &str, keyword: &str, reference: NaiveDate) -> Option<i64> {
        self.latest_before(category_id, keyword, reference).map(|e| e.rank)
    }
}

/// Result of reading the destination sheet for one row.
#[derive(Debug)]
pub enum HistoryLoad {
    Loaded { history: History, rows: usize },
    /// The read failed; every keyword is treated as having no prior rank.
    LookupFailure(StoreError),
}

impl HistoryLoad {
    pub fn from_read(result: Result<Vec<HistoryRow>, StoreError>) -> Self {
        match result {
            Ok(rows) => HistoryLoad::Loaded {
                history: History::from_rows(&rows),
                rows: rows.len(),
            },
            Err(e) => HistoryLoad::LookupFailure(e),
        }
    }

    /// History to annotate with, and the destination row count if known.
    pub fn into_parts(self) -> (History, Option<usize>) {
        match self {
            HistoryLoad::Loaded { history, rows } => (history, Some(rows)),
            HistoryLoad::LookupFailure(_) => (History::default(), None),
        }
    }
}

/// Latest entry matching both keys and dated strictly before `reference`.
///
/// Ties on the latest date resolve to the entry seen first in sheet order.
pub fn latest_entry_before<'a>(
    entries: &'a [HistoryEntry],
    category_id: &str,
    keyword: &str,
    reference: NaiveDate,
) -> Option<&'a HistoryEntry> {
    let mut best: Option<&HistoryEntry> = None;
    for entry in entries {
        if entry.category_id != category_id || entry.keyword != keyword || entry.date >= reference {
            continue;
        }
        match best {
            Some(b) if b.date >= entry.date => {}
            _ => best = Some(entry),
        }
    }
    best
}

/// Convenience over raw rows.
pub fn previous_rank(
    rows: &[HistoryRow],
    category_id: &str,
    keyword: &str,
    reference: NaiveDate,
) -> Option<i64> {
    History::from_rows(rows).previous_rank(category_id, keyword, reference)
}
