use chrono::NaiveDate;
use std::fmt;

/// Fixed type tag written into column B of every destination row.
pub const KEYWORD_TYPE_TAG: &str = "cp_keyword";

/// Date format used in the destination sheet's date column.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Timestamp format used in the "Completed" marker message.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One row of the source sheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceRow {
    /// 1-based sheet row number; stable identity of the row.
    pub row_number: u32,
    pub category_id: String,
    pub category_name: String,
    pub raw_html: String,
    /// Empty means "not processed yet".
    pub marker: String,
}

/// One ranked keyword parsed out of a category snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeywordRecord {
    pub date: NaiveDate,
    pub kind: String,
    pub category_id: String,
    pub category: String,
    pub rank: String,
    /// `None` until annotated, and for records without a category id.
    pub rank_change: Option<RankChange>,
    pub keyword: String,
}

impl KeywordRecord {
    /// Annotation text as it is written to the sheet; empty when unannotated.
    pub fn rank_change_text(&self) -> String {
        self.rank_change.map(|c| c.to_string()).unwrap_or_default()
    }

    /// Destination layout: date, type, category id, category, rank, keyword, change, flag.
    pub fn to_sheet_row(&self) -> Vec<String> {
        vec![
            self.date.format(DATE_FORMAT).to_string(),
            self.kind.clone(),
            self.category_id.clone(),
            self.category.clone(),
            self.rank.clone(),
            self.keyword.clone(),
            self.rank_change_text(),
            "TRUE".to_string(),
        ]
    }
}

/// Raw cells of a previously written destination row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HistoryRow {
    pub cells: Vec<String>,
}

impl HistoryRow {
    pub fn new<I, S>(cells: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            cells: cells.into_iter().map(Into::into).collect(),
        }
    }

    pub fn cell(&self, idx: usize) -> &str {
        self.cells.get(idx).map(String::as_str).unwrap_or("")
    }
}

/// Typed projection of a history row that passed parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    pub date: NaiveDate,
    pub category_id: String,
    pub keyword: String,
    pub rank: i64,
}

/// Movement of a keyword's rank relative to its last recorded rank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RankChange {
    New,
    Up(u64),
    Down(u64),
    Unchanged,
}

impl fmt::Display for RankChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RankChange::New => write!(f, "new"),
            RankChange::Up(n) => write!(f, "▲{}", n),
            RankChange::Down(n) => write!(f, "▼{}", n),
            RankChange::Unchanged => write!(f, "(-)"),
        }
    }
}

/// Terminal state of one source row within a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowOutcome {
    Skipped,
    CategoryMismatch { expected: String, parsed: String },
    UserCancelled,
    ExtractFailed,
    Completed {
        rows_written: usize,
        range: String,
        at: String,
    },
    /// Marker left empty so the row is picked up again next run.
    WriteErrored(String),
}

impl RowOutcome {
    /// Message written into the marker column, or `None` if the row must stay unmarked.
    pub fn marker_message(&self) -> Option<String> {
        match self {
            RowOutcome::Skipped => Some("Skipped: empty HTML".to_string()),
            RowOutcome::CategoryMismatch { expected, parsed } => Some(format!(
                "Cancelled: category mismatch (expected {}, got {})",
                expected, parsed
            )),
            RowOutcome::UserCancelled => Some("Cancelled: declined by operator".to_string()),
            RowOutcome::ExtractFailed => Some("Error: no keywords found".to_string()),
            RowOutcome::Completed { at, .. } => Some(format!("Completed: {}", at)),
            RowOutcome::WriteErrored(_) => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            RowOutcome::Skipped => "skipped",
            RowOutcome::CategoryMismatch { .. } => "category_mismatch",
            RowOutcome::UserCancelled => "user_cancelled",
            RowOutcome::ExtractFailed => "extract_failed",
            RowOutcome::Completed { .. } => "completed",
            RowOutcome::WriteErrored(_) => "write_errored",
        }
    }
}
