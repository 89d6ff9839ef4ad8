//! Error types
//!
//! `StoreError` covers failures talking to the tabular store. `RowError` ends
//! processing of one row; none of its variants abort a run. A failed history
//! read is not here: it degrades through [`crate::history::HistoryLoad`].

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Sheets API returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Sheet not found: {0}")]
    SheetNotFound(String),

    #[error("Malformed store response: {0}")]
    Malformed(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Error)]
pub enum RowError {
    #[error("HTML payload is empty")]
    InputEmpty,

    #[error("category mismatch (expected {expected}, got {parsed})")]
    CategoryMismatch { expected: String, parsed: String },

    #[error("no keyword records could be extracted")]
    ExtractionEmpty,

    #[error("write to destination failed: {0}")]
    WriteFailure(#[source] StoreError),
}
