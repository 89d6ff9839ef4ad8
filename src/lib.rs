//! Top-10 keyword rank tracker
//!
//! Reads saved category snapshots from a source sheet, extracts the ranked
//! keyword list, annotates each keyword with its movement since the last
//! recorded week, and appends the result to a destination sheet.

pub mod config;
pub mod delta;
pub mod error;
pub mod extract;
pub mod format;
pub mod history;
pub mod logging;
pub mod prompt;
pub mod report;
pub mod runner;
pub mod selector;
pub mod sink;
pub mod store;
pub mod types;

pub use types::*;
