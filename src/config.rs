//! Configuration
//!
//! Loaded from `<root>/config/topten.yml`; every field has a default so a
//! partial file is fine. `TOPTEN_SPREADSHEET_ID` overrides the spreadsheet id.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

const CONFIG_FILE: &str = "config/topten.yml";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub spreadsheet_id: String,
    pub source_sheet: String,
    pub destination_sheet: String,
    pub source_columns: SourceColumns,
    pub selectors: SelectorConfig,
    pub prompt: PromptConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            spreadsheet_id: String::new(),
            source_sheet: "0.(DB)쿠팡카테고리".to_string(),
            destination_sheet: "0.(DB)쿠팡_탑텐키워드".to_string(),
            source_columns: SourceColumns::default(),
            selectors: SelectorConfig::default(),
            prompt: PromptConfig::default(),
        }
    }
}

/// Column letters of the source sheet.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SourceColumns {
    pub category_id: String,
    pub category_name: String,
    pub html: String,
    pub marker: String,
}

impl Default for SourceColumns {
    fn default() -> Self {
        Self {
            category_id: "A".to_string(),
            category_name: "D".to_string(),
            html: "I".to_string(),
            marker: "J".to_string(),
        }
    }
}

impl SourceColumns {
    /// Resolved 0-based indices in the order id, name, html, marker.
    pub fn indices(&self) -> Result<ColumnIndices> {
        Ok(ColumnIndices {
            category_id: column_index(&self.category_id)?,
            category_name: column_index(&self.category_name)?,
            html: column_index(&self.html)?,
            marker: column_index(&self.marker)?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnIndices {
    pub category_id: usize,
    pub category_name: usize,
    pub html: usize,
    pub marker: usize,
}

impl ColumnIndices {
    pub fn max(&self) -> usize {
        self.category_id
            .max(self.category_name)
            .max(self.html)
            .max(self.marker)
    }
}

/// CSS selectors for the category page snapshot.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SelectorConfig {
    pub category_label: String,
    pub item_container: String,
    pub item_rank: String,
    pub item_keyword: String,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            category_label: "strong[data-v-53787c54]".to_string(),
            item_container: "div._keyword-item-container_1vje2_11".to_string(),
            item_rank: "div._keyword-item-number_1vje2_22".to_string(),
            item_keyword: "div._keyword-item-content_1vje2_46".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PromptConfig {
    pub timeout_secs: u64,
    /// Decision taken when the countdown runs out.
    pub default_proceed: bool,
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 15,
            default_proceed: true,
        }
    }
}

/// Read the config file without environment overrides or validation.
///
/// A missing default file yields [`Config::default`]; a missing explicit one is an error.
pub fn read_config(root: &str, explicit: Option<&Path>) -> Result<Config> {
    let path = match explicit {
        Some(p) => p.to_path_buf(),
        None => PathBuf::from(root).join(CONFIG_FILE),
    };

    if path.exists() {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config from {:?}", path))?;
        parse_config(&content).with_context(|| format!("Failed to parse config {:?}", path))
    } else if explicit.is_some() {
        bail!("Config file not found: {:?}", path);
    } else {
        Ok(Config::default())
    }
}

/// Read, apply `TOPTEN_SPREADSHEET_ID`, and validate.
pub fn load_config(root: &str, explicit: Option<&Path>) -> Result<Config> {
    let mut config = read_config(root, explicit)?;

    if let Ok(id) = std::env::var("TOPTEN_SPREADSHEET_ID") {
        if !id.trim().is_empty() {
            config.spreadsheet_id = id.trim().to_string();
        }
    }

    validate(&config)?;
    Ok(config)
}

pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config = serde_yaml::from_str(content)?;
    Ok(config)
}

pub fn validate(config: &Config) -> Result<()> {
    if config.spreadsheet_id.trim().is_empty() {
        bail!("spreadsheet_id is not set (config file or TOPTEN_SPREADSHEET_ID)");
    }
    if config.source_sheet.trim().is_empty() || config.destination_sheet.trim().is_empty() {
        bail!("source_sheet and destination_sheet must both be set");
    }
    config.source_columns.indices()?;
    Ok(())
}

/// `"A"` → 0, `"J"` → 9, `"AA"` → 26.
pub fn column_index(letters: &str) -> Result<usize> {
    let letters = letters.trim();
    if letters.is_empty() || !letters.chars().all(|c| c.is_ascii_alphabetic()) {
        bail!("Invalid column letter: {:?}", letters);
    }
    let mut idx: usize = 0;
    for c in letters.chars() {
        let v = (c.to_ascii_uppercase() as u8 - b'A') as usize + 1;
        idx = match idx.checked_mul(26).and_then(|n| n.checked_add(v)) {
            Some(n) => n,
            None => bail!("Column letter out of range: {:?}", letters),
        };
    }
    Ok(idx - 1)
}

/// Inverse of [`column_index`].
pub fn column_letters(mut idx: usize) -> String {
    let mut out = Vec::new();
    loop {
        out.push((b'A' + (idx % 26) as u8) as char);
        if idx < 26 {
            break;
        }
        idx = idx / 26 - 1;
    }
    out.iter().rev().collect()
}
