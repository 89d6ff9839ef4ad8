//! Keyword Extractor
//!
//! Scrapes the fixed-shape top-10 block out of a saved category page.

use crate::config::SelectorConfig;
use crate::types::{KeywordRecord, KEYWORD_TYPE_TAG};
use anyhow::{anyhow, Result};
use chrono::NaiveDate;
use scraper::{ElementRef, Html, Selector};

/// Result of one extraction pass over a snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extraction {
    /// Category label with surrounding quotes removed; empty if absent.
    pub category: String,
    pub records: Vec<KeywordRecord>,
    /// Number of item containers found, including dropped ones.
    pub candidates: usize,
}

/// Compiled selectors, parsed once per run.
pub struct KeywordExtractor {
    category_label: Selector,
    item_container: Selector,
    item_rank: Selector,
    item_keyword: Selector,
}

impl KeywordExtractor {
    pub fn new(config: &SelectorConfig) -> Result<Self> {
        Ok(Self {
            category_label: parse_selector(&config.category_label)?,
            item_container: parse_selector(&config.item_container)?,
            item_rank: parse_selector(&config.item_rank)?,
            item_keyword: parse_selector(&config.item_keyword)?,
        })
    }

    /// Parse `html` into ranked keyword records, all stamped with `today`.
    ///
    /// Containers missing either rank or keyword text are dropped. Output keeps
    /// document order.
    pub fn extract(&self, html: &str, category_id: &str, today: NaiveDate) -> Extraction {
        let document = Html::parse_fragment(html);

        let category = document
            .select(&self.category_label)
            .next()
            .map(|el| strip_quotes(&stripped_text(el)).to_string())
            .unwrap_or_default();

        let mut records = Vec::new();
        let mut candidates = 0;

        for item in document.select(&self.item_container) {
            candidates += 1;

            let rank = first_text(item, &self.item_rank);
            let keyword = first_text(item, &self.item_keyword);

            if rank.is_empty() || keyword.is_empty() {
                continue;
            }

            records.push(KeywordRecord {
                date: today,
                kind: KEYWORD_TYPE_TAG.to_string(),
                category_id: category_id.to_string(),
                category: category.clone(),
                rank,
                rank_change: None,
                keyword,
            });
        }

        Extraction {
            category,
            records,
            candidates,
        }
    }
}

fn parse_selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| anyhow!("Invalid selector {:?}: {}", css, e))
}

fn first_text(item: ElementRef<'_>, selector: &Selector) -> String {
    item.select(selector)
        .next()
        .map(stripped_text)
        .unwrap_or_default()
}

/// Concatenate the element's text nodes, each trimmed.
fn stripped_text(el: ElementRef<'_>) -> String {
    el.text().map(str::trim).collect::<String>()
}

fn strip_quotes(s: &str) -> &str {
    s.trim_matches(|c| c == '"' || c == '“' || c == '”')
}
