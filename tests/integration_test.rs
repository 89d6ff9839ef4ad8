//! End-to-end runs against the in-memory store, driven by a saved snapshot

use chrono::NaiveDate;
use std::collections::VecDeque;
use std::fs;
use std::path::PathBuf;
use topten_keywords::config::SelectorConfig;
use topten_keywords::extract::KeywordExtractor;
use topten_keywords::format::{band_color, BLACK, BLUE, RED, WHITE};
use topten_keywords::prompt::{Confirm, Decision, DecisionSource};
use topten_keywords::runner::{RunOptions, Runner, RunSummary};
use topten_keywords::store::MemoryStore;
use topten_keywords::{HistoryRow, RowOutcome, SourceRow};

fn fixture(name: &str) -> String {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name);
    fs::read_to_string(path).expect("fixture should exist")
}

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 10, 18).unwrap()
}

fn source_row(n: u32, id: &str, name: &str, html: &str) -> SourceRow {
    SourceRow {
        row_number: n,
        category_id: id.into(),
        category_name: name.into(),
        raw_html: html.into(),
        marker: String::new(),
    }
}

fn header() -> SourceRow {
    SourceRow {
        row_number: 1,
        category_id: "category id".into(),
        category_name: "category".into(),
        raw_html: "html".into(),
        marker: "log".into(),
    }
}

fn history(date: &str, id: &str, rank: &str, keyword: &str) -> HistoryRow {
    HistoryRow::new([date, "cp_keyword", id, "Women's Fashion", rank, keyword, "", "TRUE"])
}

/// Answers prompts from a fixed script, then falls back to a timeout default.
struct Scripted {
    answers: VecDeque<Decision>,
    asked: usize,
}

impl Scripted {
    fn new(answers: Vec<Decision>) -> Self {
        Self {
            answers: answers.into(),
            asked: 0,
        }
    }
}

impl Confirm for Scripted {
    fn confirm(&mut self, _question: &str) -> Decision {
        self.asked += 1;
        self.answers.pop_front().unwrap_or(Decision {
            proceed: true,
            source: DecisionSource::Timeout,
        })
    }
}

fn operator(proceed: bool) -> Decision {
    Decision {
        proceed,
        source: DecisionSource::Operator,
    }
}

fn run(store: &mut MemoryStore, confirm: &mut Scripted) -> RunSummary {
    let extractor = KeywordExtractor::new(&SelectorConfig::default()).unwrap();
    let options = RunOptions {
        today: today(),
        limit: None,
    };
    Runner::new(store, confirm, &extractor, options).run().unwrap()
}

#[test]
fn test_full_run_appends_annotated_rows_and_marks_source() {
    let html = fixture("womens_fashion.html");
    let mut store = MemoryStore::new(vec![header(), source_row(2, "100", "Women's Fashion", &html)])
        .with_destination(vec![
            history("2026-10-04", "100", "9", "wide slacks"),
            history("2026-10-11", "100", "7", "wide slacks"),
            history("2026-10-11", "100", "1", "cardigan"),
            history("2026-10-11", "100", "5", "blouse"),
            // Same day as the run; must not count as history.
            history("2026-10-18", "100", "2", "cardigan"),
            // Same keyword in another category.
            history("2026-10-11", "200", "10", "hoodie"),
        ]);
    let mut confirm = Scripted::new(vec![operator(true)]);

    let summary = run(&mut store, &mut confirm);

    assert_eq!(summary.pending, 1);
    assert_eq!(summary.completed(), 1);
    assert_eq!(store.append_calls, 1);
    assert_eq!(store.destination.len(), 6 + 9);

    let written = &store.destination[6..];
    let keywords: Vec<&str> = written.iter().map(|r| r.cell(5)).collect();
    assert!(!keywords.contains(&"leggings"));
    assert_eq!(keywords[0], "cardigan");

    let change_of = |kw: &str| {
        written
            .iter()
            .find(|r| r.cell(5) == kw)
            .map(|r| r.cell(6).to_string())
            .unwrap()
    };
    assert_eq!(change_of("wide slacks"), "▲3");
    assert_eq!(change_of("cardigan"), "(-)");
    assert_eq!(change_of("blouse"), "▼3");
    assert_eq!(change_of("hoodie"), "new");

    for row in written {
        assert_eq!(row.cell(0), "2026-10-18");
        assert_eq!(row.cell(2), "100");
        assert_eq!(row.cell(3), "Women's Fashion");
        assert_eq!(row.cell(7), "TRUE");
    }

    // Rows 7..=15 in the sheet; cardigan is row 7.
    assert_eq!(store.text_colors.get(&7), Some(&BLACK));
    let slacks_row = 7 + keywords.iter().position(|k| *k == "wide slacks").unwrap();
    assert_eq!(store.text_colors.get(&slacks_row), Some(&RED));
    let blouse_row = 7 + keywords.iter().position(|k| *k == "blouse").unwrap();
    assert_eq!(store.text_colors.get(&blouse_row), Some(&BLUE));

    let marker = store.marker(2).unwrap();
    assert!(marker.starts_with("Completed: "), "marker was {:?}", marker);
    assert_eq!(store.marker(1), Some("log"));
}

#[test]
fn test_category_mismatch_cancels_without_prompt_or_append() {
    let html = fixture("womens_fashion.html");
    let mut store = MemoryStore::new(vec![source_row(2, "300", "Men's Fashion", &html)]);
    let mut confirm = Scripted::new(vec![]);

    let summary = run(&mut store, &mut confirm);

    assert_eq!(confirm.asked, 0);
    assert_eq!(store.append_calls, 0);
    assert!(matches!(summary.outcomes[0].1, RowOutcome::CategoryMismatch { .. }));
    assert_eq!(
        store.marker(2),
        Some("Cancelled: category mismatch (expected Men's Fashion, got Women's Fashion)")
    );
}

#[test]
fn test_declined_row_is_marked_and_not_written() {
    let html = fixture("womens_fashion.html");
    let mut store = MemoryStore::new(vec![source_row(2, "100", "", &html)]);
    let mut confirm = Scripted::new(vec![operator(false)]);

    let summary = run(&mut store, &mut confirm);

    assert_eq!(summary.outcomes, vec![(2, RowOutcome::UserCancelled)]);
    assert_eq!(store.append_calls, 0);
    assert_eq!(store.marker(2), Some("Cancelled: declined by operator"));
}

#[test]
fn test_timeout_default_writes_exactly_once() {
    let html = fixture("womens_fashion.html");
    let mut store = MemoryStore::new(vec![source_row(2, "100", "Women's Fashion", &html)]);
    let mut confirm = Scripted::new(vec![]);

    let summary = run(&mut store, &mut confirm);

    assert_eq!(confirm.asked, 1);
    assert_eq!(summary.completed(), 1);
    assert_eq!(store.append_calls, 1);
    assert_eq!(store.destination.len(), 9);
}

#[test]
fn test_rerun_selects_nothing() {
    let html = fixture("womens_fashion.html");
    let mut store = MemoryStore::new(vec![
        header(),
        source_row(2, "100", "Women's Fashion", &html),
        source_row(3, "101", "Kitchen", ""),
    ]);

    run(&mut store, &mut Scripted::new(vec![]));
    assert_eq!(store.append_calls, 1);
    let marks = store.mark_calls.len();

    let mut confirm = Scripted::new(vec![]);
    let summary = run(&mut store, &mut confirm);

    assert_eq!(summary.pending, 0);
    assert!(summary.outcomes.is_empty());
    assert_eq!(confirm.asked, 0);
    assert_eq!(store.append_calls, 1);
    assert_eq!(store.mark_calls.len(), marks);
}

#[test]
fn test_write_failure_leaves_row_for_next_run() {
    let html = fixture("womens_fashion.html");
    let mut store = MemoryStore::new(vec![source_row(2, "100", "Women's Fashion", &html)]);
    store.fail.append = true;

    let summary = run(&mut store, &mut Scripted::new(vec![]));

    assert!(matches!(summary.outcomes[0].1, RowOutcome::WriteErrored(_)));
    assert_eq!(store.marker(2), Some(""));
    assert!(store.destination.is_empty());
    assert!(store.mark_calls.is_empty());

    store.fail.append = false;
    let summary = run(&mut store, &mut Scripted::new(vec![]));
    assert_eq!(summary.completed(), 1);
    assert_eq!(store.destination.len(), 9);
}

#[test]
fn test_empty_html_and_no_keywords_are_marked() {
    let mut store = MemoryStore::new(vec![
        source_row(2, "100", "Women's Fashion", "   "),
        source_row(3, "101", "", "<div><p>nothing here</p></div>"),
    ]);
    let mut confirm = Scripted::new(vec![]);

    let summary = run(&mut store, &mut confirm);

    assert_eq!(
        summary.outcomes,
        vec![(2, RowOutcome::Skipped), (3, RowOutcome::ExtractFailed)]
    );
    assert_eq!(confirm.asked, 0);
    assert_eq!(store.marker(2), Some("Skipped: empty HTML"));
    assert_eq!(store.marker(3), Some("Error: no keywords found"));
}

#[test]
fn test_unreadable_history_treats_every_keyword_as_new() {
    let html = fixture("womens_fashion.html");
    let mut store = MemoryStore::new(vec![source_row(2, "100", "Women's Fashion", &html)])
        .with_destination(vec![history("2026-10-11", "100", "1", "cardigan")]);
    store.fail.read_destination = true;

    let summary = run(&mut store, &mut Scripted::new(vec![]));

    assert_eq!(summary.completed(), 1);
    assert!(store.destination[1..].iter().all(|r| r.cell(6) == "new"));
}

#[test]
fn test_unreadable_source_sheet_aborts_run() {
    let mut store = MemoryStore::new(vec![]);
    store.fail.read_source = true;
    let extractor = KeywordExtractor::new(&SelectorConfig::default()).unwrap();
    let mut confirm = Scripted::new(vec![]);

    let result = Runner::new(&mut store, &mut confirm, &extractor, RunOptions::default()).run();
    assert!(result.is_err());
}

#[test]
fn test_consecutive_blocks_alternate_background() {
    let html = fixture("womens_fashion.html");
    let mut store = MemoryStore::new(vec![
        source_row(2, "100", "Women's Fashion", &html),
        source_row(3, "100", "Women's Fashion", &html),
        source_row(4, "100", "Women's Fashion", &html),
    ]);

    let summary = run(&mut store, &mut Scripted::new(vec![]));

    assert_eq!(summary.completed(), 3);
    assert_eq!(store.backgrounds.get(&1), Some(&WHITE));
    assert_eq!(store.backgrounds.get(&9), Some(&WHITE));
    assert_eq!(store.backgrounds.get(&10), Some(&band_color()));
    assert_eq!(store.backgrounds.get(&18), Some(&band_color()));
    assert_eq!(store.backgrounds.get(&19), Some(&WHITE));
}

#[test]
fn test_limit_stops_after_n_rows() {
    let html = fixture("womens_fashion.html");
    let mut store = MemoryStore::new(vec![
        source_row(2, "100", "Women's Fashion", &html),
        source_row(3, "100", "Women's Fashion", &html),
    ]);
    let extractor = KeywordExtractor::new(&SelectorConfig::default()).unwrap();
    let mut confirm = Scripted::new(vec![]);
    let options = RunOptions {
        today: today(),
        limit: Some(1),
    };

    let summary = Runner::new(&mut store, &mut confirm, &extractor, options)
        .run()
        .unwrap();

    assert_eq!(summary.pending, 1);
    assert_eq!(store.marker(3), Some(""));
}

#[test]
fn test_interrupt_declines_row_and_stops_run() {
    let html = fixture("womens_fashion.html");
    let mut store = MemoryStore::new(vec![
        source_row(2, "100", "Women's Fashion", &html),
        source_row(3, "100", "Women's Fashion", &html),
    ]);
    let mut confirm = Scripted::new(vec![Decision {
        proceed: false,
        source: DecisionSource::Interrupted,
    }]);

    let summary = run(&mut store, &mut confirm);

    assert!(summary.interrupted);
    assert_eq!(summary.outcomes, vec![(2, RowOutcome::UserCancelled)]);
    assert_eq!(confirm.asked, 1);
    assert_eq!(store.append_calls, 0);
    assert_eq!(store.marker(2), Some("Cancelled: declined by operator"));
    assert_eq!(store.marker(3), Some(""));
}
