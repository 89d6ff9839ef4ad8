//! Delta Calculator
//!
//! Total over its inputs: malformed ranks fall back to `Unchanged`.

use crate::history::{History, ParsedRank};
use crate::types::{KeywordRecord, RankChange};
use tracing::debug;

/// Compare the current rank against the last known one.
pub fn calculate_rank_change(current: &str, previous: Option<i64>) -> RankChange {
    let Some(previous) = previous else {
        return RankChange::New;
    };
    let ParsedRank::Valid(current) = ParsedRank::parse(current) else {
        return RankChange::Unchanged;
    };
    rank_change_between(current, previous)
}

/// Positive `previous - current` means the keyword climbed.
pub fn rank_change_between(current: i64, previous: i64) -> RankChange {
    let change = i128::from(previous) - i128::from(current);
    let magnitude = u64::try_from(change.unsigned_abs()).unwrap_or(u64::MAX);
    match change {
        c if c > 0 => RankChange::Up(magnitude),
        c if c < 0 => RankChange::Down(magnitude),
        _ => RankChange::Unchanged,
    }
}

/// Fill in `rank_change` for every record that has a category id.
pub fn annotate(records: &mut [KeywordRecord], history: &History) {
    for record in records.iter_mut() {
        if record.category_id.is_empty() || record.keyword.is_empty() || record.rank.is_empty() {
            continue;
        }
        let previous = history.previous_rank(&record.category_id, &record.keyword, record.date);
        let change = calculate_rank_change(&record.rank, previous);
        match previous {
            Some(p) => debug!(keyword = %record.keyword, previous = p, current = %record.rank, change = %change, "rank resolved"),
            None => debug!(keyword = %record.keyword, current = %record.rank, "no previous rank"),
        }
        record.rank_change = Some(change);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{HistoryRow, KEYWORD_TYPE_TAG};
    use chrono::NaiveDate;
    use proptest::prelude::*;

    #[test]
    fn test_basic_cases() {
        assert_eq!(calculate_rank_change("5", Some(8)), RankChange::Up(3));
        assert_eq!(calculate_rank_change("8", Some(5)), RankChange::Down(3));
        assert_eq!(calculate_rank_change("4", Some(4)), RankChange::Unchanged);
        assert_eq!(calculate_rank_change("4", None), RankChange::New);
    }

    #[test]
    fn test_malformed_current_is_unchanged() {
        assert_eq!(calculate_rank_change("abc", Some(3)), RankChange::Unchanged);
        assert_eq!(calculate_rank_change("", Some(3)), RankChange::Unchanged);
        assert_eq!(calculate_rank_change("99999999999999999999", Some(3)), RankChange::Unchanged);
        assert_eq!(calculate_rank_change("abc", None), RankChange::New);
    }

    #[test]
    fn test_extreme_values_do_not_overflow() {
        assert_eq!(
            rank_change_between(i64::MIN, i64::MAX),
            RankChange::Up(u64::MAX)
        );
        assert_eq!(
            rank_change_between(i64::MAX, i64::MIN),
            RankChange::Down(u64::MAX)
        );
    }

    #[test]
    fn test_annotate_skips_records_without_category_id() {
        let date = NaiveDate::from_ymd_opt(2026, 10, 18).unwrap();
        let make = |cat: &str, rank: &str, kw: &str| KeywordRecord {
            date,
            kind: KEYWORD_TYPE_TAG.into(),
            category_id: cat.into(),
            category: "Women's Fashion".into(),
            rank: rank.into(),
            rank_change: None,
            keyword: kw.into(),
        };
        let mut records = vec![make("100", "5", "cardigan"), make("", "1", "coat"), make("100", "2", "boots")];
        let history = History::from_rows(&[
            HistoryRow::new(["2026-10-11", "cp_keyword", "100", "x", "8", "cardigan", "new", "TRUE"]),
            HistoryRow::new(["2026-10-04", "cp_keyword", "100", "x", "3", "cardigan", "new", "TRUE"]),
        ]);

        annotate(&mut records, &history);

        assert_eq!(records[0].rank_change, Some(RankChange::Up(3)));
        assert_eq!(records[1].rank_change, None);
        assert_eq!(records[2].rank_change, Some(RankChange::New));
    }

    proptest! {
        #[test]
        fn prop_delta_sign_and_magnitude(c in 1i64..10_000, p in 1i64..10_000) {
            let change = calculate_rank_change(&c.to_string(), Some(p));
            if p > c {
                prop_assert_eq!(change, RankChange::Up((p - c) as u64));
            } else if p < c {
                prop_assert_eq!(change, RankChange::Down((c - p) as u64));
            } else {
                prop_assert_eq!(change, RankChange::Unchanged);
            }
        }

        #[test]
        fn prop_no_previous_is_new(c in ".*") {
            prop_assert_eq!(calculate_rank_change(&c, None), RankChange::New);
        }

        #[test]
        fn prop_total_over_any_string(c in ".*", p in any::<i64>()) {
            let _ = calculate_rank_change(&c, Some(p));
        }
    }
}
