use crate::types::{KeywordRecord, DATE_FORMAT};
use std::fmt::Write;

pub const SEPARATOR_WIDTH: usize = 50;

/// Seven-field block for one record, followed by a separator line.
pub fn format_record(record: &KeywordRecord) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "1. Date : {}", record.date.format(DATE_FORMAT));
    let _ = writeln!(out, "2. Type : {}", record.kind);
    let _ = writeln!(out, "3. Category ID : {}", record.category_id);
    let _ = writeln!(out, "4. Category : {}", record.category);
    let _ = writeln!(out, "5. Rank : {}", record.rank);
    let _ = writeln!(out, "6. Rank change : {}", record.rank_change_text());
    let _ = writeln!(out, "7. Keyword : {}", record.keyword);
    out.push_str(&"-".repeat(SEPARATOR_WIDTH));
    out.push('\n');
    out
}

pub fn format_report(records: &[KeywordRecord]) -> String {
    records.iter().map(format_record).collect()
}

pub fn print_report(records: &[KeywordRecord]) {
    print!("{}", format_report(records));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RankChange;
    use chrono::NaiveDate;

    #[test]
    fn test_format_record() {
        let record = KeywordRecord {
            date: NaiveDate::from_ymd_opt(2026, 10, 18).unwrap(),
            kind: "cp_keyword".into(),
            category_id: "100".into(),
            category: "Women's Fashion".into(),
            rank: "5".into(),
            rank_change: Some(RankChange::Up(3)),
            keyword: "cardigan".into(),
        };
        let text = format_record(&record);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 8);
        assert_eq!(lines[0], "1. Date : 2026-10-18");
        assert_eq!(lines[5], "6. Rank change : ▲3");
        assert_eq!(lines[6], "7. Keyword : cardigan");
        assert_eq!(lines[7], "-".repeat(50));
    }
}
