use chrono::{Duration, NaiveDate};

/// Name of the record file holding a local day.
pub fn date_to_record_name(date: NaiveDate) -> String {
    format!("{}.jsonl", date.format("%Y-%m-%d"))
}

/// Inverse of [date_to_record_name]. Returns `None` for anything that isn't a record file.
pub fn record_name_to_date(name: &str) -> Option<NaiveDate> {
    let stem = name.strip_suffix(".jsonl")?;
    NaiveDate::parse_from_str(stem, "%Y-%m-%d").ok()
}

/// The `days` dates ending with `last`, oldest first.
pub fn trailing_days(last: NaiveDate, days: u32) -> Vec<NaiveDate> {
    (0..days as i64)
        .rev()
        .filter_map(|offset| last.checked_sub_signed(Duration::days(offset)))
        .collect()
}
