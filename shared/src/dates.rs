//! Lenient date-string normalization
//!
//! Accepts the free-text dates that show up in spreadsheets and older
//! records and produces ISO calendar dates.

use chrono::{DateTime, Local, NaiveDate};

/// Fallback formats tried after the ISO and D/M/Y fast paths
const FALLBACK_FORMATS: &[&str] = &[
    "%Y/%m/%d",
    "%d-%m-%Y",
    "%d %b %Y",
    "%d %B %Y",
    "%b %d, %Y",
    "%B %d, %Y",
];

/// Normalize a free-text date string to a calendar date.
///
/// Already-ISO strings pass through; `D/M/Y` strings with a 2- or 4-digit
/// year are reinterpreted (2-digit years mean the 2000s); RFC 3339 stamps
/// are converted to the local calendar date so the day never shifts.
/// Returns `None` for anything unparseable.
pub fn normalize_date(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(date);
    }

    if let Some(date) = parse_slash_date(s) {
        return Some(date);
    }

    for format in FALLBACK_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(s, format) {
            return Some(date);
        }
    }

    if let Ok(stamp) = DateTime::parse_from_rfc3339(s) {
        return Some(stamp.with_timezone(&Local).date_naive());
    }

    None
}

/// Render a stored date back to its ISO form, empty when absent
pub fn format_date(date: Option<NaiveDate>) -> String {
    date.map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_default()
}

/// `D/M/Y` with a 2- or 4-digit year; 2-digit years land in the 2000s
fn parse_slash_date(s: &str) -> Option<NaiveDate> {
    let parts: Vec<&str> = s.split('/').collect();
    if parts.len() != 3 {
        return None;
    }
    let day: u32 = parts[0].trim().parse().ok()?;
    let month: u32 = parts[1].trim().parse().ok()?;
    let year_part = parts[2].trim();
    let mut year: i32 = year_part.parse().ok()?;
    if year_part.len() <= 2 {
        year += 2000;
    }
    NaiveDate::from_ymd_opt(year, month, day)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn iso_passes_through() {
        assert_eq!(
            normalize_date("2025-09-05"),
            NaiveDate::from_ymd_opt(2025, 9, 5)
        );
    }

    #[test]
    fn short_slash_date_is_day_month_year() {
        assert_eq!(
            normalize_date("5/9/25"),
            NaiveDate::from_ymd_opt(2025, 9, 5)
        );
    }

    #[test]
    fn full_slash_date_keeps_its_century() {
        assert_eq!(
            normalize_date("31/12/1999"),
            NaiveDate::from_ymd_opt(1999, 12, 31)
        );
    }

    #[test]
    fn year_first_slash_date_falls_through() {
        assert_eq!(
            normalize_date("2025/09/05"),
            NaiveDate::from_ymd_opt(2025, 9, 5)
        );
    }

    #[test]
    fn spelled_out_dates_parse() {
        assert_eq!(
            normalize_date("5 Sep 2025"),
            NaiveDate::from_ymd_opt(2025, 9, 5)
        );
        assert_eq!(
            normalize_date("September 5, 2025"),
            NaiveDate::from_ymd_opt(2025, 9, 5)
        );
    }

    #[test]
    fn garbage_is_none() {
        assert_eq!(normalize_date("not a date"), None);
        assert_eq!(normalize_date(""), None);
        assert_eq!(normalize_date("32/13/2025"), None);
    }

    #[test]
    fn formatting_round_trips() {
        let date = NaiveDate::from_ymd_opt(2025, 9, 5);
        assert_eq!(format_date(date), "2025-09-05");
        assert_eq!(format_date(None), "");
    }

    proptest! {
        /// Arbitrary input never panics; valid D/M/Y inputs round-trip to ISO
        #[test]
        fn never_panics_on_arbitrary_input(s in ".{0,40}") {
            let _ = normalize_date(&s);
        }

        #[test]
        fn valid_dmy_round_trips(day in 1u32..=28, month in 1u32..=12, year in 2000i32..=2099) {
            let raw = format!("{}/{}/{}", day, month, year);
            let parsed = normalize_date(&raw);
            prop_assert_eq!(parsed, NaiveDate::from_ymd_opt(year, month, day));
        }
    }
}
