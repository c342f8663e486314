//! Date-encoding conventions shared by ingestion and scoring.
//!
//! The policy catalog publishes business periods as 8-digit `yyyyMMdd`
//! strings, the housing feeds as `yyyy-MM-dd` or `yyyy.MM.dd`. Parsing is
//! lenient by design: a record with an unreadable date is excluded from
//! scoring, it never aborts a page loop.

use chrono::NaiveDate;

/// Literal end-date meaning "no fixed end — ongoing".
pub const OPEN_ENDED: &str = "00000000";

/// Parse an 8-digit `yyyyMMdd` policy date. [`OPEN_ENDED`] and anything
/// unparseable come back as `None`.
pub fn parse_compact_date(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    if trimmed.len() != 8 || trimmed == OPEN_ENDED {
        return None;
    }
    NaiveDate::parse_from_str(trimmed, "%Y%m%d").ok()
}

/// True when the string is the open-ended sentinel.
pub fn is_open_ended(raw: &str) -> bool {
    raw.trim() == OPEN_ENDED
}

/// Parse a housing-feed date, accepting both separators the authorities use.
pub fn parse_notice_date(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(trimmed, "%Y.%m.%d"))
        .ok()
}

/// Parse a provider age bound like `"19"`; blanks and garbage are `None`.
pub fn parse_age(raw: &str) -> Option<u32> {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return None;
    }
    digits.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compact_dates_parse_and_reject() {
        assert_eq!(
            parse_compact_date("20250301"),
            NaiveDate::from_ymd_opt(2025, 3, 1)
        );
        assert_eq!(parse_compact_date("00000000"), None);
        assert_eq!(parse_compact_date("2025-03-01"), None);
        assert_eq!(parse_compact_date(""), None);
        assert!(is_open_ended(" 00000000 "));
    }

    #[test]
    fn notice_dates_accept_both_separators() {
        let expected = NaiveDate::from_ymd_opt(2025, 11, 20);
        assert_eq!(parse_notice_date("2025-11-20"), expected);
        assert_eq!(parse_notice_date("2025.11.20"), expected);
        assert_eq!(parse_notice_date("상시"), None);
    }

    #[test]
    fn age_parsing_keeps_digits_only() {
        assert_eq!(parse_age("19"), Some(19));
        assert_eq!(parse_age("만 34세"), Some(34));
        assert_eq!(parse_age(""), None);
    }
}
