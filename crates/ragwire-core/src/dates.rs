//! Calendar helpers for temporal filtering
//!
//! Turns a single temporal anchor (`YYYY-MM-DD`) into a backward-looking
//! window of calendar dates suitable for a `$in` filter.

use crate::error::{RagError, Result};
use chrono::{Days, Local, NaiveDate};

/// Date format used for anchors and filter values
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Default window size for temporal queries
pub const DEFAULT_WINDOW_DAYS: usize = 7;

/// Largest window accepted from configuration
pub const MAX_WINDOW_DAYS: usize = 366;

/// Expand an anchor date into `days` dates, newest first.
///
/// The anchor itself is the first entry and each following entry is one
/// calendar day earlier. An empty anchor means "no temporal filter" and
/// yields an empty window.
///
/// ```
/// let dates = ragwire_core::dates::expand_date_range("2024-03-01", 2).unwrap();
/// assert_eq!(dates, vec!["2024-03-01", "2024-02-29"]);
/// ```
pub fn expand_date_range(anchor: &str, days: usize) -> Result<Vec<String>> {
    if anchor.is_empty() {
        return Ok(Vec::new());
    }

    let start = parse_date(anchor)?;

    let mut window = Vec::with_capacity(days.min(MAX_WINDOW_DAYS));
    for offset in 0..days {
        let date = start
            .checked_sub_days(Days::new(offset as u64))
            .ok_or_else(|| RagError::InvalidDate {
                input: anchor.to_string(),
                reason: format!("window of {} days underflows the calendar", days),
            })?;
        window.push(date.format(DATE_FORMAT).to_string());
    }

    Ok(window)
}

/// Parse a strict `YYYY-MM-DD` date.
pub fn parse_date(input: &str) -> Result<NaiveDate> {
    let date =
        NaiveDate::parse_from_str(input, DATE_FORMAT).map_err(|e| RagError::InvalidDate {
            input: input.to_string(),
            reason: e.to_string(),
        })?;

    // chrono accepts unpadded fields ("2025-1-3"); the filter values stored
    // upstream are always zero-padded, so only the canonical form is allowed.
    if date.format(DATE_FORMAT).to_string() != input {
        return Err(RagError::InvalidDate {
            input: input.to_string(),
            reason: "date must be zero-padded".to_string(),
        });
    }

    Ok(date)
}

/// Today's local date as `YYYY-MM-DD`
pub fn today() -> String {
    Local::now().format(DATE_FORMAT).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_expand_week_within_month() {
        let dates = expand_date_range("2025-10-31", 7).unwrap();
        assert_eq!(
            dates,
            vec![
                "2025-10-31",
                "2025-10-30",
                "2025-10-29",
                "2025-10-28",
                "2025-10-27",
                "2025-10-26",
                "2025-10-25",
            ]
        );
    }

    #[test]
    fn test_expand_crosses_month_boundary() {
        let dates = expand_date_range("2025-10-03", 7).unwrap();
        assert_eq!(dates.len(), 7);
        assert_eq!(dates[0], "2025-10-03");
        assert_eq!(dates[3], "2025-09-30");
        assert_eq!(dates[6], "2025-09-27");
    }

    #[test]
    fn test_expand_crosses_year_boundary() {
        let dates = expand_date_range("2025-01-03", 7).unwrap();
        assert_eq!(dates[2], "2025-01-01");
        assert_eq!(dates[3], "2024-12-31");
        assert_eq!(dates[6], "2024-12-28");
    }

    #[test]
    fn test_expand_includes_leap_day() {
        let dates = expand_date_range("2024-03-01", 5).unwrap();
        assert_eq!(
            dates,
            vec![
                "2024-03-01",
                "2024-02-29",
                "2024-02-28",
                "2024-02-27",
                "2024-02-26",
            ]
        );
    }

    #[test]
    fn test_expand_non_leap_year() {
        let dates = expand_date_range("2025-03-01", 2).unwrap();
        assert_eq!(dates, vec!["2025-03-01", "2025-02-28"]);
    }

    #[test]
    fn test_empty_anchor_yields_empty_window() {
        for days in [0, 1, 7, 30] {
            assert!(expand_date_range("", days).unwrap().is_empty());
        }
    }

    #[test]
    fn test_zero_days() {
        assert!(expand_date_range("2025-10-31", 0).unwrap().is_empty());
    }

    #[test]
    fn test_malformed_anchor_fails() {
        for bad in ["2025/10/31", "31-10-2025", "2025-13-01", "2025-02-30", "yesterday", "2025-1-3"] {
            let err = expand_date_range(bad, 7).unwrap_err();
            assert!(
                matches!(err, RagError::InvalidDate { ref input, .. } if input == bad),
                "expected InvalidDate for {}, got {:?}",
                bad,
                err
            );
        }
    }

    #[test]
    fn test_today_is_parseable() {
        assert!(parse_date(&today()).is_ok());
    }

    proptest! {
        #[test]
        fn prop_window_is_strictly_descending_by_one_day(
            offset in 0i64..20_000,
            days in 0usize..60,
        ) {
            let anchor = NaiveDate::from_ymd_opt(1990, 1, 1).unwrap() + chrono::Duration::days(offset);
            let anchor_str = anchor.format(DATE_FORMAT).to_string();
            let dates = expand_date_range(&anchor_str, days).unwrap();

            prop_assert_eq!(dates.len(), days);
            if let Some(first) = dates.first() {
                prop_assert_eq!(first, &anchor_str);
            }
            for pair in dates.windows(2) {
                let newer = parse_date(&pair[0]).unwrap();
                let older = parse_date(&pair[1]).unwrap();
                prop_assert_eq!(newer - older, chrono::Duration::days(1));
            }
        }
    }
}
