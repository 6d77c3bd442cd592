//! Week-window arithmetic for the weekly summary endpoint.
//!
//! A week window is the Monday-to-Sunday span containing an anchor date
//! (ISO week, never Sunday-start).

use chrono::{Datelike, Duration, Local, NaiveDate, Utc};
use chrono_tz::Tz;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WeekWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

#[derive(Debug, Error)]
#[error("unknown timezone: {0}")]
pub struct InvalidTimezone(pub String);

/// The Monday-to-Sunday window containing `anchor`.
pub fn week_window(anchor: NaiveDate) -> WeekWindow {
    let days_from_monday = anchor.weekday().num_days_from_monday() as i64;
    let start = anchor - Duration::days(days_from_monday);
    WeekWindow {
        start,
        end: start + Duration::days(6),
    }
}

/// Today's date in the caller-supplied IANA timezone, or server-local time
/// when absent.
pub fn today_in(tz: Option<&str>) -> Result<NaiveDate, InvalidTimezone> {
    match tz {
        Some(name) => {
            let tz: Tz = name
                .parse()
                .map_err(|_| InvalidTimezone(name.to_string()))?;
            Ok(Utc::now().with_timezone(&tz).date_naive())
        }
        None => Ok(Local::now().date_naive()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn midweek_anchor_snaps_to_monday() {
        // 2025-03-06 is a Thursday
        let w = week_window(d(2025, 3, 6));
        assert_eq!(w.start, d(2025, 3, 3));
        assert_eq!(w.end, d(2025, 3, 9));
    }

    #[test]
    fn monday_anchor_is_its_own_start() {
        let w = week_window(d(2025, 3, 3));
        assert_eq!(w.start, d(2025, 3, 3));
        assert_eq!(w.end, d(2025, 3, 9));
    }

    #[test]
    fn sunday_belongs_to_the_preceding_monday() {
        // ISO weeks: Sunday is the last day, not the first
        let w = week_window(d(2025, 3, 9));
        assert_eq!(w.start, d(2025, 3, 3));
        assert_eq!(w.end, d(2025, 3, 9));
    }

    #[test]
    fn window_spans_year_boundary() {
        // 2026-01-01 is a Thursday; its week starts Monday 2025-12-29
        let w = week_window(d(2026, 1, 1));
        assert_eq!(w.start, d(2025, 12, 29));
        assert_eq!(w.end, d(2026, 1, 4));
    }

    #[test]
    fn known_timezone_resolves() {
        assert!(today_in(Some("Europe/Warsaw")).is_ok());
        assert!(today_in(None).is_ok());
    }

    #[test]
    fn unknown_timezone_is_rejected() {
        let err = today_in(Some("Mars/Olympus_Mons")).unwrap_err();
        assert!(err.to_string().contains("Mars/Olympus_Mons"));
    }
}
