//! Date-range filtering for dated entries
//!
//! Bounds are inclusive and compared as calendar dates; time-of-day is
//! ignored. Entries whose date is absent or unparseable pass unconditionally
//! so that data of unknown shape is never silently dropped.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Optional inclusive calendar-date bounds
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    /// Inclusive lower bound
    pub start: Option<NaiveDate>,
    /// Inclusive upper bound
    pub end: Option<NaiveDate>,
}

impl DateRange {
    /// A range with both bounds set
    pub fn between(start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            start: Some(start),
            end: Some(end),
        }
    }

    /// A range bounded only from below
    pub fn since(start: NaiveDate) -> Self {
        Self {
            start: Some(start),
            end: None,
        }
    }

    /// A range bounded only from above
    pub fn until(end: NaiveDate) -> Self {
        Self {
            start: None,
            end: Some(end),
        }
    }

    /// Whether any bound is configured
    pub fn is_bounded(&self) -> bool {
        self.start.is_some() || self.end.is_some()
    }

    /// Decide whether a raw date string falls inside the range
    ///
    /// Fail-open: a missing or unparseable date always passes, regardless
    /// of configured bounds. The raw value may be a plain `YYYY-MM-DD` date
    /// or an ISO datetime, whose date part is used.
    pub fn contains(&self, raw_date: Option<&str>) -> bool {
        if !self.is_bounded() {
            return true;
        }

        let Some(raw) = raw_date else {
            return true;
        };
        let date_part = raw.split('T').next().unwrap_or(raw);
        let Ok(date) = NaiveDate::parse_from_str(date_part, "%Y-%m-%d") else {
            return true;
        };

        if let Some(start) = self.start
            && date < start
        {
            return false;
        }
        if let Some(end) = self.end
            && date > end
        {
            return false;
        }
        true
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn unbounded_range_passes_everything() {
        let range = DateRange::default();
        assert!(range.contains(Some("2024-03-01")));
        assert!(range.contains(Some("not a date")));
        assert!(range.contains(None));
    }

    #[test]
    fn unparseable_dates_pass_even_with_bounds() {
        let range = DateRange::between(d("2024-01-01"), d("2024-01-31"));
        assert!(range.contains(Some("garbage")), "fail-open on bad dates");
        assert!(range.contains(None), "fail-open on missing dates");
    }

    #[test]
    fn bounds_are_inclusive() {
        let range = DateRange::between(d("2024-03-01"), d("2024-03-31"));
        assert!(range.contains(Some("2024-03-01")), "start is inclusive");
        assert!(range.contains(Some("2024-03-31")), "end is inclusive");
        assert!(range.contains(Some("2024-03-15")));
        assert!(!range.contains(Some("2024-02-29")));
        assert!(!range.contains(Some("2024-04-01")));
    }

    #[test]
    fn open_start_only_checks_end() {
        let range = DateRange::until(d("2024-06-30"));
        assert!(range.contains(Some("1999-01-01")));
        assert!(!range.contains(Some("2024-07-01")));
    }

    #[test]
    fn open_end_only_checks_start() {
        let range = DateRange::since(d("2024-06-01"));
        assert!(range.contains(Some("2099-12-31")));
        assert!(!range.contains(Some("2024-05-31")));
    }

    #[test]
    fn datetime_values_compare_by_date_part() {
        let range = DateRange::between(d("2024-06-30"), d("2024-06-30"));
        assert!(range.contains(Some("2024-06-30T23:59:59Z")));
        assert!(!range.contains(Some("2024-07-01T00:00:00Z")));
    }
}
