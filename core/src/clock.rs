//! Reporting clock: owns the injected reference date ("now") and the
//! calendar arithmetic every stage shares.
//!
//! RULE: No stage reads the wall clock. The runner captures the date once
//! and every stage sees the same value.

use chrono::{Datelike, Duration, Local, Months, NaiveDate};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReportingClock {
    pub reporting_date: NaiveDate,
}

impl ReportingClock {
    pub fn new(reporting_date: NaiveDate) -> Self {
        Self { reporting_date }
    }

    /// Capture today's local date. Only the runner should call this.
    pub fn today() -> Self {
        Self::new(Local::now().date_naive())
    }

    /// The date `days` before the reporting date.
    pub fn days_back(&self, days: u32) -> NaiveDate {
        self.reporting_date - Duration::days(i64::from(days))
    }

    /// The `days` calendar days ending on (and including) the reporting date,
    /// oldest first.
    pub fn trailing_days(&self, days: u32) -> Vec<NaiveDate> {
        let start = self.days_back(days.saturating_sub(1));
        start.iter_days().take(days as usize).collect()
    }

    /// First day of the month containing the reporting date.
    pub fn horizon_month(&self) -> NaiveDate {
        month_start(self.reporting_date)
    }

    /// Whole days elapsed from `date` to the reporting date (negative if future).
    pub fn days_since(&self, date: NaiveDate) -> i64 {
        (self.reporting_date - date).num_days()
    }
}

/// First day of the month containing `date`.
pub fn month_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(date.day0()))
}

/// First day of the month after the one containing `date`.
/// None only at the end of chrono's representable range.
pub fn next_month_start(date: NaiveDate) -> Option<NaiveDate> {
    month_start(date).checked_add_months(Months::new(1))
}

/// `YYYY-MM` label used for monthly grouping keys.
pub fn month_key(date: NaiveDate) -> String {
    format!("{:04}-{:02}", date.year(), date.month())
}

/// ISO-8601 week number (1..=53).
pub fn iso_week(date: NaiveDate) -> u32 {
    date.iso_week().week()
}
