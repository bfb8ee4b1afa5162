//! Report date windows.
//!
//! Dawn, morning and afternoon columns use every day but the first; the night
//! column uses every day but the last, since a night count closes into the
//! following morning.

use anyhow::{Context, Result, bail};
use chrono::{Datelike, Duration, NaiveDate, Weekday};
use serde::Serialize;

use crate::config::ComparisonConfig;
use crate::parser::Period;
use crate::report::types::Column;

/// Inclusive `[start, end]` range of report days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReportWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl ReportWindow {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if start > end {
            bail!("report window starts after it ends ({start} > {end})");
        }
        Ok(Self { start, end })
    }

    pub fn contains(&self, day: NaiveDate) -> bool {
        self.start <= day && day <= self.end
    }

    pub fn days(&self) -> Vec<NaiveDate> {
        self.start
            .iter_days()
            .take_while(|d| *d <= self.end)
            .collect()
    }

    /// All days but the first.
    pub fn valid_days(&self) -> Vec<NaiveDate> {
        self.days().into_iter().skip(1).collect()
    }

    /// All days but the last.
    pub fn night_days(&self) -> Vec<NaiveDate> {
        let mut days = self.days();
        days.pop();
        days
    }

    pub fn days_for(&self, period: Period) -> Vec<NaiveDate> {
        match period {
            Period::Noite => self.night_days(),
            _ => self.valid_days(),
        }
    }

    /// Matrix columns: every period in order, each over its own day list.
    pub fn columns(&self) -> Vec<Column> {
        Period::ALL
            .iter()
            .flat_map(|&period| {
                self.days_for(period)
                    .into_iter()
                    .map(move |day| Column { period, day })
            })
            .collect()
    }

    /// Last day of the dawn/morning/afternoon columns, or `end` if there is none.
    pub fn last_valid_day(&self) -> NaiveDate {
        self.valid_days().last().copied().unwrap_or(self.end)
    }

    /// Last day of the night column, or `end` if there is none.
    pub fn last_night_day(&self) -> NaiveDate {
        self.night_days().last().copied().unwrap_or(self.end)
    }

    /// The same window `days` earlier. Fails when the shift leaves the
    /// calendar range.
    pub fn shifted_back(&self, days: i64) -> Result<Self> {
        let shift = |day: NaiveDate| {
            Duration::try_days(days)
                .and_then(|delta| day.checked_sub_signed(delta))
                .with_context(|| format!("cannot shift {day} back by {days} days"))
        };
        Ok(Self {
            start: shift(self.start)?,
            end: shift(self.end)?,
        })
    }

    /// Days to shift back for the comparison window: a Monday report compares
    /// against Friday when the config asks for it.
    pub fn comparison_shift(&self, config: &ComparisonConfig) -> i64 {
        if config.weekday_aware && self.ends_on_monday() {
            config.monday_shift_days
        } else {
            config.default_shift_days
        }
    }

    pub fn previous(&self, config: &ComparisonConfig) -> Result<Self> {
        self.shifted_back(self.comparison_shift(config))
    }

    pub fn ends_on_monday(&self) -> bool {
        self.end.weekday() == Weekday::Mon
    }
}
