//! Ready-made date range strings for global filters.
//!
//! Ranges use the `start/end` form the reporting service accepts, with
//! millisecond precision, e.g. `2024-05-01T00:00:00.000/2024-05-31T23:59:59.999`.
//! All of them are anchored to one calendar day fixed when the table is built.

use chrono::{Datelike, Days, Local, Months, NaiveDate};

const START_OF_DAY: &str = "T00:00:00.000";
const END_OF_DAY: &str = "T23:59:59.999";

/// Named ranges relative to the anchor day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DatePreset {
    /// First to last day of the current month, inclusive.
    ThisMonth,
    /// Start of the month up to the start of today.
    UntilToday,
    /// Start of the month up to the end of today.
    TodayIncluded,
    /// 30 days back up to the start of today.
    Last30DaysTillToday,
    /// 30 days back up to the start of tomorrow.
    Last30DaysTodayIncluded,
    /// 7 days back up to the start of today.
    Last7DaysTillToday,
    /// 7 days back up to the end of today.
    Last7DaysTodayIncluded,
}

impl DatePreset {
    pub const ALL: [DatePreset; 7] = [
        DatePreset::ThisMonth,
        DatePreset::UntilToday,
        DatePreset::TodayIncluded,
        DatePreset::Last30DaysTillToday,
        DatePreset::Last30DaysTodayIncluded,
        DatePreset::Last7DaysTillToday,
        DatePreset::Last7DaysTodayIncluded,
    ];

    /// The lookup key used for this preset.
    pub fn name(&self) -> &'static str {
        match self {
            DatePreset::ThisMonth => "thisMonth",
            DatePreset::UntilToday => "untilToday",
            DatePreset::TodayIncluded => "todayIncluded",
            DatePreset::Last30DaysTillToday => "last30daysTillToday",
            DatePreset::Last30DaysTodayIncluded => "last30daysTodayIncluded",
            DatePreset::Last7DaysTillToday => "last7daysTillToday",
            DatePreset::Last7DaysTodayIncluded => "last7daysTodayIncluded",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|preset| preset.name() == name)
    }
}

/// Precomputed range strings for every [`DatePreset`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateRanges {
    today: NaiveDate,
    ranges: [String; 7],
}

impl DateRanges {
    /// Anchors the table to the current local date.
    pub fn now() -> Self {
        Self::anchored(Local::now().date_naive())
    }

    /// Anchors the table to `today`.
    pub fn anchored(today: NaiveDate) -> Self {
        let start_today = start_of(today);
        let month_start = today - Days::new(u64::from(today.day0()));
        let month_end = month_start + Months::new(1) - Days::new(1);
        let thirty_back = start_of(today - Days::new(30));
        let seven_back = start_of(today - Days::new(7));

        let ranges = DatePreset::ALL.map(|preset| match preset {
            DatePreset::ThisMonth => range(start_of(month_start), end_of(month_end)),
            DatePreset::UntilToday => range(start_of(month_start), start_today.clone()),
            DatePreset::TodayIncluded => range(start_of(month_start), end_of(today)),
            DatePreset::Last30DaysTillToday => range(thirty_back.clone(), start_today.clone()),
            DatePreset::Last30DaysTodayIncluded => {
                range(thirty_back.clone(), start_of(today + Days::new(1)))
            }
            DatePreset::Last7DaysTillToday => range(seven_back.clone(), start_today.clone()),
            DatePreset::Last7DaysTodayIncluded => range(seven_back.clone(), end_of(today)),
        });

        Self { today, ranges }
    }

    /// The day every range is relative to.
    pub fn today(&self) -> NaiveDate {
        self.today
    }

    pub fn get(&self, preset: DatePreset) -> &str {
        &self.ranges[preset as usize]
    }

    /// Looks a range up by its preset name, e.g. `"last7daysTillToday"`.
    pub fn by_name(&self, name: &str) -> Option<&str> {
        DatePreset::from_name(name).map(|preset| self.get(preset))
    }

    pub fn iter(&self) -> impl Iterator<Item = (DatePreset, &str)> {
        DatePreset::ALL
            .into_iter()
            .zip(self.ranges.iter().map(String::as_str))
    }
}

fn start_of(day: NaiveDate) -> String {
    format!("{}{}", day.format("%Y-%m-%d"), START_OF_DAY)
}

fn end_of(day: NaiveDate) -> String {
    format!("{}{}", day.format("%Y-%m-%d"), END_OF_DAY)
}

fn range(start: String, end: String) -> String {
    format!("{}/{}", start, end)
}
