//! Work-week boundaries: Monday 00:00 through Friday 23:59:59.999, local time.

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, Weekday};

/// Days assumed ahead when planning from a weekend.
pub const WEEKEND_PLANNING_DAYS: u32 = 5;

pub fn monday_of(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(date.weekday().num_days_from_monday()))
}

/// Last millisecond of the Friday belonging to `monday`'s week.
pub fn friday_end_of(monday: NaiveDate) -> NaiveDateTime {
    (monday + Duration::days(5)).and_time(NaiveTime::MIN) - Duration::milliseconds(1)
}

/// Work days left including `today`, never below one.
pub fn days_left_working_this_week(today: NaiveDate) -> u32 {
    match today.weekday() {
        Weekday::Sat | Weekday::Sun => WEEKEND_PLANNING_DAYS,
        day => 6u32.saturating_sub(day.number_from_monday()).max(1),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WorkWeek {
    monday: NaiveDate,
}

impl WorkWeek {
    pub fn containing(date: NaiveDate) -> Self {
        Self {
            monday: monday_of(date),
        }
    }

    pub fn monday(&self) -> NaiveDate {
        self.monday
    }

    pub fn friday(&self) -> NaiveDate {
        self.monday + Duration::days(4)
    }

    pub fn start(&self) -> NaiveDateTime {
        self.monday.and_time(NaiveTime::MIN)
    }

    pub fn end(&self) -> NaiveDateTime {
        friday_end_of(self.monday)
    }

    pub fn previous(&self) -> Self {
        Self {
            monday: self.monday - Duration::days(7),
        }
    }

    pub fn contains(&self, instant: NaiveDateTime) -> bool {
        instant >= self.start() && instant <= self.end()
    }
}
