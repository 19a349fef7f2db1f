use chrono::{NaiveDate, NaiveDateTime};

use crate::models::{CompletionEvent, Status, WeeklyCommitment, WeeklyFigures};
use crate::week::{days_left_working_this_week, WorkWeek};

pub const DEFAULT_YELLOW_NEED_PER_DAY: f64 = 100.0;

/// Thresholds used to classify a client's weekly pace.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatusPolicy {
    /// Daily pace above which a client without carry-in is flagged yellow.
    pub yellow_need_per_day: f64,
}

impl Default for StatusPolicy {
    fn default() -> Self {
        Self {
            yellow_need_per_day: DEFAULT_YELLOW_NEED_PER_DAY,
        }
    }
}

/// Quota of the most recently effective active commitment as of `week_start`.
pub fn quota_as_of(commitments: &[WeeklyCommitment], week_start: NaiveDate) -> i64 {
    commitments
        .iter()
        .filter(|c| c.active && c.start_week <= week_start)
        .max_by_key(|c| c.start_week)
        .map_or(0, |c| c.weekly_qty)
}

pub fn completed_within(completions: &[CompletionEvent], week: WorkWeek) -> i64 {
    completions
        .iter()
        .filter(|c| week.contains(c.occurred_on))
        .map(|c| c.qty_completed)
        .sum()
}

pub fn classify(carry_in: i64, need_per_day: f64, policy: &StatusPolicy) -> Status {
    if carry_in > 0 {
        Status::Red
    } else if need_per_day > policy.yellow_need_per_day {
        Status::Yellow
    } else {
        Status::Green
    }
}

pub fn weekly_figures(
    commitments: &[WeeklyCommitment],
    completions: &[CompletionEvent],
    today: NaiveDateTime,
    policy: &StatusPolicy,
) -> WeeklyFigures {
    let this_week = WorkWeek::containing(today.date());
    let last_week = this_week.previous();

    let quota_this_week = quota_as_of(commitments, this_week.monday());
    let quota_last_week = quota_as_of(commitments, last_week.monday());
    let completed_last_week = completed_within(completions, last_week);

    let carry_in = quota_last_week - completed_last_week;
    let required = (quota_this_week + carry_in).max(0);
    let completed_this_week = completed_within(completions, this_week);
    let remaining = (required - completed_this_week).max(0);

    let days_left = days_left_working_this_week(today.date()).max(1);
    let need_per_day = remaining as f64 / f64::from(days_left);

    WeeklyFigures {
        quota_this_week,
        quota_last_week,
        completed_last_week,
        carry_in,
        required,
        completed_this_week,
        remaining,
        need_per_day,
        status: classify(carry_in, need_per_day, policy),
    }
}
