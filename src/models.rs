use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Client {
    pub id: Uuid,
    pub external_ref: Option<String>,
    pub name: String,
    pub contract_executed: bool,
    pub total_lives: Option<i32>,
    pub instructions: Option<String>,
}

/// Client fields as supplied by import or seed, before an id is assigned.
#[derive(Debug, Clone, PartialEq)]
pub struct NewClient {
    pub external_ref: String,
    pub name: String,
    pub contract_executed: bool,
    pub total_lives: Option<i32>,
    pub instructions: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeklyCommitment {
    pub id: Uuid,
    pub client_id: Uuid,
    pub weekly_qty: i64,
    /// Always a Monday.
    pub start_week: NaiveDate,
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionEvent {
    pub id: Uuid,
    pub client_id: Uuid,
    pub occurred_on: NaiveDateTime,
    pub qty_completed: i64,
    pub note: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Green,
    Yellow,
    Red,
}

impl Status {
    pub fn as_str(self) -> &'static str {
        match self {
            Status::Green => "green",
            Status::Yellow => "yellow",
            Status::Red => "red",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Current-week obligation for one client.
///
/// `carry_in` is signed: positive is last week's shortfall, negative is
/// over-delivery. Every other quantity is non-negative.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeeklyFigures {
    pub quota_this_week: i64,
    pub quota_last_week: i64,
    pub completed_last_week: i64,
    pub carry_in: i64,
    pub required: i64,
    pub completed_this_week: i64,
    pub remaining: i64,
    pub need_per_day: f64,
    pub status: Status,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClientWeek {
    pub client: Client,
    pub figures: WeeklyFigures,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PortfolioKpis {
    pub total_required: i64,
    pub total_completed: i64,
    pub total_remaining: i64,
    pub clients_green: usize,
    pub clients_yellow: usize,
    pub clients_red: usize,
}
