use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// The fixed daily slot grid. Every appointment lands on one of these labels.
pub const SLOT_TIMES: [&str; 8] = [
    "10:00", "10:40", "11:20", "12:00", "12:40", "13:20", "14:00", "14:20",
];

pub const SLOT_DURATION_MINUTES: i32 = 40;

pub fn is_valid_slot(time: &str) -> bool {
    SLOT_TIMES.contains(&time)
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SlotStatus {
    Available,
    Full,
    Blocked,
}

#[derive(Debug, Clone, Serialize)]
pub struct SlotAvailability {
    pub time: String,
    pub total_capacity: i64,
    pub booked_count: i64,
    pub available_spots: i64,
    pub is_available: bool,
    pub status: SlotStatus,
}

#[derive(Debug, Clone, Serialize)]
pub struct DayAvailability {
    pub date: NaiveDate,
    pub slots: Vec<SlotAvailability>,
    pub total_booked: i64,
    pub total_available: i64,
    pub is_day_blocked: bool,
}

/// Per-date rollup used by the range endpoint; same aggregates without the
/// slot breakdown.
#[derive(Debug, Clone, Serialize)]
pub struct DaySummary {
    pub date: NaiveDate,
    pub total_capacity: i64,
    pub total_booked: i64,
    pub total_available: i64,
    pub is_day_blocked: bool,
}
