use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// An admin-defined exception to the base day-of-week capacity rule, keyed by
/// exact (date, slot). Capacity 0 blocks the slot entirely.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapacityOverride {
    pub id: i64,
    pub date: NaiveDate,
    pub time_slot: String,
    pub capacity: i64,
    pub active: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}
