use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// A bookable treatment type. Duration and price are informational; slot
/// admission does not vary by service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Service {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub duration_minutes: i32,
    pub price_cents: i64,
    pub active: bool,
    pub display_order: i32,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}
