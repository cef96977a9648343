use std::sync::Arc;

use axum::extract::{Query, State};
use axum::Json;
use chrono::{Local, NaiveDate};
use serde::Deserialize;

use crate::errors::AppError;
use crate::models::{DayAvailability, DaySummary};
use crate::services::availability;
use crate::state::AppState;

const MAX_RANGE_DAYS: i64 = 92;

pub(crate) fn parse_date(field: &str, s: &str) -> Result<NaiveDate, AppError> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .map_err(|_| AppError::Validation(format!("invalid {field}: expected YYYY-MM-DD, got {s:?}")))
}

// GET /api/availability?date=YYYY-MM-DD
#[derive(Deserialize)]
pub struct AvailabilityQuery {
    pub date: String,
}

pub async fn get_availability(
    State(state): State<Arc<AppState>>,
    Query(query): Query<AvailabilityQuery>,
) -> Result<Json<DayAvailability>, AppError> {
    let date = parse_date("date", &query.date)?;
    let today = Local::now().date_naive();

    let day = {
        let db = state.db.lock().unwrap();
        availability::day_availability(&db, &state.config, date, today)?
    };

    Ok(Json(day))
}

// GET /api/availability/range?start_date=..&end_date=..
#[derive(Deserialize)]
pub struct RangeQuery {
    pub start_date: String,
    pub end_date: String,
}

pub async fn get_availability_range(
    State(state): State<Arc<AppState>>,
    Query(query): Query<RangeQuery>,
) -> Result<Json<Vec<DaySummary>>, AppError> {
    let start = parse_date("start_date", &query.start_date)?;
    let end = parse_date("end_date", &query.end_date)?;

    if end < start {
        return Err(AppError::Validation(
            "end_date must not precede start_date".to_string(),
        ));
    }
    if (end - start).num_days() >= MAX_RANGE_DAYS {
        return Err(AppError::Validation(format!(
            "date range is limited to {MAX_RANGE_DAYS} days"
        )));
    }

    let today = Local::now().date_naive();
    let summaries = {
        let db = state.db.lock().unwrap();
        availability::range_summary(&db, &state.config, start, end, today)?
    };

    Ok(Json(summaries))
}
