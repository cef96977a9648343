use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use chrono::Local;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::queries;
use crate::errors::AppError;
use crate::handlers::availability::parse_date;
use crate::handlers::bookings::{is_admin, BookingResponse};
use crate::models::slot::{is_valid_slot, SLOT_TIMES};
use crate::models::{CapacityOverride, Service};
use crate::services::booking::{self, NewBooking};
use crate::state::AppState;

fn check_auth(headers: &HeaderMap, expected_token: &str) -> Result<(), AppError> {
    if !is_admin(headers, expected_token) {
        return Err(AppError::Unauthorized);
    }
    Ok(())
}

// ── Bookings ──

// GET /api/admin/bookings
#[derive(Deserialize)]
pub struct BookingsQuery {
    pub status: Option<String>,
    pub date: Option<String>,
    pub limit: Option<i64>,
}

pub async fn list_bookings(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<BookingsQuery>,
) -> Result<Json<Vec<BookingResponse>>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let date = query
        .date
        .as_deref()
        .map(|d| parse_date("date", d))
        .transpose()?;
    let limit = query.limit.unwrap_or(100).clamp(1, 500);

    let bookings = {
        let db = state.db.lock().unwrap();
        queries::list_bookings(&db, query.status.as_deref(), date, limit)?
    };

    Ok(Json(bookings.into_iter().map(Into::into).collect()))
}

// POST /api/admin/bookings — manual creation, same admission path as public
#[derive(Deserialize)]
pub struct AdminCreateBookingRequest {
    pub date: String,
    pub time: String,
    pub customer_name: String,
    pub customer_phone: String,
    pub customer_email: Option<String>,
    pub service_id: Option<String>,
    pub special_request: Option<String>,
    pub admin_notes: Option<String>,
}

pub async fn create_booking(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<AdminCreateBookingRequest>,
) -> Result<(StatusCode, Json<BookingResponse>), AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let req = NewBooking {
        date: parse_date("date", &body.date)?,
        time_slot: body.time.trim().to_string(),
        customer_name: body.customer_name,
        customer_phone: body.customer_phone,
        customer_email: body.customer_email,
        user_id: None,
        service_id: body.service_id,
        special_request: body.special_request,
        photo_urls: vec![],
        admin_notes: body.admin_notes,
    };

    let now = Local::now().naive_local();
    let booking = {
        let mut db = state.db.lock().unwrap();
        booking::create_booking(&mut db, &state.config, req, now)?
    };

    Ok((StatusCode::CREATED, Json(booking.into())))
}

// POST /api/admin/bookings/:ticket/complete
pub async fn complete_booking(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(ticket): Path<String>,
) -> Result<Json<BookingResponse>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let now = Local::now().naive_local();
    let booking = {
        let db = state.db.lock().unwrap();
        booking::complete_booking(&db, &ticket, now)?
    };

    Ok(Json(booking.into()))
}

// ── Services ──

#[derive(Serialize)]
pub struct AdminServiceResponse {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub duration_minutes: i32,
    pub price_cents: i64,
    pub active: bool,
    pub display_order: i32,
}

impl From<Service> for AdminServiceResponse {
    fn from(s: Service) -> Self {
        AdminServiceResponse {
            id: s.id,
            name: s.name,
            description: s.description,
            duration_minutes: s.duration_minutes,
            price_cents: s.price_cents,
            active: s.active,
            display_order: s.display_order,
        }
    }
}

pub async fn list_services(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<AdminServiceResponse>>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let services = {
        let db = state.db.lock().unwrap();
        queries::list_services(&db, false)?
    };

    Ok(Json(services.into_iter().map(Into::into).collect()))
}

#[derive(Deserialize)]
pub struct CreateServiceRequest {
    pub name: String,
    pub description: Option<String>,
    pub duration_minutes: i32,
    pub price_cents: i64,
    pub display_order: Option<i32>,
}

pub async fn create_service(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<CreateServiceRequest>,
) -> Result<(StatusCode, Json<AdminServiceResponse>), AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    if body.name.trim().is_empty() {
        return Err(AppError::Validation("service name is required".to_string()));
    }
    if body.duration_minutes <= 0 {
        return Err(AppError::Validation(
            "service duration must be positive".to_string(),
        ));
    }

    let now = Local::now().naive_local();
    let service = Service {
        id: Uuid::new_v4().to_string(),
        name: body.name.trim().to_string(),
        description: body.description,
        duration_minutes: body.duration_minutes,
        price_cents: body.price_cents,
        active: true,
        display_order: body.display_order.unwrap_or(0),
        created_at: now,
        updated_at: now,
    };

    {
        let db = state.db.lock().unwrap();
        queries::save_service(&db, &service)?;
    }

    Ok((StatusCode::CREATED, Json(service.into())))
}

#[derive(Deserialize)]
pub struct UpdateServiceRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub duration_minutes: Option<i32>,
    pub price_cents: Option<i64>,
    pub active: Option<bool>,
    pub display_order: Option<i32>,
}

pub async fn update_service(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<UpdateServiceRequest>,
) -> Result<Json<AdminServiceResponse>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let db = state.db.lock().unwrap();

    let mut service = queries::get_service(&db, &id)?
        .ok_or_else(|| AppError::NotFound(format!("service {id}")))?;

    if let Some(name) = body.name {
        service.name = name;
    }
    if let Some(description) = body.description {
        service.description = Some(description);
    }
    if let Some(duration) = body.duration_minutes {
        if duration <= 0 {
            return Err(AppError::Validation(
                "service duration must be positive".to_string(),
            ));
        }
        service.duration_minutes = duration;
    }
    if let Some(price) = body.price_cents {
        service.price_cents = price;
    }
    if let Some(active) = body.active {
        service.active = active;
    }
    if let Some(order) = body.display_order {
        service.display_order = order;
    }

    queries::save_service(&db, &service)?;

    Ok(Json(service.into()))
}

// ── Capacity Overrides ──

#[derive(Serialize)]
pub struct OverrideResponse {
    pub id: i64,
    pub date: String,
    pub time_slot: String,
    pub capacity: i64,
    pub active: bool,
}

impl From<CapacityOverride> for OverrideResponse {
    fn from(ov: CapacityOverride) -> Self {
        OverrideResponse {
            id: ov.id,
            date: ov.date.format("%Y-%m-%d").to_string(),
            time_slot: ov.time_slot,
            capacity: ov.capacity,
            active: ov.active,
        }
    }
}

#[derive(Deserialize)]
pub struct OverridesQuery {
    pub from_date: Option<String>,
}

pub async fn list_overrides(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<OverridesQuery>,
) -> Result<Json<Vec<OverrideResponse>>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let from_date = query
        .from_date
        .as_deref()
        .map(|d| parse_date("from_date", d))
        .transpose()?;

    let overrides = {
        let db = state.db.lock().unwrap();
        queries::list_overrides(&db, from_date)?
    };

    Ok(Json(overrides.into_iter().map(Into::into).collect()))
}

#[derive(Deserialize)]
pub struct CreateOverrideRequest {
    pub date: String,
    pub time_slot: String,
    pub capacity: i64,
}

pub async fn create_override(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<CreateOverrideRequest>,
) -> Result<(StatusCode, Json<serde_json::Value>), AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let date = parse_date("date", &body.date)?;
    if !is_valid_slot(&body.time_slot) {
        return Err(AppError::Validation(format!(
            "invalid time slot: {}",
            body.time_slot
        )));
    }
    if body.capacity < 0 {
        return Err(AppError::Validation(
            "capacity must not be negative".to_string(),
        ));
    }

    let id = {
        let db = state.db.lock().unwrap();
        queries::upsert_override(&db, date, &body.time_slot, body.capacity)?
    };

    tracing::info!(%date, slot = %body.time_slot, capacity = body.capacity, "capacity override set");
    Ok((StatusCode::CREATED, Json(serde_json::json!({ "id": id }))))
}

// POST /api/admin/overrides/block-day — one capacity-0 override per slot
#[derive(Deserialize)]
pub struct BlockDayRequest {
    pub date: String,
}

pub async fn block_day(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<BlockDayRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let date = parse_date("date", &body.date)?;

    {
        let db = state.db.lock().unwrap();
        for slot in SLOT_TIMES {
            queries::upsert_override(&db, date, slot, 0)?;
        }
    }

    tracing::info!(%date, "day blocked");
    Ok(Json(serde_json::json!({ "ok": true })))
}

pub async fn disable_override(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<Json<serde_json::Value>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let disabled = {
        let db = state.db.lock().unwrap();
        queries::disable_override(&db, id)?
    };

    if disabled {
        Ok(Json(serde_json::json!({ "ok": true })))
    } else {
        Err(AppError::NotFound(format!("active override {id}")))
    }
}

// ── Reports ──

#[derive(Deserialize)]
pub struct ReportQuery {
    pub start_date: String,
    pub end_date: String,
}

#[derive(Serialize)]
pub struct DailyReport {
    pub date: String,
    pub total: i64,
    pub pending: i64,
    pub confirmed: i64,
    pub completed: i64,
    pub cancelled: i64,
}

#[derive(Serialize)]
pub struct ReportResponse {
    pub days: Vec<DailyReport>,
    pub total_bookings: i64,
    pub total_completed: i64,
    pub total_cancelled: i64,
}

pub async fn get_report(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<ReportQuery>,
) -> Result<Json<ReportResponse>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let start = parse_date("start_date", &query.start_date)?;
    let end = parse_date("end_date", &query.end_date)?;
    if end < start {
        return Err(AppError::Validation(
            "end_date must not precede start_date".to_string(),
        ));
    }

    let rows = {
        let db = state.db.lock().unwrap();
        queries::daily_report(&db, start, end)?
    };

    let total_bookings = rows.iter().map(|r| r.total).sum();
    let total_completed = rows.iter().map(|r| r.completed).sum();
    let total_cancelled = rows.iter().map(|r| r.cancelled).sum();

    let days = rows
        .into_iter()
        .map(|r| DailyReport {
            date: r.date.format("%Y-%m-%d").to_string(),
            total: r.total,
            pending: r.pending,
            confirmed: r.confirmed,
            completed: r.completed,
            cancelled: r.cancelled,
        })
        .collect();

    Ok(Json(ReportResponse {
        days,
        total_bookings,
        total_completed,
        total_cancelled,
    }))
}
