use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use chrono::Local;
use serde::{Deserialize, Serialize};

use crate::db::queries;
use crate::errors::AppError;
use crate::handlers::availability::parse_date;
use crate::models::{Booking, CancelActor};
use crate::services::booking::{self, NewBooking};
use crate::state::AppState;

const TS_FMT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Serialize)]
pub struct BookingResponse {
    pub id: String,
    pub ticket_number: String,
    pub date: String,
    pub time_slot: String,
    pub duration_minutes: i32,
    pub status: String,
    pub customer_name: String,
    pub customer_phone: String,
    pub customer_email: Option<String>,
    pub user_id: Option<String>,
    pub service_id: Option<String>,
    pub special_request: Option<String>,
    pub admin_notes: Option<String>,
    pub photo_urls: Vec<String>,
    pub original_booking_id: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    pub confirmed_at: Option<String>,
    pub completed_at: Option<String>,
    pub cancelled_at: Option<String>,
    pub cancellation_reason: Option<String>,
    pub cancelled_by: Option<String>,
}

impl From<Booking> for BookingResponse {
    fn from(b: Booking) -> Self {
        BookingResponse {
            id: b.id,
            ticket_number: b.ticket_number,
            date: b.date.format("%Y-%m-%d").to_string(),
            time_slot: b.time_slot,
            duration_minutes: b.duration_minutes,
            status: b.status.as_str().to_string(),
            customer_name: b.customer_name,
            customer_phone: b.customer_phone,
            customer_email: b.customer_email,
            user_id: b.user_id,
            service_id: b.service_id,
            special_request: b.special_request,
            admin_notes: b.admin_notes,
            photo_urls: b.photo_urls,
            original_booking_id: b.original_booking_id,
            created_at: b.created_at.format(TS_FMT).to_string(),
            updated_at: b.updated_at.format(TS_FMT).to_string(),
            confirmed_at: b.confirmed_at.map(|t| t.format(TS_FMT).to_string()),
            completed_at: b.completed_at.map(|t| t.format(TS_FMT).to_string()),
            cancelled_at: b.cancelled_at.map(|t| t.format(TS_FMT).to_string()),
            cancellation_reason: b.cancellation_reason,
            cancelled_by: b.cancelled_by.map(|a| a.as_str().to_string()),
        }
    }
}

// POST /api/bookings
#[derive(Deserialize)]
pub struct CreateBookingRequest {
    pub date: String,
    pub time: String,
    pub customer_name: String,
    pub customer_phone: String,
    pub customer_email: Option<String>,
    pub user_id: Option<String>,
    pub service_id: Option<String>,
    pub special_request: Option<String>,
    #[serde(default)]
    pub photo_urls: Vec<String>,
}

pub async fn create_booking(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateBookingRequest>,
) -> Result<(StatusCode, Json<BookingResponse>), AppError> {
    let req = NewBooking {
        date: parse_date("date", &body.date)?,
        time_slot: body.time.trim().to_string(),
        customer_name: body.customer_name,
        customer_phone: body.customer_phone,
        customer_email: body.customer_email,
        user_id: body.user_id,
        service_id: body.service_id,
        special_request: body.special_request,
        photo_urls: body.photo_urls,
        admin_notes: None,
    };

    let now = Local::now().naive_local();
    let booking = {
        let mut db = state.db.lock().unwrap();
        booking::create_booking(&mut db, &state.config, req, now)?
    };

    Ok((StatusCode::CREATED, Json(booking.into())))
}

// GET /api/bookings/search?ticket_number=.. | ?phone=..&date=..
#[derive(Deserialize)]
pub struct SearchQuery {
    pub ticket_number: Option<String>,
    pub phone: Option<String>,
    pub date: Option<String>,
}

pub async fn search_bookings(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<BookingResponse>>, AppError> {
    let date = query
        .date
        .as_deref()
        .map(|d| parse_date("date", d))
        .transpose()?;

    let bookings = {
        let db = state.db.lock().unwrap();
        booking::search_bookings(&db, query.ticket_number.as_deref(), query.phone.as_deref(), date)?
    };

    Ok(Json(bookings.into_iter().map(Into::into).collect()))
}

// POST /api/bookings/:ticket/cancel
#[derive(Deserialize)]
pub struct CancelRequest {
    pub reason: String,
}

/// Cancellations through the public endpoint record the customer as actor
/// unless the caller presents the admin token.
pub async fn cancel_booking(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(ticket): Path<String>,
    Json(body): Json<CancelRequest>,
) -> Result<Json<BookingResponse>, AppError> {
    let actor = if is_admin(&headers, &state.config.admin_token) {
        CancelActor::Admin
    } else {
        CancelActor::Customer
    };

    let now = Local::now().naive_local();
    let booking = {
        let db = state.db.lock().unwrap();
        booking::cancel_booking(&db, &ticket, &body.reason, actor, now)?
    };

    Ok(Json(booking.into()))
}

// POST /api/bookings/:ticket/reschedule
#[derive(Deserialize)]
pub struct RescheduleRequest {
    pub new_date: String,
    pub new_time: String,
}

#[derive(Serialize)]
pub struct RescheduleResponse {
    pub new_booking: BookingResponse,
    pub original_booking: BookingResponse,
}

pub async fn reschedule_booking(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(ticket): Path<String>,
    Json(body): Json<RescheduleRequest>,
) -> Result<Json<RescheduleResponse>, AppError> {
    let new_date = parse_date("new_date", &body.new_date)?;
    let actor = if is_admin(&headers, &state.config.admin_token) {
        CancelActor::Admin
    } else {
        CancelActor::Customer
    };

    let now = Local::now().naive_local();
    let (new_booking, original) = {
        let mut db = state.db.lock().unwrap();
        booking::reschedule_booking(
            &mut db,
            &state.config,
            &ticket,
            new_date,
            body.new_time.trim(),
            actor,
            now,
        )?
    };

    Ok(Json(RescheduleResponse {
        new_booking: new_booking.into(),
        original_booking: original.into(),
    }))
}

// GET /api/services — active services only, in display order
#[derive(Serialize)]
pub struct ServiceResponse {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub duration_minutes: i32,
    pub price_cents: i64,
    pub display_order: i32,
}

pub async fn list_services(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<ServiceResponse>>, AppError> {
    let services = {
        let db = state.db.lock().unwrap();
        queries::list_services(&db, true)?
    };

    let response = services
        .into_iter()
        .map(|s| ServiceResponse {
            id: s.id,
            name: s.name,
            description: s.description,
            duration_minutes: s.duration_minutes,
            price_cents: s.price_cents,
            display_order: s.display_order,
        })
        .collect();

    Ok(Json(response))
}

pub(crate) fn is_admin(headers: &HeaderMap, expected_token: &str) -> bool {
    let auth = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    auth.strip_prefix("Bearer ") == Some(expected_token)
}
