use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use rusqlite::{Connection, TransactionBehavior};
use uuid::Uuid;

use crate::config::AppConfig;
use crate::db::queries;
use crate::errors::AppError;
use crate::models::slot::{is_valid_slot, SLOT_DURATION_MINUTES};
use crate::models::{Booking, BookingStatus, CancelActor};
use crate::services::{availability, ticket};

const MAX_PHOTO_URL_LEN: usize = 500;
const MAX_TEXT_LEN: usize = 1000;

#[derive(Debug, Clone)]
pub struct NewBooking {
    pub date: NaiveDate,
    pub time_slot: String,
    pub customer_name: String,
    pub customer_phone: String,
    pub customer_email: Option<String>,
    pub user_id: Option<String>,
    pub service_id: Option<String>,
    pub special_request: Option<String>,
    pub photo_urls: Vec<String>,
    pub admin_notes: Option<String>,
}

/// Admit one booking: precondition checks, then capacity check, ticket
/// allocation and insert inside a single immediate transaction so concurrent
/// requests for the same slot cannot overbook.
pub fn create_booking(
    conn: &mut Connection,
    config: &AppConfig,
    req: NewBooking,
    now: NaiveDateTime,
) -> Result<Booking, AppError> {
    check_admission_window(config, req.date, &req.time_slot, now)?;
    validate_fields(config, &req)?;

    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let booking = admit(&tx, config, &req, None, now)?;
    tx.commit()?;

    tracing::info!(ticket = %booking.ticket_number, date = %booking.date, slot = %booking.time_slot, "booking created");
    Ok(booking)
}

pub fn cancel_booking(
    conn: &Connection,
    ticket_number: &str,
    reason: &str,
    actor: CancelActor,
    now: NaiveDateTime,
) -> Result<Booking, AppError> {
    let reason = reason.trim();
    if reason.is_empty() {
        return Err(AppError::Validation(
            "cancellation reason is required".to_string(),
        ));
    }

    let booking = queries::get_booking_by_ticket(conn, ticket_number)?
        .ok_or_else(|| AppError::BookingNotFound(ticket_number.to_string()))?;

    match booking.status {
        BookingStatus::Cancelled => return Err(AppError::AlreadyCancelled),
        BookingStatus::Completed => return Err(AppError::CannotCancelCompleted),
        _ => {}
    }

    queries::mark_cancelled(conn, &booking.id, reason, actor, now)?;

    tracing::info!(ticket = %booking.ticket_number, actor = actor.as_str(), "booking cancelled");
    Ok(Booking {
        status: BookingStatus::Cancelled,
        cancelled_at: Some(now),
        cancellation_reason: Some(reason.to_string()),
        cancelled_by: Some(actor),
        updated_at: now,
        ..booking
    })
}

pub fn complete_booking(
    conn: &Connection,
    ticket_number: &str,
    now: NaiveDateTime,
) -> Result<Booking, AppError> {
    let booking = queries::get_booking_by_ticket(conn, ticket_number)?
        .ok_or_else(|| AppError::BookingNotFound(ticket_number.to_string()))?;

    match booking.status {
        BookingStatus::Completed => return Err(AppError::AlreadyCompleted),
        BookingStatus::Cancelled => return Err(AppError::CannotCompleteCancelled),
        _ => {}
    }

    queries::mark_completed(conn, &booking.id, now)?;

    Ok(Booking {
        status: BookingStatus::Completed,
        completed_at: Some(now),
        updated_at: now,
        ..booking
    })
}

/// Create a replacement booking in the new slot and cancel the original, as
/// one transaction. A full new slot leaves the original untouched.
pub fn reschedule_booking(
    conn: &mut Connection,
    config: &AppConfig,
    ticket_number: &str,
    new_date: NaiveDate,
    new_time_slot: &str,
    actor: CancelActor,
    now: NaiveDateTime,
) -> Result<(Booking, Booking), AppError> {
    check_admission_window(config, new_date, new_time_slot, now)?;

    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    let original = queries::get_booking_by_ticket(&tx, ticket_number)?
        .ok_or_else(|| AppError::BookingNotFound(ticket_number.to_string()))?;

    match original.status {
        BookingStatus::Cancelled => return Err(AppError::AlreadyCancelled),
        BookingStatus::Completed => return Err(AppError::CannotCancelCompleted),
        _ => {}
    }

    let req = NewBooking {
        date: new_date,
        time_slot: new_time_slot.to_string(),
        customer_name: original.customer_name.clone(),
        customer_phone: original.customer_phone.clone(),
        customer_email: original.customer_email.clone(),
        user_id: original.user_id.clone(),
        service_id: original.service_id.clone(),
        special_request: original.special_request.clone(),
        photo_urls: original.photo_urls.clone(),
        admin_notes: original.admin_notes.clone(),
    };

    let new_booking = admit(&tx, config, &req, Some(original.id.clone()), now)?;

    let reason = format!("rescheduled to {}", new_booking.ticket_number);
    queries::mark_cancelled(&tx, &original.id, &reason, actor, now)?;

    tx.commit()?;

    tracing::info!(
        from = %original.ticket_number,
        to = %new_booking.ticket_number,
        "booking rescheduled"
    );

    let original = Booking {
        status: BookingStatus::Cancelled,
        cancelled_at: Some(now),
        cancellation_reason: Some(reason),
        cancelled_by: Some(actor),
        updated_at: now,
        ..original
    };
    Ok((new_booking, original))
}

/// Lookup by ticket number (case-insensitive) or by phone + date. Exactly one
/// form must be supplied.
pub fn search_bookings(
    conn: &Connection,
    ticket_number: Option<&str>,
    phone: Option<&str>,
    date: Option<NaiveDate>,
) -> Result<Vec<Booking>, AppError> {
    if let Some(ticket) = ticket_number.filter(|t| !t.trim().is_empty()) {
        return Ok(queries::get_booking_by_ticket(conn, ticket.trim())?
            .into_iter()
            .collect());
    }

    match (phone.filter(|p| !p.trim().is_empty()), date) {
        (Some(phone), Some(date)) => Ok(queries::search_by_phone_date(conn, phone.trim(), date)?),
        _ => Err(AppError::InvalidSearchParams),
    }
}

/// Capacity check plus ticket allocation and insert. Must run inside the
/// caller's transaction.
fn admit(
    conn: &Connection,
    config: &AppConfig,
    req: &NewBooking,
    original_booking_id: Option<String>,
    now: NaiveDateTime,
) -> Result<Booking, AppError> {
    let today = now.date();

    let capacity = availability::effective_capacity(conn, config, req.date, &req.time_slot, today)?;
    let booked = queries::count_confirmed_for_slot(conn, req.date, &req.time_slot)?;
    if booked >= capacity {
        return Err(AppError::SlotFull);
    }

    let duration_minutes = match &req.service_id {
        Some(id) => queries::get_service(conn, id)?
            .ok_or_else(|| AppError::Validation(format!("unknown service: {id}")))?
            .duration_minutes,
        None => SLOT_DURATION_MINUTES,
    };

    for _ in 0..ticket::MAX_ALLOC_ATTEMPTS {
        let ticket_number = ticket::next_ticket_number(conn, req.date)?;
        let booking = Booking {
            id: Uuid::new_v4().to_string(),
            ticket_number,
            date: req.date,
            time_slot: req.time_slot.clone(),
            duration_minutes,
            status: BookingStatus::Confirmed,
            customer_name: req.customer_name.clone(),
            customer_phone: req.customer_phone.clone(),
            customer_email: req.customer_email.clone(),
            user_id: req.user_id.clone(),
            service_id: req.service_id.clone(),
            special_request: req.special_request.clone(),
            admin_notes: req.admin_notes.clone(),
            photo_urls: req.photo_urls.clone(),
            original_booking_id: original_booking_id.clone(),
            created_at: now,
            updated_at: now,
            confirmed_at: Some(now),
            completed_at: None,
            cancelled_at: None,
            cancellation_reason: None,
            cancelled_by: None,
        };

        match queries::insert_booking(conn, &booking) {
            Ok(()) => return Ok(booking),
            Err(e) if ticket::is_ticket_conflict(&e) => {
                tracing::warn!(date = %req.date, "ticket number conflict, retrying allocation");
                continue;
            }
            Err(e) => return Err(e.into()),
        }
    }

    Err(AppError::Internal(anyhow::anyhow!(
        "ticket allocation exhausted retries for {}",
        req.date
    )))
}

fn check_admission_window(
    config: &AppConfig,
    date: NaiveDate,
    time_slot: &str,
    now: NaiveDateTime,
) -> Result<(), AppError> {
    if !is_valid_slot(time_slot) {
        return Err(AppError::Validation(format!(
            "invalid time slot: {time_slot}"
        )));
    }

    let today = now.date();
    if date < today {
        return Err(AppError::PastDate);
    }

    if date == today {
        let slot_time = NaiveTime::parse_from_str(time_slot, "%H:%M")
            .map_err(|e| AppError::Validation(format!("invalid time slot {time_slot}: {e}")))?;
        if date.and_time(slot_time) - now < Duration::hours(config.cutoff_hours) {
            return Err(AppError::CutoffViolation);
        }
    }

    if date > today + Duration::days(config.booking_window_days) {
        return Err(AppError::BeyondBookingWindow);
    }

    Ok(())
}

fn validate_fields(config: &AppConfig, req: &NewBooking) -> Result<(), AppError> {
    if req.customer_name.trim().is_empty() {
        return Err(AppError::Validation("customer name is required".to_string()));
    }
    if req.customer_phone.trim().is_empty() {
        return Err(AppError::Validation(
            "customer phone is required".to_string(),
        ));
    }
    if req.photo_urls.len() > config.max_photos {
        return Err(AppError::Validation(format!(
            "at most {} photos are allowed",
            config.max_photos
        )));
    }
    if req.photo_urls.iter().any(|u| u.len() > MAX_PHOTO_URL_LEN) {
        return Err(AppError::Validation("photo URL too long".to_string()));
    }
    if let Some(sr) = &req.special_request {
        if sr.len() > MAX_TEXT_LEN {
            return Err(AppError::Validation("special request too long".to_string()));
        }
    }
    Ok(())
}
