use chrono::{NaiveDate, NaiveDateTime, Utc};
use rusqlite::{params, Connection};

use crate::models::{Booking, BookingStatus, CancelActor, CapacityOverride, Service};

const BOOKING_COLUMNS: &str = "id, ticket_number, date, time_slot, duration_minutes, status, \
     customer_name, customer_phone, customer_email, user_id, service_id, special_request, \
     admin_notes, photo_urls, original_booking_id, created_at, updated_at, confirmed_at, \
     completed_at, cancelled_at, cancellation_reason, cancelled_by";

const TS_FMT: &str = "%Y-%m-%d %H:%M:%S";
const DATE_FMT: &str = "%Y-%m-%d";

// ── Bookings ──

pub fn insert_booking(conn: &Connection, booking: &Booking) -> anyhow::Result<()> {
    let photo_urls = if booking.photo_urls.is_empty() {
        None
    } else {
        Some(serde_json::to_string(&booking.photo_urls)?)
    };

    conn.execute(
        &format!(
            "INSERT INTO bookings ({BOOKING_COLUMNS})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20, ?21, ?22)"
        ),
        params![
            booking.id,
            booking.ticket_number,
            booking.date.format(DATE_FMT).to_string(),
            booking.time_slot,
            booking.duration_minutes,
            booking.status.as_str(),
            booking.customer_name,
            booking.customer_phone,
            booking.customer_email,
            booking.user_id,
            booking.service_id,
            booking.special_request,
            booking.admin_notes,
            photo_urls,
            booking.original_booking_id,
            booking.created_at.format(TS_FMT).to_string(),
            booking.updated_at.format(TS_FMT).to_string(),
            booking.confirmed_at.map(|t| t.format(TS_FMT).to_string()),
            booking.completed_at.map(|t| t.format(TS_FMT).to_string()),
            booking.cancelled_at.map(|t| t.format(TS_FMT).to_string()),
            booking.cancellation_reason,
            booking.cancelled_by.map(|a| a.as_str()),
        ],
    )?;
    Ok(())
}

pub fn get_booking_by_ticket(conn: &Connection, ticket: &str) -> anyhow::Result<Option<Booking>> {
    let result = conn.query_row(
        &format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE ticket_number = ?1 COLLATE NOCASE"),
        params![ticket],
        |row| Ok(parse_booking_row(row)),
    );

    match result {
        Ok(booking) => Ok(Some(booking?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn get_booking_by_id(conn: &Connection, id: &str) -> anyhow::Result<Option<Booking>> {
    let result = conn.query_row(
        &format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = ?1"),
        params![id],
        |row| Ok(parse_booking_row(row)),
    );

    match result {
        Ok(booking) => Ok(Some(booking?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Only confirmed bookings hold a spot; cancelled rows free it implicitly.
pub fn count_confirmed_for_slot(
    conn: &Connection,
    date: NaiveDate,
    time_slot: &str,
) -> anyhow::Result<i64> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM bookings WHERE date = ?1 AND time_slot = ?2 AND status = 'confirmed'",
        params![date.format(DATE_FMT).to_string(), time_slot],
        |row| row.get(0),
    )?;
    Ok(count)
}

/// Highest numeric suffix among tickets with the given prefix, 0 when none.
/// LIKE is case-insensitive for the ASCII prefix, matching the ticket index.
pub fn max_ticket_sequence(conn: &Connection, prefix: &str) -> anyhow::Result<i64> {
    let max: i64 = conn.query_row(
        "SELECT COALESCE(MAX(CAST(substr(ticket_number, ?1) AS INTEGER)), 0)
         FROM bookings WHERE ticket_number LIKE ?2",
        params![prefix.len() as i64 + 1, format!("{prefix}%")],
        |row| row.get(0),
    )?;
    Ok(max)
}

pub fn search_by_phone_date(
    conn: &Connection,
    phone: &str,
    date: NaiveDate,
) -> anyhow::Result<Vec<Booking>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {BOOKING_COLUMNS} FROM bookings
         WHERE customer_phone = ?1 AND date = ?2 ORDER BY time_slot ASC, created_at ASC"
    ))?;

    let rows = stmt.query_map(
        params![phone, date.format(DATE_FMT).to_string()],
        |row| Ok(parse_booking_row(row)),
    )?;

    let mut bookings = vec![];
    for row in rows {
        bookings.push(row??);
    }
    Ok(bookings)
}

pub fn list_bookings(
    conn: &Connection,
    status_filter: Option<&str>,
    date_filter: Option<NaiveDate>,
    limit: i64,
) -> anyhow::Result<Vec<Booking>> {
    let mut clauses: Vec<&str> = vec![];
    let mut params_vec: Vec<Box<dyn rusqlite::types::ToSql>> = vec![];

    if let Some(status) = status_filter {
        clauses.push("status = ?");
        params_vec.push(Box::new(status.to_string()));
    }
    if let Some(date) = date_filter {
        clauses.push("date = ?");
        params_vec.push(Box::new(date.format(DATE_FMT).to_string()));
    }
    params_vec.push(Box::new(limit));

    let where_clause = if clauses.is_empty() {
        String::new()
    } else {
        format!("WHERE {} ", clauses.join(" AND "))
    };
    let sql = format!(
        "SELECT {BOOKING_COLUMNS} FROM bookings {where_clause}ORDER BY date DESC, time_slot DESC LIMIT ?"
    );

    let mut stmt = conn.prepare(&sql)?;
    let params_refs: Vec<&dyn rusqlite::types::ToSql> =
        params_vec.iter().map(|p| p.as_ref()).collect();
    let rows = stmt.query_map(params_refs.as_slice(), |row| Ok(parse_booking_row(row)))?;

    let mut bookings = vec![];
    for row in rows {
        bookings.push(row??);
    }
    Ok(bookings)
}

pub fn mark_cancelled(
    conn: &Connection,
    id: &str,
    reason: &str,
    actor: CancelActor,
    now: NaiveDateTime,
) -> anyhow::Result<()> {
    let now_str = now.format(TS_FMT).to_string();
    conn.execute(
        "UPDATE bookings SET status = 'cancelled', cancelled_at = ?1, cancellation_reason = ?2,
         cancelled_by = ?3, updated_at = ?4 WHERE id = ?5",
        params![now_str, reason, actor.as_str(), now_str, id],
    )?;
    Ok(())
}

pub fn mark_completed(conn: &Connection, id: &str, now: NaiveDateTime) -> anyhow::Result<()> {
    let now_str = now.format(TS_FMT).to_string();
    conn.execute(
        "UPDATE bookings SET status = 'completed', completed_at = ?1, updated_at = ?2 WHERE id = ?3",
        params![now_str, now_str, id],
    )?;
    Ok(())
}

fn parse_booking_row(row: &rusqlite::Row) -> anyhow::Result<Booking> {
    let id: String = row.get(0)?;
    let ticket_number: String = row.get(1)?;
    let date_str: String = row.get(2)?;
    let time_slot: String = row.get(3)?;
    let duration_minutes: i32 = row.get(4)?;
    let status_str: String = row.get(5)?;
    let customer_name: String = row.get(6)?;
    let customer_phone: String = row.get(7)?;
    let customer_email: Option<String> = row.get(8)?;
    let user_id: Option<String> = row.get(9)?;
    let service_id: Option<String> = row.get(10)?;
    let special_request: Option<String> = row.get(11)?;
    let admin_notes: Option<String> = row.get(12)?;
    let photo_urls_json: Option<String> = row.get(13)?;
    let original_booking_id: Option<String> = row.get(14)?;
    let created_at_str: String = row.get(15)?;
    let updated_at_str: String = row.get(16)?;
    let confirmed_at_str: Option<String> = row.get(17)?;
    let completed_at_str: Option<String> = row.get(18)?;
    let cancelled_at_str: Option<String> = row.get(19)?;
    let cancellation_reason: Option<String> = row.get(20)?;
    let cancelled_by_str: Option<String> = row.get(21)?;

    let date = NaiveDate::parse_from_str(&date_str, DATE_FMT)
        .map_err(|e| anyhow::anyhow!("invalid booking date {date_str:?}: {e}"))?;

    let photo_urls: Vec<String> = photo_urls_json
        .and_then(|s| serde_json::from_str(&s).ok())
        .unwrap_or_default();

    Ok(Booking {
        id,
        ticket_number,
        date,
        time_slot,
        duration_minutes,
        status: BookingStatus::parse(&status_str),
        customer_name,
        customer_phone,
        customer_email,
        user_id,
        service_id,
        special_request,
        admin_notes,
        photo_urls,
        original_booking_id,
        created_at: parse_ts(&created_at_str),
        updated_at: parse_ts(&updated_at_str),
        confirmed_at: confirmed_at_str.as_deref().map(parse_ts),
        completed_at: completed_at_str.as_deref().map(parse_ts),
        cancelled_at: cancelled_at_str.as_deref().map(parse_ts),
        cancellation_reason,
        cancelled_by: cancelled_by_str.as_deref().map(CancelActor::parse),
    })
}

fn parse_ts(s: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(s, TS_FMT).unwrap_or_else(|_| Utc::now().naive_utc())
}

// ── Capacity Overrides ──

/// First active match wins (lowest id), which is deterministic; writes keep
/// at most one active row per (date, slot) anyway.
pub fn find_active_override(
    conn: &Connection,
    date: NaiveDate,
    time_slot: &str,
) -> anyhow::Result<Option<CapacityOverride>> {
    let result = conn.query_row(
        "SELECT id, date, time_slot, capacity, active, created_at, updated_at
         FROM capacity_overrides
         WHERE date = ?1 AND time_slot = ?2 AND active = 1
         ORDER BY id ASC LIMIT 1",
        params![date.format(DATE_FMT).to_string(), time_slot],
        parse_override_row,
    );

    match result {
        Ok(ov) => Ok(Some(ov)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn list_overrides(
    conn: &Connection,
    from_date: Option<NaiveDate>,
) -> anyhow::Result<Vec<CapacityOverride>> {
    let (sql, params_vec): (String, Vec<Box<dyn rusqlite::types::ToSql>>) = match from_date {
        Some(from) => (
            "SELECT id, date, time_slot, capacity, active, created_at, updated_at
             FROM capacity_overrides WHERE date >= ?1 ORDER BY date ASC, time_slot ASC"
                .to_string(),
            vec![Box::new(from.format(DATE_FMT).to_string()) as Box<dyn rusqlite::types::ToSql>],
        ),
        None => (
            "SELECT id, date, time_slot, capacity, active, created_at, updated_at
             FROM capacity_overrides ORDER BY date ASC, time_slot ASC"
                .to_string(),
            vec![],
        ),
    };

    let mut stmt = conn.prepare(&sql)?;
    let params_refs: Vec<&dyn rusqlite::types::ToSql> =
        params_vec.iter().map(|p| p.as_ref()).collect();
    let rows = stmt.query_map(params_refs.as_slice(), parse_override_row)?;

    let mut overrides = vec![];
    for row in rows {
        overrides.push(row?);
    }
    Ok(overrides)
}

/// Replaces any active override for the same (date, slot) so exactly one row
/// is ever authoritative.
pub fn upsert_override(
    conn: &Connection,
    date: NaiveDate,
    time_slot: &str,
    capacity: i64,
) -> anyhow::Result<i64> {
    let date_str = date.format(DATE_FMT).to_string();
    conn.execute(
        "UPDATE capacity_overrides SET active = 0, updated_at = datetime('now')
         WHERE date = ?1 AND time_slot = ?2 AND active = 1",
        params![date_str, time_slot],
    )?;
    conn.execute(
        "INSERT INTO capacity_overrides (date, time_slot, capacity) VALUES (?1, ?2, ?3)",
        params![date_str, time_slot, capacity],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn disable_override(conn: &Connection, id: i64) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE capacity_overrides SET active = 0, updated_at = datetime('now')
         WHERE id = ?1 AND active = 1",
        params![id],
    )?;
    Ok(count > 0)
}

fn parse_override_row(row: &rusqlite::Row) -> rusqlite::Result<CapacityOverride> {
    let date_str: String = row.get(1)?;
    let created_at_str: String = row.get(5)?;
    let updated_at_str: String = row.get(6)?;

    Ok(CapacityOverride {
        id: row.get(0)?,
        date: NaiveDate::parse_from_str(&date_str, DATE_FMT)
            .unwrap_or_else(|_| Utc::now().date_naive()),
        time_slot: row.get(2)?,
        capacity: row.get(3)?,
        active: row.get::<_, i32>(4)? != 0,
        created_at: parse_ts(&created_at_str),
        updated_at: parse_ts(&updated_at_str),
    })
}

// ── Services ──

pub fn list_services(conn: &Connection, active_only: bool) -> anyhow::Result<Vec<Service>> {
    let sql = if active_only {
        "SELECT id, name, description, duration_minutes, price_cents, active, display_order, created_at, updated_at
         FROM services WHERE active = 1 ORDER BY display_order ASC, name ASC"
    } else {
        "SELECT id, name, description, duration_minutes, price_cents, active, display_order, created_at, updated_at
         FROM services ORDER BY display_order ASC, name ASC"
    };

    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map([], parse_service_row)?;

    let mut services = vec![];
    for row in rows {
        services.push(row?);
    }
    Ok(services)
}

pub fn get_service(conn: &Connection, id: &str) -> anyhow::Result<Option<Service>> {
    let result = conn.query_row(
        "SELECT id, name, description, duration_minutes, price_cents, active, display_order, created_at, updated_at
         FROM services WHERE id = ?1",
        params![id],
        parse_service_row,
    );

    match result {
        Ok(service) => Ok(Some(service)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn save_service(conn: &Connection, service: &Service) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO services (id, name, description, duration_minutes, price_cents, active, display_order, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
         ON CONFLICT(id) DO UPDATE SET
           name = excluded.name,
           description = excluded.description,
           duration_minutes = excluded.duration_minutes,
           price_cents = excluded.price_cents,
           active = excluded.active,
           display_order = excluded.display_order,
           updated_at = datetime('now')",
        params![
            service.id,
            service.name,
            service.description,
            service.duration_minutes,
            service.price_cents,
            service.active as i32,
            service.display_order,
            service.created_at.format(TS_FMT).to_string(),
            service.updated_at.format(TS_FMT).to_string(),
        ],
    )?;
    Ok(())
}

fn parse_service_row(row: &rusqlite::Row) -> rusqlite::Result<Service> {
    let created_at_str: String = row.get(7)?;
    let updated_at_str: String = row.get(8)?;

    Ok(Service {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        duration_minutes: row.get(3)?,
        price_cents: row.get(4)?,
        active: row.get::<_, i32>(5)? != 0,
        display_order: row.get(6)?,
        created_at: parse_ts(&created_at_str),
        updated_at: parse_ts(&updated_at_str),
    })
}

// ── Reports ──

pub struct DailyReportRow {
    pub date: NaiveDate,
    pub total: i64,
    pub pending: i64,
    pub confirmed: i64,
    pub completed: i64,
    pub cancelled: i64,
}

pub fn daily_report(
    conn: &Connection,
    start: NaiveDate,
    end: NaiveDate,
) -> anyhow::Result<Vec<DailyReportRow>> {
    let mut stmt = conn.prepare(
        "SELECT date,
                COUNT(*),
                SUM(CASE WHEN status = 'pending' THEN 1 ELSE 0 END),
                SUM(CASE WHEN status = 'confirmed' THEN 1 ELSE 0 END),
                SUM(CASE WHEN status = 'completed' THEN 1 ELSE 0 END),
                SUM(CASE WHEN status = 'cancelled' THEN 1 ELSE 0 END)
         FROM bookings WHERE date >= ?1 AND date <= ?2
         GROUP BY date ORDER BY date ASC",
    )?;

    let rows = stmt.query_map(
        params![
            start.format(DATE_FMT).to_string(),
            end.format(DATE_FMT).to_string()
        ],
        |row| {
            let date_str: String = row.get(0)?;
            Ok((
                date_str,
                row.get::<_, i64>(1)?,
                row.get::<_, i64>(2)?,
                row.get::<_, i64>(3)?,
                row.get::<_, i64>(4)?,
                row.get::<_, i64>(5)?,
            ))
        },
    )?;

    let mut report = vec![];
    for row in rows {
        let (date_str, total, pending, confirmed, completed, cancelled) = row?;
        let date = NaiveDate::parse_from_str(&date_str, DATE_FMT)
            .map_err(|e| anyhow::anyhow!("invalid booking date {date_str:?}: {e}"))?;
        report.push(DailyReportRow {
            date,
            total,
            pending,
            confirmed,
            completed,
            cancelled,
        });
    }
    Ok(report)
}
