use chrono::NaiveDate;
use rusqlite::Connection;

use crate::db::queries;

/// Allocation retries before giving up. Conflicts only occur when two writers
/// race the same date prefix, so a handful of attempts is plenty.
pub const MAX_ALLOC_ATTEMPTS: usize = 5;

pub fn ticket_prefix(date: NaiveDate) -> String {
    format!("TKT-{}-", date.format("%Y%m%d"))
}

/// Sequence is zero-padded to three digits; values past 999 keep their
/// natural width.
pub fn format_ticket(date: NaiveDate, sequence: i64) -> String {
    format!("{}{:03}", ticket_prefix(date), sequence)
}

/// Best-effort next ticket for the date: max existing suffix + 1. The unique
/// index on ticket_number is the authority; an insert conflict means another
/// writer won the number and the caller retries with a fresh lookup.
pub fn next_ticket_number(conn: &Connection, date: NaiveDate) -> anyhow::Result<String> {
    let prefix = ticket_prefix(date);
    let max = queries::max_ticket_sequence(conn, &prefix)?;
    Ok(format_ticket(date, max + 1))
}

pub fn is_ticket_conflict(err: &anyhow::Error) -> bool {
    matches!(
        err.downcast_ref::<rusqlite::Error>(),
        Some(rusqlite::Error::SqliteFailure(e, _))
            if e.code == rusqlite::ErrorCode::ConstraintViolation
    )
}
