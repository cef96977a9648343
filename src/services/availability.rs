use chrono::{Datelike, Duration, NaiveDate, Weekday};
use rusqlite::Connection;

use crate::config::AppConfig;
use crate::db::queries;
use crate::models::slot::{DayAvailability, DaySummary, SlotAvailability, SlotStatus, SLOT_TIMES};

/// Base per-slot capacity from the day-of-week rule alone.
pub fn base_capacity(config: &AppConfig, date: NaiveDate) -> i64 {
    match date.weekday() {
        Weekday::Mon | Weekday::Tue | Weekday::Wed => config.capacity_early_week,
        _ => config.capacity_late_week,
    }
}

fn within_window(config: &AppConfig, date: NaiveDate, today: NaiveDate) -> bool {
    date >= today && date <= today + Duration::days(config.booking_window_days)
}

/// Final admissible booking count for a (date, slot): day-of-week base,
/// replaced by an active override when one exists (0 blocks the slot), forced
/// to 0 outside [today, today + booking window].
pub fn effective_capacity(
    conn: &Connection,
    config: &AppConfig,
    date: NaiveDate,
    time_slot: &str,
    today: NaiveDate,
) -> anyhow::Result<i64> {
    if !within_window(config, date, today) {
        return Ok(0);
    }

    if let Some(ov) = queries::find_active_override(conn, date, time_slot)? {
        return Ok(ov.capacity.max(0));
    }

    Ok(base_capacity(config, date))
}

pub fn slot_availability(
    conn: &Connection,
    config: &AppConfig,
    date: NaiveDate,
    time_slot: &str,
    today: NaiveDate,
) -> anyhow::Result<SlotAvailability> {
    let total_capacity = effective_capacity(conn, config, date, time_slot, today)?;
    let booked_count = queries::count_confirmed_for_slot(conn, date, time_slot)?;
    let available_spots = (total_capacity - booked_count).max(0);

    let status = if available_spots > 0 {
        SlotStatus::Available
    } else if total_capacity == 0 {
        SlotStatus::Blocked
    } else {
        SlotStatus::Full
    };

    Ok(SlotAvailability {
        time: time_slot.to_string(),
        total_capacity,
        booked_count,
        available_spots,
        is_available: available_spots > 0,
        status,
    })
}

pub fn day_availability(
    conn: &Connection,
    config: &AppConfig,
    date: NaiveDate,
    today: NaiveDate,
) -> anyhow::Result<DayAvailability> {
    let mut slots = Vec::with_capacity(SLOT_TIMES.len());
    for time in SLOT_TIMES {
        slots.push(slot_availability(conn, config, date, time, today)?);
    }

    let total_booked = slots.iter().map(|s| s.booked_count).sum();
    let total_available = slots.iter().map(|s| s.available_spots).sum();
    let is_day_blocked = slots.iter().all(|s| s.total_capacity == 0);

    Ok(DayAvailability {
        date,
        slots,
        total_booked,
        total_available,
        is_day_blocked,
    })
}

pub fn range_summary(
    conn: &Connection,
    config: &AppConfig,
    start: NaiveDate,
    end: NaiveDate,
    today: NaiveDate,
) -> anyhow::Result<Vec<DaySummary>> {
    let mut summaries = vec![];
    for date in start.iter_days().take_while(|d| *d <= end) {
        let day = day_availability(conn, config, date, today)?;
        summaries.push(DaySummary {
            date,
            total_capacity: day.slots.iter().map(|s| s.total_capacity).sum(),
            total_booked: day.total_booked,
            total_available: day.total_available,
            is_day_blocked: day.is_day_blocked,
        });
    }
    Ok(summaries)
}
