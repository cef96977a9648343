use anyhow::Context;
use rusqlite::Connection;

// Schema is embedded so in-memory test databases migrate the same way as the
// on-disk one.
const MIGRATIONS: &[(&str, &str)] = &[(
    "001_init",
    "CREATE TABLE IF NOT EXISTS bookings (
        id TEXT PRIMARY KEY,
        ticket_number TEXT NOT NULL,
        date TEXT NOT NULL,
        time_slot TEXT NOT NULL,
        duration_minutes INTEGER NOT NULL DEFAULT 40,
        status TEXT NOT NULL DEFAULT 'pending',
        customer_name TEXT NOT NULL,
        customer_phone TEXT NOT NULL,
        customer_email TEXT,
        user_id TEXT,
        service_id TEXT,
        special_request TEXT,
        admin_notes TEXT,
        photo_urls TEXT,
        original_booking_id TEXT,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        confirmed_at TEXT,
        completed_at TEXT,
        cancelled_at TEXT,
        cancellation_reason TEXT,
        cancelled_by TEXT
    );

    -- The unique index is the authority for ticket allocation; the sequence
    -- computation is only a hint retried on conflict.
    CREATE UNIQUE INDEX IF NOT EXISTS idx_bookings_ticket
        ON bookings (ticket_number COLLATE NOCASE);
    CREATE INDEX IF NOT EXISTS idx_bookings_slot
        ON bookings (date, time_slot, status);
    CREATE INDEX IF NOT EXISTS idx_bookings_phone
        ON bookings (customer_phone, date);

    CREATE TABLE IF NOT EXISTS capacity_overrides (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        date TEXT NOT NULL,
        time_slot TEXT NOT NULL,
        capacity INTEGER NOT NULL,
        active INTEGER NOT NULL DEFAULT 1,
        created_at TEXT NOT NULL DEFAULT (datetime('now')),
        updated_at TEXT NOT NULL DEFAULT (datetime('now'))
    );

    CREATE INDEX IF NOT EXISTS idx_overrides_date_slot
        ON capacity_overrides (date, time_slot, active);

    CREATE TABLE IF NOT EXISTS services (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        description TEXT,
        duration_minutes INTEGER NOT NULL,
        price_cents INTEGER NOT NULL DEFAULT 0,
        active INTEGER NOT NULL DEFAULT 1,
        display_order INTEGER NOT NULL DEFAULT 0,
        created_at TEXT NOT NULL DEFAULT (datetime('now')),
        updated_at TEXT NOT NULL DEFAULT (datetime('now'))
    );",
)];

pub fn run_migrations(conn: &Connection) -> anyhow::Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS _migrations (
            name TEXT PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );",
    )
    .context("failed to create migrations table")?;

    for (name, sql) in MIGRATIONS {
        let already_applied: bool = conn
            .query_row(
                "SELECT COUNT(*) > 0 FROM _migrations WHERE name = ?1",
                [name],
                |row| row.get(0),
            )
            .context("failed to check migration status")?;

        if already_applied {
            continue;
        }

        conn.execute_batch(sql)
            .with_context(|| format!("failed to apply migration: {name}"))?;

        conn.execute("INSERT INTO _migrations (name) VALUES (?1)", [name])
            .with_context(|| format!("failed to record migration: {name}"))?;

        tracing::info!("applied migration: {name}");
    }

    Ok(())
}
