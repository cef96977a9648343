use std::env;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub port: u16,
    pub database_url: String,
    pub admin_token: String,
    /// Base per-slot capacity on Monday through Wednesday.
    pub capacity_early_week: i64,
    /// Base per-slot capacity on Thursday through Sunday.
    pub capacity_late_week: i64,
    /// How far ahead bookings are accepted, in days.
    pub booking_window_days: i64,
    /// Minimum lead time for same-day bookings, in hours.
    pub cutoff_hours: i64,
    pub max_photos: usize,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            port: env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3000),
            database_url: env::var("DATABASE_URL").unwrap_or_else(|_| "barberbook.db".to_string()),
            admin_token: env::var("ADMIN_TOKEN").unwrap_or_else(|_| "changeme".to_string()),
            capacity_early_week: env::var("CAPACITY_EARLY_WEEK")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(2),
            capacity_late_week: env::var("CAPACITY_LATE_WEEK")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3),
            booking_window_days: env::var("BOOKING_WINDOW_DAYS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(90),
            cutoff_hours: env::var("CUTOFF_HOURS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(2),
            max_photos: env::var("MAX_PHOTOS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(5),
        }
    }
}
