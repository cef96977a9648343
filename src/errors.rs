use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("appointment date is in the past")]
    PastDate,

    #[error("appointment date is beyond the booking window")]
    BeyondBookingWindow,

    #[error("too close to the appointment time to book this slot")]
    CutoffViolation,

    #[error("no spots left for the requested time slot")]
    SlotFull,

    #[error("booking not found: {0}")]
    BookingNotFound(String),

    #[error("booking is already cancelled")]
    AlreadyCancelled,

    #[error("booking is already completed")]
    AlreadyCompleted,

    #[error("a completed booking cannot be cancelled")]
    CannotCancelCompleted,

    #[error("a cancelled booking cannot be completed")]
    CannotCompleteCancelled,

    #[error("search requires either ticket_number, or phone and date")]
    InvalidSearchParams,

    #[error("not found: {0}")]
    NotFound(String),

    #[error("unauthorized")]
    Unauthorized,

    #[error("internal error")]
    Internal(#[from] anyhow::Error),
}

impl From<rusqlite::Error> for AppError {
    fn from(e: rusqlite::Error) -> Self {
        AppError::Internal(e.into())
    }
}

impl AppError {
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::PastDate => "PAST_DATE",
            AppError::BeyondBookingWindow => "BEYOND_BOOKING_WINDOW",
            AppError::CutoffViolation => "CUTOFF_VIOLATION",
            AppError::SlotFull => "SLOT_FULL",
            AppError::BookingNotFound(_) => "BOOKING_NOT_FOUND",
            AppError::AlreadyCancelled => "ALREADY_CANCELLED",
            AppError::AlreadyCompleted => "ALREADY_COMPLETED",
            AppError::CannotCancelCompleted => "CANNOT_CANCEL_COMPLETED",
            AppError::CannotCompleteCancelled => "CANNOT_COMPLETE_CANCELLED",
            AppError::InvalidSearchParams => "INVALID_SEARCH_PARAMS",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Unauthorized => "UNAUTHORIZED",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_)
            | AppError::PastDate
            | AppError::BeyondBookingWindow
            | AppError::CutoffViolation
            | AppError::InvalidSearchParams => StatusCode::BAD_REQUEST,
            AppError::SlotFull
            | AppError::AlreadyCancelled
            | AppError::AlreadyCompleted
            | AppError::CannotCancelCompleted
            | AppError::CannotCompleteCancelled => StatusCode::CONFLICT,
            AppError::BookingNotFound(_) | AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Storage detail stays in the log, not the response body.
        if let AppError::Internal(err) = &self {
            tracing::error!("internal error: {err:#}");
        }

        let body = serde_json::json!({
            "code": self.code(),
            "error": self.to_string(),
        });
        (self.status(), axum::Json(body)).into_response()
    }
}
