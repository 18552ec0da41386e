use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use derive_more::Display;
use serde_json::json;

/// Every failure an operation can surface to the caller. None of these are
/// retried here; each maps to a JSON error body and leaves prior state
/// untouched.
#[derive(Debug, Display)]
pub enum ApiError {
    /// Bad user input, caught before any store mutation.
    #[display(fmt = "{}", _0)]
    Validation(String),

    /// A workflow guard was violated.
    #[display(fmt = "{}", _0)]
    IllegalTransition(String),

    #[display(fmt = "You have already clocked in today")]
    AlreadyClockedIn,

    #[display(fmt = "You have already clocked out today")]
    AlreadyClockedOut,

    #[display(fmt = "You need to clock in first")]
    MustClockInFirst,

    #[display(fmt = "{}", _0)]
    NotFound(String),

    #[display(fmt = "Invalid email or password")]
    InvalidCredentials,

    #[display(fmt = "Email already registered")]
    EmailTaken,

    /// A stored row no state of the workflow maps to. Kept out of client
    /// bodies; logged where raised.
    #[display(fmt = "Internal Server Error")]
    Inconsistent(String),

    /// The record store was unreachable or answered with a failure.
    #[display(fmt = "Internal Server Error")]
    Database(sqlx::Error),
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        tracing::error!(error = %err, "database operation failed");
        ApiError::Database(err)
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_)
            | ApiError::IllegalTransition(_)
            | ApiError::AlreadyClockedIn
            | ApiError::AlreadyClockedOut
            | ApiError::MustClockInFirst => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            ApiError::EmailTaken => StatusCode::CONFLICT,
            ApiError::Inconsistent(_) | ApiError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        if let ApiError::Inconsistent(detail) = self {
            tracing::error!(detail = %detail, "refusing to act on inconsistent stored state");
        }
        HttpResponse::build(self.status_code()).json(json!({ "error": self.to_string() }))
    }
}
