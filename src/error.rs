//! error.rs
//!
//! Application-wide error taxonomy and its HTTP mapping.
//!
//! Every handler and service returns `Result<_, Error>`; the `IntoResponse`
//! impl turns a variant into the status code and `{"error": "..."}` body the
//! frontend expects.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("{0} not found")]
    NotFound(&'static str),

    /// A live lock for the seat is held by a different user.
    #[error("Seat is temporarily locked by another user")]
    SeatLocked,

    /// The seat is already part of the event's durable `bookedSeats`.
    #[error("Seat is already booked")]
    SeatBooked,

    /// At least one requested seat was booked since it was locked. The whole
    /// commit is rejected, nothing is partially applied.
    #[error("Some seats are already booked")]
    AlreadyBooked,

    #[error("{0}")]
    Invalid(String),

    /// A required field is absent on an otherwise valid record, e.g. a legacy
    /// booking without a ticket code reaching the ticket renderer.
    #[error("{0}")]
    MissingData(&'static str),

    #[error("Invalid credentials")]
    Unauthorized,

    #[error("Unauthorized")]
    Forbidden,

    #[error("Username already exists")]
    UsernameTaken,

    /// The store is unavailable or a bounded optimistic-concurrency retry was
    /// exhausted. Safe for the client to retry.
    #[error("{0}")]
    Transient(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl Error {
    pub fn invalid(msg: impl Into<String>) -> Self {
        Error::Invalid(msg.into())
    }

    fn status(&self) -> StatusCode {
        match self {
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::SeatLocked | Error::SeatBooked => StatusCode::LOCKED,
            Error::AlreadyBooked | Error::Invalid(_) => StatusCode::BAD_REQUEST,
            Error::MissingData(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Error::Unauthorized => StatusCode::UNAUTHORIZED,
            Error::Forbidden => StatusCode::FORBIDDEN,
            Error::UsernameTaken => StatusCode::CONFLICT,
            Error::Transient(_) => StatusCode::SERVICE_UNAVAILABLE,
            Error::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<StoreError> for Error {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::VersionConflict => {
                Error::Transient("Record was updated concurrently, please retry".to_string())
            }
            StoreError::Duplicate => Error::UsernameTaken,
            StoreError::Unavailable(msg) => Error::Transient(msg),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status();
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!("internal error: {:?}", self);
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
