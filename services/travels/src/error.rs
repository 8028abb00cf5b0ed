//! Error taxonomy for the travels service
//!
//! Every failure a caller can see is a [`TravelsError`] with a
//! machine-readable [`ErrorKind`] and a human message. Some ambiguities are
//! deliberate: a take attempt against a request that is missing, expired,
//! already taken or out of range always reports `RequestTravelNotFound`, and
//! deleting a request owned by someone else is indistinguishable from
//! deleting a request that does not exist.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// Machine-readable classification of a [`TravelsError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Validation,
    Conflict,
    Unauthorized,
    Internal,
}

/// Custom error type for the travels service
#[derive(Error, Debug)]
pub enum TravelsError {
    #[error("Request travel not found")]
    RequestTravelNotFound,

    #[error("Travel not found")]
    TravelNotFound,

    #[error("User not found")]
    UserNotFound,

    #[error("The driver does not exist")]
    DriverNotFound,

    #[error("The vehicle does not exist")]
    VehicleNotFound,

    #[error("The driver is not active")]
    DriverNotActive,

    /// The vehicle exists but belongs to another driver
    #[error("Invalid vehicle")]
    InvalidVehicle,

    #[error("You cannot take your own request travel")]
    DriverCannotTakeOwnRequest,

    /// The claim lost a storage-level race; the caller may retry
    #[error("You cannot take this request travel")]
    DriverCannotTakeRequest,

    #[error("You cannot cancel this travel")]
    CannotCancelThisTravel,

    #[error("You cannot finish this travel")]
    CannotFinishThisTravel,

    #[error("Maximum of two vehicles per driver")]
    TooManyVehicles,

    /// Malformed or out-of-range input, with the offending fields
    #[error("{message}")]
    Validation {
        message: String,
        fields: Vec<&'static str>,
    },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl TravelsError {
    /// Build a validation error naming the offending fields
    pub fn validation(message: impl Into<String>, fields: Vec<&'static str>) -> Self {
        TravelsError::Validation {
            message: message.into(),
            fields,
        }
    }

    /// Classify the error for transport mapping and logging
    pub fn kind(&self) -> ErrorKind {
        match self {
            TravelsError::RequestTravelNotFound
            | TravelsError::TravelNotFound
            | TravelsError::UserNotFound
            | TravelsError::DriverNotFound
            | TravelsError::VehicleNotFound => ErrorKind::NotFound,
            TravelsError::Validation { .. } => ErrorKind::Validation,
            TravelsError::InvalidVehicle
            | TravelsError::DriverCannotTakeOwnRequest
            | TravelsError::DriverCannotTakeRequest
            | TravelsError::CannotCancelThisTravel
            | TravelsError::CannotFinishThisTravel
            | TravelsError::TooManyVehicles => ErrorKind::Conflict,
            TravelsError::DriverNotActive => ErrorKind::Unauthorized,
            TravelsError::Database(_) => ErrorKind::Internal,
        }
    }
}

impl IntoResponse for TravelsError {
    fn into_response(self) -> Response {
        let status = match self.kind() {
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Validation | ErrorKind::Conflict => StatusCode::BAD_REQUEST,
            ErrorKind::Unauthorized => StatusCode::FORBIDDEN,
            ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = match &self {
            TravelsError::Validation { fields, .. } => Json(json!({
                "error": self.to_string(),
                "fields": fields,
            })),
            TravelsError::Database(err) => {
                tracing::error!("Database error: {}", err);
                Json(json!({ "error": "Internal server error" }))
            }
            _ => Json(json!({ "error": self.to_string() })),
        };

        (status, body).into_response()
    }
}

/// Type alias for results in the travels service
pub type TravelsResult<T> = Result<T, TravelsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(
            TravelsError::RequestTravelNotFound.kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            TravelsError::DriverCannotTakeRequest.kind(),
            ErrorKind::Conflict
        );
        assert_eq!(TravelsError::DriverNotActive.kind(), ErrorKind::Unauthorized);
        assert_eq!(
            TravelsError::validation("bad", vec!["radius"]).kind(),
            ErrorKind::Validation
        );
    }
}
