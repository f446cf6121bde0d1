use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};

use omnibus_boarding::BoardingError;
use omnibus_core::TripError;
use omnibus_ledger::LedgerError;

#[derive(Debug)]
pub enum AppError {
    Ledger(LedgerError),
    Boarding(BoardingError),
    BadRequest(String),
    Internal(String),
}

impl From<LedgerError> for AppError {
    fn from(err: LedgerError) -> Self {
        Self::Ledger(err)
    }
}

impl From<BoardingError> for AppError {
    fn from(err: BoardingError) -> Self {
        Self::Boarding(err)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            AppError::Ledger(err) => ledger_response(err),
            AppError::Boarding(err) => boarding_response(err),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, json!({ "error": msg })),
            AppError::Internal(msg) => {
                tracing::error!("Internal Server Error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": "Internal Server Error" }),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}

/// Claim conflicts must tell the passenger exactly which seats collided,
/// so they can pick different ones.
fn ledger_response(err: LedgerError) -> (StatusCode, Value) {
    let message = err.to_string();
    match err {
        LedgerError::SeatsUnavailable { conflicting_seats } => (
            StatusCode::CONFLICT,
            json!({
                "error": message,
                "conflicting_seats": conflicting_seats
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>(),
            }),
        ),
        LedgerError::ClaimExpired(_) => (StatusCode::GONE, json!({ "error": message })),
        LedgerError::ClaimNotFound(_)
        | LedgerError::BookingNotFound(_)
        | LedgerError::TripNotFound(_) => (StatusCode::NOT_FOUND, json!({ "error": message })),
        LedgerError::UnknownSeat { .. }
        | LedgerError::EmptySeatSelection
        | LedgerError::InvalidHoldDuration(_) => {
            (StatusCode::BAD_REQUEST, json!({ "error": message }))
        }
        LedgerError::TripFinalized(_) | LedgerError::ClaimMismatch { .. } => {
            (StatusCode::CONFLICT, json!({ "error": message }))
        }
        LedgerError::SeatMap(_) | LedgerError::Store(_) => {
            tracing::error!("Internal Server Error: {}", message);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "error": "Internal Server Error" }),
            )
        }
    }
}

fn boarding_response(err: BoardingError) -> (StatusCode, Value) {
    let message = err.to_string();
    let status = match err {
        BoardingError::TripNotFound(_)
        | BoardingError::BookingNotFound(_)
        | BoardingError::TicketNotFound(_) => StatusCode::NOT_FOUND,
        BoardingError::TripMismatch { .. } | BoardingError::InvalidCheckInTarget => {
            StatusCode::BAD_REQUEST
        }
        BoardingError::BookingCancelled(_) | BoardingError::TripFinalized { .. } => {
            StatusCode::CONFLICT
        }
        BoardingError::Trip(TripError::InvalidTransition { .. }) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        BoardingError::Store(_) => {
            tracing::error!("Internal Server Error: {}", message);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "error": "Internal Server Error" }),
            );
        }
    };
    (status, json!({ "error": message }))
}
