use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use omnibus_core::seatmap::SeatGrid;
use omnibus_core::{Passenger, SeatId};

use crate::error::AppError;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/trips/{trip_id}/claims", post(claim_seats))
        .route("/v1/trips/{trip_id}/seatmap", get(seat_map))
        .route("/v1/trips/{trip_id}/seats", get(occupied_seats))
        .route("/v1/claims/{token}/confirm", post(confirm_claim))
        .route("/v1/claims/{token}", delete(release_claim))
        .route("/v1/bookings/{booking_id}", delete(cancel_booking))
}

#[derive(Debug, Deserialize)]
struct ClaimSeatsRequest {
    passenger_id: Uuid,
    passenger_name: String,
    seat_ids: Vec<String>,
    /// Defaults to business_rules.seat_hold_seconds
    hold_seconds: Option<u64>,
}

#[derive(Debug, Serialize)]
struct ClaimResponse {
    claim_token: Uuid,
    trip_id: Uuid,
    seat_ids: Vec<String>,
    expires_at: i64,
}

async fn claim_seats(
    State(state): State<AppState>,
    Path(trip_id): Path<Uuid>,
    Json(req): Json<ClaimSeatsRequest>,
) -> Result<Json<ClaimResponse>, AppError> {
    let seat_ids = parse_seats(&req.seat_ids)?;
    let hold_seconds = req
        .hold_seconds
        .unwrap_or(state.business_rules.seat_hold_seconds);

    let passenger = Passenger {
        id: req.passenger_id,
        name: req.passenger_name,
    };
    let hold = state
        .ledger
        .claim_seats(trip_id, passenger, &seat_ids, hold_seconds)
        .await?;

    Ok(Json(ClaimResponse {
        claim_token: hold.token,
        trip_id: hold.trip_id,
        seat_ids: hold.seat_ids.iter().map(ToString::to_string).collect(),
        expires_at: hold.expires_at.timestamp(),
    }))
}

#[derive(Debug, Deserialize)]
struct ConfirmClaimRequest {
    booking_id: Uuid,
}

#[derive(Debug, Serialize)]
struct BookingResponse {
    booking_id: Uuid,
    trip_id: Uuid,
    reference: String,
    status: String,
    seat_ids: Vec<String>,
}

async fn confirm_claim(
    State(state): State<AppState>,
    Path(token): Path<Uuid>,
    Json(req): Json<ConfirmClaimRequest>,
) -> Result<Json<BookingResponse>, AppError> {
    let booking = state.ledger.confirm_claim(token, req.booking_id).await?;

    Ok(Json(BookingResponse {
        booking_id: booking.id,
        trip_id: booking.trip_id,
        reference: booking.reference,
        status: booking.status.as_str().to_string(),
        seat_ids: booking.seat_ids.iter().map(ToString::to_string).collect(),
    }))
}

async fn release_claim(State(state): State<AppState>, Path(token): Path<Uuid>) -> StatusCode {
    state.ledger.release_claim(token).await;
    StatusCode::NO_CONTENT
}

async fn cancel_booking(
    State(state): State<AppState>,
    Path(booking_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state.ledger.cancel_booking(booking_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn seat_map(
    State(state): State<AppState>,
    Path(trip_id): Path<Uuid>,
) -> Result<Json<SeatGrid>, AppError> {
    let grid = state.ledger.seat_map(trip_id).await?;
    Ok(Json(grid))
}

#[derive(Debug, Serialize)]
struct OccupiedSeatsResponse {
    trip_id: Uuid,
    seat_ids: Vec<String>,
}

async fn occupied_seats(
    State(state): State<AppState>,
    Path(trip_id): Path<Uuid>,
) -> Result<Json<OccupiedSeatsResponse>, AppError> {
    let seats = state.ledger.occupied_seats(trip_id).await?;
    Ok(Json(OccupiedSeatsResponse {
        trip_id,
        seat_ids: seats.iter().map(ToString::to_string).collect(),
    }))
}

fn parse_seats(raw: &[String]) -> Result<Vec<SeatId>, AppError> {
    raw.iter()
        .map(|s| {
            s.parse::<SeatId>()
                .map_err(|e| AppError::BadRequest(e.to_string()))
        })
        .collect()
}
