use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use omnibus_boarding::BoardingSummary;
use omnibus_core::{CheckInRecord, CheckInStatus};

use crate::error::AppError;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/trips/{trip_id}/checkins", post(set_check_in))
        .route("/v1/trips/{trip_id}/checkins/scan", post(scan_ticket))
        .route(
            "/v1/trips/{trip_id}/checkins/summary",
            get(boarding_summary),
        )
}

#[derive(Debug, Deserialize)]
struct CheckInRequest {
    booking_id: Uuid,
    status: CheckInStatus,
    notes: Option<String>,
}

#[derive(Debug, Serialize)]
struct CheckInResponse {
    trip_id: Uuid,
    booking_id: Uuid,
    status: String,
    check_in_time: Option<i64>,
    notes: Option<String>,
}

impl CheckInResponse {
    fn from_record(record: CheckInRecord) -> Self {
        Self {
            trip_id: record.trip_id,
            booking_id: record.booking_id,
            status: record.status.as_str().to_string(),
            check_in_time: record.check_in_time.map(|t| t.timestamp()),
            notes: record.notes,
        }
    }
}

async fn set_check_in(
    State(state): State<AppState>,
    Path(trip_id): Path<Uuid>,
    Json(req): Json<CheckInRequest>,
) -> Result<Json<CheckInResponse>, AppError> {
    let record = state
        .boarding
        .set_check_in_status(trip_id, req.booking_id, req.status, req.notes)
        .await?;
    Ok(Json(CheckInResponse::from_record(record)))
}

#[derive(Debug, Deserialize)]
struct ScanTicketRequest {
    ticket: String,
}

async fn scan_ticket(
    State(state): State<AppState>,
    Path(trip_id): Path<Uuid>,
    Json(req): Json<ScanTicketRequest>,
) -> Result<Json<CheckInResponse>, AppError> {
    let record = state.boarding.confirm_boarding(trip_id, &req.ticket).await?;
    Ok(Json(CheckInResponse::from_record(record)))
}

async fn boarding_summary(
    State(state): State<AppState>,
    Path(trip_id): Path<Uuid>,
) -> Result<Json<BoardingSummary>, AppError> {
    let summary = state.boarding.boarding_summary(trip_id).await?;
    Ok(Json(summary))
}
