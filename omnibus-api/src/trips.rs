use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use omnibus_core::{BusInfo, Trip};

use crate::error::AppError;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/trips", post(create_trip))
        .route("/v1/trips/{trip_id}", get(get_trip))
        .route("/v1/trips/{trip_id}/boarding", post(begin_boarding))
        .route("/v1/trips/{trip_id}/depart", post(depart_trip))
        .route("/v1/trips/{trip_id}/arrive", post(arrive_trip))
        .route("/v1/trips/{trip_id}/cancel", post(cancel_trip))
}

#[derive(Debug, Deserialize)]
struct CreateTripRequest {
    route_id: Uuid,
    company_id: Uuid,
    bus_plate: String,
    /// Defaults to business_rules.default_bus_capacity
    bus_capacity: Option<i32>,
    departs_at: DateTime<Utc>,
    arrives_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
struct TripResponse {
    trip_id: Uuid,
    status: String,
}

impl TripResponse {
    fn from_trip(trip: &Trip) -> Self {
        Self {
            trip_id: trip.id,
            status: trip.status.as_str().to_string(),
        }
    }
}

async fn create_trip(
    State(state): State<AppState>,
    Json(req): Json<CreateTripRequest>,
) -> Result<Json<TripResponse>, AppError> {
    let capacity = req
        .bus_capacity
        .unwrap_or(state.business_rules.default_bus_capacity);
    if capacity <= 0 {
        return Err(AppError::BadRequest(format!(
            "Invalid bus capacity: {}",
            capacity
        )));
    }

    let trip = Trip::new(
        req.route_id,
        req.company_id,
        BusInfo {
            plate: req.bus_plate,
            capacity,
        },
        req.departs_at,
        req.arrives_at,
    );
    state
        .trips
        .create_trip(&trip)
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?;

    tracing::info!(trip_id = %trip.id, capacity, "Trip created");
    Ok(Json(TripResponse::from_trip(&trip)))
}

async fn get_trip(
    State(state): State<AppState>,
    Path(trip_id): Path<Uuid>,
) -> Result<Json<Trip>, AppError> {
    let trip = state
        .trips
        .get_trip(trip_id)
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?
        .ok_or(AppError::Boarding(
            omnibus_boarding::BoardingError::TripNotFound(trip_id),
        ))?;
    Ok(Json(trip))
}

async fn begin_boarding(
    State(state): State<AppState>,
    Path(trip_id): Path<Uuid>,
) -> Result<Json<TripResponse>, AppError> {
    let trip = state.boarding.begin_boarding(trip_id).await?;
    Ok(Json(TripResponse::from_trip(&trip)))
}

async fn depart_trip(
    State(state): State<AppState>,
    Path(trip_id): Path<Uuid>,
) -> Result<Json<TripResponse>, AppError> {
    let trip = state.boarding.depart_trip(trip_id).await?;
    Ok(Json(TripResponse::from_trip(&trip)))
}

async fn arrive_trip(
    State(state): State<AppState>,
    Path(trip_id): Path<Uuid>,
) -> Result<Json<TripResponse>, AppError> {
    let trip = state.boarding.arrive_trip(trip_id).await?;
    Ok(Json(TripResponse::from_trip(&trip)))
}

async fn cancel_trip(
    State(state): State<AppState>,
    Path(trip_id): Path<Uuid>,
) -> Result<Json<TripResponse>, AppError> {
    let trip = state.boarding.cancel_trip(trip_id).await?;
    Ok(Json(TripResponse::from_trip(&trip)))
}
