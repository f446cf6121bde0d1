use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use omnibus_api::{app, AppState};
use omnibus_boarding::BoardingService;
use omnibus_ledger::SeatLedger;
use omnibus_live::Broadcaster;
use omnibus_store::app_config::BusinessRules;
use omnibus_store::{LogNotifier, MemoryStore};

fn test_app() -> axum::Router {
    let store = Arc::new(MemoryStore::new());
    let notifier = Arc::new(LogNotifier);
    let live = Arc::new(Broadcaster::new());

    let ledger = Arc::new(SeatLedger::new(
        store.clone(),
        store.clone(),
        store.clone(),
        notifier.clone(),
        live.clone(),
    ));
    let boarding = Arc::new(BoardingService::new(
        store.clone(),
        store.clone(),
        store.clone(),
        notifier,
        live.clone(),
    ));

    app(AppState {
        ledger,
        boarding,
        live,
        trips: store,
        business_rules: BusinessRules::default(),
    })
}

async fn request(app: &axum::Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    let req = match body {
        Some(json) => builder.body(Body::from(json.to_string())).unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(req).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn create_trip(app: &axum::Router, capacity: i32) -> Uuid {
    let (status, body) = request(
        app,
        "POST",
        "/v1/trips",
        Some(json!({
            "route_id": Uuid::new_v4(),
            "company_id": Uuid::new_v4(),
            "bus_plate": "KDD 482Q",
            "bus_capacity": capacity,
            "departs_at": "2026-09-01T08:00:00Z",
            "arrives_at": "2026-09-01T12:30:00Z",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    body["trip_id"].as_str().unwrap().parse().unwrap()
}

async fn claim(app: &axum::Router, trip_id: Uuid, seats: &[&str]) -> (StatusCode, Value) {
    request(
        app,
        "POST",
        &format!("/v1/trips/{}/claims", trip_id),
        Some(json!({
            "passenger_id": Uuid::new_v4(),
            "passenger_name": "Grace Wanjiru",
            "seat_ids": seats,
        })),
    )
    .await
}

#[tokio::test]
async fn test_claim_confirm_and_seat_map_flow() {
    let app = test_app();
    let trip_id = create_trip(&app, 8).await;

    let (status, body) = claim(&app, trip_id, &["1A", "1B"]).await;
    assert_eq!(status, StatusCode::OK);
    let token = body["claim_token"].as_str().unwrap().to_string();
    assert_eq!(body["seat_ids"], json!(["1A", "1B"]));

    let booking_id = Uuid::new_v4();
    let (status, body) = request(
        &app,
        "POST",
        &format!("/v1/claims/{}/confirm", token),
        Some(json!({ "booking_id": booking_id })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["booking_id"].as_str().unwrap(), booking_id.to_string());
    let reference = body["reference"].as_str().unwrap().to_string();
    assert!(reference.starts_with("OB-"));

    let (status, grid) = request(&app, "GET", &format!("/v1/trips/{}/seatmap", trip_id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(grid["total_seats"], json!(8));
    let first_row = &grid["rows"][0]["seats"];
    assert_eq!(first_row[0]["status"], json!("BOOKED"));
    assert_eq!(first_row[1]["status"], json!("BOOKED"));
    assert_eq!(first_row[2]["status"], json!("AVAILABLE"));

    let (status, occupied) = request(&app, "GET", &format!("/v1/trips/{}/seats", trip_id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(occupied["seat_ids"], json!(["1A", "1B"]));
}

#[tokio::test]
async fn test_conflicting_claim_returns_conflict_set() {
    let app = test_app();
    let trip_id = create_trip(&app, 8).await;

    let (status, _) = claim(&app, trip_id, &["1A", "1B"]).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = claim(&app, trip_id, &["1B", "1C"]).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["conflicting_seats"], json!(["1B"]));
}

#[tokio::test]
async fn test_released_claim_frees_seats() {
    let app = test_app();
    let trip_id = create_trip(&app, 8).await;

    let (_, body) = claim(&app, trip_id, &["2A"]).await;
    let token = body["claim_token"].as_str().unwrap().to_string();

    let (status, _) = request(&app, "DELETE", &format!("/v1/claims/{}", token), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = claim(&app, trip_id, &["2A"]).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_invalid_seat_inputs_rejected() {
    let app = test_app();
    let trip_id = create_trip(&app, 8).await;

    let (status, _) = claim(&app, trip_id, &["13F"]).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // 8-seat bus only has rows 1 and 2
    let (status, _) = claim(&app, trip_id, &["3A"]).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = claim(&app, trip_id, &[]).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_oversized_hold_seconds_is_a_bad_request() {
    let app = test_app();
    let trip_id = create_trip(&app, 8).await;

    let (status, body) = request(
        &app,
        "POST",
        &format!("/v1/trips/{}/claims", trip_id),
        Some(json!({
            "passenger_id": Uuid::new_v4(),
            "passenger_name": "Grace Wanjiru",
            "seat_ids": ["1A"],
            "hold_seconds": 5_000_000_000_000_000_000u64,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("out of range"));

    // The rejected request held nothing
    let (status, _) = claim(&app, trip_id, &["1A"]).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_claim_on_unknown_trip_is_not_found() {
    let app = test_app();
    let (status, _) = claim(&app, Uuid::new_v4(), &["1A"]).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_check_in_scan_and_summary() {
    let app = test_app();
    let trip_id = create_trip(&app, 8).await;

    let (_, body) = claim(&app, trip_id, &["1A"]).await;
    let token = body["claim_token"].as_str().unwrap().to_string();
    let (_, booking) = request(
        &app,
        "POST",
        &format!("/v1/claims/{}/confirm", token),
        Some(json!({ "booking_id": Uuid::new_v4() })),
    )
    .await;
    let reference = booking["reference"].as_str().unwrap().to_string();

    let (status, _) = request(
        &app,
        "POST",
        &format!("/v1/trips/{}/boarding", trip_id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, record) = request(
        &app,
        "POST",
        &format!("/v1/trips/{}/checkins/scan", trip_id),
        Some(json!({ "ticket": reference })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(record["status"], json!("CHECKED_IN"));
    assert!(record["check_in_time"].is_i64());

    let (status, summary) = request(
        &app,
        "GET",
        &format!("/v1/trips/{}/checkins/summary", trip_id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(summary["total_bookings"], json!(1));
    assert_eq!(summary["checked_in"], json!(1));
    assert_eq!(summary["pending"], json!(0));

    // Checked-in passengers show on the seat map
    let (_, grid) = request(&app, "GET", &format!("/v1/trips/{}/seatmap", trip_id), None).await;
    assert_eq!(grid["rows"][0]["seats"][0]["status"], json!("CHECKED_IN"));
}

#[tokio::test]
async fn test_scan_unknown_ticket_is_not_found() {
    let app = test_app();
    let trip_id = create_trip(&app, 8).await;
    let (status, _) = request(
        &app,
        "POST",
        &format!("/v1/trips/{}/boarding", trip_id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = request(
        &app,
        "POST",
        &format!("/v1/trips/{}/checkins/scan", trip_id),
        Some(json!({ "ticket": "OB-00000000" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_trip_lifecycle_endpoints() {
    let app = test_app();
    let trip_id = create_trip(&app, 8).await;

    let (status, body) = request(
        &app,
        "POST",
        &format!("/v1/trips/{}/depart", trip_id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], json!("DEPARTED"));

    // Boarding a departed trip is a state-machine violation
    let (status, _) = request(
        &app,
        "POST",
        &format!("/v1/trips/{}/boarding", trip_id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, body) = request(
        &app,
        "POST",
        &format!("/v1/trips/{}/arrive", trip_id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], json!("ARRIVED"));

    // Claims against a finished trip are refused
    let (status, _) = claim(&app, trip_id, &["1A"]).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_cancel_booking_frees_seat() {
    let app = test_app();
    let trip_id = create_trip(&app, 8).await;

    let (_, body) = claim(&app, trip_id, &["1D"]).await;
    let token = body["claim_token"].as_str().unwrap().to_string();
    let booking_id = Uuid::new_v4();
    request(
        &app,
        "POST",
        &format!("/v1/claims/{}/confirm", token),
        Some(json!({ "booking_id": booking_id })),
    )
    .await;

    let (status, _) = request(
        &app,
        "DELETE",
        &format!("/v1/bookings/{}", booking_id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = claim(&app, trip_id, &["1D"]).await;
    assert_eq!(status, StatusCode::OK);
}
