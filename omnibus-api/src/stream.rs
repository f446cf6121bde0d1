use std::convert::Infallible;

use axum::{
    extract::{Path, State},
    response::sse::{Event, KeepAlive, Sse},
    routing::get,
    Router,
};
use futures_util::{Stream, StreamExt};
use tokio_stream::wrappers::BroadcastStream;
use uuid::Uuid;

use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/v1/trips/{trip_id}/stream", get(trip_stream))
}

/// Live per-trip event feed for seat-map screens and the driver app.
/// Slow consumers that fall behind the ring buffer just miss events;
/// clients are expected to re-fetch the seat map on reconnect.
async fn trip_stream(
    State(state): State<AppState>,
    Path(trip_id): Path<Uuid>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.live.subscribe(trip_id);
    tracing::debug!(%trip_id, "SSE subscriber attached");

    let stream = BroadcastStream::new(rx).filter_map(|msg| async move {
        match msg {
            Ok(event) => {
                let payload = match serde_json::to_string(&event) {
                    Ok(json) => json,
                    Err(e) => {
                        tracing::warn!("Failed to serialize trip event: {}", e);
                        return None;
                    }
                };
                Some(Ok(Event::default().event(event.kind()).data(payload)))
            }
            // Lagged receivers skip ahead rather than erroring the stream
            Err(_) => None,
        }
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}
