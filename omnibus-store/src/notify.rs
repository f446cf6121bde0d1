use async_trait::async_trait;
use tracing::info;

use omnibus_core::repository::{Notifier, StoreError};
use omnibus_shared::TripEvent;

/// Notifier that records outbound passenger notifications in the log.
/// Stands in for the SMS/app delivery service, which is an external
/// collaborator of this subsystem.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, event: &TripEvent) -> Result<(), StoreError> {
        info!(
            trip_id = %event.trip_id(),
            kind = event.kind(),
            "Emitting passenger notification"
        );
        Ok(())
    }
}
