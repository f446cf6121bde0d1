use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use omnibus_core::repository::{
    BookingRepository, CheckInRepository, Notifier, StoreError, TripRepository,
};
use omnibus_core::{
    BookingStatus, CheckInRecord, CheckInStatus, Trip, TripError, TripStatus,
};
use omnibus_live::Broadcaster;
use omnibus_shared::events::{CheckInChangedEvent, TripStatusChangedEvent};
use omnibus_shared::TripEvent;

#[derive(Debug, thiserror::Error)]
pub enum BoardingError {
    #[error("Trip not found: {0}")]
    TripNotFound(Uuid),

    #[error("Booking not found: {0}")]
    BookingNotFound(Uuid),

    #[error("No ticket matching '{0}' on this trip")]
    TicketNotFound(String),

    #[error("Booking {booking_id} does not belong to trip {trip_id}")]
    TripMismatch { booking_id: Uuid, trip_id: Uuid },

    #[error("Booking {0} is cancelled and cannot be checked in")]
    BookingCancelled(Uuid),

    #[error("Trip {trip_id} is {state} and no longer accepts boarding actions", state = .status.as_str())]
    TripFinalized { trip_id: Uuid, status: TripStatus },

    #[error("A check-in can only be set to CHECKED_IN or NO_SHOW")]
    InvalidCheckInTarget,

    #[error(transparent)]
    Trip(#[from] TripError),

    #[error("Storage failure: {0}")]
    Store(#[source] StoreError),
}

/// Head counts for the driver's reconciliation view.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct BoardingSummary {
    pub trip_id: Uuid,
    pub trip_status: TripStatus,
    pub total_bookings: usize,
    pub checked_in: usize,
    pub no_show: usize,
    pub pending: usize,
}

/// Drives the per-booking check-in state machine and the driver-facing
/// trip lifecycle actions. Transitions are validated, idempotent upserts;
/// every accepted change is broadcast to the trip's live room and handed
/// to the notification layer.
pub struct BoardingService {
    trips: Arc<dyn TripRepository>,
    bookings: Arc<dyn BookingRepository>,
    check_ins: Arc<dyn CheckInRepository>,
    notifier: Arc<dyn Notifier>,
    live: Arc<Broadcaster>,
}

impl BoardingService {
    pub fn new(
        trips: Arc<dyn TripRepository>,
        bookings: Arc<dyn BookingRepository>,
        check_ins: Arc<dyn CheckInRepository>,
        notifier: Arc<dyn Notifier>,
        live: Arc<Broadcaster>,
    ) -> Self {
        Self {
            trips,
            bookings,
            check_ins,
            notifier,
            live,
        }
    }

    /// Mark a passenger checked in or no-show. Upsert keyed by
    /// (trip, booking): re-marking overwrites the record in place, and
    /// re-applying the same status just refreshes notes and timestamp.
    /// The first entry into CheckedIn stamps `check_in_time`; corrective
    /// reversals keep it for the audit trail.
    pub async fn set_check_in_status(
        &self,
        trip_id: Uuid,
        booking_id: Uuid,
        new_status: CheckInStatus,
        notes: Option<String>,
    ) -> Result<CheckInRecord, BoardingError> {
        if new_status == CheckInStatus::Pending {
            return Err(BoardingError::InvalidCheckInTarget);
        }

        let trip = self.load_open_trip(trip_id).await?;

        let booking = self
            .bookings
            .get_booking(booking_id)
            .await
            .map_err(BoardingError::Store)?
            .ok_or(BoardingError::BookingNotFound(booking_id))?;
        if booking.trip_id != trip.id {
            return Err(BoardingError::TripMismatch {
                booking_id,
                trip_id,
            });
        }
        if booking.status == BookingStatus::Cancelled {
            return Err(BoardingError::BookingCancelled(booking_id));
        }

        let mut record = self
            .check_ins
            .get(trip_id, booking_id)
            .await
            .map_err(BoardingError::Store)?
            .unwrap_or_else(|| CheckInRecord::new(trip_id, booking_id));
        record.apply(new_status, notes, Utc::now());
        self.check_ins
            .upsert(&record)
            .await
            .map_err(BoardingError::Store)?;

        // The booking mirrors the latest check-in state
        let booking_status = match new_status {
            CheckInStatus::CheckedIn => BookingStatus::CheckedIn,
            CheckInStatus::NoShow => BookingStatus::NoShow,
            CheckInStatus::Pending => unreachable!("rejected above"),
        };
        self.bookings
            .update_booking_status(booking_id, booking_status)
            .await
            .map_err(BoardingError::Store)?;

        info!(%trip_id, %booking_id, status = new_status.as_str(), "Check-in updated");
        let event = TripEvent::CheckInChanged(CheckInChangedEvent {
            trip_id,
            booking_id,
            status: new_status.as_str().to_string(),
            seat_ids: booking.seat_ids.iter().map(ToString::to_string).collect(),
            changed_at: record.updated_at.timestamp(),
        });
        self.live.publish(event.clone());
        if let Err(e) = self.notifier.notify(&event).await {
            warn!(%booking_id, "Notification emit failed: {}", e);
        }

        Ok(record)
    }

    /// Resolve a scanned ticket code (booking reference) to a booking on
    /// this trip and check the passenger in.
    pub async fn confirm_boarding(
        &self,
        trip_id: Uuid,
        ticket_code: &str,
    ) -> Result<CheckInRecord, BoardingError> {
        let code = ticket_code.trim().to_uppercase();
        let booking = self
            .bookings
            .find_by_reference(trip_id, &code)
            .await
            .map_err(BoardingError::Store)?
            .ok_or_else(|| BoardingError::TicketNotFound(ticket_code.to_string()))?;

        self.set_check_in_status(trip_id, booking.id, CheckInStatus::CheckedIn, None)
            .await
    }

    /// Scheduled → Boarding
    pub async fn begin_boarding(&self, trip_id: Uuid) -> Result<Trip, BoardingError> {
        self.transition(trip_id, Trip::begin_boarding).await
    }

    /// Scheduled/Boarding → Departed
    pub async fn depart_trip(&self, trip_id: Uuid) -> Result<Trip, BoardingError> {
        self.transition(trip_id, Trip::depart).await
    }

    /// Departed → Arrived
    pub async fn arrive_trip(&self, trip_id: Uuid) -> Result<Trip, BoardingError> {
        self.transition(trip_id, Trip::arrive).await
    }

    /// Any non-terminal state → Cancelled
    pub async fn cancel_trip(&self, trip_id: Uuid) -> Result<Trip, BoardingError> {
        self.transition(trip_id, Trip::cancel).await
    }

    async fn transition(
        &self,
        trip_id: Uuid,
        apply: impl Fn(&mut Trip) -> Result<(), TripError>,
    ) -> Result<Trip, BoardingError> {
        let mut trip = self
            .trips
            .get_trip(trip_id)
            .await
            .map_err(BoardingError::Store)?
            .ok_or(BoardingError::TripNotFound(trip_id))?;

        let before = trip.status;
        apply(&mut trip)?;

        // Idempotent no-op: nothing to persist or announce
        if trip.status != before {
            self.trips
                .update_trip_status(trip_id, trip.status)
                .await
                .map_err(BoardingError::Store)?;

            info!(%trip_id, from = before.as_str(), to = trip.status.as_str(), "Trip transition");
            self.live
                .publish(TripEvent::TripStatusChanged(TripStatusChangedEvent {
                    trip_id,
                    status: trip.status.as_str().to_string(),
                    changed_at: Utc::now().timestamp(),
                }));
        }
        Ok(trip)
    }

    /// Head counts over the trip's bookings for the reconciliation screen.
    pub async fn boarding_summary(&self, trip_id: Uuid) -> Result<BoardingSummary, BoardingError> {
        let trip = self
            .trips
            .get_trip(trip_id)
            .await
            .map_err(BoardingError::Store)?
            .ok_or(BoardingError::TripNotFound(trip_id))?;

        let bookings = self
            .bookings
            .list_for_trip(trip_id)
            .await
            .map_err(BoardingError::Store)?;

        let mut summary = BoardingSummary {
            trip_id,
            trip_status: trip.status,
            total_bookings: 0,
            checked_in: 0,
            no_show: 0,
            pending: 0,
        };
        for booking in bookings {
            match booking.status {
                BookingStatus::Cancelled => continue,
                BookingStatus::CheckedIn => summary.checked_in += 1,
                BookingStatus::NoShow => summary.no_show += 1,
                BookingStatus::Pending | BookingStatus::Confirmed => summary.pending += 1,
            }
            summary.total_bookings += 1;
        }
        Ok(summary)
    }

    async fn load_open_trip(&self, trip_id: Uuid) -> Result<Trip, BoardingError> {
        let trip = self
            .trips
            .get_trip(trip_id)
            .await
            .map_err(BoardingError::Store)?
            .ok_or(BoardingError::TripNotFound(trip_id))?;
        // Stale boarding actions after a trip ends are rejected outright
        if trip.status.is_terminal() {
            return Err(BoardingError::TripFinalized {
                trip_id,
                status: trip.status,
            });
        }
        Ok(trip)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use omnibus_core::{Booking, BusInfo, Passenger, SeatId};
    use omnibus_store::{LogNotifier, MemoryStore};

    struct Fixture {
        service: BoardingService,
        store: Arc<MemoryStore>,
        trip_id: Uuid,
        booking: Booking,
    }

    async fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let service = BoardingService::new(
            store.clone(),
            store.clone(),
            store.clone(),
            Arc::new(LogNotifier),
            Arc::new(Broadcaster::new()),
        );

        let departs = Utc::now() + Duration::hours(1);
        let trip = Trip::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            BusInfo {
                plate: "KCA 204J".to_string(),
                capacity: 50,
            },
            departs,
            departs + Duration::hours(3),
        );
        store.create_trip(&trip).await.unwrap();

        let booking = Booking::new(
            Uuid::new_v4(),
            trip.id,
            Passenger {
                id: Uuid::new_v4(),
                name: "Amina Odhiambo".to_string(),
            },
            vec!["1A".parse::<SeatId>().unwrap()],
        );
        store.create_booking(&booking).await.unwrap();

        Fixture {
            service,
            store,
            trip_id: trip.id,
            booking,
        }
    }

    #[tokio::test]
    async fn test_check_in_creates_record_lazily() {
        let f = fixture().await;

        let record = f
            .service
            .set_check_in_status(f.trip_id, f.booking.id, CheckInStatus::CheckedIn, None)
            .await
            .unwrap();

        assert_eq!(record.status, CheckInStatus::CheckedIn);
        assert!(record.check_in_time.is_some());

        let booking = f.store.get_booking(f.booking.id).await.unwrap().unwrap();
        assert_eq!(booking.status, BookingStatus::CheckedIn);
    }

    #[tokio::test]
    async fn test_check_in_twice_keeps_one_record_and_first_timestamp() {
        let f = fixture().await;

        let first = f
            .service
            .set_check_in_status(f.trip_id, f.booking.id, CheckInStatus::CheckedIn, None)
            .await
            .unwrap();
        let second = f
            .service
            .set_check_in_status(
                f.trip_id,
                f.booking.id,
                CheckInStatus::CheckedIn,
                Some("re-scanned".to_string()),
            )
            .await
            .unwrap();

        assert_eq!(second.check_in_time, first.check_in_time);
        assert_eq!(second.notes.as_deref(), Some("re-scanned"));

        let records = CheckInRepository::list_for_trip(f.store.as_ref(), f.trip_id)
            .await
            .unwrap();
        assert_eq!(records.len(), 1);
    }

    #[tokio::test]
    async fn test_mis_tap_correction_overwrites_in_place() {
        let f = fixture().await;

        f.service
            .set_check_in_status(f.trip_id, f.booking.id, CheckInStatus::CheckedIn, None)
            .await
            .unwrap();
        let reversed = f
            .service
            .set_check_in_status(f.trip_id, f.booking.id, CheckInStatus::NoShow, None)
            .await
            .unwrap();

        assert_eq!(reversed.status, CheckInStatus::NoShow);
        // Historical check-in time is preserved for audit
        assert!(reversed.check_in_time.is_some());

        let records = CheckInRepository::list_for_trip(f.store.as_ref(), f.trip_id)
            .await
            .unwrap();
        assert_eq!(records.len(), 1);

        let booking = f.store.get_booking(f.booking.id).await.unwrap().unwrap();
        assert_eq!(booking.status, BookingStatus::NoShow);
    }

    #[tokio::test]
    async fn test_check_in_rejections() {
        let f = fixture().await;

        let err = f
            .service
            .set_check_in_status(f.trip_id, f.booking.id, CheckInStatus::Pending, None)
            .await
            .unwrap_err();
        assert!(matches!(err, BoardingError::InvalidCheckInTarget));

        let err = f
            .service
            .set_check_in_status(f.trip_id, Uuid::new_v4(), CheckInStatus::CheckedIn, None)
            .await
            .unwrap_err();
        assert!(matches!(err, BoardingError::BookingNotFound(_)));

        // A booking from another trip cannot be checked in here
        let other_trip = Trip::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            BusInfo {
                plate: "KBZ 511P".to_string(),
                capacity: 50,
            },
            Utc::now(),
            Utc::now() + Duration::hours(2),
        );
        f.store.create_trip(&other_trip).await.unwrap();
        let err = f
            .service
            .set_check_in_status(other_trip.id, f.booking.id, CheckInStatus::CheckedIn, None)
            .await
            .unwrap_err();
        assert!(matches!(err, BoardingError::TripMismatch { .. }));

        // Cancelled bookings cannot board
        f.store
            .update_booking_status(f.booking.id, BookingStatus::Cancelled)
            .await
            .unwrap();
        let err = f
            .service
            .set_check_in_status(f.trip_id, f.booking.id, CheckInStatus::CheckedIn, None)
            .await
            .unwrap_err();
        assert!(matches!(err, BoardingError::BookingCancelled(_)));
    }

    #[tokio::test]
    async fn test_no_check_in_after_trip_finalized() {
        let f = fixture().await;

        f.service.depart_trip(f.trip_id).await.unwrap();
        f.service.arrive_trip(f.trip_id).await.unwrap();

        let err = f
            .service
            .set_check_in_status(f.trip_id, f.booking.id, CheckInStatus::CheckedIn, None)
            .await
            .unwrap_err();
        assert!(matches!(err, BoardingError::TripFinalized { .. }));
    }

    #[tokio::test]
    async fn test_confirm_boarding_by_ticket_code() {
        let f = fixture().await;

        // Codes are matched case-insensitively and trimmed
        let scanned = format!("  {}  ", f.booking.reference.to_lowercase());
        let record = f
            .service
            .confirm_boarding(f.trip_id, &scanned)
            .await
            .unwrap();
        assert_eq!(record.status, CheckInStatus::CheckedIn);

        let err = f
            .service
            .confirm_boarding(f.trip_id, "OB-DOESNOTX")
            .await
            .unwrap_err();
        assert!(matches!(err, BoardingError::TicketNotFound(_)));
    }

    #[tokio::test]
    async fn test_trip_lifecycle_via_service() {
        let f = fixture().await;

        let trip = f.service.begin_boarding(f.trip_id).await.unwrap();
        assert_eq!(trip.status, TripStatus::Boarding);

        let trip = f.service.depart_trip(f.trip_id).await.unwrap();
        assert_eq!(trip.status, TripStatus::Departed);

        // Depart again: idempotent no-op
        let trip = f.service.depart_trip(f.trip_id).await.unwrap();
        assert_eq!(trip.status, TripStatus::Departed);

        // Arriving a trip that never departed fails typed
        let other_trip = Trip::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            BusInfo {
                plate: "KDE 730F".to_string(),
                capacity: 33,
            },
            Utc::now(),
            Utc::now() + Duration::hours(2),
        );
        f.store.create_trip(&other_trip).await.unwrap();
        let err = f.service.arrive_trip(other_trip.id).await.unwrap_err();
        assert!(matches!(
            err,
            BoardingError::Trip(TripError::InvalidTransition { .. })
        ));
    }

    #[tokio::test]
    async fn test_boarding_summary_counts() {
        let f = fixture().await;

        let second = Booking::new(
            Uuid::new_v4(),
            f.trip_id,
            Passenger {
                id: Uuid::new_v4(),
                name: "Joseph Mwangi".to_string(),
            },
            vec!["2A".parse::<SeatId>().unwrap()],
        );
        f.store.create_booking(&second).await.unwrap();

        f.service
            .set_check_in_status(f.trip_id, f.booking.id, CheckInStatus::CheckedIn, None)
            .await
            .unwrap();

        let summary = f.service.boarding_summary(f.trip_id).await.unwrap();
        assert_eq!(summary.total_bookings, 2);
        assert_eq!(summary.checked_in, 1);
        assert_eq!(summary.pending, 1);
        assert_eq!(summary.no_show, 0);
    }
}
