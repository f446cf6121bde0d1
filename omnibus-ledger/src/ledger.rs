use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use chrono::{Duration, Utc};
use tokio::sync::Mutex;
use tracing::{info, warn};
use uuid::Uuid;

use omnibus_core::repository::{
    BookingRepository, CheckInRepository, Notifier, StoreError, TripRepository,
};
use omnibus_core::seatmap::{build_seat_grid, SeatGrid};
use omnibus_core::{Booking, Passenger, SeatId, SeatMapError};
use omnibus_live::Broadcaster;
use omnibus_shared::events::{
    BookingConfirmedEvent, ReleaseReason, SeatsClaimedEvent, SeatsReleasedEvent,
};
use omnibus_shared::TripEvent;

use crate::holds::{HoldStore, SeatHold};

/// Upper bound on a caller-supplied hold TTL. A hold is a short payment
/// window; anything beyond a day is a caller bug, and unchecked values
/// would overflow the expiry arithmetic.
pub const MAX_HOLD_SECONDS: u64 = 24 * 60 * 60;

#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("Seats are no longer available: {}", .conflicting_seats.iter().map(ToString::to_string).collect::<Vec<_>>().join(", "))]
    SeatsUnavailable { conflicting_seats: Vec<SeatId> },

    #[error("Claim not found: {0}")]
    ClaimNotFound(Uuid),

    #[error("Claim expired: {0}")]
    ClaimExpired(Uuid),

    #[error("Hold duration {0}s is out of range (maximum {max}s)", max = MAX_HOLD_SECONDS)]
    InvalidHoldDuration(u64),

    #[error("Booking {booking_id} was not created from claim {token}")]
    ClaimMismatch { token: Uuid, booking_id: Uuid },

    #[error("Booking not found: {0}")]
    BookingNotFound(Uuid),

    #[error("Trip not found: {0}")]
    TripNotFound(Uuid),

    #[error("Trip {0} has already finished")]
    TripFinalized(Uuid),

    #[error("Seat {seat} does not exist on a bus of capacity {capacity}")]
    UnknownSeat { seat: SeatId, capacity: i32 },

    #[error("At least one seat must be selected")]
    EmptySeatSelection,

    #[error(transparent)]
    SeatMap(#[from] SeatMapError),

    #[error("Storage failure: {0}")]
    Store(#[source] StoreError),
}

/// The authoritative answer to "is seat X on trip T free right now", and
/// the only component allowed to move a seat from free to claimed.
///
/// Claims, confirmations and cancellations for one trip run inside that
/// trip's critical section, so two concurrent claims for overlapping seat
/// sets cannot both succeed: the loser gets a deterministic
/// `SeatsUnavailable` naming the exact conflicting seats. Holds are
/// in-memory with a TTL; confirmed bookings go to the durable store.
pub struct SeatLedger {
    trips: Arc<dyn TripRepository>,
    bookings: Arc<dyn BookingRepository>,
    check_ins: Arc<dyn CheckInRepository>,
    notifier: Arc<dyn Notifier>,
    live: Arc<Broadcaster>,
    holds: Mutex<HoldStore>,
    trip_locks: Mutex<HashMap<Uuid, Arc<Mutex<()>>>>,
}

impl SeatLedger {
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
            holds: Mutex::new(HoldStore::new()),
            trip_locks: Mutex::new(HashMap::new()),
        }
    }

    /// The per-trip critical section. All seat mutations for a trip are
    /// serialized through this lock.
    async fn trip_lock(&self, trip_id: Uuid) -> Arc<Mutex<()>> {
        let mut locks = self.trip_locks.lock().await;
        locks
            .entry(trip_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Claim a set of seats atomically: either every requested seat is free
    /// and becomes held under one token, or nothing is claimed.
    pub async fn claim_seats(
        &self,
        trip_id: Uuid,
        passenger: Passenger,
        seat_ids: &[SeatId],
        hold_seconds: u64,
    ) -> Result<SeatHold, LedgerError> {
        if seat_ids.is_empty() {
            return Err(LedgerError::EmptySeatSelection);
        }
        if hold_seconds > MAX_HOLD_SECONDS {
            return Err(LedgerError::InvalidHoldDuration(hold_seconds));
        }

        let trip = self
            .trips
            .get_trip(trip_id)
            .await
            .map_err(LedgerError::Store)?
            .ok_or(LedgerError::TripNotFound(trip_id))?;
        if trip.status.is_terminal() {
            return Err(LedgerError::TripFinalized(trip_id));
        }

        // Keep insertion order but drop duplicates within the request
        let mut requested: Vec<SeatId> = Vec::with_capacity(seat_ids.len());
        for seat in seat_ids {
            if !seat.is_within(trip.bus.capacity) {
                return Err(LedgerError::UnknownSeat {
                    seat: *seat,
                    capacity: trip.bus.capacity,
                });
            }
            if !requested.contains(seat) {
                requested.push(*seat);
            }
        }

        let lock = self.trip_lock(trip_id).await;
        let _guard = lock.lock().await;
        let now = Utc::now();

        let (lapsed, mut occupied) = {
            let mut holds = self.holds.lock().await;
            let lapsed = holds.remove_expired_for_trip(trip_id, now);
            let held = holds.active_seats(trip_id, now);
            (lapsed, held)
        };
        for hold in &lapsed {
            self.publish_released(hold.trip_id, &hold.seat_ids, ReleaseReason::Expired);
        }

        for booking in self
            .bookings
            .list_for_trip(trip_id)
            .await
            .map_err(LedgerError::Store)?
        {
            if booking.status.is_active() {
                occupied.extend(booking.seat_ids.iter().copied());
            }
        }

        let conflicting: BTreeSet<SeatId> = requested
            .iter()
            .filter(|s| occupied.contains(s))
            .copied()
            .collect();
        if !conflicting.is_empty() {
            return Err(LedgerError::SeatsUnavailable {
                conflicting_seats: conflicting.into_iter().collect(),
            });
        }

        let hold = SeatHold {
            token: Uuid::new_v4(),
            trip_id,
            passenger,
            seat_ids: requested,
            held_at: now,
            expires_at: now + Duration::seconds(hold_seconds as i64),
        };
        self.holds.lock().await.insert(hold.clone());

        info!(%trip_id, token = %hold.token, seats = hold.seat_ids.len(), "Seats held");
        self.live.publish(TripEvent::SeatsClaimed(SeatsClaimedEvent {
            trip_id,
            claim_token: hold.token,
            seat_ids: seat_strings(&hold.seat_ids),
            held_at: hold.held_at.timestamp(),
            expires_at: hold.expires_at.timestamp(),
        }));

        Ok(hold)
    }

    /// Convert a hold into a durable, confirmed booking. Idempotent:
    /// retrying with the same token and booking id returns the booking
    /// created the first time (payment webhooks retry).
    pub async fn confirm_claim(
        &self,
        token: Uuid,
        booking_id: Uuid,
    ) -> Result<Booking, LedgerError> {
        if let Some(existing) = self
            .bookings
            .get_booking(booking_id)
            .await
            .map_err(LedgerError::Store)?
        {
            return self.resolve_confirm_retry(token, existing).await;
        }

        let trip_id = {
            let holds = self.holds.lock().await;
            holds.get(&token).map(|h| h.trip_id)
        };
        let trip_id = match trip_id {
            Some(id) => id,
            None => return Err(LedgerError::ClaimNotFound(token)),
        };

        let lock = self.trip_lock(trip_id).await;
        let _guard = lock.lock().await;
        let now = Utc::now();

        // Re-check under the lock; a concurrent retry may have won
        if let Some(existing) = self
            .bookings
            .get_booking(booking_id)
            .await
            .map_err(LedgerError::Store)?
        {
            return self.resolve_confirm_retry(token, existing).await;
        }

        let hold = {
            let holds = self.holds.lock().await;
            holds.get(&token).cloned()
        }
        .ok_or(LedgerError::ClaimNotFound(token))?;

        if hold.is_expired(now) {
            self.holds.lock().await.remove(&token);
            self.publish_released(hold.trip_id, &hold.seat_ids, ReleaseReason::Expired);
            return Err(LedgerError::ClaimExpired(token));
        }

        let booking = Booking::new(
            booking_id,
            hold.trip_id,
            hold.passenger.clone(),
            hold.seat_ids.clone(),
        );
        self.bookings
            .create_booking(&booking)
            .await
            .map_err(LedgerError::Store)?;
        self.holds.lock().await.remove(&token);

        info!(%trip_id, %booking_id, reference = %booking.reference, "Booking confirmed");
        let event = TripEvent::BookingConfirmed(BookingConfirmedEvent {
            trip_id,
            booking_id,
            passenger_id: booking.passenger.id,
            reference: booking.reference.clone(),
            seat_ids: seat_strings(&booking.seat_ids),
            confirmed_at: now.timestamp(),
        });
        self.live.publish(event.clone());
        if let Err(e) = self.notifier.notify(&event).await {
            warn!(%booking_id, "Notification emit failed: {}", e);
        }

        Ok(booking)
    }

    /// A booking with this id already exists, so the confirm is a retry.
    /// It only counts as the idempotent success if the booking came from
    /// the claim being confirmed; a live token pointing at a different
    /// hold is a caller mix-up, and silently "succeeding" would strand
    /// that hold until it expires.
    async fn resolve_confirm_retry(
        &self,
        token: Uuid,
        existing: Booking,
    ) -> Result<Booking, LedgerError> {
        let hold = {
            let holds = self.holds.lock().await;
            holds.get(&token).cloned()
        };
        match hold {
            None => Ok(existing),
            Some(h) if h.trip_id == existing.trip_id && h.seat_ids == existing.seat_ids => {
                // First confirm created the booking but never dropped the
                // hold; finish that now.
                self.holds.lock().await.remove(&token);
                Ok(existing)
            }
            Some(_) => Err(LedgerError::ClaimMismatch {
                token,
                booking_id: existing.id,
            }),
        }
    }

    /// Drop a hold (user abandoned checkout). Unknown or already-expired
    /// tokens are a no-op: the post-state is the same either way.
    pub async fn release_claim(&self, token: Uuid) {
        let removed = self.holds.lock().await.remove(&token);
        match removed {
            Some(hold) => {
                info!(trip_id = %hold.trip_id, %token, "Claim released");
                self.publish_released(hold.trip_id, &hold.seat_ids, ReleaseReason::Abandoned);
            }
            None => info!(%token, "Release for unknown claim ignored"),
        }
    }

    /// Mark a booking cancelled and free its seats for new claims. The
    /// booking row stays behind as the audit trail.
    pub async fn cancel_booking(&self, booking_id: Uuid) -> Result<(), LedgerError> {
        let booking = self
            .bookings
            .get_booking(booking_id)
            .await
            .map_err(LedgerError::Store)?
            .ok_or(LedgerError::BookingNotFound(booking_id))?;

        if booking.status == omnibus_core::BookingStatus::Cancelled {
            return Ok(());
        }

        let lock = self.trip_lock(booking.trip_id).await;
        let _guard = lock.lock().await;

        self.bookings
            .update_booking_status(booking_id, omnibus_core::BookingStatus::Cancelled)
            .await
            .map_err(LedgerError::Store)?;

        info!(trip_id = %booking.trip_id, %booking_id, "Booking cancelled, seats freed");
        self.publish_released(
            booking.trip_id,
            &booking.seat_ids,
            ReleaseReason::BookingCancelled,
        );
        Ok(())
    }

    /// Seats taken right now: active holds plus non-cancelled bookings.
    pub async fn occupied_seats(&self, trip_id: Uuid) -> Result<BTreeSet<SeatId>, LedgerError> {
        let now = Utc::now();
        let mut occupied = self.holds.lock().await.active_seats(trip_id, now);
        for booking in self
            .bookings
            .list_for_trip(trip_id)
            .await
            .map_err(LedgerError::Store)?
        {
            if booking.status.is_active() {
                occupied.extend(booking.seat_ids.iter().copied());
            }
        }
        Ok(occupied)
    }

    /// Current occupancy grid for the driver UI, recomputed from bookings
    /// and check-in records.
    pub async fn seat_map(&self, trip_id: Uuid) -> Result<SeatGrid, LedgerError> {
        let trip = self
            .trips
            .get_trip(trip_id)
            .await
            .map_err(LedgerError::Store)?
            .ok_or(LedgerError::TripNotFound(trip_id))?;

        let bookings = self
            .bookings
            .list_for_trip(trip_id)
            .await
            .map_err(LedgerError::Store)?;
        let check_ins: HashMap<Uuid, _> = self
            .check_ins
            .list_for_trip(trip_id)
            .await
            .map_err(LedgerError::Store)?
            .into_iter()
            .map(|r| (r.booking_id, r))
            .collect();

        let grid = build_seat_grid(trip.bus.capacity, &bookings, &check_ins)?;
        for inconsistency in &grid.inconsistencies {
            warn!(%trip_id, "Seat map inconsistency: {}", inconsistency);
        }
        Ok(grid)
    }

    /// Release every expired hold across all trips. Run periodically by
    /// the background sweeper; expiry never depends on the original caller
    /// coming back.
    pub async fn sweep_expired(&self) -> usize {
        let now = Utc::now();
        let expired = self.holds.lock().await.remove_expired(now);
        for hold in &expired {
            info!(trip_id = %hold.trip_id, token = %hold.token, "Hold expired");
            self.publish_released(hold.trip_id, &hold.seat_ids, ReleaseReason::Expired);
        }

        // Trip lock entries are only needed while an operation holds a
        // clone; evict the rest so finished trips do not accumulate.
        self.trip_locks
            .lock()
            .await
            .retain(|_, lock| Arc::strong_count(lock) > 1);

        expired.len()
    }

    fn publish_released(&self, trip_id: Uuid, seats: &[SeatId], reason: ReleaseReason) {
        self.live.publish(TripEvent::SeatsReleased(SeatsReleasedEvent {
            trip_id,
            seat_ids: seat_strings(seats),
            reason,
            released_at: Utc::now().timestamp(),
        }));
    }
}

fn seat_strings(seats: &[SeatId]) -> Vec<String> {
    seats.iter().map(ToString::to_string).collect()
}
