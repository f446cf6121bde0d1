use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SeatsClaimedEvent {
    pub trip_id: Uuid,
    pub claim_token: Uuid,
    pub seat_ids: Vec<String>,
    pub held_at: i64,
    pub expires_at: i64,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SeatsReleasedEvent {
    pub trip_id: Uuid,
    pub seat_ids: Vec<String>,
    pub reason: ReleaseReason,
    pub released_at: i64,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReleaseReason {
    Abandoned,
    Expired,
    BookingCancelled,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct BookingConfirmedEvent {
    pub trip_id: Uuid,
    pub booking_id: Uuid,
    pub passenger_id: Uuid,
    pub reference: String,
    pub seat_ids: Vec<String>,
    pub confirmed_at: i64,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CheckInChangedEvent {
    pub trip_id: Uuid,
    pub booking_id: Uuid,
    pub status: String,
    pub seat_ids: Vec<String>,
    pub changed_at: i64,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TripStatusChangedEvent {
    pub trip_id: Uuid,
    pub status: String,
    pub changed_at: i64,
}

/// Envelope fanned out to everyone watching a trip's boarding screen.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TripEvent {
    SeatsClaimed(SeatsClaimedEvent),
    SeatsReleased(SeatsReleasedEvent),
    BookingConfirmed(BookingConfirmedEvent),
    CheckInChanged(CheckInChangedEvent),
    TripStatusChanged(TripStatusChangedEvent),
}

impl TripEvent {
    pub fn trip_id(&self) -> Uuid {
        match self {
            TripEvent::SeatsClaimed(e) => e.trip_id,
            TripEvent::SeatsReleased(e) => e.trip_id,
            TripEvent::BookingConfirmed(e) => e.trip_id,
            TripEvent::CheckInChanged(e) => e.trip_id,
            TripEvent::TripStatusChanged(e) => e.trip_id,
        }
    }

    /// Stable name used as the SSE event type.
    pub fn kind(&self) -> &'static str {
        match self {
            TripEvent::SeatsClaimed(_) => "seats_claimed",
            TripEvent::SeatsReleased(_) => "seats_released",
            TripEvent::BookingConfirmed(_) => "booking_confirmed",
            TripEvent::CheckInChanged(_) => "check_in_changed",
            TripEvent::TripStatusChanged(_) => "trip_status_changed",
        }
    }
}
