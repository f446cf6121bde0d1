use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::seatmap::SeatId;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    CheckedIn,
    NoShow,
    Cancelled,
}

impl BookingStatus {
    /// Active bookings hold their seats; cancelled ones free them.
    pub fn is_active(&self) -> bool {
        !matches!(self, BookingStatus::Cancelled)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "PENDING",
            BookingStatus::Confirmed => "CONFIRMED",
            BookingStatus::CheckedIn => "CHECKED_IN",
            BookingStatus::NoShow => "NO_SHOW",
            BookingStatus::Cancelled => "CANCELLED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PENDING" => Some(BookingStatus::Pending),
            "CONFIRMED" => Some(BookingStatus::Confirmed),
            "CHECKED_IN" => Some(BookingStatus::CheckedIn),
            "NO_SHOW" => Some(BookingStatus::NoShow),
            "CANCELLED" => Some(BookingStatus::Cancelled),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Unpaid,
    Paid,
    Refunded,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Unpaid => "UNPAID",
            PaymentStatus::Paid => "PAID",
            PaymentStatus::Refunded => "REFUNDED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "UNPAID" => Some(PaymentStatus::Unpaid),
            "PAID" => Some(PaymentStatus::Paid),
            "REFUNDED" => Some(PaymentStatus::Refunded),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Passenger {
    pub id: Uuid,
    pub name: String,
}

/// A passenger's claim on one or more seats of one trip. Never deleted,
/// only marked cancelled (audit trail).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    pub id: Uuid,
    pub trip_id: Uuid,
    pub passenger: Passenger,
    /// Insertion order = display order
    pub seat_ids: Vec<SeatId>,
    pub status: BookingStatus,
    pub payment_status: PaymentStatus,
    /// Human-readable code printed on the ticket, e.g. "OB-9F3A21C4"
    pub reference: String,
    pub created_at: DateTime<Utc>,
}

impl Booking {
    /// A booking comes into existence when payment is confirmed upstream,
    /// so it starts out Confirmed and Paid.
    pub fn new(id: Uuid, trip_id: Uuid, passenger: Passenger, seat_ids: Vec<SeatId>) -> Self {
        Self {
            id,
            trip_id,
            passenger,
            seat_ids,
            status: BookingStatus::Confirmed,
            payment_status: PaymentStatus::Paid,
            reference: booking_reference(&id),
            created_at: Utc::now(),
        }
    }
}

/// Short scannable code derived from the booking id.
pub fn booking_reference(id: &Uuid) -> String {
    let simple = id.simple().to_string().to_uppercase();
    format!("OB-{}", &simple[..8])
}
