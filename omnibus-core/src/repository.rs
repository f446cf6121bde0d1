use async_trait::async_trait;
use uuid::Uuid;

use omnibus_shared::TripEvent;

use crate::booking::{Booking, BookingStatus};
use crate::checkin::CheckInRecord;
use crate::trip::{Trip, TripStatus};

pub type StoreError = Box<dyn std::error::Error + Send + Sync>;

/// Repository trait for trip data access
#[async_trait]
pub trait TripRepository: Send + Sync {
    async fn create_trip(&self, trip: &Trip) -> Result<(), StoreError>;

    async fn get_trip(&self, id: Uuid) -> Result<Option<Trip>, StoreError>;

    async fn update_trip_status(&self, id: Uuid, status: TripStatus) -> Result<(), StoreError>;
}

/// Repository trait for durable bookings
#[async_trait]
pub trait BookingRepository: Send + Sync {
    async fn create_booking(&self, booking: &Booking) -> Result<(), StoreError>;

    async fn get_booking(&self, id: Uuid) -> Result<Option<Booking>, StoreError>;

    async fn find_by_reference(
        &self,
        trip_id: Uuid,
        reference: &str,
    ) -> Result<Option<Booking>, StoreError>;

    async fn list_for_trip(&self, trip_id: Uuid) -> Result<Vec<Booking>, StoreError>;

    async fn update_booking_status(
        &self,
        id: Uuid,
        status: BookingStatus,
    ) -> Result<(), StoreError>;
}

/// Repository trait for check-in records, keyed by (trip, booking)
#[async_trait]
pub trait CheckInRepository: Send + Sync {
    async fn upsert(&self, record: &CheckInRecord) -> Result<(), StoreError>;

    async fn get(&self, trip_id: Uuid, booking_id: Uuid)
        -> Result<Option<CheckInRecord>, StoreError>;

    async fn list_for_trip(&self, trip_id: Uuid) -> Result<Vec<CheckInRecord>, StoreError>;
}

/// Outbound notification boundary. Confirmed bookings and check-in
/// transitions are handed to the surrounding notification layer here;
/// delivery (SMS/app push) is that layer's job.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, event: &TripEvent) -> Result<(), StoreError>;
}
