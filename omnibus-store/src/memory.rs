use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use omnibus_core::repository::{
    BookingRepository, CheckInRepository, StoreError, TripRepository,
};
use omnibus_core::{Booking, BookingStatus, CheckInRecord, Trip, TripStatus};

/// In-memory backing store used by tests and local development. The
/// production deployment swaps in the Postgres repositories; holds never
/// live here — only durable records do.
#[derive(Default)]
pub struct MemoryStore {
    trips: RwLock<HashMap<Uuid, Trip>>,
    bookings: RwLock<HashMap<Uuid, Booking>>,
    check_ins: RwLock<HashMap<(Uuid, Uuid), CheckInRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TripRepository for MemoryStore {
    async fn create_trip(&self, trip: &Trip) -> Result<(), StoreError> {
        self.trips.write().await.insert(trip.id, trip.clone());
        Ok(())
    }

    async fn get_trip(&self, id: Uuid) -> Result<Option<Trip>, StoreError> {
        Ok(self.trips.read().await.get(&id).cloned())
    }

    async fn update_trip_status(&self, id: Uuid, status: TripStatus) -> Result<(), StoreError> {
        let mut trips = self.trips.write().await;
        let trip = trips
            .get_mut(&id)
            .ok_or_else(|| format!("Trip not found: {}", id))?;
        trip.status = status;
        Ok(())
    }
}

#[async_trait]
impl BookingRepository for MemoryStore {
    async fn create_booking(&self, booking: &Booking) -> Result<(), StoreError> {
        self.bookings
            .write()
            .await
            .insert(booking.id, booking.clone());
        Ok(())
    }

    async fn get_booking(&self, id: Uuid) -> Result<Option<Booking>, StoreError> {
        Ok(self.bookings.read().await.get(&id).cloned())
    }

    async fn find_by_reference(
        &self,
        trip_id: Uuid,
        reference: &str,
    ) -> Result<Option<Booking>, StoreError> {
        Ok(self
            .bookings
            .read()
            .await
            .values()
            .find(|b| b.trip_id == trip_id && b.reference == reference)
            .cloned())
    }

    async fn list_for_trip(&self, trip_id: Uuid) -> Result<Vec<Booking>, StoreError> {
        let mut bookings: Vec<Booking> = self
            .bookings
            .read()
            .await
            .values()
            .filter(|b| b.trip_id == trip_id)
            .cloned()
            .collect();
        // Deterministic order for grid rendering
        bookings.sort_by_key(|b| (b.created_at, b.id));
        Ok(bookings)
    }

    async fn update_booking_status(
        &self,
        id: Uuid,
        status: BookingStatus,
    ) -> Result<(), StoreError> {
        let mut bookings = self.bookings.write().await;
        let booking = bookings
            .get_mut(&id)
            .ok_or_else(|| format!("Booking not found: {}", id))?;
        booking.status = status;
        Ok(())
    }
}

#[async_trait]
impl CheckInRepository for MemoryStore {
    async fn upsert(&self, record: &CheckInRecord) -> Result<(), StoreError> {
        self.check_ins
            .write()
            .await
            .insert((record.trip_id, record.booking_id), record.clone());
        Ok(())
    }

    async fn get(
        &self,
        trip_id: Uuid,
        booking_id: Uuid,
    ) -> Result<Option<CheckInRecord>, StoreError> {
        Ok(self
            .check_ins
            .read()
            .await
            .get(&(trip_id, booking_id))
            .cloned())
    }

    async fn list_for_trip(&self, trip_id: Uuid) -> Result<Vec<CheckInRecord>, StoreError> {
        let mut records: Vec<CheckInRecord> = self
            .check_ins
            .read()
            .await
            .values()
            .filter(|r| r.trip_id == trip_id)
            .cloned()
            .collect();
        records.sort_by_key(|r| r.booking_id);
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use omnibus_core::{BusInfo, Passenger};

    #[tokio::test]
    async fn test_check_in_upsert_replaces_in_place() {
        let store = MemoryStore::new();
        let trip_id = Uuid::new_v4();
        let booking_id = Uuid::new_v4();

        let mut record = CheckInRecord::new(trip_id, booking_id);
        store.upsert(&record).await.unwrap();

        record.apply(
            omnibus_core::CheckInStatus::CheckedIn,
            Some("gate 2".to_string()),
            Utc::now(),
        );
        store.upsert(&record).await.unwrap();

        let records = CheckInRepository::list_for_trip(&store, trip_id).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].status, omnibus_core::CheckInStatus::CheckedIn);
    }

    #[tokio::test]
    async fn test_booking_listing_is_scoped_and_ordered() {
        let store = MemoryStore::new();
        let trip_id = Uuid::new_v4();
        let other_trip = Uuid::new_v4();

        let passenger = |name: &str| Passenger {
            id: Uuid::new_v4(),
            name: name.to_string(),
        };

        let mut first = Booking::new(
            Uuid::new_v4(),
            trip_id,
            passenger("Halima"),
            vec!["1A".parse().unwrap()],
        );
        first.created_at = Utc::now() - Duration::minutes(5);
        let second = Booking::new(
            Uuid::new_v4(),
            trip_id,
            passenger("Peter"),
            vec!["1B".parse().unwrap()],
        );
        let elsewhere = Booking::new(
            Uuid::new_v4(),
            other_trip,
            passenger("Grace"),
            vec!["1A".parse().unwrap()],
        );

        store.create_booking(&second).await.unwrap();
        store.create_booking(&first).await.unwrap();
        store.create_booking(&elsewhere).await.unwrap();

        let listed = BookingRepository::list_for_trip(&store, trip_id).await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].id, first.id);
    }

    #[tokio::test]
    async fn test_trip_status_update_requires_existing_trip() {
        let store = MemoryStore::new();
        let missing = store
            .update_trip_status(Uuid::new_v4(), TripStatus::Departed)
            .await;
        assert!(missing.is_err());

        let trip = Trip::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            BusInfo {
                plate: "KCB 412T".to_string(),
                capacity: 50,
            },
            Utc::now(),
            Utc::now() + Duration::hours(6),
        );
        store.create_trip(&trip).await.unwrap();
        store
            .update_trip_status(trip.id, TripStatus::Departed)
            .await
            .unwrap();
        let loaded = store.get_trip(trip.id).await.unwrap().unwrap();
        assert_eq!(loaded.status, TripStatus::Departed);
    }
}
