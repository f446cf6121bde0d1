use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use omnibus_core::repository::{
    BookingRepository, CheckInRepository, StoreError, TripRepository,
};
use omnibus_core::{
    Booking, BookingStatus, BusInfo, CheckInRecord, CheckInStatus, Passenger, PaymentStatus,
    SeatId, Trip, TripStatus,
};

// Internal structs for type-safe querying
#[derive(sqlx::FromRow)]
struct TripRow {
    id: Uuid,
    route_id: Uuid,
    company_id: Uuid,
    bus_plate: String,
    bus_capacity: i32,
    departs_at: DateTime<Utc>,
    arrives_at: DateTime<Utc>,
    status: String,
}

#[derive(sqlx::FromRow)]
struct BookingRow {
    id: Uuid,
    trip_id: Uuid,
    passenger_id: Uuid,
    passenger_name: String,
    seat_ids: Vec<String>,
    status: String,
    payment_status: String,
    reference: String,
    created_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct CheckInRow {
    trip_id: Uuid,
    booking_id: Uuid,
    status: String,
    check_in_time: Option<DateTime<Utc>>,
    notes: Option<String>,
    updated_at: DateTime<Utc>,
}

impl TripRow {
    fn into_trip(self) -> Result<Trip, StoreError> {
        let status = TripStatus::parse(&self.status)
            .ok_or_else(|| StoreError::from(format!("Unknown trip status: {}", self.status)))?;
        Ok(Trip {
            id: self.id,
            route_id: self.route_id,
            company_id: self.company_id,
            bus: BusInfo {
                plate: self.bus_plate,
                capacity: self.bus_capacity,
            },
            departs_at: self.departs_at,
            arrives_at: self.arrives_at,
            status,
        })
    }
}

impl BookingRow {
    fn into_booking(self) -> Result<Booking, StoreError> {
        let status = BookingStatus::parse(&self.status)
            .ok_or_else(|| StoreError::from(format!("Unknown booking status: {}", self.status)))?;
        let payment_status = PaymentStatus::parse(&self.payment_status).ok_or_else(|| {
            StoreError::from(format!("Unknown payment status: {}", self.payment_status))
        })?;
        let seat_ids = self
            .seat_ids
            .iter()
            .map(|s| s.parse::<SeatId>())
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Booking {
            id: self.id,
            trip_id: self.trip_id,
            passenger: Passenger {
                id: self.passenger_id,
                name: self.passenger_name,
            },
            seat_ids,
            status,
            payment_status,
            reference: self.reference,
            created_at: self.created_at,
        })
    }
}

impl CheckInRow {
    fn into_record(self) -> Result<CheckInRecord, StoreError> {
        let status = CheckInStatus::parse(&self.status).ok_or_else(|| {
            StoreError::from(format!("Unknown check-in status: {}", self.status))
        })?;
        Ok(CheckInRecord {
            trip_id: self.trip_id,
            booking_id: self.booking_id,
            status,
            check_in_time: self.check_in_time,
            notes: self.notes,
            updated_at: self.updated_at,
        })
    }
}

pub struct PgTripRepository {
    pool: PgPool,
}

impl PgTripRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TripRepository for PgTripRepository {
    async fn create_trip(&self, trip: &Trip) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO trips (id, route_id, company_id, bus_plate, bus_capacity, departs_at, arrives_at, status)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(trip.id)
        .bind(trip.route_id)
        .bind(trip.company_id)
        .bind(&trip.bus.plate)
        .bind(trip.bus.capacity)
        .bind(trip.departs_at)
        .bind(trip.arrives_at)
        .bind(trip.status.as_str())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_trip(&self, id: Uuid) -> Result<Option<Trip>, StoreError> {
        let row = sqlx::query_as::<_, TripRow>("SELECT * FROM trips WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(TripRow::into_trip).transpose()
    }

    async fn update_trip_status(&self, id: Uuid, status: TripStatus) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE trips SET status = $2 WHERE id = $1")
            .bind(id)
            .bind(status.as_str())
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::from(format!("Trip not found: {}", id)));
        }
        Ok(())
    }
}

pub struct PgBookingRepository {
    pool: PgPool,
}

impl PgBookingRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BookingRepository for PgBookingRepository {
    async fn create_booking(&self, booking: &Booking) -> Result<(), StoreError> {
        let seat_strings: Vec<String> = booking.seat_ids.iter().map(|s| s.to_string()).collect();

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO bookings (id, trip_id, passenger_id, passenger_name, seat_ids, status, payment_status, reference, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(booking.id)
        .bind(booking.trip_id)
        .bind(booking.passenger.id)
        .bind(&booking.passenger.name)
        .bind(&seat_strings)
        .bind(booking.status.as_str())
        .bind(booking.payment_status.as_str())
        .bind(&booking.reference)
        .bind(booking.created_at)
        .execute(&mut *tx)
        .await?;

        // The partial unique index on (trip_id, seat_id) WHERE NOT released
        // rejects the insert if another active booking holds a seat; the
        // ledger's critical section makes that a should-never-happen case.
        for seat in &seat_strings {
            sqlx::query(
                "INSERT INTO booking_seats (trip_id, seat_id, booking_id) VALUES ($1, $2, $3)",
            )
            .bind(booking.trip_id)
            .bind(seat)
            .bind(booking.id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn get_booking(&self, id: Uuid) -> Result<Option<Booking>, StoreError> {
        let row = sqlx::query_as::<_, BookingRow>("SELECT * FROM bookings WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(BookingRow::into_booking).transpose()
    }

    async fn find_by_reference(
        &self,
        trip_id: Uuid,
        reference: &str,
    ) -> Result<Option<Booking>, StoreError> {
        let row = sqlx::query_as::<_, BookingRow>(
            "SELECT * FROM bookings WHERE trip_id = $1 AND reference = $2",
        )
        .bind(trip_id)
        .bind(reference)
        .fetch_optional(&self.pool)
        .await?;
        row.map(BookingRow::into_booking).transpose()
    }

    async fn list_for_trip(&self, trip_id: Uuid) -> Result<Vec<Booking>, StoreError> {
        let rows = sqlx::query_as::<_, BookingRow>(
            "SELECT * FROM bookings WHERE trip_id = $1 ORDER BY created_at, id",
        )
        .bind(trip_id)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(BookingRow::into_booking).collect()
    }

    async fn update_booking_status(
        &self,
        id: Uuid,
        status: BookingStatus,
    ) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query("UPDATE bookings SET status = $2 WHERE id = $1")
            .bind(id)
            .bind(status.as_str())
            .execute(&mut *tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::from(format!("Booking not found: {}", id)));
        }

        // A cancelled booking frees its seats for new claims
        if status == BookingStatus::Cancelled {
            sqlx::query("UPDATE booking_seats SET released = TRUE WHERE booking_id = $1")
                .bind(id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(())
    }
}

pub struct PgCheckInRepository {
    pool: PgPool,
}

impl PgCheckInRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CheckInRepository for PgCheckInRepository {
    async fn upsert(&self, record: &CheckInRecord) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO check_ins (trip_id, booking_id, status, check_in_time, notes, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (trip_id, booking_id) DO UPDATE
            SET status = EXCLUDED.status,
                check_in_time = EXCLUDED.check_in_time,
                notes = EXCLUDED.notes,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(record.trip_id)
        .bind(record.booking_id)
        .bind(record.status.as_str())
        .bind(record.check_in_time)
        .bind(&record.notes)
        .bind(record.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get(
        &self,
        trip_id: Uuid,
        booking_id: Uuid,
    ) -> Result<Option<CheckInRecord>, StoreError> {
        let row = sqlx::query_as::<_, CheckInRow>(
            "SELECT * FROM check_ins WHERE trip_id = $1 AND booking_id = $2",
        )
        .bind(trip_id)
        .bind(booking_id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(CheckInRow::into_record).transpose()
    }

    async fn list_for_trip(&self, trip_id: Uuid) -> Result<Vec<CheckInRecord>, StoreError> {
        let rows = sqlx::query_as::<_, CheckInRow>(
            "SELECT * FROM check_ins WHERE trip_id = $1 ORDER BY booking_id",
        )
        .bind(trip_id)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(CheckInRow::into_record).collect()
    }
}
