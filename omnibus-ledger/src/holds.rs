use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use omnibus_core::{Passenger, SeatId};

/// A temporary, exclusive claim on a set of seats, waiting for payment
/// confirmation. Holds are ephemeral by design: they live in memory with a
/// TTL and either become a durable booking or evaporate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeatHold {
    pub token: Uuid,
    pub trip_id: Uuid,
    pub passenger: Passenger,
    pub seat_ids: Vec<SeatId>,
    pub held_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl SeatHold {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// Active hold table, keyed by claim token.
#[derive(Default)]
pub struct HoldStore {
    holds: HashMap<Uuid, SeatHold>,
}

impl HoldStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, hold: SeatHold) {
        self.holds.insert(hold.token, hold);
    }

    pub fn get(&self, token: &Uuid) -> Option<&SeatHold> {
        self.holds.get(token)
    }

    pub fn remove(&mut self, token: &Uuid) -> Option<SeatHold> {
        self.holds.remove(token)
    }

    /// Seats currently held (not yet expired) on a trip.
    pub fn active_seats(&self, trip_id: Uuid, now: DateTime<Utc>) -> BTreeSet<SeatId> {
        self.holds
            .values()
            .filter(|h| h.trip_id == trip_id && !h.is_expired(now))
            .flat_map(|h| h.seat_ids.iter().copied())
            .collect()
    }

    /// Lazy expiry for one trip, run under that trip's critical section.
    pub fn remove_expired_for_trip(&mut self, trip_id: Uuid, now: DateTime<Utc>) -> Vec<SeatHold> {
        self.drain_expired(|h| h.trip_id == trip_id, now)
    }

    /// Background sweep across all trips.
    pub fn remove_expired(&mut self, now: DateTime<Utc>) -> Vec<SeatHold> {
        self.drain_expired(|_| true, now)
    }

    fn drain_expired(&mut self, scope: impl Fn(&SeatHold) -> bool, now: DateTime<Utc>) -> Vec<SeatHold> {
        let expired_tokens: Vec<Uuid> = self
            .holds
            .values()
            .filter(|h| scope(h) && h.is_expired(now))
            .map(|h| h.token)
            .collect();

        expired_tokens
            .iter()
            .filter_map(|token| self.holds.remove(token))
            .collect()
    }

    pub fn active_count(&self, now: DateTime<Utc>) -> usize {
        self.holds.values().filter(|h| !h.is_expired(now)).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn hold(trip_id: Uuid, seats: &[&str], ttl_seconds: i64) -> SeatHold {
        let now = Utc::now();
        SeatHold {
            token: Uuid::new_v4(),
            trip_id,
            passenger: Passenger {
                id: Uuid::new_v4(),
                name: "Wanjiku".to_string(),
            },
            seat_ids: seats.iter().map(|s| s.parse().unwrap()).collect(),
            held_at: now,
            expires_at: now + Duration::seconds(ttl_seconds),
        }
    }

    #[test]
    fn test_active_seats_skips_expired_holds() {
        let mut store = HoldStore::new();
        let trip_id = Uuid::new_v4();
        store.insert(hold(trip_id, &["1A", "1B"], 600));
        store.insert(hold(trip_id, &["2A"], -1)); // already lapsed
        store.insert(hold(Uuid::new_v4(), &["1C"], 600)); // other trip

        let now = Utc::now();
        let seats = store.active_seats(trip_id, now);
        assert_eq!(seats.len(), 2);
        assert!(seats.contains(&"1A".parse().unwrap()));
        assert!(!seats.contains(&"2A".parse().unwrap()));
    }

    #[test]
    fn test_sweep_removes_only_expired() {
        let mut store = HoldStore::new();
        let trip_id = Uuid::new_v4();
        store.insert(hold(trip_id, &["1A"], 600));
        store.insert(hold(trip_id, &["2A"], -1));
        store.insert(hold(Uuid::new_v4(), &["3A"], -1));

        let removed = store.remove_expired(Utc::now());
        assert_eq!(removed.len(), 2);
        assert_eq!(store.active_count(Utc::now()), 1);
    }

    #[test]
    fn test_per_trip_expiry_is_scoped() {
        let mut store = HoldStore::new();
        let trip_id = Uuid::new_v4();
        let other = Uuid::new_v4();
        store.insert(hold(trip_id, &["1A"], -1));
        store.insert(hold(other, &["1A"], -1));

        let removed = store.remove_expired_for_trip(trip_id, Utc::now());
        assert_eq!(removed.len(), 1);
        assert_eq!(removed[0].trip_id, trip_id);
        assert!(store.active_count(Utc::now() - Duration::seconds(2)) >= 1);
    }
}
