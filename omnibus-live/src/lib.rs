use std::collections::HashMap;
use std::sync::Mutex;

use tokio::sync::broadcast;
use tracing::debug;
use uuid::Uuid;

use omnibus_shared::TripEvent;

const DEFAULT_ROOM_CAPACITY: usize = 100;

/// Fans seat and check-in changes out to everyone watching a trip's
/// boarding screen. One broadcast room per trip; events for a trip reach
/// each listener in publish order (single-trip FIFO). Delivery is
/// best-effort: a lagging or disconnected listener drops events and is
/// expected to refetch the full seat map on reconnect — the ledger and
/// state machine stay the source of truth.
pub struct Broadcaster {
    rooms: Mutex<HashMap<Uuid, broadcast::Sender<TripEvent>>>,
    room_capacity: usize,
}

impl Broadcaster {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_ROOM_CAPACITY)
    }

    pub fn with_capacity(room_capacity: usize) -> Self {
        Self {
            rooms: Mutex::new(HashMap::new()),
            room_capacity: room_capacity.max(1),
        }
    }

    /// Join the room for a trip. Unsubscribing is dropping the receiver.
    /// Late joiners see only events published after this call; they fetch
    /// the current seat map first.
    pub fn subscribe(&self, trip_id: Uuid) -> broadcast::Receiver<TripEvent> {
        let mut rooms = self.rooms.lock().unwrap_or_else(|e| e.into_inner());
        rooms
            .entry(trip_id)
            .or_insert_with(|| broadcast::channel(self.room_capacity).0)
            .subscribe()
    }

    /// Publish an event to a trip's room. Returns the number of listeners
    /// it reached; zero when nobody is watching, which is not an error.
    pub fn publish(&self, event: TripEvent) -> usize {
        let trip_id = event.trip_id();
        let rooms = self.rooms.lock().unwrap_or_else(|e| e.into_inner());
        match rooms.get(&trip_id) {
            Some(sender) => sender.send(event).unwrap_or(0),
            None => {
                debug!(%trip_id, "No listeners for trip event");
                0
            }
        }
    }

    /// Drop rooms nobody is listening to any more. Returns how many were
    /// removed. Called opportunistically; an idle room is only memory.
    pub fn prune(&self) -> usize {
        let mut rooms = self.rooms.lock().unwrap_or_else(|e| e.into_inner());
        let before = rooms.len();
        rooms.retain(|_, sender| sender.receiver_count() > 0);
        before - rooms.len()
    }

    pub fn room_count(&self) -> usize {
        self.rooms.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

impl Default for Broadcaster {
    fn default() -> Self {
        Self::new()
    }
}
