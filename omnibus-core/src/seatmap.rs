use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::booking::Booking;
use crate::checkin::{CheckInRecord, CheckInStatus};

/// Seats run four abreast: A B | C D, with the aisle between B and C.
pub const SEAT_LETTERS: [char; 4] = ['A', 'B', 'C', 'D'];
pub const SEATS_PER_ROW: i32 = 4;

/// Derived seat identity within a trip, e.g. "3B". Seats are not persisted
/// entities; they exist implicitly up to the bus capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SeatId {
    pub row: i32,
    pub letter: char,
}

impl SeatId {
    /// Seat for a 0-based seat index.
    pub fn from_index(index: i32) -> Self {
        Self {
            row: index / SEATS_PER_ROW + 1,
            letter: SEAT_LETTERS[(index % SEATS_PER_ROW) as usize],
        }
    }

    /// 0-based seat index, or None for a letter outside A-D or row < 1.
    pub fn index(&self) -> Option<i32> {
        if self.row < 1 {
            return None;
        }
        let letter_index = SEAT_LETTERS.iter().position(|l| *l == self.letter)?;
        Some((self.row - 1) * SEATS_PER_ROW + letter_index as i32)
    }

    /// Whether this seat exists on a bus of the given capacity.
    pub fn is_within(&self, capacity: i32) -> bool {
        self.index().is_some_and(|i| i < capacity)
    }
}

impl fmt::Display for SeatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.row, self.letter)
    }
}

#[derive(Debug, thiserror::Error)]
#[error("Invalid seat id: {0}")]
pub struct SeatIdParseError(pub String);

impl FromStr for SeatId {
    type Err = SeatIdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let digits: String = s.chars().take_while(|c| c.is_ascii_digit()).collect();
        let rest = &s[digits.len()..];

        let row: i32 = digits
            .parse()
            .map_err(|_| SeatIdParseError(s.to_string()))?;
        if row < 1 || rest.chars().count() != 1 {
            return Err(SeatIdParseError(s.to_string()));
        }

        let letter = rest
            .chars()
            .next()
            .map(|c| c.to_ascii_uppercase())
            .filter(|c| SEAT_LETTERS.contains(c))
            .ok_or_else(|| SeatIdParseError(s.to_string()))?;

        Ok(SeatId { row, letter })
    }
}

impl Serialize for SeatId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for SeatId {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Rendered status of one seat cell
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SeatCellStatus {
    Available,
    Booked,
    CheckedIn,
    NoShow,
}

/// Who currently holds a seat, as shown on the boarding screen
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Occupant {
    pub booking_id: Uuid,
    pub passenger_name: String,
    pub reference: String,
    pub check_in_status: CheckInStatus,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SeatCell {
    pub seat_id: SeatId,
    pub status: SeatCellStatus,
    pub occupant: Option<Occupant>,
    /// Render-only aisle marker; carries no booking semantics.
    pub aisle_after: bool,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SeatRow {
    pub row: i32,
    pub seats: Vec<SeatCell>,
}

/// Derived view of a trip's occupancy. Never stored; recomputed from
/// bookings and check-in records after every mutation.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SeatGrid {
    pub total_seats: i32,
    pub rows: Vec<SeatRow>,
    pub booked_seats: BTreeSet<SeatId>,
    /// Defensive warnings (e.g. a booking pointing outside the bus). The
    /// grid still renders; callers log these.
    pub inconsistencies: Vec<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum SeatMapError {
    #[error("Invalid bus capacity: {0}")]
    InvalidCapacity(i32),
}

/// Build the deterministic seat grid for a trip. Pure function: same
/// bookings and check-ins always produce a structurally identical grid.
///
/// `check_ins` is keyed by booking id. Cancelled bookings are ignored.
pub fn build_seat_grid(
    capacity: i32,
    bookings: &[Booking],
    check_ins: &HashMap<Uuid, CheckInRecord>,
) -> Result<SeatGrid, SeatMapError> {
    if capacity <= 0 {
        return Err(SeatMapError::InvalidCapacity(capacity));
    }

    let mut occupants: HashMap<SeatId, Occupant> = HashMap::new();
    let mut inconsistencies = Vec::new();

    for booking in bookings {
        if !booking.status.is_active() {
            continue;
        }
        let check_in_status = check_ins
            .get(&booking.id)
            .map(|r| r.status)
            .unwrap_or(CheckInStatus::Pending);

        for seat_id in &booking.seat_ids {
            if !seat_id.is_within(capacity) {
                inconsistencies.push(format!(
                    "Booking {} references seat {} outside bus capacity {}",
                    booking.id, seat_id, capacity
                ));
                continue;
            }
            if let Some(existing) = occupants.get(seat_id) {
                inconsistencies.push(format!(
                    "Seat {} is claimed by bookings {} and {}",
                    seat_id, existing.booking_id, booking.id
                ));
                continue;
            }
            occupants.insert(
                *seat_id,
                Occupant {
                    booking_id: booking.id,
                    passenger_name: booking.passenger.name.clone(),
                    reference: booking.reference.clone(),
                    check_in_status,
                },
            );
        }
    }

    let mut rows: Vec<SeatRow> = Vec::new();
    let mut booked_seats = BTreeSet::new();

    for index in 0..capacity {
        let seat_id = SeatId::from_index(index);
        let occupant = occupants.remove(&seat_id);
        let status = match &occupant {
            None => SeatCellStatus::Available,
            Some(o) => match o.check_in_status {
                CheckInStatus::Pending => SeatCellStatus::Booked,
                CheckInStatus::CheckedIn => SeatCellStatus::CheckedIn,
                CheckInStatus::NoShow => SeatCellStatus::NoShow,
            },
        };
        if occupant.is_some() {
            booked_seats.insert(seat_id);
        }

        if rows.last().map(|r: &SeatRow| r.row) != Some(seat_id.row) {
            rows.push(SeatRow {
                row: seat_id.row,
                seats: Vec::new(),
            });
        }
        if let Some(row) = rows.last_mut() {
            row.seats.push(SeatCell {
                seat_id,
                status,
                occupant,
                aisle_after: seat_id.letter == 'B',
            });
        }
    }

    Ok(SeatGrid {
        total_seats: capacity,
        rows,
        booked_seats,
        inconsistencies,
    })
}
