use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Trip lifecycle status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TripStatus {
    Scheduled,
    Boarding,
    Departed,
    Arrived,
    Cancelled,
}

impl TripStatus {
    /// Terminal trips accept no further boarding or lifecycle actions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, TripStatus::Arrived | TripStatus::Cancelled)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TripStatus::Scheduled => "SCHEDULED",
            TripStatus::Boarding => "BOARDING",
            TripStatus::Departed => "DEPARTED",
            TripStatus::Arrived => "ARRIVED",
            TripStatus::Cancelled => "CANCELLED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "SCHEDULED" => Some(TripStatus::Scheduled),
            "BOARDING" => Some(TripStatus::Boarding),
            "DEPARTED" => Some(TripStatus::Departed),
            "ARRIVED" => Some(TripStatus::Arrived),
            "CANCELLED" => Some(TripStatus::Cancelled),
            _ => None,
        }
    }
}

/// The physical bus assigned to a trip
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusInfo {
    pub plate: String,
    pub capacity: i32,
}

/// One operation of one bus on one route on one date
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trip {
    pub id: Uuid,
    pub route_id: Uuid,
    pub company_id: Uuid,
    pub bus: BusInfo,
    pub departs_at: DateTime<Utc>,
    pub arrives_at: DateTime<Utc>,
    pub status: TripStatus,
}

impl Trip {
    pub fn new(
        route_id: Uuid,
        company_id: Uuid,
        bus: BusInfo,
        departs_at: DateTime<Utc>,
        arrives_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            route_id,
            company_id,
            bus,
            departs_at,
            arrives_at,
            status: TripStatus::Scheduled,
        }
    }

    /// Transition: Scheduled → Boarding. No-op if boarding already opened.
    pub fn begin_boarding(&mut self) -> Result<(), TripError> {
        match self.status {
            TripStatus::Boarding => Ok(()),
            TripStatus::Scheduled => {
                self.status = TripStatus::Boarding;
                Ok(())
            }
            from => Err(TripError::InvalidTransition {
                from: from.as_str().to_string(),
                to: "BOARDING".to_string(),
            }),
        }
    }

    /// Transition: Scheduled/Boarding → Departed. No-op if already departed.
    pub fn depart(&mut self) -> Result<(), TripError> {
        match self.status {
            TripStatus::Departed => Ok(()),
            TripStatus::Scheduled | TripStatus::Boarding => {
                self.status = TripStatus::Departed;
                Ok(())
            }
            from => Err(TripError::InvalidTransition {
                from: from.as_str().to_string(),
                to: "DEPARTED".to_string(),
            }),
        }
    }

    /// Transition: Departed → Arrived. No-op if already arrived.
    pub fn arrive(&mut self) -> Result<(), TripError> {
        match self.status {
            TripStatus::Arrived => Ok(()),
            TripStatus::Departed => {
                self.status = TripStatus::Arrived;
                Ok(())
            }
            from => Err(TripError::InvalidTransition {
                from: from.as_str().to_string(),
                to: "ARRIVED".to_string(),
            }),
        }
    }

    /// Cancel the trip from any non-terminal state. No-op if already cancelled.
    pub fn cancel(&mut self) -> Result<(), TripError> {
        match self.status {
            TripStatus::Cancelled => Ok(()),
            TripStatus::Arrived => Err(TripError::InvalidTransition {
                from: "ARRIVED".to_string(),
                to: "CANCELLED".to_string(),
            }),
            _ => {
                self.status = TripStatus::Cancelled;
                Ok(())
            }
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TripError {
    #[error("Invalid trip transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn test_trip() -> Trip {
        let departs = Utc::now();
        Trip::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            BusInfo {
                plate: "KDA 123X".to_string(),
                capacity: 50,
            },
            departs,
            departs + Duration::hours(4),
        )
    }

    #[test]
    fn test_full_lifecycle() {
        let mut trip = test_trip();
        assert_eq!(trip.status, TripStatus::Scheduled);

        trip.begin_boarding().unwrap();
        assert_eq!(trip.status, TripStatus::Boarding);

        trip.depart().unwrap();
        assert_eq!(trip.status, TripStatus::Departed);

        trip.arrive().unwrap();
        assert_eq!(trip.status, TripStatus::Arrived);
        assert!(trip.status.is_terminal());
    }

    #[test]
    fn test_depart_straight_from_scheduled() {
        let mut trip = test_trip();
        trip.depart().unwrap();
        assert_eq!(trip.status, TripStatus::Departed);
    }

    #[test]
    fn test_transitions_are_idempotent() {
        let mut trip = test_trip();
        trip.depart().unwrap();
        trip.depart().unwrap();
        assert_eq!(trip.status, TripStatus::Departed);

        trip.arrive().unwrap();
        trip.arrive().unwrap();
        assert_eq!(trip.status, TripStatus::Arrived);
    }

    #[test]
    fn test_cannot_arrive_before_departing() {
        let mut trip = test_trip();
        let err = trip.arrive().unwrap_err();
        assert!(matches!(err, TripError::InvalidTransition { .. }));
        assert_eq!(trip.status, TripStatus::Scheduled);
    }

    #[test]
    fn test_cancel_from_any_non_terminal_state() {
        let mut trip = test_trip();
        trip.cancel().unwrap();
        assert_eq!(trip.status, TripStatus::Cancelled);

        // Cancelling again is a no-op
        trip.cancel().unwrap();

        let mut departed = test_trip();
        departed.depart().unwrap();
        departed.cancel().unwrap();
        assert_eq!(departed.status, TripStatus::Cancelled);
    }

    #[test]
    fn test_cannot_cancel_arrived_trip() {
        let mut trip = test_trip();
        trip.depart().unwrap();
        trip.arrive().unwrap();
        assert!(trip.cancel().is_err());
    }

    #[test]
    fn test_cannot_board_departed_trip() {
        let mut trip = test_trip();
        trip.depart().unwrap();
        assert!(trip.begin_boarding().is_err());
    }

    #[test]
    fn test_status_round_trip() {
        for status in [
            TripStatus::Scheduled,
            TripStatus::Boarding,
            TripStatus::Departed,
            TripStatus::Arrived,
            TripStatus::Cancelled,
        ] {
            assert_eq!(TripStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(TripStatus::parse("DELAYED"), None);
    }
}
