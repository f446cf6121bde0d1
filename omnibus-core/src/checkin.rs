use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CheckInStatus {
    /// No driver action yet; the seat map shows the seat as plain "booked".
    Pending,
    CheckedIn,
    NoShow,
}

impl CheckInStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckInStatus::Pending => "PENDING",
            CheckInStatus::CheckedIn => "CHECKED_IN",
            CheckInStatus::NoShow => "NO_SHOW",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PENDING" => Some(CheckInStatus::Pending),
            "CHECKED_IN" => Some(CheckInStatus::CheckedIn),
            "NO_SHOW" => Some(CheckInStatus::NoShow),
            _ => None,
        }
    }
}

/// One record per (trip, booking), created lazily on the first driver
/// action and updated in place afterwards (upsert, never duplicated).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckInRecord {
    pub trip_id: Uuid,
    pub booking_id: Uuid,
    pub status: CheckInStatus,
    /// Set on the first transition into CheckedIn and preserved from then
    /// on, even across a corrective reversal to NoShow (audit trail).
    pub check_in_time: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl CheckInRecord {
    pub fn new(trip_id: Uuid, booking_id: Uuid) -> Self {
        Self {
            trip_id,
            booking_id,
            status: CheckInStatus::Pending,
            check_in_time: None,
            notes: None,
            updated_at: Utc::now(),
        }
    }

    /// Apply a driver action. Idempotent: re-applying the current status
    /// refreshes notes and `updated_at` only.
    pub fn apply(&mut self, new_status: CheckInStatus, notes: Option<String>, at: DateTime<Utc>) {
        if new_status == CheckInStatus::CheckedIn && self.check_in_time.is_none() {
            self.check_in_time = Some(at);
        }
        self.status = new_status;
        if notes.is_some() {
            self.notes = notes;
        }
        self.updated_at = at;
    }
}
