pub mod booking;
pub mod checkin;
pub mod repository;
pub mod seatmap;
pub mod trip;

pub use booking::{Booking, BookingStatus, Passenger, PaymentStatus};
pub use checkin::{CheckInRecord, CheckInStatus};
pub use seatmap::{SeatGrid, SeatId, SeatMapError};
pub use trip::{BusInfo, Trip, TripError, TripStatus};
