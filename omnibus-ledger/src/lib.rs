pub mod holds;
pub mod ledger;

pub use holds::SeatHold;
pub use ledger::{LedgerError, SeatLedger};
