use std::sync::Arc;

use omnibus_boarding::BoardingService;
use omnibus_core::repository::TripRepository;
use omnibus_ledger::SeatLedger;
use omnibus_live::Broadcaster;
use omnibus_store::app_config::BusinessRules;

#[derive(Clone)]
pub struct AppState {
    pub ledger: Arc<SeatLedger>,
    pub boarding: Arc<BoardingService>,
    pub live: Arc<Broadcaster>,
    /// The scheduler collaborator creates trips through this handle
    pub trips: Arc<dyn TripRepository>,
    pub business_rules: BusinessRules,
}
