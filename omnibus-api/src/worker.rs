use std::sync::Arc;
use std::time::Duration;

use omnibus_ledger::SeatLedger;
use omnibus_live::Broadcaster;
use tracing::info;

/// Background reaper for expired seat holds. Expiry is also enforced
/// lazily on every claim, so this loop only bounds how long a stale
/// hold can linger with no traffic on its trip.
pub fn start_hold_sweeper(
    ledger: Arc<SeatLedger>,
    live: Arc<Broadcaster>,
    interval_seconds: u64,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(interval_seconds));
        // The first tick fires immediately; skip it so startup stays quiet
        ticker.tick().await;
        info!(interval_seconds, "Hold sweeper started");

        loop {
            ticker.tick().await;
            let released = ledger.sweep_expired().await;
            if released > 0 {
                info!(released, "Swept expired seat holds");
            }
            live.prune();
        }
    })
}
