//! Background expiry sweep.
//!
//! Lazy detection on mutating calls is the authority for expiry; this task
//! additionally reclaims overdue holds on a fixed interval so stock returns
//! to the pool even when nobody touches the product. Both detectors funnel
//! through the same Active→Expired edge, so they can never double-credit.

use crate::ledger::StockLedger;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, error};

/// Handle to the running sweep task. Aborts the task on drop.
#[derive(Debug)]
pub struct Sweeper {
    handle: JoinHandle<()>,
}

impl Sweeper {
    /// Spawns a sweep of every product on `interval`.
    #[must_use]
    pub fn spawn(ledger: Arc<StockLedger>, interval: Duration) -> Self {
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // The first tick fires immediately; skip it so startup is quiet.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                match ledger.sweep().await {
                    Ok(0) => debug!("sweep found no overdue holds"),
                    Ok(expired) => debug!(expired, "sweep reclaimed overdue holds"),
                    Err(err) => error!(%err, "sweep failed"),
                }
            }
        });
        Self { handle }
    }
}

impl Drop for Sweeper {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::store::InMemoryReservationStore;
    use chrono::Utc;
    use reserva_core::{FixedClock, HoldDuration, Money, Product, ProductId, UserId};

    #[tokio::test(start_paused = true)]
    async fn sweeper_reclaims_stock_without_traffic() {
        let clock = Arc::new(FixedClock::new(Utc::now()));
        let ledger = Arc::new(StockLedger::new(
            Arc::new(InMemoryReservationStore::new()),
            clock.clone(),
        ));
        let product_id = ProductId::new();
        ledger.register(Product::new(
            product_id,
            "Pulsera".to_string(),
            String::new(),
            Money::from_cents(900_000),
            3,
        ));
        ledger
            .reserve(product_id, UserId::new(), 3, HoldDuration::from_minutes(1))
            .await
            .unwrap();

        let _sweeper = Sweeper::spawn(ledger.clone(), Duration::from_secs(60));
        clock.advance(chrono::Duration::minutes(2));

        // Two paused-time ticks are plenty for one sweep to run.
        tokio::time::advance(Duration::from_secs(121)).await;
        tokio::time::sleep(Duration::from_millis(1)).await;

        let snapshot = ledger.available(product_id).await.unwrap();
        assert_eq!(snapshot.stock_disponible, 3);
    }

    #[tokio::test]
    async fn dropping_the_sweeper_stops_the_task() {
        let clock = Arc::new(FixedClock::new(Utc::now()));
        let ledger = Arc::new(StockLedger::new(
            Arc::new(InMemoryReservationStore::new()),
            clock,
        ));
        let sweeper = Sweeper::spawn(ledger, Duration::from_millis(5));
        let handle_probe = sweeper.handle.abort_handle();
        drop(sweeper);
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(handle_probe.is_finished());
    }
}
