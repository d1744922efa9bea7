//! Stock ledger — authoritative available-quantity arithmetic.
//!
//! This is the one concurrency-critical piece of the subsystem. Two
//! simultaneous reserve calls against the same product must serialize so the
//! sum of granted quantities never exceeds stock; the ledger guarantees that
//! with one async mutex per product. Each product is an independent
//! serialization domain — holds on different products never contend.
//!
//! Expiry is handled lazily: every mutating entry point first returns the
//! stock of overdue Active reservations to the pool, and reads report that
//! stock as available without mutating anything. A background sweep (see
//! [`crate::sweeper`]) performs the same reclaim on a timer so stock comes
//! back even with no traffic.

use crate::store::ReservationStore;
use reserva_core::{
    Clock, HoldDuration, Product, ProductId, Reservation, ReservationError, ReservationId,
    ReservationStatus, StockSnapshot, UserId,
};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tokio::sync::Mutex;
use tracing::{info, warn};

/// Why a hold is being released back to the pool.
///
/// The caller specifies which terminal state the release records; the
/// arithmetic is identical.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReleaseCause {
    /// User-driven release.
    Cancelled,
    /// Deadline-driven release.
    Expired,
}

impl ReleaseCause {
    const fn terminal_status(self) -> ReservationStatus {
        match self {
            Self::Cancelled => ReservationStatus::Cancelled,
            Self::Expired => ReservationStatus::Expired,
        }
    }
}

/// Per-product mutable state, guarded by that product's mutex.
#[derive(Debug)]
struct ProductSlot {
    product: Product,
}

/// Authoritative available-quantity counter per product.
///
/// All stock mutation goes through [`reserve`](Self::reserve),
/// [`release`](Self::release) and [`commit`](Self::commit) — never directly.
pub struct StockLedger {
    slots: RwLock<HashMap<ProductId, Arc<Mutex<ProductSlot>>>>,
    store: Arc<dyn ReservationStore>,
    clock: Arc<dyn Clock>,
}

impl StockLedger {
    /// Creates a ledger over the given store and clock, with an empty catalog.
    #[must_use]
    pub fn new(store: Arc<dyn ReservationStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            slots: RwLock::new(HashMap::new()),
            store,
            clock,
        }
    }

    /// Registers a product and its starting stock with the ledger.
    ///
    /// Re-registering an id replaces the slot; the catalog CRUD path that
    /// would care about that lives outside this subsystem.
    pub fn register(&self, product: Product) {
        let id = product.id;
        if let Ok(mut slots) = self.slots.write() {
            slots.insert(id, Arc::new(Mutex::new(ProductSlot { product })));
        }
    }

    /// Product ids currently known to the ledger.
    #[must_use]
    pub fn product_ids(&self) -> Vec<ProductId> {
        self.slots
            .read()
            .map(|slots| slots.keys().copied().collect())
            .unwrap_or_default()
    }

    /// The ledger's notion of the current instant. Every expiry decision in
    /// the crate derives from this clock, reads included.
    pub(crate) fn now(&self) -> chrono::DateTime<chrono::Utc> {
        self.clock.now()
    }

    fn slot(&self, product_id: ProductId) -> Result<Arc<Mutex<ProductSlot>>, ReservationError> {
        self.slots
            .read()
            .ok()
            .and_then(|slots| slots.get(&product_id).cloned())
            .ok_or(ReservationError::ProductNotFound(product_id))
    }

    /// Returns the stock of overdue Active holds to the pool.
    ///
    /// Must run under the product's slot lock. Idempotent: a hold is only
    /// credited on its Active→Expired edge, so a second detector (lazy path
    /// vs. sweeper) finds nothing left to do.
    async fn reclaim_overdue(
        &self,
        slot: &mut ProductSlot,
        product_id: ProductId,
    ) -> Result<(), ReservationError> {
        let now = self.clock.now();
        let active = self.store.active_for_product(product_id).await?;
        for reservation in active {
            if reservation.is_overdue(now) {
                self.store
                    .set_status(reservation.id, ReservationStatus::Expired)
                    .await?;
                slot.product.stock += reservation.quantity;
                info!(
                    reservation = %reservation.id,
                    product = %product_id,
                    quantity = reservation.quantity,
                    "hold expired, stock returned to pool"
                );
            }
        }
        Ok(())
    }

    /// Read-only availability snapshot.
    ///
    /// Reflects all committed reservation state at call time: stock held by
    /// overdue Active reservations counts as available even before the
    /// terminal transition is recorded. No side effects.
    ///
    /// # Errors
    ///
    /// [`ReservationError::ProductNotFound`] for an unknown product, or a
    /// storage failure.
    pub async fn available(
        &self,
        product_id: ProductId,
    ) -> Result<StockSnapshot, ReservationError> {
        let slot = self.slot(product_id)?;
        let slot = slot.lock().await;
        let now = self.clock.now();
        let overdue: u32 = self
            .store
            .active_for_product(product_id)
            .await?
            .iter()
            .filter(|r| r.is_overdue(now))
            .map(|r| r.quantity)
            .sum();
        Ok(StockSnapshot {
            product_id,
            stock_disponible: slot.product.stock + overdue,
        })
    }

    /// Atomic check-and-decrement: grants a hold if enough stock is free.
    ///
    /// The check and the decrement run under the product's mutex, so
    /// concurrent calls can never both pass the check against a stale read.
    /// Exactly one ledger decrement happens per granted reservation.
    ///
    /// # Errors
    ///
    /// [`ReservationError::InsufficientStock`] when the pool cannot cover
    /// `quantity`, [`ReservationError::ProductNotFound`] for an unknown
    /// product, or a storage failure.
    pub async fn reserve(
        &self,
        product_id: ProductId,
        user_id: UserId,
        quantity: u32,
        hold: HoldDuration,
    ) -> Result<Reservation, ReservationError> {
        let slot = self.slot(product_id)?;
        let mut slot = slot.lock().await;
        self.reclaim_overdue(&mut slot, product_id).await?;

        if slot.product.stock < quantity {
            warn!(
                product = %product_id,
                requested = quantity,
                available = slot.product.stock,
                "reservation rejected, insufficient stock"
            );
            return Err(ReservationError::InsufficientStock {
                requested: quantity,
                available: slot.product.stock,
            });
        }

        let reservation = Reservation::new(
            ReservationId::new(),
            product_id,
            user_id,
            quantity,
            self.clock.now(),
            hold,
        );
        self.store.insert(reservation.clone()).await?;
        slot.product.stock -= quantity;
        info!(
            reservation = %reservation.id,
            product = %product_id,
            user = %user_id,
            quantity,
            expires_at = %reservation.expires_at,
            "hold granted"
        );
        Ok(reservation)
    }

    /// Returns a hold's quantity to the pool and records the terminal state.
    ///
    /// Only valid from Active. The credit happens exactly once even if a
    /// client retries: the second call finds a terminal state and gets
    /// `InvalidTransition`.
    ///
    /// # Errors
    ///
    /// [`ReservationError::ReservationNotFound`] for an unknown id,
    /// [`ReservationError::InvalidTransition`] when the reservation is no
    /// longer Active, or a storage failure.
    pub async fn release(
        &self,
        reservation_id: ReservationId,
        cause: ReleaseCause,
    ) -> Result<Reservation, ReservationError> {
        let product_id = self.reservation_product(reservation_id).await?;
        let slot = self.slot(product_id)?;
        let mut slot = slot.lock().await;
        // Lazy expiry wins over a late cancel: past the deadline the hold is
        // already Expired by the time the user's cancel is examined.
        self.reclaim_overdue(&mut slot, product_id).await?;

        let mut reservation = self.fetch(reservation_id).await?;
        reservation.ensure_active()?;

        let status = cause.terminal_status();
        self.store.set_status(reservation_id, status).await?;
        slot.product.stock += reservation.quantity;
        reservation.status = status;
        info!(
            reservation = %reservation_id,
            product = %product_id,
            quantity = reservation.quantity,
            %status,
            "hold released, stock returned to pool"
        );
        Ok(reservation)
    }

    /// Finalizes a hold as a sale. Only valid from Active.
    ///
    /// Does not touch the available quantity — the stock left the pool when
    /// the hold was granted and is now permanently consumed.
    ///
    /// # Errors
    ///
    /// [`ReservationError::ReservationNotFound`] for an unknown id,
    /// [`ReservationError::InvalidTransition`] when the reservation is no
    /// longer Active (including holds that just expired), or a storage
    /// failure.
    pub async fn commit(
        &self,
        reservation_id: ReservationId,
    ) -> Result<Reservation, ReservationError> {
        let product_id = self.reservation_product(reservation_id).await?;
        let slot = self.slot(product_id)?;
        let mut slot = slot.lock().await;
        self.reclaim_overdue(&mut slot, product_id).await?;

        let mut reservation = self.fetch(reservation_id).await?;
        reservation.ensure_active()?;

        self.store
            .set_status(reservation_id, ReservationStatus::Confirmed)
            .await?;
        reservation.status = ReservationStatus::Confirmed;
        info!(
            reservation = %reservation_id,
            product = %product_id,
            quantity = reservation.quantity,
            "hold confirmed, stock consumed"
        );
        Ok(reservation)
    }

    /// Expires every overdue hold across all products.
    ///
    /// Used by the background sweeper. Returns the number of holds expired.
    ///
    /// # Errors
    ///
    /// Propagates the first storage failure encountered.
    pub async fn sweep(&self) -> Result<usize, ReservationError> {
        let now = self.clock.now();
        let mut expired = 0;
        for product_id in self.product_ids() {
            let slot = self.slot(product_id)?;
            let mut slot = slot.lock().await;
            let active = self.store.active_for_product(product_id).await?;
            for reservation in active {
                if reservation.is_overdue(now) {
                    self.store
                        .set_status(reservation.id, ReservationStatus::Expired)
                        .await?;
                    slot.product.stock += reservation.quantity;
                    expired += 1;
                    info!(
                        reservation = %reservation.id,
                        product = %product_id,
                        quantity = reservation.quantity,
                        "sweeper expired overdue hold"
                    );
                }
            }
        }
        Ok(expired)
    }

    async fn fetch(&self, id: ReservationId) -> Result<Reservation, ReservationError> {
        self.store
            .get(id)
            .await?
            .ok_or(ReservationError::ReservationNotFound(id))
    }

    async fn reservation_product(
        &self,
        id: ReservationId,
    ) -> Result<ProductId, ReservationError> {
        Ok(self.fetch(id).await?.product_id)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::store::InMemoryReservationStore;
    use chrono::{Duration, Utc};
    use reserva_core::FixedClock;

    fn ledger_with_stock(stock: u32) -> (Arc<StockLedger>, ProductId, Arc<FixedClock>) {
        let clock = Arc::new(FixedClock::new(Utc::now()));
        let ledger = Arc::new(StockLedger::new(
            Arc::new(InMemoryReservationStore::new()),
            clock.clone(),
        ));
        let product_id = ProductId::new();
        ledger.register(Product::new(
            product_id,
            "Reloj automático".to_string(),
            "Calibre suizo, correa de cuero".to_string(),
            reserva_core::Money::from_cents(45_000_000),
            stock,
        ));
        (ledger, product_id, clock)
    }

    async fn available(ledger: &StockLedger, product_id: ProductId) -> u32 {
        ledger.available(product_id).await.unwrap().stock_disponible
    }

    #[tokio::test]
    async fn reserve_decrements_and_release_restores() {
        let (ledger, product_id, _clock) = ledger_with_stock(5);
        let user = UserId::new();

        let r1 = ledger
            .reserve(product_id, user, 3, HoldDuration::DEFAULT)
            .await
            .unwrap();
        assert_eq!(available(&ledger, product_id).await, 2);

        // Second shopper wants 3 but only 2 remain.
        let err = ledger
            .reserve(product_id, UserId::new(), 3, HoldDuration::DEFAULT)
            .await
            .unwrap_err();
        assert_eq!(
            err,
            ReservationError::InsufficientStock {
                requested: 3,
                available: 2
            }
        );

        // The same shopper takes the remaining 2.
        let r2 = ledger
            .reserve(product_id, UserId::new(), 2, HoldDuration::DEFAULT)
            .await
            .unwrap();
        assert_eq!(available(&ledger, product_id).await, 0);

        // A cancels; only A's quantity comes back, B is unaffected.
        ledger.release(r1.id, ReleaseCause::Cancelled).await.unwrap();
        assert_eq!(available(&ledger, product_id).await, 3);
        assert!(
            ledger.commit(r2.id).await.is_ok(),
            "other hold must still be Active"
        );
    }

    #[tokio::test]
    async fn commit_does_not_return_stock() {
        let (ledger, product_id, _clock) = ledger_with_stock(4);
        let r = ledger
            .reserve(product_id, UserId::new(), 3, HoldDuration::DEFAULT)
            .await
            .unwrap();
        ledger.commit(r.id).await.unwrap();
        assert_eq!(available(&ledger, product_id).await, 1);
    }

    #[tokio::test]
    async fn release_credits_exactly_once() {
        let (ledger, product_id, _clock) = ledger_with_stock(5);
        let r = ledger
            .reserve(product_id, UserId::new(), 2, HoldDuration::DEFAULT)
            .await
            .unwrap();

        ledger.release(r.id, ReleaseCause::Cancelled).await.unwrap();
        // Client retry of the same cancel must not double-credit.
        let err = ledger
            .release(r.id, ReleaseCause::Cancelled)
            .await
            .unwrap_err();
        assert!(matches!(err, ReservationError::InvalidTransition { .. }));
        assert_eq!(available(&ledger, product_id).await, 5);
    }

    #[tokio::test]
    async fn overdue_hold_is_reported_available_and_reclaimed_lazily() {
        let (ledger, product_id, clock) = ledger_with_stock(5);
        let r = ledger
            .reserve(product_id, UserId::new(), 4, HoldDuration::from_minutes(1))
            .await
            .unwrap();
        assert_eq!(available(&ledger, product_id).await, 1);

        clock.advance(Duration::seconds(61));

        // Read reflects the overdue hold as available without mutating.
        assert_eq!(available(&ledger, product_id).await, 5);

        // The next mutating call records the expiry, so confirm is rejected.
        let err = ledger.commit(r.id).await.unwrap_err();
        assert_eq!(
            err,
            ReservationError::InvalidTransition {
                id: r.id,
                status: ReservationStatus::Expired
            }
        );
        assert_eq!(available(&ledger, product_id).await, 5);
    }

    #[tokio::test]
    async fn sweep_expires_overdue_holds() {
        let (ledger, product_id, clock) = ledger_with_stock(6);
        ledger
            .reserve(product_id, UserId::new(), 2, HoldDuration::from_minutes(1))
            .await
            .unwrap();
        let long = ledger
            .reserve(product_id, UserId::new(), 1, HoldDuration::from_minutes(30))
            .await
            .unwrap();

        clock.advance(Duration::minutes(2));
        let expired = ledger.sweep().await.unwrap();
        assert_eq!(expired, 1);
        assert_eq!(available(&ledger, product_id).await, 5);

        // Sweeping again finds nothing — release symmetry.
        assert_eq!(ledger.sweep().await.unwrap(), 0);
        assert!(ledger.commit(long.id).await.is_ok());
    }

    #[tokio::test]
    async fn concurrent_reserves_never_oversell() {
        let (ledger, product_id, _clock) = ledger_with_stock(10);

        let mut handles = Vec::new();
        for _ in 0..20 {
            let ledger = ledger.clone();
            handles.push(tokio::spawn(async move {
                ledger
                    .reserve(product_id, UserId::new(), 1, HoldDuration::DEFAULT)
                    .await
            }));
        }

        let mut granted = 0;
        let mut rejected = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => granted += 1,
                Err(ReservationError::InsufficientStock { .. }) => rejected += 1,
                Err(other) => panic!("unexpected error: {other}"),
            }
        }

        // Exactly enough successes to exhaust stock, never negative.
        assert_eq!(granted, 10);
        assert_eq!(rejected, 10);
        assert_eq!(available(&ledger, product_id).await, 0);
    }

    #[tokio::test]
    async fn unknown_ids_are_not_found() {
        let (ledger, _product_id, _clock) = ledger_with_stock(1);
        assert!(matches!(
            ledger.available(ProductId::new()).await.unwrap_err(),
            ReservationError::ProductNotFound(_)
        ));
        assert!(matches!(
            ledger.commit(ReservationId::new()).await.unwrap_err(),
            ReservationError::ReservationNotFound(_)
        ));
    }
}
