//! Reservation service — the state machine façade the API calls.
//!
//! Validates requests (quantity cap, hold clamp, ownership) and drives the
//! ledger:
//!
//! | From   | Event              | To        | Side effect      |
//! |--------|--------------------|-----------|------------------|
//! | —      | create(qty)        | Active    | `Ledger::reserve` |
//! | Active | confirm            | Confirmed | `Ledger::commit`  |
//! | Active | cancel (user)      | Cancelled | `Ledger::release` |
//! | Active | expire (deadline)  | Expired   | `Ledger::release` |
//!
//! Every operation takes the acting user explicitly — there is no ambient
//! session state anywhere in the subsystem.

use crate::ledger::{ReleaseCause, StockLedger};
use crate::store::ReservationStore;
use reserva_core::{
    HoldDuration, ProductId, Reservation, ReservationError, ReservationId, StockSnapshot, UserId,
};
use std::sync::Arc;

/// Validation policy applied before the ledger is touched.
#[derive(Clone, Copy, Debug)]
pub struct ReservationPolicy {
    /// Hold applied when the caller does not request one.
    pub default_hold: HoldDuration,
    /// Upper bound on caller-requested holds.
    pub max_hold: HoldDuration,
    /// Per-order quantity cap.
    pub max_per_order: u32,
}

impl Default for ReservationPolicy {
    fn default() -> Self {
        Self {
            default_hold: HoldDuration::DEFAULT,
            max_hold: HoldDuration::from_minutes(120),
            max_per_order: 10,
        }
    }
}

/// The reservation state machine over a [`StockLedger`].
pub struct ReservationService {
    ledger: Arc<StockLedger>,
    store: Arc<dyn ReservationStore>,
    policy: ReservationPolicy,
}

impl ReservationService {
    /// Creates a service over the given ledger and store.
    #[must_use]
    pub fn new(
        ledger: Arc<StockLedger>,
        store: Arc<dyn ReservationStore>,
        policy: ReservationPolicy,
    ) -> Self {
        Self {
            ledger,
            store,
            policy,
        }
    }

    /// The validation policy in effect.
    #[must_use]
    pub const fn policy(&self) -> ReservationPolicy {
        self.policy
    }

    /// Read-only availability snapshot for a product.
    ///
    /// # Errors
    ///
    /// [`ReservationError::ProductNotFound`] or a storage failure.
    pub async fn stock(&self, product_id: ProductId) -> Result<StockSnapshot, ReservationError> {
        self.ledger.available(product_id).await
    }

    /// Places a hold for `user_id`: Active reservation, stock decremented.
    ///
    /// The requested hold is clamped to the policy maximum; a missing hold
    /// request falls back to the default (30 minutes).
    ///
    /// # Errors
    ///
    /// [`ReservationError::InvalidQuantity`] when `quantity` is zero or over
    /// the per-order cap, [`ReservationError::InsufficientStock`] when the
    /// pool cannot cover it, [`ReservationError::ProductNotFound`], or a
    /// storage failure.
    pub async fn create(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity: u32,
        hold: Option<HoldDuration>,
    ) -> Result<Reservation, ReservationError> {
        if quantity == 0 || quantity > self.policy.max_per_order {
            return Err(ReservationError::InvalidQuantity {
                requested: quantity,
                max: self.policy.max_per_order,
            });
        }
        let hold = hold
            .unwrap_or(self.policy.default_hold)
            .clamp_to(self.policy.max_hold);
        self.ledger.reserve(product_id, user_id, quantity, hold).await
    }

    /// Confirms the caller's Active hold, converting it to a sale.
    ///
    /// # Errors
    ///
    /// [`ReservationError::Forbidden`] when the caller does not own the
    /// reservation, [`ReservationError::InvalidTransition`] when it is no
    /// longer Active (a past-deadline hold is expired first, so a late
    /// confirm observes `Expired`), [`ReservationError::ReservationNotFound`],
    /// or a storage failure.
    pub async fn confirm(
        &self,
        user_id: UserId,
        reservation_id: ReservationId,
    ) -> Result<Reservation, ReservationError> {
        self.ensure_owner(user_id, reservation_id).await?;
        self.ledger.commit(reservation_id).await
    }

    /// Cancels the caller's Active hold, returning its stock to the pool.
    ///
    /// # Errors
    ///
    /// Same taxonomy as [`confirm`](Self::confirm); a retried cancel gets
    /// `InvalidTransition`, never a double credit.
    pub async fn cancel(
        &self,
        user_id: UserId,
        reservation_id: ReservationId,
    ) -> Result<Reservation, ReservationError> {
        self.ensure_owner(user_id, reservation_id).await?;
        self.ledger.release(reservation_id, ReleaseCause::Cancelled).await
    }

    /// The caller's Active reservations, most recent first.
    ///
    /// Holds already past their deadline are filtered out — they no longer
    /// hold stock even if the terminal state is not yet recorded. The filter
    /// uses the ledger's clock, so this listing and the stock snapshot always
    /// agree on which holds are overdue.
    ///
    /// # Errors
    ///
    /// Returns a storage failure if the store query fails.
    pub async fn active_for(&self, user_id: UserId) -> Result<Vec<Reservation>, ReservationError> {
        let now = self.ledger.now();
        let active = self.store.active_for_user(user_id).await?;
        Ok(active.into_iter().filter(|r| !r.is_overdue(now)).collect())
    }

    async fn ensure_owner(
        &self,
        user_id: UserId,
        reservation_id: ReservationId,
    ) -> Result<(), ReservationError> {
        let reservation = self
            .store
            .get(reservation_id)
            .await?
            .ok_or(ReservationError::ReservationNotFound(reservation_id))?;
        if reservation.user_id == user_id {
            Ok(())
        } else {
            Err(ReservationError::Forbidden)
        }
    }
}
