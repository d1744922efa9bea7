//! Reservation persistence contract.
//!
//! The ledger talks to reservations through [`ReservationStore`] so a
//! relational backend can be slotted in without touching the arithmetic. The
//! shipped implementation is in-memory; all writes happen under the owning
//! product's ledger lock, which is what makes the plain update calls
//! race-free.

use async_trait::async_trait;
use reserva_core::{ProductId, Reservation, ReservationId, ReservationStatus, UserId};
use std::collections::HashMap;
use std::sync::RwLock;
use thiserror::Error;

/// Failure of the backing store itself (not a domain rejection).
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store backend is unavailable or returned an inconsistent result.
    #[error("reservation store failure: {0}")]
    Backend(String),
}

impl From<StoreError> for reserva_core::ReservationError {
    fn from(err: StoreError) -> Self {
        Self::Storage(err.to_string())
    }
}

/// Persisted reservation records.
///
/// Reservations are never physically deleted — they only reach a terminal
/// status.
#[async_trait]
pub trait ReservationStore: Send + Sync {
    /// Persists a freshly created (Active) reservation.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the backend rejects the write.
    async fn insert(&self, reservation: Reservation) -> Result<(), StoreError>;

    /// Fetches a reservation by id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the backend query fails.
    async fn get(&self, id: ReservationId) -> Result<Option<Reservation>, StoreError>;

    /// Records a status transition.
    ///
    /// The caller is responsible for state machine legality; the store only
    /// persists what it is told, under the product's ledger lock.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the id is unknown or the write fails.
    async fn set_status(
        &self,
        id: ReservationId,
        status: ReservationStatus,
    ) -> Result<(), StoreError>;

    /// All Active reservations against a product.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the backend query fails.
    async fn active_for_product(
        &self,
        product_id: ProductId,
    ) -> Result<Vec<Reservation>, StoreError>;

    /// All Active reservations owned by a user, most recent first.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the backend query fails.
    async fn active_for_user(&self, user_id: UserId) -> Result<Vec<Reservation>, StoreError>;
}

/// In-memory store used in production for the demo catalog and in tests.
#[derive(Debug, Default)]
pub struct InMemoryReservationStore {
    reservations: RwLock<HashMap<ReservationId, Reservation>>,
}

impl InMemoryReservationStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn read(
        &self,
    ) -> Result<std::sync::RwLockReadGuard<'_, HashMap<ReservationId, Reservation>>, StoreError>
    {
        self.reservations
            .read()
            .map_err(|_| StoreError::Backend("store lock poisoned".to_string()))
    }

    fn write(
        &self,
    ) -> Result<std::sync::RwLockWriteGuard<'_, HashMap<ReservationId, Reservation>>, StoreError>
    {
        self.reservations
            .write()
            .map_err(|_| StoreError::Backend("store lock poisoned".to_string()))
    }
}

#[async_trait]
impl ReservationStore for InMemoryReservationStore {
    async fn insert(&self, reservation: Reservation) -> Result<(), StoreError> {
        self.write()?.insert(reservation.id, reservation);
        Ok(())
    }

    async fn get(&self, id: ReservationId) -> Result<Option<Reservation>, StoreError> {
        Ok(self.read()?.get(&id).cloned())
    }

    async fn set_status(
        &self,
        id: ReservationId,
        status: ReservationStatus,
    ) -> Result<(), StoreError> {
        let mut reservations = self.write()?;
        let reservation = reservations
            .get_mut(&id)
            .ok_or_else(|| StoreError::Backend(format!("unknown reservation {id}")))?;
        reservation.status = status;
        Ok(())
    }

    async fn active_for_product(
        &self,
        product_id: ProductId,
    ) -> Result<Vec<Reservation>, StoreError> {
        Ok(self
            .read()?
            .values()
            .filter(|r| r.product_id == product_id && r.status.is_active())
            .cloned()
            .collect())
    }

    async fn active_for_user(&self, user_id: UserId) -> Result<Vec<Reservation>, StoreError> {
        let mut owned: Vec<Reservation> = self
            .read()?
            .values()
            .filter(|r| r.user_id == user_id && r.status.is_active())
            .cloned()
            .collect();
        owned.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(owned)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use reserva_core::HoldDuration;

    fn reservation_for(product_id: ProductId, user_id: UserId) -> Reservation {
        Reservation::new(
            ReservationId::new(),
            product_id,
            user_id,
            2,
            Utc::now(),
            HoldDuration::DEFAULT,
        )
    }

    #[tokio::test]
    async fn insert_then_get_round_trips() {
        let store = InMemoryReservationStore::new();
        let reservation = reservation_for(ProductId::new(), UserId::new());

        store.insert(reservation.clone()).await.unwrap();
        let fetched = store.get(reservation.id).await.unwrap();
        assert_eq!(fetched, Some(reservation));
    }

    #[tokio::test]
    async fn terminal_reservations_leave_active_listings() {
        let store = InMemoryReservationStore::new();
        let product_id = ProductId::new();
        let user_id = UserId::new();
        let reservation = reservation_for(product_id, user_id);
        store.insert(reservation.clone()).await.unwrap();

        assert_eq!(
            store.active_for_product(product_id).await.unwrap().len(),
            1
        );
        assert_eq!(store.active_for_user(user_id).await.unwrap().len(), 1);

        store
            .set_status(reservation.id, ReservationStatus::Cancelled)
            .await
            .unwrap();

        assert!(store.active_for_product(product_id).await.unwrap().is_empty());
        assert!(store.active_for_user(user_id).await.unwrap().is_empty());
        // The record itself survives — terminal, not deleted.
        let fetched = store.get(reservation.id).await.unwrap().unwrap();
        assert_eq!(fetched.status, ReservationStatus::Cancelled);
    }

    #[tokio::test]
    async fn set_status_on_unknown_id_is_a_backend_error() {
        let store = InMemoryReservationStore::new();
        let result = store
            .set_status(ReservationId::new(), ReservationStatus::Expired)
            .await;
        assert!(result.is_err());
    }
}
