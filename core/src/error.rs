//! Error taxonomy for the reservation subsystem.
//!
//! Every failure a ledger or service operation can report, as typed variants
//! rather than stringly errors. The wire-level `code()` is shared by the
//! server's error responses and the client's decoding.

use crate::types::{ProductId, ReservationId, ReservationStatus};
use thiserror::Error;

/// Failures reported by the stock ledger and reservation service.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReservationError {
    /// Requested quantity exceeds the currently available stock.
    ///
    /// Reported to the caller, never retried; the client should refresh its
    /// stock display.
    #[error("insufficient stock: requested {requested}, available {available}")]
    InsufficientStock {
        /// Quantity the caller asked for
        requested: u32,
        /// Quantity actually available at the time of the call
        available: u32,
    },

    /// Mutating call against a reservation that is no longer Active.
    ///
    /// Signals a stale client view (someone else — or the clock — already
    /// acted). Callers must refresh state rather than retry.
    #[error("reservation {id} is {status}, no further transition accepted")]
    InvalidTransition {
        /// Reservation the call targeted
        id: ReservationId,
        /// Terminal state it is already in
        status: ReservationStatus,
    },

    /// Product id unknown to the ledger.
    #[error("product {0} not found")]
    ProductNotFound(ProductId),

    /// Reservation id unknown to the store.
    #[error("reservation {0} not found")]
    ReservationNotFound(ReservationId),

    /// Quantity is zero or above the per-order cap.
    #[error("invalid quantity {requested} (must be between 1 and {max})")]
    InvalidQuantity {
        /// Quantity the caller asked for
        requested: u32,
        /// Per-order maximum
        max: u32,
    },

    /// Caller is not the owner of the reservation.
    #[error("reservation belongs to another user")]
    Forbidden,

    /// The backing store failed.
    #[error("storage failure: {0}")]
    Storage(String),
}

impl ReservationError {
    /// Stable machine-readable code carried in error responses.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InsufficientStock { .. } => "INSUFFICIENT_STOCK",
            Self::InvalidTransition { .. } => "INVALID_TRANSITION",
            Self::ProductNotFound(_) => "PRODUCT_NOT_FOUND",
            Self::ReservationNotFound(_) => "RESERVATION_NOT_FOUND",
            Self::InvalidQuantity { .. } => "INVALID_QUANTITY",
            Self::Forbidden => "FORBIDDEN",
            Self::Storage(_) => "STORAGE",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_stable() {
        let err = ReservationError::InsufficientStock {
            requested: 3,
            available: 2,
        };
        assert_eq!(err.code(), "INSUFFICIENT_STOCK");
        assert_eq!(
            err.to_string(),
            "insufficient stock: requested 3, available 2"
        );

        let err = ReservationError::InvalidTransition {
            id: ReservationId::new(),
            status: ReservationStatus::Expired,
        };
        assert_eq!(err.code(), "INVALID_TRANSITION");
    }
}
