//! Domain types for the product reservation subsystem.
//!
//! Value objects and entities shared by the server (ledger, store, service)
//! and the client sync component. The `stock` field of a [`Product`] is the
//! authoritative available quantity; it is only ever mutated through the
//! ledger's reserve/release/commit operations.

use crate::error::ReservationError;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// ============================================================================
// Identifiers
// ============================================================================

/// Unique identifier for a product
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProductId(Uuid);

impl ProductId {
    /// Creates a new random `ProductId`
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a `ProductId` from a `Uuid`
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for ProductId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a reservation
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReservationId(Uuid);

impl ReservationId {
    /// Creates a new random `ReservationId`
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a `ReservationId` from a `Uuid`
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for ReservationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ReservationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for the user owning a reservation
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(Uuid);

impl UserId {
    /// Creates a new random `UserId`
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a `UserId` from a `Uuid`
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Money Value Object (cents-based to avoid floating point errors)
// ============================================================================

/// Represents money in cents to avoid floating-point arithmetic errors
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Money(u64);

impl Money {
    /// Creates a `Money` value from cents
    #[must_use]
    pub const fn from_cents(cents: u64) -> Self {
        Self(cents)
    }

    /// Creates a `Money` value from whole currency units with overflow checking
    #[must_use]
    pub const fn checked_from_units(units: u64) -> Option<Self> {
        match units.checked_mul(100) {
            Some(cents) => Some(Self(cents)),
            None => None,
        }
    }

    /// Returns the amount in cents
    #[must_use]
    pub const fn cents(&self) -> u64 {
        self.0
    }

    /// Checks if the amount is zero
    #[must_use]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Adds two money amounts with overflow checking
    #[must_use]
    pub const fn checked_add(self, other: Self) -> Option<Self> {
        match self.0.checked_add(other.0) {
            Some(result) => Some(Self(result)),
            None => None,
        }
    }

    /// Multiplies money by a quantity with overflow checking
    #[must_use]
    pub const fn checked_multiply(self, quantity: u32) -> Option<Self> {
        match self.0.checked_mul(quantity as u64) {
            Some(result) => Some(Self(result)),
            None => None,
        }
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${}.{:02}", self.0 / 100, self.0 % 100)
    }
}

// ============================================================================
// Time Value Objects
// ============================================================================

/// Lifetime of a hold, in minutes.
///
/// Default is 30 minutes. Callers may request a different lifetime at
/// creation time; the service clamps it against a configured maximum. A hold
/// is never renewable — there is no "extend" operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct HoldDuration(u32);

impl HoldDuration {
    /// The default hold lifetime (30 minutes).
    pub const DEFAULT: Self = Self(30);

    /// Creates a hold duration of `minutes`.
    #[must_use]
    pub const fn from_minutes(minutes: u32) -> Self {
        Self(minutes)
    }

    /// Returns the duration in minutes.
    #[must_use]
    pub const fn minutes(&self) -> u32 {
        self.0
    }

    /// Returns the duration as a `chrono::Duration`.
    #[must_use]
    pub fn as_duration(&self) -> Duration {
        Duration::minutes(i64::from(self.0))
    }

    /// Clamps this duration to `max`, keeping whichever is shorter.
    #[must_use]
    pub fn clamp_to(self, max: Self) -> Self {
        if self.0 > max.0 { max } else { self }
    }
}

impl Default for HoldDuration {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl fmt::Display for HoldDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}m", self.0)
    }
}

/// Wrapper for the hold deadline with ordering and comparison
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct HoldExpiry(DateTime<Utc>);

impl HoldExpiry {
    /// Creates a new `HoldExpiry`
    #[must_use]
    pub const fn new(expiry: DateTime<Utc>) -> Self {
        Self(expiry)
    }

    /// Returns the inner `DateTime`
    #[must_use]
    pub const fn inner(&self) -> DateTime<Utc> {
        self.0
    }

    /// Checks if the deadline has passed
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.0
    }

    /// Time remaining until the deadline, `None` once it has passed.
    #[must_use]
    pub fn remaining(&self, now: DateTime<Utc>) -> Option<Duration> {
        if self.is_expired(now) {
            None
        } else {
            Some(self.0 - now)
        }
    }
}

impl fmt::Display for HoldExpiry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d %H:%M:%S UTC"))
    }
}

// ============================================================================
// Domain Entities
// ============================================================================

/// Product entity from the catalog.
///
/// `stock` is the authoritative available quantity — units not currently held
/// by any Active reservation. It never goes negative by construction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    /// Unique product identifier
    pub id: ProductId,
    /// Display name
    pub name: String,
    /// Description shown in the catalog
    pub description: String,
    /// Unit price
    pub price: Money,
    /// Available quantity (not currently reserved or sold)
    pub stock: u32,
}

impl Product {
    /// Creates a new `Product`
    #[must_use]
    pub const fn new(
        id: ProductId,
        name: String,
        description: String,
        price: Money,
        stock: u32,
    ) -> Self {
        Self {
            id,
            name,
            description,
            price,
            stock,
        }
    }
}

/// Reservation lifecycle state.
///
/// `Active` is the only state holding stock; the other three are terminal
/// and never transition again.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReservationStatus {
    /// Hold granted, stock decremented, awaiting confirm/cancel/expiry
    Active,
    /// Converted to a sale; stock permanently consumed
    Confirmed,
    /// User backed out; stock returned to the pool
    Cancelled,
    /// Deadline reached; stock returned to the pool
    Expired,
}

impl ReservationStatus {
    /// Whether the reservation still holds stock.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        matches!(self, Self::Active)
    }

    /// Whether the state is terminal (no further transitions accepted).
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        !self.is_active()
    }
}

impl fmt::Display for ReservationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Active => "active",
            Self::Confirmed => "confirmed",
            Self::Cancelled => "cancelled",
            Self::Expired => "expired",
        };
        write!(f, "{label}")
    }
}

/// A time-limited hold on product stock.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reservation {
    /// Unique reservation identifier
    pub id: ReservationId,
    /// Product being held
    pub product_id: ProductId,
    /// User owning the hold
    pub user_id: UserId,
    /// Quantity held (always > 0)
    pub quantity: u32,
    /// Current lifecycle state
    pub status: ReservationStatus,
    /// When the hold was created
    pub created_at: DateTime<Utc>,
    /// When the hold expires (`created_at` + hold duration)
    pub expires_at: HoldExpiry,
}

impl Reservation {
    /// Creates a new Active `Reservation` with `expires_at = created_at + hold`.
    #[must_use]
    pub fn new(
        id: ReservationId,
        product_id: ProductId,
        user_id: UserId,
        quantity: u32,
        created_at: DateTime<Utc>,
        hold: HoldDuration,
    ) -> Self {
        Self {
            id,
            product_id,
            user_id,
            quantity,
            status: ReservationStatus::Active,
            created_at,
            expires_at: HoldExpiry::new(created_at + hold.as_duration()),
        }
    }

    /// Whether the hold is Active but past its deadline at `now`.
    ///
    /// Such a reservation is logically expired: its quantity is treated as
    /// already returned to the pool even before the terminal state is
    /// recorded.
    #[must_use]
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.status.is_active() && self.expires_at.is_expired(now)
    }

    /// Validates the state machine edge from this reservation's status.
    ///
    /// # Errors
    ///
    /// Returns [`ReservationError::InvalidTransition`] when the reservation
    /// is no longer Active — terminal states are monotonic.
    pub fn ensure_active(&self) -> Result<(), ReservationError> {
        if self.status.is_active() {
            Ok(())
        } else {
            Err(ReservationError::InvalidTransition {
                id: self.id,
                status: self.status,
            })
        }
    }
}

// ============================================================================
// Read Model
// ============================================================================

/// Snapshot of a product's available quantity at query time.
///
/// `stock_disponible` = total stock minus the quantities of all Active,
/// non-overdue reservations. This is the only representation the client sync
/// component is allowed to read; it must never derive availability from
/// cached numbers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockSnapshot {
    /// Product the snapshot describes
    pub product_id: ProductId,
    /// Available quantity at query time
    pub stock_disponible: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_terminality() {
        assert!(ReservationStatus::Active.is_active());
        assert!(!ReservationStatus::Active.is_terminal());
        for terminal in [
            ReservationStatus::Confirmed,
            ReservationStatus::Cancelled,
            ReservationStatus::Expired,
        ] {
            assert!(terminal.is_terminal());
            assert!(!terminal.is_active());
        }
    }

    #[test]
    fn reservation_expiry_derived_from_hold() {
        let created = Utc::now();
        let reservation = Reservation::new(
            ReservationId::new(),
            ProductId::new(),
            UserId::new(),
            2,
            created,
            HoldDuration::from_minutes(30),
        );

        assert_eq!(
            reservation.expires_at.inner(),
            created + Duration::minutes(30)
        );
        assert!(!reservation.is_overdue(created + Duration::minutes(29)));
        assert!(reservation.is_overdue(created + Duration::minutes(30)));
    }

    #[test]
    fn terminal_reservation_is_never_overdue() {
        let created = Utc::now();
        let mut reservation = Reservation::new(
            ReservationId::new(),
            ProductId::new(),
            UserId::new(),
            1,
            created,
            HoldDuration::from_minutes(1),
        );
        reservation.status = ReservationStatus::Cancelled;

        assert!(!reservation.is_overdue(created + Duration::hours(1)));
        assert!(reservation.ensure_active().is_err());
    }

    #[test]
    fn hold_duration_clamps() {
        let requested = HoldDuration::from_minutes(500);
        let max = HoldDuration::from_minutes(120);
        assert_eq!(requested.clamp_to(max), max);
        assert_eq!(HoldDuration::DEFAULT.clamp_to(max), HoldDuration::DEFAULT);
    }

    #[test]
    fn expiry_remaining_counts_down_to_none() {
        let now = Utc::now();
        let expiry = HoldExpiry::new(now + Duration::seconds(90));

        assert_eq!(expiry.remaining(now), Some(Duration::seconds(90)));
        assert_eq!(
            expiry.remaining(now + Duration::seconds(89)),
            Some(Duration::seconds(1))
        );
        assert_eq!(expiry.remaining(now + Duration::seconds(90)), None);
    }

    #[test]
    fn money_display_in_cents() {
        assert_eq!(Money::from_cents(125_000).to_string(), "$1250.00");
        assert_eq!(
            Money::checked_from_units(45),
            Some(Money::from_cents(4500))
        );
    }
}
