//! Shared domain for the product reservation subsystem.
//!
//! A reservation is a time-limited hold on product stock: the available
//! quantity is decremented the moment the hold is granted, and returned to
//! the pool when the hold is cancelled or expires. Confirming a hold converts
//! it into a sale without touching the pool again.
//!
//! # State machine
//!
//! ```text
//! create ──▶ Active ──confirm──▶ Confirmed
//!               │
//!               ├──cancel───▶ Cancelled   (stock returned)
//!               └──expire───▶ Expired     (stock returned)
//! ```
//!
//! All three non-initial states are terminal; no transition leaves them.
//! The server is the authority for every transition — clients may display a
//! local countdown, but only the server's clock moves a reservation to
//! `Expired`.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod clock;
pub mod error;
pub mod types;

pub use clock::{Clock, FixedClock, SystemClock};
pub use error::ReservationError;
pub use types::{
    HoldDuration, HoldExpiry, Money, Product, ProductId, Reservation, ReservationId,
    ReservationStatus, StockSnapshot, UserId,
};
