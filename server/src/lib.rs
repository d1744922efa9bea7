//! Reservation server — timed stock holds for a storefront catalog.
//!
//! The one piece of this storefront with real engineering in it: shoppers
//! place a time-limited hold on product stock, watch a countdown, and either
//! confirm (sale) or let the hold lapse (stock returns to the pool).
//!
//! # Architecture
//!
//! ```text
//!  Client ──HTTP──▶ api ──▶ ReservationService ──▶ StockLedger ──▶ ReservationStore
//!                              (state machine)      (per-product      (persistence
//!                                                    mutex, the        contract)
//!                                                    critical section)
//!                                     ▲
//!                               Sweeper (60 s)
//! ```
//!
//! The ledger is the single owner of the available-quantity counter; the
//! check-and-decrement in [`ledger::StockLedger::reserve`] is the only
//! concurrency-critical operation in the codebase. Expiry is detected lazily
//! on every mutating call and reclaimed periodically by the sweeper; both
//! paths share the same idempotent Active→Expired edge.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod api;
pub mod auth;
pub mod config;
pub mod ledger;
pub mod service;
pub mod store;
pub mod sweeper;

pub use api::{AppState, build_router};
pub use config::Config;
pub use ledger::{ReleaseCause, StockLedger};
pub use service::{ReservationPolicy, ReservationService};
pub use store::{InMemoryReservationStore, ReservationStore, StoreError};
pub use sweeper::Sweeper;
