//! Client sync component for the reservation service.
//!
//! Keeps a storefront page honest about stock and hold state:
//!
//! - [`api::HttpReservationApi`] speaks the five REST endpoints;
//! - [`watcher::ProductWatcher`] polls availability, runs the 1 s hold
//!   countdown and guards against double submissions;
//! - [`notify`] maps lifecycle events and failures to auto-dismissing
//!   notifications;
//! - [`countdown`] formats the server-issued deadline for display.
//!
//! The client never computes availability itself. Every displayed number is
//! a fresh [`reserva_core::StockSnapshot`], and the countdown is advisory:
//! only the server decides whether a hold is still confirmable.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod api;
pub mod countdown;
pub mod notify;
pub mod watcher;

pub use api::{ClientError, HttpReservationApi, ReservationBackend};
pub use notify::{Notification, NotificationKind, Severity};
pub use watcher::{ProductWatcher, WatchError, WatcherConfig};
