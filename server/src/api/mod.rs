//! HTTP API surface.
//!
//! Route map:
//! - `GET    /health` — liveness probe
//! - `GET    /products/:id/stock` — availability snapshot (public)
//! - `POST   /reservations/products/:id` — place a hold (auth)
//! - `POST   /reservations/:id/confirm` — convert a hold to a sale (auth + ownership)
//! - `DELETE /reservations/:id` — cancel a hold (auth + ownership)
//! - `GET    /reservations` — the caller's active holds (auth)

pub mod availability;
pub mod error;
pub mod reservations;

use crate::service::ReservationService;
use axum::{
    Json, Router,
    routing::{delete, get, post},
};
use serde::Serialize;
use std::sync::Arc;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    /// The reservation state machine
    pub service: Arc<ReservationService>,
}

/// Health check response.
#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

/// Builds the application router over the given service.
#[must_use]
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/products/:id/stock", get(availability::get_product_stock))
        .route(
            "/reservations/products/:id",
            post(reservations::create_reservation),
        )
        .route(
            "/reservations/:id/confirm",
            post(reservations::confirm_reservation),
        )
        .route("/reservations/:id", delete(reservations::cancel_reservation))
        .route("/reservations", get(reservations::list_active_reservations))
        .with_state(state)
}
