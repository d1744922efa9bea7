//! Reservation lifecycle endpoints.
//!
//! The hold flow:
//!
//! 1. **Create**: POST with quantity (stock decremented immediately, expiry
//!    timer starts server-side)
//! 2. **Confirm**: converts the hold to a sale within the hold window
//! 3. **Cancel**: returns the stock to the pool
//! 4. **Expiry**: time-driven; a late confirm/cancel gets `INVALID_TRANSITION`
//!
//! Every mutating endpoint requires a bearer token; confirm and cancel
//! additionally require that the caller owns the reservation.

use crate::api::error::ApiError;
use crate::api::AppState;
use crate::auth::AuthUser;
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use reserva_core::{HoldDuration, ProductId, Reservation, ReservationId, ReservationStatus};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request to place a hold on a product.
#[derive(Debug, Deserialize)]
pub struct CreateReservationRequest {
    /// Units to hold (1 ..= per-order cap)
    pub quantity: u32,
    /// Requested hold lifetime in minutes (defaults to 30, clamped server-side)
    pub hold_minutes: Option<u32>,
}

/// Response after placing a hold.
#[derive(Debug, Serialize, Deserialize)]
pub struct CreateReservationResponse {
    /// The created reservation
    pub reservation: Reservation,
    /// Message for the user
    pub message: String,
}

/// Response after a confirm or cancel.
#[derive(Debug, Serialize, Deserialize)]
pub struct TransitionResponse {
    /// Reservation ID
    pub reservation_id: ReservationId,
    /// Status after the transition
    pub status: ReservationStatus,
    /// Message for the user
    pub message: String,
}

/// Response listing the caller's active holds.
#[derive(Debug, Serialize, Deserialize)]
pub struct ListReservationsResponse {
    /// Active reservations, most recent first
    pub reservations: Vec<Reservation>,
    /// Total count
    pub total: usize,
}

// ============================================================================
// Handlers
// ============================================================================

/// Place a hold on a product.
///
/// Requires authentication. Atomically checks availability, decrements the
/// pool and starts the expiry timer. The response carries the server-issued
/// expiry timestamp the client derives its countdown from.
///
/// # Example
///
/// ```bash
/// curl -X POST http://localhost:4000/reservations/products/<product_id> \
///   -H "Authorization: Bearer <token>" \
///   -H "Content-Type: application/json" \
///   -d '{ "quantity": 2, "hold_minutes": 30 }'
/// ```
///
/// # Errors
///
/// `409 INSUFFICIENT_STOCK` when the pool cannot cover the quantity,
/// `400 INVALID_QUANTITY` for zero or over-cap quantities, `404` for an
/// unknown product.
pub async fn create_reservation(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(product_id): Path<Uuid>,
    Json(request): Json<CreateReservationRequest>,
) -> Result<(StatusCode, Json<CreateReservationResponse>), ApiError> {
    let hold = request.hold_minutes.map(HoldDuration::from_minutes);
    let reservation = state
        .service
        .create(
            auth.user_id,
            ProductId::from_uuid(product_id),
            request.quantity,
            hold,
        )
        .await?;

    let message = format!(
        "Reservation created. Confirm before {} or the stock returns to the pool.",
        reservation.expires_at
    );
    Ok((
        StatusCode::CREATED,
        Json(CreateReservationResponse {
            reservation,
            message,
        }),
    ))
}

/// Confirm a hold, converting it to a sale.
///
/// Requires authentication and ownership. Confirming an expired or already
/// terminal hold returns `409 INVALID_TRANSITION` — the client must refresh
/// its view rather than retry.
///
/// # Errors
///
/// `409 INVALID_TRANSITION`, `403 FORBIDDEN`, `404 RESERVATION_NOT_FOUND`.
pub async fn confirm_reservation(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(reservation_id): Path<Uuid>,
) -> Result<Json<TransitionResponse>, ApiError> {
    let reservation = state
        .service
        .confirm(auth.user_id, ReservationId::from_uuid(reservation_id))
        .await?;
    Ok(Json(TransitionResponse {
        reservation_id: reservation.id,
        status: reservation.status,
        message: "Reservation confirmed. Proceed to payment.".to_string(),
    }))
}

/// Cancel a hold, returning its stock to the pool.
///
/// Requires authentication and ownership.
///
/// # Errors
///
/// `409 INVALID_TRANSITION`, `403 FORBIDDEN`, `404 RESERVATION_NOT_FOUND`.
pub async fn cancel_reservation(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(reservation_id): Path<Uuid>,
) -> Result<Json<TransitionResponse>, ApiError> {
    let reservation = state
        .service
        .cancel(auth.user_id, ReservationId::from_uuid(reservation_id))
        .await?;
    Ok(Json(TransitionResponse {
        reservation_id: reservation.id,
        status: reservation.status,
        message: "Reservation cancelled. Stock returned to the pool.".to_string(),
    }))
}

/// List the caller's active holds.
///
/// Requires authentication.
///
/// # Errors
///
/// `500` on a storage failure.
pub async fn list_active_reservations(
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<ListReservationsResponse>, ApiError> {
    let reservations = state.service.active_for(auth.user_id).await?;
    let total = reservations.len();
    Ok(Json(ListReservationsResponse {
        reservations,
        total,
    }))
}
