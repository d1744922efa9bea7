//! Stock availability query endpoint.
//!
//! Read-only: returns the ledger's snapshot of a product's available
//! quantity. Clients must always render this number rather than arithmetic
//! over cached values — other shoppers may hold stock concurrently.

use crate::api::error::ApiError;
use crate::api::AppState;
use axum::{
    Json,
    extract::{Path, State},
};
use reserva_core::{ProductId, StockSnapshot};
use uuid::Uuid;

/// Get the availability snapshot for a product.
///
/// Public endpoint.
///
/// # Example
///
/// ```bash
/// curl http://localhost:4000/products/550e8400-e29b-41d4-a716-446655440000/stock
/// ```
///
/// Response:
/// ```json
/// {
///   "product_id": "550e8400-e29b-41d4-a716-446655440000",
///   "stock_disponible": 5
/// }
/// ```
///
/// # Errors
///
/// `404` when the product id is unknown.
pub async fn get_product_stock(
    Path(product_id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<Json<StockSnapshot>, ApiError> {
    let snapshot = state
        .service
        .stock(ProductId::from_uuid(product_id))
        .await?;
    Ok(Json(snapshot))
}
