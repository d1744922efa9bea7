//! HTTP client for the reservation API.
//!
//! The watcher talks to the server exclusively through the
//! [`ReservationBackend`] trait so tests can swap in an in-memory fake.
//! [`HttpReservationApi`] is the production implementation over reqwest.
//!
//! Every mutating call takes the bearer token explicitly. There is no
//! ambient session: the caller decides which identity acts.

use async_trait::async_trait;
use reserva_core::{ProductId, Reservation, ReservationId, ReservationStatus, StockSnapshot};
use serde::Deserialize;
use tracing::debug;

/// Errors surfaced by the API client.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The server rejected the request with a structured error body.
    #[error("{code}: {message} (HTTP {status})")]
    Api {
        /// HTTP status code
        status: u16,
        /// Machine-readable error code, e.g. `INSUFFICIENT_STOCK`
        code: String,
        /// Human-readable message
        message: String,
    },
    /// Transport or decoding failure.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

impl ClientError {
    /// The machine-readable error code, when the server provided one.
    #[must_use]
    pub fn code(&self) -> Option<&str> {
        match self {
            Self::Api { code, .. } => Some(code),
            Self::Transport(_) => None,
        }
    }
}

/// Wire shape of the server's error body.
#[derive(Debug, Deserialize)]
struct WireError {
    code: String,
    message: String,
}

#[derive(Debug, Deserialize)]
struct CreateReservationBody {
    reservation: Reservation,
}

#[derive(Debug, Deserialize)]
struct TransitionBody {
    status: ReservationStatus,
}

#[derive(Debug, Deserialize)]
struct ListReservationsBody {
    reservations: Vec<Reservation>,
}

/// The five reservation endpoints, as the watcher consumes them.
#[async_trait]
pub trait ReservationBackend: Send + Sync {
    /// Availability snapshot for a product. Public, no token.
    async fn stock(&self, product_id: ProductId) -> Result<StockSnapshot, ClientError>;

    /// Places a hold. `hold_minutes` of `None` uses the server default.
    async fn reserve(
        &self,
        token: &str,
        product_id: ProductId,
        quantity: u32,
        hold_minutes: Option<u32>,
    ) -> Result<Reservation, ClientError>;

    /// Confirms a hold, returning the resulting status.
    async fn confirm(
        &self,
        token: &str,
        reservation_id: ReservationId,
    ) -> Result<ReservationStatus, ClientError>;

    /// Cancels a hold, returning the resulting status.
    async fn cancel(
        &self,
        token: &str,
        reservation_id: ReservationId,
    ) -> Result<ReservationStatus, ClientError>;

    /// The caller's Active holds, most recent first.
    async fn active(&self, token: &str) -> Result<Vec<Reservation>, ClientError>;
}

/// Production [`ReservationBackend`] over HTTP.
pub struct HttpReservationApi {
    base_url: String,
    http: reqwest::Client,
}

impl HttpReservationApi {
    /// Creates a client for the server at `base_url` (no trailing slash).
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            http: reqwest::Client::new(),
        }
    }

    async fn decode<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, ClientError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response.json().await?);
        }
        // Non-2xx carries a {code, message} body; fall back to the raw text
        // when it does not parse (proxy errors and the like).
        let status = status.as_u16();
        let text = response.text().await.unwrap_or_default();
        match serde_json::from_str::<WireError>(&text) {
            Ok(wire) => {
                debug!(status, code = %wire.code, "api error response");
                Err(ClientError::Api {
                    status,
                    code: wire.code,
                    message: wire.message,
                })
            }
            Err(_) => Err(ClientError::Api {
                status,
                code: "UNKNOWN".to_string(),
                message: text,
            }),
        }
    }
}

#[async_trait]
impl ReservationBackend for HttpReservationApi {
    async fn stock(&self, product_id: ProductId) -> Result<StockSnapshot, ClientError> {
        let response = self
            .http
            .get(format!("{}/products/{product_id}/stock", self.base_url))
            .send()
            .await?;
        Self::decode(response).await
    }

    async fn reserve(
        &self,
        token: &str,
        product_id: ProductId,
        quantity: u32,
        hold_minutes: Option<u32>,
    ) -> Result<Reservation, ClientError> {
        let response = self
            .http
            .post(format!(
                "{}/reservations/products/{product_id}",
                self.base_url
            ))
            .bearer_auth(token)
            .json(&serde_json::json!({
                "quantity": quantity,
                "hold_minutes": hold_minutes,
            }))
            .send()
            .await?;
        let body: CreateReservationBody = Self::decode(response).await?;
        Ok(body.reservation)
    }

    async fn confirm(
        &self,
        token: &str,
        reservation_id: ReservationId,
    ) -> Result<ReservationStatus, ClientError> {
        let response = self
            .http
            .post(format!(
                "{}/reservations/{reservation_id}/confirm",
                self.base_url
            ))
            .bearer_auth(token)
            .send()
            .await?;
        let body: TransitionBody = Self::decode(response).await?;
        Ok(body.status)
    }

    async fn cancel(
        &self,
        token: &str,
        reservation_id: ReservationId,
    ) -> Result<ReservationStatus, ClientError> {
        let response = self
            .http
            .delete(format!("{}/reservations/{reservation_id}", self.base_url))
            .bearer_auth(token)
            .send()
            .await?;
        let body: TransitionBody = Self::decode(response).await?;
        Ok(body.status)
    }

    async fn active(&self, token: &str) -> Result<Vec<Reservation>, ClientError> {
        let response = self
            .http
            .get(format!("{}/reservations", self.base_url))
            .bearer_auth(token)
            .send()
            .await?;
        let body: ListReservationsBody = Self::decode(response).await?;
        Ok(body.reservations)
    }
}
