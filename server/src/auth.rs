//! Bearer-token extraction for mutating endpoints.
//!
//! Token issuance and verification belong to the external auth collaborator;
//! this module only extracts the opaque per-user token from the
//! `Authorization` header and derives the acting [`UserId`] from it. Handlers
//! take [`AuthUser`] as a parameter, so the acting user is always threaded
//! explicitly — never read from ambient state.

use crate::api::error::ApiError;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use reserva_core::UserId;

/// The authenticated caller of a mutating endpoint.
#[derive(Debug, Clone, Copy)]
pub struct AuthUser {
    /// The acting user
    pub user_id: UserId,
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get("authorization")
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| ApiError::unauthorized("Missing authorization header"))?;

        let token = header.strip_prefix("Bearer ").ok_or_else(|| {
            ApiError::unauthorized("Invalid authorization format. Expected 'Bearer <token>'")
        })?;

        if token.is_empty() {
            return Err(ApiError::unauthorized("Empty bearer token"));
        }

        // Tokens are opaque UUIDs issued per user by the auth collaborator.
        let uuid = uuid::Uuid::parse_str(token)
            .map_err(|_| ApiError::unauthorized("Invalid bearer token format"))?;

        Ok(Self {
            user_id: UserId::from_uuid(uuid),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use axum::http::Request;

    async fn extract(header: Option<&str>) -> Result<AuthUser, ApiError> {
        let mut builder = Request::builder().uri("/reservations");
        if let Some(value) = header {
            builder = builder.header("authorization", value);
        }
        let request = builder.body(()).unwrap();
        let (mut parts, ()) = request.into_parts();
        AuthUser::from_request_parts(&mut parts, &()).await
    }

    #[tokio::test]
    async fn valid_bearer_token_yields_the_user() {
        let uuid = uuid::Uuid::new_v4();
        let user = extract(Some(&format!("Bearer {uuid}"))).await.unwrap();
        assert_eq!(user.user_id, UserId::from_uuid(uuid));
    }

    #[tokio::test]
    async fn missing_or_malformed_headers_are_unauthorized() {
        assert!(extract(None).await.is_err());
        assert!(extract(Some("Bearer ")).await.is_err());
        assert!(extract(Some("Token abc")).await.is_err());
        assert!(extract(Some("Bearer not-a-uuid")).await.is_err());
    }
}
