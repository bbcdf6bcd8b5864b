// apps/studio-server/src/security.rs
use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
};

pub const CLIENT_ID_HEADER: &str = "X-MMSS-CLIENT-ID";
pub const DEFAULT_CLIENT_ID: &str = "public";

/// Editor session key taken from the client header.
pub struct ClientSession(pub String);

/// Alphanumeric plus dashes only.
pub fn is_safe_identifier(value: &str) -> bool {
    !value.is_empty() && value.chars().all(|c| c.is_alphanumeric() || c == '-')
}

#[async_trait]
impl<S> FromRequestParts<S> for ClientSession
where
    S: Send + Sync,
{
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let client_id = parts
            .headers
            .get(CLIENT_ID_HEADER)
            .and_then(|h| h.to_str().ok())
            .unwrap_or(DEFAULT_CLIENT_ID);

        if !is_safe_identifier(client_id) {
            tracing::warn!("Invalid Client ID rejected: {}", client_id);
            return Err(StatusCode::BAD_REQUEST);
        }

        Ok(ClientSession(client_id.to_string()))
    }
}
