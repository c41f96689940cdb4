use crate::error::AppError;
use axum::extract::FromRequestParts;
use axum::http::header::COOKIE;
use axum::http::request::Parts;

/// Name of the cookie carrying the owner id.
pub const OWNER_COOKIE: &str = "shortener";

/// The caller's opaque owner id, read from the [`OWNER_COOKIE`] cookie.
///
/// Rejects with 401 when the cookie is absent or empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Owner(pub String);

impl Owner {
    pub fn id(&self) -> &str {
        &self.0
    }
}

impl<S: Send + Sync> FromRequestParts<S> for Owner {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get_all(COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(|value| value.split(';'))
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(name, _)| *name == OWNER_COOKIE)
            .map(|(_, value)| value.trim().to_owned())
            .filter(|value| !value.is_empty())
            .map(Owner)
            .ok_or(AppError::Unauthorized(OWNER_COOKIE))
    }
}
