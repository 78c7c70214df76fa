use async_trait::async_trait;
use axum::extract::FromRequestParts;
use http::request::Parts;

use crate::errors::Error;

/// Header the fronting auth layer sets to the authenticated user id.
pub const CALLER_HEADER: &str = "x-showreel-caller";

/// Authenticated user id taken from [`CALLER_HEADER`]. Handlers that
/// extract this reject anonymous requests.
pub struct Caller(pub String);

#[async_trait]
impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(CALLER_HEADER)
            .and_then(|value| value.to_str().ok())
            .filter(|value| !value.is_empty())
            .map(|value| Caller(String::from(value)))
            .ok_or(Error::MissingCaller)
    }
}
