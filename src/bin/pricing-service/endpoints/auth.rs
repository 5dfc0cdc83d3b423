use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::error::Error;

/// Caller identity resolved from the `X-API-Key` header (§4.6). The header
/// value itself is used as the rate-limiter principal and is never logged.
pub(crate) struct Principal(pub(crate) String);

#[async_trait::async_trait]
impl<S> FromRequestParts<S> for Principal
where
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let value = parts
            .headers
            .get("x-api-key")
            .ok_or_else(|| Error::Validation("missing X-API-Key header".to_string()))?
            .to_str()
            .map_err(|_| Error::Validation("X-API-Key header is not valid UTF-8".to_string()))?;
        if value.is_empty() {
            return Err(Error::Validation("X-API-Key header is empty".to_string()));
        }
        Ok(Principal(value.to_string()))
    }
}
