use axum::{
    response::{IntoResponse, Response},
    Json,
};
use locate_fee_pricing::error::KernelError;
use reqwest::StatusCode;
use serde::Serialize;

/// Stable error kinds (§7), translated to HTTP at the edge. Never carries
/// upstream API keys, stack traces, or raw upstream error bodies.
#[derive(Debug, thiserror::Error)]
pub(crate) enum Error {
    #[error("validation error: {0}")]
    Validation(String),
    #[error("ticker not found: {0}")]
    TickerNotFound(String),
    #[error("client not found: {0}")]
    ClientNotFound(String),
    #[error("rate limited")]
    RateLimited { retry_after_secs: u64 },
    #[error("request timed out")]
    Timeout,
    #[error("upstream unavailable")]
    UpstreamUnavailable,
    #[error("internal error")]
    Internal(#[from] anyhow::Error),
}

impl From<KernelError> for Error {
    fn from(e: KernelError) -> Self {
        match e {
            KernelError::InvalidInput(msg) => Error::Validation(msg),
        }
    }
}

impl Error {
    fn kind(&self) -> &'static str {
        match self {
            Error::Validation(_) => "ValidationError",
            Error::TickerNotFound(_) => "TickerNotFound",
            Error::ClientNotFound(_) => "ClientNotFound",
            Error::RateLimited { .. } => "RateLimited",
            Error::Timeout => "Timeout",
            Error::UpstreamUnavailable => "UpstreamUnavailable",
            Error::Internal(_) => "InternalError",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            Error::Validation(_) => StatusCode::BAD_REQUEST,
            Error::TickerNotFound(_) | Error::ClientNotFound(_) => StatusCode::NOT_FOUND,
            Error::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            Error::Timeout => StatusCode::GATEWAY_TIMEOUT,
            Error::UpstreamUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            Error::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to return to a caller — never the internal error's `Display`.
    fn public_message(&self) -> String {
        match self {
            Error::Internal(_) => "an internal error occurred".to_string(),
            other => other.to_string(),
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    status: &'static str,
    error: &'static str,
    message: String,
    correlation_id: String,
}

impl Error {
    pub(crate) fn into_response_with(self, correlation_id: String) -> Response {
        if matches!(self, Error::Internal(_)) {
            tracing::error!(error = %self, correlation_id, "internal error");
        }
        let status = self.status();
        let retry_after = match &self {
            Error::RateLimited { retry_after_secs } => Some(*retry_after_secs),
            _ => None,
        };
        let body = ErrorBody {
            status: "error",
            error: self.kind(),
            message: self.public_message(),
            correlation_id,
        };
        let mut res = (status, Json(body)).into_response();
        if let Some(secs) = retry_after {
            res.headers_mut().insert(
                "Retry-After",
                secs.to_string().parse().expect("digits are valid header value"),
            );
        }
        res
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        self.into_response_with(uuid::Uuid::new_v4().to_string())
    }
}
