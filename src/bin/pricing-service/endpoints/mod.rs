pub(crate) mod auth;
mod calculate;
mod health;
mod rates;

use std::sync::Arc;
use std::time::Duration;

use axum::http::{HeaderMap, HeaderValue};
use axum::response::Response;
use axum::routing::{get, post};
use axum::Router;
use reqwest::{header::CONTENT_TYPE, Method};
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::app::App;

const MAX_BODY_BYTES: usize = 16 * 1024;

/// Per-request deadline budget handed to a fresh [`crate::context::RequestContext`].
fn request_deadline_budget(app: &App) -> Duration {
    app.config.resilience.request_deadline
}

/// Caller-supplied `X-Correlation-Id`, or a fresh one if absent/not valid UTF-8.
fn incoming_correlation_id(headers: &HeaderMap) -> String {
    headers
        .get("x-correlation-id")
        .and_then(|v| v.to_str().ok())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string())
}

/// Echoes the correlation id on a successful response, mirroring
/// [`crate::error::Error::into_response_with`] on the error path.
fn with_correlation_header(mut response: Response, correlation_id: &str) -> Response {
    if let Ok(value) = HeaderValue::from_str(correlation_id) {
        response.headers_mut().insert("x-correlation-id", value);
    }
    response
}

pub(crate) fn router(app: Arc<App>) -> Router {
    let api = Router::new()
        .route("/health", get(health::health))
        .route("/rates/:ticker", get(rates::get_rate))
        .route("/calculate-locate", post(calculate::calculate_locate));

    Router::new()
        .nest("/api/v1", api)
        .with_state(app)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(Duration::from_secs(5)))
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(
            CorsLayer::new()
                .allow_origin(tower_http::cors::Any)
                .allow_methods([Method::GET, Method::POST])
                .allow_headers([
                    CONTENT_TYPE,
                    "x-api-key".parse().unwrap(),
                    "x-correlation-id".parse().unwrap(),
                ]),
        )
}
