use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use reqwest::StatusCode;
use serde::Serialize;

use crate::app::App;

#[derive(Serialize)]
struct HealthBody {
    status: &'static str,
    build_version: &'static str,
    reference_store: &'static str,
    feeds: FeedBreakers,
    audit_dropped_total: u64,
}

#[derive(Serialize)]
struct FeedBreakers {
    seclend: &'static str,
    volatility: &'static str,
    events: &'static str,
}

pub(crate) async fn health(State(app): State<Arc<App>>) -> impl IntoResponse {
    let store_ok = app.store.health_check().await;

    let body = HealthBody {
        status: if store_ok { "ok" } else { "degraded" },
        build_version: locate_fee_pricing::build_version(),
        reference_store: if store_ok { "reachable" } else { "unreachable" },
        feeds: FeedBreakers {
            seclend: app.feeds.seclend.breaker_state().as_str(),
            volatility: app.feeds.volatility.breaker_state().as_str(),
            events: app.feeds.events.breaker_state().as_str(),
        },
        audit_dropped_total: app.orchestrator.audit_dropped_count(),
    };

    let status = if store_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(body))
}
