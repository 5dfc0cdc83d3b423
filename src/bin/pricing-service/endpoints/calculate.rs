use std::sync::Arc;

use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use axum::Json;
use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};

use locate_fee_pricing::domain::CalculationResult;

use crate::app::App;
use crate::context::RequestContext;
use crate::endpoints::auth::Principal;
use crate::error::Error;

use super::{incoming_correlation_id, request_deadline_budget, with_correlation_header};

#[derive(Deserialize)]
pub(crate) struct CalculateLocateRequest {
    client_id: String,
    ticker: String,
    position_value: BigDecimal,
    loan_days: i64,
}

/// Wire shape for a successful `/calculate-locate` response (§6): the
/// computed result plus the `status:"success"` discriminator the error
/// path's body carries (`error.rs`'s `ErrorBody`).
#[derive(Serialize)]
struct CalculateLocateResponse {
    status: &'static str,
    #[serde(flatten)]
    result: CalculationResult,
}

pub(crate) async fn calculate_locate(
    State(app): State<Arc<App>>,
    Principal(principal): Principal,
    headers: HeaderMap,
    Json(req): Json<CalculateLocateRequest>,
) -> Response {
    let correlation_id = incoming_correlation_id(&headers);

    let admission = match app.rate_limiter.admit(&principal).await {
        Ok(a) => a,
        Err(e) => {
            tracing::error!(error = %e, "rate limiter backend error, failing open");
            crate::ratelimit::Admission {
                allowed: true,
                retry_after_secs: 0,
            }
        }
    };
    if !admission.allowed {
        return Error::RateLimited {
            retry_after_secs: admission.retry_after_secs,
        }
        .into_response_with(correlation_id);
    }

    let ctx = RequestContext::new(
        principal,
        request_deadline_budget(&app),
        Some(correlation_id.clone()),
    );

    match app
        .orchestrator
        .compute_fee(&ctx, &req.client_id, &req.ticker, req.position_value, req.loan_days)
        .await
    {
        Ok(result) => {
            let body = CalculateLocateResponse { status: "success", result };
            with_correlation_header(Json(body).into_response(), &correlation_id)
        }
        Err(e) => e.into_response_with(correlation_id),
    }
}
