use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Serialize;

use locate_fee_pricing::domain::{BorrowRateQuote, BorrowStatus};
use locate_fee_pricing::number::Rate;

use crate::app::App;
use crate::context::RequestContext;
use crate::endpoints::auth::Principal;

use super::{incoming_correlation_id, request_deadline_budget, with_correlation_header};

/// Wire shape for `GET /rates/{ticker}` (§6): `{current_rate, borrow_status,
/// as_of, source}`.
#[derive(Serialize)]
struct RateResponse {
    current_rate: Rate,
    borrow_status: BorrowStatus,
    as_of: DateTime<Utc>,
    source: &'static str,
}

impl From<BorrowRateQuote> for RateResponse {
    fn from(quote: BorrowRateQuote) -> Self {
        Self {
            current_rate: quote.annualized_rate,
            borrow_status: quote.status,
            as_of: quote.as_of,
            source: quote.source.source_label(),
        }
    }
}

pub(crate) async fn get_rate(
    State(app): State<Arc<App>>,
    Principal(principal): Principal,
    Path(ticker): Path<String>,
    headers: HeaderMap,
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
        return crate::error::Error::RateLimited {
            retry_after_secs: admission.retry_after_secs,
        }
        .into_response_with(correlation_id);
    }

    let ctx = RequestContext::new(
        principal,
        request_deadline_budget(&app),
        Some(correlation_id.clone()),
    );

    match app.orchestrator.get_current_rate(&ctx, &ticker).await {
        Ok(quote) => with_correlation_header(
            Json(RateResponse::from(quote)).into_response(),
            &correlation_id,
        ),
        Err(e) => e.into_response_with(correlation_id),
    }
}
