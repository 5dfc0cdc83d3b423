use std::time::{Duration, Instant};

use uuid::Uuid;

/// Cross-cutting state threaded through every call instead of a global
/// (Design Notes §9): the request deadline, a correlation id mirrored into
/// every error and audit record, and the caller's admission identity.
#[derive(Clone, Debug)]
pub(crate) struct RequestContext {
    pub(crate) correlation_id: String,
    pub(crate) principal: String,
    deadline: Instant,
}

impl RequestContext {
    pub(crate) fn new(principal: String, budget: Duration, correlation_id: Option<String>) -> Self {
        Self {
            correlation_id: correlation_id.unwrap_or_else(|| Uuid::new_v4().to_string()),
            principal,
            deadline: Instant::now() + budget,
        }
    }

    /// Time remaining before the request deadline, or zero if already past it.
    pub(crate) fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }

    pub(crate) fn is_expired(&self) -> bool {
        Instant::now() >= self.deadline
    }

    /// `min(remaining request budget, per-call timeout)` — §4.3's deadline rule.
    pub(crate) fn call_budget(&self, per_call_timeout: Duration) -> Duration {
        self.remaining().min(per_call_timeout)
    }
}
