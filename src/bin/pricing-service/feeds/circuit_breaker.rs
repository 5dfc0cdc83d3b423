use std::collections::VecDeque;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::config::ResilienceConfig;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum BreakerState {
    Closed,
    Open,
    HalfOpen,
}

impl BreakerState {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            BreakerState::Closed => "closed",
            BreakerState::Open => "open",
            BreakerState::HalfOpen => "half_open",
        }
    }
}

struct Inner {
    state: BreakerState,
    /// Most recent outcomes, newest at the back; bounded to `window_size`.
    window: VecDeque<bool>,
    opened_at: Option<Instant>,
    half_open_successes: u32,
}

/// Per-feed circuit breaker (§4.3). State transitions are guarded by a
/// short-lived lock taken only around the transition itself — never held
/// across the network call.
pub(crate) struct CircuitBreaker {
    inner: Mutex<Inner>,
    cooldown: Duration,
    failure_threshold: u32,
    window_size: usize,
    half_open_successes_needed: u32,
}

impl CircuitBreaker {
    pub(crate) fn new(config: &ResilienceConfig) -> Self {
        Self {
            inner: Mutex::new(Inner {
                state: BreakerState::Closed,
                window: VecDeque::with_capacity(config.breaker_window_size as usize),
                opened_at: None,
                half_open_successes: 0,
            }),
            cooldown: config.breaker_cooldown,
            failure_threshold: config.breaker_failure_threshold,
            window_size: config.breaker_window_size as usize,
            half_open_successes_needed: config.breaker_half_open_successes,
        }
    }

    /// Whether a call should even be attempted right now. `OPEN` short
    /// circuits until the cooldown elapses, at which point a single probe
    /// wave is let through as `HALF_OPEN`.
    pub(crate) fn allow_request(&self) -> bool {
        let mut inner = self.inner.lock();
        match inner.state {
            BreakerState::Closed => true,
            BreakerState::HalfOpen => true,
            BreakerState::Open => {
                let elapsed = inner
                    .opened_at
                    .map(|at| at.elapsed() >= self.cooldown)
                    .unwrap_or(true);
                if elapsed {
                    inner.state = BreakerState::HalfOpen;
                    inner.half_open_successes = 0;
                    true
                } else {
                    false
                }
            }
        }
    }

    pub(crate) fn state(&self) -> BreakerState {
        self.inner.lock().state
    }

    pub(crate) fn record_success(&self) {
        let mut inner = self.inner.lock();
        match inner.state {
            BreakerState::HalfOpen => {
                inner.half_open_successes += 1;
                if inner.half_open_successes >= self.half_open_successes_needed {
                    inner.state = BreakerState::Closed;
                    inner.window.clear();
                    inner.opened_at = None;
                }
            }
            BreakerState::Closed => {
                push_window(&mut inner.window, self.window_size, true);
            }
            BreakerState::Open => {}
        }
    }

    pub(crate) fn record_failure(&self) {
        let mut inner = self.inner.lock();
        match inner.state {
            BreakerState::HalfOpen => {
                inner.state = BreakerState::Open;
                inner.opened_at = Some(Instant::now());
                inner.half_open_successes = 0;
            }
            BreakerState::Closed => {
                push_window(&mut inner.window, self.window_size, false);
                let failures = inner.window.iter().filter(|ok| !**ok).count() as u32;
                if inner.window.len() == self.window_size && failures >= self.failure_threshold {
                    inner.state = BreakerState::Open;
                    inner.opened_at = Some(Instant::now());
                }
            }
            BreakerState::Open => {}
        }
    }
}

fn push_window(window: &mut VecDeque<bool>, capacity: usize, success: bool) {
    if window.len() == capacity {
        window.pop_front();
    }
    window.push_back(success);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(threshold: u32, window: u32) -> ResilienceConfig {
        ResilienceConfig {
            per_call_timeout: Duration::from_secs(5),
            max_attempts: 3,
            request_deadline: Duration::from_millis(100),
            breaker_cooldown: Duration::from_millis(20),
            breaker_failure_threshold: threshold,
            breaker_window_size: window,
            breaker_half_open_successes: 2,
        }
    }

    #[test]
    fn opens_after_threshold_failures_in_window() {
        let breaker = CircuitBreaker::new(&config(5, 10));
        for _ in 0..4 {
            breaker.record_failure();
        }
        assert_eq!(breaker.state(), BreakerState::Closed);
        breaker.record_failure();
        assert_eq!(breaker.state(), BreakerState::Open);
        assert!(!breaker.allow_request());
    }

    #[test]
    fn half_open_probe_closes_after_successes() {
        let breaker = CircuitBreaker::new(&config(1, 1));
        breaker.record_failure();
        assert_eq!(breaker.state(), BreakerState::Open);

        std::thread::sleep(Duration::from_millis(25));
        assert!(breaker.allow_request());
        assert_eq!(breaker.state(), BreakerState::HalfOpen);

        breaker.record_success();
        assert_eq!(breaker.state(), BreakerState::HalfOpen);
        breaker.record_success();
        assert_eq!(breaker.state(), BreakerState::Closed);
    }

    #[test]
    fn half_open_failure_reopens() {
        let breaker = CircuitBreaker::new(&config(1, 1));
        breaker.record_failure();
        std::thread::sleep(Duration::from_millis(25));
        assert!(breaker.allow_request());
        breaker.record_failure();
        assert_eq!(breaker.state(), BreakerState::Open);
    }
}
