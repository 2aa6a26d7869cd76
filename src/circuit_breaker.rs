//! Stateful circuit breaker wrapping a fallible async operation.
//!
//! Ported from the API service's `middleware_circuit.py` `CircuitBreaker`: closed state
//! passes calls through with bounded retries; a threshold of consecutive failures opens
//! the breaker; after `reset_seconds` a single half-open probe decides whether to close
//! or reopen. State lives behind a `tokio::sync::Mutex`, the same guard style the crate
//! uses elsewhere for shared mutable state (see `nntp_client::NntpClient`).

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::types::CircuitState;

/// Raised in place of invoking the wrapped operation while the breaker is open.
#[derive(Debug, thiserror::Error)]
#[error("circuit breaker for {name} is open")]
pub struct CircuitOpenError {
    pub name: String,
}

struct Inner {
    state: CircuitState,
    failures: u32,
    opened_at: Option<Instant>,
}

/// One breaker instance per external dependency (`db`, `search`, ...).
pub struct CircuitBreaker {
    name: String,
    max_failures: u32,
    reset: Duration,
    retries: u32,
    base_backoff: Duration,
    jitter: Duration,
    inner: Mutex<Inner>,
}

impl CircuitBreaker {
    pub fn new(
        name: impl Into<String>,
        max_failures: u32,
        reset: Duration,
        retries: u32,
        base_backoff: Duration,
        jitter: Duration,
    ) -> Self {
        Self {
            name: name.into(),
            max_failures,
            reset,
            retries,
            base_backoff,
            jitter,
            inner: Mutex::new(Inner { state: CircuitState::Closed, failures: 0, opened_at: None }),
        }
    }

    /// Current externally-observable state, resolving a stale `open` into `half_open`
    /// if `reset_seconds` has elapsed.
    pub async fn state(&self) -> CircuitState {
        let mut guard = self.inner.lock().await;
        self.resolve_open(&mut guard);
        guard.state
    }

    fn resolve_open(&self, guard: &mut Inner) {
        if guard.state == CircuitState::Open {
            if let Some(opened_at) = guard.opened_at {
                if opened_at.elapsed() >= self.reset {
                    guard.state = CircuitState::HalfOpen;
                }
            }
        }
    }

    /// Invoke `op`, retrying on failure up to `retries` times with uniform jitter
    /// backoff. Fails fast with [`CircuitOpenError`] while the breaker is open.
    pub async fn call<F, Fut, T, E>(&self, mut op: F) -> Result<T, CallError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        {
            let mut guard = self.inner.lock().await;
            self.resolve_open(&mut guard);
            if guard.state == CircuitState::Open {
                return Err(CallError::Open(CircuitOpenError { name: self.name.clone() }));
            }
        }

        let mut last_err = None;
        for attempt in 0..=self.retries {
            match op().await {
                Ok(value) => {
                    self.on_success().await;
                    return Ok(value);
                }
                Err(e) => {
                    last_err = Some(e);
                    if attempt < self.retries {
                        tokio::time::sleep(self.backoff_delay()).await;
                    }
                }
            }
        }

        self.on_failure().await;
        Err(CallError::Failed(last_err.expect("loop runs at least once")))
    }

    fn backoff_delay(&self) -> Duration {
        let jitter_ms = if self.jitter.is_zero() {
            0
        } else {
            rand::thread_rng().gen_range(0..=self.jitter.as_millis() as u64)
        };
        self.base_backoff + Duration::from_millis(jitter_ms)
    }

    async fn on_success(&self) {
        let mut guard = self.inner.lock().await;
        guard.failures = 0;
        guard.state = CircuitState::Closed;
        guard.opened_at = None;
    }

    async fn on_failure(&self) {
        let mut guard = self.inner.lock().await;
        guard.failures += 1;
        if guard.state == CircuitState::HalfOpen || guard.failures >= self.max_failures {
            guard.state = CircuitState::Open;
            guard.opened_at = Some(Instant::now());
        }
    }
}

/// Outcome of [`CircuitBreaker::call`]: either the breaker refused the call, or the
/// operation itself failed after exhausting retries.
#[derive(Debug, thiserror::Error)]
pub enum CallError<E> {
    #[error(transparent)]
    Open(#[from] CircuitOpenError),
    #[error("operation failed after retries: {0}")]
    Failed(E),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn breaker(max_failures: u32, retries: u32) -> CircuitBreaker {
        CircuitBreaker::new(
            "test",
            max_failures,
            Duration::from_millis(50),
            retries,
            Duration::from_millis(1),
            Duration::from_millis(1),
        )
    }

    #[tokio::test]
    async fn success_resets_failure_count() {
        let cb = breaker(2, 0);
        let result: Result<(), CallError<&str>> = cb.call(|| async { Ok(()) }).await;
        assert!(result.is_ok());
        assert_eq!(cb.state().await, CircuitState::Closed);
    }

    #[tokio::test]
    async fn reaching_max_failures_opens_the_breaker() {
        let cb = breaker(2, 0);
        for _ in 0..2 {
            let _: Result<(), CallError<&str>> = cb.call(|| async { Err("boom") }).await;
        }
        assert_eq!(cb.state().await, CircuitState::Open);
    }

    #[tokio::test]
    async fn open_breaker_fails_fast_without_invoking_op() {
        let cb = breaker(1, 0);
        let _: Result<(), CallError<&str>> = cb.call(|| async { Err("boom") }).await;
        assert_eq!(cb.state().await, CircuitState::Open);

        let calls = Arc::new(AtomicU32::new(0));
        let calls2 = calls.clone();
        let result: Result<(), CallError<&str>> = cb
            .call(move || {
                calls2.fetch_add(1, Ordering::SeqCst);
                async { Ok(()) }
            })
            .await;

        assert!(matches!(result, Err(CallError::Open(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn half_open_reopens_on_failure() {
        let cb = breaker(1, 0);
        let _: Result<(), CallError<&str>> = cb.call(|| async { Err("boom") }).await;
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(cb.state().await, CircuitState::HalfOpen);

        let _: Result<(), CallError<&str>> = cb.call(|| async { Err("boom") }).await;
        assert_eq!(cb.state().await, CircuitState::Open);
    }

    #[tokio::test]
    async fn retries_before_declaring_failure() {
        let cb = breaker(5, 2);
        let attempts = Arc::new(AtomicU32::new(0));
        let attempts2 = attempts.clone();
        let _: Result<(), CallError<&str>> = cb
            .call(move || {
                attempts2.fetch_add(1, Ordering::SeqCst);
                async { Err("boom") }
            })
            .await;
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }
}
