//! Circuit breaker pattern per provider

use crate::{metrics::CIRCUIT_BREAKER_STATE, Error, Result};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Circuit breaker state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CircuitState {
    /// Closed (normal operation)
    Closed,
    /// Open (rejecting requests)
    Open,
    /// Half-open (one probe allowed)
    HalfOpen,
}

impl CircuitState {
    fn gauge_value(self) -> i64 {
        match self {
            CircuitState::Closed => 0,
            CircuitState::HalfOpen => 1,
            CircuitState::Open => 2,
        }
    }
}

/// Circuit breaker configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CircuitBreakerConfig {
    /// Abort the wrapped call and count a failure after this many milliseconds
    pub timeout_ms: u64,
    /// Percentage of failed calls in the rolling window that trips the breaker
    pub error_threshold_percentage: u8,
    /// Milliseconds spent open before a probe is allowed
    pub reset_timeout_ms: u64,
    /// Length of the rolling statistics window in milliseconds
    pub rolling_window_ms: u64,
    /// Minimum calls in the window before the breaker may trip
    pub volume_threshold: u32,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            timeout_ms: crate::DEFAULT_CB_TIMEOUT_MS,
            error_threshold_percentage: crate::DEFAULT_CB_ERROR_THRESHOLD_PERCENTAGE,
            reset_timeout_ms: crate::DEFAULT_CB_RESET_TIMEOUT_MS,
            rolling_window_ms: crate::DEFAULT_CB_ROLLING_WINDOW_MS,
            volume_threshold: 0,
        }
    }
}

impl CircuitBreakerConfig {
    /// Call timeout
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Dwell time in the open state
    pub fn reset_timeout(&self) -> Duration {
        Duration::from_millis(self.reset_timeout_ms)
    }

    /// Rolling statistics window
    pub fn rolling_window(&self) -> Duration {
        Duration::from_millis(self.rolling_window_ms)
    }
}

/// Point-in-time view of a breaker
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BreakerSnapshot {
    /// Provider guarded by the breaker
    pub provider: String,
    /// Current state
    pub state: CircuitState,
    /// Calls in the rolling window
    pub calls: usize,
    /// Failed calls in the rolling window
    pub failures: usize,
}

#[derive(Debug)]
struct Inner {
    state: CircuitState,
    /// (recorded at, failed)
    outcomes: VecDeque<(Instant, bool)>,
    opened_at: Option<Instant>,
    probe_in_flight: bool,
}

/// Circuit breaker guarding one provider
#[derive(Debug)]
pub struct CircuitBreaker {
    name: String,
    config: CircuitBreakerConfig,
    inner: Mutex<Inner>,
}

impl CircuitBreaker {
    /// Create new circuit breaker, initially closed
    pub fn new(name: impl Into<String>, config: CircuitBreakerConfig) -> Self {
        let name = name.into();
        CIRCUIT_BREAKER_STATE
            .with_label_values(&[&name])
            .set(CircuitState::Closed.gauge_value());

        Self {
            name,
            config,
            inner: Mutex::new(Inner {
                state: CircuitState::Closed,
                outcomes: VecDeque::new(),
                opened_at: None,
                probe_in_flight: false,
            }),
        }
    }

    /// Get current state
    pub fn state(&self) -> CircuitState {
        let mut inner = self.inner.lock();
        self.refresh(&mut inner, Instant::now());
        inner.state
    }

    /// Snapshot for status reporting
    pub fn snapshot(&self) -> BreakerSnapshot {
        let now = Instant::now();
        let mut inner = self.inner.lock();
        self.refresh(&mut inner, now);
        self.prune(&mut inner, now);

        BreakerSnapshot {
            provider: self.name.clone(),
            state: inner.state,
            calls: inner.outcomes.len(),
            failures: inner.outcomes.iter().filter(|(_, failed)| *failed).count(),
        }
    }

    /// Execute an operation with circuit breaker protection.
    ///
    /// Only transient errors (see [`Error::is_transient`]) count as failures;
    /// a provider answering "not found" or refusing a refund is healthy.
    pub async fn call<F, Fut, T>(&self, operation: F) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let permit = self.acquire()?;

        let outcome = match tokio::time::timeout(self.config.timeout(), operation()).await {
            Ok(result) => result,
            Err(_) => Err(Error::Timeout {
                provider: self.name.clone(),
                millis: self.config.timeout_ms,
            }),
        };

        match &outcome {
            Err(e) if e.is_transient() => permit.failure(),
            _ => permit.success(),
        }

        outcome
    }

    fn acquire(&self) -> Result<Permit<'_>> {
        let now = Instant::now();
        let mut inner = self.inner.lock();
        self.refresh(&mut inner, now);

        match inner.state {
            CircuitState::Closed => Ok(Permit::new(self, false)),
            CircuitState::HalfOpen if !inner.probe_in_flight => {
                inner.probe_in_flight = true;
                debug!(provider = %self.name, "Circuit breaker admitting probe call");
                Ok(Permit::new(self, true))
            }
            CircuitState::HalfOpen => Err(Error::CircuitBreakerOpen {
                provider: self.name.clone(),
                reason: "Circuit half-open, probe in flight".to_string(),
            }),
            CircuitState::Open => {
                let elapsed = inner
                    .opened_at
                    .map(|at| now.saturating_duration_since(at))
                    .unwrap_or_default();
                let remaining = self.config.reset_timeout().saturating_sub(elapsed);
                Err(Error::CircuitBreakerOpen {
                    provider: self.name.clone(),
                    reason: format!("Circuit open, retry in {}ms", remaining.as_millis()),
                })
            }
        }
    }

    /// Move open -> half-open once the reset timeout has elapsed
    fn refresh(&self, inner: &mut Inner, now: Instant) {
        if inner.state != CircuitState::Open {
            return;
        }
        let reset_due = inner
            .opened_at
            .map(|at| now.saturating_duration_since(at) >= self.config.reset_timeout())
            .unwrap_or(true);

        if reset_due {
            info!(provider = %self.name, "Circuit breaker half-open - probing provider recovery");
            inner.state = CircuitState::HalfOpen;
            inner.probe_in_flight = false;
            self.publish(CircuitState::HalfOpen);
        }
    }

    fn prune(&self, inner: &mut Inner, now: Instant) {
        let window = self.config.rolling_window();
        while let Some((at, _)) = inner.outcomes.front() {
            if now.saturating_duration_since(*at) > window {
                inner.outcomes.pop_front();
            } else {
                break;
            }
        }
    }

    fn on_success(&self, probe: bool) {
        let now = Instant::now();
        let mut inner = self.inner.lock();

        if probe && inner.state == CircuitState::HalfOpen {
            info!(provider = %self.name, "Circuit breaker closed - calls allowed");
            self.close(&mut inner);
        } else if inner.state == CircuitState::Closed {
            inner.outcomes.push_back((now, false));
            self.prune(&mut inner, now);
        }
    }

    fn on_failure(&self, probe: bool) {
        let now = Instant::now();
        let mut inner = self.inner.lock();

        if probe && inner.state == CircuitState::HalfOpen {
            warn!(provider = %self.name, "Circuit breaker probe failed - re-opening");
            self.trip(&mut inner, now);
            return;
        }
        if inner.state != CircuitState::Closed {
            return;
        }

        inner.outcomes.push_back((now, true));
        self.prune(&mut inner, now);

        let calls = inner.outcomes.len();
        let failures = inner.outcomes.iter().filter(|(_, failed)| *failed).count();
        let threshold = usize::from(self.config.error_threshold_percentage);

        if calls >= self.config.volume_threshold as usize && failures * 100 >= threshold * calls {
            warn!(
                provider = %self.name,
                failures,
                calls,
                "Circuit breaker opened - blocking new calls"
            );
            self.trip(&mut inner, now);
        }
    }

    fn release_probe(&self) {
        let mut inner = self.inner.lock();
        inner.probe_in_flight = false;
    }

    fn trip(&self, inner: &mut Inner, now: Instant) {
        inner.state = CircuitState::Open;
        inner.opened_at = Some(now);
        inner.probe_in_flight = false;
        self.publish(CircuitState::Open);
    }

    fn close(&self, inner: &mut Inner) {
        inner.state = CircuitState::Closed;
        inner.outcomes.clear();
        inner.opened_at = None;
        inner.probe_in_flight = false;
        self.publish(CircuitState::Closed);
    }

    fn publish(&self, state: CircuitState) {
        CIRCUIT_BREAKER_STATE
            .with_label_values(&[&self.name])
            .set(state.gauge_value());
    }
}

/// Admission ticket for one call; a dropped, unsettled probe frees the probe slot
struct Permit<'a> {
    breaker: &'a CircuitBreaker,
    probe: bool,
    settled: bool,
}

impl<'a> Permit<'a> {
    fn new(breaker: &'a CircuitBreaker, probe: bool) -> Self {
        Self {
            breaker,
            probe,
            settled: false,
        }
    }

    fn success(mut self) {
        self.settled = true;
        self.breaker.on_success(self.probe);
    }

    fn failure(mut self) {
        self.settled = true;
        self.breaker.on_failure(self.probe);
    }
}

impl Drop for Permit<'_> {
    fn drop(&mut self) {
        if !self.settled && self.probe {
            self.breaker.release_probe();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn config() -> CircuitBreakerConfig {
        CircuitBreakerConfig {
            timeout_ms: 1_000,
            error_threshold_percentage: 50,
            reset_timeout_ms: 5_000,
            rolling_window_ms: 10_000,
            volume_threshold: 2,
        }
    }

    fn unavailable() -> Error {
        Error::ProviderUnavailable {
            provider: "test".to_string(),
            status_code: 500,
            message: "boom".to_string(),
        }
    }

    async fn fail(cb: &CircuitBreaker) -> Result<()> {
        cb.call(|| async { Err::<(), _>(unavailable()) }).await
    }

    async fn succeed(cb: &CircuitBreaker) -> Result<()> {
        cb.call(|| async { Ok(()) }).await
    }

    #[tokio::test(start_paused = true)]
    async fn test_opens_and_rejects_without_calling() {
        let cb = CircuitBreaker::new("test", config());
        let calls = AtomicUsize::new(0);

        assert!(succeed(&cb).await.is_ok());
        assert!(fail(&cb).await.is_err());
        // 1 of 2 failed = 50% -> open
        assert_eq!(cb.state(), CircuitState::Open);

        let result = cb
            .call(|| async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
            .await;
        assert!(matches!(result, Err(Error::CircuitBreakerOpen { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_volume_threshold_delays_tripping() {
        let cb = CircuitBreaker::new("test", config());

        assert!(fail(&cb).await.is_err());
        assert_eq!(cb.state(), CircuitState::Closed);

        assert!(fail(&cb).await.is_err());
        assert_eq!(cb.state(), CircuitState::Open);
    }

    #[tokio::test(start_paused = true)]
    async fn test_half_open_probe_success_closes() {
        let cb = CircuitBreaker::new("test", config());
        fail(&cb).await.ok();
        fail(&cb).await.ok();
        assert_eq!(cb.state(), CircuitState::Open);

        tokio::time::advance(Duration::from_millis(4_999)).await;
        assert_eq!(cb.state(), CircuitState::Open);

        tokio::time::advance(Duration::from_millis(1)).await;
        assert_eq!(cb.state(), CircuitState::HalfOpen);

        assert!(succeed(&cb).await.is_ok());
        assert_eq!(cb.state(), CircuitState::Closed);
        assert_eq!(cb.snapshot().calls, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_half_open_probe_failure_reopens() {
        let cb = CircuitBreaker::new("test", config());
        fail(&cb).await.ok();
        fail(&cb).await.ok();

        tokio::time::advance(Duration::from_millis(5_000)).await;
        assert!(fail(&cb).await.is_err());
        assert_eq!(cb.state(), CircuitState::Open);

        // reset timer restarted at the failed probe
        tokio::time::advance(Duration::from_millis(4_000)).await;
        assert_eq!(cb.state(), CircuitState::Open);
        tokio::time::advance(Duration::from_millis(1_000)).await;
        assert_eq!(cb.state(), CircuitState::HalfOpen);
    }

    #[tokio::test(start_paused = true)]
    async fn test_only_one_probe_in_half_open() {
        let cb = Arc::new(CircuitBreaker::new("test", config()));
        fail(&cb).await.ok();
        fail(&cb).await.ok();
        tokio::time::advance(Duration::from_millis(5_000)).await;

        let (tx, rx) = tokio::sync::oneshot::channel::<()>();
        let probe = {
            let cb = cb.clone();
            tokio::spawn(async move {
                cb.call(|| async move {
                    rx.await.ok();
                    Ok(())
                })
                .await
            })
        };
        tokio::task::yield_now().await;

        let concurrent = succeed(&cb).await;
        assert!(matches!(concurrent, Err(Error::CircuitBreakerOpen { .. })));

        tx.send(()).unwrap();
        assert!(probe.await.unwrap().is_ok());
        assert_eq!(cb.state(), CircuitState::Closed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_probe_releases_slot() {
        let cb = CircuitBreaker::new("test", config());
        fail(&cb).await.ok();
        fail(&cb).await.ok();
        tokio::time::advance(Duration::from_millis(5_000)).await;

        let abandoned = tokio::time::timeout(
            Duration::from_millis(10),
            cb.call(|| std::future::pending::<Result<()>>()),
        )
        .await;
        assert!(abandoned.is_err());
        assert_eq!(cb.state(), CircuitState::HalfOpen);

        assert!(succeed(&cb).await.is_ok());
        assert_eq!(cb.state(), CircuitState::Closed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_counts_as_failure() {
        let cb = CircuitBreaker::new("test", config());

        for _ in 0..2 {
            let result = cb
                .call(|| async {
                    tokio::time::sleep(Duration::from_secs(5)).await;
                    Ok(())
                })
                .await;
            assert!(matches!(result, Err(Error::Timeout { millis: 1_000, .. })));
        }
        assert_eq!(cb.state(), CircuitState::Open);
    }

    #[tokio::test(start_paused = true)]
    async fn test_business_errors_do_not_trip() {
        let cb = CircuitBreaker::new("test", config());

        for _ in 0..5 {
            let result = cb
                .call(|| async {
                    Err::<(), _>(Error::NotFound {
                        provider: "test".to_string(),
                        message: "Charge not found.".to_string(),
                    })
                })
                .await;
            assert!(matches!(result, Err(Error::NotFound { .. })));
        }
        assert_eq!(cb.state(), CircuitState::Closed);
        assert_eq!(cb.snapshot().failures, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rolling_window_forgets_old_failures() {
        let cb = CircuitBreaker::new("test", config());

        fail(&cb).await.ok();
        tokio::time::advance(Duration::from_millis(10_001)).await;
        fail(&cb).await.ok();

        assert_eq!(cb.state(), CircuitState::Closed);
        let snapshot = cb.snapshot();
        assert_eq!(snapshot.calls, 1);
        assert_eq!(snapshot.failures, 1);
    }
}
