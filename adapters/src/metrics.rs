//! Provider and routing metrics

use prometheus::{
    register_histogram_vec, register_int_counter, register_int_counter_vec,
    register_int_gauge_vec, HistogramVec, IntCounter, IntCounterVec, IntGaugeVec,
};

lazy_static::lazy_static! {
    /// Provider calls by provider, operation and outcome
    pub static ref PROVIDER_REQUESTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "payment_provider_requests_total",
        "Total payment provider requests",
        &["provider", "operation", "outcome"]
    )
    .expect("metric can be registered");

    /// Provider call latency
    pub static ref PROVIDER_REQUEST_DURATION: HistogramVec = register_histogram_vec!(
        "payment_provider_request_duration_seconds",
        "Payment provider request duration",
        &["provider", "operation"]
    )
    .expect("metric can be registered");

    /// Circuit breaker state per provider
    pub static ref CIRCUIT_BREAKER_STATE: IntGaugeVec = register_int_gauge_vec!(
        "payment_circuit_breaker_state",
        "Circuit breaker state (0=closed, 1=half-open, 2=open)",
        &["provider"]
    )
    .expect("metric can be registered");

    /// Full charge retries scheduled by the router
    pub static ref ROUTER_RETRIES_TOTAL: IntCounter = register_int_counter!(
        "payment_router_retries_total",
        "Charge retry rounds after every provider failed"
    )
    .expect("metric can be registered");

    /// Router outcomes by operation
    pub static ref ROUTER_OUTCOMES_TOTAL: IntCounterVec = register_int_counter_vec!(
        "payment_router_outcomes_total",
        "Payment router outcomes",
        &["operation", "outcome"]
    )
    .expect("metric can be registered");
}

/// Record one provider call
pub fn observe_provider_call(provider: &str, operation: &str, outcome: &str, seconds: f64) {
    PROVIDER_REQUESTS_TOTAL
        .with_label_values(&[provider, operation, outcome])
        .inc();
    PROVIDER_REQUEST_DURATION
        .with_label_values(&[provider, operation])
        .observe(seconds);
}

/// Record one router outcome
pub fn observe_router_outcome(operation: &str, outcome: &str) {
    ROUTER_OUTCOMES_TOTAL
        .with_label_values(&[operation, outcome])
        .inc();
}
