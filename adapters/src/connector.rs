//! Payment provider interface

use crate::{circuit_breaker::BreakerSnapshot, types::*, Result};
use async_trait::async_trait;

/// Adapter to one external payment provider.
///
/// Every operation runs through the adapter's own circuit breaker. Breaker
/// errors are propagated unchanged so the router can tell an unreachable
/// provider from a provider that answered.
#[async_trait]
pub trait PaymentProvider: Send + Sync {
    /// Provider name (also reported as `provider` on charge results)
    fn name(&self) -> &str;

    /// Create a charge
    async fn charge(&self, request: &PaymentRequest) -> Result<PaymentResult>;

    /// Look up a payment by provider ID
    async fn find(&self, id: &str) -> Result<PaymentResult>;

    /// Refund (fully or partially) an existing payment
    async fn refund(&self, id: &str, request: &RefundRequest) -> Result<PaymentResult>;

    /// Circuit breaker snapshot, when the adapter has one
    fn breaker_snapshot(&self) -> Option<BreakerSnapshot> {
        None
    }
}

/// Connection settings for one provider
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ProviderConfig {
    /// Base URL of the provider API
    pub api_url: String,
    /// Per-request timeout in milliseconds
    pub request_timeout_ms: u64,
}

impl ProviderConfig {
    /// Settings with the default request timeout
    pub fn new(api_url: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into(),
            request_timeout_ms: crate::DEFAULT_REQUEST_TIMEOUT_MS,
        }
    }
}
