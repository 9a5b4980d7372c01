//! Payment router: ordered failover across providers, delayed full retry for charges

use crate::{
    connector::PaymentProvider,
    metrics::{observe_router_outcome, ROUTER_RETRIES_TOTAL},
    types::*,
    Error, ErrorKind, Result,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Charge retry policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Full rounds attempted after the first one
    pub max_retries: u32,
    /// Wait between rounds (the breakers' reset timeout)
    pub retry_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: crate::DEFAULT_MAX_RETRIES,
            retry_delay: Duration::from_millis(crate::DEFAULT_CB_RESET_TIMEOUT_MS),
        }
    }
}

/// Routes payment operations over an ordered list of providers
pub struct PaymentRouter {
    providers: Vec<Arc<dyn PaymentProvider>>,
    retry: RetryPolicy,
}

impl PaymentRouter {
    /// Create a router; providers are tried in the given order
    pub fn new(providers: Vec<Arc<dyn PaymentProvider>>, retry: RetryPolicy) -> Result<Self> {
        if providers.is_empty() {
            return Err(Error::Config(
                "payment router needs at least one provider".to_string(),
            ));
        }

        info!(
            providers = ?providers.iter().map(|p| p.name()).collect::<Vec<_>>(),
            max_retries = retry.max_retries,
            retry_delay_ms = retry.retry_delay.as_millis() as u64,
            "Payment router initialized"
        );

        Ok(Self { providers, retry })
    }

    /// Providers in priority order
    pub fn providers(&self) -> &[Arc<dyn PaymentProvider>] {
        &self.providers
    }

    /// Retry policy
    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    /// Charge on the first provider that accepts the payment.
    ///
    /// When every provider fails the whole list is tried again after
    /// `retry_delay`, for at most `max_retries + 1` rounds.
    pub async fn charge(&self, request: PaymentRequest) -> Result<PaymentResult> {
        let mut retries = 0u32;

        loop {
            for provider in &self.providers {
                match provider.charge(&request).await {
                    Ok(result) => {
                        info!(
                            provider = provider.name(),
                            id = %result.id,
                            status = %result.status,
                            "Charge processed"
                        );
                        observe_router_outcome("charge", "success");
                        return Ok(result);
                    }
                    Err(e) => {
                        warn!(provider = provider.name(), error = %e, "Charge failed, trying next provider");
                    }
                }
            }

            if retries >= self.retry.max_retries {
                warn!(attempts = retries + 1, "All payment providers failed, giving up");
                observe_router_outcome("charge", "max_retries_exceeded");
                return Err(Error::MaxRetriesExceeded {
                    attempts: retries + 1,
                });
            }

            retries += 1;
            ROUTER_RETRIES_TOTAL.inc();
            warn!(
                retry = retries,
                max_retries = self.retry.max_retries,
                delay_ms = self.retry.retry_delay.as_millis() as u64,
                "All payment providers failed, retrying charge"
            );
            tokio::time::sleep(self.retry.retry_delay).await;
        }
    }

    /// Look a payment up on every provider until one knows it
    pub async fn find(&self, id: &str) -> Result<PaymentResult> {
        let mut all_not_found = true;

        for provider in &self.providers {
            match provider.find(id).await {
                Ok(result) => {
                    observe_router_outcome("find", "success");
                    return Ok(result);
                }
                Err(e) => {
                    all_not_found &= e.kind() == ErrorKind::NotFound;
                    warn!(provider = provider.name(), id, error = %e, "Find failed, trying next provider");
                }
            }
        }

        Err(self.exhausted("find", all_not_found))
    }

    /// Refund a payment on the provider that owns it.
    ///
    /// A business refusal is authoritative and returned without trying the
    /// remaining providers.
    pub async fn refund(&self, id: &str, request: RefundRequest) -> Result<PaymentResult> {
        let mut all_not_found = true;

        for provider in &self.providers {
            match provider.refund(id, &request).await {
                Ok(result) => {
                    info!(provider = provider.name(), id, status = %result.status, "Refund processed");
                    observe_router_outcome("refund", "success");
                    return Ok(result);
                }
                Err(e) if e.kind() == ErrorKind::Refusal => {
                    info!(provider = provider.name(), id, error = %e, "Refund refused");
                    observe_router_outcome("refund", "refused");
                    return Err(e);
                }
                Err(e) => {
                    all_not_found &= e.kind() == ErrorKind::NotFound;
                    warn!(provider = provider.name(), id, error = %e, "Refund failed, trying next provider");
                }
            }
        }

        Err(self.exhausted("refund", all_not_found))
    }

    fn exhausted(&self, operation: &str, all_not_found: bool) -> Error {
        if all_not_found {
            observe_router_outcome(operation, "not_found");
            Error::PaymentNotFound
        } else {
            observe_router_outcome(operation, "upstream_unavailable");
            Error::UpstreamUnavailable
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Utc;
    use parking_lot::Mutex;
    use rust_decimal_macros::dec;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::time::Instant;

    #[derive(Debug, Clone, Copy)]
    enum Step {
        Succeed,
        Unavailable,
        BreakerOpen,
        NotFound,
        ExceedsCharge,
        NotRefundable,
    }

    /// Provider replaying a script, then repeating `fallback`
    struct ScriptedProvider {
        name: &'static str,
        script: Mutex<VecDeque<Step>>,
        fallback: Step,
        calls: AtomicUsize,
    }

    impl ScriptedProvider {
        fn new(name: &'static str, fallback: Step) -> Arc<Self> {
            Self::scripted(name, &[], fallback)
        }

        fn scripted(name: &'static str, script: &[Step], fallback: Step) -> Arc<Self> {
            Arc::new(Self {
                name,
                script: Mutex::new(script.iter().copied().collect()),
                fallback,
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn next(&self, id: &str, status: PaymentStatus) -> Result<PaymentResult> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let step = self.script.lock().pop_front().unwrap_or(self.fallback);
            let provider = self.name.to_string();

            match step {
                Step::Succeed => Ok(PaymentResult {
                    id: id.to_string(),
                    created_date: Utc::now(),
                    status,
                    amount: dec!(1000),
                    original_amount: dec!(1000),
                    currency: "USD".to_string(),
                    description: "Order #1".to_string(),
                    payment_method: PaymentMethodKind::Card,
                    card_id: "card-1".to_string(),
                    provider: Some(provider),
                }),
                Step::Unavailable => Err(Error::ProviderUnavailable {
                    provider,
                    status_code: 503,
                    message: "Service Unavailable".to_string(),
                }),
                Step::BreakerOpen => Err(Error::CircuitBreakerOpen {
                    provider,
                    reason: "open".to_string(),
                }),
                Step::NotFound => Err(Error::NotFound {
                    provider,
                    message: "Not found".to_string(),
                }),
                Step::ExceedsCharge => Err(Error::RefundExceedsCharge { provider }),
                Step::NotRefundable => Err(Error::PaymentNotRefundable { provider }),
            }
        }
    }

    #[async_trait]
    impl PaymentProvider for ScriptedProvider {
        fn name(&self) -> &str {
            self.name
        }

        async fn charge(&self, _request: &PaymentRequest) -> Result<PaymentResult> {
            self.next("new", PaymentStatus::Success)
        }

        async fn find(&self, id: &str) -> Result<PaymentResult> {
            self.next(id, PaymentStatus::Success)
        }

        async fn refund(&self, id: &str, _request: &RefundRequest) -> Result<PaymentResult> {
            self.next(id, PaymentStatus::Refunded)
        }
    }

    fn request() -> PaymentRequest {
        PaymentRequest {
            amount: dec!(1000),
            currency: "USD".to_string(),
            description: "Order #1".to_string(),
            payment_method: PaymentMethod::Card {
                card: Card {
                    number: "4111111111111111".to_string(),
                    holder_name: "Jane Doe".to_string(),
                    cvv: "123".to_string(),
                    expiration_date: "12/2030".parse().unwrap(),
                    installments: None,
                },
            },
        }
    }

    fn policy() -> RetryPolicy {
        RetryPolicy {
            max_retries: 3,
            retry_delay: Duration::from_millis(10_000),
        }
    }

    fn router(providers: &[Arc<ScriptedProvider>]) -> PaymentRouter {
        let providers = providers
            .iter()
            .map(|p| p.clone() as Arc<dyn PaymentProvider>)
            .collect();
        PaymentRouter::new(providers, policy()).unwrap()
    }

    #[test]
    fn test_router_requires_a_provider() {
        let result = PaymentRouter::new(Vec::new(), policy());
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_charge_first_success_wins() {
        let p1 = ScriptedProvider::new("provider1", Step::Succeed);
        let p2 = ScriptedProvider::new("provider2", Step::Succeed);

        let result = router(&[p1.clone(), p2.clone()])
            .charge(request())
            .await
            .unwrap();

        assert_eq!(result.provider.as_deref(), Some("provider1"));
        assert_eq!(p1.calls(), 1);
        assert_eq!(p2.calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_charge_fails_over_to_next_provider() {
        let p1 = ScriptedProvider::new("provider1", Step::BreakerOpen);
        let p2 = ScriptedProvider::new("provider2", Step::Succeed);

        let start = Instant::now();
        let result = router(&[p1.clone(), p2.clone()])
            .charge(request())
            .await
            .unwrap();

        assert_eq!(result.provider.as_deref(), Some("provider2"));
        assert_eq!(result.status, PaymentStatus::Success);
        assert_eq!(p1.calls(), 1);
        assert_eq!(p2.calls(), 1);
        // failover within a round never waits
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_charge_exhausts_retry_budget() {
        let p1 = ScriptedProvider::new("provider1", Step::Unavailable);
        let p2 = ScriptedProvider::new("provider2", Step::BreakerOpen);

        let start = Instant::now();
        let result = router(&[p1.clone(), p2.clone()]).charge(request()).await;

        assert!(matches!(result, Err(Error::MaxRetriesExceeded { attempts: 4 })));
        assert_eq!(p1.calls(), 4);
        assert_eq!(p2.calls(), 4);
        // three waits between four rounds, none after the last
        let waited = start.elapsed();
        assert!(waited >= Duration::from_millis(30_000));
        assert!(waited < Duration::from_millis(40_000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_charge_recovers_on_a_later_round() {
        let p1 = ScriptedProvider::scripted(
            "provider1",
            &[Step::Unavailable, Step::Unavailable],
            Step::Succeed,
        );
        let p2 = ScriptedProvider::new("provider2", Step::Unavailable);

        let start = Instant::now();
        let result = router(&[p1.clone(), p2.clone()])
            .charge(request())
            .await
            .unwrap();

        assert_eq!(result.provider.as_deref(), Some("provider1"));
        assert_eq!(p1.calls(), 3);
        assert_eq!(p2.calls(), 2);
        assert!(start.elapsed() >= Duration::from_millis(20_000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_charge_without_retries_fails_after_one_round() {
        let p1 = ScriptedProvider::new("provider1", Step::Unavailable);
        let providers = vec![p1.clone() as Arc<dyn PaymentProvider>];
        let router = PaymentRouter::new(
            providers,
            RetryPolicy {
                max_retries: 0,
                retry_delay: Duration::from_secs(10),
            },
        )
        .unwrap();

        let result = router.charge(request()).await;
        assert!(matches!(result, Err(Error::MaxRetriesExceeded { attempts: 1 })));
        assert_eq!(p1.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_find_probes_providers_in_order() {
        let p1 = ScriptedProvider::new("provider1", Step::NotFound);
        let p2 = ScriptedProvider::new("provider2", Step::Succeed);

        let result = router(&[p1.clone(), p2.clone()])
            .find("pay_1")
            .await
            .unwrap();

        assert_eq!(result.id, "pay_1");
        assert_eq!(p1.calls(), 1);
        assert_eq!(p2.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_find_all_not_found() {
        let p1 = ScriptedProvider::new("provider1", Step::NotFound);
        let p2 = ScriptedProvider::new("provider2", Step::NotFound);

        let result = router(&[p1, p2]).find("missing").await;
        assert!(matches!(result, Err(Error::PaymentNotFound)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_find_all_unavailable() {
        let p1 = ScriptedProvider::new("provider1", Step::Unavailable);
        let p2 = ScriptedProvider::new("provider2", Step::BreakerOpen);

        let result = router(&[p1, p2]).find("pay_1").await;
        assert!(matches!(result, Err(Error::UpstreamUnavailable)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_find_mixed_failures_are_unavailable() {
        // the owning provider may be the one that is down
        let p1 = ScriptedProvider::new("provider1", Step::Unavailable);
        let p2 = ScriptedProvider::new("provider2", Step::NotFound);

        let result = router(&[p1, p2]).find("pay_1").await;
        assert!(matches!(result, Err(Error::UpstreamUnavailable)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_refund_refusal_short_circuits() {
        let p1 = ScriptedProvider::new("provider1", Step::ExceedsCharge);
        let p2 = ScriptedProvider::new("provider2", Step::Succeed);

        let result = router(&[p1.clone(), p2.clone()])
            .refund("pay_1", RefundRequest { amount: dec!(5000) })
            .await;

        assert!(matches!(result, Err(Error::RefundExceedsCharge { .. })));
        assert_eq!(p1.calls(), 1);
        assert_eq!(p2.calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_refund_not_refundable_after_not_found() {
        let p1 = ScriptedProvider::new("provider1", Step::NotFound);
        let p2 = ScriptedProvider::new("provider2", Step::NotRefundable);

        let result = router(&[p1, p2])
            .refund("pay_1", RefundRequest { amount: dec!(10) })
            .await;
        assert!(matches!(result, Err(Error::PaymentNotRefundable { .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn test_refund_skips_unavailable_provider() {
        let p1 = ScriptedProvider::new("provider1", Step::Unavailable);
        let p2 = ScriptedProvider::new("provider2", Step::Succeed);

        let result = router(&[p1, p2])
            .refund("pay_1", RefundRequest { amount: dec!(1000) })
            .await
            .unwrap();
        assert_eq!(result.status, PaymentStatus::Refunded);
    }

    #[tokio::test(start_paused = true)]
    async fn test_refund_exhausted() {
        let not_found = router(&[
            ScriptedProvider::new("provider1", Step::NotFound),
            ScriptedProvider::new("provider2", Step::NotFound),
        ])
        .refund("pay_1", RefundRequest { amount: dec!(1) })
        .await;
        assert!(matches!(not_found, Err(Error::PaymentNotFound)));

        let unavailable = router(&[
            ScriptedProvider::new("provider1", Step::NotFound),
            ScriptedProvider::new("provider2", Step::Unavailable),
        ])
        .refund("pay_1", RefundRequest { amount: dec!(1) })
        .await;
        assert!(matches!(unavailable, Err(Error::UpstreamUnavailable)));
    }
}
