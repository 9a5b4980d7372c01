pub mod config;
pub mod errors;
pub mod handlers;
pub mod metrics;
pub mod mocks;
pub mod models;

use payment_adapters::{
    provider1::Provider1Connector, provider2::Provider2Connector, PaymentProvider, PaymentRouter,
};
use std::sync::Arc;

/// Wire both provider adapters, each with its own breaker, into a router
pub fn build_router(config: &config::Config) -> payment_adapters::Result<PaymentRouter> {
    let [provider1, provider2] = config.provider_configs();
    let breaker = &config.circuit_breaker;

    let providers: Vec<Arc<dyn PaymentProvider>> = vec![
        Arc::new(Provider1Connector::new(provider1, breaker.clone())?),
        Arc::new(Provider2Connector::new(provider2, breaker.clone())?),
    ];

    PaymentRouter::new(providers, config.retry_policy())
}

/// Install the JSON tracing subscriber (`RUST_LOG`, default `info`)
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .json()
        .init();
}
