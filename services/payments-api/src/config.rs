use config::{ConfigError, Environment};
use payment_adapters::{CircuitBreakerConfig, ProviderConfig, RetryPolicy};
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

/// Conventional variables applied on top of `PAYMENTS_API__*`
const OVERRIDES: &[(&str, &str)] = &[
    ("SERVICE_PORT", "server.port"),
    ("PAYMENTS_PROVIDER1_API_URL", "providers.provider1_api_url"),
    ("PAYMENTS_PROVIDER2_API_URL", "providers.provider2_api_url"),
    ("PAYMENTS_MAX_RETRIES", "payments.max_retries"),
    ("PAYMENTS_REQUEST_TIMEOUT", "payments.request_timeout_ms"),
    ("CIRCUIT_BREAKER_TIMEOUT", "circuit_breaker.timeout_ms"),
    (
        "CIRCUIT_BREAKER_ERROR_THRESHOLD_PERCENTAGE",
        "circuit_breaker.error_threshold_percentage",
    ),
    ("CIRCUIT_BREAKER_RESET_TIMEOUT", "circuit_breaker.reset_timeout_ms"),
    ("MOCKS_PORT", "mocks.port"),
    ("MOCKS_FAILURE_RATE", "mocks.failure_rate"),
    ("MOCKS_LATENCY_MS", "mocks.latency_ms"),
];

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub providers: ProvidersConfig,
    pub payments: PaymentsConfig,
    pub circuit_breaker: CircuitBreakerConfig,
    pub mocks: MocksConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub workers: usize,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ProvidersConfig {
    pub provider1_api_url: String,
    pub provider2_api_url: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct PaymentsConfig {
    pub max_retries: u32,
    pub request_timeout_ms: u64,
}

/// Local mock provider server
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct MocksConfig {
    pub host: String,
    pub port: u16,
    /// Probability (0.0-1.0) that a create call answers 500
    pub failure_rate: f64,
    /// Artificial latency added to create calls
    pub latency_ms: u64,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::load(|key| env::var(key).ok())
    }

    /// Build the configuration, resolving conventional variables through `lookup`
    pub fn load<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut builder = config::Config::builder()
            // Server defaults
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 3000)?
            .set_default("server.workers", 4)?
            // Providers
            .set_default(
                "providers.provider1_api_url",
                "http://localhost:3001/mocks/provider1",
            )?
            .set_default(
                "providers.provider2_api_url",
                "http://localhost:3001/mocks/provider2",
            )?
            // Routing
            .set_default("payments.max_retries", payment_adapters::DEFAULT_MAX_RETRIES as i64)?
            .set_default(
                "payments.request_timeout_ms",
                payment_adapters::DEFAULT_REQUEST_TIMEOUT_MS as i64,
            )?
            // Circuit breaker
            .set_default("circuit_breaker.timeout_ms", payment_adapters::DEFAULT_CB_TIMEOUT_MS as i64)?
            .set_default(
                "circuit_breaker.error_threshold_percentage",
                payment_adapters::DEFAULT_CB_ERROR_THRESHOLD_PERCENTAGE as i64,
            )?
            .set_default(
                "circuit_breaker.reset_timeout_ms",
                payment_adapters::DEFAULT_CB_RESET_TIMEOUT_MS as i64,
            )?
            .set_default(
                "circuit_breaker.rolling_window_ms",
                payment_adapters::DEFAULT_CB_ROLLING_WINDOW_MS as i64,
            )?
            .set_default("circuit_breaker.volume_threshold", 0)?
            // Mock providers
            .set_default("mocks.host", "0.0.0.0")?
            .set_default("mocks.port", 3001)?
            .set_default("mocks.failure_rate", 0.0)?
            .set_default("mocks.latency_ms", 0)?;

        builder = builder.add_source(Environment::with_prefix("PAYMENTS_API").separator("__"));

        // Override from environment variables
        for (var, key) in OVERRIDES {
            if let Some(value) = lookup(var) {
                builder = builder.set_override(*key, value)?;
            }
        }

        builder.build()?.try_deserialize()
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.server.port == 0 {
            return Err("Server port cannot be 0".to_string());
        }

        if self.providers.provider1_api_url.trim().is_empty()
            || self.providers.provider2_api_url.trim().is_empty()
        {
            return Err("Provider API URLs are required".to_string());
        }

        if self.payments.request_timeout_ms == 0 {
            return Err("Request timeout must be greater than 0".to_string());
        }

        let cb = &self.circuit_breaker;
        if !(1..=100).contains(&cb.error_threshold_percentage) {
            return Err("Circuit breaker error threshold must be between 1 and 100".to_string());
        }

        if cb.timeout_ms == 0 || cb.reset_timeout_ms == 0 || cb.rolling_window_ms == 0 {
            return Err("Circuit breaker timeouts must be greater than 0".to_string());
        }

        if !(0.0..=1.0).contains(&self.mocks.failure_rate) {
            return Err("Mock failure rate must be between 0 and 1".to_string());
        }

        Ok(())
    }

    /// Provider settings in failover priority order
    pub fn provider_configs(&self) -> [ProviderConfig; 2] {
        let with_timeout = |url: &str| ProviderConfig {
            api_url: url.to_string(),
            request_timeout_ms: self.payments.request_timeout_ms,
        };
        [
            with_timeout(&self.providers.provider1_api_url),
            with_timeout(&self.providers.provider2_api_url),
        ]
    }

    /// Charge retries wait one breaker reset timeout between rounds
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.payments.max_retries,
            retry_delay: Duration::from_millis(self.circuit_breaker.reset_timeout_ms),
        }
    }
}
