//! # Payment Adapters
//!
//! Resilient routing layer for card payments:
//! - Canonical payment model shared by every provider
//! - One adapter per external payment provider
//! - Circuit-breaker per provider
//! - Ordered failover with delayed full retry for charges
//! - Typed classification of provider errors
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │            Payment Router (failover/retry)          │
//! └────────────┬───────────────────────┬────────────────┘
//!              │                       │
//!     ┌────────▼────────┐     ┌────────▼────────┐
//!     │ Circuit Breaker │     │ Circuit Breaker │
//!     └────────┬────────┘     └────────┬────────┘
//!     ┌────────▼────────┐     ┌────────▼────────┐
//!     │   Provider 1    │     │   Provider 2    │
//!     │    Adapter      │     │    Adapter      │
//!     └────────┬────────┘     └────────┬────────┘
//!              │                       │
//! ┌────────────▼───────────────────────▼─────────────┐
//! │        Error Classifier + Status Tables          │
//! └──────────────────────────────────────────────────┘
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unused_qualifications)]

pub mod circuit_breaker;
pub mod classifier;
pub mod connector;
pub mod error;
mod http;
pub mod metrics;
pub mod provider1;
pub mod provider2;
pub mod router;
pub mod types;

pub use circuit_breaker::{BreakerSnapshot, CircuitBreaker, CircuitBreakerConfig, CircuitState};
pub use connector::{PaymentProvider, ProviderConfig};
pub use error::{Error, ErrorKind, Result};
pub use router::{PaymentRouter, RetryPolicy};
pub use types::*;

/// Default maximum number of full charge retries
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Default circuit breaker call timeout (milliseconds)
pub const DEFAULT_CB_TIMEOUT_MS: u64 = 3_000;

/// Default circuit breaker error threshold (percent of failed calls)
pub const DEFAULT_CB_ERROR_THRESHOLD_PERCENTAGE: u8 = 50;

/// Default circuit breaker reset timeout (milliseconds before half-open)
pub const DEFAULT_CB_RESET_TIMEOUT_MS: u64 = 10_000;

/// Default rolling statistics window (milliseconds)
pub const DEFAULT_CB_ROLLING_WINDOW_MS: u64 = 10_000;

/// Default provider request timeout (milliseconds)
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 5_000;
