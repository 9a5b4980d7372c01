//! Error types for adapters and routing

use thiserror::Error;

/// Result type for adapter operations
pub type Result<T> = std::result::Result<T, Error>;

/// Adapter and routing errors
#[derive(Error, Debug)]
pub enum Error {
    /// Connection error (transport level)
    #[error("Connection error for provider {provider}: {message}")]
    Connection {
        /// Provider name
        provider: String,
        /// Message
        message: String,
    },

    /// Circuit breaker open
    #[error("Circuit breaker open for provider {provider}: {reason}")]
    CircuitBreakerOpen {
        /// Provider name
        provider: String,
        /// Reason
        reason: String,
    },

    /// Timeout
    #[error("Timeout after {millis}ms calling provider {provider}")]
    Timeout {
        /// Provider name
        provider: String,
        /// Timeout duration
        millis: u64,
    },

    /// Provider answered with a server-class status
    #[error("Provider {provider} unavailable ({status_code}): {message}")]
    ProviderUnavailable {
        /// Provider name
        provider: String,
        /// HTTP status code
        status_code: u16,
        /// Error message
        message: String,
    },

    /// Provider does not know the requested payment
    #[error("Payment not found at provider {provider}: {message}")]
    NotFound {
        /// Provider name
        provider: String,
        /// Error message
        message: String,
    },

    /// Refund amount is greater than the charged amount
    #[error("Refund amount is greater than payment amount")]
    RefundExceedsCharge {
        /// Provider name
        provider: String,
    },

    /// Payment is in a state that cannot be refunded
    #[error("Payment cannot be refunded")]
    PaymentNotRefundable {
        /// Provider name
        provider: String,
    },

    /// Any other 4xx answer from the provider
    #[error("Provider {provider} rejected the request ({status_code}): {message}")]
    BadRequest {
        /// Provider name
        provider: String,
        /// HTTP status code
        status_code: u16,
        /// Provider message, unmodified
        message: String,
    },

    /// Provider returned a status absent from its status table
    #[error("Provider {provider} returned unmapped status '{status}'")]
    UnmappedStatus {
        /// Provider name
        provider: String,
        /// Native status
        status: String,
    },

    /// Provider response could not be decoded
    #[error("Invalid response from provider {provider}: {message}")]
    InvalidResponse {
        /// Provider name
        provider: String,
        /// Decode error
        message: String,
    },

    /// Canonical request could not be translated
    #[error("Invalid payment request: {0}")]
    InvalidRequest(String),

    /// No provider recognizes the payment
    #[error("Payment not found")]
    PaymentNotFound,

    /// Every provider failed with server-class errors
    #[error("All payment providers failed")]
    UpstreamUnavailable,

    /// Charge retry budget exhausted
    #[error("Max retries exceeded after {attempts} attempts, all payment providers failed")]
    MaxRetriesExceeded {
        /// Rounds attempted
        attempts: u32,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Coarse classification used by the router and the circuit breaker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Provider does not know the payment
    NotFound,
    /// Authoritative business refusal (never retried on another provider)
    Refusal,
    /// Transport, availability or contract failure
    Transient,
    /// Aggregate outcome produced by the router, or a local error
    Terminal,
}

impl Error {
    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::NotFound { .. } => ErrorKind::NotFound,
            Error::RefundExceedsCharge { .. }
            | Error::PaymentNotRefundable { .. }
            | Error::BadRequest { .. } => ErrorKind::Refusal,
            Error::Connection { .. }
            | Error::CircuitBreakerOpen { .. }
            | Error::Timeout { .. }
            | Error::ProviderUnavailable { .. }
            | Error::UnmappedStatus { .. }
            | Error::InvalidResponse { .. } => ErrorKind::Transient,
            Error::InvalidRequest(_)
            | Error::PaymentNotFound
            | Error::UpstreamUnavailable
            | Error::MaxRetriesExceeded { .. }
            | Error::Config(_) => ErrorKind::Terminal,
        }
    }

    /// Whether this error should count against a provider's health
    pub fn is_transient(&self) -> bool {
        self.kind() == ErrorKind::Transient
    }
}
