//! In-memory stand-ins for the two external payment providers, served under `/mocks`.
//!
//! Only meant for local runs and tests. Create calls can be slowed down and made
//! to fail at random to exercise failover.

pub mod provider1;
pub mod provider2;

use crate::config::MocksConfig;
use actix_web::{http::StatusCode, web, HttpResponse, ResponseError, Scope};
use rand::Rng;
use serde_json::json;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MockError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("Internal Server Error")]
    Internal,
}

impl ResponseError for MockError {
    fn error_response(&self) -> HttpResponse {
        let status_code = self.status_code();

        HttpResponse::build(status_code).json(json!({
            "message": self.to_string(),
            "error": status_code.canonical_reason().unwrap_or_default(),
            "statusCode": status_code.as_u16()
        }))
    }

    fn status_code(&self) -> StatusCode {
        match self {
            MockError::NotFound(_) => StatusCode::NOT_FOUND,
            MockError::BadRequest(_) => StatusCode::BAD_REQUEST,
            MockError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Simulated provider behaviour for create calls
#[derive(Debug, Clone, Copy, Default)]
pub struct MockBehavior {
    /// Probability (0.0-1.0) of answering 500
    pub failure_rate: f64,
    /// Upper bound of the random delay
    pub max_latency: Duration,
}

impl From<&MocksConfig> for MockBehavior {
    fn from(config: &MocksConfig) -> Self {
        Self {
            failure_rate: config.failure_rate.clamp(0.0, 1.0),
            max_latency: Duration::from_millis(config.latency_ms),
        }
    }
}

impl MockBehavior {
    async fn simulate(&self) -> Result<(), MockError> {
        let max_ms = self.max_latency.as_millis() as u64;
        if max_ms > 0 {
            let delay = rand::thread_rng().gen_range(0..=max_ms);
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }

        if self.failure_rate > 0.0 && rand::thread_rng().gen_bool(self.failure_rate) {
            return Err(MockError::Internal);
        }
        Ok(())
    }
}

/// Shared state of both mock providers
#[derive(Debug, Default)]
pub struct MockState {
    pub behavior: MockBehavior,
    pub provider1: provider1::ChargeStore,
    pub provider2: provider2::TransactionStore,
}

impl MockState {
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            ..Default::default()
        }
    }
}

/// `/mocks/provider1/...` and `/mocks/provider2/...`
pub fn mock_scope(state: web::Data<MockState>) -> Scope {
    web::scope("/mocks")
        .app_data(state)
        .service(web::scope("/provider1").configure(provider1::configure_routes))
        .service(web::scope("/provider2").configure(provider2::configure_routes))
}

fn check(condition: bool, message: &str) -> Result<(), MockError> {
    if condition {
        Ok(())
    } else {
        Err(MockError::BadRequest(message.to_string()))
    }
}

fn all_digits(value: &str, len: usize) -> bool {
    value.len() == len && value.chars().all(|c| c.is_ascii_digit())
}

/// `NN/NN..` with the given year width
fn expiration_like(value: &str, year_digits: usize) -> bool {
    match value.split_once('/') {
        Some((month, year)) => all_digits(month, 2) && all_digits(year, year_digits),
        None => false,
    }
}
