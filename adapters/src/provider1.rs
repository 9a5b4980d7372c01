//! Provider 1 adapter ("charges" API)

use crate::{
    circuit_breaker::{BreakerSnapshot, CircuitBreaker, CircuitBreakerConfig},
    classifier::RefusalMessages,
    connector::{PaymentProvider, ProviderConfig},
    http::ProviderHttp,
    types::*,
    Result,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Provider name
pub const PROVIDER1: &str = "provider1";

const STATUSES: StatusTable = StatusTable(&[
    ("authorized", PaymentStatus::Success),
    ("failed", PaymentStatus::Refused),
    ("refunded", PaymentStatus::Refunded),
]);

const REFUSALS: RefusalMessages = RefusalMessages {
    exceeds_charge: "Refund amount is greater than the charge.",
    not_refundable: "Charge cannot be refunded.",
};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ChargeCard<'a> {
    number: &'a str,
    holder_name: &'a str,
    cvv: &'a str,
    expiration_date: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    installments: Option<u8>,
}

#[derive(Debug, Serialize)]
struct ChargeMethod<'a> {
    #[serde(rename = "type")]
    kind: PaymentMethodKind,
    card: ChargeCard<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateCharge<'a> {
    #[serde(with = "rust_decimal::serde::float")]
    amount: Decimal,
    currency: &'a str,
    description: &'a str,
    payment_method: ChargeMethod<'a>,
}

impl<'a> From<&'a PaymentRequest> for CreateCharge<'a> {
    fn from(request: &'a PaymentRequest) -> Self {
        let PaymentMethod::Card { card } = &request.payment_method;
        Self {
            amount: request.amount,
            currency: &request.currency,
            description: &request.description,
            payment_method: ChargeMethod {
                kind: PaymentMethodKind::Card,
                card: ChargeCard {
                    number: &card.number,
                    holder_name: &card.holder_name,
                    cvv: &card.cvv,
                    expiration_date: card.expiration_date.to_string(),
                    installments: card.installments,
                },
            },
        }
    }
}

#[derive(Debug, Serialize)]
struct RefundCharge {
    #[serde(with = "rust_decimal::serde::float")]
    amount: Decimal,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Charge {
    id: String,
    created_at: DateTime<Utc>,
    status: String,
    #[serde(with = "rust_decimal::serde::float")]
    original_amount: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    current_amount: Decimal,
    currency: String,
    description: String,
    payment_method: PaymentMethodKind,
    card_id: String,
}

impl Charge {
    fn into_result(self) -> Result<PaymentResult> {
        Ok(PaymentResult {
            status: STATUSES.resolve(PROVIDER1, &self.status)?,
            id: self.id,
            created_date: self.created_at,
            amount: self.current_amount,
            original_amount: self.original_amount,
            currency: self.currency,
            description: self.description,
            payment_method: self.payment_method,
            card_id: self.card_id,
            provider: None,
        })
    }
}

/// Provider 1 connector
pub struct Provider1Connector {
    http: ProviderHttp,
    breaker: CircuitBreaker,
}

impl Provider1Connector {
    /// Create new provider 1 connector with its own circuit breaker
    pub fn new(config: ProviderConfig, breaker: CircuitBreakerConfig) -> Result<Self> {
        Ok(Self {
            http: ProviderHttp::new(PROVIDER1, &config)?,
            breaker: CircuitBreaker::new(PROVIDER1, breaker),
        })
    }

    async fn create_charge(&self, request: &PaymentRequest) -> Result<PaymentResult> {
        let charge: Charge = self
            .http
            .post("charge", &["charges"], &CreateCharge::from(request), None)
            .await?;

        let mut result = charge.into_result()?;
        result.provider = Some(PROVIDER1.to_string());
        Ok(result)
    }

    async fn get_charge(&self, id: &str) -> Result<PaymentResult> {
        let charge: Charge = self.http.get("find", &["charges", id]).await?;
        charge.into_result()
    }

    async fn refund_charge(&self, id: &str, request: &RefundRequest) -> Result<PaymentResult> {
        let body = RefundCharge {
            amount: request.amount,
        };
        let charge: Charge = self
            .http
            .post("refund", &["refund", id], &body, Some(&REFUSALS))
            .await?;
        charge.into_result()
    }
}

#[async_trait]
impl PaymentProvider for Provider1Connector {
    fn name(&self) -> &str {
        PROVIDER1
    }

    async fn charge(&self, request: &PaymentRequest) -> Result<PaymentResult> {
        info!(
            provider = PROVIDER1,
            amount = %request.amount,
            currency = %request.currency,
            "Creating charge"
        );
        self.breaker.call(|| self.create_charge(request)).await
    }

    async fn find(&self, id: &str) -> Result<PaymentResult> {
        self.breaker.call(|| self.get_charge(id)).await
    }

    async fn refund(&self, id: &str, request: &RefundRequest) -> Result<PaymentResult> {
        info!(provider = PROVIDER1, id, amount = %request.amount, "Refunding charge");
        self.breaker.call(|| self.refund_charge(id, request)).await
    }

    fn breaker_snapshot(&self) -> Option<BreakerSnapshot> {
        Some(self.breaker.snapshot())
    }
}
