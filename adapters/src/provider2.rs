//! Provider 2 adapter ("transactions" API)

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
pub const PROVIDER2: &str = "provider2";

const STATUSES: StatusTable = StatusTable(&[
    ("paid", PaymentStatus::Success),
    ("failed", PaymentStatus::Refused),
    ("voided", PaymentStatus::Refunded),
]);

const REFUSALS: RefusalMessages = RefusalMessages {
    exceeds_charge: "Void amount is higher than transaction amount.",
    not_refundable: "Transaction cannot be voided.",
};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TransactionCard<'a> {
    number: &'a str,
    holder: &'a str,
    cvv: &'a str,
    /// `MM/YY`
    expiration: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    installment_number: Option<u8>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateTransaction<'a> {
    #[serde(with = "rust_decimal::serde::float")]
    amount: Decimal,
    currency: &'a str,
    statement_descriptor: &'a str,
    payment_type: PaymentMethodKind,
    card: TransactionCard<'a>,
}

impl<'a> From<&'a PaymentRequest> for CreateTransaction<'a> {
    fn from(request: &'a PaymentRequest) -> Self {
        let PaymentMethod::Card { card } = &request.payment_method;
        Self {
            amount: request.amount,
            currency: &request.currency,
            statement_descriptor: &request.description,
            payment_type: PaymentMethodKind::Card,
            card: TransactionCard {
                number: &card.number,
                holder: &card.holder_name,
                cvv: &card.cvv,
                expiration: card.expiration_date.short(),
                installment_number: card.installments,
            },
        }
    }
}

#[derive(Debug, Serialize)]
struct VoidTransaction {
    #[serde(with = "rust_decimal::serde::float")]
    amount: Decimal,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Transaction {
    id: String,
    date: DateTime<Utc>,
    status: String,
    #[serde(with = "rust_decimal::serde::float")]
    amount: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    original_amount: Decimal,
    currency: String,
    statement_descriptor: String,
    payment_type: PaymentMethodKind,
    card_id: String,
}

impl Transaction {
    fn into_result(self) -> Result<PaymentResult> {
        Ok(PaymentResult {
            status: STATUSES.resolve(PROVIDER2, &self.status)?,
            id: self.id,
            created_date: self.date,
            amount: self.amount,
            original_amount: self.original_amount,
            currency: self.currency,
            description: self.statement_descriptor,
            payment_method: self.payment_type,
            card_id: self.card_id,
            provider: None,
        })
    }
}

/// Provider 2 connector
pub struct Provider2Connector {
    http: ProviderHttp,
    breaker: CircuitBreaker,
}

impl Provider2Connector {
    /// Create new provider 2 connector with its own circuit breaker
    pub fn new(config: ProviderConfig, breaker: CircuitBreakerConfig) -> Result<Self> {
        Ok(Self {
            http: ProviderHttp::new(PROVIDER2, &config)?,
            breaker: CircuitBreaker::new(PROVIDER2, breaker),
        })
    }

    async fn create_transaction(&self, request: &PaymentRequest) -> Result<PaymentResult> {
        let transaction: Transaction = self
            .http
            .post("charge", &["transactions"], &CreateTransaction::from(request), None)
            .await?;

        let mut result = transaction.into_result()?;
        result.provider = Some(PROVIDER2.to_string());
        Ok(result)
    }

    async fn get_transaction(&self, id: &str) -> Result<PaymentResult> {
        let transaction: Transaction = self
            .http
            .get("find", &["transactions", id])
            .await?;
        transaction.into_result()
    }

    async fn void_transaction(&self, id: &str, request: &RefundRequest) -> Result<PaymentResult> {
        let body = VoidTransaction {
            amount: request.amount,
        };
        let transaction: Transaction = self
            .http
            .post("refund", &["void", id], &body, Some(&REFUSALS))
            .await?;
        transaction.into_result()
    }
}

#[async_trait]
impl PaymentProvider for Provider2Connector {
    fn name(&self) -> &str {
        PROVIDER2
    }

    async fn charge(&self, request: &PaymentRequest) -> Result<PaymentResult> {
        info!(
            provider = PROVIDER2,
            amount = %request.amount,
            currency = %request.currency,
            "Creating transaction"
        );
        self.breaker.call(|| self.create_transaction(request)).await
    }

    async fn find(&self, id: &str) -> Result<PaymentResult> {
        self.breaker.call(|| self.get_transaction(id)).await
    }

    async fn refund(&self, id: &str, request: &RefundRequest) -> Result<PaymentResult> {
        info!(provider = PROVIDER2, id, amount = %request.amount, "Voiding transaction");
        self.breaker.call(|| self.void_transaction(id, request)).await
    }

    fn breaker_snapshot(&self) -> Option<BreakerSnapshot> {
        Some(self.breaker.snapshot())
    }
}
