use super::{all_digits, check, expiration_like, MockError, MockState};
use actix_web::{web, HttpResponse};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use payment_adapters::PaymentMethodKind;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTransactionBody {
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    pub currency: String,
    pub statement_descriptor: String,
    pub payment_type: PaymentMethodKind,
    pub card: TransactionCardBody,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionCardBody {
    pub number: String,
    pub holder: String,
    pub cvv: String,
    /// `MM/YY`
    pub expiration: String,
    pub installment_number: Option<u8>,
}

impl CreateTransactionBody {
    fn validate(&self) -> Result<(), MockError> {
        check(self.amount > Decimal::ZERO, "Amount must be positive")?;
        check(self.currency.len() == 3, "Invalid currency")?;
        check(
            self.statement_descriptor.chars().count() <= 255,
            "Statement descriptor too long",
        )?;
        check(all_digits(&self.card.number, 16), "Invalid card number")?;
        check(!self.card.holder.is_empty(), "Card holder name is required")?;
        check(all_digits(&self.card.cvv, 3), "Invalid CVV")?;
        check(expiration_like(&self.card.expiration, 2), "Invalid expiration date")?;
        check(
            self.card
                .installment_number
                .map_or(true, |n| (1..=12).contains(&n)),
            "Invalid installment number",
        )
    }
}

#[derive(Debug, Deserialize)]
pub struct VoidTransactionBody {
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: String,
    pub date: DateTime<Utc>,
    pub status: &'static str,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub original_amount: Decimal,
    pub currency: String,
    pub statement_descriptor: String,
    pub payment_type: PaymentMethodKind,
    pub card_id: String,
}

/// Transactions created on the mock, by id
#[derive(Debug, Default)]
pub struct TransactionStore {
    transactions: Mutex<HashMap<String, Transaction>>,
}

impl TransactionStore {
    pub fn create(&self, body: CreateTransactionBody) -> Transaction {
        let status = if body.amount == Decimal::from(777) {
            "failed"
        } else {
            "paid"
        };

        let transaction = Transaction {
            id: Uuid::new_v4().to_string(),
            date: Utc::now(),
            status,
            amount: body.amount,
            original_amount: body.amount,
            currency: body.currency,
            statement_descriptor: body.statement_descriptor,
            payment_type: body.payment_type,
            card_id: Uuid::new_v4().to_string(),
        };

        self.transactions
            .lock()
            .insert(transaction.id.clone(), transaction.clone());
        transaction
    }

    pub fn get(&self, id: &str) -> Result<Transaction, MockError> {
        self.transactions
            .lock()
            .get(id)
            .cloned()
            .ok_or_else(|| MockError::NotFound("Transaction not found.".to_string()))
    }

    pub fn void(&self, id: &str, amount: Decimal) -> Result<Transaction, MockError> {
        let mut transactions = self.transactions.lock();
        let transaction = transactions
            .get_mut(id)
            .ok_or_else(|| MockError::NotFound("Transaction not found.".to_string()))?;

        if transaction.status != "paid" {
            return Err(MockError::BadRequest(
                "Transaction cannot be voided.".to_string(),
            ));
        }
        if amount > transaction.amount {
            return Err(MockError::BadRequest(
                "Void amount is higher than transaction amount.".to_string(),
            ));
        }

        transaction.status = "voided";
        transaction.amount = amount;
        Ok(transaction.clone())
    }
}

async fn create_transaction(
    body: web::Json<CreateTransactionBody>,
    state: web::Data<MockState>,
) -> Result<HttpResponse, MockError> {
    let body = body.into_inner();
    body.validate()?;
    state.behavior.simulate().await?;

    let transaction = state.provider2.create(body);
    debug!(id = %transaction.id, status = transaction.status, "provider2 mock: transaction created");
    Ok(HttpResponse::Created().json(transaction))
}

async fn get_transaction(
    path: web::Path<String>,
    state: web::Data<MockState>,
) -> Result<HttpResponse, MockError> {
    let transaction = state.provider2.get(&path.into_inner())?;
    Ok(HttpResponse::Ok().json(transaction))
}

async fn void_transaction(
    path: web::Path<String>,
    body: web::Json<VoidTransactionBody>,
    state: web::Data<MockState>,
) -> Result<HttpResponse, MockError> {
    check(body.amount > Decimal::ZERO, "Amount must be positive")?;
    let transaction = state.provider2.void(&path.into_inner(), body.amount)?;
    Ok(HttpResponse::Created().json(transaction))
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/transactions", web::post().to(create_transaction))
        .route("/transactions/{id}", web::get().to(get_transaction))
        .route("/void/{id}", web::post().to(void_transaction));
}
