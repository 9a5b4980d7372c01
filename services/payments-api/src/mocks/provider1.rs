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
pub struct CreateChargeBody {
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    pub currency: String,
    pub description: String,
    pub payment_method: ChargeMethodBody,
}

#[derive(Debug, Deserialize)]
pub struct ChargeMethodBody {
    #[serde(rename = "type")]
    pub kind: PaymentMethodKind,
    pub card: ChargeCardBody,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChargeCardBody {
    pub number: String,
    pub holder_name: String,
    pub cvv: String,
    pub expiration_date: String,
    pub installments: Option<u8>,
}

impl CreateChargeBody {
    fn validate(&self) -> Result<(), MockError> {
        let card = &self.payment_method.card;
        check(self.amount > Decimal::ZERO, "Amount must be positive")?;
        check(self.currency.len() == 3, "Invalid currency")?;
        check(self.description.chars().count() <= 255, "Description too long")?;
        check(all_digits(&card.number, 16), "Invalid card number")?;
        check(!card.holder_name.is_empty(), "Card holder name is required")?;
        check(all_digits(&card.cvv, 3), "Invalid CVV")?;
        check(expiration_like(&card.expiration_date, 4), "Invalid expiration date")?;
        check(
            card.installments.map_or(true, |n| (1..=12).contains(&n)),
            "Invalid installments",
        )
    }
}

#[derive(Debug, Deserialize)]
pub struct RefundChargeBody {
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Charge {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub status: &'static str,
    #[serde(with = "rust_decimal::serde::float")]
    pub original_amount: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub current_amount: Decimal,
    pub currency: String,
    pub description: String,
    pub payment_method: PaymentMethodKind,
    pub card_id: String,
}

/// Charges created on the mock, by id
#[derive(Debug, Default)]
pub struct ChargeStore {
    charges: Mutex<HashMap<String, Charge>>,
}

impl ChargeStore {
    pub fn create(&self, body: CreateChargeBody) -> Charge {
        // 777 simulates a card declined by the issuer
        let status = if body.amount == Decimal::from(777) {
            "failed"
        } else {
            "authorized"
        };

        let charge = Charge {
            id: Uuid::new_v4().to_string(),
            created_at: Utc::now(),
            status,
            original_amount: body.amount,
            current_amount: body.amount,
            currency: body.currency,
            description: body.description,
            payment_method: body.payment_method.kind,
            card_id: Uuid::new_v4().to_string(),
        };

        self.charges.lock().insert(charge.id.clone(), charge.clone());
        charge
    }

    pub fn get(&self, id: &str) -> Result<Charge, MockError> {
        self.charges
            .lock()
            .get(id)
            .cloned()
            .ok_or_else(|| MockError::NotFound("Charge not found.".to_string()))
    }

    pub fn refund(&self, id: &str, amount: Decimal) -> Result<Charge, MockError> {
        let mut charges = self.charges.lock();
        let charge = charges
            .get_mut(id)
            .ok_or_else(|| MockError::NotFound("Charge not found.".to_string()))?;

        if charge.status != "authorized" {
            return Err(MockError::BadRequest("Charge cannot be refunded.".to_string()));
        }
        if amount > charge.current_amount {
            return Err(MockError::BadRequest(
                "Refund amount is greater than the charge.".to_string(),
            ));
        }

        charge.status = "refunded";
        charge.current_amount = amount;
        Ok(charge.clone())
    }
}

async fn create_charge(
    body: web::Json<CreateChargeBody>,
    state: web::Data<MockState>,
) -> Result<HttpResponse, MockError> {
    let body = body.into_inner();
    body.validate()?;
    state.behavior.simulate().await?;

    let charge = state.provider1.create(body);
    debug!(id = %charge.id, status = charge.status, "provider1 mock: charge created");
    Ok(HttpResponse::Created().json(charge))
}

async fn get_charge(
    path: web::Path<String>,
    state: web::Data<MockState>,
) -> Result<HttpResponse, MockError> {
    let charge = state.provider1.get(&path.into_inner())?;
    Ok(HttpResponse::Ok().json(charge))
}

async fn refund_charge(
    path: web::Path<String>,
    body: web::Json<RefundChargeBody>,
    state: web::Data<MockState>,
) -> Result<HttpResponse, MockError> {
    check(body.amount > Decimal::ZERO, "Amount must be positive")?;
    let charge = state.provider1.refund(&path.into_inner(), body.amount)?;
    Ok(HttpResponse::Created().json(charge))
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/charges", web::post().to(create_charge))
        .route("/charges/{id}", web::get().to(get_charge))
        .route("/refund/{id}", web::post().to(refund_charge));
}
