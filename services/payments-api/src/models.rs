use crate::errors::ApiError;
use lazy_static::lazy_static;
use payment_adapters::{
    BreakerSnapshot, Card, CardExpiration, PaymentMethod, PaymentMethodKind, PaymentRequest,
    RefundRequest,
};
use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

lazy_static! {
    static ref CURRENCY_RE: Regex = Regex::new(r"^[A-Z]{3}$").expect("valid regex");
    static ref CARD_NUMBER_RE: Regex = Regex::new(r"^\d{16}$").expect("valid regex");
    static ref CVV_RE: Regex = Regex::new(r"^\d{3}$").expect("valid regex");
}

fn positive_amount(amount: &Decimal) -> Result<(), ValidationError> {
    if amount.is_sign_positive() && !amount.is_zero() {
        Ok(())
    } else {
        Err(ValidationError::new("amount_not_positive"))
    }
}

fn valid_expiration(value: &str) -> Result<(), ValidationError> {
    value
        .parse::<CardExpiration>()
        .map(|_| ())
        .map_err(|_| ValidationError::new("invalid_expiration_date"))
}

/// Charge request body
#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreatePaymentBody {
    #[serde(with = "rust_decimal::serde::float")]
    #[validate(custom = "positive_amount")]
    pub amount: Decimal,

    #[validate(regex(path = "CURRENCY_RE", message = "currency must be a 3-letter ISO code"))]
    pub currency: String,

    #[validate(length(max = 255))]
    pub description: String,

    #[validate]
    pub payment_method: PaymentMethodBody,
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct PaymentMethodBody {
    #[serde(rename = "type")]
    pub kind: PaymentMethodKind,

    #[validate]
    pub card: CardBody,
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CardBody {
    #[validate(regex(path = "CARD_NUMBER_RE", message = "card number must have 16 digits"))]
    pub number: String,

    #[validate(length(min = 1, message = "card holder name is required"))]
    pub holder_name: String,

    #[validate(regex(path = "CVV_RE", message = "cvv must have 3 digits"))]
    pub cvv: String,

    /// `MM/YYYY`
    #[validate(custom = "valid_expiration")]
    pub expiration_date: String,

    #[validate(range(min = 1, max = 12))]
    pub installments: Option<u8>,
}

impl TryFrom<CreatePaymentBody> for PaymentRequest {
    type Error = ApiError;

    fn try_from(body: CreatePaymentBody) -> Result<Self, Self::Error> {
        body.validate()?;

        let card = body.payment_method.card;
        let expiration_date = card
            .expiration_date
            .parse()
            .map_err(|e: payment_adapters::Error| ApiError::Validation(e.to_string()))?;

        Ok(PaymentRequest {
            amount: body.amount,
            currency: body.currency,
            description: body.description,
            payment_method: match body.payment_method.kind {
                PaymentMethodKind::Card => PaymentMethod::Card {
                    card: Card {
                        number: card.number,
                        holder_name: card.holder_name,
                        cvv: card.cvv,
                        expiration_date,
                        installments: card.installments,
                    },
                },
            },
        })
    }
}

/// Refund request body
#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct RefundBody {
    #[serde(with = "rust_decimal::serde::float")]
    #[validate(custom = "positive_amount")]
    pub amount: Decimal,
}

impl TryFrom<RefundBody> for RefundRequest {
    type Error = ApiError;

    fn try_from(body: RefundBody) -> Result<Self, Self::Error> {
        body.validate()?;
        Ok(RefundRequest {
            amount: body.amount,
        })
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub status: String,
    pub service: String,
    pub version: String,
    pub uptime_seconds: u64,
}

#[derive(Debug, Serialize)]
pub struct ProvidersStatusResponse {
    pub providers: Vec<BreakerSnapshot>,
}
