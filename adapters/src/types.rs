//! Canonical payment model shared by every adapter

use crate::{Error, Result};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Canonical payment status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    /// Charge authorized/paid by the provider
    Success,
    /// Charge refused by the provider
    Refused,
    /// Charge refunded or voided
    Refunded,
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PaymentStatus::Success => write!(f, "success"),
            PaymentStatus::Refused => write!(f, "refused"),
            PaymentStatus::Refunded => write!(f, "refunded"),
        }
    }
}

/// Fixed lookup table from a provider's native status vocabulary to [`PaymentStatus`]
#[derive(Debug, Clone, Copy)]
pub struct StatusTable(pub &'static [(&'static str, PaymentStatus)]);

impl StatusTable {
    /// Resolve a native status. Unknown values are a provider contract violation.
    pub fn resolve(&self, provider: &str, native: &str) -> Result<PaymentStatus> {
        self.0
            .iter()
            .find(|(name, _)| *name == native)
            .map(|(_, status)| *status)
            .ok_or_else(|| Error::UnmappedStatus {
                provider: provider.to_string(),
                status: native.to_string(),
            })
    }
}

/// Payment method tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethodKind {
    /// Credit/debit card
    Card,
}

impl fmt::Display for PaymentMethodKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PaymentMethodKind::Card => write!(f, "card"),
        }
    }
}

/// Card expiration date, `MM/YYYY` on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CardExpiration {
    month: u8,
    year: u16,
}

impl CardExpiration {
    /// Build an expiration date, rejecting months outside 1..=12
    pub fn new(month: u8, year: u16) -> Result<Self> {
        if !(1..=12).contains(&month) || !(1000..=9999).contains(&year) {
            return Err(Error::InvalidRequest(format!(
                "invalid card expiration {:02}/{}",
                month, year
            )));
        }
        Ok(Self { month, year })
    }

    /// Month (1-12)
    pub fn month(&self) -> u8 {
        self.month
    }

    /// Four-digit year
    pub fn year(&self) -> u16 {
        self.year
    }

    /// Short form `MM/YY`
    pub fn short(&self) -> String {
        format!("{:02}/{:02}", self.month, self.year % 100)
    }
}

impl fmt::Display for CardExpiration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}/{:04}", self.month, self.year)
    }
}

impl FromStr for CardExpiration {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || Error::InvalidRequest(format!("invalid card expiration '{}'", s));
        let (month, year) = s.split_once('/').ok_or_else(invalid)?;
        let digits = |part: &str, len: usize| {
            part.len() == len && part.bytes().all(|b| b.is_ascii_digit())
        };
        if !digits(month, 2) || !digits(year, 4) {
            return Err(invalid());
        }
        let month = month.parse::<u8>().map_err(|_| invalid())?;
        let year = year.parse::<u16>().map_err(|_| invalid())?;
        Self::new(month, year)
    }
}

impl TryFrom<String> for CardExpiration {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<CardExpiration> for String {
    fn from(value: CardExpiration) -> Self {
        value.to_string()
    }
}

/// Card details passed through to the provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    /// 16-digit card number
    pub number: String,
    /// Card holder name
    pub holder_name: String,
    /// 3-digit CVV
    pub cvv: String,
    /// Expiration date
    pub expiration_date: CardExpiration,
    /// Installments (1-12)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub installments: Option<u8>,
}

/// Payment method (discriminated by `type`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum PaymentMethod {
    /// Card payment
    Card {
        /// Card details
        card: Card,
    },
}

impl PaymentMethod {
    /// Tag of this method
    pub fn kind(&self) -> PaymentMethodKind {
        match self {
            PaymentMethod::Card { .. } => PaymentMethodKind::Card,
        }
    }
}

/// Charge request, already validated by the caller-facing layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequest {
    /// Amount to charge
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    /// ISO 4217 currency code
    pub currency: String,
    /// Free-text description (max 255 chars)
    pub description: String,
    /// Payment method
    pub payment_method: PaymentMethod,
}

/// Refund request for an existing payment
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RefundRequest {
    /// Amount to refund
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
}

/// Canonical payment result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentResult {
    /// Provider-assigned payment ID
    pub id: String,
    /// Created at
    pub created_date: DateTime<Utc>,
    /// Canonical status
    pub status: PaymentStatus,
    /// Current amount
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    /// Original charged amount
    #[serde(with = "rust_decimal::serde::float")]
    pub original_amount: Decimal,
    /// Currency
    pub currency: String,
    /// Description
    pub description: String,
    /// Payment method tag
    pub payment_method: PaymentMethodKind,
    /// Provider's card reference
    pub card_id: String,
    /// Provider that serviced the charge (charge responses only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
}
