use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use payment_adapters::Error as PaymentError;
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error(transparent)]
    Payment(#[from] PaymentError),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        ApiError::Validation(errors.to_string())
    }
}

impl ResponseError for ApiError {
    fn error_response(&self) -> HttpResponse {
        let status_code = self.status_code();
        let error_message = match self {
            // provider message passed through unmodified
            ApiError::Payment(PaymentError::BadRequest { message, .. }) => message.clone(),
            _ => self.to_string(),
        };

        HttpResponse::build(status_code).json(json!({
            "error": {
                "code": status_code.as_u16(),
                "message": error_message,
                "type": self.error_type()
            }
        }))
    }

    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Payment(e) => match e {
                PaymentError::InvalidRequest(_)
                | PaymentError::RefundExceedsCharge { .. }
                | PaymentError::PaymentNotRefundable { .. }
                | PaymentError::BadRequest { .. } => StatusCode::BAD_REQUEST,
                PaymentError::PaymentNotFound => StatusCode::NOT_FOUND,
                PaymentError::UpstreamUnavailable | PaymentError::MaxRetriesExceeded { .. } => {
                    StatusCode::BAD_GATEWAY
                }
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl ApiError {
    pub fn error_type(&self) -> &'static str {
        match self {
            ApiError::Validation(_) => "validation_error",
            ApiError::Payment(e) => match e {
                PaymentError::InvalidRequest(_) => "validation_error",
                PaymentError::PaymentNotFound => "payment_not_found",
                PaymentError::RefundExceedsCharge { .. } => "refund_exceeds_charge",
                PaymentError::PaymentNotRefundable { .. } => "payment_not_refundable",
                PaymentError::BadRequest { .. } => "bad_request",
                PaymentError::UpstreamUnavailable => "upstream_unavailable",
                PaymentError::MaxRetriesExceeded { .. } => "max_retries_exceeded",
                _ => "internal_error",
            },
            ApiError::Internal(_) => "internal_error",
        }
    }
}
