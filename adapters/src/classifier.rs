//! Classification of provider error answers into canonical error kinds

use crate::Error;
use serde::Deserialize;

/// Structured error body returned by providers
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderErrorBody {
    /// Human readable message
    #[serde(default)]
    pub message: String,
    /// Error label (e.g. "Bad Request")
    #[serde(default)]
    pub error: Option<String>,
    /// Status code echoed by the provider
    #[serde(default)]
    pub status_code: Option<u16>,
}

/// Refusal messages a provider uses on its refund endpoint
#[derive(Debug, Clone, Copy)]
pub struct RefusalMessages {
    /// Refund amount above the charged amount
    pub exceeds_charge: &'static str,
    /// Charge in a non-refundable state
    pub not_refundable: &'static str,
}

impl RefusalMessages {
    fn reason(&self, message: &str) -> Option<BadRequestReason> {
        let message = normalize(message);
        if message == normalize(self.exceeds_charge) {
            Some(BadRequestReason::RefundExceedsCharge)
        } else if message == normalize(self.not_refundable) {
            Some(BadRequestReason::NotRefundable)
        } else {
            None
        }
    }
}

/// Reason attached to a 4xx answer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BadRequestReason {
    /// Refund amount is greater than the charge
    RefundExceedsCharge,
    /// Charge cannot be refunded
    NotRefundable,
    /// Anything else, message kept verbatim
    Other(String),
}

/// Canonical error class
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorClass {
    /// Payment unknown to the provider
    NotFound,
    /// Client-side refusal
    BadRequest(BadRequestReason),
    /// Provider-side failure
    ServerFailure,
}

/// Classify a non-success provider answer.
///
/// `refusals` is only given on refund calls; other operations never map a 4xx
/// onto a refund-specific reason. 408 and 429 are availability failures, not
/// refusals.
pub fn classify(
    status_code: u16,
    body: Option<&ProviderErrorBody>,
    refusals: Option<&RefusalMessages>,
) -> ErrorClass {
    match status_code {
        404 => ErrorClass::NotFound,
        // throttling and request timeouts say nothing about the payment
        408 | 429 => ErrorClass::ServerFailure,
        400..=499 => {
            let message = body.map(|b| b.message.as_str()).unwrap_or_default();
            let reason = refusals
                .and_then(|r| r.reason(message))
                .unwrap_or_else(|| BadRequestReason::Other(message.to_string()));
            ErrorClass::BadRequest(reason)
        }
        _ => ErrorClass::ServerFailure,
    }
}

impl ErrorClass {
    /// Turn the class into the adapter error for `provider`
    pub fn into_error(self, provider: &str, status_code: u16, message: String) -> Error {
        let provider = provider.to_string();
        match self {
            ErrorClass::NotFound => Error::NotFound { provider, message },
            ErrorClass::BadRequest(BadRequestReason::RefundExceedsCharge) => {
                Error::RefundExceedsCharge { provider }
            }
            ErrorClass::BadRequest(BadRequestReason::NotRefundable) => {
                Error::PaymentNotRefundable { provider }
            }
            ErrorClass::BadRequest(BadRequestReason::Other(reason)) => Error::BadRequest {
                provider,
                status_code,
                message: if reason.is_empty() { message } else { reason },
            },
            ErrorClass::ServerFailure => Error::ProviderUnavailable {
                provider,
                status_code,
                message,
            },
        }
    }
}

fn normalize(message: &str) -> String {
    message.trim().trim_end_matches('.').trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const REFUSALS: RefusalMessages = RefusalMessages {
        exceeds_charge: "Refund amount is greater than the charge.",
        not_refundable: "Charge cannot be refunded.",
    };

    fn body(message: &str) -> ProviderErrorBody {
        ProviderErrorBody {
            message: message.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_refusal_messages_are_typed() {
        assert_eq!(
            classify(400, Some(&body("Refund amount is greater than the charge.")), Some(&REFUSALS)),
            ErrorClass::BadRequest(BadRequestReason::RefundExceedsCharge)
        );
        // trailing period and case are not significant
        assert_eq!(
            classify(400, Some(&body("charge cannot be refunded")), Some(&REFUSALS)),
            ErrorClass::BadRequest(BadRequestReason::NotRefundable)
        );
    }

    #[test]
    fn test_unknown_bad_request_passes_message_through() {
        assert_eq!(
            classify(400, Some(&body("amount must be positive")), Some(&REFUSALS)),
            ErrorClass::BadRequest(BadRequestReason::Other("amount must be positive".to_string()))
        );
        assert_eq!(
            classify(400, None, Some(&REFUSALS)),
            ErrorClass::BadRequest(BadRequestReason::Other(String::new()))
        );
    }

    #[test]
    fn test_refusals_only_apply_when_given() {
        assert_eq!(
            classify(400, Some(&body("Charge cannot be refunded.")), None),
            ErrorClass::BadRequest(BadRequestReason::Other(
                "Charge cannot be refunded.".to_string()
            ))
        );
    }

    #[test]
    fn test_into_error() {
        let err = ErrorClass::BadRequest(BadRequestReason::NotRefundable).into_error(
            "provider2",
            400,
            String::new(),
        );
        assert!(matches!(err, Error::PaymentNotRefundable { ref provider } if provider == "provider2"));

        let err = ErrorClass::ServerFailure.into_error("provider1", 503, "down".to_string());
        assert!(matches!(err, Error::ProviderUnavailable { status_code: 503, .. }));
        assert!(err.is_transient());
    }

    #[test]
    fn test_throttling_is_a_server_failure() {
        for status in [408, 429] {
            let class = classify(status, Some(&body("Too Many Requests")), Some(&REFUSALS));
            assert_eq!(class, ErrorClass::ServerFailure);
            assert!(class.into_error("provider1", status, "slow down".to_string()).is_transient());
        }
    }

    proptest! {
        #[test]
        fn not_found_is_only_404(status in 100u16..600) {
            let class = classify(status, None, Some(&REFUSALS));
            prop_assert_eq!(class == ErrorClass::NotFound, status == 404);
        }

        #[test]
        fn client_statuses_are_refusals(status in 400u16..500, message in ".*") {
            prop_assume!(![404, 408, 429].contains(&status));
            let class = classify(status, Some(&body(&message)), Some(&REFUSALS));
            prop_assert!(matches!(class, ErrorClass::BadRequest(_)));
        }

        #[test]
        fn server_statuses_are_failures(status in 500u16..600, message in ".*") {
            let class = classify(status, Some(&body(&message)), Some(&REFUSALS));
            prop_assert_eq!(class, ErrorClass::ServerFailure);
        }
    }
}
