//! The generic payment response and its completion hook.

use std::fmt;

use crate::convert;
use crate::errors::{Error, Result};
use crate::session::{PaymentCompletion, SessionError};
use crate::types::{
    APPLE_PAY_METHOD_IDENTIFIER, ApplePayErrorItem, ApplePayPayment, PaymentAddress,
    PaymentAuthorizationResult, ProtocolVersion, SessionStatus,
};

type CompleteFn = Box<dyn Fn(PaymentCompletion) -> std::result::Result<(), SessionError> + Send + Sync>;

/// Issues the final, version-appropriate `completePayment` call. Type-erased
/// so the response does not carry the session type.
pub struct PaymentCompleter {
    version: ProtocolVersion,
    complete: CompleteFn,
}

impl PaymentCompleter {
    pub(crate) fn new(version: ProtocolVersion, complete: CompleteFn) -> Self {
        PaymentCompleter { version, complete }
    }

    fn status_for(result: &str) -> Result<SessionStatus> {
        match result {
            "success" => Ok(SessionStatus::Success),
            "fail" | "unknown" => Ok(SessionStatus::Failure),
            // Explicit fallback policy: an empty result reports success.
            "" => Ok(SessionStatus::Success),
            other => Err(Error::UnknownStatus(other.to_string())),
        }
    }

    fn complete(&self, result: &str, errors: Option<Vec<ApplePayErrorItem>>) -> Result<()> {
        let status = Self::status_for(result)?;
        let completion = match self.version {
            ProtocolVersion::V3 => {
                let errors = match status {
                    SessionStatus::Success => None,
                    SessionStatus::Failure => {
                        Some(errors.unwrap_or_else(|| vec![ApplePayErrorItem::unknown()]))
                    }
                };
                PaymentCompletion::Result(PaymentAuthorizationResult { status, errors })
            }
            _ => PaymentCompletion::Legacy(status),
        };
        (self.complete)(completion)?;
        Ok(())
    }
}

/// Nested details of the generic response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResponseDetails {
    pub billing_address: PaymentAddress,
}

/// The generic payment response resolved from a vendor authorization.
pub struct PaymentResponse {
    pub method_name: String,
    pub details: ResponseDetails,
    pub payer_name: String,
    pub payer_email: String,
    pub payer_phone: String,
    pub shipping_address: PaymentAddress,
    /// Not reported back on this path; always empty.
    pub shipping_option: String,
    /// The raw vendor payload, kept for diagnostics.
    pub apple_pay_raw: ApplePayPayment,
    completer: PaymentCompleter,
}

impl PaymentResponse {
    pub(crate) fn from_payment(payment: ApplePayPayment, completer: PaymentCompleter) -> Self {
        let billing = payment.billing_contact.clone().unwrap_or_default();
        let shipping = payment.shipping_contact.clone().unwrap_or_default();

        let payer_name = format!(
            "{} {}",
            billing.given_name.clone().unwrap_or_default(),
            billing.family_name.clone().unwrap_or_default()
        );

        PaymentResponse {
            method_name: APPLE_PAY_METHOD_IDENTIFIER.to_string(),
            details: ResponseDetails {
                billing_address: convert::payment_address(&billing),
            },
            payer_name,
            payer_email: shipping.email_address.clone().unwrap_or_default(),
            payer_phone: shipping.phone_number.clone().unwrap_or_default(),
            shipping_address: convert::payment_address(&shipping),
            shipping_option: String::new(),
            apple_pay_raw: payment,
            completer,
        }
    }

    /// Acknowledges the payment outcome to the vendor.
    ///
    /// Accepts `"success"`, `"fail"`, `"unknown"` or `""` (treated as
    /// success); anything else fails with [`Error::UnknownStatus`]. At version
    /// 3 a failure carries a default one-element `unknown` error list; use
    /// [`PaymentResponse::complete_with_errors`] to supply explicit ones.
    pub fn complete(&self, result: &str) -> Result<()> {
        self.completer.complete(result, None)
    }

    /// Like [`PaymentResponse::complete`], with an explicit error list for
    /// version 3 failure results.
    pub fn complete_with_errors(
        &self,
        result: &str,
        errors: Vec<ApplePayErrorItem>,
    ) -> Result<()> {
        self.completer.complete(result, Some(errors))
    }
}

impl fmt::Debug for PaymentResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PaymentResponse")
            .field("method_name", &self.method_name)
            .field("details", &self.details)
            .field("payer_name", &self.payer_name)
            .field("payer_email", &self.payer_email)
            .field("payer_phone", &self.payer_phone)
            .field("shipping_address", &self.shipping_address)
            .field("shipping_option", &self.shipping_option)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;

    fn recording_completer(
        version: ProtocolVersion,
    ) -> (PaymentCompleter, Arc<Mutex<Vec<PaymentCompletion>>>) {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let recorded = Arc::clone(&calls);
        let completer = PaymentCompleter::new(
            version,
            Box::new(move |completion| {
                recorded.lock().unwrap().push(completion);
                Ok(())
            }),
        );
        (completer, calls)
    }

    #[test]
    fn bogus_result_is_rejected_without_a_vendor_call() {
        let (completer, calls) = recording_completer(ProtocolVersion::V3);
        let err = completer.complete("bogus", None).unwrap_err();
        assert!(matches!(err, Error::UnknownStatus(s) if s == "bogus"));
        assert!(calls.lock().unwrap().is_empty());
    }

    #[test]
    fn empty_result_resolves_via_the_success_path() {
        let (completer, calls) = recording_completer(ProtocolVersion::V2);
        completer.complete("", None).unwrap();
        assert_eq!(
            calls.lock().unwrap().as_slice(),
            &[PaymentCompletion::Legacy(SessionStatus::Success)]
        );
    }

    #[test]
    fn v3_failure_carries_default_unknown_error() {
        let (completer, calls) = recording_completer(ProtocolVersion::V3);
        completer.complete("unknown", None).unwrap();
        assert_eq!(
            calls.lock().unwrap().as_slice(),
            &[PaymentCompletion::Result(PaymentAuthorizationResult {
                status: SessionStatus::Failure,
                errors: Some(vec![ApplePayErrorItem::unknown()]),
            })]
        );
    }

    #[test]
    fn v3_failure_prefers_supplied_errors() {
        let (completer, calls) = recording_completer(ProtocolVersion::V3);
        let supplied = vec![ApplePayErrorItem {
            code: "shippingContactInvalid".to_string(),
            contact_field: Some("postalAddress".to_string()),
            message: Some("Bad postal code".to_string()),
        }];
        completer.complete("fail", Some(supplied.clone())).unwrap();
        assert_eq!(
            calls.lock().unwrap().as_slice(),
            &[PaymentCompletion::Result(PaymentAuthorizationResult {
                status: SessionStatus::Failure,
                errors: Some(supplied),
            })]
        );
    }

    #[test]
    fn v3_success_carries_no_error_list() {
        let (completer, calls) = recording_completer(ProtocolVersion::V3);
        completer.complete("success", None).unwrap();
        assert_eq!(
            calls.lock().unwrap().as_slice(),
            &[PaymentCompletion::Result(PaymentAuthorizationResult {
                status: SessionStatus::Success,
                errors: None,
            })]
        );
    }

    #[test]
    fn legacy_versions_pass_the_bare_status() {
        let (completer, calls) = recording_completer(ProtocolVersion::V1);
        completer.complete("fail", None).unwrap();
        assert_eq!(
            calls.lock().unwrap().as_slice(),
            &[PaymentCompletion::Legacy(SessionStatus::Failure)]
        );
    }
}
