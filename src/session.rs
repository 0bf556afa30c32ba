//! The vendor session boundary.
//!
//! The adapter never touches `ApplePaySession` globals directly. Instead it is
//! handed a [`SessionDriver`] — the capability probe plus session factory —
//! and owns the opaque [`ApplePaySession`] handle the driver opens for it.
//! Version-dependent completion-call shapes are closed enums with an `Update`
//! (version 3) and a `Legacy` (versions 1/2) variant each, so every dispatch
//! on the negotiated version is exhaustive.

use std::future::Future;

use crate::types::{
    ApplePayLineItem, ApplePayPayment, ApplePayPaymentContact, ApplePayPaymentMethod,
    ApplePayPaymentRequest, ApplePayShippingMethod, MerchantSession, PaymentAuthorizationResult,
    PaymentMethodUpdate, ProtocolVersion, SessionStatus, ShippingContactUpdate,
    ShippingMethodUpdate,
};

/// Error raised by the externally-implemented vendor session.
#[derive(Debug, Clone, thiserror::Error)]
#[error("payment session error: {0}")]
pub struct SessionError(pub String);

impl SessionError {
    pub fn new(message: impl Into<String>) -> Self {
        SessionError(message.into())
    }
}

/// Completion shape for a payment-method selection.
#[derive(Debug, Clone, PartialEq)]
pub enum PaymentMethodCompletion {
    /// Version 3: a single combined update record.
    Update(PaymentMethodUpdate),
    /// Versions 1/2: the two values passed positionally.
    Legacy {
        new_total: Option<ApplePayLineItem>,
        new_line_items: Vec<ApplePayLineItem>,
    },
}

/// Completion shape for a shipping-contact selection.
#[derive(Debug, Clone, PartialEq)]
pub enum ShippingContactCompletion {
    Update(ShippingContactUpdate),
    Legacy {
        status: SessionStatus,
        new_shipping_methods: Vec<ApplePayShippingMethod>,
        new_total: Option<ApplePayLineItem>,
        new_line_items: Vec<ApplePayLineItem>,
    },
}

/// Completion shape for a shipping-method selection.
#[derive(Debug, Clone, PartialEq)]
pub enum ShippingMethodCompletion {
    Update(ShippingMethodUpdate),
    /// The legacy rejection path carries no values at all; both lists stay
    /// unset.
    Legacy {
        status: SessionStatus,
        new_total: Option<ApplePayLineItem>,
        new_line_items: Option<Vec<ApplePayLineItem>>,
    },
}

/// Completion shape for the final payment acknowledgment.
#[derive(Debug, Clone, PartialEq)]
pub enum PaymentCompletion {
    /// Version 3: a structured authorization result.
    Result(PaymentAuthorizationResult),
    /// Versions 1/2: the bare status constant.
    Legacy(SessionStatus),
}

/// A vendor session event. The host pumps these into the adapter strictly in
/// the order the vendor emitted them.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    ValidateMerchant { validation_url: String },
    PaymentMethodSelected { payment_method: ApplePayPaymentMethod },
    ShippingContactSelected { shipping_contact: ApplePayPaymentContact },
    ShippingMethodSelected { shipping_method: ApplePayShippingMethod },
    PaymentAuthorized { payment: ApplePayPayment },
    Cancelled,
}

/// The opaque vendor session handle.
///
/// Exclusively owned by one adapter instance, which is responsible for
/// beginning and aborting it. All calls are synchronous acknowledgments, the
/// way the vendor API exposes them.
pub trait ApplePaySession: Send {
    fn begin(&mut self) -> Result<(), SessionError>;

    fn abort(&mut self) -> Result<(), SessionError>;

    fn complete_merchant_validation(
        &mut self,
        merchant_session: MerchantSession,
    ) -> Result<(), SessionError>;

    fn complete_payment_method_selection(
        &mut self,
        completion: PaymentMethodCompletion,
    ) -> Result<(), SessionError>;

    fn complete_shipping_contact_selection(
        &mut self,
        completion: ShippingContactCompletion,
    ) -> Result<(), SessionError>;

    fn complete_shipping_method_selection(
        &mut self,
        completion: ShippingMethodCompletion,
    ) -> Result<(), SessionError>;

    fn complete_payment(&mut self, completion: PaymentCompletion) -> Result<(), SessionError>;
}

/// Capability probe and session factory for the vendor surface.
///
/// Injected at adapter construction so capability detection never reads
/// ambient global state.
pub trait SessionDriver {
    type Session: ApplePaySession + 'static;

    /// Whether the vendor surface supports the given protocol version.
    fn supports_version(&self, version: u8) -> bool;

    /// Vendor active-card capability check for the given merchant.
    fn can_make_payments_with_active_card(
        &self,
        merchant_identifier: &str,
    ) -> impl Future<Output = bool> + Send;

    /// Open a vendor session from the negotiated version and the built
    /// session-configuration record.
    fn start_session(
        &self,
        version: ProtocolVersion,
        request: ApplePayPaymentRequest,
    ) -> Result<Self::Session, SessionError>;

    /// Highest mutually supported protocol version, capped at 3. Probed
    /// exactly once, at adapter construction.
    fn negotiate_version(&self) -> ProtocolVersion {
        if self.supports_version(3) {
            ProtocolVersion::V3
        } else if self.supports_version(2) {
            ProtocolVersion::V2
        } else {
            ProtocolVersion::V1
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NullSession;

    impl ApplePaySession for NullSession {
        fn begin(&mut self) -> Result<(), SessionError> {
            Ok(())
        }
        fn abort(&mut self) -> Result<(), SessionError> {
            Ok(())
        }
        fn complete_merchant_validation(
            &mut self,
            _merchant_session: MerchantSession,
        ) -> Result<(), SessionError> {
            Ok(())
        }
        fn complete_payment_method_selection(
            &mut self,
            _completion: PaymentMethodCompletion,
        ) -> Result<(), SessionError> {
            Ok(())
        }
        fn complete_shipping_contact_selection(
            &mut self,
            _completion: ShippingContactCompletion,
        ) -> Result<(), SessionError> {
            Ok(())
        }
        fn complete_shipping_method_selection(
            &mut self,
            _completion: ShippingMethodCompletion,
        ) -> Result<(), SessionError> {
            Ok(())
        }
        fn complete_payment(
            &mut self,
            _completion: PaymentCompletion,
        ) -> Result<(), SessionError> {
            Ok(())
        }
    }

    struct Probe {
        max_version: u8,
    }

    impl SessionDriver for Probe {
        type Session = NullSession;

        fn supports_version(&self, version: u8) -> bool {
            version <= self.max_version
        }

        fn can_make_payments_with_active_card(
            &self,
            _merchant_identifier: &str,
        ) -> impl Future<Output = bool> + Send {
            std::future::ready(false)
        }

        fn start_session(
            &self,
            _version: ProtocolVersion,
            _request: ApplePayPaymentRequest,
        ) -> Result<Self::Session, SessionError> {
            Ok(NullSession)
        }
    }

    #[test]
    fn negotiates_highest_supported_version() {
        assert_eq!(
            Probe { max_version: 5 }.negotiate_version(),
            ProtocolVersion::V3
        );
        assert_eq!(
            Probe { max_version: 3 }.negotiate_version(),
            ProtocolVersion::V3
        );
        assert_eq!(
            Probe { max_version: 2 }.negotiate_version(),
            ProtocolVersion::V2
        );
        assert_eq!(
            Probe { max_version: 1 }.negotiate_version(),
            ProtocolVersion::V1
        );
        assert_eq!(
            Probe { max_version: 0 }.negotiate_version(),
            ProtocolVersion::V1
        );
    }
}
