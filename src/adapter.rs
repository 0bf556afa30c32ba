//! The Payment Request adapter over an Apple Pay session.
//!
//! [`PaymentRequest`] is the single component that speaks both contracts. At
//! construction it builds the vendor session-configuration record from the
//! generic method-data/details/options triple, negotiates the protocol
//! version through the injected [`SessionDriver`], and opens the session.
//! From then on the host pumps vendor events through
//! [`PaymentRequest::handle_session_event`], strictly in emission order; the
//! adapter translates them into registered merchant callbacks (or applies the
//! built-in defaults) and turns callback results back into
//! version-appropriate completion calls.
//!
//! The request lifecycle itself is one outstanding future at a time:
//! [`PaymentRequest::show`] begins the session and arms a fresh pending
//! operation, a `paymentauthorized` event resolves it with a
//! [`PaymentResponse`], a `cancel` event rejects it with the abort-kind
//! [`Error::Cancelled`], and [`PaymentRequest::restart`] re-arms without
//! re-beginning the session. Settlement consumes the pending slot, so a stale
//! resolver can never fire twice.

use std::future::Future;
use std::pin::Pin;
use std::str::FromStr;
use std::sync::{Arc, Mutex, PoisonError};
use std::task::{Context, Poll};

use futures_util::future::BoxFuture;
use tokio::sync::oneshot;
use url::Url;

use crate::convert;
use crate::errors::{Error, Result};
use crate::request_builder::RequestBuilder;
use crate::response::{PaymentCompleter, PaymentResponse};
use crate::session::{
    ApplePaySession, PaymentMethodCompletion, SessionDriver, SessionError, SessionEvent,
    ShippingContactCompletion, ShippingMethodCompletion,
};
use crate::types::{
    ApplePayErrorItem, ApplePayLineItem, ApplePayPayment, ApplePayPaymentContact,
    ApplePayPaymentMethod, ApplePayPaymentRequest, ApplePayShippingMethod, ApplePayShippingType,
    MerchantSession, PaymentAddress, PaymentDetails, PaymentMethodData, PaymentMethodUpdate,
    PaymentOptions, ProtocolVersion, SessionStatus, ShippingContactUpdate, ShippingMethodUpdate,
};
#[cfg(feature = "merchant-validation")]
use crate::validation::MerchantValidator;

/// Customizable event names accepted by [`PaymentRequest::add_event_listener`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    ShippingAddressChange,
    ShippingOptionChange,
    PaymentMethodSelected,
    ValidateMerchant,
}

impl EventKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::ShippingAddressChange => "shippingaddresschange",
            EventKind::ShippingOptionChange => "shippingoptionchange",
            EventKind::PaymentMethodSelected => "paymentmethodselected",
            EventKind::ValidateMerchant => "validatemerchant",
        }
    }
}

impl FromStr for EventKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "shippingaddresschange" => Ok(EventKind::ShippingAddressChange),
            "shippingoptionchange" => Ok(EventKind::ShippingOptionChange),
            "paymentmethodselected" => Ok(EventKind::PaymentMethodSelected),
            "validatemerchant" => Ok(EventKind::ValidateMerchant),
            other => Err(Error::UnknownEventType(other.to_string())),
        }
    }
}

/// Translated event delivered to a `validatemerchant` handler. The merchant
/// is expected to obtain a merchant session out of band and hand it back via
/// [`PaymentRequest::complete_merchant_validation`].
#[derive(Debug, Clone)]
pub struct ValidateMerchantEvent {
    pub validation_url: String,
}

/// Translated event delivered to a `paymentmethodselected` handler, which
/// answers via [`PaymentRequest::complete_payment_method_selection`].
#[derive(Debug, Clone)]
pub struct PaymentMethodSelectedEvent {
    pub payment_method: ApplePayPaymentMethod,
}

#[derive(Debug, Clone)]
pub struct ShippingAddressChangeEvent {
    pub shipping_address: PaymentAddress,
}

#[derive(Debug, Clone)]
pub struct ShippingOptionChangeEvent {
    /// Identifier of the selected option, or empty when the vendor's choice
    /// does not match the current shipping-methods list.
    pub shipping_option: String,
}

/// Outcome of a shipping handler's `update_with` continuation.
///
/// Both arms carry details: a rejection still rebuilds the vendor record
/// before the failure completion goes out.
#[derive(Debug, Clone)]
pub enum DetailsUpdate {
    Resolved(PaymentDetails),
    Rejected(PaymentDetails),
}

pub type ValidateMerchantHandler = Box<dyn FnMut(ValidateMerchantEvent) + Send>;
pub type PaymentMethodHandler = Box<dyn FnMut(PaymentMethodSelectedEvent) + Send>;
pub type ShippingAddressHandler =
    Box<dyn FnMut(ShippingAddressChangeEvent) -> BoxFuture<'static, DetailsUpdate> + Send>;
pub type ShippingOptionHandler =
    Box<dyn FnMut(ShippingOptionChangeEvent) -> BoxFuture<'static, DetailsUpdate> + Send>;

/// A merchant callback, paired with its event kind at registration time.
pub enum EventHandler {
    ShippingAddressChange(ShippingAddressHandler),
    ShippingOptionChange(ShippingOptionHandler),
    PaymentMethodSelected(PaymentMethodHandler),
    ValidateMerchant(ValidateMerchantHandler),
}

#[derive(Default)]
struct EventHandlers {
    shipping_address_change: Option<ShippingAddressHandler>,
    shipping_option_change: Option<ShippingOptionHandler>,
    payment_method_selected: Option<PaymentMethodHandler>,
    validate_merchant: Option<ValidateMerchantHandler>,
}

type PaymentOutcome = Result<PaymentResponse>;

/// The single in-flight promise of the request lifecycle. Settling consumes
/// the sender, so the resolve/reject pair is cleared atomically and can never
/// fire twice.
struct PendingOperation {
    tx: oneshot::Sender<PaymentOutcome>,
}

impl PendingOperation {
    fn arm() -> (Self, PendingPayment) {
        let (tx, rx) = oneshot::channel();
        (PendingOperation { tx }, PendingPayment { rx })
    }

    fn settle(self, outcome: PaymentOutcome) {
        // The receiver may already be gone; nothing left to notify then.
        let _ = self.tx.send(outcome);
    }
}

/// Future returned by [`PaymentRequest::show`] and
/// [`PaymentRequest::restart`]; resolves on authorization, fails with the
/// abort-kind error on cancellation.
pub struct PendingPayment {
    rx: oneshot::Receiver<PaymentOutcome>,
}

impl Future for PendingPayment {
    type Output = PaymentOutcome;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.rx).poll(cx) {
            Poll::Ready(Ok(outcome)) => Poll::Ready(outcome),
            // Sender dropped without settling: the operation was superseded.
            Poll::Ready(Err(_)) => Poll::Ready(Err(Error::Cancelled)),
            Poll::Pending => Poll::Pending,
        }
    }
}

/// The promise-based Payment Request contract over a vendor Apple Pay
/// session. One adapter instance owns one session and one
/// session-configuration record; see the module docs for the lifecycle.
pub struct PaymentRequest<D: SessionDriver> {
    driver: D,
    version: ProtocolVersion,
    builder: RequestBuilder,
    request: ApplePayPaymentRequest,
    session: Arc<Mutex<D::Session>>,
    handlers: EventHandlers,
    pending: Option<PendingOperation>,

    validation_endpoint: Option<Url>,
    merchant_identifier: Option<String>,
    unknown_error_message: String,
    #[cfg(feature = "merchant-validation")]
    validator: MerchantValidator,

    /// Most recent shipping-address projection, if any.
    pub shipping_address: Option<PaymentAddress>,
    /// Identifier of the most recently selected shipping option.
    pub shipping_option: String,
    /// Shipping type requested at construction.
    pub shipping_type: ApplePayShippingType,
    /// Reserved request identifier; the vendor protocol does not assign one.
    pub payment_request_id: String,
}

impl<D: SessionDriver> std::fmt::Debug for PaymentRequest<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaymentRequest")
            .field("version", &self.version)
            .field("shipping_address", &self.shipping_address)
            .field("shipping_option", &self.shipping_option)
            .field("shipping_type", &self.shipping_type)
            .field("payment_request_id", &self.payment_request_id)
            .finish_non_exhaustive()
    }
}

impl<D: SessionDriver> PaymentRequest<D> {
    /// Negotiates the protocol version, builds the vendor record and opens
    /// the session. Fails synchronously when no method-data entry declares
    /// the Apple Pay identifier.
    pub fn new(
        driver: D,
        method_data: &[PaymentMethodData],
        details: Option<&PaymentDetails>,
        options: Option<&PaymentOptions>,
    ) -> Result<Self> {
        let version = driver.negotiate_version();
        let builder = RequestBuilder::new(version);

        let built = builder.from_method_data(method_data)?;
        let mut request = built.request;
        if let Some(details) = details {
            builder.apply_details(&mut request, details);
        }
        if let Some(options) = options {
            builder.apply_options(&mut request, options);
        }

        #[cfg(feature = "tracing")]
        tracing::debug!("opening Apple Pay session at protocol version {version}");

        let session = driver.start_session(version, request.clone())?;

        Ok(PaymentRequest {
            driver,
            version,
            builder,
            shipping_type: request.shipping_type,
            request,
            session: Arc::new(Mutex::new(session)),
            handlers: EventHandlers::default(),
            pending: None,
            validation_endpoint: built.validation_endpoint,
            merchant_identifier: built.merchant_identifier,
            unknown_error_message: built.unknown_error_message,
            #[cfg(feature = "merchant-validation")]
            validator: MerchantValidator::new(),
            shipping_address: None,
            shipping_option: String::new(),
            payment_request_id: String::new(),
        })
    }

    /// The protocol version negotiated at construction.
    pub fn version(&self) -> ProtocolVersion {
        self.version
    }

    /// The current vendor session-configuration record.
    pub fn request_record(&self) -> &ApplePayPaymentRequest {
        &self.request
    }

    /// Begins the vendor session and arms a fresh pending operation.
    pub fn show(&mut self) -> Result<PendingPayment> {
        self.with_session(|session| session.begin())?;
        Ok(self.arm())
    }

    /// Re-arms the pending operation without re-beginning the session, to
    /// pick the lifecycle back up after a non-terminal flow.
    pub fn restart(&mut self) -> PendingPayment {
        self.arm()
    }

    /// Requests vendor-side cancellation. Fire-and-forget: the pending
    /// operation settles through the cancelled-event path, not here.
    pub fn abort(&mut self) -> Result<()> {
        self.with_session(|session| session.abort())
    }

    /// Active-card capability check for the configured merchant.
    pub async fn can_make_payment(&self) -> Result<bool> {
        let merchant_identifier = self
            .merchant_identifier
            .as_deref()
            .ok_or(Error::MerchantIdentifierMissing)?;
        Ok(self
            .driver
            .can_make_payments_with_active_card(merchant_identifier)
            .await)
    }

    /// Registers a merchant callback under one of the four customizable event
    /// names. Unknown names and kind/handler mismatches fail synchronously.
    pub fn add_event_listener(&mut self, event_type: &str, handler: EventHandler) -> Result<()> {
        let kind: EventKind = event_type.parse()?;
        match (kind, handler) {
            (EventKind::ShippingAddressChange, EventHandler::ShippingAddressChange(h)) => {
                self.handlers.shipping_address_change = Some(h);
            }
            (EventKind::ShippingOptionChange, EventHandler::ShippingOptionChange(h)) => {
                self.handlers.shipping_option_change = Some(h);
            }
            (EventKind::PaymentMethodSelected, EventHandler::PaymentMethodSelected(h)) => {
                self.handlers.payment_method_selected = Some(h);
            }
            (EventKind::ValidateMerchant, EventHandler::ValidateMerchant(h)) => {
                self.handlers.validate_merchant = Some(h);
            }
            (kind, _) => return Err(Error::HandlerMismatch(kind.as_str())),
        }
        Ok(())
    }

    pub fn on_shipping_address_change(&mut self, handler: ShippingAddressHandler) {
        self.handlers.shipping_address_change = Some(handler);
    }

    pub fn on_shipping_option_change(&mut self, handler: ShippingOptionHandler) {
        self.handlers.shipping_option_change = Some(handler);
    }

    pub fn on_payment_method_selected(&mut self, handler: PaymentMethodHandler) {
        self.handlers.payment_method_selected = Some(handler);
    }

    pub fn on_validate_merchant(&mut self, handler: ValidateMerchantHandler) {
        self.handlers.validate_merchant = Some(handler);
    }

    /// Hands a merchant session obtained out of band to the vendor.
    pub fn complete_merchant_validation(&self, merchant_session: MerchantSession) -> Result<()> {
        self.with_session(|session| session.complete_merchant_validation(merchant_session))
    }

    /// Version-appropriate payment-method completion: a single combined
    /// update record at version 3, two positional values otherwise.
    pub fn complete_payment_method_selection(
        &self,
        new_total: Option<ApplePayLineItem>,
        new_line_items: Vec<ApplePayLineItem>,
    ) -> Result<()> {
        let completion = match self.version {
            ProtocolVersion::V3 => PaymentMethodCompletion::Update(PaymentMethodUpdate {
                new_total,
                new_line_items,
            }),
            _ => PaymentMethodCompletion::Legacy {
                new_total,
                new_line_items,
            },
        };
        self.with_session(|session| session.complete_payment_method_selection(completion))
    }

    /// Feeds one vendor session event through the translator. Events must be
    /// delivered in the order the vendor emitted them.
    ///
    /// An `Err` concerns the event flow itself — a failed default merchant
    /// validation, a rejected version 3 shipping update — and never settles
    /// the outstanding payment future.
    pub async fn handle_session_event(&mut self, event: SessionEvent) -> Result<()> {
        match event {
            SessionEvent::ValidateMerchant { validation_url } => {
                self.on_validate_merchant_event(validation_url).await
            }
            SessionEvent::PaymentMethodSelected { payment_method } => {
                self.on_payment_method_selected_event(payment_method)
            }
            SessionEvent::ShippingContactSelected { shipping_contact } => {
                self.on_shipping_contact_selected(shipping_contact).await
            }
            SessionEvent::ShippingMethodSelected { shipping_method } => {
                self.on_shipping_method_selected(shipping_method).await
            }
            SessionEvent::PaymentAuthorized { payment } => {
                self.on_payment_authorized(payment);
                Ok(())
            }
            SessionEvent::Cancelled => {
                self.on_cancelled();
                Ok(())
            }
        }
    }

    async fn on_validate_merchant_event(&mut self, validation_url: String) -> Result<()> {
        if let Some(handler) = self.handlers.validate_merchant.as_mut() {
            handler(ValidateMerchantEvent { validation_url });
            return Ok(());
        }
        self.default_merchant_validation(validation_url).await
    }

    #[cfg(feature = "merchant-validation")]
    async fn default_merchant_validation(&mut self, validation_url: String) -> Result<()> {
        let endpoint = self
            .validation_endpoint
            .clone()
            .ok_or(Error::MissingValidationEndpoint)?;
        let merchant_session = match self.validator.validate(&endpoint, &validation_url).await {
            Ok(session) => session,
            Err(err) => {
                #[cfg(feature = "tracing")]
                tracing::warn!(
                    "merchant validation failed: {err}; the payment promise stays unsettled"
                );
                return Err(err);
            }
        };
        self.complete_merchant_validation(merchant_session)
    }

    #[cfg(not(feature = "merchant-validation"))]
    async fn default_merchant_validation(&mut self, _validation_url: String) -> Result<()> {
        #[cfg(feature = "tracing")]
        tracing::warn!(
            "merchant validation requested with no handler registered and the \
             `merchant-validation` feature disabled; skipping"
        );
        Ok(())
    }

    fn on_payment_method_selected_event(
        &mut self,
        payment_method: ApplePayPaymentMethod,
    ) -> Result<()> {
        if let Some(handler) = self.handlers.payment_method_selected.as_mut() {
            handler(PaymentMethodSelectedEvent { payment_method });
            return Ok(());
        }

        // Default: acknowledge with the current total and line items.
        self.complete_payment_method_selection(
            self.request.total.clone(),
            self.request.line_items.clone(),
        )
    }

    async fn on_shipping_contact_selected(
        &mut self,
        shipping_contact: ApplePayPaymentContact,
    ) -> Result<()> {
        let address = convert::payment_address(&shipping_contact);
        self.shipping_address = Some(address.clone());

        let Some(handler) = self.handlers.shipping_address_change.as_mut() else {
            // No handler, no completion: the sheet stays on the vendor
            // spinner. Kept as a documented no-op.
            #[cfg(feature = "tracing")]
            tracing::debug!(
                "shippingcontactselected ignored: no shippingaddresschange handler registered"
            );
            return Ok(());
        };

        let update = handler(ShippingAddressChangeEvent {
            shipping_address: address,
        })
        .await;

        let completion = match update {
            DetailsUpdate::Resolved(details) => {
                self.builder.apply_details(&mut self.request, &details);
                match self.version {
                    ProtocolVersion::V3 => {
                        ShippingContactCompletion::Update(ShippingContactUpdate {
                            errors: details.apple_errors.unwrap_or_default(),
                            new_line_items: self.request.line_items.clone(),
                            new_shipping_methods: self.request.shipping_methods.clone(),
                            new_total: self.request.total.clone(),
                        })
                    }
                    _ => ShippingContactCompletion::Legacy {
                        status: if details.error.is_some() {
                            SessionStatus::Failure
                        } else {
                            SessionStatus::Success
                        },
                        new_shipping_methods: self.request.shipping_methods.clone(),
                        new_total: self.request.total.clone(),
                        new_line_items: self.request.line_items.clone(),
                    },
                }
            }
            DetailsUpdate::Rejected(details) => {
                self.builder.apply_details(&mut self.request, &details);
                match self.version {
                    ProtocolVersion::V3 => {
                        ShippingContactCompletion::Update(ShippingContactUpdate {
                            errors: details
                                .apple_errors
                                .unwrap_or_else(|| vec![ApplePayErrorItem::unknown()]),
                            new_line_items: self.request.line_items.clone(),
                            new_shipping_methods: self.request.shipping_methods.clone(),
                            new_total: self.request.total.clone(),
                        })
                    }
                    _ => ShippingContactCompletion::Legacy {
                        status: SessionStatus::Failure,
                        new_shipping_methods: self.request.shipping_methods.clone(),
                        new_total: self.request.total.clone(),
                        new_line_items: self.request.line_items.clone(),
                    },
                }
            }
        };

        self.with_session(|session| session.complete_shipping_contact_selection(completion))
    }

    async fn on_shipping_method_selected(
        &mut self,
        shipping_method: ApplePayShippingMethod,
    ) -> Result<()> {
        let option_id = convert::shipping_option_id(&self.request, &shipping_method);
        self.shipping_option = option_id.clone();

        let Some(handler) = self.handlers.shipping_option_change.as_mut() else {
            #[cfg(feature = "tracing")]
            tracing::debug!(
                "shippingmethodselected ignored: no shippingoptionchange handler registered"
            );
            return Ok(());
        };

        let update = handler(ShippingOptionChangeEvent {
            shipping_option: option_id,
        })
        .await;

        match update {
            DetailsUpdate::Resolved(details) => {
                self.builder.apply_details(&mut self.request, &details);
                match self.version {
                    ProtocolVersion::V3 => {
                        if let Some(error) = details.error {
                            // No structured method-level error channel at v3;
                            // tear the session down and surface the message.
                            return self.abort_with_message(error);
                        }
                        self.with_session(|session| {
                            session.complete_shipping_method_selection(
                                ShippingMethodCompletion::Update(ShippingMethodUpdate {
                                    new_line_items: self.request.line_items.clone(),
                                    new_total: self.request.total.clone(),
                                }),
                            )
                        })
                    }
                    _ => self.with_session(|session| {
                        session.complete_shipping_method_selection(
                            ShippingMethodCompletion::Legacy {
                                status: SessionStatus::Success,
                                new_total: self.request.total.clone(),
                                new_line_items: Some(self.request.line_items.clone()),
                            },
                        )
                    }),
                }
            }
            DetailsUpdate::Rejected(details) => {
                self.builder.apply_details(&mut self.request, &details);
                match self.version {
                    ProtocolVersion::V3 => {
                        let message = self.unknown_error_message.clone();
                        self.abort_with_message(message)
                    }
                    // The legacy rejection path carries no values at all.
                    _ => self.with_session(|session| {
                        session.complete_shipping_method_selection(
                            ShippingMethodCompletion::Legacy {
                                status: SessionStatus::Failure,
                                new_total: None,
                                new_line_items: None,
                            },
                        )
                    }),
                }
            }
        }
    }

    fn abort_with_message(&mut self, message: String) -> Result<()> {
        self.with_session(|session| session.abort())?;
        #[cfg(feature = "tracing")]
        tracing::warn!("shipping update rejected, session aborted: {message}");
        Err(Error::ShippingUpdateRejected(message))
    }

    fn on_payment_authorized(&mut self, payment: ApplePayPayment) {
        let Some(pending) = self.pending.take() else {
            #[cfg(feature = "tracing")]
            tracing::debug!("paymentauthorized arrived with no outstanding operation; dropped");
            return;
        };

        let completer = self.payment_completer();
        pending.settle(Ok(PaymentResponse::from_payment(payment, completer)));
    }

    fn on_cancelled(&mut self) {
        // Idempotent: a second cancellation finds no operation outstanding.
        if let Some(pending) = self.pending.take() {
            pending.settle(Err(Error::Cancelled));
        }
    }

    fn arm(&mut self) -> PendingPayment {
        let (operation, payment) = PendingOperation::arm();
        let stale = self.pending.replace(operation);
        if stale.is_some() {
            #[cfg(feature = "tracing")]
            tracing::warn!(
                "new pending operation armed while one was outstanding; the stale future \
                 settles as cancelled"
            );
        }
        payment
    }

    fn payment_completer(&self) -> PaymentCompleter {
        let session = Arc::clone(&self.session);
        PaymentCompleter::new(
            self.version,
            Box::new(move |completion| {
                session
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .complete_payment(completion)
            }),
        )
    }

    fn with_session<T>(
        &self,
        f: impl FnOnce(&mut D::Session) -> std::result::Result<T, SessionError>,
    ) -> Result<T> {
        let mut guard = self.session.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(f(&mut guard)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_kinds_parse_the_four_customizable_names() {
        assert_eq!(
            "shippingaddresschange".parse::<EventKind>().unwrap(),
            EventKind::ShippingAddressChange
        );
        assert_eq!(
            "shippingoptionchange".parse::<EventKind>().unwrap(),
            EventKind::ShippingOptionChange
        );
        assert_eq!(
            "paymentmethodselected".parse::<EventKind>().unwrap(),
            EventKind::PaymentMethodSelected
        );
        assert_eq!(
            "validatemerchant".parse::<EventKind>().unwrap(),
            EventKind::ValidateMerchant
        );
    }

    #[test]
    fn unknown_event_kind_is_a_configuration_error() {
        let err = "paymentauthorized".parse::<EventKind>().unwrap_err();
        assert!(matches!(err, Error::UnknownEventType(name) if name == "paymentauthorized"));
    }
}
