use crate::session::SessionError;

/// Error types for Apple Pay kit operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// No method-data entry declared the Apple Pay method identifier.
    #[error("payment method not specified for Apple Pay")]
    PaymentMethodNotSpecified,

    /// The matched method-data entry carried a malformed `data` blob.
    #[error("malformed Apple Pay method data: {0}")]
    InvalidMethodData(#[from] serde_json::Error),

    /// `can_make_payment` requires a merchant identifier captured at
    /// construction.
    #[error("`merchantIdentifier` is not specified")]
    MerchantIdentifierMissing,

    /// `add_event_listener` was called with an unrecognized event name.
    #[error("unknown event type \"{0}\" for `add_event_listener`")]
    UnknownEventType(String),

    /// The registered handler does not match the event name it was registered
    /// under.
    #[error("handler does not match event type \"{0}\"")]
    HandlerMismatch(&'static str),

    /// Default merchant validation ran without a configured endpoint.
    #[error("no `validationEndpoint` configured for default merchant validation")]
    MissingValidationEndpoint,

    /// The merchant validation endpoint answered with a non-200 status.
    #[error("merchant validation failed with HTTP status {0}")]
    MerchantValidation(u16),

    /// The merchant validation round trip failed at the transport layer.
    #[cfg(feature = "merchant-validation")]
    #[error("merchant validation transport error: {0}")]
    ValidationTransport(#[from] reqwest::Error),

    /// `complete()` was called with an unrecognized result value.
    #[error("unknown status \"{0}\" for `complete()`")]
    UnknownStatus(String),

    /// The payment request was cancelled by the user or the vendor.
    #[error("payment request cancelled")]
    Cancelled,

    /// A version 3 shipping-method update was rejected; the session has been
    /// aborted.
    #[error("shipping update rejected: {0}")]
    ShippingUpdateRejected(String),

    /// The vendor session refused a call.
    #[error(transparent)]
    Session(#[from] SessionError),
}

impl Error {
    /// Whether this is the abort-kind failure that rejects a pending payment.
    pub fn is_abort(&self) -> bool {
        matches!(self, Error::Cancelled)
    }
}

/// A specialized `Result` type for Apple Pay kit operations.
pub type Result<T> = std::result::Result<T, Error>;
