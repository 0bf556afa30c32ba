//! Apple Pay JS wire schema.
//!
//! Everything the vendor session consumes or emits lives here: the
//! session-configuration record, line items and shipping methods, payment
//! contacts, the authorization payload, and the version 3 update records used
//! by completion calls.

use serde::{Deserialize, Serialize};
use url::Url;

use super::generic::AnyJson;

/// The W3C method identifier under which Apple Pay is requested.
pub const APPLE_PAY_METHOD_IDENTIFIER: &str = "https://apple.com/apple-pay";

/// Tag on a line item: `final` for settled amounts, `pending` otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LineItemType {
    Final,
    Pending,
}

impl LineItemType {
    pub fn from_pending(pending: bool) -> Self {
        if pending {
            LineItemType::Pending
        } else {
            LineItemType::Final
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplePayLineItem {
    #[serde(rename = "type")]
    pub item_type: LineItemType,
    pub label: String,
    pub amount: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplePayShippingMethod {
    pub label: String,
    pub detail: String,
    pub amount: String,
    pub identifier: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ApplePayPaymentContact {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub given_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub family_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address_lines: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locality: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub administrative_area: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<String>,
    /// ISO country code.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country_code: Option<String>,
    /// Localized country name, distinct from the code.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
}

/// Contact fields the payment sheet is required to capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ContactField {
    PostalAddress,
    Name,
    Email,
    Phone,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ApplePayShippingType {
    #[default]
    Shipping,
    Delivery,
    StorePickup,
    ServicePickup,
}

/// The vendor session-configuration record.
///
/// Rebuilt in place whenever new payment details arrive: `total`, `line_items`
/// and `shipping_methods` always reflect the most recently applied details.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ApplePayPaymentRequest {
    pub country_code: String,
    pub currency_code: String,
    pub line_items: Vec<ApplePayLineItem>,
    pub merchant_capabilities: Vec<String>,
    pub supported_networks: Vec<String>,
    /// Only populated when the negotiated version is 3.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supported_countries: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<ApplePayLineItem>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub billing_contact: Option<ApplePayPaymentContact>,
    pub required_billing_contact_fields: Vec<ContactField>,
    pub required_shipping_contact_fields: Vec<ContactField>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shipping_contact: Option<ApplePayPaymentContact>,
    pub shipping_methods: Vec<ApplePayShippingMethod>,
    pub shipping_type: ApplePayShippingType,
}

/// Typed view of the `data` blob carried by the matched method-data entry.
/// The adapter is the only component that knows this schema.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ApplePayMethodData {
    pub supported_networks: Vec<String>,
    pub country_code: String,
    pub billing_contact: Option<ApplePayPaymentContact>,
    pub shipping_contact: Option<ApplePayPaymentContact>,
    pub merchant_capabilities: Option<Vec<String>>,
    /// Kept untyped: applied only when the negotiated version is 3 and the
    /// value is actually an array.
    pub supported_countries: Option<AnyJson>,
    pub validation_endpoint: Option<Url>,
    pub merchant_identifier: Option<String>,
    pub unknown_error_message: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ApplePayPaymentMethod {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub method_type: Option<String>,
}

/// The authorization payload delivered with `paymentauthorized`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ApplePayPayment {
    /// Opaque payment token, passed through for the payment processor.
    pub token: AnyJson,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub billing_contact: Option<ApplePayPaymentContact>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shipping_contact: Option<ApplePayPaymentContact>,
}

/// A vendor error record surfaced on version 3 completions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ApplePayErrorItem {
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact_field: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ApplePayErrorItem {
    /// The default one-element error list entry used when the merchant does
    /// not supply an explicit one.
    pub fn unknown() -> Self {
        ApplePayErrorItem {
            code: "unknown".to_string(),
            contact_field: None,
            message: None,
        }
    }
}

/// Opaque merchant session object returned by the validation endpoint and
/// handed back to the vendor verbatim.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MerchantSession(pub AnyJson);

/// Vendor status constants used by legacy (version 1/2) completion calls.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
pub enum SessionStatus {
    Success,
    Failure,
}

impl SessionStatus {
    pub fn as_u8(self) -> u8 {
        match self {
            SessionStatus::Success => 0,
            SessionStatus::Failure => 1,
        }
    }
}

impl Serialize for SessionStatus {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_u8(self.as_u8())
    }
}

impl<'de> Deserialize<'de> for SessionStatus {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let v = u8::deserialize(deserializer)?;
        match v {
            0 => Ok(SessionStatus::Success),
            1 => Ok(SessionStatus::Failure),
            _ => Err(serde::de::Error::custom(format!(
                "Unknown session status constant: {}",
                v
            ))),
        }
    }
}

/// Version 3 payment-method completion record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentMethodUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_total: Option<ApplePayLineItem>,
    pub new_line_items: Vec<ApplePayLineItem>,
}

/// Version 3 shipping-contact completion record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingContactUpdate {
    pub errors: Vec<ApplePayErrorItem>,
    pub new_line_items: Vec<ApplePayLineItem>,
    pub new_shipping_methods: Vec<ApplePayShippingMethod>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_total: Option<ApplePayLineItem>,
}

/// Version 3 shipping-method completion record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingMethodUpdate {
    pub new_line_items: Vec<ApplePayLineItem>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_total: Option<ApplePayLineItem>,
}

/// Version 3 final authorization result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentAuthorizationResult {
    pub status: SessionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<ApplePayErrorItem>>,
}
