//! Merchant-facing Payment Request shapes.
//!
//! These are the generic request/response records merchant code is written
//! against. Only the adapter knows how they map onto the vendor schema.

use bon::Builder;
use serde::{Deserialize, Serialize};

use super::applepay::ApplePayErrorItem;

pub type AnyJson = serde_json::Value;

/// A single entry of the `methodData` constructor argument.
#[derive(Builder, Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentMethodData {
    /// Method identifiers this entry applies to.
    pub supported_methods: Vec<String>,
    /// Method-specific configuration blob; its schema belongs to the method.
    #[builder(default = AnyJson::Null)]
    #[serde(default)]
    pub data: AnyJson,
}

#[derive(Builder, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrencyAmount {
    #[builder(into)]
    pub currency: String,
    #[builder(into)]
    pub value: String,
}

/// A display line on the payment sheet.
#[derive(Builder, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentItem {
    #[builder(into)]
    pub label: String,
    pub amount: CurrencyAmount,
    /// Marks an amount that is not final yet.
    #[builder(default)]
    #[serde(default)]
    pub pending: bool,
}

#[derive(Builder, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentShippingOption {
    #[builder(into)]
    pub id: String,
    #[builder(into)]
    pub label: String,
    pub amount: CurrencyAmount,
    #[builder(default)]
    #[serde(default)]
    pub selected: bool,
}

/// Payment details supplied at construction or through an `update_with`
/// continuation. Every present section replaces its counterpart on the vendor
/// record wholesale.
#[derive(Builder, Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentDetails {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_items: Option<Vec<PaymentItem>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shipping_options: Option<Vec<PaymentShippingOption>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<PaymentItem>,
    /// Details-level error; forces a failure status on legacy shipping
    /// completions.
    #[builder(into)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Vendor-native error records attached to version 3 completions.
    #[serde(rename = "appleError", skip_serializing_if = "Option::is_none")]
    pub apple_errors: Option<Vec<ApplePayErrorItem>>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PaymentShippingType {
    #[default]
    Shipping,
    Delivery,
    Pickup,
}

#[derive(Builder, Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentOptions {
    #[builder(default)]
    #[serde(default)]
    pub request_shipping: bool,
    #[builder(default)]
    #[serde(default)]
    pub request_payer_name: bool,
    #[builder(default)]
    #[serde(default)]
    pub request_payer_email: bool,
    #[builder(default)]
    #[serde(default)]
    pub request_payer_phone: bool,
    #[builder(default)]
    #[serde(default)]
    pub shipping_type: PaymentShippingType,
}

/// Read-only projection of a vendor payment contact, recomputed on every
/// relevant vendor event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentAddress {
    pub country: String,
    pub address_line: Vec<String>,
    pub region: String,
    pub city: String,
    pub dependent_locality: String,
    pub postal_code: String,
    pub sorting_code: String,
    pub language_code: String,
    pub organization: String,
    pub recipient: String,
    pub phone: String,
}
