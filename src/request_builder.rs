//! Builds and refreshes the vendor session-configuration record from the
//! generic method-data/details/options inputs. Pure transforms, no external
//! effects.

use url::Url;

use crate::errors::{Error, Result};
use crate::types::{
    APPLE_PAY_METHOD_IDENTIFIER, AnyJson, ApplePayLineItem, ApplePayMethodData,
    ApplePayPaymentRequest, ApplePayShippingMethod, ApplePayShippingType, ContactField,
    LineItemType, PaymentDetails, PaymentItem, PaymentMethodData, PaymentOptions,
    PaymentShippingOption, PaymentShippingType, ProtocolVersion,
};

/// Message used when the merchant does not supply an explicit error on a
/// rejection path.
pub const DEFAULT_UNKNOWN_ERROR_MESSAGE: &str = "An unknown error occurred, please try again";

/// Everything captured from the matched method-data entry.
#[derive(Debug, Clone)]
pub struct BuiltRequest {
    pub request: ApplePayPaymentRequest,
    pub validation_endpoint: Option<Url>,
    pub merchant_identifier: Option<String>,
    pub unknown_error_message: String,
}

/// Pure transform from generic inputs to the vendor record.
#[derive(Debug, Clone, Copy)]
pub struct RequestBuilder {
    version: ProtocolVersion,
}

impl RequestBuilder {
    pub fn new(version: ProtocolVersion) -> Self {
        RequestBuilder { version }
    }

    /// Picks the first entry whose supported methods contain the Apple Pay
    /// identifier and seeds the record from its `data` blob.
    pub fn from_method_data(&self, method_data: &[PaymentMethodData]) -> Result<BuiltRequest> {
        let entry = method_data
            .iter()
            .find(|entry| {
                entry
                    .supported_methods
                    .iter()
                    .any(|method| method == APPLE_PAY_METHOD_IDENTIFIER)
            })
            .ok_or(Error::PaymentMethodNotSpecified)?;

        let data: ApplePayMethodData = serde_json::from_value(entry.data.clone())?;

        let mut request = ApplePayPaymentRequest {
            country_code: data.country_code,
            supported_networks: data.supported_networks,
            merchant_capabilities: data
                .merchant_capabilities
                .unwrap_or_else(|| vec!["supports3DS".to_string()]),
            billing_contact: data.billing_contact,
            shipping_contact: data.shipping_contact,
            ..ApplePayPaymentRequest::default()
        };

        if self.version == ProtocolVersion::V3 {
            if let Some(countries) = data.supported_countries.as_ref().and_then(AnyJson::as_array)
            {
                request.supported_countries = Some(
                    countries
                        .iter()
                        .filter_map(|c| c.as_str().map(str::to_string))
                        .collect(),
                );
            }
        }

        Ok(BuiltRequest {
            request,
            validation_endpoint: data.validation_endpoint,
            merchant_identifier: data.merchant_identifier,
            unknown_error_message: data
                .unknown_error_message
                .unwrap_or_else(|| DEFAULT_UNKNOWN_ERROR_MESSAGE.to_string()),
        })
    }

    /// Rebuilds line items, shipping methods and the total from new details.
    /// There is no partial-update state: each present section replaces its
    /// counterpart wholesale. Reinvoked on every details update.
    pub fn apply_details(&self, request: &mut ApplePayPaymentRequest, details: &PaymentDetails) {
        if let Some(items) = &details.display_items {
            request.line_items = items.iter().map(line_item).collect();
        }

        if let Some(options) = &details.shipping_options {
            request.shipping_methods = options.iter().map(shipping_method).collect();
        }

        if let Some(total) = &details.total {
            request.currency_code = total.amount.currency.clone();
            request.total = Some(line_item(total));
        }
    }

    /// Maps requested options onto the vendor's required contact field lists
    /// and shipping type.
    pub fn apply_options(&self, request: &mut ApplePayPaymentRequest, options: &PaymentOptions) {
        if options.request_shipping {
            request
                .required_billing_contact_fields
                .push(ContactField::PostalAddress);
            request
                .required_shipping_contact_fields
                .push(ContactField::PostalAddress);
        }
        if options.request_payer_name {
            request
                .required_shipping_contact_fields
                .push(ContactField::Name);
        }
        if options.request_payer_email {
            request
                .required_shipping_contact_fields
                .push(ContactField::Email);
        }
        if options.request_payer_phone {
            request
                .required_shipping_contact_fields
                .push(ContactField::Phone);
        }

        request.shipping_type = match options.shipping_type {
            PaymentShippingType::Pickup => ApplePayShippingType::ServicePickup,
            PaymentShippingType::Delivery => ApplePayShippingType::Delivery,
            PaymentShippingType::Shipping => ApplePayShippingType::Shipping,
        };
    }
}

fn line_item(item: &PaymentItem) -> ApplePayLineItem {
    ApplePayLineItem {
        item_type: LineItemType::from_pending(item.pending),
        label: item.label.clone(),
        amount: item.amount.value.clone(),
    }
}

/// Splits the option label on the first `-`: the part before becomes the short
/// label, the part after the detail line on the payment sheet.
fn shipping_method(option: &PaymentShippingOption) -> ApplePayShippingMethod {
    let (label, detail) = match option.label.find('-') {
        Some(idx) => (option.label[..idx].trim(), option.label[idx + 1..].trim()),
        None => (option.label.trim(), ""),
    };
    ApplePayShippingMethod {
        label: label.to_string(),
        detail: detail.to_string(),
        amount: option.amount.value.clone(),
        identifier: option.id.clone(),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::types::CurrencyAmount;

    fn apple_pay_entry(data: AnyJson) -> PaymentMethodData {
        PaymentMethodData::builder()
            .supported_methods(vec![APPLE_PAY_METHOD_IDENTIFIER.to_string()])
            .data(data)
            .build()
    }

    fn usd(value: &str) -> CurrencyAmount {
        CurrencyAmount::builder().currency("USD").value(value).build()
    }

    #[test]
    fn fails_without_apple_pay_entry() {
        let builder = RequestBuilder::new(ProtocolVersion::V3);
        let method_data = vec![PaymentMethodData::builder()
            .supported_methods(vec!["basic-card".to_string()])
            .build()];

        let err = builder.from_method_data(&method_data).unwrap_err();
        assert!(matches!(err, Error::PaymentMethodNotSpecified));
    }

    #[test]
    fn first_matching_entry_wins() {
        let builder = RequestBuilder::new(ProtocolVersion::V3);
        let method_data = vec![
            PaymentMethodData::builder()
                .supported_methods(vec!["basic-card".to_string()])
                .build(),
            apple_pay_entry(json!({"countryCode": "US", "supportedNetworks": ["visa"]})),
            apple_pay_entry(json!({"countryCode": "GB"})),
        ];

        let built = builder.from_method_data(&method_data).unwrap();
        assert_eq!(built.request.country_code, "US");
        assert_eq!(built.request.supported_networks, vec!["visa"]);
    }

    #[test]
    fn defaults_merchant_capabilities_and_unknown_error_message() {
        let builder = RequestBuilder::new(ProtocolVersion::V2);
        let built = builder
            .from_method_data(&[apple_pay_entry(json!({"countryCode": "US"}))])
            .unwrap();

        assert_eq!(built.request.merchant_capabilities, vec!["supports3DS"]);
        assert_eq!(built.unknown_error_message, DEFAULT_UNKNOWN_ERROR_MESSAGE);
        assert!(built.request.billing_contact.is_none());
        assert!(built.request.shipping_contact.is_none());
    }

    #[test]
    fn captures_endpoint_merchant_id_and_custom_error_message() {
        let builder = RequestBuilder::new(ProtocolVersion::V3);
        let built = builder
            .from_method_data(&[apple_pay_entry(json!({
                "countryCode": "US",
                "validationEndpoint": "https://merchant.example/validate",
                "merchantIdentifier": "merchant.com.example",
                "unknownErrorMessage": "Try again later"
            }))])
            .unwrap();

        assert_eq!(
            built.validation_endpoint.unwrap(),
            url_macro::url!("https://merchant.example/validate")
        );
        assert_eq!(built.merchant_identifier.as_deref(), Some("merchant.com.example"));
        assert_eq!(built.unknown_error_message, "Try again later");
    }

    #[test]
    fn supported_countries_only_apply_at_version_3() {
        let data = json!({"countryCode": "US", "supportedCountries": ["US", "CA"]});

        let v3 = RequestBuilder::new(ProtocolVersion::V3)
            .from_method_data(&[apple_pay_entry(data.clone())])
            .unwrap();
        assert_eq!(
            v3.request.supported_countries,
            Some(vec!["US".to_string(), "CA".to_string()])
        );

        let v2 = RequestBuilder::new(ProtocolVersion::V2)
            .from_method_data(&[apple_pay_entry(data)])
            .unwrap();
        assert!(v2.request.supported_countries.is_none());
    }

    #[test]
    fn non_array_supported_countries_are_ignored() {
        let built = RequestBuilder::new(ProtocolVersion::V3)
            .from_method_data(&[apple_pay_entry(
                json!({"countryCode": "US", "supportedCountries": "US"}),
            )])
            .unwrap();
        assert!(built.request.supported_countries.is_none());
    }

    #[test]
    fn details_rebuild_items_methods_and_total() {
        let builder = RequestBuilder::new(ProtocolVersion::V3);
        let mut request = ApplePayPaymentRequest::default();

        let details = PaymentDetails::builder()
            .display_items(vec![
                PaymentItem::builder().label("Widget").amount(usd("9.00")).build(),
                PaymentItem::builder()
                    .label("Tax")
                    .amount(usd("1.00"))
                    .pending(true)
                    .build(),
            ])
            .shipping_options(vec![PaymentShippingOption::builder()
                .id("standard")
                .label("Standard - 3-5 business days")
                .amount(usd("0.00"))
                .build()])
            .total(PaymentItem::builder().label("Total").amount(usd("10.00")).build())
            .build();

        builder.apply_details(&mut request, &details);

        assert_eq!(request.line_items.len(), 2);
        assert_eq!(request.line_items[0].item_type, LineItemType::Final);
        assert_eq!(request.line_items[1].item_type, LineItemType::Pending);
        assert_eq!(request.currency_code, "USD");
        assert_eq!(request.total.as_ref().unwrap().amount, "10.00");
        assert_eq!(request.shipping_methods[0].identifier, "standard");
    }

    #[test]
    fn shipping_label_splits_on_first_dash() {
        let option = PaymentShippingOption::builder()
            .id("standard")
            .label("Standard - 3-5 business days")
            .amount(usd("0.00"))
            .build();

        let method = shipping_method(&option);
        assert_eq!(method.label, "Standard");
        assert_eq!(method.detail, "3-5 business days");
    }

    #[test]
    fn shipping_label_without_dash_has_empty_detail() {
        let option = PaymentShippingOption::builder()
            .id("express")
            .label("Express")
            .amount(usd("10.00"))
            .build();

        let method = shipping_method(&option);
        assert_eq!(method.label, "Express");
        assert_eq!(method.detail, "");
    }

    #[test]
    fn options_populate_required_field_lists() {
        let builder = RequestBuilder::new(ProtocolVersion::V3);
        let mut request = ApplePayPaymentRequest::default();

        let options = PaymentOptions::builder()
            .request_shipping(true)
            .request_payer_name(true)
            .request_payer_email(true)
            .request_payer_phone(true)
            .build();
        builder.apply_options(&mut request, &options);

        assert_eq!(
            request.required_billing_contact_fields,
            vec![ContactField::PostalAddress]
        );
        assert_eq!(
            request.required_shipping_contact_fields,
            vec![
                ContactField::PostalAddress,
                ContactField::Name,
                ContactField::Email,
                ContactField::Phone
            ]
        );
    }

    #[test]
    fn pickup_maps_to_service_pickup() {
        let builder = RequestBuilder::new(ProtocolVersion::V3);
        let mut request = ApplePayPaymentRequest::default();

        let options = PaymentOptions::builder()
            .shipping_type(PaymentShippingType::Pickup)
            .build();
        builder.apply_options(&mut request, &options);
        assert_eq!(request.shipping_type, ApplePayShippingType::ServicePickup);

        let options = PaymentOptions::builder()
            .shipping_type(PaymentShippingType::Delivery)
            .build();
        builder.apply_options(&mut request, &options);
        assert_eq!(request.shipping_type, ApplePayShippingType::Delivery);
    }
}
