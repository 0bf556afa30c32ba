//! Projections from vendor records into the generic Payment Request shapes.

use crate::types::{
    ApplePayPaymentContact, ApplePayPaymentRequest, ApplePayShippingMethod, PaymentAddress,
};

/// Converts a vendor payment contact into a generic payment address.
///
/// The vendor schema has no dependent-locality, language or organization
/// concepts; those stay empty. The vendor country *name* feeds `sorting_code`,
/// and the recipient is the "given family" name concatenation.
pub fn payment_address(contact: &ApplePayPaymentContact) -> PaymentAddress {
    let given = contact.given_name.clone().unwrap_or_default();
    let family = contact.family_name.clone().unwrap_or_default();

    PaymentAddress {
        country: contact.country_code.clone().unwrap_or_default(),
        address_line: contact.address_lines.clone().unwrap_or_default(),
        region: contact.administrative_area.clone().unwrap_or_default(),
        city: contact.locality.clone().unwrap_or_default(),
        dependent_locality: String::new(),
        postal_code: contact.postal_code.clone().unwrap_or_default(),
        sorting_code: contact.country.clone().unwrap_or_default(),
        language_code: String::new(),
        organization: String::new(),
        recipient: format!("{given} {family}"),
        phone: contact.phone_number.clone().unwrap_or_default(),
    }
}

/// Matches the vendor's selected shipping method against the current list of
/// the session-configuration record; a miss yields an empty identifier.
pub fn shipping_option_id(
    request: &ApplePayPaymentRequest,
    selected: &ApplePayShippingMethod,
) -> String {
    request
        .shipping_methods
        .iter()
        .find(|method| method.identifier == selected.identifier)
        .map(|method| method.identifier.clone())
        .unwrap_or_default()
}
