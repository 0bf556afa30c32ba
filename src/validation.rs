//! Default merchant-validation round trip.
//!
//! Used when no `validatemerchant` handler is registered: the adapter POSTs
//! the vendor-provided validation URL to the merchant's own endpoint, which
//! performs the authenticated exchange with the payment network and returns
//! the opaque merchant session.

use reqwest::StatusCode;
use reqwest::header::CONTENT_TYPE;
use serde::Serialize;
use url::Url;

use crate::errors::{Error, Result};
use crate::types::MerchantSession;

#[derive(Debug, Serialize)]
struct ValidationRequest<'a> {
    #[serde(rename = "validationURL")]
    validation_url: &'a str,
}

/// POSTs `{"validationURL": ...}` to the merchant's validation endpoint and
/// parses the merchant session from a 200 response. Any other status is a
/// validation failure.
#[derive(Debug, Clone, Default)]
pub struct MerchantValidator {
    client: reqwest::Client,
}

impl MerchantValidator {
    pub fn new() -> Self {
        MerchantValidator {
            client: reqwest::Client::new(),
        }
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        MerchantValidator { client }
    }

    pub async fn validate(&self, endpoint: &Url, validation_url: &str) -> Result<MerchantSession> {
        let response = self
            .client
            .post(endpoint.clone())
            .header(CONTENT_TYPE, "application/json;charset=UTF-8")
            .json(&ValidationRequest { validation_url })
            .send()
            .await?;

        if response.status() != StatusCode::OK {
            return Err(Error::MerchantValidation(response.status().as_u16()));
        }

        Ok(response.json().await?)
    }
}
