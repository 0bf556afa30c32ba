#![cfg(feature = "merchant-validation")]

use std::sync::{Arc, Mutex};

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, header::CONTENT_TYPE};
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{Value, json};
use url::Url;

use applepay_kit::errors::Error;
use applepay_kit::types::MerchantSession;
use applepay_kit::validation::MerchantValidator;

#[derive(Clone, Default)]
struct Seen {
    content_type: Arc<Mutex<Option<String>>>,
    body: Arc<Mutex<Option<Value>>>,
}

async fn validate(
    State(seen): State<Seen>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Json<Value> {
    *seen.content_type.lock().unwrap() = headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);
    *seen.body.lock().unwrap() = Some(body);
    Json(json!({
        "merchantSessionIdentifier": "mnp_abc123",
        "nonce": "d1e4f8",
    }))
}

async fn broken() -> StatusCode {
    StatusCode::INTERNAL_SERVER_ERROR
}

async fn spawn_endpoint() -> (Url, Seen) {
    let seen = Seen::default();
    let app = Router::new()
        .route("/validate", post(validate))
        .route("/broken", post(broken))
        .with_state(seen.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (Url::parse(&format!("http://{addr}/")).unwrap(), seen)
}

#[tokio::test]
async fn round_trip_posts_the_validation_url_and_parses_the_session() {
    let (base, seen) = spawn_endpoint().await;
    let endpoint = base.join("validate").unwrap();

    let session = MerchantValidator::new()
        .validate(
            &endpoint,
            "https://apple-pay-gateway.apple.com/paymentservices/startSession",
        )
        .await
        .unwrap();

    assert_eq!(
        session,
        MerchantSession(json!({
            "merchantSessionIdentifier": "mnp_abc123",
            "nonce": "d1e4f8",
        }))
    );
    assert_eq!(
        seen.content_type.lock().unwrap().as_deref(),
        Some("application/json;charset=UTF-8")
    );
    assert_eq!(
        seen.body.lock().unwrap().clone().unwrap(),
        json!({
            "validationURL": "https://apple-pay-gateway.apple.com/paymentservices/startSession"
        })
    );
}

#[tokio::test]
async fn non_200_status_is_a_validation_failure() {
    let (base, _seen) = spawn_endpoint().await;
    let endpoint = base.join("broken").unwrap();

    let err = MerchantValidator::new()
        .validate(&endpoint, "https://apple-pay-gateway.apple.com/start")
        .await
        .unwrap_err();

    assert!(matches!(err, Error::MerchantValidation(500)));
}
