mod utils;

use std::sync::Arc;

use anyhow::Result;
use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use http_body_util::BodyExt;
use product_notifier::{
    api::{AppState, router},
    config::Config,
};
use serde_json::{Value, json};
use tower::ServiceExt;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{method, path},
};

use crate::utils::{Harness, delivered, failed, service_bus_connection_string};

fn app(harness: Harness, missing_email_settings: Vec<&'static str>) -> Router {
    router(Arc::new(AppState {
        relay: harness.relay,
        missing_email_settings,
    }))
}

async fn invoke(app: Router, payload: Value) -> Result<(StatusCode, Value)> {
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/ProcessProductChanges")
                .header("content-type", "application/json")
                .body(Body::from(payload.to_string()))?,
        )
        .await?;

    let status = response.status();
    let bytes = response.into_body().collect().await?.to_bytes();

    Ok((status, serde_json::from_slice(&bytes)?))
}

fn trigger(body: &str) -> Value {
    json!({
        "Data": { "azservicebus": body },
        "Metadata": { "MessageId": "3f1c0b6e" }
    })
}

/// Test: Handled invocations answer 200 with a custom handler envelope
#[tokio::test]
async fn test_handled_invocation_returns_ok() -> Result<()> {
    let harness = Harness::healthy();
    let calls = Arc::clone(&harness.calls);

    let (status, body) = invoke(app(harness, vec![]), trigger(r#"{"product_id": "P123"}"#)).await?;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["Outputs"], json!({}));
    assert_eq!(body["ReturnValue"], Value::Null);
    assert!(body["Logs"][0].as_str().unwrap_or_default().contains("P123"));
    assert_eq!(*calls.lock().unwrap(), vec!["email", "publish"]);

    Ok(())
}

/// Test: Ignored messages still complete the invocation
#[tokio::test]
async fn test_ignored_message_returns_ok() -> Result<()> {
    let harness = Harness::healthy();
    let calls = Arc::clone(&harness.calls);

    let (status, _) = invoke(app(harness, vec![]), trigger("not-json")).await?;

    assert_eq!(status, StatusCode::OK);
    assert!(calls.lock().unwrap().is_empty());

    Ok(())
}

/// Test: A failed publish surfaces as a failed invocation
#[tokio::test]
async fn test_publish_failure_returns_server_error() -> Result<()> {
    let harness = Harness::new(delivered(202), failed("connection reset"));

    let (status, body) = invoke(app(harness, vec![]), trigger(r#"{"product_id": 7}"#)).await?;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(
        body["Logs"][0]
            .as_str()
            .unwrap_or_default()
            .contains("connection reset")
    );

    Ok(())
}

/// Test: Requests without the trigger binding are rejected
#[tokio::test]
async fn test_missing_binding_returns_bad_request() -> Result<()> {
    let harness = Harness::healthy();
    let calls = Arc::clone(&harness.calls);

    let (status, _) = invoke(app(harness, vec![]), json!({ "Data": {} })).await?;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(calls.lock().unwrap().is_empty());

    Ok(())
}

/// Test: Health reports degraded e-mail when SendGrid settings are missing
#[tokio::test]
async fn test_health_reports_missing_email_settings() -> Result<()> {
    let app = app(Harness::healthy(), vec!["SENDGRID_API_KEY"]);

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty())?)
        .await?;

    assert_eq!(response.status(), StatusCode::OK);

    let bytes = response.into_body().collect().await?.to_bytes();
    let body: Value = serde_json::from_slice(&bytes)?;

    assert_eq!(body["status"], "degraded");
    assert_eq!(body["checks"]["email"]["status"], "degraded");
    assert_eq!(body["checks"]["email"]["error"], "Missing settings: SENDGRID_API_KEY");

    Ok(())
}

/// Test: Health is healthy when every e-mail setting is present
#[tokio::test]
async fn test_health_reports_complete_settings() -> Result<()> {
    let app = app(Harness::healthy(), vec![]);

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty())?)
        .await?;

    assert_eq!(response.status(), StatusCode::OK);

    let bytes = response.into_body().collect().await?.to_bytes();
    let body: Value = serde_json::from_slice(&bytes)?;

    assert_eq!(body["status"], "healthy");
    assert_eq!(body["checks"]["email"]["status"], "healthy");
    assert!(body["checks"]["email"].get("error").is_none());

    Ok(())
}

/// Test: Full configuration against mocked SendGrid and Service Bus endpoints
#[tokio::test]
async fn test_end_to_end_product_update() -> Result<()> {
    let sendgrid = MockServer::start().await;
    let service_bus = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v3/mail/send"))
        .respond_with(ResponseTemplate::new(202))
        .expect(1)
        .mount(&sendgrid)
        .await;

    Mock::given(method("POST"))
        .and(path("/anntraders-confirmations/messages"))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&service_bus)
        .await;

    let config = Config {
        sendgrid_api_key: Some("SG.test-key".to_string()),
        sendgrid_sender_email: Some("noreply@anntraders.com".to_string()),
        admin_email: Some("admin@anntraders.com".to_string()),
        sendgrid_api_url: sendgrid.uri(),
        azure_service_bus_connection_string: Some(service_bus_connection_string(
            &service_bus.uri(),
        )),
        queue_name: Some("anntraders-confirmations".to_string()),
        http_timeout_seconds: 5,
        functions_customhandler_port: 0,
    };
    config.validate()?;

    let app = router(Arc::new(AppState::from_config(&config)?));
    let (status, _) = invoke(app, trigger(r#"{"product_id": "P123"}"#)).await?;

    assert_eq!(status, StatusCode::OK);

    let mails = sendgrid.received_requests().await.unwrap_or_default();
    let mail: Value = serde_json::from_slice(&mails[0].body)?;
    assert!(mail["subject"].as_str().unwrap_or_default().contains("P123"));

    let messages = service_bus.received_requests().await.unwrap_or_default();
    assert_eq!(messages.len(), 1);
    assert_eq!(String::from_utf8(messages[0].body.clone())?, "Product updated");

    Ok(())
}
