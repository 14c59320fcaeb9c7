//! Integration test for the full mapping flow.
//!
//! Body posted by the browser → validated event → enriched event → provider payload.

use capi_core::{
    hashing::sha256_hex, ClientContext, ForwardResult, InboundEvent, ProviderPayload, RelayError,
    MISSING_FIELDS_MESSAGE,
};
use serde_json::{json, Value};

fn map_body(body: Value, forwarded_for: Option<&str>, test_code: Option<&str>) -> Value {
    let inbound: InboundEvent = serde_json::from_value(body).expect("body should parse");
    let event = inbound
        .validate()
        .expect("event should validate")
        .enrich(ClientContext::resolve(forwarded_for, None, Some("Mozilla/5.0")));

    let user_data = event.validate().expect("forward event should validate");
    let payload = ProviderPayload::for_event(&event, user_data, 1_700_000_000, test_code);
    serde_json::to_value(payload).expect("payload should serialize")
}

#[test]
fn test_lead_event_maps_to_hashed_payload() {
    let payload = map_body(
        json!({
            "eventName": "Lead",
            "eventId": "abc123",
            "eventSourceUrl": "https://x.test/",
            "userData": { "email": "A@B.com" }
        }),
        Some("198.51.100.4, 10.0.0.1"),
        None,
    );

    let record = &payload["data"][0];
    assert_eq!(record["event_name"], "Lead");
    assert_eq!(record["event_id"], "abc123");
    assert_eq!(record["action_source"], "website");
    assert_eq!(record["event_time"], 1_700_000_000);
    assert_eq!(record["user_data"]["em"], sha256_hex("a@b.com"));
    assert_eq!(record["user_data"]["client_ip_address"], "198.51.100.4");
    assert_eq!(record["user_data"]["client_user_agent"], "Mozilla/5.0");
    assert!(!payload.to_string().contains("A@B.com"));
}

#[test]
fn test_client_event_time_is_kept() {
    let body = json!({
        "eventName": "ViewContent",
        "eventId": "vc-1",
        "eventSourceUrl": "https://x.test/p/1",
        "eventTime": 1_650_000_000
    });
    let inbound: InboundEvent = serde_json::from_value(body).unwrap();
    let event = inbound.validate().unwrap().enrich(ClientContext::default());
    let user_data = event.validate().unwrap();

    let time = capi_core::payload::resolve_event_time(event.event_time, 1_700_000_000);
    let payload = ProviderPayload::for_event(&event, user_data, time, None);
    assert_eq!(payload.event().unwrap().event_time, 1_650_000_000);
}

#[test]
fn test_test_event_code_and_custom_data() {
    let payload = map_body(
        json!({
            "eventName": "Purchase",
            "eventId": "p-9",
            "eventSourceUrl": "https://x.test/checkout",
            "userData": { "phone": 15550100, "firstName": " Ada ", "lastName": "LOVELACE" },
            "customData": { "value": 10, "currency": "EUR" }
        }),
        None,
        Some("TEST4242"),
    );

    assert_eq!(payload["test_event_code"], "TEST4242");
    let record = &payload["data"][0];
    assert_eq!(record["custom_data"], json!({ "value": 10, "currency": "EUR" }));
    assert_eq!(record["user_data"]["ph"], sha256_hex("15550100"));
    assert_eq!(record["user_data"]["fn"], sha256_hex("ada"));
    assert_eq!(record["user_data"]["ln"], sha256_hex("lovelace"));
    assert!(record["user_data"].get("client_ip_address").is_none());
}

#[test]
fn test_empty_custom_data_is_dropped() {
    let payload = map_body(
        json!({
            "eventName": "Lead",
            "eventId": "l-1",
            "eventSourceUrl": "https://x.test/",
            "customData": {}
        }),
        None,
        None,
    );
    assert!(payload["data"][0].get("custom_data").is_none());
}

#[test]
fn test_missing_event_id_is_rejected() {
    let inbound: InboundEvent = serde_json::from_value(json!({
        "eventName": "Lead",
        "eventSourceUrl": "https://x.test/"
    }))
    .unwrap();

    let err = inbound.validate().unwrap_err();
    assert!(matches!(err, RelayError::MissingRequiredFields { .. }));
    assert_eq!(err.http_status_code(), 400);

    let body = serde_json::to_value(err.to_error_response()).unwrap();
    assert_eq!(body, json!({ "success": false, "error": MISSING_FIELDS_MESSAGE }));
}

#[test]
fn test_forward_result_from_validation_failure() {
    let mut event = InboundEvent {
        event_name: Some("Lead".to_string()),
        event_id: Some("x".to_string()),
        event_source_url: Some("https://x.test/".to_string()),
        ..Default::default()
    }
    .validate()
    .unwrap()
    .enrich(ClientContext::default());
    event.user_data = None;

    let result: ForwardResult = event.validate().map(|_| Value::Null).into();
    assert!(!result.is_success());
    assert_eq!(result.to_json()["error"]["code"], "VALIDATION_ERROR");
}
