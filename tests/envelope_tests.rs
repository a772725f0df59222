use anyhow::Result;
use chrono::{TimeZone, Utc};
use notification_pipeline::models::envelope::{Envelope, EnvelopeContent, NotificationType};

/// Test: A well-formed wire payload parses into a validated envelope
#[test]
fn test_valid_payload_parses() -> Result<()> {
    let payload = r#"{
        "userId": "user1@example.com",
        "type": "order_update",
        "content": {
            "title": "Order order1001 Update",
            "body": "The status of your order order1001 is now: shipped.",
            "link": "/orders/order1001"
        },
        "sentAt": "2026-08-23T10:15:30Z"
    }"#;

    let envelope: Envelope = serde_json::from_str(payload)?;
    envelope.validate()?;

    assert_eq!(envelope.user_id, "user1@example.com");
    assert_eq!(envelope.notification_type, NotificationType::OrderUpdate);
    assert_eq!(envelope.content.title, "Order order1001 Update");
    assert_eq!(
        envelope.content.link.as_deref(),
        Some("/orders/order1001")
    );
    assert_eq!(
        envelope.sent_at,
        Some(Utc.with_ymd_and_hms(2026, 8, 23, 10, 15, 30).unwrap())
    );

    Ok(())
}

/// Test: read defaults to false and is never required on the wire
#[test]
fn test_read_defaults_to_false() -> Result<()> {
    let payload = r#"{
        "userId": "user2@example.com",
        "type": "promotion",
        "content": { "title": "Flash Sale!", "body": "20% off today." }
    }"#;

    let envelope: Envelope = serde_json::from_str(payload)?;

    assert!(!envelope.read);
    assert!(envelope.sent_at.is_none());
    assert!(envelope.content.link.is_none());

    Ok(())
}

/// Test: A payload missing content.body is rejected at parse time
#[test]
fn test_missing_body_is_malformed() {
    let payload = r#"{
        "userId": "user1@example.com",
        "type": "order_update",
        "content": { "title": "Order Update" }
    }"#;

    assert!(serde_json::from_str::<Envelope>(payload).is_err());
}

/// Test: A payload missing content entirely is rejected at parse time
#[test]
fn test_missing_content_is_malformed() {
    let payload = r#"{ "userId": "user1@example.com", "type": "promotion" }"#;

    assert!(serde_json::from_str::<Envelope>(payload).is_err());
}

/// Test: An unknown notification type is rejected at parse time
#[test]
fn test_unknown_type_is_malformed() {
    let payload = r#"{
        "userId": "user1@example.com",
        "type": "carrier_pigeon",
        "content": { "title": "t", "body": "b" }
    }"#;

    assert!(serde_json::from_str::<Envelope>(payload).is_err());
}

/// Test: Empty required fields fail validation even though they parse
#[test]
fn test_empty_fields_fail_validation() {
    let empty_user = Envelope::new(
        "",
        NotificationType::Promotion,
        EnvelopeContent::new("title", "body"),
    );
    assert!(empty_user.validate().is_err());

    let empty_title = Envelope::new(
        "user1@example.com",
        NotificationType::Promotion,
        EnvelopeContent::new("", "body"),
    );
    assert!(empty_title.validate().is_err());

    let empty_body = Envelope::new(
        "user1@example.com",
        NotificationType::Promotion,
        EnvelopeContent::new("title", "  "),
    );
    assert!(empty_body.validate().is_err());
}

/// Test: sentAt survives a serialize/deserialize round trip as ISO-8601
#[test]
fn test_sent_at_round_trip() -> Result<()> {
    let sent_at = Utc.with_ymd_and_hms(2026, 8, 23, 9, 0, 0).unwrap();

    let mut envelope = Envelope::new(
        "user3@example.com",
        NotificationType::Recommendation,
        EnvelopeContent::new("Recommended: New Laptops", "Trending picks just for you."),
    );
    envelope.sent_at = Some(sent_at);

    let json = serde_json::to_string(&envelope)?;
    assert!(json.contains("\"sentAt\""));
    assert!(json.contains("2026-08-23T09:00:00Z"));

    let parsed: Envelope = serde_json::from_str(&json)?;
    assert_eq!(parsed, envelope);

    Ok(())
}

/// Test: Wire field names stay camelCase and the type tag stays snake_case
#[test]
fn test_wire_field_names() -> Result<()> {
    let envelope = Envelope::new(
        "user1@example.com",
        NotificationType::OrderUpdate,
        EnvelopeContent::new("t", "b"),
    );

    let value = serde_json::to_value(&envelope)?;

    assert!(value.get("userId").is_some());
    assert_eq!(value["type"], "order_update");
    assert!(value.get("user_id").is_none());

    Ok(())
}
