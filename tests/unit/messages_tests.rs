/*!
 * Tests for the messaging contract
 */

use serde_json::json;

use dynrtl::errors::MessageError;
use dynrtl::messages::{Message, Reply};
use dynrtl::translation::{TranslationResult, TranslationUnit};

#[test]
fn test_nested_toggle_should_lose_to_top_level_fields() {
    let message = Message::parse(json!({
        "action": "toggleSite",
        "hostname": "example.com",
        "enabled": true,
        "data": { "enabled": false, "hostname": "other.com" }
    }))
    .unwrap();

    assert_eq!(
        message,
        Message::ToggleSite {
            hostname: Some("example.com".to_string()),
            enabled: true,
        }
    );
}

#[test]
fn test_batch_request_should_parse_units() {
    let message = Message::from_json(
        r#"{"action":"callGeminiTranslate","apiKey":"k","model":"m","tone":"رسمی",
            "texts":[{"id":"a","text":"Hello there"},{"id":"b","text":"Good bye"}]}"#,
    )
    .unwrap();

    match message {
        Message::CallGeminiTranslate { api_key, texts, .. } => {
            assert_eq!(api_key, "k");
            assert_eq!(
                texts[1],
                TranslationUnit {
                    id: "b".to_string(),
                    text: "Good bye".to_string()
                }
            );
        }
        other => panic!("unexpected message: {:?}", other),
    }
}

#[test]
fn test_missing_required_field_should_be_invalid() {
    assert!(matches!(
        Message::parse(json!({ "action": "toggleStatus" })),
        Err(MessageError::Invalid(_))
    ));
    assert!(matches!(Message::from_json("not json"), Err(MessageError::Invalid(_))));
}

#[test]
fn test_translations_reply_should_use_wire_shape() {
    let translations = Reply::translations(vec![TranslationResult {
        id: "a".to_string(),
        translation: "ترجمه".to_string(),
    }]);
    assert_eq!(
        translations.to_value(),
        json!({ "success": true, "translations": [{ "id": "a", "translation": "ترجمه" }] })
    );
    assert!(translations.is_success());
}

#[test]
fn test_received_failure_should_keep_its_error_class() {
    let reply: Reply = serde_json::from_value(json!({
        "success": false,
        "error": "RATE_LIMIT: quota",
        "errorCode": "RATE_LIMIT"
    }))
    .unwrap();

    assert!(!reply.is_success());
    assert!(reply.as_error().is_some_and(|error| error.is_rate_limit()));

    let ack: Reply = serde_json::from_value(json!({ "success": true })).unwrap();
    assert_eq!(ack, Reply::ok());
    assert_eq!(ack.as_error(), None);
}
