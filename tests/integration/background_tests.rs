/*!
 * Integration tests for the background coordinator
 */

use std::sync::Arc;

use serde_json::json;

use dynrtl::background::{Background, MessagingBackend};
use dynrtl::content::{PageSession, RTL_ATTR};
use dynrtl::dom::parse_html;
use dynrtl::errors::TranslationError;
use dynrtl::messages::{Message, Reply};
use dynrtl::settings::Settings;
use dynrtl::translation::{GeminiTranslator, TranslationBackend, TranslationUnit};

use crate::common::mock_providers::{MockBackend, MockErrorType, MockGemini};
use crate::common::{by_id, create_temp_dir, mixed_page};

fn gemini_background(mock: MockGemini) -> Background {
    let background = Background::new(Settings::in_memory(), Arc::new(GeminiTranslator::with_provider(mock)));
    background.on_installed();
    background
}

#[tokio::test]
async fn test_batch_translation_message_should_reply_with_translations() {
    let background = gemini_background(MockGemini::replying_segments(&["سلام", "خداحافظ"]));
    let message = Message::parse(json!({
        "action": "callGeminiTranslate",
        "data": {
            "apiKey": "key",
            "model": "gemini-test",
            "tone": "رسمی",
            "texts": [
                { "id": "a", "text": "Hello" },
                { "id": "b", "text": "Goodbye" }
            ]
        }
    }))
    .unwrap();

    let outcome = background.handle(message, None).await;

    assert_eq!(outcome.push, None);
    assert_eq!(
        outcome.reply.to_value(),
        json!({
            "success": true,
            "translations": [
                { "id": "a", "translation": "سلام" },
                { "id": "b", "translation": "خداحافظ" }
            ]
        })
    );
}

#[tokio::test]
async fn test_rate_limited_batch_should_carry_error_code() {
    let background = gemini_background(MockGemini::failing(MockErrorType::RateLimit));

    let outcome = background
        .handle(
            Message::CallGeminiTranslate {
                api_key: "key".to_string(),
                model: "m".to_string(),
                tone: "t".to_string(),
                texts: vec![TranslationUnit {
                    id: "a".to_string(),
                    text: "Hello".to_string(),
                }],
            },
            None,
        )
        .await;

    let value = outcome.reply.to_value();
    assert_eq!(value["success"], false);
    assert_eq!(value["errorCode"], "RATE_LIMIT");
    assert!(value["error"].as_str().unwrap().contains("RATE_LIMIT"));
}

#[tokio::test]
async fn test_api_key_check_should_classify_missing_and_invalid_keys() {
    let background = gemini_background(MockGemini::replying("ok"));

    let ok = background
        .handle(Message::TestApiKey { api_key: "good".to_string() }, None)
        .await;
    assert_eq!(ok.reply, Reply::ok());

    let missing = background
        .handle(Message::TestApiKey { api_key: "  ".to_string() }, None)
        .await;
    assert_eq!(missing.reply.as_error(), Some(TranslationError::MissingApiKey));

    let invalid = background
        .handle(Message::TestApiKey { api_key: "bad-key".to_string() }, None)
        .await;
    assert!(!invalid.reply.is_success());
    assert!(matches!(invalid.reply, Reply::Failure { error_code: None, .. }));
}

#[tokio::test]
async fn test_tab_info_without_hostname_should_fail() {
    let background = gemini_background(MockGemini::default());

    let outcome = background.handle(Message::GetCurrentTabInfo, Some("about:blank")).await;
    assert!(!outcome.reply.is_success());

    let outcome = background
        .handle(Message::ToggleSite { hostname: None, enabled: false }, None)
        .await;
    assert!(!outcome.reply.is_success());
    assert_eq!(outcome.push, None);
}

#[tokio::test]
async fn test_page_bound_message_should_be_unsupported() {
    let background = gemini_background(MockGemini::default());
    let outcome = background.handle(Message::UpdateFont, None).await;
    assert_eq!(outcome.reply, Reply::error("Unsupported message: updateFont"));
}

#[tokio::test]
async fn test_toggle_push_should_reach_the_page() {
    let background = Background::new(Settings::in_memory(), Arc::new(MockBackend::new()));
    background.on_installed();
    let session = PageSession::with_defaults(parse_html(&mixed_page("en")));
    session
        .start_with_settings(background.settings(), "news.example.com")
        .unwrap();
    assert!(session.is_enabled());

    let outcome = background
        .handle(
            Message::ToggleSite {
                hostname: None,
                enabled: false,
            },
            Some("https://news.example.com/today"),
        )
        .await;
    let push = outcome.push.unwrap();
    let reply = session
        .handle_message(push, background.settings(), &MockBackend::new())
        .await;

    assert_eq!(reply, Reply::ok());
    assert!(!session.is_enabled());
    let doc = session.document().lock();
    assert_eq!(doc.attr(by_id(&doc, "fa"), RTL_ATTR), None);
}

#[tokio::test]
async fn test_site_choices_should_survive_restart() {
    let dir = create_temp_dir().unwrap();
    let path = dir.path().join("storage.json");

    {
        let background = Background::new(Settings::open(&path).unwrap(), Arc::new(MockBackend::new()));
        background.on_installed();
        background
            .handle(Message::ToggleDefaultMode { default_enabled: false }, None)
            .await;
        background
            .handle(
                Message::ToggleSite {
                    hostname: Some("Blog.Example.com".to_string()),
                    enabled: true,
                },
                None,
            )
            .await;
    }

    let background = Background::new(Settings::open(&path).unwrap(), Arc::new(MockBackend::new()));
    background.on_installed();

    let blog = background
        .handle(Message::GetCurrentTabInfo, Some("https://blog.example.com/post"))
        .await;
    assert_eq!(
        blog.reply,
        Reply::TabInfo {
            hostname: "blog.example.com".to_string(),
            is_enabled: true,
            default_enabled: false,
        }
    );

    let other = background
        .handle(Message::GetCurrentTabInfo, Some("https://other.example.com"))
        .await;
    assert!(matches!(other.reply, Reply::TabInfo { is_enabled: false, .. }));
}

#[tokio::test]
async fn test_key_check_through_messages_should_rebuild_errors() {
    let backend = MessagingBackend::new(gemini_background(MockGemini::replying("ok")));

    assert_eq!(backend.verify_api_key("good").await, Ok(()));
    assert_eq!(backend.verify_api_key("  ").await, Err(TranslationError::MissingApiKey));
    assert!(matches!(
        backend.verify_api_key("bad-key").await,
        Err(TranslationError::Api(_))
    ));
}
