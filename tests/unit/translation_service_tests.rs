/*!
 * Tests for the Gemini-backed translation service
 */

use serde_json::json;

use dynrtl::errors::TranslationError;
use dynrtl::translation::{
    DEFAULT_MODEL, DEFAULT_TONE, GeminiTranslator, SEGMENT_SEPARATOR, TranslationBackend, TranslationRequest,
    TranslationUnit,
};

use crate::common::mock_providers::{MockErrorType, MockGemini};

fn request(count: usize) -> TranslationRequest {
    TranslationRequest {
        api_key: "test-key".to_string(),
        model: DEFAULT_MODEL.to_string(),
        tone: DEFAULT_TONE.to_string(),
        units: (0..count)
            .map(|i| TranslationUnit {
                id: format!("unit-{}", i),
                text: format!("English sentence number {}", i),
            })
            .collect(),
    }
}

#[tokio::test]
async fn test_translate_should_map_segments_to_units_in_order() {
    let translator = GeminiTranslator::with_provider(MockGemini::replying_segments(&["1. یک", "2. دو", "3. سه"]));

    let results = translator.translate(&request(3)).await.unwrap();

    let translations: Vec<&str> = results.iter().map(|result| result.translation.as_str()).collect();
    assert_eq!(translations, vec!["یک", "دو", "سه"]);
    assert_eq!(results[2].id, "unit-2");
    assert_eq!(translator.provider().call_count(), 1);
}

#[tokio::test]
async fn test_translate_with_fewer_segments_should_pad_with_empty_results() {
    let translator = GeminiTranslator::with_provider(MockGemini::replying_segments(&["الف", "ب", "پ"]));

    let results = translator.translate(&request(5)).await.unwrap();

    assert_eq!(results.len(), 5);
    assert_eq!(results[2].translation, "پ");
    assert!(results[3].is_empty());
    assert!(results[4].is_empty());
}

#[tokio::test]
async fn test_prompt_should_carry_tone_and_every_text() {
    let translator = GeminiTranslator::with_provider(MockGemini::replying("ترجمه"));
    let mut single = request(2);
    single.tone = "دوستانه".to_string();

    translator.translate(&single).await.unwrap();

    let prompt = translator.provider().last_prompt().unwrap();
    assert!(prompt.contains("Use a دوستانه tone"));
    assert!(prompt.contains("1. English sentence number 0"));
    assert!(prompt.contains(&format!("{}\n2. English sentence number 1", SEGMENT_SEPARATOR)));
}

#[tokio::test]
async fn test_blocked_prompt_should_fail_with_reason() {
    let mock = MockGemini::default();
    mock.set_response_json(json!({ "promptFeedback": { "blockReason": "SAFETY" } }));
    let translator = GeminiTranslator::with_provider(mock);

    let error = translator.translate(&request(1)).await.unwrap_err();

    assert_eq!(
        error,
        TranslationError::Blocked {
            reason: "SAFETY".to_string()
        }
    );
    assert_eq!(error.error_code(), "BLOCKED");
}

#[tokio::test]
async fn test_safety_finish_without_text_should_be_blocked() {
    let mock = MockGemini::default();
    mock.set_response_json(json!({ "candidates": [{ "finishReason": "SAFETY" }] }));
    let translator = GeminiTranslator::with_provider(mock);

    let error = translator.translate(&request(1)).await.unwrap_err();
    assert!(matches!(error, TranslationError::Blocked { reason } if reason == "SAFETY"));
}

#[tokio::test]
async fn test_empty_candidates_should_be_empty_response() {
    let mock = MockGemini::default();
    mock.set_response_json(json!({ "candidates": [] }));
    let translator = GeminiTranslator::with_provider(mock);

    assert_eq!(
        translator.translate(&request(1)).await,
        Err(TranslationError::EmptyResponse)
    );
}

#[tokio::test]
async fn test_provider_errors_should_map_to_translation_errors() {
    let cases = [
        (MockErrorType::RateLimit, "RATE_LIMIT"),
        (MockErrorType::Auth, "INVALID_API_KEY"),
        (MockErrorType::Connection, "NETWORK_ERROR"),
    ];

    for (error_type, code) in cases {
        let translator = GeminiTranslator::with_provider(MockGemini::failing(error_type));
        let error = translator.translate(&request(1)).await.unwrap_err();
        assert_eq!(error.error_code(), code, "{:?}", error_type);
    }

    let rate_limited = GeminiTranslator::with_provider(MockGemini::failing(MockErrorType::RateLimit));
    let error = rate_limited.translate(&request(1)).await.unwrap_err();
    assert!(error.is_rate_limit());
    assert!(error.to_string().contains("RATE_LIMIT"));
}

#[tokio::test]
async fn test_incomplete_request_should_fail_before_calling_provider() {
    let translator = GeminiTranslator::with_provider(MockGemini::replying("x"));
    let mut no_key = request(1);
    no_key.api_key = " ".to_string();

    assert_eq!(translator.translate(&no_key).await, Err(TranslationError::MissingApiKey));
    assert!(translator.translate(&request(0)).await.is_err());
    assert_eq!(translator.provider().call_count(), 0);
}

#[tokio::test]
async fn test_api_key_check_should_report_invalid_and_missing_keys() {
    let translator = GeminiTranslator::with_provider(MockGemini::replying("ok"));

    assert_eq!(translator.verify_api_key("good-key").await, Ok(()));
    assert!(matches!(
        translator.verify_api_key("bad-key").await,
        Err(TranslationError::InvalidApiKey(_))
    ));
    assert_eq!(translator.verify_api_key("  ").await, Err(TranslationError::MissingApiKey));
    assert_eq!(translator.provider().call_count(), 2);
}
