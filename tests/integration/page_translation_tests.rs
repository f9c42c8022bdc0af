/*!
 * Integration tests for translating a page through a session
 */

use std::sync::Arc;
use std::time::{Duration, Instant};

use dynrtl::background::{Background, MessagingBackend};
use dynrtl::content::{
    GENERATED_ID_PREFIX, OrchestratorState, PROCESSED_ATTR, PageSession, ProgressIndicator, RTL_ATTR, TRANSLATION_CONTAINER_CLASS,
    TranslatePageRequest, clear_translations,
};
use dynrtl::dom::parse_html;
use dynrtl::errors::TranslationError;
use dynrtl::messages::{Message, Reply};
use dynrtl::scheduler::Clock;
use dynrtl::settings::Settings;
use dynrtl::translation::GeminiTranslator;

use crate::common::mock_providers::{GatedBackend, MockBackend, MockErrorType, MockGemini};
use crate::common::{ManualClock, by_id, english_page, mixed_page};

fn request() -> TranslatePageRequest {
    TranslatePageRequest {
        api_key: "test-key".to_string(),
        tone: "رسمی".to_string(),
        model: "gemini-test".to_string(),
    }
}

/// Backend reaching a mocked Gemini through the background coordinator
fn through_background(mock: MockGemini) -> MessagingBackend {
    let background = Background::new(Settings::in_memory(), Arc::new(GeminiTranslator::with_provider(mock)));
    MessagingBackend::new(background)
}

fn annotations(session: &PageSession) -> usize {
    let doc = session.document().lock();
    doc.find_elements(|doc, id| doc.has_class(id, TRANSLATION_CONTAINER_CLASS))
        .len()
}

#[tokio::test]
async fn test_mixed_page_should_mark_persian_and_translate_english() {
    let session = PageSession::with_defaults(parse_html(&mixed_page("en")));
    assert_eq!(session.start(true), 1);
    let backend = MockBackend::new();

    let summary = session.translate_page(&backend, &request()).await.unwrap();

    assert_eq!(summary.sent, 1);
    assert_eq!(summary.translated, 1);
    assert_eq!(summary.inserted, 1);

    let sent = backend.last_request().unwrap();
    assert_eq!(sent.units.len(), 1);
    assert_eq!(sent.units[0].id, "en");
    assert_eq!(sent.tone, "رسمی");

    let doc = session.document().lock();
    let english = by_id(&doc, "en");
    assert_eq!(doc.attr(english, PROCESSED_ATTR), Some("true"));
    let annotation = doc.next_element_sibling(english).unwrap();
    assert!(doc.has_class(annotation, TRANSLATION_CONTAINER_CLASS));
    assert_eq!(doc.attr(annotation, "dir"), Some("rtl"));
    assert_eq!(doc.text_content(annotation), "ترجمه en");

    // The inserted Persian text is picked up by the live pass
    let span = doc.element_children(annotation)[0];
    assert_eq!(doc.attr(span, RTL_ATTR), Some("true"));
    assert_eq!(doc.attr(by_id(&doc, "fa"), PROCESSED_ATTR), None);
}

#[tokio::test]
async fn test_second_run_should_find_nothing_left_to_translate() {
    let session = PageSession::with_defaults(parse_html(&mixed_page("en")));
    session.start(true);
    let backend = MockBackend::new();

    session.translate_page(&backend, &request()).await.unwrap();
    let second = session.translate_page(&backend, &request()).await;

    assert_eq!(second, Err(TranslationError::NoTranslatableText));
    assert_eq!(backend.call_count(), 1);
    assert_eq!(annotations(&session), 1);
}

#[tokio::test]
async fn test_cleared_translations_should_be_translated_again() {
    let session = PageSession::with_defaults(parse_html(&english_page(3)));
    session.start(true);
    let backend = MockBackend::new();

    session.translate_page(&backend, &request()).await.unwrap();
    assert_eq!(annotations(&session), 3);

    assert_eq!(clear_translations(&mut session.document().lock()), 3);
    let summary = session.translate_page(&backend, &request()).await.unwrap();

    assert_eq!(summary.inserted, 3);
    assert_eq!(annotations(&session), 3);
    // Generated identities are reused, not regenerated
    let ids: Vec<String> = backend
        .last_request()
        .unwrap()
        .units
        .into_iter()
        .map(|unit| unit.id)
        .collect();
    assert_eq!(ids, vec!["gemini-translate-id-0", "gemini-translate-id-1", "gemini-translate-id-2"]);
}

#[tokio::test]
async fn test_persian_page_should_stay_idle() {
    let session = PageSession::with_defaults(parse_html(&mixed_page("fa-IR")));

    assert_eq!(session.start(true), 0);
    assert!(session.is_idle());
    let doc = session.document().lock();
    assert!(doc.find_elements(|doc, id| doc.has_attr(id, RTL_ATTR)).is_empty());
}

#[tokio::test]
async fn test_concurrent_request_should_be_rejected_while_running() {
    let session = PageSession::with_defaults(parse_html(&english_page(2)));
    session.start(true);
    let backend = GatedBackend::new();
    let request = request();

    let first = session.translate_page(&backend, &request);
    let second = async {
        backend.wait_entered().await;
        assert_eq!(session.orchestrator().state(), OrchestratorState::AwaitingApi);
        let result = session.translate_page(&backend, &request).await;
        backend.release();
        result
    };
    let (first, second) = tokio::join!(first, second);

    assert_eq!(second, Err(TranslationError::AlreadyRunning));
    assert_eq!(first.unwrap().inserted, 2);
    assert_eq!(backend.call_count(), 1);
    assert!(!session.orchestrator().is_busy());
    assert_eq!(session.orchestrator().state(), OrchestratorState::Idle);
}

#[tokio::test]
async fn test_missing_api_key_should_fail_before_extraction() {
    let session = PageSession::with_defaults(parse_html(&english_page(1)));
    session.start(true);
    let backend = MockBackend::new();
    let mut no_key = request();
    no_key.api_key.clear();

    assert_eq!(
        session.translate_page(&backend, &no_key).await,
        Err(TranslationError::MissingApiKey)
    );
    assert_eq!(backend.call_count(), 0);
    let doc = session.document().lock();
    assert!(
        doc.find_elements(|doc, id| doc.attr(id, "id").is_some_and(|value| value.starts_with(GENERATED_ID_PREFIX)))
            .is_empty()
    );
    assert!(ProgressIndicator::find(&doc).is_none());
}

#[tokio::test]
async fn test_rate_limit_should_keep_indicator_visible() {
    let session = PageSession::with_defaults(parse_html(&english_page(1)));
    session.start(true);
    let backend = MockBackend::failing(TranslationError::RateLimited("quota".to_string()));

    let error = session.translate_page(&backend, &request()).await.unwrap_err();

    assert!(error.is_rate_limit());
    assert_eq!(session.orchestrator().state(), OrchestratorState::Failed);
    let doc = session.document().lock();
    assert!(ProgressIndicator::is_visible(&doc));
    assert_eq!(ProgressIndicator::text(&doc).as_deref(), Some("محدودیت تعداد درخواست API"));
}

#[tokio::test]
async fn test_generic_failure_should_hide_indicator() {
    let session = PageSession::with_defaults(parse_html(&english_page(1)));
    session.start(true);
    let backend = MockBackend::failing(TranslationError::Network("offline".to_string()));

    let error = session.translate_page(&backend, &request()).await.unwrap_err();

    assert_eq!(error.error_code(), "NETWORK_ERROR");
    assert!(!ProgressIndicator::is_visible(&session.document().lock()));
    assert_eq!(annotations(&session), 0);
}

#[tokio::test]
async fn test_completed_indicator_should_hide_after_delay() {
    let session = PageSession::with_defaults(parse_html(&english_page(1)));
    session.start(true);

    session.translate_page(&MockBackend::new(), &request()).await.unwrap();
    assert!(ProgressIndicator::is_visible(&session.document().lock()));

    session.tick(Instant::now() + Duration::from_secs(5));
    assert!(!ProgressIndicator::is_visible(&session.document().lock()));
}

#[tokio::test]
async fn test_pushed_messages_should_drive_the_session() {
    let settings = Settings::in_memory();
    let session = PageSession::with_defaults(parse_html(&mixed_page("en")));
    session.start(true);
    let backend = MockBackend::new();

    let reply = session
        .handle_message(Message::ToggleStatus { status: false }, &settings, &backend)
        .await;
    assert_eq!(reply, Reply::ok());
    assert!(!session.is_enabled());
    {
        let doc = session.document().lock();
        assert_eq!(doc.attr(by_id(&doc, "fa"), RTL_ATTR), None);
    }

    let reply = session
        .handle_message(
            Message::TranslatePage {
                api_key: String::new(),
                tone: "رسمی".to_string(),
                model: "m".to_string(),
            },
            &settings,
            &backend,
        )
        .await;
    assert_eq!(reply.as_error(), Some(TranslationError::MissingApiKey));

    session
        .handle_message(Message::ShowApiKeyNeededError, &settings, &backend)
        .await;
    assert!(ProgressIndicator::is_visible(&session.document().lock()));
    session.tick(Instant::now() + Duration::from_secs(5));
    assert!(!ProgressIndicator::is_visible(&session.document().lock()));
}

#[tokio::test]
async fn test_translation_through_background_should_insert_annotations() {
    let session = PageSession::with_defaults(parse_html(&mixed_page("en")));
    session.start(true);
    let backend = through_background(MockGemini::replying_segments(&["1. ترجمه پاراگراف انگلیسی"]));

    let summary = session.translate_page(&backend, &request()).await.unwrap();

    assert_eq!(summary.inserted, 1);
    let doc = session.document().lock();
    let annotation = doc.next_element_sibling(by_id(&doc, "en")).unwrap();
    assert_eq!(doc.text_content(annotation), "ترجمه پاراگراف انگلیسی");
}

#[tokio::test]
async fn test_rate_limit_through_background_should_keep_its_class() {
    let session = PageSession::with_defaults(parse_html(&english_page(1)));
    session.start(true);
    let backend = through_background(MockGemini::failing(MockErrorType::RateLimit));

    let error = session.translate_page(&backend, &request()).await.unwrap_err();

    assert!(error.is_rate_limit());
    assert_eq!(error.error_code(), "RATE_LIMIT");
    assert_eq!(session.orchestrator().state(), OrchestratorState::Failed);
    let doc = session.document().lock();
    assert!(ProgressIndicator::is_visible(&doc));
    assert_eq!(ProgressIndicator::text(&doc).as_deref(), Some("محدودیت تعداد درخواست API"));
}

#[tokio::test]
async fn test_indicator_hide_should_follow_the_session_clock() {
    let clock = ManualClock::new();
    clock.advance(Duration::from_secs(60));
    let session = PageSession::with_defaults(parse_html(&english_page(1))).with_clock(clock.clone());
    session.start(true);

    session.translate_page(&MockBackend::new(), &request()).await.unwrap();

    session.tick(clock.now() + Duration::from_secs(2));
    assert!(ProgressIndicator::is_visible(&session.document().lock()));
    session.tick(clock.now() + Duration::from_millis(2500));
    assert!(!ProgressIndicator::is_visible(&session.document().lock()));
}

#[tokio::test]
async fn test_api_key_notice_should_hide_after_four_seconds() {
    let clock = ManualClock::new();
    let session = PageSession::with_defaults(parse_html(&english_page(1))).with_clock(clock.clone());
    session.start(true);

    session
        .handle_message(Message::ShowApiKeyNeededError, &Settings::in_memory(), &MockBackend::new())
        .await;

    session.tick(clock.now() + Duration::from_secs(3));
    assert!(ProgressIndicator::is_visible(&session.document().lock()));
    session.tick(clock.now() + Duration::from_secs(4));
    assert!(!ProgressIndicator::is_visible(&session.document().lock()));
}
