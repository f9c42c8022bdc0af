/*!
 * Mock provider and backend implementations for testing
 *
 * These doubles avoid external API calls. `MockGemini` stands in for the
 * HTTP provider under `GeminiTranslator`; the backends stand in for the
 * whole translation service under the orchestrator and background.
 */

use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;
use serde_json::json;
use tokio::sync::Notify;

use dynrtl::errors::{ProviderError, TranslationError};
use dynrtl::providers::Provider;
use dynrtl::providers::gemini::{GeminiRequest, GeminiResponse};
use dynrtl::translation::{SEGMENT_SEPARATOR, TranslationBackend, TranslationRequest, TranslationResult};

/// Type of error to simulate
#[derive(Debug, Clone, Copy)]
pub enum MockErrorType {
    /// Authentication error (invalid API key)
    Auth,
    /// Connection error
    Connection,
    /// Rate limit error
    RateLimit,
}

impl MockErrorType {
    fn to_error(self) -> ProviderError {
        match self {
            Self::Auth => ProviderError::AuthenticationError("API key not valid".to_string()),
            Self::Connection => ProviderError::ConnectionError("connection refused".to_string()),
            Self::RateLimit => ProviderError::RateLimitExceeded("quota exceeded".to_string()),
        }
    }
}

/// Mock Gemini provider replying with a fixed response
#[derive(Debug, Default)]
pub struct MockGemini {
    response: Mutex<Option<GeminiResponse>>,
    error: Mutex<Option<MockErrorType>>,
    prompts: Mutex<Vec<String>>,
    calls: AtomicUsize,
}

impl MockGemini {
    /// Provider answering with `text` as the only candidate
    pub fn replying(text: &str) -> Self {
        let mock = Self::default();
        mock.set_response_json(json!({
            "candidates": [{ "content": { "role": "model", "parts": [{ "text": text }] }, "finishReason": "STOP" }]
        }));
        mock
    }

    /// Provider answering with the given segments joined by the separator
    pub fn replying_segments(segments: &[&str]) -> Self {
        Self::replying(&segments.join(&format!("\n{}\n", SEGMENT_SEPARATOR)))
    }

    /// Provider failing every call
    pub fn failing(error_type: MockErrorType) -> Self {
        let mock = Self::default();
        *mock.error.lock() = Some(error_type);
        mock
    }

    pub fn set_response_json(&self, value: serde_json::Value) {
        let response: GeminiResponse = serde_json::from_value(value).expect("valid mock response");
        *self.response.lock() = Some(response);
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_prompt(&self) -> Option<String> {
        self.prompts.lock().last().cloned()
    }
}

#[async_trait]
impl Provider for MockGemini {
    type Request = GeminiRequest;
    type Response = GeminiResponse;

    async fn complete(&self, request: GeminiRequest) -> Result<GeminiResponse, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().push(request.prompt_text());
        if let Some(error_type) = *self.error.lock() {
            return Err(error_type.to_error());
        }
        Ok(self.response.lock().clone().unwrap_or_default())
    }

    async fn test_connection(&self, api_key: &str) -> Result<(), ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if api_key == "bad-key" {
            return Err(MockErrorType::Auth.to_error());
        }
        match *self.error.lock() {
            Some(error_type) => Err(error_type.to_error()),
            None => Ok(()),
        }
    }

    fn extract_text(response: &GeminiResponse) -> String {
        response
            .candidates
            .first()
            .and_then(|candidate| candidate.content.as_ref())
            .map(|content| content.parts.iter().filter_map(|part| part.text.as_deref()).collect())
            .unwrap_or_default()
    }
}

/// Backend translating every unit to `ترجمه <id>`
#[derive(Debug, Default)]
pub struct MockBackend {
    calls: AtomicUsize,
    requests: Mutex<Vec<TranslationRequest>>,
    error: Mutex<Option<TranslationError>>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Backend failing every call with `error`
    pub fn failing(error: TranslationError) -> Self {
        let backend = Self::default();
        *backend.error.lock() = Some(error);
        backend
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> Option<TranslationRequest> {
        self.requests.lock().last().cloned()
    }
}

#[async_trait]
impl TranslationBackend for MockBackend {
    async fn translate(&self, request: &TranslationRequest) -> Result<Vec<TranslationResult>, TranslationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().push(request.clone());
        if let Some(error) = self.error.lock().clone() {
            return Err(error);
        }
        Ok(request
            .units
            .iter()
            .map(|unit| TranslationResult {
                id: unit.id.clone(),
                translation: format!("ترجمه {}", unit.id),
            })
            .collect())
    }
}

/// Backend that blocks until released, for overlapping runs
#[derive(Debug, Default)]
pub struct GatedBackend {
    gate: Arc<Notify>,
    entered: Arc<Notify>,
    calls: AtomicUsize,
}

impl GatedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Let the pending call finish
    pub fn release(&self) {
        self.gate.notify_one();
    }

    /// Wait until a call is inside the backend
    pub async fn wait_entered(&self) {
        self.entered.notified().await;
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TranslationBackend for GatedBackend {
    async fn translate(&self, request: &TranslationRequest) -> Result<Vec<TranslationResult>, TranslationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.entered.notify_one();
        self.gate.notified().await;
        Ok(request
            .units
            .iter()
            .map(|unit| TranslationResult {
                id: unit.id.clone(),
                translation: "ترجمه".to_string(),
            })
            .collect())
    }
}
