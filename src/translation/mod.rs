/*!
 * Page translation through a generative-language API.
 *
 * This module contains the request/result types exchanged with a translation
 * backend and the Gemini-backed implementation:
 *
 * - `prompt`: prompt construction for a numbered batch of texts
 * - `response`: splitting the combined response and reconciling it with the batch
 * - `service`: `GeminiTranslator`, the backend used by the background coordinator
 */

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::TranslationError;

pub mod prompt;
pub mod response;
pub mod service;

pub use self::prompt::{SEGMENT_SEPARATOR, build_prompt};
pub use self::response::{reconcile, split_segments};
pub use self::service::GeminiTranslator;

/// Tone used when none is configured ("formal")
pub const DEFAULT_TONE: &str = "رسمی";

/// Model used when none is configured
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash-preview-04-17";

/// One element's text, keyed by the element identity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslationUnit {
    pub id: String,
    pub text: String,
}

/// Translation for one unit. An empty `translation` means no result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslationResult {
    pub id: String,
    pub translation: String,
}

impl TranslationResult {
    pub fn is_empty(&self) -> bool {
        self.translation.trim().is_empty()
    }
}

/// A batch to translate
#[derive(Debug, Clone, PartialEq)]
pub struct TranslationRequest {
    pub api_key: String,
    pub model: String,
    pub tone: String,
    pub units: Vec<TranslationUnit>,
}

impl TranslationRequest {
    /// Check that every field needed for the API call is present
    pub fn validate(&self) -> Result<(), TranslationError> {
        if self.api_key.trim().is_empty() {
            return Err(TranslationError::MissingApiKey);
        }
        if self.tone.trim().is_empty() {
            return Err(TranslationError::InvalidRequest("missing translation tone".to_string()));
        }
        if self.model.trim().is_empty() {
            return Err(TranslationError::InvalidRequest("missing model".to_string()));
        }
        if self.units.is_empty() {
            return Err(TranslationError::InvalidRequest("no texts to translate".to_string()));
        }
        Ok(())
    }
}

/// Something that turns a batch of units into results, one per unit
#[async_trait]
pub trait TranslationBackend: Send + Sync {
    /// Translate a batch. The result has exactly one entry per unit, in
    /// unit order.
    async fn translate(&self, request: &TranslationRequest) -> Result<Vec<TranslationResult>, TranslationError>;

    /// Check that `api_key` is accepted. Backends without a remote check
    /// only reject a blank key.
    async fn verify_api_key(&self, api_key: &str) -> Result<(), TranslationError> {
        if api_key.trim().is_empty() {
            return Err(TranslationError::MissingApiKey);
        }
        Ok(())
    }
}
