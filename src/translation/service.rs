/*!
 * Gemini-backed translation service.
 */

use async_trait::async_trait;
use log::{debug, info, warn};

use crate::errors::TranslationError;
use crate::providers::Provider;
use crate::providers::gemini::{Gemini, GeminiRequest, GeminiResponse};

use super::prompt::build_prompt;
use super::response::{reconcile, split_segments};
use super::{TranslationBackend, TranslationRequest, TranslationResult};

/// Default sampling temperature for translations
pub const DEFAULT_TEMPERATURE: f32 = 0.3;

/// Translates batches with one `generateContent` call each
#[derive(Debug, Clone)]
pub struct GeminiTranslator<P = Gemini> {
    provider: P,
    temperature: f32,
}

impl GeminiTranslator<Gemini> {
    /// Translator over the public Gemini endpoint
    pub fn new() -> Self {
        Self::with_provider(Gemini::new())
    }
}

impl Default for GeminiTranslator<Gemini> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P> GeminiTranslator<P>
where
    P: Provider<Request = GeminiRequest, Response = GeminiResponse>,
{
    pub fn with_provider(provider: P) -> Self {
        Self {
            provider,
            temperature: DEFAULT_TEMPERATURE,
        }
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Check an API key with a minimal request
    pub async fn test_api_key(&self, api_key: &str) -> Result<(), TranslationError> {
        if api_key.trim().is_empty() {
            return Err(TranslationError::MissingApiKey);
        }
        self.provider
            .test_connection(api_key.trim())
            .await
            .map_err(TranslationError::from)
    }

    /// Text of a response, or the reason there is none
    fn response_text(response: &GeminiResponse) -> Result<String, TranslationError> {
        if let Some(reason) = response.block_reason() {
            return Err(TranslationError::Blocked {
                reason: reason.to_string(),
            });
        }

        let text = P::extract_text(response);
        if !text.trim().is_empty() {
            return Ok(text);
        }

        let finish_reason = response
            .candidates
            .first()
            .and_then(|candidate| candidate.finish_reason.as_deref());
        match finish_reason {
            Some(reason @ ("SAFETY" | "RECITATION" | "BLOCKLIST" | "PROHIBITED_CONTENT")) => {
                Err(TranslationError::Blocked {
                    reason: reason.to_string(),
                })
            }
            _ => Err(TranslationError::EmptyResponse),
        }
    }
}

#[async_trait]
impl<P> TranslationBackend for GeminiTranslator<P>
where
    P: Provider<Request = GeminiRequest, Response = GeminiResponse>,
{
    async fn translate(&self, request: &TranslationRequest) -> Result<Vec<TranslationResult>, TranslationError> {
        request.validate()?;

        let prompt = build_prompt(&request.tone, &request.units);
        debug!(
            "Requesting {} translations from model {} ({} prompt chars)",
            request.units.len(),
            request.model,
            prompt.chars().count()
        );

        let api_request = GeminiRequest::new(request.model.trim(), request.api_key.trim())
            .add_user_text(prompt)
            .temperature(self.temperature);

        let response = self.provider.complete(api_request).await.map_err(|e| {
            warn!("Translation request failed: {}", e);
            TranslationError::from(e)
        })?;

        let text = Self::response_text(&response)?;
        let segments = split_segments(&text);
        let results = reconcile(&request.units, &segments);

        info!(
            "Received {} of {} translations",
            results.iter().filter(|result| !result.is_empty()).count(),
            request.units.len()
        );
        Ok(results)
    }

    async fn verify_api_key(&self, api_key: &str) -> Result<(), TranslationError> {
        self.test_api_key(api_key).await
    }
}
