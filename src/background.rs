/*!
 * Background coordinator.
 *
 * Answers requests from the popup and the page: tab info, site and mode
 * toggles, batch translation and API key checks. Every failure is turned
 * into a `{success: false, error, errorCode}` reply; handling never fails.
 *
 * [`MessagingBackend`] is the page's end of that conversation: a
 * translation backend that sends `callGeminiTranslate` and `testApiKey` as
 * JSON and rebuilds the classified error from the reply.
 */

use std::sync::Arc;

use async_trait::async_trait;
use log::{debug, error, info, warn};
use url::Url;

use crate::errors::TranslationError;
use crate::messages::{Message, Reply};
use crate::settings::Settings;
use crate::site_policy::normalize_host;
use crate::translation::{TranslationBackend, TranslationRequest, TranslationResult, TranslationUnit};

/// Reply to the sender plus an optional message for the active tab
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
    pub reply: Reply,
    pub push: Option<Message>,
}

impl Outcome {
    fn reply(reply: Reply) -> Self {
        Self { reply, push: None }
    }
}

/// The extension's background context
#[derive(Clone)]
pub struct Background {
    settings: Settings,
    backend: Arc<dyn TranslationBackend>,
}

impl std::fmt::Debug for Background {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Background")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

/// Hostname of a tab URL, if it has one
pub fn hostname_of(tab_url: &str) -> Option<String> {
    let url = Url::parse(tab_url).ok()?;
    url.host_str().map(normalize_host).filter(|host| !host.is_empty())
}

impl Background {
    pub fn new(settings: Settings, backend: Arc<dyn TranslationBackend>) -> Self {
        Self { settings, backend }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Install hook: fill in missing policy defaults
    pub fn on_installed(&self) {
        if let Err(e) = self.settings.initialize_defaults() {
            error!("Failed to initialize default settings: {}", e);
        }
    }

    /// Handle one message. `active_tab_url` is the URL of the tab the popup
    /// was opened on, if any.
    pub async fn handle(&self, message: Message, active_tab_url: Option<&str>) -> Outcome {
        debug!("Background received {}", message.name());
        match message {
            Message::GetCurrentTabInfo => Outcome::reply(self.current_tab_info(active_tab_url)),
            Message::ToggleSite { hostname, enabled } => {
                let hostname = hostname
                    .map(|host| normalize_host(&host))
                    .filter(|host| !host.is_empty())
                    .or_else(|| active_tab_url.and_then(hostname_of));
                match hostname {
                    Some(hostname) => self.toggle_site(&hostname, enabled),
                    None => Outcome::reply(Reply::error("No hostname to toggle")),
                }
            }
            Message::ToggleDefaultMode { default_enabled } => {
                Outcome::reply(self.toggle_default_mode(default_enabled))
            }
            Message::CallGeminiTranslate {
                api_key,
                model,
                tone,
                texts,
            } => Outcome::reply(self.translate(api_key, model, tone, texts).await),
            Message::TestApiKey { api_key } => Outcome::reply(self.test_api_key(&api_key).await),
            other => {
                warn!("Background ignoring page-bound message {}", other.name());
                Outcome::reply(Reply::error(format!("Unsupported message: {}", other.name())))
            }
        }
    }

    fn current_tab_info(&self, active_tab_url: Option<&str>) -> Reply {
        let Some(hostname) = active_tab_url.and_then(hostname_of) else {
            return Reply::error("No active tab with a hostname");
        };
        match self.settings.site_policy() {
            Ok(policy) => Reply::TabInfo {
                is_enabled: policy.is_enabled_for(&hostname),
                default_enabled: policy.default_enabled,
                hostname,
            },
            Err(e) => {
                error!("Failed to read site policy: {}", e);
                Reply::error(e.to_string())
            }
        }
    }

    fn toggle_site(&self, hostname: &str, enabled: bool) -> Outcome {
        let result = self.settings.site_policy().and_then(|mut policy| {
            policy.set_site_enabled(hostname, enabled);
            self.settings.save_site_policy(&policy)
        });

        match result {
            Ok(()) => {
                info!("{} {}", if enabled { "Enabled" } else { "Disabled" }, hostname);
                Outcome {
                    reply: Reply::ok(),
                    push: Some(Message::ToggleSite {
                        hostname: None,
                        enabled,
                    }),
                }
            }
            Err(e) => {
                error!("Failed to toggle {}: {}", hostname, e);
                Outcome::reply(Reply::error(e.to_string()))
            }
        }
    }

    fn toggle_default_mode(&self, default_enabled: bool) -> Reply {
        let result = self.settings.site_policy().and_then(|mut policy| {
            policy.default_enabled = default_enabled;
            self.settings.save_site_policy(&policy)
        });
        match result {
            Ok(()) => {
                info!("Default mode set to {}", if default_enabled { "enabled" } else { "disabled" });
                Reply::ok()
            }
            Err(e) => {
                error!("Failed to set default mode: {}", e);
                Reply::error(e.to_string())
            }
        }
    }

    async fn translate(&self, api_key: String, model: String, tone: String, texts: Vec<TranslationUnit>) -> Reply {
        let request = TranslationRequest {
            api_key,
            model,
            tone,
            units: texts,
        };
        match self.backend.translate(&request).await {
            Ok(translations) => Reply::translations(translations),
            Err(e) => {
                warn!("Batch translation failed: {}", e);
                Reply::from_error(&e)
            }
        }
    }

    async fn test_api_key(&self, api_key: &str) -> Reply {
        match self.backend.verify_api_key(api_key).await {
            Ok(()) => Reply::ok(),
            Err(e @ TranslationError::MissingApiKey) => Reply::from_error(&e),
            Err(e) => {
                info!("API key check failed: {}", e);
                Reply::error(e.to_string())
            }
        }
    }
}

/// Translation backend on the page side of the messaging boundary
#[derive(Debug, Clone)]
pub struct MessagingBackend {
    background: Background,
}

impl MessagingBackend {
    pub fn new(background: Background) -> Self {
        Self { background }
    }

    pub fn background(&self) -> &Background {
        &self.background
    }

    /// Send `message` as JSON and decode the JSON reply
    async fn send(&self, message: Message) -> Result<Reply, TranslationError> {
        let message = Message::parse(message.to_value())
            .map_err(|e| TranslationError::InvalidRequest(e.to_string()))?;
        let outcome = self.background.handle(message, None).await;
        serde_json::from_value(outcome.reply.to_value())
            .map_err(|e| TranslationError::Api(format!("Malformed reply from background: {}", e)))
    }
}

#[async_trait]
impl TranslationBackend for MessagingBackend {
    async fn translate(&self, request: &TranslationRequest) -> Result<Vec<TranslationResult>, TranslationError> {
        let message = Message::CallGeminiTranslate {
            api_key: request.api_key.clone(),
            model: request.model.clone(),
            tone: request.tone.clone(),
            texts: request.units.clone(),
        };
        match self.send(message).await? {
            Reply::Translations { translations, .. } => Ok(translations),
            reply => Err(reply.as_error().unwrap_or_else(|| {
                TranslationError::Api("Unexpected reply to callGeminiTranslate".to_string())
            })),
        }
    }

    async fn verify_api_key(&self, api_key: &str) -> Result<(), TranslationError> {
        let reply = self
            .send(Message::TestApiKey {
                api_key: api_key.to_string(),
            })
            .await?;
        match reply.as_error() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}
