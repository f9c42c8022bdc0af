/*!
 * Messages exchanged between the popup, the background coordinator and the
 * page.
 *
 * Senders name a message with either an `action` or a `command` key and may
 * nest its fields under `data`. [`Message::parse`] folds both shapes into one
 * tagged union so handlers never see the difference.
 */

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::errors::{MessageError, TranslationError};
use crate::translation::{TranslationResult, TranslationUnit};

/// Tag key used when a message is serialized
pub const TAG_KEY: &str = "action";

/// Alternative tag key some senders use
pub const COMMAND_KEY: &str = "command";

/// Key under which some senders nest the message fields
pub const DATA_KEY: &str = "data";

/// A request or push message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Message {
    /// Popup asks for the active tab's hostname and enablement
    GetCurrentTabInfo,

    /// Popup toggles a site; pushed to the page with only `enabled`
    ToggleSite {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        hostname: Option<String>,
        enabled: bool,
    },

    /// Popup switches between default-enabled and default-disabled mode
    ToggleDefaultMode { default_enabled: bool },

    /// Popup pushes the effective enablement to the page
    ToggleStatus { status: bool },

    /// Popup tells the page to re-read the font settings
    UpdateFont,

    /// Popup asks the page to translate itself
    TranslatePage {
        #[serde(default)]
        api_key: String,
        #[serde(default)]
        tone: String,
        #[serde(default)]
        model: String,
    },

    /// Page asks the background to translate a batch
    CallGeminiTranslate {
        #[serde(default)]
        api_key: String,
        #[serde(default)]
        model: String,
        #[serde(default)]
        tone: String,
        #[serde(default)]
        texts: Vec<TranslationUnit>,
    },

    /// Popup asks the background to check an API key
    TestApiKey {
        #[serde(default)]
        api_key: String,
    },

    /// Page should tell the user an API key is needed
    ShowApiKeyNeededError,
}

impl Message {
    /// Decode a message, accepting either tag key and `data` nesting.
    /// Top-level fields win over nested ones.
    pub fn parse(value: Value) -> Result<Self, MessageError> {
        let Value::Object(mut object) = value else {
            return Err(MessageError::NotAnObject);
        };

        let tag = match object.remove(TAG_KEY) {
            Some(Value::String(tag)) => tag,
            _ => match object.remove(COMMAND_KEY) {
                Some(Value::String(tag)) => tag,
                _ => return Err(MessageError::MissingTag),
            },
        };

        let mut fields = Map::new();
        if let Some(Value::Object(data)) = object.remove(DATA_KEY) {
            fields.extend(data);
        }
        fields.extend(object);
        fields.insert(TAG_KEY.to_string(), Value::String(tag));

        Ok(serde_json::from_value(Value::Object(fields))?)
    }

    /// Decode a message from JSON text
    pub fn from_json(json: &str) -> Result<Self, MessageError> {
        Self::parse(serde_json::from_str(json)?)
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    /// The tag this message is sent under
    pub fn name(&self) -> &'static str {
        match self {
            Self::GetCurrentTabInfo => "getCurrentTabInfo",
            Self::ToggleSite { .. } => "toggleSite",
            Self::ToggleDefaultMode { .. } => "toggleDefaultMode",
            Self::ToggleStatus { .. } => "toggleStatus",
            Self::UpdateFont => "updateFont",
            Self::TranslatePage { .. } => "translatePage",
            Self::CallGeminiTranslate { .. } => "callGeminiTranslate",
            Self::TestApiKey { .. } => "testApiKey",
            Self::ShowApiKeyNeededError => "showApiKeyNeededError",
        }
    }
}

/// A response to a message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged, rename_all_fields = "camelCase")]
pub enum Reply {
    TabInfo {
        hostname: String,
        is_enabled: bool,
        default_enabled: bool,
    },
    Translations {
        success: bool,
        translations: Vec<TranslationResult>,
    },
    Failure {
        success: bool,
        error: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error_code: Option<String>,
    },
    Ack {
        success: bool,
    },
}

impl Reply {
    pub fn ok() -> Self {
        Self::Ack { success: true }
    }

    pub fn translations(translations: Vec<TranslationResult>) -> Self {
        Self::Translations {
            success: true,
            translations,
        }
    }

    /// Failure without a classification code
    pub fn error(message: impl Into<String>) -> Self {
        Self::Failure {
            success: false,
            error: message.into(),
            error_code: None,
        }
    }

    /// Failure carrying the error's code
    pub fn from_error(error: &TranslationError) -> Self {
        Self::Failure {
            success: false,
            error: error.to_string(),
            error_code: Some(error.error_code().to_string()),
        }
    }

    pub fn is_success(&self) -> bool {
        match self {
            Self::TabInfo { .. } => true,
            Self::Translations { success, .. } | Self::Failure { success, .. } | Self::Ack { success } => *success,
        }
    }

    /// The classified error of a failed reply
    pub fn as_error(&self) -> Option<TranslationError> {
        match self {
            Self::Failure { error, error_code, .. } => {
                Some(TranslationError::from_code(error_code.as_deref(), error))
            }
            _ => None,
        }
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}
