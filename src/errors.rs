/*!
 * Error types for the dynrtl application.
 *
 * This module contains custom error types for different parts of the application,
 * using the thiserror crate for ergonomic error definitions.
 */

use thiserror::Error;

/// Errors that can occur when working with provider APIs
#[derive(Error, Debug)]
pub enum ProviderError {
    /// Error when making an API request fails
    #[error("API request failed: {0}")]
    RequestFailed(String),

    /// Error when parsing an API response fails
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// Error returned by the API itself
    #[error("API responded with error: {status_code} - {message}")]
    ApiError {
        /// HTTP status code
        status_code: u16,
        /// Error message from the API
        message: String,
    },

    /// Error establishing or maintaining a connection
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Error related to rate limiting
    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    /// Error with authentication
    #[error("Authentication error: {0}")]
    AuthenticationError(String),
}

impl ProviderError {
    /// Whether a retry of the same request could succeed
    pub fn is_transient(&self) -> bool {
        match self {
            Self::ConnectionError(_) | Self::RequestFailed(_) => true,
            Self::ApiError { status_code, .. } => *status_code >= 500,
            _ => false,
        }
    }
}

/// Errors that can occur during page translation.
///
/// Every variant is classifiable by the top-level handler: it carries a stable
/// `error_code` for the messaging boundary and a user-facing message.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TranslationError {
    /// A translation pipeline is already running on this page
    #[error("Translation already running")]
    AlreadyRunning,

    /// No API key was supplied
    #[error("Missing API key")]
    MissingApiKey,

    /// The request was incomplete (tone, model or texts missing)
    #[error("Invalid translation request: {0}")]
    InvalidRequest(String),

    /// The provider rejected the API key
    #[error("Invalid API key: {0}")]
    InvalidApiKey(String),

    /// The provider rate limit was exceeded
    #[error("RATE_LIMIT: {0}")]
    RateLimited(String),

    /// The request never reached the provider or the connection broke
    #[error("Network error: {0}")]
    Network(String),

    /// The provider blocked the prompt (safety filter)
    #[error("Response blocked by provider: {reason}")]
    Blocked {
        /// Block reason stated by the provider
        reason: String,
    },

    /// The provider returned no candidate text
    #[error("Empty response from provider")]
    EmptyResponse,

    /// Nothing on the page qualified for translation
    #[error("No text found to translate")]
    NoTranslatableText,

    /// Any other provider failure
    #[error("API error: {0}")]
    Api(String),
}

impl TranslationError {
    /// Stable code carried across the messaging boundary
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::AlreadyRunning => "ALREADY_RUNNING",
            Self::MissingApiKey => "MISSING_API_KEY",
            Self::InvalidRequest(_) => "INVALID_REQUEST",
            Self::InvalidApiKey(_) => "INVALID_API_KEY",
            Self::RateLimited(_) => "RATE_LIMIT",
            Self::Network(_) => "NETWORK_ERROR",
            Self::Blocked { .. } => "BLOCKED",
            Self::EmptyResponse => "EMPTY_RESPONSE",
            Self::NoTranslatableText => "NO_TEXT",
            Self::Api(_) => "API_ERROR",
        }
    }

    /// Rebuild an error from a code and message received over messaging
    pub fn from_code(code: Option<&str>, message: &str) -> Self {
        match code {
            Some("ALREADY_RUNNING") => Self::AlreadyRunning,
            Some("MISSING_API_KEY") => Self::MissingApiKey,
            Some("INVALID_REQUEST") => Self::InvalidRequest(message.to_string()),
            Some("INVALID_API_KEY") => Self::InvalidApiKey(message.to_string()),
            Some("RATE_LIMIT") => Self::RateLimited(message.to_string()),
            Some("NETWORK_ERROR") => Self::Network(message.to_string()),
            Some("BLOCKED") => Self::Blocked { reason: message.to_string() },
            Some("EMPTY_RESPONSE") => Self::EmptyResponse,
            Some("NO_TEXT") => Self::NoTranslatableText,
            _ => Self::Api(message.to_string()),
        }
    }

    pub fn is_rate_limit(&self) -> bool {
        matches!(self, Self::RateLimited(_))
    }

    /// Message shown to the user on the page
    pub fn user_message(&self) -> String {
        match self {
            Self::AlreadyRunning => "ترجمه در حال انجام است.".to_string(),
            Self::MissingApiKey => "لطفاً ابتدا کلید API Gemini خود را در تنظیمات افزونه وارد کنید.".to_string(),
            Self::InvalidApiKey(_) => "کلید API نامعتبر است. لطفاً کلید را در تنظیمات بررسی کنید.".to_string(),
            Self::RateLimited(_) => "محدودیت تعداد درخواست API".to_string(),
            Self::Network(_) => "خطا در اتصال به سرویس ترجمه.".to_string(),
            Self::Blocked { reason } => format!("پاسخ توسط سرویس مسدود شد ({})", reason),
            Self::EmptyResponse => "پاسخی از سرویس ترجمه دریافت نشد.".to_string(),
            Self::NoTranslatableText => "متنی برای ترجمه در این صفحه پیدا نشد.".to_string(),
            Self::InvalidRequest(message) | Self::Api(message) => format!("خطا: {}", message),
        }
    }
}

impl From<ProviderError> for TranslationError {
    fn from(error: ProviderError) -> Self {
        match error {
            ProviderError::RateLimitExceeded(message) => Self::RateLimited(message),
            ProviderError::AuthenticationError(message) => Self::InvalidApiKey(message),
            ProviderError::ConnectionError(message) | ProviderError::RequestFailed(message) => {
                Self::Network(message)
            }
            ProviderError::ParseError(message) => Self::Api(message),
            ProviderError::ApiError { status_code, message } => {
                Self::Api(format!("{} - {}", status_code, message))
            }
        }
    }
}

/// Errors from the persistent configuration store
#[derive(Error, Debug)]
pub enum SettingsError {
    /// Reading or writing the backing file failed
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The backing file is not valid JSON
    #[error("Storage format error: {0}")]
    Format(#[from] serde_json::Error),

    /// An uploaded font was rejected
    #[error("Invalid font file: {0}")]
    InvalidFont(String),
}

/// Errors while decoding a message at the messaging boundary
#[derive(Error, Debug)]
pub enum MessageError {
    /// The message is not a JSON object
    #[error("Message is not an object")]
    NotAnObject,

    /// Neither `action` nor `command` names the message
    #[error("Message has no action or command")]
    MissingTag,

    /// The message fields do not match its action
    #[error("Invalid message: {0}")]
    Invalid(#[from] serde_json::Error),
}

/// Errors while loading a document
#[derive(Error, Debug)]
pub enum DomError {
    /// The HTML input could not be read
    #[error("Failed to read HTML: {0}")]
    Read(#[from] std::io::Error),

    /// The document could not be written out
    #[error("Failed to serialize HTML: {0}")]
    Write(std::io::Error),

    /// The serializer produced bytes that are not UTF-8
    #[error("Serialized HTML is not UTF-8: {0}")]
    Encoding(#[from] std::string::FromUtf8Error),
}

/// Main application error type that wraps all other errors
#[derive(Error, Debug)]
pub enum AppError {
    /// Error from a file operation
    #[error("File error: {0}")]
    File(String),

    /// Error from a provider
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Error from translation
    #[error("Translation error: {0}")]
    Translation(#[from] TranslationError),

    /// Error from the settings store
    #[error("Settings error: {0}")]
    Settings(#[from] SettingsError),

    /// Any other error
    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        Self::Unknown(error.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        Self::File(error.to_string())
    }
}
