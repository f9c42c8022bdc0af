/*!
 * # dynrtl - Dynamic RTL for web pages
 *
 * A Rust library that detects Persian and Arabic text in web pages, marks it
 * for right-to-left display and optionally translates page text to Persian
 * through the Gemini API.
 *
 * ## Features
 *
 * - Script detection for Persian/Arabic text
 * - Initial and live (mutation-driven) RTL marking with debounced rescans
 * - Direction tracking for form fields and editable regions
 * - Style and font injection, bundled or user-supplied fonts
 * - Paragraph extraction and Persian translation with progress reporting
 * - Per-site enablement and a typed messaging contract
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `detector`: RTL script classification
 * - `dom`: arena document model with HTML import/export
 * - `scheduler`: keyed debounce over explicit time
 * - `content`: everything that runs in a page:
 *   - `content::engine`: the RTL mutation engine
 *   - `content::inputs`: form field and editable binding
 *   - `content::style`: style element and fonts
 *   - `content::extractor`, `content::orchestrator`, `content::indicator`: page translation
 *   - `content::session`: the per-page context object
 * - `translation`: prompt, response parsing and the Gemini-backed translator
 * - `providers`: HTTP clients for generative-language APIs
 * - `settings`, `site_policy`: persistent settings and enablement rules
 * - `messages`, `background`: the messaging contract and background coordinator
 * - `app_config`, `app_controller`, `file_utils`: the CLI host
 * - `errors`: custom error types for the application
 *
 * ## License
 *
 * This project is licensed under the MIT License
 */

// Global lints configuration
// These lints will be allowed but not auto-fixed
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

// Public modules
pub mod app_config;
pub mod app_controller;
pub mod background;
pub mod content;
pub mod detector;
pub mod dom;
pub mod errors;
pub mod file_utils;
pub mod language_utils;
pub mod messages;
pub mod providers;
pub mod scheduler;
pub mod settings;
pub mod site_policy;
pub mod translation;

// Re-export main types for easier usage
pub use app_config::Config;
pub use background::{Background, MessagingBackend};
pub use content::{PageSession, TranslationOrchestrator};
pub use detector::{classify, should_be_rtl};
pub use dom::Document;
pub use errors::{AppError, ProviderError, SettingsError, TranslationError};
pub use messages::{Message, Reply};
pub use settings::Settings;
pub use site_policy::SitePolicy;
pub use translation::{GeminiTranslator, TranslationBackend};
