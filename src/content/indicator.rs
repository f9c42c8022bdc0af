/*!
 * On-page translation progress indicator.
 *
 * A single fixed-position element showing the current stage in Persian. It
 * never captures input (`pointer-events: none`).
 */

use std::fmt;
use std::time::Duration;

use crate::dom::{Document, NodeId};
use crate::errors::TranslationError;

use super::INDICATOR_ID;

const COMPLETED_HIDE_DELAY: Duration = Duration::from_millis(2500);
const NOTHING_TO_TRANSLATE_HIDE_DELAY: Duration = Duration::from_secs(3);
const API_KEY_NEEDED_HIDE_DELAY: Duration = Duration::from_secs(4);

const BASE_STYLE: &str = "position: fixed; bottom: 10px; left: 10px; background-color: rgba(0, 0, 0, 0.7); \
color: white; padding: 8px 15px; border-radius: 5px; z-index: 999999; font-size: 13px; \
font-family: var(--dynamic-rtl-font-family, 'Vazirmatn', sans-serif); direction: rtl; text-align: right; \
box-shadow: 0 2px 5px rgba(0, 0, 0, 0.2); pointer-events: none;";

/// A translation progress stage
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressStage {
    Started,
    RequestSent,
    ResponseReceived,
    Mapping { current: usize, total: usize },
    Inserting { count: usize },
    Completed { translated: usize },
    NothingToTranslate,
    RateLimited,
    /// Translation was requested without a stored API key
    ApiKeyNeeded,
    Failed { message: String },
}

impl ProgressStage {
    /// Text shown on the page
    pub fn message(&self) -> String {
        match self {
            Self::Started => "در حال ترجمه...".to_string(),
            Self::RequestSent => "در حال ترجمه صفحه: ارسال درخواست به Gemini...".to_string(),
            Self::ResponseReceived => "در حال ترجمه صفحه: دریافت پاسخ...".to_string(),
            Self::Mapping { current, total } => {
                format!("در حال ترجمه صفحه: پردازش ترجمه ({}/{})...", current, total)
            }
            Self::Inserting { count } => format!("در حال ترجمه صفحه: درج ترجمه‌ها ({})...", count),
            Self::Completed { translated } => format!("ترجمه صفحه انجام شد ({} بخش).", translated),
            Self::NothingToTranslate => "متنی برای ترجمه در این صفحه پیدا نشد.".to_string(),
            Self::RateLimited => "محدودیت تعداد درخواست API".to_string(),
            Self::ApiKeyNeeded => TranslationError::MissingApiKey.user_message(),
            Self::Failed { message } => message.clone(),
        }
    }

    /// Delay before the indicator hides itself after this stage, if it does
    pub fn hide_after(&self) -> Option<Duration> {
        match self {
            Self::Completed { .. } => Some(COMPLETED_HIDE_DELAY),
            Self::NothingToTranslate => Some(NOTHING_TO_TRANSLATE_HIDE_DELAY),
            Self::ApiKeyNeeded => Some(API_KEY_NEEDED_HIDE_DELAY),
            _ => None,
        }
    }
}

impl fmt::Display for ProgressStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message())
    }
}

/// Handle to the indicator element
#[derive(Debug, Clone, Copy, Default)]
pub struct ProgressIndicator;

impl ProgressIndicator {
    /// Show `stage`, creating the element under `body` if needed
    pub fn show(doc: &mut Document, stage: &ProgressStage) -> Option<NodeId> {
        let element = match Self::find(doc) {
            Some(element) => element,
            None => {
                let body = doc.body()?;
                let element = doc.create_element_with_attrs("div", &[("id", INDICATOR_ID), ("lang", "fa")]);
                doc.append_child(body, element);
                element
            }
        };
        doc.set_text_content(element, &stage.message());
        doc.set_attr(element, "style", &format!("{} display: block;", BASE_STYLE));
        Some(element)
    }

    /// Hide the element without removing it
    pub fn hide(doc: &mut Document) {
        if let Some(element) = Self::find(doc) {
            doc.set_attr(element, "style", &format!("{} display: none;", BASE_STYLE));
        }
    }

    /// Remove the element entirely
    pub fn remove(doc: &mut Document) {
        if let Some(element) = Self::find(doc) {
            doc.detach(element);
        }
    }

    pub fn find(doc: &Document) -> Option<NodeId> {
        doc.get_element_by_id(INDICATOR_ID)
    }

    pub fn is_visible(doc: &Document) -> bool {
        Self::find(doc)
            .and_then(|element| doc.attr(element, "style"))
            .is_some_and(|style| style.contains("display: block"))
    }

    /// Text currently shown
    pub fn text(doc: &Document) -> Option<String> {
        Self::find(doc).map(|element| doc.text_content(element))
    }
}
