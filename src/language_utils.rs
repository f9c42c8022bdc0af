//! Language utilities for page language attributes
//!
//! Page `lang` attributes are BCP 47 tags ("fa-IR", "ar", "en-US"). Only the
//! primary subtag matters here; it is normalized to ISO 639-3 so that 2-letter,
//! 3-letter and bibliographic codes compare equal.

use anyhow::{Result, anyhow};
use isolang::Language;

/// ISO 639-2/B codes that differ from their 639-2/T form
const BIBLIOGRAPHIC_CODES: &[(&str, &str)] = &[("per", "fas")];

/// Languages whose pages are already right-to-left Persian/Arabic
const RTL_PAGE_LANGUAGES: &[&str] = &["fas", "ara"];

/// Primary subtag of a BCP 47 language tag, lowercased
pub fn primary_subtag(tag: &str) -> String {
    tag.trim()
        .split(['-', '_'])
        .next()
        .unwrap_or_default()
        .to_lowercase()
}

/// Normalize a language code or tag to ISO 639-3
pub fn normalize_to_part3(code: &str) -> Result<String> {
    let primary = primary_subtag(code);

    match primary.len() {
        2 => {
            if let Some(lang) = Language::from_639_1(&primary) {
                return Ok(lang.to_639_3().to_string());
            }
        }
        3 => {
            if Language::from_639_3(&primary).is_some() {
                return Ok(primary);
            }
            if let Some((_, terminology)) = BIBLIOGRAPHIC_CODES.iter().find(|(b, _)| *b == primary) {
                return Ok(terminology.to_string());
            }
        }
        _ => {}
    }

    Err(anyhow!("Cannot normalize invalid language code: {}", code))
}

/// Whether a page declared in `lang` is already Persian or Arabic
pub fn is_rtl_page_language(lang: &str) -> bool {
    normalize_to_part3(lang)
        .map(|code| RTL_PAGE_LANGUAGES.contains(&code.as_str()))
        .unwrap_or(false)
}
