/*!
 * Persian/Arabic script detection.
 *
 * Pure classification helpers used by the mutation engine and the input
 * binding manager to decide whether a piece of text should be rendered
 * right-to-left.
 */

use once_cell::sync::Lazy;
use regex::Regex;

/// Arabic, Arabic Supplement, Arabic Extended-A and both presentation form blocks.
/// Arabic-Indic and Extended Arabic-Indic digits sit inside the Arabic block.
const RTL_CLASS: &str = r"[\x{0600}-\x{06FF}\x{0750}-\x{077F}\x{08A0}-\x{08FF}\x{FB50}-\x{FDFF}\x{FE70}-\x{FEFF}]";

static RTL_CHAR: Lazy<Regex> = Lazy::new(|| Regex::new(RTL_CLASS).expect("valid RTL character class"));

static LEADING_RTL: Lazy<Regex> =
    Lazy::new(|| Regex::new(&format!("^{}", RTL_CLASS)).expect("valid RTL prefix pattern"));

static LATIN_CHAR: Lazy<Regex> = Lazy::new(|| Regex::new(r"[A-Za-z]").expect("valid latin class"));

/// Whole-text dominance ratio used by [`should_be_rtl`]
const DOMINANCE_RATIO: f64 = 1.5;

/// Result of classifying a string
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScriptClassification {
    /// Text contains at least one Persian/Arabic character
    pub is_rtl_script: bool,
    /// The first word of the text is Persian/Arabic
    pub starts_with_rtl_script: bool,
}

/// Classify a string in one pass
pub fn classify(text: &str) -> ScriptClassification {
    ScriptClassification {
        is_rtl_script: is_rtl_script(text),
        starts_with_rtl_script: starts_with_rtl_script(text),
    }
}

/// True iff `text` contains at least one Persian/Arabic character
pub fn is_rtl_script(text: &str) -> bool {
    !text.is_empty() && RTL_CHAR.is_match(text)
}

/// Number of Persian/Arabic characters in `text`
pub fn count_rtl_chars(text: &str) -> usize {
    RTL_CHAR.find_iter(text).count()
}

/// Number of ASCII Latin letters in `text`
pub fn count_latin_chars(text: &str) -> usize {
    LATIN_CHAR.find_iter(text).count()
}

/// True if the first whitespace-delimited token of `text` is Persian/Arabic.
///
/// A token mixing scripts qualifies only when its RTL characters are not
/// outnumbered by Latin letters.
pub fn starts_with_rtl_script(text: &str) -> bool {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return false;
    }

    if LEADING_RTL.is_match(trimmed) {
        return true;
    }

    let first_word = trimmed.split_whitespace().next().unwrap_or_default();
    let rtl = count_rtl_chars(first_word);
    let latin = count_latin_chars(first_word);

    rtl > 0 && rtl >= latin
}

/// Stricter test used for live content: starts with RTL script, or RTL
/// characters outnumber Latin letters by more than 1.5x over the whole text.
pub fn should_be_rtl(text: &str) -> bool {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return false;
    }

    if starts_with_rtl_script(trimmed) {
        return true;
    }

    let rtl = count_rtl_chars(trimmed) as f64;
    let latin = count_latin_chars(trimmed) as f64;
    rtl > latin * DOMINANCE_RATIO
}
