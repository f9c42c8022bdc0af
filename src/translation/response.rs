/*!
 * Response parsing.
 *
 * The model answers with one text blob. It is split on the separator token,
 * cleaned of any enumeration the model added, and reconciled with the units
 * that were sent. A count mismatch is recovered locally and never fails the
 * request.
 */

use log::warn;
use once_cell::sync::Lazy;
use regex::Regex;

use super::prompt::SEGMENT_SEPARATOR;
use super::{TranslationResult, TranslationUnit};

/// `1.`, `1)`, `(1)`, `1-`, `1:` with Latin, Persian or Arabic-Indic digits,
/// followed by whitespace or the end of the segment
static ENUMERATION_MARKER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:\(\s*([0-9۰-۹٠-٩]+)\s*\)|([0-9۰-۹٠-٩]+)\s*[.)\-:،])(?:\s+|$)")
        .expect("valid enumeration pattern")
});

fn digit_value(c: char) -> Option<usize> {
    match c {
        '0'..='9' => Some(c as usize - '0' as usize),
        '۰'..='۹' => Some(c as usize - '۰' as usize),
        '٠'..='٩' => Some(c as usize - '٠' as usize),
        _ => None,
    }
}

fn parse_number(digits: &str) -> Option<usize> {
    digits
        .chars()
        .try_fold(0usize, |acc, c| acc.checked_mul(10)?.checked_add(digit_value(c)?))
}

/// Strip the enumeration marker the model may have copied from the prompt.
/// Only a marker numbered with the segment's 1-based `position` is removed,
/// so translations that start with a number (`1.5`, `10:30`, `3-4`) are kept.
pub fn strip_enumeration(segment: &str, position: usize) -> String {
    let trimmed = segment.trim();
    let Some(captures) = ENUMERATION_MARKER.captures(trimmed) else {
        return trimmed.to_string();
    };
    let number = captures
        .get(1)
        .or_else(|| captures.get(2))
        .and_then(|digits| parse_number(digits.as_str()));
    if number != Some(position) {
        return trimmed.to_string();
    }
    let marker_end = captures.get(0).map_or(0, |marker| marker.end());
    trimmed[marker_end..].trim().to_string()
}

/// Split a combined response into cleaned segments. Every segment keeps its
/// position, empty ones included; only empty segments after the last
/// translation (a stray trailing separator) are dropped.
pub fn split_segments(text: &str) -> Vec<String> {
    let mut segments: Vec<String> = text
        .split(SEGMENT_SEPARATOR)
        .enumerate()
        .map(|(index, segment)| strip_enumeration(segment, index + 1))
        .collect();

    while segments.last().is_some_and(|segment| segment.is_empty()) {
        segments.pop();
    }

    segments
}

/// Pair segments with units by position. The result always has one entry per
/// unit; units without a segment get an empty translation.
pub fn reconcile(units: &[TranslationUnit], segments: &[String]) -> Vec<TranslationResult> {
    if segments.len() != units.len() {
        warn!(
            "Translation count mismatch: sent {} texts, received {} segments; mapping by position",
            units.len(),
            segments.len()
        );
    }

    units
        .iter()
        .enumerate()
        .map(|(index, unit)| TranslationResult {
            id: unit.id.clone(),
            translation: segments.get(index).cloned().unwrap_or_default(),
        })
        .collect()
}
