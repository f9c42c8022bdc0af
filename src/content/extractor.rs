/*!
 * Translation extractor.
 *
 * Selects block-level elements whose own text is worth translating and gives
 * each one an identity that the translation result can be mapped back to.
 */

use std::collections::{HashMap, HashSet};

use log::{debug, trace};

use crate::detector::count_latin_chars;
use crate::dom::{Document, NodeId};
use crate::translation::TranslationUnit;

use super::{GENERATED_ID_PREFIX, PROCESSED_ATTR, TRANSLATION_CONTAINER_CLASS, is_editable};

/// Default minimum number of words in an element's own text
pub const DEFAULT_MIN_WORDS: usize = 6;

/// Block elements considered for translation
const CANDIDATE_TAGS: &[&str] = &[
    "p", "h1", "h2", "h3", "h4", "h5", "h6", "li", "blockquote", "caption", "dd", "dt",
    "figcaption", "summary",
];

/// Table cells qualify only without these below them
const NESTED_BLOCK_TAGS: &[&str] = &["p", "div", "ul", "ol", "blockquote"];

/// Subtrees never translated
const EXCLUDED_ANCESTOR_TAGS: &[&str] = &[
    "script", "style", "noscript", "textarea", "input", "code", "pre", "a",
];

/// Decides whether an element is rendered
pub trait Visibility: Send + Sync {
    fn is_visible(&self, doc: &Document, node: NodeId) -> bool;
}

/// Visibility from markup alone: the `hidden` attribute, `aria-hidden`,
/// and inline `display:none` / `visibility:hidden` on the element or any
/// ancestor
#[derive(Debug, Clone, Copy, Default)]
pub struct InlineStyleVisibility;

impl Visibility for InlineStyleVisibility {
    fn is_visible(&self, doc: &Document, node: NodeId) -> bool {
        doc.closest(node, |doc, id| is_hidden_element(doc, id)).is_none()
    }
}

fn is_hidden_element(doc: &Document, node: NodeId) -> bool {
    if doc.has_attr(node, "hidden") || doc.attr(node, "aria-hidden") == Some("true") {
        return true;
    }
    let Some(style) = doc.attr(node, "style") else {
        return false;
    };
    let style: String = style
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_lowercase();
    style
        .split(';')
        .any(|declaration| declaration.starts_with("display:none") || declaration.starts_with("visibility:hidden"))
}

/// Result of an extraction pass
#[derive(Debug, Clone, Default)]
pub struct Extraction {
    /// Units to send, in document order
    pub units: Vec<TranslationUnit>,
    /// Identity to live element, held for the duration of one request
    pub elements: HashMap<String, NodeId>,
}

impl Extraction {
    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }
}

/// Harvests translatable elements
pub struct Extractor {
    min_words: usize,
    visibility: Box<dyn Visibility>,
}

impl std::fmt::Debug for Extractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Extractor")
            .field("min_words", &self.min_words)
            .finish_non_exhaustive()
    }
}

impl Default for Extractor {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_WORDS)
    }
}

impl Extractor {
    pub fn new(min_words: usize) -> Self {
        Self {
            min_words,
            visibility: Box::new(InlineStyleVisibility),
        }
    }

    /// Replace the visibility check, for hosts with layout information
    pub fn with_visibility(mut self, visibility: impl Visibility + 'static) -> Self {
        self.visibility = Box::new(visibility);
        self
    }

    pub fn min_words(&self) -> usize {
        self.min_words
    }

    /// Select eligible elements and assign identities. Generated ids are
    /// written to the elements; existing ids are never overwritten.
    pub fn extract(&self, doc: &mut Document) -> Extraction {
        let mut taken_ids: HashSet<String> = doc
            .find_elements(|doc, id| doc.has_attr(id, "id"))
            .into_iter()
            .filter_map(|id| doc.attr(id, "id").map(str::to_string))
            .collect();
        let mut next_generated = 0usize;
        let mut extraction = Extraction::default();

        let candidates = doc.find_elements(|doc, id| is_candidate(doc, id));
        for element in candidates {
            if doc.has_attr(element, PROCESSED_ATTR) || is_excluded(doc, element) {
                continue;
            }
            if !self.visibility.is_visible(doc, element) {
                trace!("Skipping hidden element {:?}", element);
                continue;
            }

            let text = direct_text(doc, element);
            if !self.is_translatable(&text) {
                continue;
            }

            let id = match doc.attr(element, "id").filter(|id| !id.trim().is_empty()) {
                Some(existing) => {
                    if extraction.elements.contains_key(existing) {
                        debug!("Duplicate element id '{}', skipping later element", existing);
                        continue;
                    }
                    existing.to_string()
                }
                None => {
                    let generated = loop {
                        let candidate = format!("{}{}", GENERATED_ID_PREFIX, next_generated);
                        next_generated += 1;
                        if !taken_ids.contains(&candidate) {
                            break candidate;
                        }
                    };
                    doc.set_attr(element, "id", &generated);
                    taken_ids.insert(generated.clone());
                    generated
                }
            };

            extraction.elements.insert(id.clone(), element);
            extraction.units.push(TranslationUnit { id, text });
        }

        debug!("Extracted {} translation units", extraction.len());
        extraction
    }

    /// Word count and Latin letter density filter
    pub fn is_translatable(&self, text: &str) -> bool {
        let words = text.split_whitespace().count();
        if words < self.min_words {
            return false;
        }
        let length = text.chars().count();
        count_latin_chars(text) * 4 > length
    }
}

fn is_candidate(doc: &Document, node: NodeId) -> bool {
    match doc.tag_name(node) {
        Some("td") => !doc.descendants(node).into_iter().any(|id| {
            doc.tag_name(id)
                .is_some_and(|name| NESTED_BLOCK_TAGS.contains(&name))
        }),
        Some(name) => CANDIDATE_TAGS.contains(&name),
        None => false,
    }
}

fn is_excluded(doc: &Document, node: NodeId) -> bool {
    doc.closest(node, |doc, id| {
        doc.tag_name(id)
            .is_some_and(|name| EXCLUDED_ANCESTOR_TAGS.contains(&name))
            || is_editable(doc, id)
            || doc.has_class(id, TRANSLATION_CONTAINER_CLASS)
    })
    .is_some()
}

/// Immediate text children only, whitespace collapsed
pub fn direct_text(doc: &Document, node: NodeId) -> String {
    let joined: String = doc
        .children(node)
        .iter()
        .filter_map(|child| doc.text(*child))
        .collect();
    joined.split_whitespace().collect::<Vec<_>>().join(" ")
}
