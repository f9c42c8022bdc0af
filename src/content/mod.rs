/*!
 * Per-page content logic.
 *
 * Everything that runs inside a single page context, written against the
 * host-independent [`Document`](crate::dom::Document):
 *
 * - `engine`: initial RTL pass and live mutation handling
 * - `inputs`: listener binding and evaluation for form fields and editables
 * - `style`: the injected style element and font configuration
 * - `extractor`: selection of translatable elements
 * - `indicator`: the on-page translation progress indicator
 * - `orchestrator`: the translation pipeline state machine
 * - `session`: the per-page context object tying the above together
 */

pub mod engine;
pub mod extractor;
pub mod indicator;
pub mod inputs;
pub mod orchestrator;
pub mod session;
pub mod style;

pub use self::engine::{ContainerStrategy, EngineOptions, MutationEngine};
pub use self::extractor::{Extraction, Extractor, InlineStyleVisibility, Visibility};
pub use self::indicator::{ProgressIndicator, ProgressStage};
pub use self::inputs::{InputBindings, InputEvent};
pub use self::orchestrator::{
    OrchestratorState, ProgressCallback, TranslatePageRequest, TranslationOrchestrator, TranslationSummary,
    clear_translations,
};
pub use self::session::{PageSession, SessionTask};
pub use self::style::{FontConfig, FontSource, StyleInjector};

use crate::dom::{Document, NodeId};

/// RTL marker attribute
pub const RTL_ATTR: &str = "data-rtl";

/// Class added to form fields whose value is RTL
pub const RTL_INPUT_CLASS: &str = "rtl-input-active";

/// Marks form fields and editables whose listeners are bound
pub const LISTENER_ATTR: &str = "data-rtl-listener";

/// Marks elements whose translation has already been inserted
pub const PROCESSED_ATTR: &str = "data-gemini-translated";

/// Id of the injected style element
pub const STYLE_ELEMENT_ID: &str = "dynamic-rtl-styles";

/// Id of the progress indicator element
pub const INDICATOR_ID: &str = "gemini-translation-indicator";

/// Class of inserted translation annotations
pub const TRANSLATION_CONTAINER_CLASS: &str = "gemini-translation-container";

/// Class of the text span inside an annotation
pub const TRANSLATION_TEXT_CLASS: &str = "gemini-translation-text";

/// Prefix for identities generated by the extractor
pub const GENERATED_ID_PREFIX: &str = "gemini-translate-id-";

/// Subtrees the document pass never walks into
const SKIPPED_TAGS: &[&str] = &["script", "style", "noscript"];

pub(crate) fn mark_rtl(doc: &mut Document, node: NodeId) {
    doc.set_attr(node, RTL_ATTR, "true");
}

pub(crate) fn is_marked(doc: &Document, node: NodeId) -> bool {
    doc.attr(node, RTL_ATTR) == Some("true")
}

/// True for elements the document pass must not descend into
pub(crate) fn is_skipped_tag(doc: &Document, node: NodeId) -> bool {
    doc.tag_name(node).is_some_and(|name| SKIPPED_TAGS.contains(&name))
}

/// `contenteditable` present and not explicitly "false"
pub(crate) fn is_editable(doc: &Document, node: NodeId) -> bool {
    doc.attr(node, "contenteditable")
        .is_some_and(|value| !value.eq_ignore_ascii_case("false"))
}

/// Remove every RTL marker and active class from the document
pub fn clear_markers(doc: &mut Document) -> usize {
    let marked = doc.find_elements(|doc, id| is_marked(doc, id) || doc.has_class(id, RTL_INPUT_CLASS));
    for node in &marked {
        doc.remove_attr(*node, RTL_ATTR);
        doc.remove_class(*node, RTL_INPUT_CLASS);
    }
    marked.len()
}
