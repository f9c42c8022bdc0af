/*!
 * Input and editable binding.
 *
 * Form fields and contenteditable regions are not handled by the document
 * pass. Each one is bound once (tracked by the listener attribute) and its
 * marker then follows the live value through input, focus, blur and paste
 * events delivered by the host.
 */

use std::time::{Duration, Instant};

use log::debug;

use crate::detector::should_be_rtl;
use crate::dom::{Document, NodeId};
use crate::scheduler::CoalescingScheduler;

use super::{LISTENER_ATTR, RTL_ATTR, RTL_INPUT_CLASS, is_editable, mark_rtl};

/// Events a bound element reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    Input,
    Focus,
    Blur,
    /// Fired before the pasted content lands in the element
    Paste,
}

/// Binding manager for input-like elements
#[derive(Debug, Clone)]
pub struct InputBindings {
    /// Pastes waiting for the host to apply their content
    pending_pastes: CoalescingScheduler<NodeId>,
}

impl Default for InputBindings {
    fn default() -> Self {
        Self::new()
    }
}

impl InputBindings {
    pub fn new() -> Self {
        Self {
            pending_pastes: CoalescingScheduler::new(Duration::ZERO),
        }
    }

    /// Bind every unbound input-like element in the document. Returns the
    /// number of newly bound elements.
    pub fn scan(&mut self, doc: &mut Document) -> usize {
        let candidates = doc.find_elements(|doc, id| is_input_like(doc, id) && !is_bound(doc, id));
        let mut bound = 0;
        for element in candidates {
            if self.bind(doc, element) {
                bound += 1;
            }
        }
        if bound > 0 {
            debug!("Bound {} input-like elements", bound);
        }
        bound
    }

    /// Bind a single element and evaluate its current content. Binding an
    /// already bound or non input-like element is a no-op returning false.
    pub fn bind(&mut self, doc: &mut Document, element: NodeId) -> bool {
        if !is_input_like(doc, element) || is_bound(doc, element) {
            return false;
        }
        doc.set_attr(element, LISTENER_ATTR, "true");

        if should_be_rtl(&current_text(doc, element)) || placeholder_qualifies(doc, element) {
            set_marker(doc, element);
        } else {
            clear_marker(doc, element);
        }
        true
    }

    /// React to an event on a bound element. Pastes are evaluated on the
    /// next [`tick`](Self::tick) at or after `now`.
    pub fn handle_event(&mut self, doc: &mut Document, element: NodeId, event: InputEvent, now: Instant) {
        if !is_bound(doc, element) {
            return;
        }

        let text = current_text(doc, element);
        let qualifies = should_be_rtl(&text);
        match event {
            InputEvent::Input => {
                // An emptied field keeps the direction of an RTL placeholder
                let keep_for_placeholder = text.trim().is_empty() && placeholder_qualifies(doc, element);
                if qualifies {
                    set_marker(doc, element);
                } else if !keep_for_placeholder {
                    clear_marker(doc, element);
                }
            }
            InputEvent::Focus => {
                if qualifies {
                    set_marker(doc, element);
                }
            }
            InputEvent::Blur => {
                if qualifies {
                    set_marker(doc, element);
                } else if !placeholder_qualifies(doc, element) {
                    clear_marker(doc, element);
                }
            }
            InputEvent::Paste => {
                self.pending_pastes.schedule(element, now);
            }
        }
    }

    /// Whether any paste is waiting to be evaluated
    pub fn has_pending(&self) -> bool {
        self.pending_pastes.has_pending()
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending_pastes.next_deadline()
    }

    /// Evaluate pastes whose content has landed. Returns how many ran.
    pub fn tick(&mut self, doc: &mut Document, now: Instant) -> usize {
        let due = self.pending_pastes.take_due(now);
        for element in &due {
            if !doc.is_connected(*element) {
                continue;
            }
            if should_be_rtl(&current_text(doc, *element)) {
                set_marker(doc, *element);
            } else {
                clear_marker(doc, *element);
            }
        }
        due.len()
    }

    /// Forget pending work
    pub fn reset(&mut self) {
        self.pending_pastes.clear();
    }
}

/// Text inputs (text, search or no type), textareas and editable regions
pub fn is_input_like(doc: &Document, node: NodeId) -> bool {
    is_form_field(doc, node) || is_bindable_editable(doc, node)
}

/// Whether `node` is or contains an input-like element
pub fn contains_input_like(doc: &Document, node: NodeId) -> bool {
    is_input_like(doc, node)
        || doc
            .descendants(node)
            .into_iter()
            .any(|id| is_input_like(doc, id))
}

pub fn is_bound(doc: &Document, node: NodeId) -> bool {
    doc.has_attr(node, LISTENER_ATTR)
}

fn is_form_field(doc: &Document, node: NodeId) -> bool {
    match doc.tag_name(node) {
        Some("textarea") => true,
        Some("input") => match doc.attr(node, "type") {
            None => true,
            Some(kind) => {
                let kind = kind.trim();
                kind.is_empty() || kind.eq_ignore_ascii_case("text") || kind.eq_ignore_ascii_case("search")
            }
        },
        _ => false,
    }
}

fn is_bindable_editable(doc: &Document, node: NodeId) -> bool {
    doc.attr(node, "contenteditable")
        .is_some_and(|value| value.is_empty() || value.eq_ignore_ascii_case("true"))
        && is_editable(doc, node)
}

fn current_text(doc: &Document, node: NodeId) -> String {
    if is_form_field(doc, node) {
        doc.value(node)
    } else {
        doc.text_content(node)
    }
}

fn placeholder_qualifies(doc: &Document, node: NodeId) -> bool {
    is_form_field(doc, node) && doc.attr(node, "placeholder").is_some_and(should_be_rtl)
}

fn set_marker(doc: &mut Document, node: NodeId) {
    mark_rtl(doc, node);
    if is_form_field(doc, node) {
        doc.add_class(node, RTL_INPUT_CLASS);
    }
}

fn clear_marker(doc: &mut Document, node: NodeId) {
    doc.remove_attr(node, RTL_ATTR);
    doc.remove_class(node, RTL_INPUT_CLASS);
}
