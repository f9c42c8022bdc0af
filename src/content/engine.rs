/*!
 * DOM mutation engine.
 *
 * Decides which elements carry the RTL marker and keeps that decision current
 * as the page changes. The host feeds it either explicit events
 * (`on_node_added`, `on_text_changed`) or recorded [`Mutation`]s; bursts of
 * rescans are coalesced through a [`CoalescingScheduler`] and run from
 * [`MutationEngine::tick`].
 */

use std::time::{Duration, Instant};

use log::{debug, trace};
use serde::{Deserialize, Serialize};

use crate::detector::{is_rtl_script, should_be_rtl};
use crate::dom::{Document, Mutation, NodeId};
use crate::language_utils::is_rtl_page_language;
use crate::scheduler::CoalescingScheduler;

use super::inputs::{InputBindings, contains_input_like, is_input_like};
use super::{RTL_ATTR, is_editable, is_marked, is_skipped_tag, mark_rtl};

/// Default quiet period for rescans
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);

/// Which element receives the marker for a qualifying text node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerStrategy {
    /// The text node's parent element only
    #[default]
    Conservative,
    /// The parent and every ancestor up the single-child chain, plus the
    /// first ancestor with several children, never `body`
    Aggressive,
}

impl std::fmt::Display for ContainerStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Conservative => write!(f, "conservative"),
            Self::Aggressive => write!(f, "aggressive"),
        }
    }
}

impl std::str::FromStr for ContainerStrategy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.to_lowercase().as_str() {
            "conservative" => Ok(Self::Conservative),
            "aggressive" => Ok(Self::Aggressive),
            _ => Err(anyhow::anyhow!("Invalid container strategy: {}", s)),
        }
    }
}

/// Engine behaviour knobs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineOptions {
    pub strategy: ContainerStrategy,
    /// Clear a container's marker when its text loses all RTL characters
    pub unmark_on_change: bool,
    /// Quiet period for coalesced rescans
    pub debounce: Duration,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            strategy: ContainerStrategy::Conservative,
            unmark_on_change: true,
            debounce: DEFAULT_DEBOUNCE,
        }
    }
}

/// Deferred engine work
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum EngineTask {
    RescanDocument,
    ScanInputs,
}

/// Marks RTL containers on the initial pass and on live changes
#[derive(Debug, Clone)]
pub struct MutationEngine {
    options: EngineOptions,
    inputs: InputBindings,
    scheduler: CoalescingScheduler<EngineTask>,
}

impl Default for MutationEngine {
    fn default() -> Self {
        Self::new(EngineOptions::default())
    }
}

impl MutationEngine {
    pub fn new(options: EngineOptions) -> Self {
        Self {
            scheduler: CoalescingScheduler::new(options.debounce),
            inputs: InputBindings::new(),
            options,
        }
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    pub fn inputs(&self) -> &InputBindings {
        &self.inputs
    }

    pub fn inputs_mut(&mut self) -> &mut InputBindings {
        &mut self.inputs
    }

    /// A page declared as Persian or Arabic is left alone entirely
    pub fn is_idle(&self, doc: &Document) -> bool {
        doc.document_element()
            .and_then(|html| doc.attr(html, "lang"))
            .is_some_and(is_rtl_page_language)
    }

    /// Initial pass over `body`. Returns the number of elements marked.
    pub fn process_document(&mut self, doc: &mut Document) -> usize {
        if self.is_idle(doc) {
            debug!("Page language is already RTL, skipping document pass");
            return 0;
        }
        let Some(body) = doc.body() else {
            return 0;
        };
        let marked = self.walk(doc, body);
        debug!("Document pass marked {} elements", marked);
        marked
    }

    /// Handle a node inserted into the document
    pub fn on_node_added(&mut self, doc: &mut Document, node: NodeId, now: Instant) -> usize {
        if self.is_idle(doc) || !doc.is_connected(node) {
            return 0;
        }

        if doc.is_text(node) {
            return self.classify_text_node(doc, node);
        }
        if !doc.is_element(node) {
            return 0;
        }

        if contains_input_like(doc, node) {
            self.scheduler.schedule(EngineTask::ScanInputs, now);
        }

        if doc.ancestors(node).any(|ancestor| is_marked(doc, ancestor)) {
            trace!("Added node {:?} sits under a marked ancestor", node);
            return 0;
        }
        self.walk(doc, node)
    }

    /// Handle a character-data change on a text node. Only that node's
    /// container is re-evaluated.
    pub fn on_text_changed(&mut self, doc: &mut Document, node: NodeId) -> usize {
        if self.is_idle(doc) || !doc.is_text(node) || !doc.is_connected(node) {
            return 0;
        }
        let Some(parent) = doc.parent(node).filter(|parent| doc.is_element(*parent)) else {
            return 0;
        };
        if is_input_like(doc, parent) || self.in_excluded_subtree(doc, parent) {
            return 0;
        }

        let text = doc.text(node).unwrap_or_default().to_string();
        if should_be_rtl(&text) {
            return self.mark_containers(doc, parent);
        }

        if self.options.unmark_on_change && !is_rtl_script(&text) && is_marked(doc, parent) {
            debug!("Text of {:?} no longer RTL, clearing container marker", node);
            doc.remove_attr(parent, RTL_ATTR);
        }
        0
    }

    /// Dispatch recorded mutations in the order they happened
    pub fn process_mutations(&mut self, doc: &mut Document, mutations: &[Mutation], now: Instant) -> usize {
        mutations
            .iter()
            .map(|mutation| match *mutation {
                Mutation::ChildAdded { child, .. } => self.on_node_added(doc, child, now),
                Mutation::CharacterData { node } => self.on_text_changed(doc, node),
            })
            .sum()
    }

    /// Ask for a full document pass once the page has been quiet
    pub fn request_rescan(&mut self, now: Instant) {
        self.scheduler.schedule(EngineTask::RescanDocument, now);
    }

    /// Ask for an input binding scan once the page has been quiet
    pub fn request_input_scan(&mut self, now: Instant) {
        self.scheduler.schedule(EngineTask::ScanInputs, now);
    }

    pub fn has_pending(&self) -> bool {
        self.scheduler.has_pending() || self.inputs.has_pending()
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        match (self.scheduler.next_deadline(), self.inputs.next_deadline()) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Run deferred work that is due. Returns the number of tasks run.
    pub fn tick(&mut self, doc: &mut Document, now: Instant) -> usize {
        let mut ran = self.inputs.tick(doc, now);
        for task in self.scheduler.take_due(now) {
            if self.is_idle(doc) {
                continue;
            }
            match task {
                EngineTask::RescanDocument => {
                    self.process_document(doc);
                }
                EngineTask::ScanInputs => {
                    self.inputs.scan(doc);
                }
            }
            ran += 1;
        }
        ran
    }

    /// Drop all deferred work
    pub fn reset(&mut self) {
        self.scheduler.clear();
        self.inputs.reset();
    }

    /// Walk `start` and its subtree, marking containers and binding inputs
    fn walk(&mut self, doc: &mut Document, start: NodeId) -> usize {
        let mut marked = 0;
        let mut stack = vec![start];

        while let Some(node) = stack.pop() {
            if doc.is_text(node) {
                marked += self.classify_text_node(doc, node);
                continue;
            }
            if !doc.is_element(node) || is_skipped_tag(doc, node) {
                continue;
            }

            if is_input_like(doc, node) {
                self.inputs.bind(doc, node);
                continue;
            }
            if is_editable(doc, node) || matches!(doc.tag_name(node), Some("input" | "textarea")) {
                continue;
            }

            if doc.attr(node, "title").is_some_and(should_be_rtl) && !is_marked(doc, node) {
                mark_rtl(doc, node);
                marked += 1;
            }

            stack.extend(doc.children(node).iter().rev().copied());
        }

        marked
    }

    /// Mark the container of a qualifying text node
    fn classify_text_node(&mut self, doc: &mut Document, node: NodeId) -> usize {
        let qualifies = doc.text(node).is_some_and(should_be_rtl);
        if !qualifies {
            return 0;
        }
        let Some(parent) = doc.parent(node).filter(|parent| doc.is_element(*parent)) else {
            return 0;
        };

        if let Some(field) = doc.closest(parent, is_input_like) {
            self.inputs.bind(doc, field);
            return 0;
        }
        if self.in_excluded_subtree(doc, parent) {
            return 0;
        }

        self.mark_containers(doc, parent)
    }

    fn in_excluded_subtree(&self, doc: &Document, element: NodeId) -> bool {
        doc.closest(element, |doc, id| {
            is_skipped_tag(doc, id) || is_editable(doc, id) || matches!(doc.tag_name(id), Some("input" | "textarea"))
        })
        .is_some()
    }

    /// Apply the container strategy starting at `parent`
    fn mark_containers(&self, doc: &mut Document, parent: NodeId) -> usize {
        let mut targets = Vec::new();
        match self.options.strategy {
            ContainerStrategy::Conservative => {
                if !is_page_level(doc, parent) {
                    targets.push(parent);
                }
            }
            ContainerStrategy::Aggressive => {
                let mut current = Some(parent);
                while let Some(element) = current {
                    if is_page_level(doc, element) {
                        break;
                    }
                    targets.push(element);
                    if doc.element_children(element).len() > 1 {
                        break;
                    }
                    current = doc.parent(element).filter(|id| doc.is_element(*id));
                }
            }
        }

        let mut marked = 0;
        for element in targets {
            if !is_marked(doc, element) {
                mark_rtl(doc, element);
                marked += 1;
            }
        }
        marked
    }
}

/// `body` and `html` never carry the marker
fn is_page_level(doc: &Document, element: NodeId) -> bool {
    matches!(doc.tag_name(element), Some("body" | "html"))
}
