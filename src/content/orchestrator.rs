/*!
 * Translation orchestrator.
 *
 * Runs one page translation at a time through the stages
 * `Idle -> Extracting -> AwaitingApi -> Mapping -> Inserting -> Idle | Failed`.
 * A second run while one is in flight is rejected with
 * [`TranslationError::AlreadyRunning`] before anything else happens.
 *
 * The document lock is only held between awaits; the backend call runs
 * with the document unlocked.
 */

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use log::{debug, error, info, warn};
use parking_lot::Mutex;

use crate::dom::{Document, NodeId};
use crate::errors::TranslationError;
use crate::translation::{TranslationBackend, TranslationRequest, TranslationResult};

use super::extractor::{Extraction, Extractor};
use super::indicator::{ProgressIndicator, ProgressStage};
use super::{PROCESSED_ATTR, TRANSLATION_CONTAINER_CLASS, TRANSLATION_TEXT_CLASS};

/// Inline style of inserted annotations
const CONTAINER_STYLE: &str = "border-top: 1px dashed #dee2e6; margin-top: 0.5em; padding-top: 0.4em; \
margin-bottom: 0.5em; font-size: 0.9em; color: #555; direction: rtl; text-align: right; \
font-family: var(--dynamic-rtl-font-family, 'Vazirmatn', Arial, sans-serif); line-height: 1.6;";

/// Receives every progress stage, for hosts mirroring the indicator
pub type ProgressCallback = Arc<dyn Fn(&ProgressStage) + Send + Sync>;

/// Pipeline state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OrchestratorState {
    #[default]
    Idle,
    Extracting,
    AwaitingApi,
    Mapping,
    Inserting,
    Failed,
}

/// Parameters of a page translation, as pushed by the popup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslatePageRequest {
    pub api_key: String,
    pub tone: String,
    pub model: String,
}

/// Outcome of a successful run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TranslationSummary {
    /// Units sent to the backend
    pub sent: usize,
    /// Non-empty translations received
    pub translated: usize,
    /// Annotations inserted into the page
    pub inserted: usize,
}

/// Releases the busy flag when a run ends, however it ends
struct BusyGuard<'a> {
    flag: &'a AtomicBool,
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

/// Page translation pipeline
pub struct TranslationOrchestrator {
    busy: AtomicBool,
    state: Mutex<OrchestratorState>,
    extractor: Extractor,
    progress: Option<ProgressCallback>,
}

impl std::fmt::Debug for TranslationOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TranslationOrchestrator")
            .field("busy", &self.busy)
            .field("state", &*self.state.lock())
            .field("extractor", &self.extractor)
            .finish_non_exhaustive()
    }
}

impl Default for TranslationOrchestrator {
    fn default() -> Self {
        Self::new(Extractor::default())
    }
}

impl TranslationOrchestrator {
    pub fn new(extractor: Extractor) -> Self {
        Self {
            busy: AtomicBool::new(false),
            state: Mutex::new(OrchestratorState::Idle),
            extractor,
            progress: None,
        }
    }

    /// Mirror every progress stage to `callback`
    pub fn with_progress(mut self, callback: ProgressCallback) -> Self {
        self.progress = Some(callback);
        self
    }

    pub fn state(&self) -> OrchestratorState {
        *self.state.lock()
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    fn acquire(&self) -> Result<BusyGuard<'_>, TranslationError> {
        self.busy
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .map(|_| BusyGuard { flag: &self.busy })
            .map_err(|_| TranslationError::AlreadyRunning)
    }

    fn set_state(&self, state: OrchestratorState) {
        *self.state.lock() = state;
    }

    fn report(&self, doc: &mut Document, stage: &ProgressStage) {
        debug!("Translation progress: {:?}", stage);
        ProgressIndicator::show(doc, stage);
        if let Some(callback) = &self.progress {
            callback(stage);
        }
    }

    /// Translate the page held in `doc`.
    ///
    /// The busy check happens before the first await, so a concurrent call
    /// fails on its first poll without extracting or calling the backend.
    pub async fn translate_page<B>(
        &self,
        doc: &Arc<Mutex<Document>>,
        backend: &B,
        request: &TranslatePageRequest,
    ) -> Result<TranslationSummary, TranslationError>
    where
        B: TranslationBackend + ?Sized,
    {
        let _guard = self.acquire()?;

        if request.api_key.trim().is_empty() {
            return Err(TranslationError::MissingApiKey);
        }
        if request.tone.trim().is_empty() || request.model.trim().is_empty() {
            return Err(TranslationError::InvalidRequest(
                "missing translation tone or model".to_string(),
            ));
        }

        let extraction = {
            let mut doc = doc.lock();
            self.set_state(OrchestratorState::Extracting);
            self.report(&mut doc, &ProgressStage::Started);

            let extraction = self.extractor.extract(&mut doc);
            if extraction.is_empty() {
                info!("No translatable text found on page");
                self.report(&mut doc, &ProgressStage::NothingToTranslate);
                self.set_state(OrchestratorState::Idle);
                return Err(TranslationError::NoTranslatableText);
            }

            self.report(&mut doc, &ProgressStage::RequestSent);
            self.set_state(OrchestratorState::AwaitingApi);
            extraction
        };

        let api_request = TranslationRequest {
            api_key: request.api_key.clone(),
            model: request.model.clone(),
            tone: request.tone.clone(),
            units: extraction.units.clone(),
        };

        let results = match backend.translate(&api_request).await {
            Ok(results) => results,
            Err(e) => {
                error!("Page translation failed: {}", e);
                let mut doc = doc.lock();
                if e.is_rate_limit() {
                    self.report(&mut doc, &ProgressStage::RateLimited);
                } else {
                    self.report(&mut doc, &ProgressStage::Failed { message: e.user_message() });
                    ProgressIndicator::hide(&mut doc);
                }
                self.set_state(OrchestratorState::Failed);
                return Err(e);
            }
        };

        let mut doc = doc.lock();
        self.report(&mut doc, &ProgressStage::ResponseReceived);
        self.set_state(OrchestratorState::Mapping);
        let insertions = self.prepare_insertions(&mut doc, &extraction, &results);

        self.set_state(OrchestratorState::Inserting);
        self.report(&mut doc, &ProgressStage::Inserting { count: insertions.len() });
        let mut inserted = 0;
        for (original, container) in &insertions {
            if doc.is_connected(*original) && doc.insert_after(*original, *container) {
                inserted += 1;
            } else {
                warn!("Source element {:?} left the page before insertion", original);
            }
        }

        let summary = TranslationSummary {
            sent: extraction.len(),
            translated: results.iter().filter(|result| !result.is_empty()).count(),
            inserted,
        };
        self.report(&mut doc, &ProgressStage::Completed { translated: summary.translated });
        self.set_state(OrchestratorState::Idle);
        info!(
            "Page translation finished: {} sent, {} translated, {} inserted",
            summary.sent, summary.translated, summary.inserted
        );
        Ok(summary)
    }

    /// Build annotations for every usable result and mark their sources.
    /// Nothing is attached to the page yet.
    fn prepare_insertions(
        &self,
        doc: &mut Document,
        extraction: &Extraction,
        results: &[TranslationResult],
    ) -> Vec<(NodeId, NodeId)> {
        let total = extraction.len();
        let mut insertions = Vec::new();

        for (index, result) in results.iter().enumerate() {
            let Some(&original) = extraction.elements.get(&result.id) else {
                warn!("Original element not found for id {}", result.id);
                continue;
            };
            if result.is_empty() {
                warn!("Empty translation received for id {}", result.id);
                continue;
            }
            if !doc.is_connected(original) || doc.has_attr(original, PROCESSED_ATTR) {
                continue;
            }
            let already_annotated = doc
                .next_element_sibling(original)
                .is_some_and(|sibling| doc.has_class(sibling, TRANSLATION_CONTAINER_CLASS));
            if already_annotated {
                debug!("Skipping already displayed translation for {}", result.id);
                continue;
            }

            let container = build_container(doc, &result.translation);
            doc.set_attr(original, PROCESSED_ATTR, "true");
            insertions.push((original, container));
            self.report(doc, &ProgressStage::Mapping { current: index + 1, total });
        }

        insertions
    }
}

fn build_container(doc: &mut Document, translation: &str) -> NodeId {
    let container = doc.create_element_with_attrs(
        "div",
        &[
            ("class", TRANSLATION_CONTAINER_CLASS),
            ("lang", "fa"),
            ("dir", "rtl"),
            ("style", CONTAINER_STYLE),
        ],
    );
    let span = doc.create_element_with_attrs("span", &[("class", TRANSLATION_TEXT_CLASS)]);
    let text = doc.create_text(translation.trim());
    doc.append_child(span, text);
    doc.append_child(container, span);
    container
}

/// Remove inserted annotations and processed markers so the page can be
/// translated again. Returns the number of annotations removed.
pub fn clear_translations(doc: &mut Document) -> usize {
    let containers = doc.find_elements(|doc, id| doc.has_class(id, TRANSLATION_CONTAINER_CLASS));
    for container in &containers {
        doc.detach(*container);
    }
    for element in doc.find_elements(|doc, id| doc.has_attr(id, PROCESSED_ATTR)) {
        doc.remove_attr(element, PROCESSED_ATTR);
    }
    debug!("Cleared {} previous translations", containers.len());
    containers.len()
}
