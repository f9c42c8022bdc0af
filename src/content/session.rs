/*!
 * Per-page session.
 *
 * `PageSession` is the single context object a page host owns: the shared
 * document, the enablement flag, the active font, the mutation engine, the
 * translation orchestrator and the session's own deferred tasks. Hosts feed
 * it recorded mutations, input events, pushed messages and clock ticks.
 * Work that starts inside the session (indicator hides after a translation)
 * reads the session's [`Clock`].
 *
 * Locks are always taken document first, then engine.
 */

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use log::{debug, info, warn};
use parking_lot::Mutex;

use crate::dom::{Document, NodeId};
use crate::errors::{SettingsError, TranslationError};
use crate::messages::{Message, Reply};
use crate::scheduler::{Clock, CoalescingScheduler, SystemClock};
use crate::settings::Settings;
use crate::translation::TranslationBackend;

use super::engine::{EngineOptions, MutationEngine};
use super::extractor::Extractor;
use super::indicator::{ProgressIndicator, ProgressStage};
use super::inputs::InputEvent;
use super::orchestrator::{TranslatePageRequest, TranslationOrchestrator, TranslationSummary};
use super::style::{FontConfig, StyleInjector};
use super::clear_markers;

/// Deferred session work
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionTask {
    HideIndicator,
}

pub struct PageSession {
    doc: Arc<Mutex<Document>>,
    enabled: AtomicBool,
    font: Mutex<FontConfig>,
    engine: Mutex<MutationEngine>,
    orchestrator: TranslationOrchestrator,
    tasks: Mutex<CoalescingScheduler<SessionTask>>,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for PageSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageSession")
            .field("enabled", &self.is_enabled())
            .field("font", &self.font.lock().family)
            .field("orchestrator", &self.orchestrator)
            .finish_non_exhaustive()
    }
}

impl PageSession {
    pub fn new(doc: Document, options: EngineOptions, orchestrator: TranslationOrchestrator) -> Self {
        Self {
            doc: Arc::new(Mutex::new(doc)),
            enabled: AtomicBool::new(false),
            font: Mutex::new(FontConfig::default()),
            engine: Mutex::new(MutationEngine::new(options)),
            orchestrator,
            tasks: Mutex::new(CoalescingScheduler::new(Duration::ZERO)),
            clock: Arc::new(SystemClock),
        }
    }

    /// Session with default engine options and extractor
    pub fn with_defaults(doc: Document) -> Self {
        Self::new(doc, EngineOptions::default(), TranslationOrchestrator::new(Extractor::default()))
    }

    pub fn with_font(self, font: FontConfig) -> Self {
        *self.font.lock() = font;
        self
    }

    /// Replace the wall clock, e.g. with a host's virtual time
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn document(&self) -> &Arc<Mutex<Document>> {
        &self.doc
    }

    pub fn orchestrator(&self) -> &TranslationOrchestrator {
        &self.orchestrator
    }

    pub fn font(&self) -> FontConfig {
        self.font.lock().clone()
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    /// True when the page declares Persian or Arabic and is left untouched
    pub fn is_idle(&self) -> bool {
        let doc = self.doc.lock();
        self.engine.lock().is_idle(&doc)
    }

    /// Initial activation. Returns the number of elements marked.
    pub fn start(&self, enabled: bool) -> usize {
        self.enabled.store(enabled, Ordering::SeqCst);
        let mut doc = self.doc.lock();
        doc.start_recording();
        if self.engine.lock().is_idle(&doc) {
            info!("Page language is Persian or Arabic, session stays idle");
            return 0;
        }
        if !enabled {
            debug!("Session started disabled for this site");
            return 0;
        }
        self.activate(&mut doc)
    }

    /// Start with the enablement and font stored in `settings` for `hostname`
    pub fn start_with_settings(&self, settings: &Settings, hostname: &str) -> Result<usize, SettingsError> {
        let enabled = settings.site_policy()?.is_enabled_for(hostname);
        *self.font.lock() = settings.font_config()?;
        Ok(self.start(enabled))
    }

    fn activate(&self, doc: &mut Document) -> usize {
        StyleInjector::apply(doc, &self.font.lock());
        let mut engine = self.engine.lock();
        let marked = engine.process_document(doc);
        engine.inputs_mut().scan(doc);
        // The pass's own writes are not page mutations
        doc.take_mutations();
        marked
    }

    /// Switch the session on or off. Disabling strips every marker and the
    /// style element.
    pub fn set_enabled(&self, enabled: bool) -> usize {
        self.enabled.store(enabled, Ordering::SeqCst);
        let mut doc = self.doc.lock();
        if self.engine.lock().is_idle(&doc) {
            return 0;
        }

        if enabled {
            info!("RTL handling enabled");
            self.activate(&mut doc)
        } else {
            let cleared = clear_markers(&mut doc);
            StyleInjector::remove(&mut doc);
            self.engine.lock().reset();
            doc.take_mutations();
            info!("RTL handling disabled, cleared {} markers", cleared);
            cleared
        }
    }

    /// Replace the active font, re-injecting the style when enabled
    pub fn update_font(&self, font: FontConfig) {
        *self.font.lock() = font;
        if !self.is_enabled() {
            return;
        }
        let mut doc = self.doc.lock();
        if self.engine.lock().is_idle(&doc) {
            return;
        }
        StyleInjector::apply(&mut doc, &self.font.lock());
        doc.take_mutations();
        debug!("Font updated");
    }

    /// Run `f` against the document, then process whatever it changed
    pub fn mutate<R>(&self, now: Instant, f: impl FnOnce(&mut Document) -> R) -> R {
        let result = f(&mut self.doc.lock());
        self.pump(now);
        result
    }

    /// Feed recorded mutations to the engine. Returns the number of
    /// elements marked.
    pub fn pump(&self, now: Instant) -> usize {
        let mut doc = self.doc.lock();
        let mutations = doc.take_mutations();
        if mutations.is_empty() || !self.is_enabled() {
            return 0;
        }
        let marked = self.engine.lock().process_mutations(&mut doc, &mutations, now);
        // Marking writes attributes only, but keep the log clean regardless
        doc.take_mutations();
        marked
    }

    /// Forward an input event on `element`
    pub fn handle_input_event(&self, element: NodeId, event: InputEvent, now: Instant) {
        if !self.is_enabled() {
            return;
        }
        let mut doc = self.doc.lock();
        self.engine.lock().inputs_mut().handle_event(&mut doc, element, event, now);
    }

    /// Ask for a full document pass after the quiet period
    pub fn request_rescan(&self, now: Instant) {
        if self.is_enabled() {
            self.engine.lock().request_rescan(now);
        }
    }

    /// Earliest time `tick` has work to do
    pub fn next_deadline(&self) -> Option<Instant> {
        let engine = self.engine.lock().next_deadline();
        let session = self.tasks.lock().next_deadline();
        match (engine, session) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Run due work. Returns the number of tasks run. Mutations the host
    /// recorded but never pumped are processed first.
    pub fn tick(&self, now: Instant) -> usize {
        self.pump(now);
        let mut doc = self.doc.lock();
        let mut ran = 0;
        for task in self.tasks.lock().take_due(now) {
            match task {
                SessionTask::HideIndicator => ProgressIndicator::hide(&mut doc),
            }
            ran += 1;
        }
        if self.is_enabled() {
            ran += self.engine.lock().tick(&mut doc, now);
        }
        // Only the writes made above are left in the log
        doc.take_mutations();
        ran
    }

    /// Schedule the indicator to hide if `stage` dismisses itself
    fn schedule_hide(&self, stage: &ProgressStage) {
        if let Some(delay) = stage.hide_after() {
            self.tasks
                .lock()
                .schedule_after(SessionTask::HideIndicator, self.clock.now(), delay);
        }
    }

    /// Translate the page and schedule the indicator to hide afterwards
    pub async fn translate_page<B>(
        &self,
        backend: &B,
        request: &TranslatePageRequest,
    ) -> Result<TranslationSummary, TranslationError>
    where
        B: TranslationBackend + ?Sized,
    {
        let result = self.orchestrator.translate_page(&self.doc, backend, request).await;
        match &result {
            Ok(summary) => self.schedule_hide(&ProgressStage::Completed {
                translated: summary.translated,
            }),
            Err(TranslationError::NoTranslatableText) => self.schedule_hide(&ProgressStage::NothingToTranslate),
            Err(_) => {}
        }
        // Inserted annotations are Persian; let the engine see them
        self.pump(self.clock.now());
        result
    }

    /// Handle a message pushed to the page
    pub async fn handle_message<B>(&self, message: Message, settings: &Settings, backend: &B) -> Reply
    where
        B: TranslationBackend + ?Sized,
    {
        debug!("Page received {}", message.name());
        match message {
            Message::ToggleStatus { status: enabled } | Message::ToggleSite { enabled, .. } => {
                self.set_enabled(enabled);
                Reply::ok()
            }
            Message::UpdateFont => match settings.font_config() {
                Ok(font) => {
                    self.update_font(font);
                    Reply::ok()
                }
                Err(e) => {
                    warn!("Failed to read font settings: {}", e);
                    Reply::error(e.to_string())
                }
            },
            Message::TranslatePage { api_key, tone, model } => {
                let request = TranslatePageRequest { api_key, tone, model };
                match self.translate_page(backend, &request).await {
                    Ok(_) => Reply::ok(),
                    Err(e) => Reply::from_error(&e),
                }
            }
            Message::ShowApiKeyNeededError => {
                let stage = ProgressStage::ApiKeyNeeded;
                ProgressIndicator::show(&mut self.doc.lock(), &stage);
                self.schedule_hide(&stage);
                Reply::ok()
            }
            other => Reply::error(format!("Unsupported message: {}", other.name())),
        }
    }
}
