use anyhow::{Context, Result, anyhow};
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, error, info, warn};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::app_config::Config;
use crate::background::{Background, MessagingBackend, hostname_of};
use crate::content::{
    Extractor, PageSession, ProgressIndicator, ProgressStage, TranslatePageRequest, TranslationOrchestrator,
    TranslationSummary, clear_translations,
};
use crate::dom::{parse_html, to_html};
use crate::errors::TranslationError;
use crate::file_utils::FileManager;
use crate::providers::gemini::Gemini;
use crate::settings::{FontUpload, Settings};
use crate::site_policy::{SitePolicy, normalize_host};
use crate::translation::{GeminiTranslator, TranslationBackend};

// @module: Application controller for page processing

/// Options for one `process` run
#[derive(Debug, Clone, Default)]
pub struct ProcessOptions {
    /// Translate eligible paragraphs after the RTL pass
    pub translate: bool,
    /// Drop previous translations before translating again
    pub retranslate: bool,
    /// Site the pages belong to, for the enablement policy
    pub hostname: Option<String>,
    /// Where processed pages are written; next to the input when unset
    pub output_dir: Option<PathBuf>,
    /// Overwrite existing outputs
    pub force_overwrite: bool,
}

/// What happened to one page
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageReport {
    /// The page declares Persian or Arabic and was left untouched
    pub idle: bool,
    /// RTL handling was enabled for the page's site
    pub enabled: bool,
    /// Elements marked by the initial pass
    pub marked: usize,
    /// Translation outcome, when translation ran
    pub translation: Option<TranslationSummary>,
}

/// Main application controller
pub struct Controller {
    // @field: App configuration
    config: Config,
    // @field: Persistent settings store
    settings: Settings,
}

impl Controller {
    // @method: Create a controller over the configured settings file
    pub fn with_config(config: Config) -> Result<Self> {
        let settings = Settings::open(&config.storage_path)
            .context(format!("Failed to open settings store: {}", config.storage_path))?
            .with_bundled_font(config.bundled_font());
        Self::with_settings(config, settings)
    }

    /// Create a controller over an existing settings store
    pub fn with_settings(config: Config, settings: Settings) -> Result<Self> {
        settings
            .initialize_defaults()
            .context("Failed to initialize default settings")?;
        Ok(Self { config, settings })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    // @returns: Gemini translator built from the configuration
    pub fn translator(&self) -> GeminiTranslator {
        let provider = Gemini::new_with_config(
            self.config.translation.endpoint.clone(),
            self.config.timeout(),
            self.config.translation.retry_count,
            self.config.translation.retry_backoff_ms,
        );
        GeminiTranslator::with_provider(provider).temperature(self.config.translation.temperature)
    }

    /// Backend that reaches the translator through the background
    /// coordinator, the way a page does
    pub fn page_backend(&self) -> MessagingBackend {
        let background = Background::new(self.settings.clone(), Arc::new(self.translator()));
        MessagingBackend::new(background)
    }

    fn spinner() -> ProgressBar {
        let spinner = ProgressBar::new_spinner();
        let style = ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner());
        spinner.set_style(style);
        spinner.enable_steady_tick(Duration::from_millis(120));
        spinner
    }

    fn translate_request(&self) -> Result<TranslatePageRequest> {
        let api_key = self
            .settings
            .api_key()?
            .ok_or_else(|| anyhow!("No Gemini API key stored, run `dynrtl key set <KEY>` first"))?;
        let tone = self.settings.tone()?;
        let model = self.settings.model()?;
        Ok(TranslatePageRequest { api_key, tone, model })
    }

    /// Process one page held in memory. Returns the resulting HTML.
    pub async fn process_html<B>(
        &self,
        html: &str,
        options: &ProcessOptions,
        backend: &B,
        progress: Option<&ProgressBar>,
    ) -> Result<(String, PageReport)>
    where
        B: TranslationBackend + ?Sized,
    {
        let mut orchestrator = TranslationOrchestrator::new(Extractor::new(self.config.translation.min_words));
        if let Some(progress) = progress {
            let progress = progress.clone();
            orchestrator = orchestrator.with_progress(Arc::new(move |stage: &ProgressStage| {
                progress.set_message(stage.to_string());
            }));
        }

        let session = PageSession::new(parse_html(html), self.config.engine_options(), orchestrator)
            .with_font(self.settings.font_config()?);

        let enabled = match &options.hostname {
            Some(hostname) => self.settings.site_policy()?.is_enabled_for(hostname),
            None => true,
        };

        let mut report = PageReport {
            enabled,
            marked: session.start(enabled),
            idle: session.is_idle(),
            translation: None,
        };
        debug!("RTL pass marked {} elements (enabled: {}, idle: {})", report.marked, enabled, report.idle);

        if options.translate {
            if options.retranslate {
                let removed = clear_translations(&mut session.document().lock());
                debug!("Removed {} previous translations", removed);
            }
            let request = self.translate_request()?;
            match session.translate_page(backend, &request).await {
                Ok(summary) => report.translation = Some(summary),
                Err(TranslationError::NoTranslatableText) => {
                    info!("No translatable text found");
                    report.translation = Some(TranslationSummary::default());
                }
                Err(e) => return Err(anyhow!("Translation failed: {}", e)),
            }
        }

        let mut doc = session.document().lock();
        ProgressIndicator::remove(&mut doc);
        Ok((to_html(&doc)?, report))
    }

    /// Process a file or every page in a directory
    pub async fn run(&self, input_path: PathBuf, options: &ProcessOptions) -> Result<()> {
        let backend = self.page_backend();
        if input_path.is_file() {
            let output_dir = options
                .output_dir
                .clone()
                .unwrap_or_else(|| input_path.parent().unwrap_or(Path::new(".")).to_path_buf());
            self.run_file(&input_path, &output_dir, options, &backend).await?;
            Ok(())
        } else if input_path.is_dir() {
            self.run_folder(&input_path, options, &backend).await
        } else {
            Err(anyhow!("Input path does not exist: {:?}", input_path))
        }
    }

    /// Process one file. Returns `None` when the output exists and was kept.
    pub async fn run_file<B>(
        &self,
        input_file: &Path,
        output_dir: &Path,
        options: &ProcessOptions,
        backend: &B,
    ) -> Result<Option<PageReport>>
    where
        B: TranslationBackend + ?Sized,
    {
        let output_path = FileManager::generate_output_path(input_file, output_dir);
        if output_path.exists() && !options.force_overwrite {
            warn!(
                "Skipping {}, output already exists (use -f to force overwrite)",
                input_file.display()
            );
            return Ok(None);
        }

        let html = FileManager::read_to_string(input_file)?;
        let spinner = Self::spinner();
        spinner.set_message(format!("Processing {}", input_file.display()));

        let result = self.process_html(&html, options, backend, Some(&spinner)).await;
        let (output, report) = match result {
            Ok(result) => result,
            Err(e) => {
                spinner.abandon_with_message(format!("Failed: {}", input_file.display()));
                return Err(e);
            }
        };

        FileManager::write_to_file(&output_path, &output)?;
        spinner.finish_with_message(format!("Wrote {}", output_path.display()));
        info!(
            "{}: {} elements marked{}",
            input_file.display(),
            report.marked,
            report
                .translation
                .map(|summary| format!(", {} translations inserted", summary.inserted))
                .unwrap_or_default()
        );
        Ok(Some(report))
    }

    /// Process every page under a directory
    pub async fn run_folder<B>(&self, input_dir: &Path, options: &ProcessOptions, backend: &B) -> Result<()>
    where
        B: TranslationBackend + ?Sized,
    {
        let start_time = std::time::Instant::now();
        let files = FileManager::find_html_files(input_dir)?;
        if files.is_empty() {
            return Err(anyhow!("No HTML files found in directory: {:?}", input_dir));
        }

        let mut success_count = 0;
        let mut skip_count = 0;
        let mut error_count = 0;

        for file in &files {
            let output_dir = match &options.output_dir {
                Some(dir) => dir.clone(),
                None => file.parent().unwrap_or(input_dir).to_path_buf(),
            };
            match self.run_file(file, &output_dir, options, backend).await {
                Ok(Some(_)) => success_count += 1,
                Ok(None) => skip_count += 1,
                Err(e) => {
                    error!("Error processing file {}: {}", file.display(), e);
                    error_count += 1;
                }
            }
        }

        let summary = format!(
            "Folder processing completed: {} processed, {} skipped, {} errors in {:.1}s",
            success_count,
            skip_count,
            error_count,
            start_time.elapsed().as_secs_f32()
        );
        info!("{}", summary);

        let log_path = input_dir.join("dynrtl.issues.log");
        if let Err(e) = FileManager::append_to_log_file(&log_path, &summary) {
            warn!("Failed to write folder log: {}", e);
        }
        Ok(())
    }

    /// Enable or disable RTL handling for a site
    pub fn set_site_enabled(&self, hostname: &str, enabled: bool) -> Result<SitePolicy> {
        let hostname = hostname_of(hostname).unwrap_or_else(|| normalize_host(hostname));
        if hostname.is_empty() {
            return Err(anyhow!("Hostname must not be empty"));
        }
        let mut policy = self.settings.site_policy()?;
        policy.set_site_enabled(&hostname, enabled);
        self.settings.save_site_policy(&policy)?;
        info!("{} {}", if enabled { "Enabled" } else { "Disabled" }, hostname);
        Ok(policy)
    }

    /// Switch between default-enabled and default-disabled mode
    pub fn set_default_enabled(&self, default_enabled: bool) -> Result<SitePolicy> {
        let mut policy = self.settings.site_policy()?;
        policy.default_enabled = default_enabled;
        self.settings.save_site_policy(&policy)?;
        Ok(policy)
    }

    pub fn site_policy(&self) -> Result<SitePolicy> {
        Ok(self.settings.site_policy()?)
    }

    /// Store a custom TrueType font
    pub fn set_font(&self, font_file: &Path) -> Result<FontUpload> {
        let file_name = font_file
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .ok_or_else(|| anyhow!("Not a font file: {:?}", font_file))?;
        let bytes = FileManager::read_bytes(font_file)?;
        let upload = FontUpload::from_file(&file_name, &bytes)?;
        self.settings.set_custom_font(&upload)?;
        Ok(upload)
    }

    /// Revert to the bundled font
    pub fn clear_font(&self) -> Result<()> {
        self.settings.clear_custom_font()?;
        Ok(())
    }

    /// Store the API key; a blank key removes it
    pub fn set_api_key(&self, api_key: &str) -> Result<()> {
        self.settings.set_api_key(api_key)?;
        Ok(())
    }

    /// Check the stored API key against the API
    pub async fn test_api_key<B>(&self, backend: &B) -> Result<()>
    where
        B: TranslationBackend + ?Sized,
    {
        let api_key = self
            .settings
            .api_key()?
            .ok_or_else(|| anyhow!("No Gemini API key stored"))?;
        backend
            .verify_api_key(&api_key)
            .await
            .map_err(|e| anyhow!("API key check failed: {}", e))
    }
}
