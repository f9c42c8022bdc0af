/*!
 * Common test utilities for the dynrtl test suite
 */

use anyhow::Result;
use parking_lot::Mutex;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tempfile::TempDir;

use dynrtl::dom::{Document, NodeId};
use dynrtl::scheduler::Clock;

// Re-export the mock providers module
pub mod mock_providers;

/// A Persian paragraph long enough to be marked but never translated
pub const PERSIAN_PARAGRAPH: &str = "این یک پاراگراف فارسی برای آزمایش جهت نوشتار است";

/// An English paragraph long enough to be translated
pub const ENGLISH_PARAGRAPH: &str = "This English paragraph has more than enough words to be translated";

/// Creates a temporary directory for test files
pub fn create_temp_dir() -> Result<TempDir> {
    Ok(TempDir::new()?)
}

/// Creates a test file with the given content in the specified directory
pub fn create_test_file(dir: &Path, filename: &str, content: &str) -> Result<PathBuf> {
    let file_path = dir.join(filename);
    fs::write(&file_path, content)?;
    Ok(file_path)
}

/// Page with one Persian and one English paragraph
pub fn mixed_page(lang: &str) -> String {
    format!(
        "<!DOCTYPE html><html lang=\"{}\"><head><title>Test</title></head><body>\
         <p id=\"fa\">{}</p><p id=\"en\">{}</p></body></html>",
        lang, PERSIAN_PARAGRAPH, ENGLISH_PARAGRAPH
    )
}

/// Page with `count` English paragraphs and no ids
pub fn english_page(count: usize) -> String {
    let paragraphs: String = (0..count)
        .map(|i| format!("<p>{} number {}</p>", ENGLISH_PARAGRAPH, i))
        .collect();
    format!("<html><head></head><body>{}</body></html>", paragraphs)
}

/// Element with the given id, panicking when missing
pub fn by_id(doc: &Document, id: &str) -> NodeId {
    doc.get_element_by_id(id)
        .unwrap_or_else(|| panic!("element #{} should exist", id))
}

/// Clock that only moves when advanced
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<Instant>,
}

impl ManualClock {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            now: Mutex::new(Instant::now()),
        })
    }

    pub fn advance(&self, by: Duration) {
        *self.now.lock() += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        *self.now.lock()
    }
}
