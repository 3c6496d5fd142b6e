//! Guideline document loaders.
//!
//! A loader turns a file on disk into ordered page-level [`Document`]s. Page
//! boundaries are form feeds (`\x0c`), which is how `pdftotext` separates pages
//! and how plain-text guideline exports mark them.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{debug, error, info};

use crate::document::{Document, META_PAGE, META_SOURCE, META_TOTAL_PAGES};
use crate::error::{RagError, Result};

const PAGE_BREAK: char = '\x0c';

/// Loads a document from a path into ordered page units.
#[async_trait]
pub trait DocumentLoader: Send + Sync {
    /// Load the document at `path`.
    ///
    /// Missing, unreadable or text-less files fail with [`RagError::LoadError`].
    async fn load(&self, path: &Path) -> Result<Vec<Document>>;
}

/// Loads UTF-8 text files, splitting pages on form feeds.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextLoader;

#[async_trait]
impl DocumentLoader for TextLoader {
    async fn load(&self, path: &Path) -> Result<Vec<Document>> {
        let text = tokio::fs::read_to_string(path).await.map_err(|e| {
            error!(path = %path.display(), error = %e, "failed to read document");
            load_error(path, format!("failed to read file: {e}"))
        })?;
        let pages = pages_from_text(path, &text)?;
        info!(path = %path.display(), page_count = pages.len(), "loaded text document");
        Ok(pages)
    }
}

/// Loads PDF files by running poppler's `pdftotext`.
#[derive(Debug, Clone)]
pub struct PdfLoader {
    binary: PathBuf,
}

impl Default for PdfLoader {
    fn default() -> Self {
        Self { binary: PathBuf::from("pdftotext") }
    }
}

impl PdfLoader {
    /// Use a specific `pdftotext` executable.
    pub fn with_binary(binary: impl Into<PathBuf>) -> Self {
        Self { binary: binary.into() }
    }
}

#[async_trait]
impl DocumentLoader for PdfLoader {
    async fn load(&self, path: &Path) -> Result<Vec<Document>> {
        if !tokio::fs::try_exists(path).await.unwrap_or(false) {
            return Err(load_error(path, "file does not exist"));
        }

        debug!(path = %path.display(), binary = %self.binary.display(), "extracting PDF text");
        let output = tokio::process::Command::new(&self.binary)
            .arg("-layout")
            .arg(path)
            .arg("-")
            .output()
            .await
            .map_err(|e| {
                error!(error = %e, "failed to run pdftotext");
                load_error(path, format!("pdftotext command failed: {e} (is poppler installed?)"))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            error!(path = %path.display(), status = %output.status, "pdftotext failed");
            return Err(load_error(path, format!("pdftotext failed: {}", stderr.trim())));
        }

        let text = String::from_utf8_lossy(&output.stdout);
        let pages = pages_from_text(path, &text)?;
        info!(path = %path.display(), page_count = pages.len(), "loaded PDF document");
        Ok(pages)
    }
}

/// Pick a loader from the file extension. Unknown extensions are read as text.
pub fn loader_for_path(path: &Path) -> Box<dyn DocumentLoader> {
    let is_pdf = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));
    if is_pdf { Box::new(PdfLoader::default()) } else { Box::new(TextLoader) }
}

/// Split extracted text into page documents on form feeds.
///
/// A trailing form feed (as `pdftotext` emits) does not produce an extra page.
pub fn pages_from_text(path: &Path, text: &str) -> Result<Vec<Document>> {
    if text.trim().is_empty() {
        return Err(load_error(path, "document contains no extractable text"));
    }

    let mut raw_pages: Vec<&str> = text.split(PAGE_BREAK).collect();
    if raw_pages.len() > 1 && raw_pages.last().is_some_and(|p| p.trim().is_empty()) {
        raw_pages.pop();
    }

    let source = path.display().to_string();
    let name = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
    let total = raw_pages.len().to_string();

    Ok(raw_pages
        .into_iter()
        .enumerate()
        .map(|(page, content)| {
            Document::new(format!("{name}#{page}"), content)
                .with_metadata(META_SOURCE, source.clone())
                .with_metadata(META_PAGE, page.to_string())
                .with_metadata(META_TOTAL_PAGES, total.clone())
        })
        .collect())
}

fn load_error(path: &Path, message: impl Into<String>) -> RagError {
    RagError::LoadError { path: path.to_path_buf(), message: message.into() }
}
