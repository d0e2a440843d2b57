//! Turning command-line input into upload sources.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use pdfchat_core::UploadSource;

/// File name used when a path has none.
const FALLBACK_NAME: &str = "document.pdf";

/// Expand ~ to home directory in a path.
#[must_use]
pub fn expand_tilde(path: &Path) -> PathBuf {
    if let Ok(stripped) = path.strip_prefix("~") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    path.to_path_buf()
}

/// Whether `bytes` start with the PDF magic header.
#[must_use]
pub fn is_pdf(bytes: &[u8]) -> bool {
    bytes.starts_with(b"%PDF")
}

/// Reads a local PDF into an upload source.
///
/// # Errors
///
/// Fails if the file cannot be read or is not a PDF.
pub async fn file_source(path: &Path) -> Result<UploadSource> {
    let path = expand_tilde(path);
    let bytes = tokio::fs::read(&path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;
    if !is_pdf(&bytes) {
        bail!("{} is not a PDF file", path.display());
    }
    let name = path
        .file_name()
        .map_or_else(|| FALLBACK_NAME.to_owned(), |name| name.to_string_lossy().into_owned());
    Ok(UploadSource::File { name, bytes })
}

/// Validates a link before handing it to the backend.
///
/// # Errors
///
/// Fails unless `link` is an absolute http(s) URL.
pub fn link_source(link: &str) -> Result<UploadSource> {
    let link = link.trim();
    if !(link.starts_with("http://") || link.starts_with("https://")) {
        bail!("expected an http(s) link, got {link:?}");
    }
    Ok(UploadSource::Url(link.to_owned()))
}
