//! Directory scans: PDFs for the extractor, image files for the classifier.
//!
//! Both scans look at the directory's immediate entries only and return
//! paths sorted by file name so runs are reproducible.

use crate::error::{ItemError, SiftError};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Extensions (lower-case, no dot) the classifier picks up.
pub const VALID_IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "gif"];

/// An input image, read once for classification.
#[derive(Debug, Clone)]
pub struct ImageFile {
    pub path: PathBuf,
    pub name: String,
    pub mime: &'static str,
    pub bytes: Vec<u8>,
}

impl ImageFile {
    /// Read `path` into memory.
    pub async fn read(path: &Path) -> Result<Self, ItemError> {
        let name = file_name(path);
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| ItemError::ReadFailed {
                name: name.clone(),
                detail: e.to_string(),
            })?;
        Ok(Self {
            path: path.to_path_buf(),
            mime: mime_for(path),
            name,
            bytes,
        })
    }
}

/// Lossy file name of `path`, or the whole path when it has none.
pub fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// MIME type for an image path, by extension.
pub fn mime_for(path: &Path) -> &'static str {
    match lower_ext(path).as_deref() {
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("bmp") => "image/bmp",
        _ => "image/jpeg",
    }
}

/// Every `*.pdf` (any case) directly inside `dir`.
pub fn find_pdfs(dir: &Path) -> Result<Vec<PathBuf>, SiftError> {
    let found = files_with_extension(dir, |ext| ext == "pdf")?;
    debug!("Found {} PDF(s) in {}", found.len(), dir.display());
    Ok(found)
}

/// Every classifiable image directly inside `folder`.
pub fn list_images(folder: &Path) -> Result<Vec<PathBuf>, SiftError> {
    let found = files_with_extension(folder, |ext| VALID_IMAGE_EXTENSIONS.contains(&ext))?;
    debug!("Found {} image(s) in {}", found.len(), folder.display());
    Ok(found)
}

fn files_with_extension(
    dir: &Path,
    keep: impl Fn(&str) -> bool,
) -> Result<Vec<PathBuf>, SiftError> {
    let entries = std::fs::read_dir(dir).map_err(|e| SiftError::ReadDirFailed {
        path: dir.to_path_buf(),
        source: e,
    })?;

    let mut found: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|p| p.is_file())
        .filter(|p| lower_ext(p).is_some_and(|ext| keep(ext.as_str())))
        .collect();
    found.sort_by_key(|p| p.file_name().map(|n| n.to_os_string()));
    Ok(found)
}

fn lower_ext(path: &Path) -> Option<String> {
    path.extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
}
