//! Input resolution: validate a PDF path and derive its output folder.
//!
//! We check existence, read permission and the `%PDF` magic bytes before
//! handing the file to the parser so callers get a meaningful error rather
//! than a generic parse failure.

use crate::error::SiftError;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Validate that `path` is a readable PDF.
pub fn resolve_pdf(path: &Path) -> Result<PathBuf, SiftError> {
    let path = path.to_path_buf();

    if !path.is_file() {
        return Err(SiftError::FileNotFound { path });
    }

    match std::fs::File::open(&path) {
        Ok(mut f) => {
            let mut magic = [0u8; 4];
            if f.read_exact(&mut magic).is_ok() && &magic != b"%PDF" {
                return Err(SiftError::NotAPdf { path, magic });
            }
        }
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(SiftError::PermissionDenied { path });
        }
        Err(_) => {
            return Err(SiftError::FileNotFound { path });
        }
    }

    debug!("Resolved local PDF: {}", path.display());
    Ok(path)
}

/// `<output_root>/<pdf stem>`: the folder a document's images go into.
pub fn output_dir_for(pdf: &Path, output_root: &Path) -> Result<PathBuf, SiftError> {
    let stem = pdf
        .file_stem()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| SiftError::InvalidInput {
            input: pdf.display().to_string(),
        })?;
    Ok(output_root.join(stem))
}
