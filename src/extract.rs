//! Extraction entry points: PDF → folder of embedded images.
//!
//! PDF parsing is CPU-bound and synchronous, so each document is handled
//! inside `tokio::task::spawn_blocking`. Documents are processed one after
//! another; images within a document are written in page order.

use crate::config::ExtractConfig;
use crate::error::SiftError;
use crate::output::{
    DocumentInfo, DocumentReport, ExtractedFile, ExtractedImage, ExtractionOutput, ExtractionStats,
};
use crate::pipeline::images::{self, ImageSource, LopdfImageSource};
use crate::pipeline::{input, invert};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

pub use crate::pipeline::discover::find_pdfs;

/// Extract every embedded image of one PDF into `<output_root>/<pdf_stem>/`.
///
/// # Returns
/// `Ok(ExtractionOutput)` when the document was parsed, even if some images
/// could not be written out (see `output.errors`). A document without images
/// yields an empty, created folder.
///
/// # Errors
/// Fatal errors only: missing file, not a PDF, corrupt or encrypted PDF, or
/// an output folder/file that cannot be written.
pub async fn extract_document(
    pdf: impl AsRef<Path>,
    config: &ExtractConfig,
) -> Result<ExtractionOutput, SiftError> {
    extract_document_with(pdf, config, Arc::new(LopdfImageSource)).await
}

/// [`extract_document`] with a caller-supplied [`ImageSource`].
pub async fn extract_document_with(
    pdf: impl AsRef<Path>,
    config: &ExtractConfig,
    source: Arc<dyn ImageSource>,
) -> Result<ExtractionOutput, SiftError> {
    let pdf = pdf.as_ref().to_path_buf();
    let config = config.clone();
    tokio::task::spawn_blocking(move || extract_blocking(&pdf, &config, source.as_ref()))
        .await
        .map_err(|e| SiftError::Internal(format!("Extraction task panicked: {e}")))?
}

/// Synchronous wrapper around [`extract_document`].
///
/// Creates a temporary tokio runtime internally.
pub fn extract_document_sync(
    pdf: impl AsRef<Path>,
    config: &ExtractConfig,
) -> Result<ExtractionOutput, SiftError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| SiftError::Internal(format!("Failed to create tokio runtime: {e}")))?
        .block_on(extract_document(pdf, config))
}

/// Extract each PDF in order.
///
/// A document that fails is reported and the next one is still processed.
pub async fn extract_all(pdfs: &[PathBuf], config: &ExtractConfig) -> Vec<DocumentReport> {
    let mut reports = Vec::with_capacity(pdfs.len());
    for pdf in pdfs {
        let report = match extract_document(pdf, config).await {
            Ok(output) => DocumentReport {
                source: pdf.clone(),
                output: Some(output),
                error: None,
            },
            Err(e) => {
                error!("{}: {}", pdf.display(), e);
                DocumentReport {
                    source: pdf.clone(),
                    output: None,
                    error: Some(e.to_string()),
                }
            }
        };
        reports.push(report);
    }
    reports
}

/// Page count and image summary of a PDF. Writes nothing.
pub async fn inspect_document(pdf: impl AsRef<Path>) -> Result<DocumentInfo, SiftError> {
    let pdf = pdf.as_ref().to_path_buf();
    tokio::task::spawn_blocking(move || {
        let path = input::resolve_pdf(&pdf)?;
        let doc = images::load_document(&path)?;
        Ok(DocumentInfo {
            page_count: doc.get_pages().len(),
            images: images::summarise_document(&doc),
            path,
        })
    })
    .await
    .map_err(|e| SiftError::Internal(format!("Inspect task panicked: {e}")))?
}

fn extract_blocking(
    pdf: &Path,
    config: &ExtractConfig,
    source: &dyn ImageSource,
) -> Result<ExtractionOutput, SiftError> {
    let start = Instant::now();
    info!("Extracting images from {}", pdf.display());

    // ── Step 1: Validate input and name the output folder ────────────────
    let pdf = input::resolve_pdf(pdf)?;
    let output_dir = input::output_dir_for(&pdf, &config.output_root)?;

    // ── Step 2: Enumerate images ─────────────────────────────────────────
    // Parse before creating the folder so a corrupt PDF leaves nothing behind.
    let found = source.extract(&pdf)?;

    // ── Step 3: Create the output folder ─────────────────────────────────
    std::fs::create_dir_all(&output_dir).map_err(|e| SiftError::OutputDirFailed {
        path: output_dir.clone(),
        source: e,
    })?;

    // ── Step 4: Write images ─────────────────────────────────────────────
    let written_total = found.images.len();
    let total = written_total + found.skipped.len();
    let cb = config.progress_callback.as_ref();
    if let Some(cb) = cb {
        cb.on_run_start(total);
    }

    let mut files = Vec::with_capacity(written_total);
    for (i, image) in found.images.into_iter().enumerate() {
        let item = i + 1;
        let name = image.file_name();
        if let Some(cb) = cb {
            cb.on_item_start(item, total, &name);
        }

        let ExtractedImage {
            page,
            index,
            ext,
            encoding,
            bytes,
            ..
        } = image;
        let (bytes, inverted) = if config.invert_colors {
            match invert::invert_colors(&bytes, ext) {
                Ok(inv) => (inv, true),
                Err(e) => {
                    warn!("{}: written without inversion ({})", name, e);
                    (bytes, false)
                }
            }
        } else {
            (bytes, false)
        };

        let path = output_dir.join(&name);
        if let Err(e) = write_atomic(&output_dir, &path, &bytes) {
            if let Some(cb) = cb {
                cb.on_item_error(item, total, &name, &e.to_string());
            }
            return Err(e);
        }
        debug!("Wrote {} ({} bytes)", path.display(), bytes.len());
        if let Some(cb) = cb {
            cb.on_item_complete(item, total, &name, ext);
        }

        files.push(ExtractedFile {
            page,
            index,
            path,
            bytes: bytes.len(),
            encoding,
            inverted,
        });
    }

    for (i, err) in found.skipped.iter().enumerate() {
        if let Some(cb) = cb {
            cb.on_item_error(written_total + i + 1, total, &err.item_label(), &err.to_string());
        }
    }

    let stats = ExtractionStats {
        page_count: found.page_count,
        images_found: total,
        images_written: files.len(),
        images_skipped: found.skipped.len(),
        duration_ms: start.elapsed().as_millis() as u64,
    };

    info!(
        "{}: wrote {}/{} images to {} in {}ms",
        pdf.display(),
        stats.images_written,
        stats.images_found,
        output_dir.display(),
        stats.duration_ms
    );

    if let Some(cb) = cb {
        cb.on_run_complete(total, files.len());
    }

    Ok(ExtractionOutput {
        source: pdf,
        output_dir,
        files,
        errors: found.skipped,
        stats,
    })
}

/// Write `bytes` to `path` via a temp file in `dir`, so readers never see a
/// partial image.
fn write_atomic(dir: &Path, path: &Path, bytes: &[u8]) -> Result<(), SiftError> {
    let fail = |source: std::io::Error| SiftError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };
    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(fail)?;
    tmp.write_all(bytes).map_err(fail)?;
    tmp.persist(path).map_err(|e| fail(e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ItemError;
    use crate::output::{DocumentImages, ImageEncoding};
    use crate::progress::SiftProgressCallback;

    /// Fixed set of images regardless of the file.
    struct FixedSource(DocumentImages);

    impl ImageSource for FixedSource {
        fn extract(&self, _path: &Path) -> Result<DocumentImages, SiftError> {
            Ok(self.0.clone())
        }
    }

    fn fake_pdf(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, b"%PDF-1.5\n%stub\n").unwrap();
        path
    }

    fn blob(page: u32, index: usize, ext: &'static str, bytes: &[u8]) -> ExtractedImage {
        ExtractedImage {
            page,
            index,
            object_id: 10 + index as u32,
            ext,
            encoding: ImageEncoding::Passthrough,
            bytes: bytes.to_vec(),
        }
    }

    #[tokio::test]
    async fn writes_each_image_verbatim() {
        let tmp = tempfile::tempdir().unwrap();
        let pdf = fake_pdf(tmp.path(), "report.pdf");
        let source = FixedSource(DocumentImages {
            page_count: 2,
            images: vec![blob(1, 1, "jpg", b"\xFF\xD8one"), blob(2, 1, "jpg", b"\xFF\xD8two")],
            skipped: vec![],
        });
        let config = ExtractConfig::builder()
            .output_root(tmp.path())
            .build()
            .unwrap();

        let out = extract_document_with(&pdf, &config, Arc::new(source))
            .await
            .unwrap();
        assert_eq!(out.output_dir, tmp.path().join("report"));
        assert_eq!(out.stats.images_written, 2);
        assert_eq!(
            std::fs::read(out.output_dir.join("imagen_pagina2_1.jpg")).unwrap(),
            b"\xFF\xD8two"
        );
    }

    #[derive(Default)]
    struct ErrorLabels(std::sync::Mutex<Vec<String>>);

    impl SiftProgressCallback for ErrorLabels {
        fn on_item_error(&self, _item: usize, _total: usize, name: &str, _error: &str) {
            self.0.lock().unwrap().push(name.to_string());
        }
    }

    #[tokio::test]
    async fn skipped_images_are_reported() {
        let tmp = tempfile::tempdir().unwrap();
        let pdf = fake_pdf(tmp.path(), "scan.pdf");
        let source = FixedSource(DocumentImages {
            page_count: 1,
            images: vec![blob(1, 2, "png", b"png")],
            skipped: vec![ItemError::UnsupportedImage {
                page: 1,
                index: 1,
                reason: "CCITTFaxDecode".into(),
            }],
        });
        let errors = Arc::new(ErrorLabels::default());
        let config = ExtractConfig::builder()
            .output_root(tmp.path())
            .progress_callback(errors.clone())
            .build()
            .unwrap();

        let out = extract_document_with(&pdf, &config, Arc::new(source))
            .await
            .unwrap();
        assert_eq!(*errors.0.lock().unwrap(), vec!["p1#1".to_string()]);
        assert_eq!(out.stats.images_found, 2);
        assert_eq!(out.stats.images_skipped, 1);
        assert_eq!(out.errors.len(), 1);
        assert!(out.output_dir.join("imagen_pagina1_2.png").exists());
    }

    #[tokio::test]
    async fn undecodable_inversion_falls_back_to_original() {
        let tmp = tempfile::tempdir().unwrap();
        let pdf = fake_pdf(tmp.path(), "neg.pdf");
        let source = FixedSource(DocumentImages {
            page_count: 1,
            images: vec![blob(1, 1, "jp2", b"jp2 bytes")],
            skipped: vec![],
        });
        let config = ExtractConfig::builder()
            .output_root(tmp.path())
            .invert_colors(true)
            .build()
            .unwrap();

        let out = extract_document_with(&pdf, &config, Arc::new(source))
            .await
            .unwrap();
        assert!(!out.files[0].inverted);
        assert_eq!(std::fs::read(&out.files[0].path).unwrap(), b"jp2 bytes");
    }

    #[tokio::test]
    async fn missing_pdf_creates_nothing() {
        let tmp = tempfile::tempdir().unwrap();
        let config = ExtractConfig::builder()
            .output_root(tmp.path())
            .build()
            .unwrap();
        let err = extract_document(tmp.path().join("ghost.pdf"), &config)
            .await
            .unwrap_err();
        assert!(matches!(err, SiftError::FileNotFound { .. }));
        assert!(!tmp.path().join("ghost").exists());
    }

    #[tokio::test]
    async fn extract_all_continues_after_failure() {
        let tmp = tempfile::tempdir().unwrap();
        let bad = tmp.path().join("missing.pdf");
        let also_bad = tmp.path().join("fake.pdf");
        std::fs::write(&also_bad, b"not a pdf").unwrap();
        let config = ExtractConfig::builder()
            .output_root(tmp.path())
            .build()
            .unwrap();

        let reports = extract_all(&[bad, also_bad], &config).await;
        assert_eq!(reports.len(), 2);
        assert!(reports.iter().all(|r| r.output.is_none() && r.error.is_some()));
    }

    #[test]
    fn write_atomic_replaces_existing() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("x.png");
        std::fs::write(&path, b"old").unwrap();
        write_atomic(tmp.path(), &path, b"new").unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"new");
    }
}
