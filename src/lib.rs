//! # figsift
//!
//! Pull the embedded images out of PDF documents, then keep only the ones a
//! vision model judges meaningful.
//!
//! Two independent tools share this library:
//!
//! * **Extractor** (`figsift-extract`): every raster image embedded in a PDF
//!   is written to `<pdf_stem>/imagen_pagina{page}_{index}.{ext}`. JPEG,
//!   JPEG 2000 and JBIG2 streams are copied byte-for-byte; raw pixel samples
//!   are wrapped losslessly as PNG.
//! * **Classifier** (`figsift-classify`): each image in a folder is sent to a
//!   vision model with a yes/no question ("does this depict objects, people or
//!   landscapes, or only geometric/abstract patterns?"). Images answered "yes"
//!   are copied to the output folder.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF ─┬─ 1. Input    check %PDF magic, derive output folder
//!      ├─ 2. Images   walk page resources via lopdf (spawn_blocking)
//!      ├─ 3. Invert   optional colour inversion
//!      └─ 4. Write    atomic temp-file + rename
//!
//! folder ─┬─ 1. Discover  *.jpg / *.jpeg / *.png / *.bmp / *.gif
//!         ├─ 2. Encode    base64 data URL
//!         ├─ 3. Vision    SambaNova Llama 3.2 Vision or any edgequake-llm provider
//!         └─ 4. Route     copy (or move) meaningful images
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use figsift::{classify_folder, extract_document, ClassifyConfig, ExtractConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let extracted = extract_document("report.pdf", &ExtractConfig::default()).await?;
//!     eprintln!("{} images in {}", extracted.files.len(), extracted.output_dir.display());
//!
//!     // Reads SAMBANOVA_API_KEY from the environment.
//!     let config = ClassifyConfig::builder().output_folder("keep").build()?;
//!     let out = classify_folder(&extracted.output_dir, &config).await?;
//!     eprintln!("{} of {} meaningful", out.stats.meaningful, out.stats.processed);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables both binaries (clap + anyhow + indicatif + tracing-subscriber) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod classify;
pub mod config;
pub mod error;
pub mod extract;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use classify::{classify_folder, list_images};
pub use config::{
    ClassifyConfig, ClassifyConfigBuilder, CollisionPolicy, ExtractConfig, ExtractConfigBuilder,
    RouteMode,
};
pub use error::{ItemError, SiftError};
pub use extract::{
    extract_all, extract_document, extract_document_sync, extract_document_with, find_pdfs,
    inspect_document,
};
pub use output::{
    ClassificationOutput, ClassificationResult, ClassificationStats, DocumentInfo, DocumentReport,
    ExtractionOutput, ExtractionStats, ImageOutcome, RouteOutcome,
};
pub use pipeline::images::{ImageSource, LopdfImageSource};
pub use pipeline::vision::{ImageClassifier, ProviderClassifier, SambaNovaClassifier};
pub use progress::{NoopProgressCallback, ProgressCallback, SiftProgressCallback};
pub use prompts::{parse_verdict, Verdict};
