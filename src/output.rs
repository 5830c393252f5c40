//! Result types returned by the extraction and classification entry points.
//!
//! Everything here is `Serialize` so the binaries can emit it with `--json`.

use crate::error::ItemError;
use crate::prompts::Verdict;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

// ── Extraction ───────────────────────────────────────────────────────────

/// How the bytes of an extracted image were obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImageEncoding {
    /// The embedded stream (JPEG, JPEG 2000, JBIG2) written verbatim.
    Passthrough,
    /// Raw pixel samples wrapped losslessly as PNG.
    Png,
}

/// One embedded image pulled out of a PDF, before it is written.
#[derive(Debug, Clone)]
pub struct ExtractedImage {
    /// 1-based page number.
    pub page: u32,
    /// 1-based position among the images of that page.
    pub index: usize,
    /// PDF object number of the image XObject.
    pub object_id: u32,
    /// File extension without the dot (`jpg`, `jp2`, `j2k`, `jb2`, `png`).
    pub ext: &'static str,
    pub encoding: ImageEncoding,
    pub bytes: Vec<u8>,
}

impl ExtractedImage {
    /// Deterministic output name: `imagen_pagina{page}_{index}.{ext}`.
    pub fn file_name(&self) -> String {
        format!("imagen_pagina{}_{}.{}", self.page, self.index, self.ext)
    }
}

/// Everything an [`crate::pipeline::images::ImageSource`] found in one PDF.
#[derive(Debug, Clone, Default)]
pub struct DocumentImages {
    pub page_count: usize,
    pub images: Vec<ExtractedImage>,
    /// Images that were found but could not be turned into a file.
    pub skipped: Vec<ItemError>,
}

/// A file written by the extractor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedFile {
    pub page: u32,
    pub index: usize,
    pub path: PathBuf,
    pub bytes: usize,
    pub encoding: ImageEncoding,
    pub inverted: bool,
}

/// Summary of one image as reported by [`crate::extract::inspect_document`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageSummary {
    pub page: u32,
    pub index: usize,
    pub object_id: u32,
    pub width: i64,
    pub height: i64,
    pub filters: Vec<String>,
    /// Extension the image would be written with, if it is supported.
    pub ext: Option<String>,
}

/// Result of [`crate::extract::inspect_document`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentInfo {
    pub path: PathBuf,
    pub page_count: usize,
    pub images: Vec<ImageSummary>,
}

/// Counters for one extracted document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractionStats {
    pub page_count: usize,
    pub images_found: usize,
    pub images_written: usize,
    pub images_skipped: usize,
    pub duration_ms: u64,
}

/// Result of extracting one PDF.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionOutput {
    pub source: PathBuf,
    pub output_dir: PathBuf,
    pub files: Vec<ExtractedFile>,
    pub errors: Vec<ItemError>,
    pub stats: ExtractionStats,
}

/// Per-document outcome of [`crate::extract::extract_all`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentReport {
    pub source: PathBuf,
    /// Present when the document was extracted.
    pub output: Option<ExtractionOutput>,
    /// Present when the document failed as a whole.
    pub error: Option<String>,
}

// ── Classification ───────────────────────────────────────────────────────

/// What a classifier made of one image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub verdict: Verdict,
    /// The model's answer as received (trimmed).
    pub response: String,
}

impl ClassificationResult {
    pub fn is_meaningful(&self) -> bool {
        self.verdict.is_meaningful()
    }
}

/// Where a meaningful image ended up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RouteOutcome {
    Copied(PathBuf),
    Moved(PathBuf),
    /// The destination existed and the collision policy said to keep it.
    SkippedExisting(PathBuf),
}

/// Outcome for one input image.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageOutcome {
    pub name: String,
    pub source: PathBuf,
    pub result: Option<ClassificationResult>,
    /// Set only for meaningful images.
    pub routed: Option<RouteOutcome>,
    pub error: Option<ItemError>,
    pub duration_ms: u64,
}

/// Counters for one classification run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClassificationStats {
    pub processed: usize,
    pub meaningful: usize,
    /// Subset of `meaningful` left out because the destination already
    /// existed under [`crate::CollisionPolicy::Skip`].
    #[serde(default)]
    pub skipped_existing: usize,
    pub discarded: usize,
    /// Subset of `discarded` whose answer matched no keyword.
    pub ambiguous: usize,
    pub failed: usize,
    pub total_duration_ms: u64,
}

/// Result of [`crate::classify::classify_folder`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassificationOutput {
    pub input_folder: PathBuf,
    pub output_folder: PathBuf,
    pub images: Vec<ImageOutcome>,
    pub stats: ClassificationStats,
}
