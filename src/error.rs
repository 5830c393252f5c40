//! Error types for the figsift library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`SiftError`]: **fatal**, the run (or one whole document) cannot
//!   proceed at all (missing input, unreadable PDF, missing credential).
//!   Returned as `Err(SiftError)` from the top-level entry points.
//!
//! * [`ItemError`]: **non-fatal**, a single image failed (undecodable
//!   sample layout, transient API error, copy failure) but every other image
//!   is fine. Stored inside [`crate::output::ExtractionOutput`] and
//!   [`crate::output::ImageOutcome`] so callers can inspect partial success.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the figsift library.
#[derive(Debug, Error)]
pub enum SiftError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The path has no usable file stem to name the output folder after.
    #[error("Invalid input '{input}': cannot derive an output folder name")]
    InvalidInput { input: String },

    /// Directory scan found no PDF to work on.
    #[error("No PDF files found in '{dir}'")]
    NoPdfFound { dir: PathBuf },

    /// The file exists and was read, but is not a PDF.
    #[error("File is not a valid PDF: '{path}'\nFirst bytes: {magic:?}")]
    NotAPdf { path: PathBuf, magic: [u8; 4] },

    /// The classifier's input folder does not exist or is not a directory.
    #[error("Input folder does not exist: '{path}'")]
    InputFolderNotFound { path: PathBuf },

    // ── PDF errors ────────────────────────────────────────────────────────
    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("PDF '{path}' is corrupt: {detail}\nTry repairing with: qpdf input.pdf output.pdf")]
    CorruptPdf { path: PathBuf, detail: String },

    /// PDF is encrypted; image streams cannot be read verbatim.
    #[error("PDF '{path}' is encrypted.\nDecrypt it first, e.g. qpdf --decrypt input.pdf output.pdf")]
    EncryptedPdf { path: PathBuf },

    // ── Classifier errors ─────────────────────────────────────────────────
    /// The credential for the default backend is absent.
    #[error("{var} is not set.\nExport it or pass --api-key before classifying.")]
    MissingApiKey { var: String },

    /// A named edgequake-llm provider could not be created.
    #[error("Vision provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// The endpoint rejected the credential (401/403); every later call would fail too.
    #[error("Authentication error from '{provider}': {detail}")]
    AuthError { provider: String, detail: String },

    /// `fail_fast` is on and an image failed.
    #[error("Classification aborted at '{name}': {source}")]
    ClassificationAborted {
        name: String,
        #[source]
        source: ItemError,
    },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create an output directory.
    #[error("Failed to create output directory '{path}': {source}")]
    OutputDirFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Could not write an output file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Could not list a directory.
    #[error("Failed to read directory '{path}': {source}")]
    ReadDirFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal error for a single image.
///
/// Extraction errors carry the 1-based page and index of the image; classifier
/// errors carry the file name.
#[derive(Debug, Clone, PartialEq, Eq, Error, serde::Serialize, serde::Deserialize)]
pub enum ItemError {
    /// The image stream uses an encoding figsift cannot write out.
    #[error("Page {page} image {index}: unsupported image ({reason})")]
    UnsupportedImage {
        page: u32,
        index: usize,
        reason: String,
    },

    /// The image stream could not be decoded or re-encoded.
    #[error("Page {page} image {index}: decode failed: {detail}")]
    DecodeFailed {
        page: u32,
        index: usize,
        detail: String,
    },

    /// Reading an input image failed.
    #[error("Failed to read '{name}': {detail}")]
    ReadFailed { name: String, detail: String },

    /// The request never produced an HTTP response.
    #[error("Request for '{name}' failed: {detail}")]
    RequestFailed { name: String, detail: String },

    /// The endpoint answered with a non-2xx status.
    #[error("API returned HTTP {status} for '{name}': {detail}")]
    ApiStatus {
        name: String,
        status: u16,
        detail: String,
    },

    /// The endpoint rejected the credential.
    #[error("API rejected the credential (HTTP {status}) for '{name}'")]
    Unauthorized { name: String, status: u16 },

    /// The call exceeded the per-call timeout.
    #[error("API call for '{name}' timed out after {secs}s")]
    Timeout { name: String, secs: u64 },

    /// The response had no text to interpret.
    #[error("API returned an empty response for '{name}'")]
    EmptyResponse { name: String },

    /// Copying/moving a meaningful image failed.
    #[error("Failed to route '{name}': {detail}")]
    RouteFailed { name: String, detail: String },
}

impl ItemError {
    /// Short label for the image this error is about: `p{page}#{index}`
    /// for extraction errors, the file name otherwise.
    pub fn item_label(&self) -> String {
        match self {
            Self::UnsupportedImage { page, index, .. } | Self::DecodeFailed { page, index, .. } => {
                format!("p{page}#{index}")
            }
            Self::ReadFailed { name, .. }
            | Self::RequestFailed { name, .. }
            | Self::ApiStatus { name, .. }
            | Self::Unauthorized { name, .. }
            | Self::Timeout { name, .. }
            | Self::EmptyResponse { name }
            | Self::RouteFailed { name, .. } => name.clone(),
        }
    }
}
