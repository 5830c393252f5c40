//! Pipeline stages for the extractor and the classifier.
//!
//! Each submodule implements exactly one step so each is testable on its own
//! and the two external boundaries (PDF parsing, the vision API) can be
//! swapped for stubs.
//!
//! ## Data Flow
//!
//! ```text
//! extractor:   input ──▶ images ──▶ (invert) ──▶ write
//!              (%PDF)    (lopdf)     (image)
//!
//! classifier:  discover ──▶ encode ──▶ vision ──▶ route
//!              (*.jpg…)     (base64)   (VLM)      (copy/move)
//! ```
//!
//! 1. [`input`]    validate a PDF path and derive its output folder
//! 2. [`images`]   enumerate image XObjects page by page; the only stage
//!    that understands PDF internals
//! 3. [`invert`]   optional colour inversion of an extracted image
//! 4. [`discover`] list PDFs / image files in a directory
//! 5. [`encode`]   base64 data URLs for the multimodal request body
//! 6. [`vision`]   the classifier boundary; the only stage with network I/O
//! 7. [`route`]    copy or move a meaningful image under a collision policy

pub mod discover;
pub mod encode;
pub mod images;
pub mod input;
pub mod invert;
pub mod route;
pub mod vision;
