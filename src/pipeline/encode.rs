//! Image encoding for the vision request body.
//!
//! OpenAI-compatible endpoints take images as base64 `data:` URLs embedded
//! in the JSON body; edgequake-llm providers take an [`ImageData`]. Either
//! way the file bytes are sent as-is, with no re-compression.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use edgequake_llm::ImageData;
use tracing::debug;

/// Base64 of the raw file bytes.
pub fn encode_base64(bytes: &[u8]) -> String {
    let b64 = STANDARD.encode(bytes);
    debug!("Encoded image → {} bytes base64", b64.len());
    b64
}

/// `data:<mime>;base64,<payload>` URL for an image.
pub fn data_url(bytes: &[u8], mime: &str) -> String {
    format!("data:{mime};base64,{}", encode_base64(bytes))
}

/// The same payload wrapped for an edgequake-llm provider.
pub fn image_data(bytes: &[u8], mime: &str) -> ImageData {
    ImageData::new(encode_base64(bytes), mime)
}
