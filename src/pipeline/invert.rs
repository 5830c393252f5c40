//! Optional colour inversion of an extracted image.
//!
//! Some scanned PDFs store figures as negatives. Inversion decodes the image,
//! flips every colour channel (alpha is kept), and re-encodes it in the same
//! container: JPEG at quality 95, PNG losslessly.

use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageFormat};
use std::io::Cursor;
use tracing::debug;

/// Quality used when re-encoding an inverted JPEG.
pub const JPEG_QUALITY: u8 = 95;

/// Invert `bytes`, an image in the container named by `ext`.
///
/// Returns an error message for containers that cannot be decoded here
/// (JPEG 2000); callers write those unchanged.
pub fn invert_colors(bytes: &[u8], ext: &str) -> Result<Vec<u8>, String> {
    let format = match ext {
        "jpg" | "jpeg" => ImageFormat::Jpeg,
        "png" => ImageFormat::Png,
        other => return Err(format!("cannot invert .{other} images")),
    };

    let mut img = image::load_from_memory_with_format(bytes, format)
        .map_err(|e| format!("decode failed: {e}"))?;
    img.invert();

    let mut buf = Vec::new();
    match format {
        ImageFormat::Jpeg => {
            // JPEG has no alpha channel.
            let img = if img.color().has_alpha() {
                DynamicImage::ImageRgb8(img.to_rgb8())
            } else {
                img
            };
            let encoder = JpegEncoder::new_with_quality(&mut buf, JPEG_QUALITY);
            img.write_with_encoder(encoder)
                .map_err(|e| format!("JPEG encode failed: {e}"))?;
        }
        _ => {
            img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
                .map_err(|e| format!("PNG encode failed: {e}"))?;
        }
    }

    debug!("Inverted {} image: {} → {} bytes", ext, bytes.len(), buf.len());
    Ok(buf)
}
