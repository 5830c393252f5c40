//! Embedded-image enumeration: PDF → per-page image blobs via lopdf.
//!
//! ## Why lopdf and not a renderer?
//!
//! Rendering backends hand back decoded bitmaps. To keep JPEG / JPEG 2000
//! streams byte-identical we need the raw stream bytes, which lopdf exposes
//! directly on each `Stream` object.
//!
//! ## What counts as an image
//!
//! Every `/Subtype /Image` XObject reachable from a page's `/Resources`
//! (inherited from ancestor `/Pages` nodes when the page has none), including
//! those nested in Form XObjects. Each distinct object is listed once per
//! page. Inline images (`BI … EI`) are not XObjects and are not listed.
//!
//! ## Output encodings
//!
//! | Stream filter (last)              | Written as             |
//! |-----------------------------------|------------------------|
//! | `DCTDecode`                       | `.jpg`, verbatim       |
//! | `JPXDecode`                       | `.jp2` / `.j2k`, verbatim |
//! | `JBIG2Decode`                     | `.jb2`, verbatim (page stream only) |
//! | `FlateDecode`, `LZWDecode`, none  | `.png`, samples wrapped losslessly |
//! | anything else                     | skipped ([`ItemError::UnsupportedImage`]) |

use crate::error::{ItemError, SiftError};
use crate::output::{DocumentImages, ExtractedImage, ImageEncoding, ImageSummary};
use flate2::read::ZlibDecoder;
use image::{DynamicImage, GrayImage, RgbImage};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use std::collections::HashSet;
use std::io::{Cursor, Read};
use std::path::Path;
use tracing::{debug, info, warn};

/// Reference chains and page-tree walks longer than this are treated as broken.
const MAX_DEPTH: usize = 32;

/// Images above this many pixels are skipped rather than expanded in memory.
const MAX_PIXELS: u64 = 200_000_000;

/// Source of the embedded images of one PDF.
///
/// The production implementation is [`LopdfImageSource`]; tests substitute
/// their own.
pub trait ImageSource: Send + Sync {
    /// Enumerate every embedded image of the document at `path`.
    fn extract(&self, path: &Path) -> Result<DocumentImages, SiftError>;
}

/// [`ImageSource`] backed by lopdf.
#[derive(Debug, Clone, Copy, Default)]
pub struct LopdfImageSource;

impl ImageSource for LopdfImageSource {
    fn extract(&self, path: &Path) -> Result<DocumentImages, SiftError> {
        let doc = load_document(path)?;
        let images = images_in_document(&doc);
        info!(
            "{}: {} pages, {} images, {} skipped",
            path.display(),
            images.page_count,
            images.images.len(),
            images.skipped.len()
        );
        Ok(images)
    }
}

/// Parse a PDF, mapping lopdf failures to [`SiftError`].
pub fn load_document(path: &Path) -> Result<Document, SiftError> {
    Document::load(path).map_err(|e| {
        let detail = e.to_string();
        let lower = detail.to_ascii_lowercase();
        if lower.contains("encrypt") || lower.contains("decrypt") || lower.contains("password") {
            SiftError::EncryptedPdf {
                path: path.to_path_buf(),
            }
        } else {
            SiftError::CorruptPdf {
                path: path.to_path_buf(),
                detail,
            }
        }
    })
}

/// Extract every image of an already-parsed document.
pub fn images_in_document(doc: &Document) -> DocumentImages {
    let pages = doc.get_pages();
    let mut out = DocumentImages {
        page_count: pages.len(),
        ..Default::default()
    };

    for (&page_num, &page_id) in &pages {
        for (i, image_id) in page_image_ids(doc, page_id).into_iter().enumerate() {
            let index = i + 1;
            let Ok(Object::Stream(stream)) = doc.get_object(image_id) else {
                continue;
            };
            match decode_image(doc, stream, page_num, index) {
                Ok((ext, encoding, bytes)) => {
                    debug!(
                        "Page {} image {} (obj {}): {} bytes as {}",
                        page_num,
                        index,
                        image_id.0,
                        bytes.len(),
                        ext
                    );
                    out.images.push(ExtractedImage {
                        page: page_num,
                        index,
                        object_id: image_id.0,
                        ext,
                        encoding,
                        bytes,
                    });
                }
                Err(e) => {
                    warn!("{}", e);
                    out.skipped.push(e);
                }
            }
        }
    }

    out
}

/// Describe every image of a document without decoding any samples.
pub fn summarise_document(doc: &Document) -> Vec<ImageSummary> {
    let mut summaries = Vec::new();
    for (&page_num, &page_id) in &doc.get_pages() {
        for (i, image_id) in page_image_ids(doc, page_id).into_iter().enumerate() {
            let Ok(Object::Stream(stream)) = doc.get_object(image_id) else {
                continue;
            };
            let dict = &stream.dict;
            let filters = stream_filters(doc, dict);
            summaries.push(ImageSummary {
                page: page_num,
                index: i + 1,
                object_id: image_id.0,
                width: dict_int(doc, dict, b"Width").unwrap_or(0),
                height: dict_int(doc, dict, b"Height").unwrap_or(0),
                ext: predicted_ext(&filters).map(str::to_string),
                filters,
            });
        }
    }
    summaries
}

fn predicted_ext(filters: &[String]) -> Option<&'static str> {
    match filters.last().map(String::as_str) {
        Some("DCTDecode") | Some("DCT") => Some("jpg"),
        Some("JPXDecode") => Some("jp2"),
        Some("JBIG2Decode") => Some("jb2"),
        None | Some("FlateDecode") | Some("Fl") | Some("LZWDecode") | Some("LZW") => Some("png"),
        _ => None,
    }
}

// ── Page tree walking ────────────────────────────────────────────────────

/// Image XObject ids used by a page, in resource-dictionary order, deduplicated.
fn page_image_ids(doc: &Document, page_id: ObjectId) -> Vec<ObjectId> {
    let mut ids = Vec::new();
    if let Some(resources) = inherited_resources(doc, page_id) {
        let mut visited_forms = HashSet::new();
        collect_images(doc, resources, &mut visited_forms, &mut ids, 0);
    }
    ids
}

fn inherited_resources(doc: &Document, page_id: ObjectId) -> Option<&Dictionary> {
    let mut node = doc.get_dictionary(page_id).ok()?;
    for _ in 0..MAX_DEPTH {
        if let Ok(res) = node.get(b"Resources") {
            return resolve_dict(doc, res);
        }
        node = resolve_dict(doc, node.get(b"Parent").ok()?)?;
    }
    None
}

fn collect_images(
    doc: &Document,
    resources: &Dictionary,
    visited_forms: &mut HashSet<ObjectId>,
    out: &mut Vec<ObjectId>,
    depth: usize,
) {
    if depth > MAX_DEPTH {
        return;
    }
    let Some(xobjects) = resources
        .get(b"XObject")
        .ok()
        .and_then(|o| resolve_dict(doc, o))
    else {
        return;
    };

    for (_name, value) in xobjects.iter() {
        // XObjects are always indirect streams.
        let Object::Reference(id) = value else {
            continue;
        };
        let Ok(Object::Stream(stream)) = doc.get_object(*id) else {
            continue;
        };
        match name_bytes(stream.dict.get(b"Subtype").ok()) {
            Some(b"Image") => {
                if !out.contains(id) {
                    out.push(*id);
                }
            }
            Some(b"Form") => {
                if visited_forms.insert(*id) {
                    if let Some(inner) = stream
                        .dict
                        .get(b"Resources")
                        .ok()
                        .and_then(|o| resolve_dict(doc, o))
                    {
                        collect_images(doc, inner, visited_forms, out, depth + 1);
                    }
                }
            }
            _ => {}
        }
    }
}

// ── Object helpers ───────────────────────────────────────────────────────

fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> Option<&'a Object> {
    let mut current = obj;
    for _ in 0..MAX_DEPTH {
        match current {
            Object::Reference(id) => current = doc.get_object(*id).ok()?,
            other => return Some(other),
        }
    }
    None
}

fn resolve_dict<'a>(doc: &'a Document, obj: &'a Object) -> Option<&'a Dictionary> {
    match resolve(doc, obj)? {
        Object::Dictionary(d) => Some(d),
        Object::Stream(s) => Some(&s.dict),
        _ => None,
    }
}

fn name_bytes(obj: Option<&Object>) -> Option<&[u8]> {
    match obj? {
        Object::Name(n) => Some(n.as_slice()),
        _ => None,
    }
}

fn as_int(obj: &Object) -> Option<i64> {
    match obj {
        Object::Integer(i) => Some(*i),
        Object::Real(r) => Some(*r as i64),
        _ => None,
    }
}

fn dict_int(doc: &Document, dict: &Dictionary, key: &[u8]) -> Option<i64> {
    dict.get(key).ok().and_then(|o| resolve(doc, o)).and_then(as_int)
}

fn dict_bool(doc: &Document, dict: &Dictionary, key: &[u8]) -> bool {
    matches!(
        dict.get(key).ok().and_then(|o| resolve(doc, o)),
        Some(Object::Boolean(true))
    )
}

/// `/Filter` as a list of names (a single name or an array of names).
fn stream_filters(doc: &Document, dict: &Dictionary) -> Vec<String> {
    let name = |o: &Object| match o {
        Object::Name(n) => Some(String::from_utf8_lossy(n).into_owned()),
        _ => None,
    };
    match dict.get(b"Filter").ok().and_then(|o| resolve(doc, o)) {
        Some(Object::Name(n)) => vec![String::from_utf8_lossy(n).into_owned()],
        Some(Object::Array(arr)) => arr
            .iter()
            .filter_map(|o| resolve(doc, o))
            .filter_map(name)
            .collect(),
        _ => Vec::new(),
    }
}

// ── Decoding ─────────────────────────────────────────────────────────────

type Decoded = (&'static str, ImageEncoding, Vec<u8>);

fn decode_image(
    doc: &Document,
    stream: &Stream,
    page: u32,
    index: usize,
) -> Result<Decoded, ItemError> {
    let filters = stream_filters(doc, &stream.dict);
    let unsupported = |reason: String| ItemError::UnsupportedImage {
        page,
        index,
        reason,
    };
    let failed = |detail: String| ItemError::DecodeFailed {
        page,
        index,
        detail,
    };

    match filters.last().map(String::as_str) {
        Some("DCTDecode") | Some("DCT") => {
            let bytes = strip_outer_flate(&stream.content, &filters[..filters.len() - 1])
                .map_err(|e| failed(e))?;
            if !bytes.starts_with(&[0xFF, 0xD8]) {
                return Err(failed("DCTDecode stream lacks a JPEG SOI marker".into()));
            }
            Ok(("jpg", ImageEncoding::Passthrough, bytes))
        }
        Some("JPXDecode") => {
            let bytes = strip_outer_flate(&stream.content, &filters[..filters.len() - 1])
                .map_err(|e| failed(e))?;
            // A bare codestream starts with SOC+SIZ; anything else is a JP2 box file.
            let ext = if bytes.starts_with(&[0xFF, 0x4F, 0xFF, 0x51]) {
                "j2k"
            } else {
                "jp2"
            };
            Ok((ext, ImageEncoding::Passthrough, bytes))
        }
        Some("JBIG2Decode") => {
            // Any /JBIG2Globals segment lives in a separate stream and is not merged.
            let bytes = strip_outer_flate(&stream.content, &filters[..filters.len() - 1])
                .map_err(|e| failed(e))?;
            Ok(("jb2", ImageEncoding::Passthrough, bytes))
        }
        None => {
            let png = samples_to_png(doc, &stream.dict, &stream.content).map_err(|e| match e {
                SampleError::Unsupported(r) => unsupported(r),
                SampleError::Invalid(d) => failed(d),
            })?;
            Ok(("png", ImageEncoding::Png, png))
        }
        Some(_)
            if filters
                .iter()
                .all(|f| matches!(f.as_str(), "FlateDecode" | "Fl" | "LZWDecode" | "LZW")) =>
        {
            let samples = stream
                .decompressed_content()
                .map_err(|e| failed(format!("{} failed: {e}", filters.join("+"))))?;
            let png = samples_to_png(doc, &stream.dict, &samples).map_err(|e| match e {
                SampleError::Unsupported(r) => unsupported(r),
                SampleError::Invalid(d) => failed(d),
            })?;
            Ok(("png", ImageEncoding::Png, png))
        }
        Some(_) => Err(unsupported(filters.join("+"))),
    }
}

/// Undo any `FlateDecode` layers wrapped around an encoded image stream.
fn strip_outer_flate(content: &[u8], outer: &[String]) -> Result<Vec<u8>, String> {
    let mut bytes = content.to_vec();
    // Filters apply in array order when decoding.
    for filter in outer {
        match filter.as_str() {
            "FlateDecode" | "Fl" => {
                let mut inflated = Vec::new();
                ZlibDecoder::new(bytes.as_slice())
                    .read_to_end(&mut inflated)
                    .map_err(|e| format!("FlateDecode failed: {e}"))?;
                bytes = inflated;
            }
            other => return Err(format!("unsupported outer filter {other}")),
        }
    }
    Ok(bytes)
}

enum SampleError {
    Unsupported(String),
    Invalid(String),
}

/// Colour spaces the sample unpacker understands.
#[derive(Debug, Clone, PartialEq)]
enum ColorSpace {
    Gray,
    Rgb,
    Cmyk,
    Indexed {
        base: Box<ColorSpace>,
        hival: usize,
        lookup: Vec<u8>,
    },
}

impl ColorSpace {
    fn components(&self) -> usize {
        match self {
            ColorSpace::Gray | ColorSpace::Indexed { .. } => 1,
            ColorSpace::Rgb => 3,
            ColorSpace::Cmyk => 4,
        }
    }
}

fn parse_color_space(doc: &Document, obj: &Object) -> Result<ColorSpace, SampleError> {
    let obj = resolve(doc, obj).ok_or_else(|| SampleError::Invalid("dangling /ColorSpace".into()))?;
    match obj {
        Object::Name(n) => match n.as_slice() {
            b"DeviceGray" | b"G" | b"CalGray" => Ok(ColorSpace::Gray),
            b"DeviceRGB" | b"RGB" | b"CalRGB" => Ok(ColorSpace::Rgb),
            b"DeviceCMYK" | b"CMYK" => Ok(ColorSpace::Cmyk),
            other => Err(SampleError::Unsupported(format!(
                "colour space {}",
                String::from_utf8_lossy(other)
            ))),
        },
        Object::Array(arr) => {
            let family = arr
                .first()
                .and_then(|o| resolve(doc, o))
                .and_then(|o| name_bytes(Some(o)))
                .unwrap_or_default();
            match family {
                b"ICCBased" => {
                    let n = arr
                        .get(1)
                        .and_then(|o| resolve_dict(doc, o))
                        .and_then(|d| dict_int(doc, d, b"N"));
                    match n {
                        Some(1) => Ok(ColorSpace::Gray),
                        Some(3) => Ok(ColorSpace::Rgb),
                        Some(4) => Ok(ColorSpace::Cmyk),
                        other => Err(SampleError::Unsupported(format!(
                            "ICCBased with N={other:?}"
                        ))),
                    }
                }
                b"CalGray" => Ok(ColorSpace::Gray),
                b"CalRGB" => Ok(ColorSpace::Rgb),
                b"Indexed" | b"I" => {
                    let base = arr
                        .get(1)
                        .ok_or_else(|| SampleError::Invalid("Indexed without base".into()))
                        .and_then(|o| parse_color_space(doc, o))?;
                    if matches!(base, ColorSpace::Indexed { .. }) {
                        return Err(SampleError::Invalid("nested Indexed colour space".into()));
                    }
                    let hival = arr
                        .get(2)
                        .and_then(|o| resolve(doc, o))
                        .and_then(as_int)
                        .filter(|h| (0..=255).contains(h))
                        .ok_or_else(|| SampleError::Invalid("Indexed hival out of range".into()))?
                        as usize;
                    let lookup = match arr.get(3).and_then(|o| resolve(doc, o)) {
                        Some(Object::String(bytes, _)) => bytes.clone(),
                        Some(Object::Stream(s)) => s
                            .decompressed_content()
                            .unwrap_or_else(|_| s.content.clone()),
                        _ => return Err(SampleError::Invalid("Indexed lookup missing".into())),
                    };
                    Ok(ColorSpace::Indexed {
                        base: Box::new(base),
                        hival,
                        lookup,
                    })
                }
                other => Err(SampleError::Unsupported(format!(
                    "colour space {}",
                    String::from_utf8_lossy(other)
                ))),
            }
        }
        _ => Err(SampleError::Invalid("malformed /ColorSpace".into())),
    }
}

/// Wrap raw pixel samples as a PNG.
fn samples_to_png(doc: &Document, dict: &Dictionary, data: &[u8]) -> Result<Vec<u8>, SampleError> {
    let width = dict_int(doc, dict, b"Width").unwrap_or(0);
    let height = dict_int(doc, dict, b"Height").unwrap_or(0);
    if width <= 0 || height <= 0 {
        return Err(SampleError::Invalid(format!("bad size {width}x{height}")));
    }
    let (width, height) = (width as u32, height as u32);
    if u64::from(width) * u64::from(height) > MAX_PIXELS {
        return Err(SampleError::Unsupported(format!("{width}x{height} is too large")));
    }

    let image_mask = dict_bool(doc, dict, b"ImageMask");
    let (space, bpc) = if image_mask {
        (ColorSpace::Gray, 1)
    } else {
        let cs = dict
            .get(b"ColorSpace")
            .map_err(|_| SampleError::Unsupported("no /ColorSpace".into()))?;
        let bpc = dict_int(doc, dict, b"BitsPerComponent").unwrap_or(8);
        (parse_color_space(doc, cs)?, bpc)
    };
    if !matches!(bpc, 1 | 2 | 4 | 8 | 16) {
        return Err(SampleError::Unsupported(format!("{bpc} bits per component")));
    }
    let bpc = bpc as usize;

    let indexed = matches!(space, ColorSpace::Indexed { .. });
    let samples = unpack_samples(
        data,
        width as usize,
        height as usize,
        space.components(),
        bpc,
        !indexed,
    )
    .ok_or_else(|| SampleError::Invalid("sample data shorter than Width×Height".into()))?;
    let samples = if decode_inverted(doc, dict) && !indexed {
        samples.into_iter().map(|s| 255 - s).collect()
    } else {
        samples
    };

    let img = to_dynamic_image(&space, width, height, samples)
        .ok_or_else(|| SampleError::Invalid("sample buffer size mismatch".into()))?;

    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .map_err(|e| SampleError::Invalid(format!("PNG encoding failed: {e}")))?;
    Ok(buf)
}

/// `/Decode [1 0 …]` flips the sample range.
fn decode_inverted(doc: &Document, dict: &Dictionary) -> bool {
    match dict.get(b"Decode").ok().and_then(|o| resolve(doc, o)) {
        Some(Object::Array(arr)) => {
            let lo = arr.first().and_then(as_int);
            let hi = arr.get(1).and_then(as_int);
            matches!((lo, hi), (Some(1), Some(0)))
        }
        _ => false,
    }
}

/// Unpack `bpc`-bit samples (rows padded to a byte) into one byte per sample.
///
/// With `scale`, sub-byte values are stretched to 0–255; without it (palette
/// indices) they are kept as-is. 16-bit samples keep their high byte.
fn unpack_samples(
    data: &[u8],
    width: usize,
    height: usize,
    components: usize,
    bpc: usize,
    scale: bool,
) -> Option<Vec<u8>> {
    let per_row = width * components;
    let row_bytes = (per_row * bpc).div_ceil(8);
    if data.len() < row_bytes * height {
        return None;
    }

    let mut out = Vec::with_capacity(per_row * height);
    for row in data.chunks_exact(row_bytes).take(height) {
        match bpc {
            8 => out.extend_from_slice(&row[..per_row]),
            16 => out.extend(row.chunks_exact(2).take(per_row).map(|pair| pair[0])),
            _ => {
                let max = (1u16 << bpc) - 1;
                for i in 0..per_row {
                    let bit = i * bpc;
                    let byte = row[bit / 8];
                    let shift = 8 - bpc - (bit % 8);
                    let v = (u16::from(byte) >> shift) & max;
                    out.push(if scale { (v * 255 / max) as u8 } else { v as u8 });
                }
            }
        }
    }
    Some(out)
}

fn cmyk_to_rgb(c: u8, m: u8, y: u8, k: u8) -> [u8; 3] {
    let ch = |v: u8| ((255 - u16::from(v)) * (255 - u16::from(k)) / 255) as u8;
    [ch(c), ch(m), ch(y)]
}

fn to_dynamic_image(
    space: &ColorSpace,
    width: u32,
    height: u32,
    samples: Vec<u8>,
) -> Option<DynamicImage> {
    match space {
        ColorSpace::Gray => {
            GrayImage::from_raw(width, height, samples).map(DynamicImage::ImageLuma8)
        }
        ColorSpace::Rgb => RgbImage::from_raw(width, height, samples).map(DynamicImage::ImageRgb8),
        ColorSpace::Cmyk => {
            let rgb: Vec<u8> = samples
                .chunks_exact(4)
                .flat_map(|p| cmyk_to_rgb(p[0], p[1], p[2], p[3]))
                .collect();
            RgbImage::from_raw(width, height, rgb).map(DynamicImage::ImageRgb8)
        }
        ColorSpace::Indexed {
            base,
            hival,
            lookup,
        } => {
            let n = base.components();
            let mut expanded = Vec::with_capacity(samples.len() * n);
            for &idx in &samples {
                let idx = usize::from(idx).min(*hival);
                let entry = lookup.get(idx * n..idx * n + n)?;
                expanded.extend_from_slice(entry);
            }
            to_dynamic_image(base, width, height, expanded)
        }
    }
}
