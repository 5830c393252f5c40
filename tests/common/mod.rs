//! Shared fixtures: PDFs synthesised with lopdf.

#![allow(dead_code)]

use flate2::write::ZlibEncoder;
use flate2::Compression;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};

/// An image to embed, and the bytes the extractor should write for it.
pub enum Embed {
    /// `DCTDecode` stream; written verbatim.
    Jpeg(Vec<u8>),
    /// Uncompressed 8-bit RGB samples; written as PNG.
    RawRgb { width: u32, height: u32, pixels: Vec<u8> },
    /// 8-bit RGB samples behind `FlateDecode`, optionally with PNG row
    /// predictors (`/Predictor 15`); written as PNG.
    FlateRgb {
        width: u32,
        height: u32,
        pixels: Vec<u8>,
        predictor: bool,
    },
}

/// A small real JPEG filled with `colour`.
pub fn jpeg(colour: [u8; 3]) -> Vec<u8> {
    let mut buf = Vec::new();
    DynamicImage::ImageRgb8(RgbImage::from_pixel(8, 8, Rgb(colour)))
        .write_to(&mut Cursor::new(&mut buf), ImageFormat::Jpeg)
        .unwrap();
    buf
}

/// A small PNG file, for classifier input folders.
pub fn png(colour: [u8; 3]) -> Vec<u8> {
    let mut buf = Vec::new();
    DynamicImage::ImageRgb8(RgbImage::from_pixel(4, 4, Rgb(colour)))
        .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
        .unwrap();
    buf
}

fn zlib(data: &[u8]) -> Vec<u8> {
    let mut enc = ZlibEncoder::new(Vec::new(), Compression::default());
    enc.write_all(data).unwrap();
    enc.finish().unwrap()
}

/// PNG-filter each row: Sub on the first row, Up on the rest.
fn png_predict(width: u32, pixels: &[u8]) -> Vec<u8> {
    let stride = width as usize * 3;
    let mut out = Vec::new();
    let mut previous = vec![0u8; stride];
    for row in pixels.chunks(stride) {
        if out.is_empty() {
            out.push(1);
            out.extend(
                (0..stride).map(|i| row[i].wrapping_sub(if i >= 3 { row[i - 3] } else { 0 })),
            );
        } else {
            out.push(2);
            out.extend((0..stride).map(|i| row[i].wrapping_sub(previous[i])));
        }
        previous.copy_from_slice(row);
    }
    out
}

fn image_stream(embed: &Embed) -> Stream {
    match embed {
        Embed::Jpeg(bytes) => Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => 8,
                "Height" => 8,
                "ColorSpace" => "DeviceRGB",
                "BitsPerComponent" => 8,
                "Filter" => "DCTDecode",
            },
            bytes.clone(),
        ),
        Embed::RawRgb {
            width,
            height,
            pixels,
        } => Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => *width as i64,
                "Height" => *height as i64,
                "ColorSpace" => "DeviceRGB",
                "BitsPerComponent" => 8,
            },
            pixels.clone(),
        ),
        Embed::FlateRgb {
            width,
            height,
            pixels,
            predictor,
        } => {
            let mut dict = dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => *width as i64,
                "Height" => *height as i64,
                "ColorSpace" => "DeviceRGB",
                "BitsPerComponent" => 8,
                "Filter" => "FlateDecode",
            };
            let content = if *predictor {
                dict.set(
                    "DecodeParms",
                    dictionary! {
                        "Predictor" => 15,
                        "Colors" => 3,
                        "BitsPerComponent" => 8,
                        "Columns" => *width as i64,
                    },
                );
                zlib(&png_predict(*width, pixels))
            } else {
                zlib(pixels)
            };
            Stream::new(dict, content)
        }
    }
}

fn xobjects(doc: &mut Document, images: &[Embed]) -> Dictionary {
    let mut dict = Dictionary::new();
    for (i, embed) in images.iter().enumerate() {
        let id = doc.add_object(image_stream(embed));
        dict.set(format!("Im{}", i + 1), id);
    }
    dict
}

fn content_for(count: usize) -> Vec<u8> {
    (1..=count)
        .map(|i| format!("q 10 0 0 10 0 0 cm /Im{i} Do Q\n"))
        .collect::<String>()
        .into_bytes()
}

fn finish(mut doc: Document, pages_id: ObjectId, kids: Vec<ObjectId>, path: &Path) {
    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids.into_iter().map(Object::Reference).collect::<Vec<_>>(),
            "Count" => count,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.save(path).unwrap();
}

/// Write a PDF to `dir/name` whose page *n* embeds `pages[n]`.
pub fn write_pdf(dir: &Path, name: &str, pages: &[Vec<Embed>]) -> PathBuf {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let mut kids = Vec::new();
    for images in pages {
        let xobj = xobjects(&mut doc, images);
        let content_id = doc.add_object(Stream::new(Dictionary::new(), content_for(images.len())));
        kids.push(doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), 200.into(), 200.into()],
            "Resources" => dictionary! { "XObject" => xobj },
            "Contents" => content_id,
        }));
    }
    let path = dir.join(name);
    finish(doc, pages_id, kids, &path);
    path
}

/// Two pages without their own `/Resources`; both inherit one image from
/// the page tree root.
pub fn write_pdf_inherited(dir: &Path, name: &str, image: Embed) -> PathBuf {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let xobj = xobjects(&mut doc, std::slice::from_ref(&image));
    let mut kids = Vec::new();
    for _ in 0..2 {
        let content_id = doc.add_object(Stream::new(Dictionary::new(), content_for(1)));
        kids.push(doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), 200.into(), 200.into()],
            "Contents" => content_id,
        }));
    }
    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids.into_iter().map(Object::Reference).collect::<Vec<_>>(),
            "Count" => count,
            "Resources" => dictionary! { "XObject" => xobj },
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    let path = dir.join(name);
    doc.save(&path).unwrap();
    path
}
