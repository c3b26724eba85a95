use crate::canvas::{DrawOp, EmbeddedImage, RenderedDoc};
use crate::document::DocumentKind;
use crate::error::ExportError;
use crate::font::FontId;
use crate::types::Pt;
use image::codecs::jpeg::JpegEncoder;
use image::{ExtendedColorType, ImageEncoder};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document as LoDocument, Object, Stream, StringFormat};
use sha2::{Digest, Sha256};
use std::collections::HashMap;

const JPEG_QUALITY: u8 = 85;

/// Output naming contract. The prefixes differ in case deliberately;
/// downstream tooling matches these names literally.
pub(crate) fn artifact_file_name(kind: DocumentKind, number: &str) -> String {
    match kind {
        DocumentKind::Invoice => format!("Invoice-{}.pdf", number),
        DocumentKind::Quote => format!("quote-{}.pdf", number),
    }
}

/// Serializes the finished page sequence into PDF bytes. All-or-nothing:
/// an encoding failure on any page yields an error and no artifact.
pub(crate) fn write_pdf(rendered: &RenderedDoc) -> Result<Vec<u8>, ExportError> {
    let mut doc = LoDocument::with_version("1.5");
    let pages_id = doc.new_object_id();

    let mut font_resources = Dictionary::new();
    for font in FontId::ALL {
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => font.base_font(),
            "Encoding" => "WinAnsiEncoding",
        });
        font_resources.set(font.resource_name(), Object::Reference(font_id));
    }

    // Identical image bytes embed once and share an XObject, keyed by
    // content digest.
    let mut xobjects = Dictionary::new();
    let mut names_by_digest: HashMap<[u8; 32], String> = HashMap::new();
    let mut image_names: Vec<String> = Vec::with_capacity(rendered.images.len());
    for image in &rendered.images {
        let digest: [u8; 32] = Sha256::digest(&image.rgb).into();
        if let Some(name) = names_by_digest.get(&digest) {
            image_names.push(name.clone());
            continue;
        }
        let name = format!("Im{}", names_by_digest.len());
        let stream = image_xobject(image)?;
        let object_id = doc.add_object(stream);
        xobjects.set(name.as_bytes(), Object::Reference(object_id));
        names_by_digest.insert(digest, name.clone());
        image_names.push(name);
    }

    let mut resources = dictionary! { "Font" => font_resources };
    if !xobjects.is_empty() {
        resources.set("XObject", xobjects);
    }
    let resources_id = doc.add_object(resources);

    let page_width = rendered.page_size.width.to_f32();
    let page_height = rendered.page_size.height.to_f32();
    let mut page_ids = Vec::with_capacity(rendered.pages.len());
    for page in &rendered.pages {
        let content = Content {
            operations: page_operations(&page.ops, page_height, &image_names),
        };
        let encoded = content
            .encode()
            .map_err(|err| ExportError::Render(format!("content stream encode: {}", err)))?;
        let content_id = doc.add_object(Stream::new(Dictionary::new(), encoded));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![
                0.into(),
                0.into(),
                Object::Real(page_width),
                Object::Real(page_height),
            ],
            "Contents" => content_id,
            "Resources" => resources_id,
        });
        page_ids.push(page_id);
    }

    let pages = dictionary! {
        "Type" => "Pages",
        "Kids" => page_ids.iter().map(|id| Object::Reference(*id)).collect::<Vec<_>>(),
        "Count" => page_ids.len() as i64,
    };
    doc.objects.insert(pages_id, Object::Dictionary(pages));
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes)
        .map_err(|err| ExportError::Render(format!("pdf serialize: {}", err)))?;
    Ok(bytes)
}

fn image_xobject(image: &EmbeddedImage) -> Result<Stream, ExportError> {
    if image.rgb.len() != (image.width as usize) * (image.height as usize) * 3 {
        return Err(ExportError::Render(format!(
            "image buffer does not match {}x{} dimensions",
            image.width, image.height
        )));
    }
    let mut jpeg = Vec::new();
    JpegEncoder::new_with_quality(&mut jpeg, JPEG_QUALITY)
        .write_image(&image.rgb, image.width, image.height, ExtendedColorType::Rgb8)
        .map_err(|err| ExportError::Render(format!("jpeg encode: {}", err)))?;
    Ok(Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => image.width as i64,
            "Height" => image.height as i64,
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => 8,
            "Filter" => "DCTDecode",
        },
        jpeg,
    ))
}

/// Translates recorded ops into content-stream operations. Recorded
/// coordinates use a top-left origin; PDF device space is bottom-left,
/// so every y flips through the page height.
fn page_operations(ops: &[DrawOp], page_height: f32, image_names: &[String]) -> Vec<Operation> {
    let mut operations = Vec::with_capacity(ops.len() * 4);
    let mut font: (FontId, Pt) = (FontId::Helvetica, Pt::from_f32(9.0));
    for op in ops {
        match op {
            DrawOp::FillColor(color) => operations.push(Operation::new(
                "rg",
                vec![
                    Object::Real(color.r),
                    Object::Real(color.g),
                    Object::Real(color.b),
                ],
            )),
            DrawOp::StrokeColor(color) => operations.push(Operation::new(
                "RG",
                vec![
                    Object::Real(color.r),
                    Object::Real(color.g),
                    Object::Real(color.b),
                ],
            )),
            DrawOp::LineWidth(width) => {
                operations.push(Operation::new("w", vec![Object::Real(width.to_f32())]));
            }
            DrawOp::Font { id, size } => font = (*id, *size),
            DrawOp::Text { x, y, text } => {
                operations.push(Operation::new("BT", vec![]));
                operations.push(Operation::new(
                    "Tf",
                    vec![
                        Object::Name(font.0.resource_name().into()),
                        Object::Real(font.1.to_f32()),
                    ],
                ));
                operations.push(Operation::new(
                    "Td",
                    vec![
                        Object::Real(x.to_f32()),
                        Object::Real(page_height - y.to_f32()),
                    ],
                ));
                operations.push(Operation::new(
                    "Tj",
                    vec![Object::String(encode_text(text), StringFormat::Literal)],
                ));
                operations.push(Operation::new("ET", vec![]));
            }
            DrawOp::Rect {
                x,
                y,
                width,
                height,
                fill,
                stroke,
            } => {
                operations.push(Operation::new(
                    "re",
                    vec![
                        Object::Real(x.to_f32()),
                        Object::Real(page_height - y.to_f32() - height.to_f32()),
                        Object::Real(width.to_f32()),
                        Object::Real(height.to_f32()),
                    ],
                ));
                let paint = match (*fill, *stroke) {
                    (true, true) => "B",
                    (true, false) => "f",
                    (false, true) => "S",
                    (false, false) => "n",
                };
                operations.push(Operation::new(paint, vec![]));
            }
            DrawOp::Line { x1, y1, x2, y2 } => {
                operations.push(Operation::new(
                    "m",
                    vec![
                        Object::Real(x1.to_f32()),
                        Object::Real(page_height - y1.to_f32()),
                    ],
                ));
                operations.push(Operation::new(
                    "l",
                    vec![
                        Object::Real(x2.to_f32()),
                        Object::Real(page_height - y2.to_f32()),
                    ],
                ));
                operations.push(Operation::new("S", vec![]));
            }
            DrawOp::Image { rect, image } => {
                let name = match image_names.get(image.0) {
                    Some(name) => name.clone(),
                    None => continue,
                };
                operations.push(Operation::new("q", vec![]));
                operations.push(Operation::new(
                    "cm",
                    vec![
                        Object::Real(rect.width.to_f32()),
                        Object::Real(0.0),
                        Object::Real(0.0),
                        Object::Real(rect.height.to_f32()),
                        Object::Real(rect.x.to_f32()),
                        Object::Real(page_height - rect.y.to_f32() - rect.height.to_f32()),
                    ],
                ));
                operations.push(Operation::new("Do", vec![Object::Name(name.into_bytes())]));
                operations.push(Operation::new("Q", vec![]));
            }
        }
    }
    operations
}

/// WinAnsi byte encoding: Latin-1 range passes through, anything wider
/// falls back to `?`.
fn encode_text(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| {
            let code = c as u32;
            if code <= 0xFF { code as u8 } else { b'?' }
        })
        .collect()
}
