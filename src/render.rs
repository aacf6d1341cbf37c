//! PDF serializer – turns a [`LayoutConfig`] into PDF bytes using `printpdf`
//! (v0.8 ops-based API) and the base-14 fonts.

use std::collections::{BTreeSet, HashMap};

use printpdf::*;
use sha2::{Digest, Sha256};

use crate::assets::decode_data_uri;
use crate::error::RenderError;
use crate::layout_config::*;

/// 1 pt in millimetres.
const MM_PER_PT: f32 = 25.4 / 72.0;

/// Length of each string in the trailer `/ID` pair.
const ID_LEN: usize = 32;

/// A printpdf XObject together with the pixel dimensions of the source image.
struct ImageResource {
    xobj_id: XObjectId,
    px_width: u32,
    px_height: u32,
}

/// Render a LayoutConfig into PDF bytes.
///
/// Every image must be a decodable base64 data URI; anything else is an
/// [`RenderError::Asset`].
pub fn render_pdf(config: &LayoutConfig) -> Result<Vec<u8>, RenderError> {
    let page_w = Mm(config.page_width_pt * MM_PER_PT);
    let page_h = Mm(config.page_height_pt * MM_PER_PT);

    let mut doc = PdfDocument::new(&config.title);
    let epoch = OffsetDateTime::from_unix_timestamp(0)
        .map_err(|e| RenderError::Layout(format!("invalid document date: {e}")))?;
    doc.metadata.info.creation_date = epoch;
    doc.metadata.info.modification_date = epoch;
    doc.metadata.info.metadata_date = epoch;

    // ── Register images once, in a stable order ──────────────────────────
    let mut all_srcs: BTreeSet<&str> = BTreeSet::new();
    for page_layout in &config.pages {
        for lbox in &page_layout.boxes {
            collect_image_srcs(lbox, &mut all_srcs);
        }
    }

    let mut image_resources: HashMap<String, ImageResource> = HashMap::new();
    let mut img_warnings: Vec<PdfWarnMsg> = Vec::new();

    for (index, src) in all_srcs.into_iter().enumerate() {
        let (_, bytes) = decode_data_uri(src)?;
        let preview: String = src.chars().take(40).collect();
        let dyn_img = ::image::load_from_memory(&bytes)
            .map_err(|e| RenderError::asset(&preview, format!("undecodable image: {e}")))?;
        let raw = RawImage::decode_from_bytes(&bytes, &mut img_warnings)
            .map_err(|e| RenderError::asset(&preview, format!("cannot embed image: {e}")))?;
        let xobj_id = XObjectId(format!("Im{index:04}"));
        doc.resources
            .xobjects
            .map
            .insert(xobj_id.clone(), XObject::Image(raw));

        image_resources.insert(
            src.to_string(),
            ImageResource {
                xobj_id,
                px_width: dyn_img.width(),
                px_height: dyn_img.height(),
            },
        );
    }

    // ── Render pages ─────────────────────────────────────────────────────
    let mut pages: Vec<PdfPage> = config
        .pages
        .iter()
        .map(|page_layout| {
            let mut ops = Vec::new();
            for lbox in &page_layout.boxes {
                render_box(&mut ops, lbox, config.page_height_pt, &image_resources);
            }
            PdfPage::new(page_w, page_h, ops)
        })
        .collect();

    if pages.is_empty() {
        pages.push(PdfPage::new(page_w, page_h, Vec::new()));
    }

    let page_count = pages.len();
    doc.with_pages(pages);
    let mut save_warnings = Vec::new();
    let mut bytes = doc.save(&PdfSaveOptions::default(), &mut save_warnings);
    if bytes.is_empty() {
        return Err(RenderError::Layout("PDF serializer produced no output".into()));
    }
    if !stamp_document_id(&mut bytes) {
        log::warn!("No trailer /ID pair found; document id left as generated");
    }
    log::debug!(
        "Serialized {page_count} page(s), {} bytes, {} warning(s)",
        bytes.len(),
        save_warnings.len() + img_warnings.len()
    );
    Ok(bytes)
}

/// Replace the trailer `/ID` pair with a SHA-256 of everything before it.
/// Both strings keep their length, so xref offsets stay valid.
fn stamp_document_id(bytes: &mut [u8]) -> bool {
    let Some(id_pos) = bytes.windows(3).rposition(|w| w == b"/ID") else {
        return false;
    };

    let mut spans = Vec::with_capacity(2);
    let mut cursor = id_pos + 3;
    for _ in 0..2 {
        let Some(open) = bytes[cursor..].iter().position(|&b| b == b'(') else {
            return false;
        };
        let start = cursor + open + 1;
        let end = start + ID_LEN;
        if bytes.get(end) != Some(&b')') {
            return false;
        }
        spans.push(start..end);
        cursor = end + 1;
    }

    let hex: String = Sha256::digest(&bytes[..id_pos])
        .iter()
        .map(|b| format!("{b:02X}"))
        .collect();
    for (span, part) in spans.into_iter().zip(hex.as_bytes().chunks(ID_LEN)) {
        bytes[span].copy_from_slice(part);
    }
    true
}

/// Pick the base-14 face for a CSS family name.
fn builtin_font(family: &str, bold: bool, italic: bool) -> BuiltinFont {
    let family = family.to_ascii_lowercase();
    if family.contains("times") || family == "serif" || family.contains("georgia") {
        match (bold, italic) {
            (true, true) => BuiltinFont::TimesBoldItalic,
            (true, false) => BuiltinFont::TimesBold,
            (false, true) => BuiltinFont::TimesItalic,
            (false, false) => BuiltinFont::TimesRoman,
        }
    } else if family.contains("courier") || family.contains("mono") {
        match (bold, italic) {
            (true, true) => BuiltinFont::CourierBoldOblique,
            (true, false) => BuiltinFont::CourierBold,
            (false, true) => BuiltinFont::CourierOblique,
            (false, false) => BuiltinFont::Courier,
        }
    } else {
        match (bold, italic) {
            (true, true) => BuiltinFont::HelveticaBoldOblique,
            (true, false) => BuiltinFont::HelveticaBold,
            (false, true) => BuiltinFont::HelveticaOblique,
            (false, false) => BuiltinFont::Helvetica,
        }
    }
}

/// Convert a UTF-8 string to raw Windows-1252 bytes then wrap in a String so
/// printpdf writes the bytes unchanged into the PDF stream (builtin fonts use
/// WinAnsiEncoding, so each glyph is one byte 0x00–0xFF).
fn to_winlatin(s: &str) -> String {
    let bytes: Vec<u8> = s
        .chars()
        .map(|c| match c {
            '\u{20AC}' => 0x80, // euro
            '\u{201A}' => 0x82,
            '\u{201E}' => 0x84,
            '\u{2026}' => 0x85, // ellipsis
            '\u{2018}' => 0x91,
            '\u{2019}' => 0x92,
            '\u{201C}' => 0x93,
            '\u{201D}' => 0x94,
            '\u{2022}' => 0x95, // bullet
            '\u{2013}' => 0x96,
            '\u{2014}' => 0x97,
            '\u{2122}' => 0x99,
            '\u{00A0}' => 0x20,
            c if (c as u32) < 256 => c as u8,
            _ => b'?',
        })
        .collect();
    // SAFETY: intentionally non-UTF-8 for bytes >= 0x80; printpdf passes
    // these bytes straight to the PDF stream, decoded by WinAnsiEncoding.
    #[allow(unsafe_code)]
    unsafe {
        String::from_utf8_unchecked(bytes)
    }
}

fn rgb(c: &[f32; 4]) -> Color {
    Color::Rgb(Rgb {
        r: c[0],
        g: c[1],
        b: c[2],
        icc_profile: None,
    })
}

fn point(x: f32, y: f32) -> LinePoint {
    LinePoint {
        p: Point { x: Pt(x), y: Pt(y) },
        bezier: false,
    }
}

/// Corners of a rectangle in PDF space, counter-clockwise from bottom-left.
fn rect_points(x1: f32, y1: f32, x2: f32, y2: f32) -> Vec<LinePoint> {
    vec![point(x1, y1), point(x2, y1), point(x2, y2), point(x1, y2)]
}

fn write_text(ops: &mut Vec<Op>, text: &str, x: f32, y: f32, size: f32, font: BuiltinFont, color: &[f32; 4]) {
    ops.push(Op::StartTextSection);
    ops.push(Op::SetTextCursor {
        pos: Point { x: Pt(x), y: Pt(y) },
    });
    ops.push(Op::SetFontSizeBuiltinFont {
        size: Pt(size),
        font,
    });
    ops.push(Op::SetFillColor { col: rgb(color) });
    ops.push(Op::WriteTextBuiltinFont {
        items: vec![TextItem::Text(to_winlatin(text))],
        font,
    });
    ops.push(Op::EndTextSection);
}

/// Recursively collect all unique `image.src` strings from a [`LayoutBox`] tree.
fn collect_image_srcs<'a>(lbox: &'a LayoutBox, srcs: &mut BTreeSet<&'a str>) {
    if let Some(img) = &lbox.image {
        srcs.insert(img.src.as_str());
    }
    for child in &lbox.children {
        collect_image_srcs(child, srcs);
    }
}

/// Recursively render a LayoutBox and its children into PDF ops.
fn render_box(
    ops: &mut Vec<Op>,
    lbox: &LayoutBox,
    page_height: f32,
    images: &HashMap<String, ImageResource>,
) {
    // PDF origin is bottom-left; layout origin is top-left.
    let top = page_height - lbox.y;
    let bottom = top - lbox.height;
    let (left, right) = (lbox.x, lbox.x + lbox.width);

    if let Some(bg) = &lbox.background_color {
        ops.push(Op::SetFillColor { col: rgb(bg) });
        ops.push(Op::DrawPolygon {
            polygon: Polygon {
                rings: vec![PolygonRing {
                    points: rect_points(left, bottom, right, top),
                }],
                mode: PaintMode::Fill,
                winding_order: WindingOrder::NonZero,
            },
        });
    }

    if let Some(border) = &lbox.border {
        ops.push(Op::SetOutlineColor {
            col: rgb(&border.color),
        });
        ops.push(Op::SetOutlineThickness {
            pt: Pt(border.width),
        });
        ops.push(Op::DrawLine {
            line: Line {
                points: rect_points(left, bottom, right, top),
                is_closed: true,
            },
        });
    }

    if let Some(text) = &lbox.text {
        let font = builtin_font(&text.font_family, text.bold, text.italic);
        // Baseline ≈ top of line + ascender (approx 0.75 × font_size).
        let ascender_offset = text.font_size * 0.75;

        for tline in text.lines.iter().filter(|l| !l.text.is_empty()) {
            let text_x = lbox.x + tline.x_offset;
            let text_y = top - tline.y_offset - ascender_offset;
            write_text(ops, &tline.text, text_x, text_y, text.font_size, font, &text.color);

            if text.underline {
                let underline_y = text_y - text.font_size * 0.1;
                let line_width = (lbox.width - tline.x_offset).max(0.0);
                ops.push(Op::SetOutlineThickness { pt: Pt(0.5) });
                ops.push(Op::SetOutlineColor {
                    col: rgb(&text.color),
                });
                ops.push(Op::DrawLine {
                    line: Line {
                        points: vec![point(text_x, underline_y), point(text_x + line_width, underline_y)],
                        is_closed: false,
                    },
                });
            }
        }

        if let Some(marker) = &text.list_marker {
            let marker_font = builtin_font(&text.font_family, false, false);
            write_text(
                ops,
                marker,
                lbox.x - 16.0,
                top - ascender_offset,
                text.font_size,
                marker_font,
                &text.color,
            );
        }
    }

    if let Some(img) = &lbox.image {
        if let Some(res) = images.get(&img.src) {
            // At dpi=72 printpdf renders 1 px = 1 pt, so scale = pt / px.
            let scale_x = if res.px_width > 0 {
                img.width / res.px_width as f32
            } else {
                1.0
            };
            let scale_y = if res.px_height > 0 {
                img.height / res.px_height as f32
            } else {
                1.0
            };

            ops.push(Op::UseXobject {
                id: res.xobj_id.clone(),
                transform: XObjectTransform {
                    translate_x: Some(Pt(lbox.x)),
                    translate_y: Some(Pt(top - img.height)),
                    dpi: Some(72.0),
                    scale_x: Some(scale_x),
                    scale_y: Some(scale_y),
                    rotate: None,
                },
            });
        }
    }

    for child in &lbox.children {
        render_box(ops, child, page_height, images);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::PageGeometry;

    #[test]
    fn render_empty_page() {
        let config = LayoutConfig::new("Vacio", &PageGeometry::default());
        let bytes = render_pdf(&config).unwrap();
        assert!(bytes.len() > 100, "PDF should have content");
        assert_eq!(&bytes[0..5], b"%PDF-");
    }

    #[test]
    fn text_and_boxes_render() {
        let mut config = LayoutConfig::new("Caja", &PageGeometry::default());
        let mut lbox = LayoutBox::new(40.0, 40.0, 200.0, 20.0);
        lbox.background_color = Some([0.9, 0.9, 0.9, 1.0]);
        lbox.border = Some(BorderStyle {
            width: 1.0,
            color: [0.0, 0.0, 0.0, 1.0],
        });
        lbox.text = Some(TextContent {
            lines: vec![TextLine {
                text: "Año fiscal €".to_string(),
                x_offset: 0.0,
                y_offset: 0.0,
            }],
            font_family: "Helvetica".to_string(),
            font_size: 10.0,
            bold: true,
            italic: false,
            color: [0.0, 0.0, 0.0, 1.0],
            line_height: 14.0,
            text_align: "left".to_string(),
            underline: true,
            list_marker: None,
        });
        config.pages.push(PageLayout {
            page_index: 0,
            boxes: vec![lbox],
        });
        let bytes = render_pdf(&config).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn non_data_uri_images_are_rejected() {
        let mut config = LayoutConfig::new("Imagen", &PageGeometry::default());
        let mut lbox = LayoutBox::new(0.0, 0.0, 10.0, 10.0);
        lbox.image = Some(ImageContent {
            src: "logo.png".to_string(),
            width: 10.0,
            height: 10.0,
        });
        config.pages.push(PageLayout {
            page_index: 0,
            boxes: vec![lbox],
        });
        assert!(matches!(render_pdf(&config), Err(RenderError::Asset { .. })));
    }

    fn page_with_image() -> LayoutConfig {
        let img = ::image::RgbImage::from_pixel(3, 3, ::image::Rgb([11, 61, 145]));
        let mut png = std::io::Cursor::new(Vec::new());
        img.write_to(&mut png, ::image::ImageFormat::Png).unwrap();

        let mut config = LayoutConfig::new("Logo", &PageGeometry::default());
        let mut lbox = LayoutBox::new(40.0, 40.0, 30.0, 30.0);
        lbox.image = Some(ImageContent {
            src: crate::assets::data_uri("image/png", &png.into_inner()),
            width: 30.0,
            height: 30.0,
        });
        config.pages.push(PageLayout {
            page_index: 0,
            boxes: vec![lbox],
        });
        config
    }

    #[test]
    fn identical_layouts_give_identical_bytes() {
        let config = page_with_image();
        let first = render_pdf(&config).unwrap();
        std::thread::sleep(std::time::Duration::from_millis(1100));
        let second = render_pdf(&config).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn document_id_is_a_digest_of_the_body() {
        let bytes = render_pdf(&LayoutConfig::new("Id", &PageGeometry::default())).unwrap();
        let id_pos = bytes.windows(3).rposition(|w| w == b"/ID").unwrap();
        let expected: String = Sha256::digest(&bytes[..id_pos])
            .iter()
            .map(|b| format!("{b:02X}"))
            .collect();
        let trailer = String::from_utf8_lossy(&bytes[id_pos..]);
        assert!(trailer.contains(&format!("({})", &expected[..ID_LEN])), "{trailer}");
        assert!(trailer.contains(&format!("({})", &expected[ID_LEN..])), "{trailer}");
    }

    #[test]
    fn stamping_needs_a_well_formed_pair() {
        let mut short = b"trailer<</ID[(ABC)(DEF)]>>".to_vec();
        assert!(!stamp_document_id(&mut short));
        assert_eq!(short, b"trailer<</ID[(ABC)(DEF)]>>".to_vec());
        assert!(!stamp_document_id(&mut b"%PDF-1.3 sin trailer".to_vec()));
    }

    #[test]
    fn winlatin_maps_accents_to_single_bytes() {
        assert_eq!(to_winlatin("ñ").as_bytes(), &[0xF1]);
        assert_eq!(to_winlatin("€").as_bytes(), &[0x80]);
        assert_eq!(to_winlatin("漢").as_bytes(), b"?");
    }

    #[test]
    fn serif_families_use_times() {
        assert!(matches!(builtin_font("Times New Roman", true, false), BuiltinFont::TimesBold));
        assert!(matches!(builtin_font("Arial", false, false), BuiltinFont::Helvetica));
    }
}
