//! Layout-preserving PDF rewriting.
//!
//! The writer reopens the original document, paints an opaque white
//! rectangle over every translated region, draws the translation inside the
//! same rectangle with auto-shrink wrapping, and removes link annotations
//! that overlap rewritten areas. Pages without regions pass through
//! untouched, so original vector graphics and unrelated annotations
//! survive.

use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::path::Path;

use itertools::Itertools;
use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream, StringFormat};
use tracing::{debug, info, warn};

use crate::core::errors::Result;
use crate::core::geometry::PdfBox;
use crate::layout::LayoutLabel;
use crate::pdf::font::{
    fit_font_size, wrap_lines, EmbeddedFont, StandardFont, TextMeasure, LINE_HEIGHT_FACTOR,
};
use crate::region::{PageRegions, TranslatedRegion};

/// Body font size used when a page has no body-class text at all.
const DEFAULT_BODY_SIZE: f32 = 10.0;

/// Resource names under which the fonts are registered on each page.
const REGULAR_FONT_KEY: &str = "LPF1";
const BOLD_FONT_KEY: &str = "LPF2";

enum LoadedFont {
    Embedded(EmbeddedFont),
    Standard(StandardFont),
}

impl LoadedFont {
    fn measure(&self) -> &dyn TextMeasure {
        match self {
            LoadedFont::Embedded(font) => font,
            LoadedFont::Standard(font) => font,
        }
    }

    fn show_string(&self, text: &str) -> Object {
        match self {
            LoadedFont::Embedded(font) => {
                Object::String(font.encode_text(text), StringFormat::Hexadecimal)
            }
            LoadedFont::Standard(_) => {
                Object::String(StandardFont::encode_text(text), StringFormat::Literal)
            }
        }
    }
}

struct FontBinding {
    font: LoadedFont,
    object_id: ObjectId,
    resource_key: &'static str,
}

/// Rewrites `input` into `output`, replacing each region's text with its
/// translation.
///
/// The regular font is required and must cover the target script; the bold
/// font is optional and used for titles. A font that fails to load or parse
/// does not fail the run: the writer logs a warning and falls back to
/// Helvetica (for the regular slot) or to the regular font (for titles).
pub fn write_translated_pdf(
    input: &Path,
    regions_by_page: &PageRegions,
    regular_font: &Path,
    bold_font: Option<&Path>,
    output: &Path,
) -> Result<()> {
    let mut doc = Document::load(input)?;

    // Nothing to draw anywhere: skip font embedding so the output does not
    // carry a multi-megabyte unused font program.
    if regions_by_page.values().all(|regions| regions.is_empty()) {
        let tmp = output.with_extension("pdf.tmp");
        doc.save(&tmp)?;
        std::fs::rename(&tmp, output)?;
        info!("No regions to translate, copied document to {}", output.display());
        return Ok(());
    }

    let regular = match EmbeddedFont::load(regular_font) {
        Ok(font) => LoadedFont::Embedded(font),
        Err(e) => {
            warn!("Falling back to Helvetica for body text: {e}");
            LoadedFont::Standard(StandardFont)
        }
    };
    let bold = bold_font.and_then(|path| match EmbeddedFont::load(path) {
        Ok(font) => Some(LoadedFont::Embedded(font)),
        Err(e) => {
            warn!("Bold font unavailable, titles use the regular font: {e}");
            None
        }
    });

    // The width array and ToUnicode CMap cover exactly the characters the
    // translations use, collected up front per font.
    let (regular_chars, bold_chars) = collect_used_chars(regions_by_page, bold.is_some());
    let regular = bind_font(&mut doc, regular, &regular_chars, REGULAR_FONT_KEY);
    let bold = bold.map(|font| bind_font(&mut doc, font, &bold_chars, BOLD_FONT_KEY));

    let pages = doc.get_pages();
    for (page_number, page_id) in pages {
        let index = (page_number - 1) as usize;
        let Some(regions) = regions_by_page.get(&index) else {
            continue;
        };
        if regions.is_empty() {
            continue;
        }
        write_page(&mut doc, page_id, regions, &regular, bold.as_ref())?;
        scrub_link_annotations(&mut doc, page_id, regions)?;
        debug!("Rewrote {} regions on page {page_number}", regions.len());
    }

    let tmp = output.with_extension("pdf.tmp");
    doc.compress();
    doc.save(&tmp)?;
    std::fs::rename(&tmp, output)?;
    info!("Wrote translated PDF to {}", output.display());
    Ok(())
}

fn collect_used_chars(
    regions_by_page: &PageRegions,
    have_bold: bool,
) -> (BTreeSet<char>, BTreeSet<char>) {
    let mut regular = BTreeSet::new();
    let mut bold = BTreeSet::new();
    for region in regions_by_page.values().flatten() {
        let target = if have_bold && region.region.layout.label == LayoutLabel::Title {
            &mut bold
        } else {
            &mut regular
        };
        target.extend(region.translated_text.chars());
    }
    (regular, bold)
}

fn bind_font(
    doc: &mut Document,
    font: LoadedFont,
    used: &BTreeSet<char>,
    resource_key: &'static str,
) -> FontBinding {
    let object_id = match &font {
        LoadedFont::Embedded(embedded) => embedded.add_to_document(doc, used),
        LoadedFont::Standard(_) => StandardFont::add_to_document(doc),
    };
    FontBinding {
        font,
        object_id,
        resource_key,
    }
}

fn write_page(
    doc: &mut Document,
    page_id: ObjectId,
    regions: &[TranslatedRegion],
    regular: &FontBinding,
    bold: Option<&FontBinding>,
) -> Result<()> {
    let body_size = uniform_body_size(regions);
    let mut operations = Vec::new();

    for region in regions {
        let bbox = region.region.pdf_bbox;
        push_erasure(&mut operations, &bbox);
        if region.translated_text.is_empty() {
            continue;
        }

        let is_title = region.region.layout.label == LayoutLabel::Title;
        let binding = match (is_title, bold) {
            (true, Some(bold)) => bold,
            _ => regular,
        };
        let target_size = if is_title {
            mean_block_size(region).unwrap_or(body_size)
        } else {
            body_size
        };

        let padding = (target_size * 0.15).max(2.0);
        let avail_width = bbox.width - 2.0 * padding;
        let avail_height = bbox.height - 2.0 * padding;
        if avail_width <= 0.0 || avail_height <= 0.0 {
            continue;
        }

        let measure = binding.font.measure();
        let font_size = fit_font_size(
            &region.translated_text,
            target_size,
            avail_width,
            avail_height,
            measure,
        );
        let lines = wrap_lines(&region.translated_text, font_size, avail_width, measure);
        let line_height = LINE_HEIGHT_FACTOR * font_size;

        operations.push(Operation::new("BT", vec![]));
        operations.push(Operation::new(
            "Tf",
            vec![
                Object::Name(binding.resource_key.as_bytes().to_vec()),
                Object::Real(font_size),
            ],
        ));
        operations.push(Operation::new("g", vec![Object::Real(0.0)]));

        for (line_index, line) in lines.iter().enumerate() {
            // Baseline of line i sits one line height below the previous,
            // starting from the padded top edge of the region box.
            let baseline = bbox.y + bbox.height
                - padding
                - (line_index as f32 + 1.0) * line_height
                + (line_height - font_size);
            if baseline < bbox.y {
                break;
            }
            operations.push(Operation::new(
                "Tm",
                vec![
                    Object::Real(1.0),
                    Object::Real(0.0),
                    Object::Real(0.0),
                    Object::Real(1.0),
                    Object::Real(bbox.x + padding),
                    Object::Real(baseline),
                ],
            ));
            operations.push(Operation::new("Tj", vec![binding.font.show_string(line)]));
        }
        operations.push(Operation::new("ET", vec![]));
    }

    append_content(doc, page_id, Content { operations })?;

    let mut fonts = vec![(regular.resource_key, regular.object_id)];
    if let Some(bold) = bold {
        fonts.push((bold.resource_key, bold.object_id));
    }
    register_page_fonts(doc, page_id, &fonts)
}

fn push_erasure(operations: &mut Vec<Operation>, bbox: &PdfBox) {
    operations.push(Operation::new("q", vec![]));
    operations.push(Operation::new(
        "rg",
        vec![Object::Real(1.0), Object::Real(1.0), Object::Real(1.0)],
    ));
    operations.push(Operation::new(
        "re",
        vec![
            Object::Real(bbox.x),
            Object::Real(bbox.y),
            Object::Real(bbox.width),
            Object::Real(bbox.height),
        ],
    ));
    operations.push(Operation::new("f", vec![]));
    operations.push(Operation::new("Q", vec![]));
}

/// Median original font size across body-class regions of the page, so the
/// whole body reads at one consistent size regardless of how the source
/// mixed sizes within a paragraph.
fn uniform_body_size(regions: &[TranslatedRegion]) -> f32 {
    let sizes: Vec<f32> = regions
        .iter()
        .filter(|region| region.region.layout.label.is_body())
        .flat_map(|region| region.region.blocks.iter().map(|block| block.font_size))
        .sorted_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal))
        .collect();
    if sizes.is_empty() {
        return DEFAULT_BODY_SIZE;
    }
    let mid = sizes.len() / 2;
    if sizes.len() % 2 == 0 {
        (sizes[mid - 1] + sizes[mid]) / 2.0
    } else {
        sizes[mid]
    }
}

fn mean_block_size(region: &TranslatedRegion) -> Option<f32> {
    let blocks = &region.region.blocks;
    if blocks.is_empty() {
        return None;
    }
    Some(blocks.iter().map(|block| block.font_size).sum::<f32>() / blocks.len() as f32)
}

/// Appends a content stream to the page, preserving the existing content.
fn append_content(doc: &mut Document, page_id: ObjectId, content: Content) -> Result<()> {
    let encoded = content.encode()?;
    let stream_id = doc.add_object(Object::Stream(Stream::new(Dictionary::new(), encoded)));

    let existing = doc.get_dictionary(page_id)?.get(b"Contents").ok().cloned();
    match existing {
        Some(Object::Array(mut array)) => {
            array.push(Object::Reference(stream_id));
            set_page_contents(doc, page_id, Object::Array(array))
        }
        Some(Object::Reference(existing_id)) => {
            let is_array = matches!(doc.get_object(existing_id), Ok(Object::Array(_)));
            if is_array {
                doc.get_object_mut(existing_id)?
                    .as_array_mut()?
                    .push(Object::Reference(stream_id));
                Ok(())
            } else {
                set_page_contents(
                    doc,
                    page_id,
                    Object::Array(vec![
                        Object::Reference(existing_id),
                        Object::Reference(stream_id),
                    ]),
                )
            }
        }
        _ => set_page_contents(doc, page_id, Object::Reference(stream_id)),
    }
}

fn set_page_contents(doc: &mut Document, page_id: ObjectId, contents: Object) -> Result<()> {
    let page = doc.get_object_mut(page_id)?.as_dict_mut()?;
    page.set("Contents", contents);
    Ok(())
}

/// Registers the translation fonts in the page's resources, flattening
/// inherited resource dictionaries onto the page so the addition cannot
/// leak into sibling pages.
fn register_page_fonts(
    doc: &mut Document,
    page_id: ObjectId,
    fonts: &[(&str, ObjectId)],
) -> Result<()> {
    let mut resources = inherited_resources(doc, page_id);
    let mut font_dict = match resources.get(b"Font") {
        Ok(existing) => resolve_dict(doc, existing),
        Err(_) => Dictionary::new(),
    };
    for (key, object_id) in fonts {
        font_dict.set(*key, Object::Reference(*object_id));
    }
    resources.set("Font", Object::Dictionary(font_dict));

    let page = doc.get_object_mut(page_id)?.as_dict_mut()?;
    page.set("Resources", Object::Dictionary(resources));
    Ok(())
}

fn inherited_resources(doc: &Document, page_id: ObjectId) -> Dictionary {
    let mut current = Some(page_id);
    // Parent chains are shallow; the guard only protects against cycles in
    // malformed files.
    for _ in 0..64 {
        let Some(id) = current else { break };
        let Ok(dict) = doc.get_dictionary(id) else {
            break;
        };
        if let Ok(resources) = dict.get(b"Resources") {
            return resolve_dict(doc, resources);
        }
        current = dict
            .get(b"Parent")
            .ok()
            .and_then(|parent| parent.as_reference().ok());
    }
    Dictionary::new()
}

fn resolve_dict(doc: &Document, object: &Object) -> Dictionary {
    match object {
        Object::Dictionary(dict) => dict.clone(),
        Object::Reference(id) => doc
            .get_object(*id)
            .ok()
            .and_then(|resolved| resolved.as_dict().ok())
            .cloned()
            .unwrap_or_default(),
        _ => Dictionary::new(),
    }
}

/// Removes `Link` annotations whose rectangle overlaps any region box.
///
/// Other annotation subtypes survive even when they overlap; removals walk
/// the array in reverse so indices stay valid.
fn scrub_link_annotations(
    doc: &mut Document,
    page_id: ObjectId,
    regions: &[TranslatedRegion],
) -> Result<()> {
    let region_boxes: Vec<PdfBox> = regions.iter().map(|r| r.region.pdf_bbox).collect();

    enum Location {
        Inline,
        Referenced(ObjectId),
    }

    let (location, entries) = {
        let page = doc.get_dictionary(page_id)?;
        match page.get(b"Annots") {
            Ok(Object::Array(array)) => (Location::Inline, array.clone()),
            Ok(Object::Reference(id)) => {
                let array = doc
                    .get_object(*id)
                    .ok()
                    .and_then(|resolved| resolved.as_array().ok())
                    .cloned()
                    .unwrap_or_default();
                (Location::Referenced(*id), array)
            }
            _ => return Ok(()),
        }
    };

    let mut removals = Vec::new();
    for (index, entry) in entries.iter().enumerate() {
        let annotation = match entry {
            Object::Dictionary(dict) => Some(dict),
            Object::Reference(id) => doc
                .get_object(*id)
                .ok()
                .and_then(|resolved| resolved.as_dict().ok()),
            _ => None,
        };
        let Some(annotation) = annotation else {
            continue;
        };
        let is_link = matches!(
            annotation.get(b"Subtype"),
            Ok(Object::Name(name)) if name.as_slice() == b"Link"
        );
        if !is_link {
            continue;
        }
        let Some(rect) = annotation_rect(annotation) else {
            continue;
        };
        if region_boxes.iter().any(|region| region.overlaps(&rect)) {
            removals.push(index);
        }
    }

    if removals.is_empty() {
        return Ok(());
    }
    debug!("Removing {} overlapping link annotations", removals.len());

    match location {
        Location::Inline => {
            let page = doc.get_object_mut(page_id)?.as_dict_mut()?;
            if let Ok(Object::Array(array)) = page.get_mut(b"Annots") {
                for &index in removals.iter().rev() {
                    array.remove(index);
                }
            }
        }
        Location::Referenced(id) => {
            if let Ok(array) = doc.get_object_mut(id)?.as_array_mut() {
                for &index in removals.iter().rev() {
                    array.remove(index);
                }
            }
        }
    }
    Ok(())
}

fn annotation_rect(annotation: &Dictionary) -> Option<PdfBox> {
    let array = annotation.get(b"Rect").ok()?.as_array().ok()?;
    let numbers: Vec<f32> = array.iter().filter_map(object_number).collect();
    if numbers.len() != 4 {
        return None;
    }
    let (x0, x1) = (numbers[0].min(numbers[2]), numbers[0].max(numbers[2]));
    let (y0, y1) = (numbers[1].min(numbers[3]), numbers[1].max(numbers[3]));
    Some(PdfBox::new(x0, y0, x1 - x0, y1 - y0))
}

fn object_number(object: &Object) -> Option<f32> {
    match object {
        Object::Integer(value) => Some(*value as f32),
        Object::Real(value) => Some(*value),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::geometry::ImageBox;
    use crate::layout::LayoutBox;
    use crate::pdf::TextBlock;
    use crate::region::TranslatableRegion;

    fn region(label: LayoutLabel, sizes: &[f32], translated: &str) -> TranslatedRegion {
        let blocks: Vec<TextBlock> = sizes
            .iter()
            .map(|&font_size| TextBlock {
                text: "src".into(),
                x: 10.0,
                y: 10.0,
                width: 100.0,
                height: font_size,
                font_size,
                font_name: String::new(),
            })
            .collect();
        TranslatedRegion {
            region: TranslatableRegion {
                layout: LayoutBox {
                    bbox: ImageBox::new(0.0, 0.0, 100.0, 100.0),
                    label,
                    confidence: 0.9,
                },
                blocks,
                full_text: "src".into(),
                pdf_bbox: PdfBox::new(10.0, 10.0, 100.0, 50.0),
            },
            translated_text: translated.into(),
        }
    }

    #[test]
    fn body_size_is_median_of_body_blocks() {
        let regions = vec![
            region(LayoutLabel::PlainText, &[9.0, 10.0, 11.0], "a"),
            region(LayoutLabel::Title, &[24.0], "b"),
            region(LayoutLabel::FigureCaption, &[8.0, 12.0], "c"),
        ];
        // Body sizes: 9, 10, 11, 8, 12 -> sorted median 10; the title's 24
        // must not contribute.
        assert_eq!(uniform_body_size(&regions), 10.0);
    }

    #[test]
    fn body_size_falls_back_to_default() {
        let regions = vec![region(LayoutLabel::Title, &[24.0], "t")];
        assert_eq!(uniform_body_size(&regions), DEFAULT_BODY_SIZE);
    }

    #[test]
    fn title_size_is_mean_of_its_blocks() {
        let title = region(LayoutLabel::Title, &[20.0, 24.0], "t");
        assert_eq!(mean_block_size(&title), Some(22.0));
    }

    #[test]
    fn annotation_rect_normalizes_corner_order() {
        let mut dict = Dictionary::new();
        dict.set(
            "Rect",
            Object::Array(vec![
                Object::Real(100.0),
                Object::Real(200.0),
                Object::Integer(50),
                Object::Integer(150),
            ]),
        );
        let rect = annotation_rect(&dict).unwrap();
        assert_eq!(rect.x, 50.0);
        assert_eq!(rect.y, 150.0);
        assert_eq!(rect.width, 50.0);
        assert_eq!(rect.height, 50.0);
    }

    #[test]
    fn erasure_ops_form_a_saved_graphics_block() {
        let mut ops = Vec::new();
        push_erasure(&mut ops, &PdfBox::new(1.0, 2.0, 3.0, 4.0));
        let names: Vec<&str> = ops.iter().map(|op| op.operator.as_str()).collect();
        assert_eq!(names, ["q", "rg", "re", "f", "Q"]);
    }
}
