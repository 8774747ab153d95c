//! Positioned text extraction.
//!
//! Each text object on a page becomes one [`TextBlock`] carrying the string,
//! its PDF-point position and an approximate extent. Exact glyph metrics are
//! not needed downstream: only the union bounding box and the center-point
//! containment test depend on the extents, so the width falls back to a
//! font-size heuristic when PDFium cannot produce object bounds.

use pdfium_render::prelude::*;
use tracing::debug;

use crate::core::errors::Result;
use crate::core::geometry::PdfBox;

/// One positioned text run in PDF-point space (origin bottom-left).
#[derive(Debug, Clone)]
pub struct TextBlock {
    /// Text content; never empty or whitespace-only.
    pub text: String,
    /// Left edge of the run's baseline box.
    pub x: f32,
    /// Bottom edge of the run's baseline box.
    pub y: f32,
    /// Run width in points.
    pub width: f32,
    /// Run height in points.
    pub height: f32,
    /// Effective font size in points.
    pub font_size: f32,
    /// Reported font family, empty when unavailable.
    pub font_name: String,
}

impl TextBlock {
    /// The block's rectangle in PDF-point space.
    pub fn pdf_box(&self) -> PdfBox {
        PdfBox::new(self.x, self.y, self.width, self.height)
    }
}

/// Extracts every non-empty text object of a page.
///
/// The object's transform `[a b c d e f]` supplies position and size:
/// `x = e`, `y = f`, `font_size = max(|a|, |d|)`. Width and height come from
/// the object bounds when PDFium can compute them, otherwise
/// `0.5 * font_size` per character and one font size of height.
pub fn extract_blocks(page: &PdfPage) -> Result<Vec<TextBlock>> {
    let mut blocks = Vec::new();

    for object in page.objects().iter() {
        let Some(text_object) = object.as_text_object() else {
            continue;
        };
        let text = text_object.text();
        if text.trim().is_empty() {
            continue;
        }

        let (x, y, font_size) = match object.matrix() {
            Ok(matrix) => (matrix.e(), matrix.f(), matrix.a().abs().max(matrix.d().abs())),
            Err(_) => (0.0, 0.0, 0.0),
        };

        let (width, height) = match object.bounds() {
            Ok(bounds) => (bounds.width().value, bounds.height().value),
            Err(_) => (text.chars().count() as f32 * font_size * 0.5, font_size),
        };

        blocks.push(TextBlock {
            font_name: text_object.font().family(),
            text,
            x,
            y,
            width,
            height,
            font_size,
        });
    }

    debug!("Extracted {} text blocks", blocks.len());
    Ok(blocks)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pdf_box_mirrors_block_fields() {
        let block = TextBlock {
            text: "Figure 1".into(),
            x: 72.0,
            y: 140.5,
            width: 80.0,
            height: 11.0,
            font_size: 10.0,
            font_name: "Times".into(),
        };
        let rect = block.pdf_box();
        assert_eq!(rect.x, 72.0);
        assert_eq!(rect.y, 140.5);
        assert_eq!(rect.width, 80.0);
        assert_eq!(rect.height, 11.0);
    }
}
