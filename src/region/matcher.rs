//! Matching layout detections against positioned text.
//!
//! Detections live in image-pixel space, text blocks in PDF-point space;
//! the matcher transforms each block's center into image space and assigns
//! it to every translatable detection that contains the center (inclusive
//! edges). Overlapping detections may therefore claim the same block;
//! downstream stages treat the resulting regions independently.

use std::cmp::Ordering;

use tracing::debug;

use crate::core::geometry::{PageTransform, PdfBox};
use crate::layout::LayoutBox;
use crate::pdf::TextBlock;
use crate::region::TranslatableRegion;

/// Margin added around the text-block union, in PDF points.
const BBOX_MARGIN: f32 = 2.0;

/// Line tolerance when a block reports no font size.
const DEFAULT_LINE_TOLERANCE: f32 = 10.0;

/// Intersects layout detections with text blocks for one page.
///
/// `page_height` is the page height in PDF points at scale 1.0; `scale` is
/// the rasterizer's points-to-pixels factor.
pub fn match_regions(
    layout_boxes: &[LayoutBox],
    text_blocks: &[TextBlock],
    page_height: f32,
    scale: f32,
) -> Vec<TranslatableRegion> {
    let transform = PageTransform::new(scale, page_height);
    let mut regions = Vec::new();

    for layout in layout_boxes {
        if !layout.label.is_translatable() {
            continue;
        }

        let mut blocks: Vec<TextBlock> = text_blocks
            .iter()
            .filter(|block| {
                let (cx, cy) = transform.image_center(&block.pdf_box());
                layout.bbox.contains(cx, cy)
            })
            .cloned()
            .collect();
        if blocks.is_empty() {
            continue;
        }

        sort_reading_order(&mut blocks, page_height);

        let full_text = blocks
            .iter()
            .map(|block| block.text.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        if full_text.trim().is_empty() {
            continue;
        }

        let pdf_bbox = block_union(&blocks).expanded(BBOX_MARGIN);
        regions.push(TranslatableRegion {
            layout: layout.clone(),
            blocks,
            full_text,
            pdf_bbox,
        });
    }

    debug!(
        "Matched {} regions from {} detections and {} text blocks",
        regions.len(),
        layout_boxes.len(),
        text_blocks.len()
    );
    regions
}

/// Sorts blocks top-to-bottom, left-to-right within a line.
///
/// Two blocks are on the same visual line when their top-down y positions
/// differ by less than the left block's font size (or a fixed tolerance
/// when the size is unknown).
fn sort_reading_order(blocks: &mut [TextBlock], page_height: f32) {
    blocks.sort_by(|a, b| {
        let a_y = page_height - a.y;
        let b_y = page_height - b.y;
        let tolerance = if a.font_size > 0.0 {
            a.font_size
        } else {
            DEFAULT_LINE_TOLERANCE
        };
        if (a_y - b_y).abs() < tolerance {
            a.x.partial_cmp(&b.x).unwrap_or(Ordering::Equal)
        } else {
            a_y.partial_cmp(&b_y).unwrap_or(Ordering::Equal)
        }
    });
}

fn block_union(blocks: &[TextBlock]) -> PdfBox {
    let mut union = blocks[0].pdf_box();
    for block in &blocks[1..] {
        union = union.union(&block.pdf_box());
    }
    union
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::geometry::ImageBox;
    use crate::layout::{LayoutBox, LayoutLabel};

    const PAGE_HEIGHT: f32 = 842.0;
    const SCALE: f32 = 1024.0 / 842.0;

    fn block(text: &str, x: f32, y: f32, width: f32, height: f32) -> TextBlock {
        TextBlock {
            text: text.into(),
            x,
            y,
            width,
            height,
            font_size: 10.0,
            font_name: String::new(),
        }
    }

    /// A layout box covering the PDF-space rect, in image pixels.
    fn detection(label: LayoutLabel, x: f32, y: f32, width: f32, height: f32) -> LayoutBox {
        LayoutBox {
            bbox: ImageBox::new(
                x * SCALE,
                (PAGE_HEIGHT - y - height) * SCALE,
                width * SCALE,
                height * SCALE,
            ),
            label,
            confidence: 0.9,
        }
    }

    #[test]
    fn blocks_inside_the_box_are_claimed() {
        let layout = [detection(LayoutLabel::PlainText, 50.0, 600.0, 300.0, 100.0)];
        let blocks = [
            block("inside", 60.0, 650.0, 100.0, 12.0),
            block("outside", 500.0, 100.0, 100.0, 12.0),
        ];
        let regions = match_regions(&layout, &blocks, PAGE_HEIGHT, SCALE);
        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].full_text, "inside");
    }

    #[test]
    fn adding_an_outside_block_changes_nothing() {
        let layout = [detection(LayoutLabel::PlainText, 50.0, 600.0, 300.0, 100.0)];
        let base = [block("body", 60.0, 650.0, 100.0, 12.0)];
        let with_noise = [
            block("body", 60.0, 650.0, 100.0, 12.0),
            block("far away", 10.0, 10.0, 40.0, 12.0),
        ];
        let a = match_regions(&layout, &base, PAGE_HEIGHT, SCALE);
        let b = match_regions(&layout, &with_noise, PAGE_HEIGHT, SCALE);
        assert_eq!(a.len(), b.len());
        assert_eq!(a[0].full_text, b[0].full_text);
    }

    #[test]
    fn non_translatable_classes_are_skipped() {
        let layout = [
            detection(LayoutLabel::Figure, 50.0, 600.0, 300.0, 100.0),
            detection(LayoutLabel::Abandon, 50.0, 600.0, 300.0, 100.0),
        ];
        let blocks = [block("caption text", 60.0, 650.0, 100.0, 12.0)];
        assert!(match_regions(&layout, &blocks, PAGE_HEIGHT, SCALE).is_empty());
    }

    #[test]
    fn overlapping_boxes_both_claim_a_shared_block() {
        let layout = [
            detection(LayoutLabel::PlainText, 50.0, 600.0, 300.0, 100.0),
            detection(LayoutLabel::FigureCaption, 40.0, 590.0, 320.0, 120.0),
        ];
        let blocks = [block("shared", 60.0, 650.0, 100.0, 12.0)];
        let regions = match_regions(&layout, &blocks, PAGE_HEIGHT, SCALE);
        assert_eq!(regions.len(), 2);
        assert!(regions.iter().all(|r| r.full_text == "shared"));
    }

    #[test]
    fn reading_order_is_line_aware() {
        let layout = [detection(LayoutLabel::PlainText, 0.0, 500.0, 500.0, 200.0)];
        // Second line sits 20 pt below the first; within a line the blocks
        // arrive right-to-left and must come back sorted by x.
        let blocks = [
            block("line2", 20.0, 620.0, 60.0, 12.0),
            block("world", 200.0, 648.0, 60.0, 12.0),
            block("hello", 20.0, 650.0, 60.0, 12.0),
        ];
        let regions = match_regions(&layout, &blocks, PAGE_HEIGHT, SCALE);
        assert_eq!(regions[0].full_text, "hello world line2");
    }

    #[test]
    fn bbox_is_union_of_blocks_plus_margin() {
        let layout = [detection(LayoutLabel::PlainText, 0.0, 500.0, 500.0, 200.0)];
        let blocks = [
            block("a", 100.0, 650.0, 50.0, 12.0),
            block("b", 160.0, 630.0, 80.0, 12.0),
        ];
        let regions = match_regions(&layout, &blocks, PAGE_HEIGHT, SCALE);
        let bbox = regions[0].pdf_bbox;
        assert_eq!(bbox.x, 98.0);
        assert_eq!(bbox.y, 628.0);
        assert_eq!(bbox.width, 240.0 - 100.0 + 4.0);
        assert_eq!(bbox.height, 662.0 - 630.0 + 4.0);
    }

    #[test]
    fn whitespace_only_blocks_produce_no_region() {
        // The extractor never emits these, but the matcher guards anyway.
        let layout = [detection(LayoutLabel::PlainText, 50.0, 600.0, 300.0, 100.0)];
        let blocks = [block(" ", 60.0, 650.0, 100.0, 12.0)];
        assert!(match_regions(&layout, &blocks, PAGE_HEIGHT, SCALE).is_empty());
    }
}
