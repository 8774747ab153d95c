//! Translatable regions: layout detections paired with the positioned text
//! that lies inside them.

pub mod matcher;

use std::collections::BTreeMap;

use crate::core::geometry::PdfBox;
use crate::layout::LayoutBox;
use crate::pdf::TextBlock;

pub use matcher::match_regions;

/// A layout detection together with the text blocks whose centers fall
/// inside it, in reading order.
#[derive(Debug, Clone)]
pub struct TranslatableRegion {
    /// The detection that claimed the text.
    pub layout: LayoutBox,
    /// Matched text blocks, in reading order; never empty.
    pub blocks: Vec<TextBlock>,
    /// Space-joined text of the blocks; never empty after trim.
    pub full_text: String,
    /// Tight PDF-point union of the matched blocks with a 2 pt margin.
    ///
    /// Computed from the text blocks, not the detector box: this keeps
    /// erasure rectangles aligned with the real ink under the text.
    pub pdf_bbox: PdfBox,
}

/// A region plus its translation. An empty translation still gets an
/// erasure rectangle, just no glyphs.
#[derive(Debug, Clone)]
pub struct TranslatedRegion {
    /// The matched source region.
    pub region: TranslatableRegion,
    /// Target-language text; may be empty.
    pub translated_text: String,
}

/// Translated regions per zero-based page index. Pages the caller did not
/// select do not appear.
pub type PageRegions = BTreeMap<usize, Vec<TranslatedRegion>>;
