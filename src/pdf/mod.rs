//! PDF input and output.
//!
//! Reading goes through PDFium (rasterization and positioned-text
//! extraction); writing re-emits the original document with lopdf, overlaying
//! erasure rectangles and translated glyphs in an embedded font.

pub mod font;
pub mod raster;
pub mod text;
pub mod writer;

pub use raster::{bind_pdfium, PageRaster};
pub use text::TextBlock;
