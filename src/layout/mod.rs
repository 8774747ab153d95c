//! Document layout detection.
//!
//! A DocLayout-YOLO ONNX export classifies rectangular regions of a page
//! raster into ten document-structural classes. The module owns the
//! process-wide inference session, the letterbox preprocessing that feeds
//! it, and the decoding of both output formats the export may produce.

pub mod detector;
pub mod labels;
pub mod letterbox;
pub mod session;

pub use detector::{LayoutBox, LayoutDetector};
pub use labels::LayoutLabel;
pub use letterbox::Letterbox;
