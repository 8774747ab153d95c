//! Layout-preserving PDF translation.
//!
//! This crate translates PDF documents into a target language while keeping
//! the visual layout of every page intact: titles stay in heading positions,
//! paragraphs stay in their columns, captions stay under their figures.
//!
//! The pipeline for one document:
//!
//! 1. Rasterize each page to a fixed-budget RGB image ([`pdf::raster`]).
//! 2. Detect document structure with a DocLayout-YOLO ONNX model ([`layout`]).
//! 3. Extract the embedded text with its PDF-point positions ([`pdf::text`]).
//! 4. Match detections against text blocks in a common coordinate space and
//!    assemble translatable regions ([`region`]).
//! 5. Translate region texts in batches ([`translator`]).
//! 6. Rewrite the PDF: white erasure rectangles over the original ink, then
//!    freshly drawn translated glyphs in an embedded CJK-capable font
//!    ([`pdf::writer`]).
//!
//! [`pipeline::translate_pdf`] sequences the stages, emits progress events,
//! and honors cooperative cancellation.

pub mod core;
pub mod layout;
pub mod pdf;
pub mod pipeline;
pub mod region;
pub mod translator;

pub use crate::core::errors::{Result, TranslateError};
pub use crate::core::progress::{CancelFlag, ProgressEvent};
pub use crate::core::settings::{AppSettings, TranslatorKind};
pub use crate::pipeline::{PipelineAssets, TranslateOutcome, TranslateRequest};
pub use crate::translator::TranslatorUsage;
