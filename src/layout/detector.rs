//! Layout detection over page rasters.
//!
//! The detector feeds a letterboxed page image to the model and decodes
//! whichever output head the export carries: an already-filtered
//! `[1, N, 6]` post-NMS tensor, or a raw YOLO head with per-class scores.
//! Decoding is a pure function over the output buffer so it can be tested
//! without a model file.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use ort::value::Value;
use tracing::debug;

use crate::core::errors::{Result, TranslateError};
use crate::core::geometry::ImageBox;
use crate::layout::labels::LayoutLabel;
use crate::layout::letterbox::Letterbox;
use crate::layout::session::{self, LayoutSession};
use crate::pdf::raster::PageRaster;

/// Minimum confidence for a detection to be kept.
pub const CONFIDENCE_THRESHOLD: f32 = 0.25;

/// One layout detection in image-pixel space.
#[derive(Debug, Clone)]
pub struct LayoutBox {
    /// Detection rectangle in source-image coordinates.
    pub bbox: ImageBox,
    /// Predicted document-structural class.
    pub label: LayoutLabel,
    /// Model confidence in `[0.25, 1]`.
    pub confidence: f32,
}

/// Document layout detector bound to one model file.
pub struct LayoutDetector {
    session: Arc<LayoutSession>,
}

impl LayoutDetector {
    /// Loads (or reuses) the inference session for `model_path`.
    pub fn load(model_path: &Path) -> Result<Self> {
        Ok(Self {
            session: session::session_for(model_path)?,
        })
    }

    /// Detects layout boxes on one page raster.
    pub fn detect(&self, raster: &PageRaster) -> Result<Vec<LayoutBox>> {
        let start = Instant::now();
        let letterbox = Letterbox::fit(raster.width, raster.height);
        let tensor = letterbox.to_tensor(&raster.rgb, raster.width, raster.height);

        let (dims, data) = self.session.run(|session| {
            let input = Value::from_array(tensor).map_err(TranslateError::Session)?;
            let outputs = session
                .run(ort::inputs![self.session.input_name() => input])
                .map_err(TranslateError::Session)?;
            let (shape, data) = outputs[0]
                .try_extract_tensor::<f32>()
                .map_err(TranslateError::Session)?;
            let dims: Vec<usize> = shape.iter().map(|&d| d as usize).collect();
            Ok((dims, data.to_vec()))
        })?;

        let boxes = decode_output(&dims, &data, &letterbox)?;
        debug!(
            "Detected {} layout boxes in {:.2}ms",
            boxes.len(),
            start.elapsed().as_secs_f64() * 1000.0
        );
        Ok(boxes)
    }
}

/// Decodes a detector output tensor into image-space layout boxes.
///
/// Shapes handled:
/// - `[1, N, 6]` post-NMS rows `[x1, y1, x2, y2, conf, class_id]`;
/// - raw YOLO `[1, 4 + C, N]` (transposed) or `[1, N, 4 + C]` with
///   `[cx, cy, w, h, class_scores...]` rows. The head is `[1, F, N]` when
///   the second dimension is small (at most 20) and the third is larger,
///   since candidate counts dwarf the class count.
///
/// No NMS runs on the raw branch; exports are expected to ship the NMS op,
/// the raw path is a fallback.
pub(crate) fn decode_output(
    dims: &[usize],
    data: &[f32],
    letterbox: &Letterbox,
) -> Result<Vec<LayoutBox>> {
    if dims.len() != 3 {
        return Err(TranslateError::InferenceFailed {
            message: format!("unexpected output rank {} (dims {dims:?})", dims.len()),
        });
    }

    if dims[2] == 6 {
        return Ok(decode_post_nms(dims[1], data, letterbox));
    }

    let (rows, cols) = (dims[1], dims[2]);
    let transposed = cols > rows && rows <= 20;
    let (detections, features) = if transposed { (cols, rows) } else { (rows, cols) };
    if features < 5 {
        return Err(TranslateError::InferenceFailed {
            message: format!("raw output with {features} features per detection"),
        });
    }

    let field = |det: usize, feature: usize| -> f32 {
        if transposed {
            data[feature * detections + det]
        } else {
            data[det * features + feature]
        }
    };

    let num_classes = features - 4;
    let mut boxes = Vec::new();
    for det in 0..detections {
        let mut confidence = 0.0f32;
        let mut class_id = 0usize;
        for class in 0..num_classes {
            let score = field(det, 4 + class);
            if score > confidence {
                confidence = score;
                class_id = class;
            }
        }
        if confidence < CONFIDENCE_THRESHOLD {
            continue;
        }

        let cx = field(det, 0);
        let cy = field(det, 1);
        let w = field(det, 2);
        let h = field(det, 3);
        boxes.push(make_box(
            cx - w / 2.0,
            cy - h / 2.0,
            w,
            h,
            confidence,
            class_id,
            letterbox,
        ));
    }
    Ok(boxes)
}

fn decode_post_nms(count: usize, data: &[f32], letterbox: &Letterbox) -> Vec<LayoutBox> {
    let mut boxes = Vec::new();
    for det in 0..count {
        let row = &data[det * 6..det * 6 + 6];
        let confidence = row[4];
        if confidence < CONFIDENCE_THRESHOLD {
            continue;
        }
        boxes.push(make_box(
            row[0],
            row[1],
            row[2] - row[0],
            row[3] - row[1],
            confidence,
            row[5] as usize,
            letterbox,
        ));
    }
    boxes
}

fn make_box(
    x_model: f32,
    y_model: f32,
    w_model: f32,
    h_model: f32,
    confidence: f32,
    class_id: usize,
    letterbox: &Letterbox,
) -> LayoutBox {
    let (x, y) = letterbox.unmap_point(x_model, y_model);
    LayoutBox {
        bbox: ImageBox::new(
            x.max(0.0),
            y.max(0.0),
            letterbox.unmap_len(w_model),
            letterbox.unmap_len(h_model),
        ),
        label: LayoutLabel::from_class_id(class_id),
        confidence,
    }
}
