//! Letterbox preprocessing for the detector input.
//!
//! The model expects a square 1024x1024 input. Pages are resized with their
//! aspect ratio preserved and centered on a neutral gray canvas; the
//! parameters of that mapping are kept so detections can be mapped back
//! into source-image coordinates.

use ndarray::Array4;

/// Model input edge length in pixels.
pub const INPUT_SIZE: u32 = 1024;

/// Normalized fill value for the padding area (114 gray, YOLO convention).
const PAD_FILL: f32 = 114.0 / 255.0;

/// Parameters of one letterbox mapping: source image -> 1024x1024 canvas.
#[derive(Debug, Clone, Copy)]
pub struct Letterbox {
    /// Uniform resize factor `min(1024/W, 1024/H)`.
    pub scale: f32,
    /// Horizontal padding on the left edge.
    pub pad_x: u32,
    /// Vertical padding on the top edge.
    pub pad_y: u32,
    /// Resized content width.
    pub new_width: u32,
    /// Resized content height.
    pub new_height: u32,
}

impl Letterbox {
    /// Computes the mapping for a source image of `width` x `height`.
    pub fn fit(width: u32, height: u32) -> Self {
        let scale = (INPUT_SIZE as f32 / width as f32).min(INPUT_SIZE as f32 / height as f32);
        let new_width = (width as f32 * scale).round() as u32;
        let new_height = (height as f32 * scale).round() as u32;
        Self {
            scale,
            pad_x: (INPUT_SIZE - new_width) / 2,
            pad_y: (INPUT_SIZE - new_height) / 2,
            new_width,
            new_height,
        }
    }

    /// Builds the `[1, 3, 1024, 1024]` float tensor for a tightly packed
    /// RGB24 buffer, resampling by nearest neighbor and normalizing to
    /// `[0, 1]`.
    pub fn to_tensor(&self, rgb: &[u8], width: u32, height: u32) -> Array4<f32> {
        let size = INPUT_SIZE as usize;
        let mut tensor = Array4::<f32>::from_elem((1, 3, size, size), PAD_FILL);

        for out_y in 0..self.new_height {
            // Nearest-neighbor source row for this output row.
            let src_y = ((out_y as f32 / self.scale) as u32).min(height - 1);
            for out_x in 0..self.new_width {
                let src_x = ((out_x as f32 / self.scale) as u32).min(width - 1);
                let src = ((src_y * width + src_x) * 3) as usize;
                let ty = (self.pad_y + out_y) as usize;
                let tx = (self.pad_x + out_x) as usize;
                for channel in 0..3 {
                    tensor[[0, channel, ty, tx]] = rgb[src + channel] as f32 / 255.0;
                }
            }
        }

        tensor
    }

    /// Maps a point from model space back to source-image space.
    pub fn unmap_point(&self, x: f32, y: f32) -> (f32, f32) {
        (
            (x - self.pad_x as f32) / self.scale,
            (y - self.pad_y as f32) / self.scale,
        )
    }

    /// Maps a length from model space back to source-image space.
    pub fn unmap_len(&self, len: f32) -> f32 {
        len / self.scale
    }

    /// Maps a point from source-image space into model space.
    pub fn map_point(&self, x: f32, y: f32) -> (f32, f32) {
        (
            x * self.scale + self.pad_x as f32,
            y * self.scale + self.pad_y as f32,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn portrait_page_pads_horizontally() {
        // A4 page rasterized to 724x1024.
        let lb = Letterbox::fit(724, 1024);
        assert_eq!(lb.new_height, 1024);
        assert_eq!(lb.pad_y, 0);
        assert_eq!(lb.new_width, 724);
        assert_eq!(lb.pad_x, (1024 - 724) / 2);
    }

    #[test]
    fn forward_then_inverse_is_identity_within_a_pixel() {
        let lb = Letterbox::fit(800, 600);
        for &(x, y) in &[(0.0, 0.0), (400.0, 300.0), (799.0, 599.0)] {
            let (mx, my) = lb.map_point(x, y);
            let (bx, by) = lb.unmap_point(mx, my);
            assert!((bx - x).abs() < 1.0, "x drifted: {x} -> {bx}");
            assert!((by - y).abs() < 1.0, "y drifted: {y} -> {by}");
        }
    }

    #[test]
    fn tensor_shape_and_padding_fill() {
        let rgb = vec![255u8; 4 * 2 * 3];
        let lb = Letterbox::fit(4, 2);
        let tensor = lb.to_tensor(&rgb, 4, 2);
        assert_eq!(tensor.shape(), &[1, 3, 1024, 1024]);
        // Top-left corner is padding.
        assert!((tensor[[0, 0, 0, 0]] - 114.0 / 255.0).abs() < 1e-6);
        // Center of the content area is white.
        let cy = (lb.pad_y + lb.new_height / 2) as usize;
        let cx = (lb.pad_x + lb.new_width / 2) as usize;
        assert!((tensor[[0, 0, cy, cx]] - 1.0).abs() < 1e-6);
    }
}
