//! Axis-aligned rectangles in the two coordinate spaces the pipeline spans.
//!
//! Pages live in two worlds at once: the rasterized image (origin top-left,
//! pixel units) and the PDF itself (origin bottom-left, point units). Mixing
//! them up is the classic failure mode of this kind of pipeline, so the two
//! spaces get distinct types and every transform produces a new value.

/// A rectangle in image-pixel space: origin at the top-left of the page
/// raster, y growing downward.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImageBox {
    /// Left edge in pixels.
    pub x: f32,
    /// Top edge in pixels.
    pub y: f32,
    /// Width in pixels.
    pub width: f32,
    /// Height in pixels.
    pub height: f32,
}

impl ImageBox {
    /// Creates a new image-space rectangle.
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// True when the point lies inside the rectangle, inclusive on all
    /// four sides.
    pub fn contains(&self, px: f32, py: f32) -> bool {
        px >= self.x && px <= self.x + self.width && py >= self.y && py <= self.y + self.height
    }
}

/// A rectangle in PDF-point space: origin at the bottom-left of the page,
/// y growing upward.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PdfBox {
    /// Left edge in points.
    pub x: f32,
    /// Bottom edge in points.
    pub y: f32,
    /// Width in points.
    pub width: f32,
    /// Height in points.
    pub height: f32,
}

impl PdfBox {
    /// Creates a new PDF-space rectangle.
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// The smallest rectangle containing both `self` and `other`.
    pub fn union(&self, other: &PdfBox) -> PdfBox {
        let x0 = self.x.min(other.x);
        let y0 = self.y.min(other.y);
        let x1 = (self.x + self.width).max(other.x + other.width);
        let y1 = (self.y + self.height).max(other.y + other.height);
        PdfBox::new(x0, y0, x1 - x0, y1 - y0)
    }

    /// Returns the rectangle grown by `margin` on every side.
    pub fn expanded(&self, margin: f32) -> PdfBox {
        PdfBox::new(
            self.x - margin,
            self.y - margin,
            self.width + 2.0 * margin,
            self.height + 2.0 * margin,
        )
    }

    /// AABB overlap test with strict inequality on both axes: rectangles
    /// that merely touch do not overlap.
    pub fn overlaps(&self, other: &PdfBox) -> bool {
        self.x < other.x + other.width
            && self.x + self.width > other.x
            && self.y < other.y + other.height
            && self.y + self.height > other.y
    }
}

/// The bridge between a page's PDF-point space and its raster's image-pixel
/// space.
///
/// `scale` is points-to-pixels as reported by the rasterizer; `page_height`
/// is the page height in points at scale 1.0. One transform instance is
/// valid for exactly one page.
#[derive(Debug, Clone, Copy)]
pub struct PageTransform {
    /// Points-to-pixels scale factor.
    pub scale: f32,
    /// Page height in PDF points.
    pub page_height: f32,
}

impl PageTransform {
    /// Creates a transform for one page.
    pub fn new(scale: f32, page_height: f32) -> Self {
        Self { scale, page_height }
    }

    /// Maps a PDF-space rectangle (x, y = bottom-left corner) into image
    /// space (x, y = top-left corner).
    pub fn pdf_to_image(&self, rect: &PdfBox) -> ImageBox {
        ImageBox::new(
            rect.x * self.scale,
            (self.page_height - rect.y - rect.height) * self.scale,
            rect.width * self.scale,
            rect.height * self.scale,
        )
    }

    /// Image-space center of a PDF-space rectangle.
    pub fn image_center(&self, rect: &PdfBox) -> (f32, f32) {
        let img = self.pdf_to_image(rect);
        (img.x + img.width / 2.0, img.y + img.height / 2.0)
    }

    /// Inverse of [`PageTransform::pdf_to_image`].
    pub fn image_to_pdf(&self, rect: &ImageBox) -> PdfBox {
        PdfBox::new(
            rect.x / self.scale,
            self.page_height - rect.y / self.scale - rect.height / self.scale,
            rect.width / self.scale,
            rect.height / self.scale,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pdf_image_round_trip_is_identity() {
        let transform = PageTransform::new(1024.0 / 842.0, 842.0);
        let rect = PdfBox::new(72.0, 700.5, 451.0, 12.25);
        let back = transform.image_to_pdf(&transform.pdf_to_image(&rect));
        assert!((back.x - rect.x).abs() < 1e-3);
        assert!((back.y - rect.y).abs() < 1e-3);
        assert!((back.width - rect.width).abs() < 1e-3);
        assert!((back.height - rect.height).abs() < 1e-3);
    }

    #[test]
    fn transformed_block_stays_inside_raster() {
        // A block at y >= 0 must land with its bottom edge at or above the
        // raster's bottom edge.
        let scale = 1024.0 / 842.0;
        let transform = PageTransform::new(scale, 842.0);
        let rect = PdfBox::new(10.0, 0.0, 100.0, 20.0);
        let img = transform.pdf_to_image(&rect);
        assert!(img.y + img.height <= 842.0 * scale + 1e-3);
    }

    #[test]
    fn contains_is_inclusive_on_edges() {
        let b = ImageBox::new(10.0, 10.0, 100.0, 50.0);
        assert!(b.contains(10.0, 10.0));
        assert!(b.contains(110.0, 60.0));
        assert!(!b.contains(110.1, 60.0));
    }

    #[test]
    fn overlap_is_strict() {
        let a = PdfBox::new(0.0, 0.0, 10.0, 10.0);
        let touching = PdfBox::new(10.0, 0.0, 10.0, 10.0);
        let crossing = PdfBox::new(9.9, 9.9, 10.0, 10.0);
        assert!(!a.overlaps(&touching));
        assert!(a.overlaps(&crossing));
    }

    #[test]
    fn union_plus_margin() {
        let a = PdfBox::new(10.0, 10.0, 5.0, 5.0);
        let b = PdfBox::new(20.0, 8.0, 5.0, 5.0);
        let u = a.union(&b).expanded(2.0);
        assert_eq!(u.x, 8.0);
        assert_eq!(u.y, 6.0);
        assert_eq!(u.width, 19.0);
        assert_eq!(u.height, 11.0);
    }
}
