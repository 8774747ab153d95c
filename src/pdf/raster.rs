//! Page rasterization via PDFium.
//!
//! Every page is rendered at a fixed longest-side budget that matches the
//! detector's input resolution, keeping rasterization cost linear in page
//! count. The points-to-pixels scale of each render is the sole bridge
//! between PDF-point space and image-pixel space for that page and is
//! returned alongside the buffer.

use pdfium_render::prelude::*;
use tracing::debug;

use crate::core::errors::{Result, TranslateError};

/// Longest-side pixel budget for page rasters.
pub const RASTER_BUDGET: u32 = 1024;

/// One rendered page: tightly packed RGB24, row-major, top-left origin.
#[derive(Debug, Clone)]
pub struct PageRaster {
    /// Pixel data, `width * height * 3` bytes.
    pub rgb: Vec<u8>,
    /// Raster width in pixels.
    pub width: u32,
    /// Raster height in pixels.
    pub height: u32,
    /// Points-to-pixels scale: `1024 / max(page_width, page_height)`.
    pub scale: f32,
}

/// Binds to the PDFium library, preferring a copy next to the executable and
/// falling back through the usual system locations.
pub fn bind_pdfium() -> Result<Pdfium> {
    let bindings = Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
        .or_else(|_| Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("/usr/lib")))
        .or_else(|_| {
            Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("/usr/local/lib"))
        })
        .or_else(|_| {
            Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("/opt/homebrew/lib"))
        })
        .or_else(|_| Pdfium::bind_to_system_library())
        .map_err(|e| TranslateError::asset("pdfium", format!("could not bind library: {e}")))?;
    Ok(Pdfium::new(bindings))
}

/// Renders one page to an RGB buffer at the fixed longest-side budget.
///
/// `page_number` is one-based and used only for error reporting.
pub fn rasterize(page: &PdfPage, page_number: usize) -> Result<PageRaster> {
    let page_width = page.width().value;
    let page_height = page.height().value;
    let scale = RASTER_BUDGET as f32 / page_width.max(page_height);
    let width = (page_width * scale).floor() as u32;
    let height = (page_height * scale).floor() as u32;

    let render_config = PdfRenderConfig::new()
        .set_target_width(width as i32)
        .set_target_height(height as i32);

    let bitmap = page
        .render_with_config(&render_config)
        .map_err(|e| TranslateError::RenderFailed {
            page: page_number,
            message: e.to_string(),
        })?;

    let image = bitmap.as_image().to_rgb8();
    let (width, height) = (image.width(), image.height());
    debug!("Rasterized page {page_number} to {width}x{height} (scale {scale:.4})");

    Ok(PageRaster {
        rgb: image.into_raw(),
        width,
        height,
        scale,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scale_law_for_portrait_a4() {
        // 595 x 842 pt page: height is the long side.
        let (w, h) = (595.0f32, 842.0f32);
        let scale = RASTER_BUDGET as f32 / w.max(h);
        let width = (w * scale).floor() as u32;
        let height = (h * scale).floor() as u32;
        assert_eq!(height, 1024);
        assert_eq!(width, ((595.0 * 1024.0 / 842.0) as f32).floor() as u32);
        assert_eq!(width.max(height), RASTER_BUDGET);
    }

    #[test]
    fn scale_law_for_landscape() {
        let (w, h) = (842.0f32, 595.0f32);
        let scale = RASTER_BUDGET as f32 / w.max(h);
        assert_eq!((w * scale).floor() as u32, 1024);
        assert!(((h * scale).floor() as u32) < 1024);
    }
}
