//! Pixel buffers and PNG output.

use kurbo::Rect;
use lessonboard_core::raster::RasterError;
use peniko::Color;
use thiserror::Error;
use tiny_skia::{Paint, Pixmap, Transform};

/// Renderer errors.
#[derive(Debug, Error)]
pub enum RendererError {
    #[error("Render failed: {0}")]
    RenderFailed(String),
    #[error("PNG encoding failed: {0}")]
    Encode(String),
}

impl From<RendererError> for RasterError {
    fn from(err: RendererError) -> Self {
        match err {
            RendererError::RenderFailed(msg) => RasterError::RenderFailed(msg),
            RendererError::Encode(msg) => RasterError::Encode(msg),
        }
    }
}

/// Result type for renderer operations.
pub type RenderResult<T> = Result<T, RendererError>;

/// An RGBA raster target.
#[derive(Debug, Clone)]
pub struct PixelBuffer {
    pixmap: Pixmap,
}

impl PixelBuffer {
    /// A fully transparent buffer. Fails for a zero-sized one.
    pub fn new(width: u32, height: u32) -> RenderResult<Self> {
        let pixmap = Pixmap::new(width, height).ok_or_else(|| {
            RendererError::RenderFailed(format!("invalid buffer size {}x{}", width, height))
        })?;
        Ok(Self { pixmap })
    }

    pub fn width(&self) -> u32 {
        self.pixmap.width()
    }

    pub fn height(&self) -> u32 {
        self.pixmap.height()
    }

    /// Straight-alpha RGBA of one pixel.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        let color = self.pixmap.pixel(x, y)?.demultiply();
        Some([color.red(), color.green(), color.blue(), color.alpha()])
    }

    /// Composite `color` over `rect` (pixel coordinates). Parts outside the
    /// buffer are clipped.
    pub fn fill_rect(&mut self, rect: Rect, color: Color) {
        let rgba = color.to_rgba8();
        if rgba.a == 0 {
            return;
        }
        let Some(rect) = tiny_skia::Rect::from_ltrb(
            rect.x0 as f32,
            rect.y0 as f32,
            rect.x1 as f32,
            rect.y1 as f32,
        ) else {
            log::debug!("Skipping degenerate fill {:?}", rect);
            return;
        };
        let mut paint = Paint::default();
        paint.set_color_rgba8(rgba.r, rgba.g, rgba.b, rgba.a);
        paint.anti_alias = false;
        self.pixmap.fill_rect(rect, &paint, Transform::identity(), None);
    }

    /// Encode as an 8-bit RGBA PNG.
    pub fn encode_png(&self) -> RenderResult<Vec<u8>> {
        self.pixmap
            .encode_png()
            .map_err(|e| RendererError::Encode(e.to_string()))
    }
}
