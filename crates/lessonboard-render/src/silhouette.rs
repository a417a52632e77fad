//! Flat-colour rasterizer for thumbnails and snapshots.
//!
//! Each drawable in the subtree is painted as its world-space bounding box in
//! a colour taken from its content. Good enough for a layer icon; real
//! drawing belongs to the host renderer.

use crate::renderer::PixelBuffer;
use kurbo::{Affine, Rect};
use lessonboard_core::raster::{NodeRasterizer, RasterError, RasterImage, RasterResult};
use lessonboard_core::scene::{Node, NodeContent, NodeId, SceneHost, walk};
use peniko::Color;

/// Rasterizes nodes as filled bounding-box silhouettes.
#[derive(Debug, Clone, Default)]
pub struct SilhouetteRasterizer {
    /// Painted under the content. None leaves the background transparent.
    pub background: Option<Color>,
}

impl SilhouetteRasterizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_background(mut self, color: Color) -> Self {
        self.background = Some(color);
        self
    }

    /// Paint `id` and its descendants into a buffer whose longer side is
    /// `max_size` pixels.
    pub fn render(
        &self,
        host: &dyn SceneHost,
        id: NodeId,
        max_size: u32,
    ) -> RasterResult<PixelBuffer> {
        if max_size == 0 {
            return Err(RasterError::RenderFailed("zero output size".into()));
        }
        if !host.contains(id) {
            return Err(RasterError::NotFound(id));
        }
        let bounds = host
            .world_bounds(id)
            .filter(|b| b.width() > 0.0 || b.height() > 0.0)
            .ok_or(RasterError::EmptyBounds(id))?;

        let scale = f64::from(max_size) / bounds.width().max(bounds.height());
        let width = ((bounds.width() * scale).ceil() as u32).clamp(1, max_size);
        let height = ((bounds.height() * scale).ceil() as u32).clamp(1, max_size);
        let to_pixels = Affine::scale(scale) * Affine::translate(-bounds.origin().to_vec2());

        let mut buffer = PixelBuffer::new(width, height)?;
        if let Some(background) = self.background {
            buffer.fill_rect(
                Rect::new(0.0, 0.0, f64::from(width), f64::from(height)),
                background,
            );
        }

        let mut painted = 0;
        for visit in walk(host, id, host.limits()) {
            let Some(node) = host.get(visit.id) else { continue };
            if !node.visible || node.transient {
                continue;
            }
            let (Some(local), Some(color)) = (node.local_bounds(), silhouette_color(node)) else {
                continue;
            };
            let world = host.world_transform(visit.id).transform_rect_bbox(local);
            let mut pixels = to_pixels.transform_rect_bbox(world);
            // Keep hairlines visible.
            if pixels.width() < 1.0 {
                pixels = pixels.with_size((1.0, pixels.height()));
            }
            if pixels.height() < 1.0 {
                pixels = pixels.with_size((pixels.width(), 1.0));
            }
            buffer.fill_rect(pixels, color);
            painted += 1;
        }
        log::debug!(
            "Rasterized {} silhouette(s) for {} at {}x{}",
            painted,
            id,
            width,
            height
        );
        Ok(buffer)
    }
}

impl NodeRasterizer for SilhouetteRasterizer {
    fn rasterize(&self, host: &dyn SceneHost, id: NodeId, max_size: u32) -> RasterResult<RasterImage> {
        let buffer = self.render(host, id, max_size)?;
        let png = buffer.encode_png()?;
        Ok(RasterImage {
            width: buffer.width(),
            height: buffer.height(),
            png,
        })
    }
}

/// The colour a node's silhouette is painted in, with its opacity applied.
fn silhouette_color(node: &Node) -> Option<Color> {
    let base: Color = match &node.content {
        NodeContent::Text(text) => text.style.color.into(),
        NodeContent::Shape(shape) => shape.fill.or(shape.stroke.as_ref().map(|s| s.color))?.into(),
        NodeContent::PenPath(path) => path.fill.unwrap_or(path.stroke.color).into(),
        NodeContent::Brush(brush) => brush.color.into(),
        NodeContent::Table(table) => table.settings.border.color.into(),
        NodeContent::Graphics(graphics) => graphics.color.into(),
        NodeContent::Media(_) => Color::from_rgba8(40, 40, 48, 255),
        NodeContent::Image(_) => Color::from_rgba8(160, 160, 168, 255),
        NodeContent::Group | NodeContent::Scene | NodeContent::Helper(_) => return None,
    };
    let rgba = base.to_rgba8();
    let alpha = (f64::from(rgba.a) * node.visual.alpha.clamp(0.0, 1.0)).round() as u8;
    Some(Color::from_rgba8(rgba.r, rgba.g, rgba.b, alpha))
}
