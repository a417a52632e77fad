//! Lazily rendered layer thumbnails.

use super::tree::LayerRow;
use crate::raster::{NodeRasterizer, RasterImage};
use crate::scene::{NodeId, SceneHost};
use std::collections::HashMap;

/// A row icon: a rendered image, or the stand-in used when rendering failed.
#[derive(Debug, Clone, PartialEq)]
pub enum Thumbnail {
    Image(RasterImage),
    Placeholder,
}

impl Thumbnail {
    pub fn is_placeholder(&self) -> bool {
        matches!(self, Thumbnail::Placeholder)
    }
}

/// Thumbnails keyed by node id. Invalidated as a whole on any node change.
#[derive(Debug, Clone)]
pub struct ThumbnailCache {
    size: u32,
    entries: HashMap<NodeId, Thumbnail>,
}

impl ThumbnailCache {
    pub fn new(size: u32) -> Self {
        Self {
            size,
            entries: HashMap::new(),
        }
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_cached(&self, id: NodeId) -> bool {
        self.entries.contains_key(&id)
    }

    /// The thumbnail for `id`, rendering it on first request.
    pub fn get(
        &mut self,
        host: &dyn SceneHost,
        rasterizer: &dyn NodeRasterizer,
        id: NodeId,
    ) -> &Thumbnail {
        let size = self.size;
        self.entries.entry(id).or_insert_with(|| {
            match rasterizer.rasterize(host, id, size) {
                Ok(image) => Thumbnail::Image(image),
                Err(err) => {
                    log::warn!("Thumbnail for {} failed: {}", id, err);
                    Thumbnail::Placeholder
                }
            }
        })
    }

    pub fn invalidate_all(&mut self) {
        if !self.entries.is_empty() {
            log::debug!("Dropping {} cached thumbnails", self.entries.len());
        }
        self.entries.clear();
    }
}

/// A layer row together with its icon.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedRow {
    pub row: LayerRow,
    pub thumbnail: Thumbnail,
}

/// Attach thumbnails to rows. A failing node gets a placeholder and the
/// remaining rows still render.
pub fn render_rows(
    cache: &mut ThumbnailCache,
    host: &dyn SceneHost,
    rasterizer: &dyn NodeRasterizer,
    rows: Vec<LayerRow>,
) -> Vec<RenderedRow> {
    rows.into_iter()
        .map(|row| {
            let thumbnail = cache.get(host, rasterizer, row.id).clone();
            RenderedRow { row, thumbnail }
        })
        .collect()
}
