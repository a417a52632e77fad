//! Rasterizer abstraction.
//!
//! Drawing belongs to the host renderer. The editor only needs small raster
//! images of nodes: layer thumbnails and static snapshots of drawables the
//! clipboard cannot describe.

use crate::scene::{NodeId, SceneHost, StaticImage};
use thiserror::Error;

/// Rasterizer errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RasterError {
    #[error("Node not found: {0}")]
    NotFound(NodeId),
    #[error("Node {0} has nothing to draw")]
    EmptyBounds(NodeId),
    #[error("Render failed: {0}")]
    RenderFailed(String),
    #[error("PNG encoding failed: {0}")]
    Encode(String),
}

/// Result type for rasterizer operations.
pub type RasterResult<T> = Result<T, RasterError>;

/// An encoded PNG image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RasterImage {
    pub width: u32,
    pub height: u32,
    pub png: Vec<u8>,
}

impl RasterImage {
    /// Convert into a static image node payload with the given display size.
    pub fn to_static_image(&self, width: f64, height: f64) -> StaticImage {
        StaticImage::from_png(&self.png, self.width, self.height, width, height)
    }
}

/// Produces raster images of nodes and their descendants.
pub trait NodeRasterizer {
    /// Rasterize `id` so that its longer side is at most `max_size` pixels.
    fn rasterize(&self, host: &dyn SceneHost, id: NodeId, max_size: u32) -> RasterResult<RasterImage>;
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::cell::Cell;

    /// Rasterizer returning a fixed 1x1 image, failing for listed ids.
    #[derive(Default)]
    pub struct StubRasterizer {
        pub fail_for: Vec<NodeId>,
        pub calls: Cell<usize>,
    }

    impl NodeRasterizer for StubRasterizer {
        fn rasterize(&self, host: &dyn SceneHost, id: NodeId, _max_size: u32) -> RasterResult<RasterImage> {
            self.calls.set(self.calls.get() + 1);
            if self.fail_for.contains(&id) {
                return Err(RasterError::RenderFailed("stub".into()));
            }
            if !host.contains(id) {
                return Err(RasterError::NotFound(id));
            }
            Ok(RasterImage {
                width: 1,
                height: 1,
                png: vec![0x89, b'P', b'N', b'G'],
            })
        }
    }
}
