//! Lessonboard Render Library
//!
//! Headless stand-in for the host renderer: paints node silhouettes into tiny-skia
//! pixmaps and encodes them as PNG for layer thumbnails and clipboard
//! snapshots.

mod renderer;
mod silhouette;

pub use renderer::{PixelBuffer, RenderResult, RendererError};
pub use silhouette::SilhouetteRasterizer;
