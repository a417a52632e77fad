//! Layer panel: a filtered, editable view of the scene graph.

mod classify;
mod controller;
mod thumbnails;
mod tree;

pub use classify::LayerFilter;
pub use controller::{DropMode, LayerController, LayerError, LayerResult};
pub use thumbnails::{RenderedRow, Thumbnail, ThumbnailCache, render_rows};
pub use tree::{LayerNode, LayerRow, LayerTree};
