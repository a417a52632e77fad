//! Lessonboard Core Library
//!
//! Platform-agnostic object model for the Lessonboard canvas editor: the scene
//! graph contract, the anchored transform engine, the clipboard and the layer
//! panel.

pub mod clipboard;
pub mod config;
pub mod editor;
pub mod events;
pub mod history;
pub mod layers;
pub mod raster;
pub mod scene;
pub mod scheduler;
pub mod selection;
pub mod tools;
pub mod transform;

pub use clipboard::{Clipboard, ClipboardError, CopyReport, NodeDescriptor, PasteReport};
pub use config::{ConfigError, EditorConfig};
pub use editor::{Editor, EditorError, EditorResult};
pub use events::{ClipboardEvent, SceneEvent};
pub use history::{History, HistoryEntry, MAX_UNDO_HISTORY};
pub use layers::{DropMode, LayerController, LayerError, LayerTree};
pub use raster::{NodeRasterizer, RasterError, RasterImage};
pub use scene::{MediaHost, Node, NodeId, NodeKind, Scene, SceneError, SceneHost};
pub use selection::{HighlightState, Selection};
pub use tools::ToolKind;
pub use transform::{ResizeConstraints, ResizeHandle, TransformError, TransformReport};
