//! Tool system for the editor.

use crate::scene::NodeKind;
use serde::{Deserialize, Serialize};

/// Available tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ToolKind {
    #[default]
    Select,
    Pan,
    Text,
    Shape,
    Pen,
    Brush,
    Table,
    Media,
}

impl ToolKind {
    /// The node kind this tool creates, if it creates one.
    pub fn creates(self) -> Option<NodeKind> {
        match self {
            ToolKind::Select | ToolKind::Pan => None,
            ToolKind::Text => Some(NodeKind::Text),
            ToolKind::Shape => Some(NodeKind::VectorShape),
            ToolKind::Pen => Some(NodeKind::PenPath),
            ToolKind::Brush => Some(NodeKind::BrushStroke),
            ToolKind::Table => Some(NodeKind::Table),
            ToolKind::Media => Some(NodeKind::Media),
        }
    }
}
