//! Notifications exchanged between the host and the editor subsystems.

use crate::scene::NodeId;
use crate::tools::ToolKind;

/// Change notifications emitted by the scene host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SceneEvent {
    NodeAdded(NodeId),
    NodeRemoved(NodeId),
    NodeUpdated(NodeId),
    ToolChanged(ToolKind),
}

impl SceneEvent {
    /// Whether the event may change what a node looks like or where it sits.
    pub fn touches_nodes(&self) -> bool {
        !matches!(self, SceneEvent::ToolChanged(_))
    }
}

/// Notifications emitted by the clipboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClipboardEvent {
    /// Emitted after copy, cut, paste and clear.
    StateChanged {
        has_clipboard: bool,
        /// Number of nodes created, for paste notifications.
        pasted: Option<usize>,
    },
}
