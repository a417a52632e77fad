//! Telling authored content apart from transient UI nodes.

use crate::config::LayerConfig;
use crate::scene::{Node, NodeKind};

/// Decides which nodes appear in the layer tree.
#[derive(Debug, Clone)]
pub struct LayerFilter {
    denylist: Vec<String>,
    overlay_z_threshold: i32,
    min_alpha: f64,
}

impl Default for LayerFilter {
    fn default() -> Self {
        Self::new(&LayerConfig::default())
    }
}

impl LayerFilter {
    pub fn new(config: &LayerConfig) -> Self {
        Self {
            denylist: config.denylist.iter().map(|s| s.to_lowercase()).collect(),
            overlay_z_threshold: config.overlay_z_threshold,
            min_alpha: config.min_alpha,
        }
    }

    /// Whether the name marks a transient UI node.
    pub fn is_denylisted(&self, name: &str) -> bool {
        let name = name.to_lowercase();
        self.denylist.iter().any(|entry| name.contains(entry.as_str()))
    }

    /// Whether `node` is authored content. `parent` is the node it is
    /// attached to, if any.
    pub fn is_real(&self, node: &Node, parent: Option<&Node>) -> bool {
        if node.transient
            || node.kind() == NodeKind::Helper
            || node.z_index > self.overlay_z_threshold
            || node.visual.alpha < self.min_alpha
        {
            return false;
        }
        if node.name.as_deref().is_some_and(|name| self.is_denylisted(name)) {
            return false;
        }
        // Table cells are drawn by the table.
        if parent.is_some_and(|p| p.kind() == NodeKind::Table) {
            return false;
        }

        match node.kind() {
            NodeKind::Graphics => {
                let drawn = node
                    .local_bounds()
                    .is_some_and(|b| b.width() > 0.0 && b.height() > 0.0);
                let in_scene = parent.is_some_and(|p| p.kind() == NodeKind::Scene);
                drawn || node.name.is_some() || in_scene
            }
            kind => kind.is_tool_kind(),
        }
    }
}
