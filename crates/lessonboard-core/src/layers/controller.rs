//! Keeps the layer tree in sync with the scene and applies panel drops.

use super::classify::LayerFilter;
use super::thumbnails::{RenderedRow, ThumbnailCache, render_rows};
use super::tree::LayerTree;
use crate::config::LayerConfig;
use crate::events::SceneEvent;
use crate::history::HistoryEntry;
use crate::raster::NodeRasterizer;
use crate::scene::{NodeId, SceneError, SceneHost, TraversalLimits, is_ancestor};
use crate::scheduler::Debouncer;
use thiserror::Error;

#[cfg(not(target_arch = "wasm32"))]
use std::time::{Duration, Instant};

#[cfg(target_arch = "wasm32")]
use web_time::{Duration, Instant};

/// Layer panel errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LayerError {
    #[error("Dropping {node} onto {target} would create a cycle")]
    CycleRejected { node: NodeId, target: NodeId },
    #[error("Node not found: {0}")]
    NotFound(NodeId),
    #[error("Cannot nest into {0}")]
    NotAContainer(NodeId),
    #[error("Node {0} has no parent to reorder within")]
    NoParent(NodeId),
    #[error("Scene error: {0}")]
    Scene(#[from] SceneError),
}

/// Result type for layer operations.
pub type LayerResult<T> = Result<T, LayerError>;

/// What a drop of one row onto another does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DropMode {
    /// Make the dragged node the front-most child of the target.
    #[default]
    Nest,
    /// Place the dragged node directly above the target among its siblings.
    Reorder,
}

/// Owns the layer tree, its refresh schedule and the thumbnail cache.
#[derive(Debug, Clone)]
pub struct LayerController {
    filter: LayerFilter,
    limits: TraversalLimits,
    refresh: Debouncer,
    tree: LayerTree,
    thumbnails: ThumbnailCache,
    rebuilds: usize,
}

impl Default for LayerController {
    fn default() -> Self {
        Self::new(&LayerConfig::default(), TraversalLimits::default())
    }
}

impl LayerController {
    pub fn new(config: &LayerConfig, limits: TraversalLimits) -> Self {
        Self {
            filter: LayerFilter::new(config),
            limits,
            refresh: Debouncer::new(Duration::from_millis(config.refresh_debounce_ms)),
            tree: LayerTree::default(),
            thumbnails: ThumbnailCache::new(config.thumbnail_size),
            rebuilds: 0,
        }
    }

    pub fn tree(&self) -> &LayerTree {
        &self.tree
    }

    pub fn filter(&self) -> &LayerFilter {
        &self.filter
    }

    pub fn thumbnails(&self) -> &ThumbnailCache {
        &self.thumbnails
    }

    /// Number of rebuilds performed so far.
    pub fn rebuild_count(&self) -> usize {
        self.rebuilds
    }

    pub fn is_refresh_pending(&self) -> bool {
        self.refresh.is_pending()
    }

    /// React to a scene notification by scheduling a rebuild.
    pub fn on_scene_event(&mut self, event: &SceneEvent, now: Instant) {
        if event.touches_nodes() {
            self.thumbnails.invalidate_all();
        }
        self.refresh.schedule(now);
    }

    /// Rebuild if the debounced refresh is due. Returns whether it ran.
    pub fn poll<H: SceneHost + ?Sized>(&mut self, host: &H, now: Instant) -> bool {
        if !self.refresh.poll(now) {
            return false;
        }
        self.rebuild(host);
        self.refresh.finish();
        true
    }

    /// Rebuild immediately, dropping any pending refresh.
    pub fn refresh_now<H: SceneHost + ?Sized>(&mut self, host: &H) {
        self.refresh.cancel();
        self.rebuild(host);
    }

    fn rebuild<H: SceneHost + ?Sized>(&mut self, host: &H) {
        self.tree = LayerTree::build(host, &self.filter, self.limits);
        self.rebuilds += 1;
    }

    /// Rows with thumbnails, rendering missing ones through `rasterizer`.
    pub fn render_rows(
        &mut self,
        host: &dyn SceneHost,
        rasterizer: &dyn NodeRasterizer,
    ) -> Vec<RenderedRow> {
        let rows = self.tree.rows();
        render_rows(&mut self.thumbnails, host, rasterizer, rows)
    }

    /// Drop `node` onto `target`.
    ///
    /// Rejected with no mutation when `target` is `node` or one of its
    /// descendants. Returns the history entry for the move.
    pub fn drop_node<H: SceneHost + ?Sized>(
        &mut self,
        host: &mut H,
        node: NodeId,
        target: NodeId,
        mode: DropMode,
    ) -> LayerResult<HistoryEntry> {
        if !host.contains(node) {
            return Err(LayerError::NotFound(node));
        }
        if !host.contains(target) {
            return Err(LayerError::NotFound(target));
        }
        if node == target || is_ancestor(host, node, target) {
            log::warn!("Rejected drop of {} onto {}: would create a cycle", node, target);
            return Err(LayerError::CycleRejected { node, target });
        }
        if node == host.root() {
            return Err(SceneError::RootImmutable.into());
        }
        let from_parent = host.parent(node).ok_or(LayerError::NoParent(node))?;
        let from_index = host.index_in_parent(node).ok_or(LayerError::NoParent(node))?;

        let (to_parent, to_index) = match mode {
            DropMode::Nest => {
                let is_container = host.get(target).is_some_and(|n| n.kind().is_container());
                if !is_container && target != host.root() {
                    return Err(LayerError::NotAContainer(target));
                }
                let siblings = host.children(target).iter().filter(|&&c| c != node).count();
                (target, siblings)
            }
            DropMode::Reorder => {
                let parent = host.parent(target).ok_or(LayerError::NoParent(target))?;
                // Index among the siblings once `node` is taken out; front
                // of the target in z-order is above it on screen.
                let position = host
                    .children(parent)
                    .iter()
                    .filter(|&&c| c != node)
                    .position(|&c| c == target)
                    .ok_or(LayerError::NotFound(target))?;
                (parent, position + 1)
            }
        };

        host.move_node(node, to_parent, to_index)?;
        log::info!(
            "Moved layer {} to {} at {} ({:?})",
            node,
            to_parent,
            to_index,
            mode
        );
        Ok(HistoryEntry::Reparent {
            id: node,
            from_parent,
            from_index,
            to_parent,
            to_index,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::History;
    use crate::raster::testing::StubRasterizer;
    use crate::scene::{Node, Scene};

    fn controller() -> LayerController {
        LayerController::default()
    }

    #[test]
    fn test_refresh_is_debounced() {
        let mut scene = Scene::new();
        let mut layers = controller();
        let start = Instant::now();
        scene.add(Node::text("a"), scene.root()).unwrap();
        scene.add(Node::text("b"), scene.root()).unwrap();

        for (i, event) in scene.drain_events().iter().enumerate() {
            layers.on_scene_event(event, start + Duration::from_millis(i as u64 * 10));
        }
        assert!(!layers.poll(&scene, start + Duration::from_millis(45)));
        assert!(layers.poll(&scene, start + Duration::from_millis(50)));
        assert!(!layers.poll(&scene, start + Duration::from_millis(200)));
        assert_eq!(layers.rebuild_count(), 1);
        assert_eq!(layers.tree().len(), 2);
    }

    #[test]
    fn test_node_events_invalidate_thumbnails() {
        let mut scene = Scene::new();
        let id = scene.add(Node::text("a"), scene.root()).unwrap();
        let mut layers = controller();
        layers.refresh_now(&scene);
        let rasterizer = StubRasterizer::default();
        layers.render_rows(&scene, &rasterizer);
        assert_eq!(layers.thumbnails().len(), 1);

        let now = Instant::now();
        layers.on_scene_event(&SceneEvent::ToolChanged(Default::default()), now);
        assert_eq!(layers.thumbnails().len(), 1);
        layers.on_scene_event(&SceneEvent::NodeUpdated(id), now);
        assert!(layers.thumbnails().is_empty());
        assert!(layers.is_refresh_pending());
    }

    #[test]
    fn test_nest_makes_front_most_child() {
        let mut scene = Scene::new();
        let root = scene.root();
        let group = scene.add(Node::group(), root).unwrap();
        let existing = scene.add(Node::text("in"), group).unwrap();
        let moved = scene.add(Node::text("out"), root).unwrap();

        let mut layers = controller();
        layers.drop_node(&mut scene, moved, group, DropMode::Nest).unwrap();
        assert_eq!(scene.children(group), &[existing, moved]);
    }

    #[test]
    fn test_reorder_places_above_target() {
        let mut scene = Scene::new();
        let root = scene.root();
        let a = scene.add(Node::text("a"), root).unwrap();
        let b = scene.add(Node::text("b"), root).unwrap();
        let c = scene.add(Node::text("c"), root).unwrap();

        let mut layers = controller();
        layers.drop_node(&mut scene, c, a, DropMode::Reorder).unwrap();
        assert_eq!(scene.children(root), &[a, c, b]);
        layers.drop_node(&mut scene, a, b, DropMode::Reorder).unwrap();
        assert_eq!(scene.children(root), &[c, b, a]);

        layers.refresh_now(&scene);
        let order: Vec<NodeId> = layers.tree().rows().iter().map(|r| r.id).collect();
        assert_eq!(order, vec![a, b, c]);
    }

    #[test]
    fn test_drop_onto_descendant_rejected() {
        let mut scene = Scene::new();
        let root = scene.root();
        let outer = scene.add(Node::group(), root).unwrap();
        let middle = scene.add(Node::group(), outer).unwrap();
        let inner = scene.add(Node::group(), middle).unwrap();
        let mut layers = controller();

        for target in [outer, middle, inner] {
            for mode in [DropMode::Nest, DropMode::Reorder] {
                let result = layers.drop_node(&mut scene, outer, target, mode);
                assert_eq!(
                    result,
                    Err(LayerError::CycleRejected {
                        node: outer,
                        target
                    })
                );
            }
        }
        assert_eq!(scene.parent(outer), Some(root));
        assert_eq!(scene.parent(middle), Some(outer));
        assert_eq!(scene.parent(inner), Some(middle));
    }

    #[test]
    fn test_nest_into_leaf_rejected() {
        let mut scene = Scene::new();
        let root = scene.root();
        let leaf = scene.add(Node::text("leaf"), root).unwrap();
        let other = scene.add(Node::text("other"), root).unwrap();
        let mut layers = controller();
        assert_eq!(
            layers.drop_node(&mut scene, other, leaf, DropMode::Nest),
            Err(LayerError::NotAContainer(leaf))
        );
        assert_eq!(scene.children(root), &[leaf, other]);
    }

    #[test]
    fn test_drop_is_undoable() {
        let mut scene = Scene::new();
        let root = scene.root();
        let first = scene.add(Node::text("first"), root).unwrap();
        let group = scene.add(Node::group(), root).unwrap();
        let last = scene.add(Node::text("last"), root).unwrap();
        let mut layers = controller();
        let mut history = History::new();

        let entry = layers.drop_node(&mut scene, first, group, DropMode::Nest).unwrap();
        history.push(entry);
        assert_eq!(scene.children(root), &[group, last]);

        history.undo(&mut scene).unwrap();
        assert_eq!(scene.children(root), &[first, group, last]);
        history.redo(&mut scene).unwrap();
        assert_eq!(scene.children(group), &[first]);
    }
}
