//! In-memory scene host.

use super::ancestry::{TraversalLimits, chain_contains};
use super::{
    Media, MediaHost, MediaKind, MediaSource, MediaState, Node, NodeContent, NodeId, NodeTree,
    SceneError, SceneHost, SceneResult,
};
use crate::events::SceneEvent;
use std::collections::{HashMap, HashSet};

/// Size an audio element settles to once loaded.
pub const AUDIO_INTRINSIC_SIZE: (f64, f64) = (300.0, 54.0);
/// Size a video element settles to once loaded.
pub const VIDEO_INTRINSIC_SIZE: (f64, f64) = (320.0, 180.0);

#[derive(Debug, Clone)]
struct Slot {
    node: Node,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// Arena-backed scene graph.
///
/// Nodes are keyed by id with parent links and ordered child lists. Mutations
/// queue [`SceneEvent`]s that the editor drains once per operation.
#[derive(Debug, Clone)]
pub struct Scene {
    slots: HashMap<NodeId, Slot>,
    root: NodeId,
    events: Vec<SceneEvent>,
    limits: TraversalLimits,
    /// Media elements still waiting for their load to resolve.
    pending_media: Vec<NodeId>,
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

impl Scene {
    /// Create an empty scene holding only the root group.
    pub fn new() -> Self {
        let root = Node::group().with_name("root");
        let root_id = root.id;
        let mut slots = HashMap::new();
        slots.insert(
            root_id,
            Slot {
                node: root,
                parent: None,
                children: Vec::new(),
            },
        );
        Self {
            slots,
            root: root_id,
            events: Vec::new(),
            limits: TraversalLimits::default(),
            pending_media: Vec::new(),
        }
    }

    pub fn with_limits(mut self, limits: TraversalLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Number of registered nodes, root included.
    pub fn node_count(&self) -> usize {
        self.slots.len()
    }

    /// Media elements whose load has not resolved yet.
    pub fn pending_media(&self) -> &[NodeId] {
        &self.pending_media
    }

    /// Finish every pending media load.
    ///
    /// A loaded element resets its scale and adopts its intrinsic size,
    /// discarding whatever properties were applied while it was loading.
    /// Returns the number of elements resolved.
    pub fn resolve_media_loads(&mut self) -> usize {
        let pending = std::mem::take(&mut self.pending_media);
        let mut resolved = 0;
        for id in pending {
            let Some(slot) = self.slots.get_mut(&id) else { continue };
            let NodeContent::Media(media) = &mut slot.node.content else { continue };
            let (width, height) = match media.kind {
                MediaKind::Audio => AUDIO_INTRINSIC_SIZE,
                MediaKind::Video => VIDEO_INTRINSIC_SIZE,
            };
            media.state = MediaState::Ready;
            media.width = width;
            media.height = height;
            slot.node.transform.scale_x = 1.0;
            slot.node.transform.scale_y = 1.0;
            self.events.push(SceneEvent::NodeUpdated(id));
            resolved += 1;
        }
        if resolved > 0 {
            log::debug!("Resolved {} media loads", resolved);
        }
        resolved
    }

    fn check_container(&self, parent: NodeId) -> SceneResult<()> {
        let slot = self.slots.get(&parent).ok_or(SceneError::NotFound(parent))?;
        if !slot.node.content.accepts_children() {
            return Err(SceneError::NotAContainer(parent));
        }
        Ok(())
    }

    fn detach_from_parent(&mut self, id: NodeId) {
        let parent = self.slots.get(&id).and_then(|s| s.parent);
        if let Some(parent_slot) = parent.and_then(|p| self.slots.get_mut(&p)) {
            parent_slot.children.retain(|&c| c != id);
        }
    }

    fn create_media(&mut self, media: Media, x: f64, y: f64) -> Option<NodeId> {
        if media.source.url.trim().is_empty() {
            log::warn!("Refusing to create media element without a source url");
            return None;
        }
        let name = media.source.title.clone();
        let mut node = Node::new(NodeContent::Media(media)).at(x, y);
        if !name.is_empty() {
            node.name = Some(name);
        }
        let id = self.add(node, self.root).ok()?;
        self.pending_media.push(id);
        Some(id)
    }
}

impl SceneHost for Scene {
    fn root(&self) -> NodeId {
        self.root
    }

    fn get(&self, id: NodeId) -> Option<&Node> {
        self.slots.get(&id).map(|s| &s.node)
    }

    fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.slots.get_mut(&id).map(|s| &mut s.node)
    }

    fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.slots.get(&id).and_then(|s| s.parent)
    }

    fn children(&self, id: NodeId) -> &[NodeId] {
        self.slots
            .get(&id)
            .map(|s| s.children.as_slice())
            .unwrap_or(&[])
    }

    fn add(&mut self, node: Node, parent: NodeId) -> SceneResult<NodeId> {
        self.check_container(parent)?;
        let id = node.id;
        if self.slots.contains_key(&id) {
            return Err(SceneError::DuplicateId(id));
        }
        self.slots.insert(
            id,
            Slot {
                node,
                parent: Some(parent),
                children: Vec::new(),
            },
        );
        if let Some(parent_slot) = self.slots.get_mut(&parent) {
            parent_slot.children.push(id);
        }
        self.events.push(SceneEvent::NodeAdded(id));
        Ok(id)
    }

    fn insert(&mut self, tree: NodeTree, parent: NodeId, index: usize) -> SceneResult<NodeId> {
        self.check_container(parent)?;

        // Validate the whole subtree before touching the arena.
        let mut ids = HashSet::new();
        let mut stack = vec![&tree];
        while let Some(t) = stack.pop() {
            let id = t.node.id;
            if self.slots.contains_key(&id) || !ids.insert(id) {
                return Err(SceneError::DuplicateId(id));
            }
            if !t.children.is_empty() && !t.node.content.accepts_children() {
                return Err(SceneError::NotAContainer(id));
            }
            stack.extend(t.children.iter());
        }

        let top = tree.node.id;
        let mut pending = vec![(tree, parent)];
        while let Some((subtree, parent_id)) = pending.pop() {
            let NodeTree { node, children } = subtree;
            let id = node.id;
            let child_ids = children.iter().map(|c| c.node.id).collect();
            self.slots.insert(
                id,
                Slot {
                    node,
                    parent: Some(parent_id),
                    children: child_ids,
                },
            );
            self.events.push(SceneEvent::NodeAdded(id));
            pending.extend(children.into_iter().map(|c| (c, id)));
        }

        if let Some(parent_slot) = self.slots.get_mut(&parent) {
            let index = index.min(parent_slot.children.len());
            parent_slot.children.insert(index, top);
        }
        Ok(top)
    }

    fn remove(&mut self, id: NodeId) -> Option<NodeTree> {
        if id == self.root {
            log::warn!("{}", SceneError::RootImmutable);
            return None;
        }
        if !self.slots.contains_key(&id) {
            return None;
        }
        self.detach_from_parent(id);

        // Pre-order with parent positions, then fold back into a tree.
        let mut order: Vec<(NodeId, Option<usize>)> = Vec::new();
        let mut stack = vec![(id, None)];
        while let Some((nid, parent_pos)) = stack.pop() {
            let pos = order.len();
            order.push((nid, parent_pos));
            if let Some(slot) = self.slots.get(&nid) {
                stack.extend(slot.children.iter().rev().map(|&c| (c, Some(pos))));
            }
        }
        let mut trees: Vec<Option<NodeTree>> = order
            .iter()
            .map(|(nid, _)| self.slots.remove(nid).map(|s| NodeTree::leaf(s.node)))
            .collect();
        for (nid, _) in &order {
            self.events.push(SceneEvent::NodeRemoved(*nid));
        }
        self.pending_media
            .retain(|m| !order.iter().any(|(nid, _)| nid == m));
        for i in (1..order.len()).rev() {
            let Some(parent_pos) = order[i].1 else { continue };
            if let Some(tree) = trees[i].take() {
                if let Some(parent) = trees[parent_pos].as_mut() {
                    parent.children.insert(0, tree);
                }
            }
        }
        trees.into_iter().next().flatten()
    }

    fn move_node(&mut self, id: NodeId, parent: NodeId, index: usize) -> SceneResult<()> {
        if id == self.root {
            return Err(SceneError::RootImmutable);
        }
        if !self.slots.contains_key(&id) {
            return Err(SceneError::NotFound(id));
        }
        self.check_container(parent)?;
        if chain_contains(|n| self.parent(n), parent, id, self.limits.max_depth) {
            return Err(SceneError::Cycle { node: id, parent });
        }

        self.detach_from_parent(id);
        if let Some(parent_slot) = self.slots.get_mut(&parent) {
            let index = index.min(parent_slot.children.len());
            parent_slot.children.insert(index, id);
        }
        if let Some(slot) = self.slots.get_mut(&id) {
            slot.parent = Some(parent);
        }
        self.events.push(SceneEvent::NodeUpdated(id));
        Ok(())
    }

    fn mark_updated(&mut self, id: NodeId) {
        if self.slots.contains_key(&id) {
            self.events.push(SceneEvent::NodeUpdated(id));
        }
    }

    fn limits(&self) -> TraversalLimits {
        self.limits
    }

    fn drain_events(&mut self) -> Vec<SceneEvent> {
        std::mem::take(&mut self.events)
    }
}

impl MediaHost for Scene {
    fn add_audio_element(&mut self, url: &str, title: &str, x: f64, y: f64) -> Option<NodeId> {
        let media = Media {
            kind: MediaKind::Audio,
            source: MediaSource {
                url: url.to_string(),
                title: title.to_string(),
                poster: None,
            },
            state: MediaState::Loading,
            width: AUDIO_INTRINSIC_SIZE.0,
            height: AUDIO_INTRINSIC_SIZE.1,
        };
        self.create_media(media, x, y)
    }

    fn add_video_element(
        &mut self,
        url: &str,
        title: &str,
        x: f64,
        y: f64,
        poster: Option<&str>,
    ) -> Option<NodeId> {
        let media = Media {
            kind: MediaKind::Video,
            source: MediaSource {
                url: url.to_string(),
                title: title.to_string(),
                poster: poster.map(str::to_string),
            },
            state: MediaState::Loading,
            width: VIDEO_INTRINSIC_SIZE.0,
            height: VIDEO_INTRINSIC_SIZE.1,
        };
        self.create_media(media, x, y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::Transform;

    #[test]
    fn test_add_and_children_order() {
        let mut scene = Scene::new();
        let root = scene.root();
        let a = scene.add(Node::rect(10.0, 10.0), root).unwrap();
        let b = scene.add(Node::rect(10.0, 10.0), root).unwrap();
        assert_eq!(scene.children(root), &[a, b]);
        assert_eq!(scene.parent(a), Some(root));
        assert_eq!(scene.index_in_parent(b), Some(1));
        assert_eq!(
            scene.drain_events(),
            vec![SceneEvent::NodeAdded(a), SceneEvent::NodeAdded(b)]
        );
        assert!(scene.drain_events().is_empty());
    }

    #[test]
    fn test_add_rejects_leaf_parent() {
        let mut scene = Scene::new();
        let leaf = scene.add(Node::rect(1.0, 1.0), scene.root()).unwrap();
        let result = scene.add(Node::rect(1.0, 1.0), leaf);
        assert_eq!(result, Err(SceneError::NotAContainer(leaf)));
    }

    #[test]
    fn test_remove_cascades_and_insert_restores() {
        let mut scene = Scene::new();
        let root = scene.root();
        let first = scene.add(Node::rect(1.0, 1.0), root).unwrap();
        let group = scene.add(Node::group(), root).unwrap();
        let child = scene.add(Node::text("a"), group).unwrap();
        let grandchild_group = scene.add(Node::group(), group).unwrap();
        let grandchild = scene.add(Node::rect(2.0, 2.0), grandchild_group).unwrap();

        let tree = scene.remove(group).unwrap();
        assert_eq!(tree.node_count(), 4);
        assert_eq!(tree.children[0].node.id, child);
        assert_eq!(tree.children[1].children[0].node.id, grandchild);
        assert!(scene.get(child).is_none());
        assert_eq!(scene.children(root), &[first]);

        scene.insert(tree, root, 0).unwrap();
        assert_eq!(scene.children(root), &[group, first]);
        assert_eq!(scene.children(group), &[child, grandchild_group]);
        assert_eq!(scene.parent(grandchild), Some(grandchild_group));
    }

    #[test]
    fn test_root_cannot_be_removed() {
        let mut scene = Scene::new();
        let root = scene.root();
        assert!(scene.remove(root).is_none());
        assert!(scene.contains(root));
    }

    #[test]
    fn test_move_rejects_cycle() {
        let mut scene = Scene::new();
        let outer = scene.add(Node::group(), scene.root()).unwrap();
        let inner = scene.add(Node::group(), outer).unwrap();
        let result = scene.move_node(outer, inner, 0);
        assert_eq!(
            result,
            Err(SceneError::Cycle {
                node: outer,
                parent: inner
            })
        );
        assert_eq!(scene.move_node(outer, outer, 0), Err(SceneError::Cycle {
            node: outer,
            parent: outer
        }));
        assert_eq!(scene.parent(inner), Some(outer));
    }

    #[test]
    fn test_move_node_reorders() {
        let mut scene = Scene::new();
        let root = scene.root();
        let a = scene.add(Node::rect(1.0, 1.0), root).unwrap();
        let b = scene.add(Node::rect(1.0, 1.0), root).unwrap();
        let c = scene.add(Node::rect(1.0, 1.0), root).unwrap();
        scene.move_node(c, root, 0).unwrap();
        assert_eq!(scene.children(root), &[c, a, b]);
    }

    #[test]
    fn test_world_bounds_follow_parent_transform() {
        let mut scene = Scene::new();
        let group = scene
            .add(Node::group().with_transform(Transform::at(100.0, 50.0)), scene.root())
            .unwrap();
        let rect = scene.add(Node::rect(10.0, 20.0).at(5.0, 5.0), group).unwrap();
        let bounds = scene.world_bounds(rect).unwrap();
        assert!((bounds.x0 - 105.0).abs() < 1e-9);
        assert!((bounds.y1 - 75.0).abs() < 1e-9);
        let group_bounds = scene.world_bounds(group).unwrap();
        assert_eq!(group_bounds, bounds);
    }

    #[test]
    fn test_media_load_resets_scale() {
        let mut scene = Scene::new();
        let id = scene
            .add_video_element("https://cdn.test/clip.mp4", "Clip", 10.0, 10.0, None)
            .unwrap();
        scene.get_mut(id).unwrap().transform.scale_x = 2.0;
        assert_eq!(scene.pending_media(), &[id]);
        assert_eq!(scene.resolve_media_loads(), 1);
        let node = scene.get(id).unwrap();
        assert_eq!(node.transform.scale_x, 1.0);
        assert_eq!(node.label(), "Clip");
        assert!(scene.pending_media().is_empty());
    }

    #[test]
    fn test_media_requires_url() {
        let mut scene = Scene::new();
        assert!(scene.add_audio_element("  ", "Nothing", 0.0, 0.0).is_none());
    }
}
