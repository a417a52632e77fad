//! Scene graph: node model and the host contract the editor works against.
//!
//! The editor never owns drawable nodes itself. Everything goes through a
//! [`SceneHost`], which the embedding application implements on top of its
//! retained-mode renderer. [`Scene`] is the in-memory implementation used by
//! headless sessions and tests.

pub mod ancestry;
mod node;
mod store;

pub use ancestry::{TraversalLimits, Visit, is_ancestor, top_level_only, walk};
pub use node::{
    BlendMode, BrushStroke, CellStyle, Graphics, HelperKind, Media, MediaKind, MediaSource,
    MediaState, Node, NodeContent, NodeId, NodeKind, PathNode, PenPath, SerializableColor,
    ShapeGeometry, StaticImage, Stroke, StrokeDash, Table, TableCell, TableSettings, TextAlign,
    TextContent, TextStyle, Transform, VectorShape, VisualProps,
};
pub use store::{AUDIO_INTRINSIC_SIZE, Scene, VIDEO_INTRINSIC_SIZE};

use crate::events::SceneEvent;
use kurbo::{Affine, Rect};
use thiserror::Error;

/// Scene mutation errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SceneError {
    #[error("Node not found: {0}")]
    NotFound(NodeId),
    #[error("Node {0} cannot hold children")]
    NotAContainer(NodeId),
    #[error("Node id already registered: {0}")]
    DuplicateId(NodeId),
    #[error("Moving {node} under {parent} would create a cycle")]
    Cycle { node: NodeId, parent: NodeId },
    #[error("The root node cannot be removed or moved")]
    RootImmutable,
}

/// Result type for scene operations.
pub type SceneResult<T> = Result<T, SceneError>;

/// An owned copy of a node and its descendants.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeTree {
    pub node: Node,
    pub children: Vec<NodeTree>,
}

impl NodeTree {
    pub fn leaf(node: Node) -> Self {
        Self {
            node,
            children: Vec::new(),
        }
    }

    /// Number of nodes in the tree, root included.
    pub fn node_count(&self) -> usize {
        let mut count = 0;
        let mut stack = vec![self];
        while let Some(tree) = stack.pop() {
            count += 1;
            stack.extend(tree.children.iter());
        }
        count
    }
}

/// The scene-graph collaborator owning add/remove/query of live nodes.
pub trait SceneHost {
    /// The root container.
    fn root(&self) -> NodeId;

    fn get(&self, id: NodeId) -> Option<&Node>;

    /// Mutable access. Call [`SceneHost::mark_updated`] after changing a node.
    fn get_mut(&mut self, id: NodeId) -> Option<&mut Node>;

    fn parent(&self, id: NodeId) -> Option<NodeId>;

    /// Children in z-order, back-most first. Empty for unknown ids.
    fn children(&self, id: NodeId) -> &[NodeId];

    /// Register `node` as the front-most child of `parent`.
    fn add(&mut self, node: Node, parent: NodeId) -> SceneResult<NodeId>;

    /// Register a whole subtree at `index` among `parent`'s children.
    fn insert(&mut self, tree: NodeTree, parent: NodeId, index: usize) -> SceneResult<NodeId>;

    /// Detach a node and its descendants, returning them.
    fn remove(&mut self, id: NodeId) -> Option<NodeTree>;

    /// Reparent `id` to position `index` of `parent`'s children (index counted
    /// after `id` has been detached).
    fn move_node(&mut self, id: NodeId, parent: NodeId, index: usize) -> SceneResult<()>;

    /// Notify observers that a node's properties changed.
    fn mark_updated(&mut self, id: NodeId);

    fn limits(&self) -> TraversalLimits {
        TraversalLimits::default()
    }

    /// Take pending change notifications.
    fn drain_events(&mut self) -> Vec<SceneEvent> {
        Vec::new()
    }

    /// The id a node is registered under, if it is registered.
    fn id_for(&self, node: &Node) -> Option<NodeId> {
        self.get(node.id).map(|n| n.id)
    }

    fn contains(&self, id: NodeId) -> bool {
        self.get(id).is_some()
    }

    fn index_in_parent(&self, id: NodeId) -> Option<usize> {
        let parent = self.parent(id)?;
        self.children(parent).iter().position(|&c| c == id)
    }

    /// Local-to-world affine, composed from the root down.
    fn world_transform(&self, id: NodeId) -> Affine {
        ancestry::ancestors(self, id)
            .iter()
            .rev()
            .chain(std::iter::once(&id))
            .filter_map(|&nid| self.get(nid))
            .fold(Affine::IDENTITY, |acc, node| acc * node.transform.to_affine())
    }

    /// World-space bounds of a node and its descendants. Helpers are ignored.
    fn world_bounds(&self, id: NodeId) -> Option<Rect> {
        let limits = self.limits();
        let mut result: Option<Rect> = None;
        let mut stack = vec![(id, self.world_transform(id), 0usize)];
        let mut visited = 0;
        while let Some((nid, affine, depth)) = stack.pop() {
            visited += 1;
            if visited > limits.max_nodes {
                log::warn!("world_bounds: node budget exhausted under {}", id);
                break;
            }
            let Some(node) = self.get(nid) else { continue };
            if let Some(local) = node.local_bounds() {
                let bounds = affine.transform_rect_bbox(local);
                result = Some(match result {
                    Some(r) => r.union(bounds),
                    None => bounds,
                });
            }
            if depth < limits.max_depth {
                for &child in self.children(nid) {
                    if let Some(child_node) = self.get(child) {
                        stack.push((child, affine * child_node.transform.to_affine(), depth + 1));
                    }
                }
            }
        }
        result
    }

    /// Owned copy of the subtree rooted at `id`.
    fn snapshot(&self, id: NodeId) -> Option<NodeTree> {
        let visits = walk(self, id, self.limits());
        let mut trees: Vec<Option<NodeTree>> = visits
            .iter()
            .map(|v| self.get(v.id).map(|n| NodeTree::leaf(n.clone())))
            .collect();
        // Pre-order puts every parent before its children, so folding from
        // the back attaches complete subtrees.
        for i in (1..visits.len()).rev() {
            let Some(parent_pos) = visits[i].parent_pos else { continue };
            if let Some(tree) = trees[i].take() {
                if let Some(parent) = trees[parent_pos].as_mut() {
                    parent.children.insert(0, tree);
                }
            }
        }
        trees.into_iter().next().flatten()
    }
}

/// Host capability for creating media elements.
///
/// Element initialisation is asynchronous; the returned id resolves to a node
/// immediately but the element may reset its properties when loading completes.
pub trait MediaHost {
    fn add_audio_element(&mut self, url: &str, title: &str, x: f64, y: f64) -> Option<NodeId>;

    fn add_video_element(
        &mut self,
        url: &str,
        title: &str,
        x: f64,
        y: f64,
        poster: Option<&str>,
    ) -> Option<NodeId>;
}

/// Union of world bounds over a set of nodes.
pub fn union_bounds<H: SceneHost + ?Sized>(host: &H, ids: &[NodeId]) -> Option<Rect> {
    ids.iter()
        .filter_map(|&id| host.world_bounds(id))
        .reduce(|a, b| a.union(b))
}
