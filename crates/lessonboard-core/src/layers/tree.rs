//! The filtered hierarchy shown in the layer panel.

use super::classify::LayerFilter;
use crate::scene::{NodeId, NodeKind, SceneHost, TraversalLimits, walk};

/// One node in the layer tree.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerNode {
    pub id: NodeId,
    pub label: String,
    pub kind: NodeKind,
    pub visible: bool,
    pub locked: bool,
    /// Whether the panel offers a disclosure toggle for this node.
    pub expandable: bool,
    /// Real children, front-most first.
    pub children: Vec<LayerNode>,
}

impl LayerNode {
    fn compute_expandable(&self) -> bool {
        let real = self.children.len();
        real >= 2 || (self.kind.is_container() && real >= 1)
    }
}

/// A flattened row, in panel order.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerRow {
    pub id: NodeId,
    pub parent: NodeId,
    pub depth: usize,
    pub label: String,
    pub kind: NodeKind,
    pub expandable: bool,
}

/// Snapshot of the layer hierarchy under the host root.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LayerTree {
    pub root: Option<NodeId>,
    /// Top-level layers, front-most first.
    pub layers: Vec<LayerNode>,
}

impl LayerTree {
    /// Mirror the real nodes of the host graph.
    ///
    /// A node that is not real hides its whole subtree.
    pub fn build<H: SceneHost + ?Sized>(
        host: &H,
        filter: &LayerFilter,
        limits: TraversalLimits,
    ) -> Self {
        let root = host.root();
        let visits = walk(host, root, limits);

        let mut nodes: Vec<Option<LayerNode>> = Vec::with_capacity(visits.len());
        for (i, visit) in visits.iter().enumerate() {
            if i == 0 {
                // The root itself is not a layer.
                nodes.push(None);
                continue;
            }
            let parent_pos = visit.parent_pos.unwrap_or(0);
            let parent_shown = parent_pos == 0 || nodes[parent_pos].is_some();
            let node = host.get(visit.id);
            let parent = host.get(visits[parent_pos].id);
            let layer = match node {
                Some(node) if parent_shown && filter.is_real(node, parent) => Some(LayerNode {
                    id: node.id,
                    label: node.label().to_string(),
                    kind: node.kind(),
                    visible: node.visible,
                    locked: node.locked,
                    expandable: false,
                    children: Vec::new(),
                }),
                _ => None,
            };
            nodes.push(layer);
        }

        // Children come back-most first in pre-order; pushing while folding
        // from the back yields front-most first.
        let mut layers = Vec::new();
        for i in (1..visits.len()).rev() {
            let Some(mut layer) = nodes[i].take() else { continue };
            layer.expandable = layer.compute_expandable();
            match visits[i].parent_pos {
                Some(0) | None => layers.push(layer),
                Some(pos) => {
                    if let Some(parent) = nodes[pos].as_mut() {
                        parent.children.push(layer);
                    }
                }
            }
        }

        log::debug!("Built layer tree with {} top-level layers", layers.len());
        Self {
            root: Some(root),
            layers,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Flatten into panel rows, front-most first, depth-first.
    pub fn rows(&self) -> Vec<LayerRow> {
        let Some(root) = self.root else {
            return Vec::new();
        };
        let mut rows = Vec::new();
        let mut stack: Vec<(&LayerNode, NodeId, usize)> =
            self.layers.iter().rev().map(|l| (l, root, 0)).collect();
        while let Some((layer, parent, depth)) = stack.pop() {
            rows.push(LayerRow {
                id: layer.id,
                parent,
                depth,
                label: layer.label.clone(),
                kind: layer.kind,
                expandable: layer.expandable,
            });
            for child in layer.children.iter().rev() {
                stack.push((child, layer.id, depth + 1));
            }
        }
        rows
    }

    pub fn find(&self, id: NodeId) -> Option<&LayerNode> {
        let mut stack: Vec<&LayerNode> = self.layers.iter().collect();
        while let Some(layer) = stack.pop() {
            if layer.id == id {
                return Some(layer);
            }
            stack.extend(layer.children.iter());
        }
        None
    }

    pub fn len(&self) -> usize {
        let mut count = 0;
        let mut stack: Vec<&LayerNode> = self.layers.iter().collect();
        while let Some(layer) = stack.pop() {
            count += 1;
            stack.extend(layer.children.iter());
        }
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clipboard::table_tree;
    use crate::scene::{HelperKind, Node, NodeContent, Scene, Table};

    fn build(scene: &Scene) -> LayerTree {
        LayerTree::build(scene, &LayerFilter::default(), TraversalLimits::default())
    }

    #[test]
    fn test_rows_front_most_first() {
        let mut scene = Scene::new();
        let root = scene.root();
        let back = scene.add(Node::text("back"), root).unwrap();
        let group = scene.add(Node::group().with_name("Group"), root).unwrap();
        let inner_back = scene.add(Node::rect(1.0, 1.0), group).unwrap();
        let inner_front = scene.add(Node::rect(1.0, 1.0), group).unwrap();

        let tree = build(&scene);
        let rows: Vec<(NodeId, usize)> = tree.rows().iter().map(|r| (r.id, r.depth)).collect();
        assert_eq!(
            rows,
            vec![(group, 0), (inner_front, 1), (inner_back, 1), (back, 0)]
        );
        assert_eq!(tree.rows()[1].parent, group);
        assert_eq!(tree.len(), 4);
    }

    #[test]
    fn test_helpers_and_table_cells_hidden() {
        let mut scene = Scene::new();
        let root = scene.root();
        scene.add(Node::helper(HelperKind::Marquee), root).unwrap();
        // A hidden container hides everything under it.
        let overlay = scene.add(Node::group().with_name("Marquee layer"), root).unwrap();
        scene.add(Node::rect(1.0, 1.0), overlay).unwrap();
        let mut drag = Node::group();
        drag.transient = true;
        let drag = scene.add(drag, root).unwrap();
        scene.add(Node::text("ghost"), drag).unwrap();
        let table = Node::new(NodeContent::Table(Table::grid(2, 2, 10.0, 10.0)));
        let table = scene.insert(table_tree(table), root, 1).unwrap();

        let tree = build(&scene);
        assert_eq!(tree.len(), 1);
        let layer = tree.find(table).unwrap();
        assert!(layer.children.is_empty());
        assert!(!layer.expandable);
    }

    #[test]
    fn test_expandable_rule() {
        let mut scene = Scene::new();
        let root = scene.root();
        let single = scene.add(Node::group(), root).unwrap();
        scene.add(Node::text("only"), single).unwrap();
        let empty = scene.add(Node::group(), root).unwrap();
        let text = scene.add(Node::text("parent"), root).unwrap();
        let nested = scene.add(Node::new(NodeContent::Scene), text);
        // Text does not accept children.
        assert!(nested.is_err());

        let tree = build(&scene);
        assert!(tree.find(single).unwrap().expandable);
        assert!(!tree.find(empty).unwrap().expandable);
        assert!(!tree.find(text).unwrap().expandable);
    }

    #[test]
    fn test_depth_limit_bounds_tree() {
        let mut scene = Scene::new();
        let mut parent = scene.root();
        for _ in 0..10 {
            parent = scene.add(Node::group(), parent).unwrap();
        }
        let limits = TraversalLimits {
            max_depth: 4,
            max_nodes: 1000,
        };
        let tree = LayerTree::build(&scene, &LayerFilter::default(), limits);
        assert_eq!(tree.len(), 4);
    }
}
