//! Bounded, iterative tree walks.
//!
//! Every traversal of the live graph goes through here so that a corrupted or
//! pathological tree can never turn into unbounded recursion.

use super::{NodeId, SceneHost};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Hard bounds on tree traversal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TraversalLimits {
    /// Maximum depth below the starting node.
    pub max_depth: usize,
    /// Maximum number of nodes visited in one walk.
    pub max_nodes: usize,
}

impl Default for TraversalLimits {
    fn default() -> Self {
        Self {
            max_depth: 64,
            max_nodes: 10_000,
        }
    }
}

/// One step of a pre-order walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Visit {
    pub id: NodeId,
    /// Depth below the starting node (0 = the starting node).
    pub depth: usize,
    /// Position of the parent visit in the walk output.
    pub parent_pos: Option<usize>,
}

/// Whether `target` appears on the parent chain starting at `start`
/// (`start` itself included).
///
/// This is the single cycle check shared by reparenting, layer drag/drop and
/// clipboard flattening.
pub fn chain_contains(
    parent_of: impl Fn(NodeId) -> Option<NodeId>,
    start: NodeId,
    target: NodeId,
    max_depth: usize,
) -> bool {
    let mut current = Some(start);
    let mut steps = 0;
    while let Some(id) = current {
        if id == target {
            return true;
        }
        if steps >= max_depth {
            // A chain longer than the bound is treated as containing the
            // target, so callers refuse to mutate.
            log::warn!("Ancestor walk from {} exceeded depth {}", start, max_depth);
            return true;
        }
        steps += 1;
        current = parent_of(id);
    }
    false
}

/// Whether `ancestor` is a strict ancestor of `node`.
pub fn is_ancestor<H: SceneHost + ?Sized>(host: &H, ancestor: NodeId, node: NodeId) -> bool {
    match host.parent(node) {
        Some(parent) => chain_contains(|id| host.parent(id), parent, ancestor, host.limits().max_depth),
        None => false,
    }
}

/// Parent chain of `id`, nearest first, root last.
pub fn ancestors<H: SceneHost + ?Sized>(host: &H, id: NodeId) -> Vec<NodeId> {
    let max_depth = host.limits().max_depth;
    let mut result = Vec::new();
    let mut current = host.parent(id);
    while let Some(parent) = current {
        if result.len() >= max_depth {
            log::warn!("Ancestor chain of {} truncated at depth {}", id, max_depth);
            break;
        }
        result.push(parent);
        current = host.parent(parent);
    }
    result
}

/// Pre-order walk of the subtree rooted at `start`, children in z-order.
///
/// Nodes deeper than `limits.max_depth` are skipped and the walk stops after
/// `limits.max_nodes` visits. Returns nothing if `start` is unknown.
pub fn walk<H: SceneHost + ?Sized>(host: &H, start: NodeId, limits: TraversalLimits) -> Vec<Visit> {
    let mut visits = Vec::new();
    if !host.contains(start) {
        return visits;
    }
    let mut stack = vec![Visit {
        id: start,
        depth: 0,
        parent_pos: None,
    }];
    while let Some(visit) = stack.pop() {
        if visits.len() >= limits.max_nodes {
            log::warn!("Walk from {} stopped after {} nodes", start, limits.max_nodes);
            break;
        }
        let pos = visits.len();
        visits.push(visit);
        if visit.depth >= limits.max_depth {
            continue;
        }
        for &child in host.children(visit.id).iter().rev() {
            stack.push(Visit {
                id: child,
                depth: visit.depth + 1,
                parent_pos: Some(pos),
            });
        }
    }
    visits
}

/// Drop every id that has another id of the set among its ancestors,
/// preserving input order.
pub fn top_level_only<H: SceneHost + ?Sized>(host: &H, ids: &[NodeId]) -> Vec<NodeId> {
    let mut seen = HashSet::new();
    let unique: Vec<NodeId> = ids.iter().copied().filter(|&id| seen.insert(id)).collect();
    unique
        .iter()
        .copied()
        .filter(|&id| {
            !unique
                .iter()
                .any(|&other| other != id && is_ancestor(host, other, id))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{Node, Scene};

    fn nested(depth: usize) -> (Scene, Vec<NodeId>) {
        let mut scene = Scene::new();
        let mut parent = scene.root();
        let mut ids = Vec::new();
        for _ in 0..depth {
            parent = scene.add(Node::group(), parent).unwrap();
            ids.push(parent);
        }
        (scene, ids)
    }

    #[test]
    fn test_is_ancestor() {
        let (scene, ids) = nested(3);
        assert!(is_ancestor(&scene, ids[0], ids[2]));
        assert!(is_ancestor(&scene, scene.root(), ids[2]));
        assert!(!is_ancestor(&scene, ids[2], ids[0]));
        assert!(!is_ancestor(&scene, ids[1], ids[1]));
    }

    #[test]
    fn test_chain_contains_respects_bound() {
        // A parent function that never terminates.
        let id = uuid::Uuid::new_v4();
        let other = uuid::Uuid::new_v4();
        assert!(chain_contains(|_| Some(id), id, other, 8));
    }

    #[test]
    fn test_walk_pre_order() {
        let mut scene = Scene::new();
        let root = scene.root();
        let a = scene.add(Node::group(), root).unwrap();
        let a1 = scene.add(Node::rect(1.0, 1.0), a).unwrap();
        let b = scene.add(Node::rect(1.0, 1.0), root).unwrap();

        let order: Vec<NodeId> = walk(&scene, root, TraversalLimits::default())
            .iter()
            .map(|v| v.id)
            .collect();
        assert_eq!(order, vec![root, a, a1, b]);
    }

    #[test]
    fn test_walk_depth_limit() {
        let (scene, ids) = nested(5);
        let limits = TraversalLimits {
            max_depth: 2,
            max_nodes: 100,
        };
        let visits = walk(&scene, scene.root(), limits);
        assert_eq!(visits.len(), 3);
        assert!(!visits.iter().any(|v| v.id == ids[2]));
    }

    #[test]
    fn test_top_level_only() {
        let (scene, ids) = nested(3);
        let filtered = top_level_only(&scene, &[ids[2], ids[0], ids[1], ids[0]]);
        assert_eq!(filtered, vec![ids[0]]);
    }

    #[test]
    fn test_top_level_only_keeps_siblings_and_cousins() {
        let mut scene = Scene::new();
        let root = scene.root();
        let a = scene.add(Node::group(), root).unwrap();
        let b = scene.add(Node::group(), root).unwrap();
        let a1 = scene.add(Node::rect(1.0, 1.0), a).unwrap();
        let b1 = scene.add(Node::rect(1.0, 1.0), b).unwrap();
        assert_eq!(top_level_only(&scene, &[a1, b1, b]), vec![a1, b]);
    }
}
