//! Selection and per-node highlight state.

use crate::scene::{NodeId, SceneHost};
use std::collections::{HashMap, HashSet};

/// The highlight state of a node. States are mutually exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HighlightState {
    #[default]
    Normal,
    Hovered,
    Selected,
}

/// Ordered set of selected node ids plus hover tracking.
///
/// The selection never owns nodes; ids that disappear from the host are
/// dropped by [`Selection::prune`].
#[derive(Debug, Clone, Default)]
pub struct Selection {
    order: Vec<NodeId>,
    selected: HashSet<NodeId>,
    /// Only non-normal states are stored.
    states: HashMap<NodeId, HighlightState>,
    hovered: Option<NodeId>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self, id: NodeId) -> HighlightState {
        self.states.get(&id).copied().unwrap_or_default()
    }

    fn set_state(&mut self, id: NodeId, state: HighlightState) {
        if state == HighlightState::Normal {
            self.states.remove(&id);
        } else {
            self.set_state(id, state);
        }
    }

    pub fn is_selected(&self, id: NodeId) -> bool {
        self.selected.contains(&id)
    }

    /// Selected ids in selection order.
    pub fn ids(&self) -> &[NodeId] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn hovered(&self) -> Option<NodeId> {
        self.hovered
    }

    /// Select a single node, clearing the rest.
    pub fn select(&mut self, id: NodeId) {
        self.clear();
        self.add(id);
    }

    /// Replace the selection.
    pub fn set(&mut self, ids: impl IntoIterator<Item = NodeId>) {
        self.clear();
        for id in ids {
            self.add(id);
        }
    }

    pub fn add(&mut self, id: NodeId) {
        if self.selected.insert(id) {
            self.order.push(id);
        }
        self.states.insert(id, HighlightState::Selected);
    }

    pub fn deselect(&mut self, id: NodeId) {
        if self.selected.remove(&id) {
            self.order.retain(|&s| s != id);
            let state = if self.hovered == Some(id) {
                HighlightState::Hovered
            } else {
                HighlightState::Normal
            };
            self.states.insert(id, state);
        }
    }

    pub fn toggle(&mut self, id: NodeId) {
        if self.is_selected(id) {
            self.deselect(id);
        } else {
            self.add(id);
        }
    }

    pub fn clear(&mut self) {
        for id in std::mem::take(&mut self.order) {
            self.states.remove(&id);
        }
        self.selected.clear();
        if let Some(hovered) = self.hovered {
            self.states.insert(hovered, HighlightState::Hovered);
        }
    }

    /// Set the hovered node. Selected nodes keep their selected state.
    pub fn set_hovered(&mut self, id: Option<NodeId>) {
        if let Some(old) = self.hovered {
            if Some(old) != id && self.state(old) == HighlightState::Hovered {
                self.set_state(old, HighlightState::Normal);
            }
        }
        if let Some(new) = id {
            if self.state(new) == HighlightState::Normal {
                self.states.insert(new, HighlightState::Hovered);
            }
        }
        self.hovered = id;
    }

    /// Forget all state for a removed node.
    pub fn remove(&mut self, id: NodeId) {
        self.states.remove(&id);
        if self.selected.remove(&id) {
            self.order.retain(|&s| s != id);
        }
        if self.hovered == Some(id) {
            self.hovered = None;
        }
    }

    /// Drop ids the host no longer knows about.
    pub fn prune<H: SceneHost + ?Sized>(&mut self, host: &H) {
        let stale: Vec<NodeId> = self
            .states
            .keys()
            .copied()
            .filter(|&id| !host.contains(id))
            .collect();
        for id in stale {
            self.remove(id);
        }
    }
}
