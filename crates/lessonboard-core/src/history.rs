//! Undo/redo log.
//!
//! The host owns the nodes, so history records operations rather than whole
//! document snapshots. Each entry knows how to revert and reapply itself.
//!
//! The host can change underneath the log. Items that no longer apply are
//! skipped one by one and the entry still moves to the other stack, so
//! detached subtrees it holds are never discarded.

use crate::scene::{NodeId, NodeTree, SceneError, SceneHost};
use crate::transform::TransformChange;
use thiserror::Error;

/// Maximum number of undo states to keep.
pub const MAX_UNDO_HISTORY: usize = 50;

/// History errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HistoryError {
    #[error("Nothing to undo")]
    NothingToUndo,
    #[error("Nothing to redo")]
    NothingToRedo,
}

/// A node's slot in the tree, plus its detached subtree while it is out of
/// the scene.
#[derive(Debug, Clone, PartialEq)]
pub struct Placement {
    pub id: NodeId,
    pub parent: NodeId,
    pub index: usize,
    pub detached: Option<NodeTree>,
}

impl Placement {
    /// Record where a live node currently sits.
    pub fn of<H: SceneHost + ?Sized>(host: &H, id: NodeId) -> Option<Self> {
        Some(Self {
            id,
            parent: host.parent(id)?,
            index: host.index_in_parent(id)?,
            detached: None,
        })
    }

    fn detach<H: SceneHost + ?Sized>(&mut self, host: &mut H) -> Result<(), SceneError> {
        let tree = host.remove(self.id).ok_or(SceneError::NotFound(self.id))?;
        self.detached = Some(tree);
        Ok(())
    }

    /// Reinsert the detached subtree. On failure the subtree is kept.
    fn attach<H: SceneHost + ?Sized>(&mut self, host: &mut H) -> Result<(), SceneError> {
        let tree = self.detached.clone().ok_or(SceneError::NotFound(self.id))?;
        host.insert(tree, self.parent, self.index)?;
        self.detached = None;
        Ok(())
    }
}

/// Remove `ids` from the host, recording each slot in removal order.
pub fn detach_all<H: SceneHost + ?Sized>(host: &mut H, ids: &[NodeId]) -> Vec<Placement> {
    let mut removed = Vec::with_capacity(ids.len());
    for &id in ids {
        let Some(mut placement) = Placement::of(host, id) else { continue };
        placement.detached = host.remove(id);
        if placement.detached.is_some() {
            removed.push(placement);
        }
    }
    removed
}

/// One undoable operation.
#[derive(Debug, Clone, PartialEq)]
pub enum HistoryEntry {
    /// Nodes created by paste, in creation order.
    Insert(Vec<Placement>),
    /// Nodes removed by cut or delete, in removal order.
    Remove(Vec<Placement>),
    Transform(Vec<TransformChange>),
    Reparent {
        id: NodeId,
        from_parent: NodeId,
        from_index: usize,
        to_parent: NodeId,
        to_index: usize,
    },
}

impl HistoryEntry {
    /// Undo the operation. Returns the items that could not be reverted.
    fn revert<H: SceneHost + ?Sized>(&mut self, host: &mut H) -> Vec<SceneError> {
        let mut failures = Vec::new();
        match self {
            HistoryEntry::Insert(items) => {
                for item in items.iter_mut().rev() {
                    failures.extend(item.detach(host).err());
                }
            }
            HistoryEntry::Remove(items) => {
                for item in items.iter_mut().rev() {
                    failures.extend(item.attach(host).err());
                }
            }
            HistoryEntry::Transform(changes) => {
                for change in changes.iter() {
                    failures.extend(set_transform(host, change.id, change.before).err());
                }
            }
            HistoryEntry::Reparent {
                id,
                from_parent,
                from_index,
                ..
            } => failures.extend(host.move_node(*id, *from_parent, *from_index).err()),
        }
        failures
    }

    /// Redo the operation. Returns the items that could not be reapplied.
    fn reapply<H: SceneHost + ?Sized>(&mut self, host: &mut H) -> Vec<SceneError> {
        let mut failures = Vec::new();
        match self {
            HistoryEntry::Insert(items) => {
                for item in items.iter_mut() {
                    failures.extend(item.attach(host).err());
                }
            }
            HistoryEntry::Remove(items) => {
                for item in items.iter_mut() {
                    failures.extend(item.detach(host).err());
                }
            }
            HistoryEntry::Transform(changes) => {
                for change in changes.iter() {
                    failures.extend(set_transform(host, change.id, change.after).err());
                }
            }
            HistoryEntry::Reparent {
                id,
                to_parent,
                to_index,
                ..
            } => failures.extend(host.move_node(*id, *to_parent, *to_index).err()),
        }
        failures
    }
}

fn set_transform<H: SceneHost + ?Sized>(
    host: &mut H,
    id: NodeId,
    transform: crate::scene::Transform,
) -> Result<(), SceneError> {
    let node = host.get_mut(id).ok_or(SceneError::NotFound(id))?;
    node.transform = transform;
    host.mark_updated(id);
    Ok(())
}

/// Undo and redo stacks.
#[derive(Debug, Clone)]
pub struct History {
    undo_stack: Vec<HistoryEntry>,
    redo_stack: Vec<HistoryEntry>,
    limit: usize,
}

impl Default for History {
    fn default() -> Self {
        Self::new()
    }
}

impl History {
    pub fn new() -> Self {
        Self::with_limit(MAX_UNDO_HISTORY)
    }

    pub fn with_limit(limit: usize) -> Self {
        Self {
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            limit: limit.max(1),
        }
    }

    /// Record an operation that has just been performed.
    pub fn push(&mut self, entry: HistoryEntry) {
        self.undo_stack.push(entry);
        // Clear redo stack when new changes are made
        self.redo_stack.clear();
        if self.undo_stack.len() > self.limit {
            self.undo_stack.remove(0);
        }
    }

    /// Revert the latest entry. Returns how many of its items were skipped.
    pub fn undo<H: SceneHost + ?Sized>(&mut self, host: &mut H) -> Result<usize, HistoryError> {
        let mut entry = self.undo_stack.pop().ok_or(HistoryError::NothingToUndo)?;
        let failures = entry.revert(host);
        for err in &failures {
            log::warn!("Undo skipped an item: {}", err);
        }
        self.redo_stack.push(entry);
        Ok(failures.len())
    }

    /// Reapply the latest undone entry. Returns how many of its items were
    /// skipped.
    pub fn redo<H: SceneHost + ?Sized>(&mut self, host: &mut H) -> Result<usize, HistoryError> {
        let mut entry = self.redo_stack.pop().ok_or(HistoryError::NothingToRedo)?;
        let failures = entry.reapply(host);
        for err in &failures {
            log::warn!("Redo skipped an item: {}", err);
        }
        self.undo_stack.push(entry);
        Ok(failures.len())
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_len(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }
}
