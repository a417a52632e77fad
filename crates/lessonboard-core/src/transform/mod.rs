//! Anchored resize and scale of the selection.
//!
//! The engine never touches node geometry payloads. A resize maps the
//! selection's bounding box onto a new box and applies that mapping to each
//! selected node's position and scale, so groups scale correctly without
//! rewriting their children.

mod geometry;
mod session;

pub use geometry::{ResizeConstraints, resize_bounds, scale_about_center};
pub use session::ResizeSession;

use crate::scene::{NodeId, SceneHost, Transform, top_level_only, union_bounds};
use kurbo::{Affine, Point, Rect};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Handle hit tolerance in screen pixels.
pub const HANDLE_HIT_TOLERANCE: f64 = 12.0;

/// Transform errors.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TransformError {
    #[error("Nothing is selected")]
    EmptySelection,
    #[error("No selected node can be transformed")]
    InvalidSelection,
    #[error("Resize collapses the selection to {width}x{height}")]
    DegenerateScale { width: f64, height: f64 },
    #[error("Transform failed: {0}")]
    ApplyFailed(String),
}

/// Result type for transform operations.
pub type TransformResult<T> = Result<T, TransformError>;

/// Corner positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Corner {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

/// Edge positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Edge {
    Top,
    Right,
    Bottom,
    Left,
}

/// A resize handle on the selection box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResizeHandle {
    Corner(Corner),
    Edge(Edge),
}

impl ResizeHandle {
    pub const ALL: [ResizeHandle; 8] = [
        ResizeHandle::Corner(Corner::TopLeft),
        ResizeHandle::Edge(Edge::Top),
        ResizeHandle::Corner(Corner::TopRight),
        ResizeHandle::Edge(Edge::Right),
        ResizeHandle::Corner(Corner::BottomRight),
        ResizeHandle::Edge(Edge::Bottom),
        ResizeHandle::Corner(Corner::BottomLeft),
        ResizeHandle::Edge(Edge::Left),
    ];
}

/// Find the handle of `bounds` under `point`. Corners win over edges.
pub fn hit_test_handles(bounds: Rect, point: Point, tolerance: f64) -> Option<ResizeHandle> {
    let hit = |handle: &&ResizeHandle| {
        let p = handle.position(bounds);
        (p - point).hypot2() <= tolerance * tolerance
    };
    ResizeHandle::ALL
        .iter()
        .filter(|h| matches!(h, ResizeHandle::Corner(_)))
        .find(hit)
        .or_else(|| {
            ResizeHandle::ALL
                .iter()
                .filter(|h| matches!(h, ResizeHandle::Edge(_)))
                .find(hit)
        })
        .copied()
}

/// Why a node was left out of a transform batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeFailure {
    Missing,
    Locked,
    /// The mapped transform was not finite.
    NonFinite,
}

/// Transform of one node before and after an operation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransformChange {
    pub id: NodeId,
    pub before: Transform,
    pub after: Transform,
}

/// Outcome of a batch transform.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransformReport {
    pub transformed: Vec<TransformChange>,
    pub failures: Vec<(NodeId, NodeFailure)>,
}

impl TransformReport {
    pub fn is_noop(&self) -> bool {
        self.transformed.is_empty()
    }
}

/// Split `ids` into nodes that can be transformed and per-node failures.
///
/// Descendants of other selected nodes are dropped; they move with their
/// ancestor.
pub(crate) fn partition_transformable<H: SceneHost + ?Sized>(
    host: &H,
    ids: &[NodeId],
) -> (Vec<NodeId>, Vec<(NodeId, NodeFailure)>) {
    let mut ok = Vec::new();
    let mut failures = Vec::new();
    for id in top_level_only(host, ids) {
        match host.get(id) {
            None => failures.push((id, NodeFailure::Missing)),
            Some(node) if node.locked => {
                log::debug!("Skipping locked node {} in transform", id);
                failures.push((id, NodeFailure::Locked));
            }
            Some(_) => ok.push(id),
        }
    }
    (ok, failures)
}

/// World-space bounding box of the transformable part of the selection.
pub fn selection_bounds<H: SceneHost + ?Sized>(host: &H, ids: &[NodeId]) -> TransformResult<Rect> {
    if ids.is_empty() {
        return Err(TransformError::EmptySelection);
    }
    let (ok, _) = partition_transformable(host, ids);
    union_bounds(host, &ok).ok_or(TransformError::InvalidSelection)
}

/// Map every node in `ids` from the `from` box onto the `to` box.
///
/// Positions are remapped in each node's parent space and scales multiplied
/// by the box ratio. Bad nodes are reported and do not abort the batch.
pub fn apply_box_transform<H: SceneHost + ?Sized>(
    host: &mut H,
    ids: &[NodeId],
    from: Rect,
    to: Rect,
) -> TransformResult<TransformReport> {
    if ids.is_empty() {
        return Err(TransformError::EmptySelection);
    }
    let sx = to.width() / from.width();
    let sy = to.height() / from.height();
    if !sx.is_finite() || !sy.is_finite() || sx <= 0.0 || sy <= 0.0 {
        return Err(TransformError::DegenerateScale {
            width: to.width(),
            height: to.height(),
        });
    }
    let world_map = Affine::translate(to.origin().to_vec2())
        * Affine::scale_non_uniform(sx, sy)
        * Affine::translate(-from.origin().to_vec2());

    let (targets, mut failures) = partition_transformable(host, ids);
    if targets.is_empty() {
        return Err(TransformError::InvalidSelection);
    }

    let mut transformed = Vec::new();
    for id in targets {
        let parent_affine = host
            .parent(id)
            .map_or(Affine::IDENTITY, |p| host.world_transform(p));
        let Some(node) = host.get_mut(id) else {
            failures.push((id, NodeFailure::Missing));
            continue;
        };
        let before = node.transform;
        let local_map = parent_affine.inverse() * world_map * parent_affine;
        let mut after = before;
        after.set_position(local_map * before.position());
        after.scale_x *= sx;
        after.scale_y *= sy;
        if !after.is_finite() {
            log::warn!("Transform of {} produced a non-finite result", id);
            failures.push((id, NodeFailure::NonFinite));
            continue;
        }
        node.transform = after;
        host.mark_updated(id);
        transformed.push(TransformChange { id, before, after });
    }

    if transformed.is_empty() {
        return Err(TransformError::ApplyFailed(format!(
            "{} node(s) failed",
            failures.len()
        )));
    }
    log::debug!(
        "Mapped {} node(s) from {:?} to {:?}",
        transformed.len(),
        from,
        to
    );
    Ok(TransformReport {
        transformed,
        failures,
    })
}

/// Bounds the selection would have after dragging `handle`. Nothing is mutated.
pub fn preview_resize<H: SceneHost + ?Sized>(
    host: &H,
    ids: &[NodeId],
    handle: ResizeHandle,
    pointer: Point,
    drag_start: Point,
    constraints: &ResizeConstraints,
) -> TransformResult<Rect> {
    let bounds = selection_bounds(host, ids)?;
    resize_bounds(bounds, handle, pointer, drag_start, constraints)
}

/// Resize the selection by dragging `handle` from `drag_start` to `pointer`.
pub fn resize_selection<H: SceneHost + ?Sized>(
    host: &mut H,
    ids: &[NodeId],
    handle: ResizeHandle,
    pointer: Point,
    drag_start: Point,
    constraints: &ResizeConstraints,
) -> TransformResult<TransformReport> {
    let bounds = selection_bounds(host, ids)?;
    let target = resize_bounds(bounds, handle, pointer, drag_start, constraints)?;
    apply_box_transform(host, ids, bounds, target)
}

/// Bounds the selection would have after a uniform scale. Nothing is mutated.
pub fn preview_uniform<H: SceneHost + ?Sized>(
    host: &H,
    ids: &[NodeId],
    factor: f64,
) -> TransformResult<Rect> {
    let bounds = selection_bounds(host, ids)?;
    scale_about_center(bounds, factor)
}

/// Scale the selection about its centre by a single factor.
///
/// A factor of exactly 1.0 leaves every node untouched.
pub fn scale_uniform<H: SceneHost + ?Sized>(
    host: &mut H,
    ids: &[NodeId],
    factor: f64,
) -> TransformResult<TransformReport> {
    let bounds = selection_bounds(host, ids)?;
    let target = scale_about_center(bounds, factor)?;
    if factor == 1.0 {
        return Ok(TransformReport::default());
    }
    apply_box_transform(host, ids, bounds, target)
}
