//! Interactive drag-resize state.

use super::{
    NodeFailure, ResizeConstraints, ResizeHandle, TransformChange, TransformError,
    TransformReport, TransformResult, apply_box_transform, partition_transformable,
    resize_bounds,
};
use crate::scene::{NodeId, SceneHost, Transform, union_bounds};
use kurbo::{Point, Rect};

/// State of an in-progress resize drag.
///
/// Every pointer move is computed from the transforms captured at
/// [`ResizeSession::begin`], so repeated updates never accumulate error.
#[derive(Debug, Clone)]
pub struct ResizeSession {
    handle: ResizeHandle,
    drag_start: Point,
    constraints: ResizeConstraints,
    original_bounds: Rect,
    originals: Vec<(NodeId, Transform)>,
    skipped: Vec<(NodeId, NodeFailure)>,
    current_bounds: Rect,
}

impl ResizeSession {
    /// Capture the selection at the start of a drag.
    pub fn begin<H: SceneHost + ?Sized>(
        host: &H,
        ids: &[NodeId],
        handle: ResizeHandle,
        drag_start: Point,
        constraints: ResizeConstraints,
    ) -> TransformResult<Self> {
        if ids.is_empty() {
            return Err(TransformError::EmptySelection);
        }
        let (targets, skipped) = partition_transformable(host, ids);
        let original_bounds =
            union_bounds(host, &targets).ok_or(TransformError::InvalidSelection)?;
        let originals = targets
            .iter()
            .filter_map(|&id| host.get(id).map(|n| (id, n.transform)))
            .collect();
        log::debug!("Resize session started with {:?} at {:?}", handle, drag_start);
        Ok(Self {
            handle,
            drag_start,
            constraints,
            original_bounds,
            originals,
            skipped,
            current_bounds: original_bounds,
        })
    }

    pub fn handle(&self) -> ResizeHandle {
        self.handle
    }

    pub fn original_bounds(&self) -> Rect {
        self.original_bounds
    }

    /// Bounds after the last accepted update.
    pub fn current_bounds(&self) -> Rect {
        self.current_bounds
    }

    /// Nodes excluded when the session began.
    pub fn skipped(&self) -> &[(NodeId, NodeFailure)] {
        &self.skipped
    }

    /// Bounds a pointer position would produce. Nothing is mutated.
    pub fn preview(&self, pointer: Point) -> TransformResult<Rect> {
        resize_bounds(
            self.original_bounds,
            self.handle,
            pointer,
            self.drag_start,
            &self.constraints,
        )
    }

    /// Follow the pointer.
    ///
    /// A rejected position leaves the nodes where the last accepted update put
    /// them.
    pub fn update<H: SceneHost + ?Sized>(
        &mut self,
        host: &mut H,
        pointer: Point,
    ) -> TransformResult<TransformReport> {
        let target = self.preview(pointer)?;
        self.restore(host);
        let ids: Vec<NodeId> = self.originals.iter().map(|(id, _)| *id).collect();
        let report = apply_box_transform(host, &ids, self.original_bounds, target)?;
        self.current_bounds = target;
        Ok(report)
    }

    /// Abort the drag and put every node back.
    pub fn cancel<H: SceneHost + ?Sized>(self, host: &mut H) {
        self.restore(host);
        log::debug!("Resize session cancelled");
    }

    /// Finish the drag, returning the net change per node.
    pub fn commit<H: SceneHost + ?Sized>(self, host: &H) -> Vec<TransformChange> {
        let changes: Vec<TransformChange> = self
            .originals
            .iter()
            .filter_map(|&(id, before)| {
                let after = host.get(id)?.transform;
                (after != before).then_some(TransformChange { id, before, after })
            })
            .collect();
        log::info!("Resized {} node(s)", changes.len());
        changes
    }

    fn restore<H: SceneHost + ?Sized>(&self, host: &mut H) {
        for &(id, original) in &self.originals {
            if let Some(node) = host.get_mut(id) {
                if node.transform != original {
                    node.transform = original;
                    host.mark_updated(id);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{Node, Scene};
    use crate::transform::{Corner, Edge};

    fn setup() -> (Scene, NodeId, NodeId) {
        let mut scene = Scene::new();
        let root = scene.root();
        let a = scene.add(Node::rect(50.0, 50.0), root).unwrap();
        let b = scene.add(Node::rect(50.0, 50.0).at(50.0, 0.0), root).unwrap();
        (scene, a, b)
    }

    #[test]
    fn test_updates_do_not_drift() {
        let (mut scene, a, b) = setup();
        let handle = ResizeHandle::Corner(Corner::BottomRight);
        let start = Point::new(100.0, 50.0);
        let mut session = ResizeSession::begin(
            &scene,
            &[a, b],
            handle,
            start,
            ResizeConstraints::unconstrained(),
        )
        .unwrap();
        for step in 1..=20 {
            session
                .update(&mut scene, Point::new(100.0 + step as f64 * 7.0, 50.0))
                .unwrap();
        }
        session.update(&mut scene, Point::new(200.0, 100.0)).unwrap();
        let bounds = union_bounds(&scene, &[a, b]).unwrap();
        assert!((bounds.x1 - 200.0).abs() < 1e-9);
        assert!((bounds.y1 - 100.0).abs() < 1e-9);
        assert!((scene.get(b).unwrap().transform.x - 100.0).abs() < 1e-9);

        let changes = session.commit(&scene);
        assert_eq!(changes.len(), 2);
        assert_eq!(changes[0].before, Transform::default());
    }

    #[test]
    fn test_rejected_update_keeps_last_state() {
        let (mut scene, a, b) = setup();
        let start = Point::new(100.0, 25.0);
        let mut session = ResizeSession::begin(
            &scene,
            &[a, b],
            ResizeHandle::Edge(Edge::Right),
            start,
            ResizeConstraints::unconstrained(),
        )
        .unwrap();
        session.update(&mut scene, Point::new(120.0, 25.0)).unwrap();
        let accepted = scene.get(b).unwrap().transform;
        let result = session.update(&mut scene, Point::new(-50.0, 25.0));
        assert!(matches!(result, Err(TransformError::DegenerateScale { .. })));
        assert_eq!(scene.get(b).unwrap().transform, accepted);
        assert!((session.current_bounds().width() - 120.0).abs() < 1e-9);
    }

    #[test]
    fn test_cancel_restores() {
        let (mut scene, a, b) = setup();
        let start = Point::new(0.0, 0.0);
        let mut session = ResizeSession::begin(
            &scene,
            &[a, b],
            ResizeHandle::Corner(Corner::TopLeft),
            start,
            ResizeConstraints::default(),
        )
        .unwrap();
        session.update(&mut scene, Point::new(-30.0, -30.0)).unwrap();
        assert_ne!(scene.get(a).unwrap().transform, Transform::default());
        session.cancel(&mut scene);
        assert_eq!(scene.get(a).unwrap().transform, Transform::default());
        assert_eq!(scene.get(b).unwrap().transform, Transform::at(50.0, 0.0));
    }

    #[test]
    fn test_begin_requires_transformable_node() {
        let (mut scene, a, _) = setup();
        scene.get_mut(a).unwrap().locked = true;
        let result = ResizeSession::begin(
            &scene,
            &[a],
            ResizeHandle::Edge(Edge::Top),
            Point::ZERO,
            ResizeConstraints::default(),
        );
        assert!(matches!(result, Err(TransformError::InvalidSelection)));
    }
}
