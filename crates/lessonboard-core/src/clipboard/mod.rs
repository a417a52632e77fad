//! Clipboard: capture nodes as descriptors and rebuild them on paste.
//!
//! The clipboard holds independent value copies, so it stays valid after the
//! originals are cut or edited. Repeated pastes step further away from the
//! source so copies never land exactly on top of each other.

mod descriptor;
mod media;
mod reconstruct;

pub use descriptor::{DescriptorPayload, NodeDescriptor, SNAPSHOT_MAX_SIZE, SkipReason};
pub use media::{NodeProps, ReapplyQueue};
pub use reconstruct::{ReconstructError, table_tree};

use crate::config::ClipboardConfig;
use crate::events::ClipboardEvent;
use crate::history::{Placement, detach_all};
use crate::raster::NodeRasterizer;
use crate::scene::{
    MediaHost, NodeId, NodeKind, SceneHost, TraversalLimits, is_ancestor, top_level_only,
    union_bounds,
};
use descriptor::{Classified, DescribeContext, classify, describe};
use kurbo::{Point, Vec2};
use reconstruct::{build_tree, create_media};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

#[cfg(not(target_arch = "wasm32"))]
use std::time::Instant;

#[cfg(target_arch = "wasm32")]
use web_time::Instant;

/// Clipboard errors.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ClipboardError {
    #[error("Nothing in the selection can be copied ({skipped} skipped)")]
    NothingToCopy { skipped: usize },
    #[error("Clipboard is empty")]
    Empty,
    #[error("No clipboard item could be pasted ({failed} failed)")]
    NothingPasted { failed: usize },
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Result type for clipboard operations.
pub type ClipboardResult<T> = Result<T, ClipboardError>;

/// Outcome of a copy.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CopyReport {
    /// Number of top-level descriptors captured.
    pub copied: usize,
    /// Of those, how many are static snapshots of untagged drawables.
    pub snapshotted: usize,
    pub skipped: Vec<(NodeId, SkipReason)>,
    /// Live nodes the descriptors were taken from.
    pub sources: Vec<NodeId>,
}

/// A clipboard item that failed to paste.
#[derive(Debug, Clone, PartialEq)]
pub struct PasteFailure {
    pub index: usize,
    pub kind: NodeKind,
    /// Set when the failure is a media element nested inside item `index`;
    /// the item itself was pasted.
    pub nested_in: Option<NodeId>,
    pub error: ReconstructError,
}

/// Outcome of a paste.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PasteReport {
    /// Top-level nodes created, in clipboard order.
    pub created: Vec<NodeId>,
    pub failures: Vec<PasteFailure>,
    pub offset: Vec2,
    /// Where each created node sits, for undo.
    pub placements: Vec<Placement>,
}

/// Serialized form used for the system clipboard.
#[derive(Debug, Serialize, Deserialize)]
struct ClipboardPayload {
    format: String,
    entries: Vec<NodeDescriptor>,
}

const PAYLOAD_FORMAT: &str = "lessonboard/nodes+json";

/// Holds copied node descriptors.
#[derive(Debug, Clone)]
pub struct Clipboard {
    entries: Vec<NodeDescriptor>,
    /// Nodes the contents came from, plus every node pasted from them.
    /// A paste never lands inside one of these.
    origins: Vec<NodeId>,
    paste_count: u32,
    config: ClipboardConfig,
    limits: TraversalLimits,
    reapply: ReapplyQueue,
    events: Vec<ClipboardEvent>,
}

impl Default for Clipboard {
    fn default() -> Self {
        Self::new(ClipboardConfig::default(), TraversalLimits::default())
    }
}

impl Clipboard {
    pub fn new(config: ClipboardConfig, limits: TraversalLimits) -> Self {
        let reapply = ReapplyQueue::from_millis(&config.media_reapply_delays_ms);
        Self {
            entries: Vec::new(),
            origins: Vec::new(),
            paste_count: 0,
            config,
            limits,
            reapply,
            events: Vec::new(),
        }
    }

    pub fn entries(&self) -> &[NodeDescriptor] {
        &self.entries
    }

    pub fn has_content(&self) -> bool {
        !self.entries.is_empty()
    }

    /// Number of pastes since the last copy.
    pub fn paste_count(&self) -> u32 {
        self.paste_count
    }

    pub fn reapply_queue(&self) -> &ReapplyQueue {
        &self.reapply
    }

    /// Take pending notifications.
    pub fn drain_events(&mut self) -> Vec<ClipboardEvent> {
        std::mem::take(&mut self.events)
    }

    fn notify(&mut self, pasted: Option<usize>) {
        self.events.push(ClipboardEvent::StateChanged {
            has_clipboard: self.has_content(),
            pasted,
        });
    }

    /// Replace the clipboard with descriptors of `ids`.
    ///
    /// Selected descendants of other selected nodes are dropped. Fails, leaving
    /// the previous contents in place, when nothing could be described.
    pub fn copy<H: SceneHost>(
        &mut self,
        host: &H,
        ids: &[NodeId],
        rasterizer: Option<&dyn NodeRasterizer>,
    ) -> ClipboardResult<CopyReport> {
        let (entries, report) = self.capture(host, ids, rasterizer)?;
        self.entries = entries;
        self.origins = report.sources.clone();
        self.paste_count = 0;
        log::info!(
            "Copied {} item(s), {} snapshotted, {} skipped",
            report.copied,
            report.snapshotted,
            report.skipped.len()
        );
        self.notify(None);
        Ok(report)
    }

    /// Copy, then remove the originals from the host.
    ///
    /// Returns the removed slots, in removal order, for undo.
    pub fn cut<H: SceneHost>(
        &mut self,
        host: &mut H,
        ids: &[NodeId],
        rasterizer: Option<&dyn NodeRasterizer>,
    ) -> ClipboardResult<(CopyReport, Vec<Placement>)> {
        let report = self.copy(host, ids, rasterizer)?;
        let removed = detach_all(host, &report.sources);
        log::info!("Cut {} node(s)", removed.len());
        Ok((report, removed))
    }

    fn capture<H: SceneHost>(
        &self,
        host: &H,
        ids: &[NodeId],
        rasterizer: Option<&dyn NodeRasterizer>,
    ) -> ClipboardResult<(Vec<NodeDescriptor>, CopyReport)> {
        let ctx = DescribeContext {
            rasterizer,
            snapshot_unknown: self.config.snapshot_unknown,
            limits: self.limits,
        };
        let mut entries = Vec::new();
        let mut report = CopyReport::default();
        let mut seen = HashSet::new();

        for id in top_level_only(host, ids) {
            let source = match classify(host, id, self.config.max_classify_depth) {
                Classified::Tagged(source) | Classified::Unowned(source) => source,
                Classified::Owned { owner } => {
                    log::debug!("Copying owner {} of untagged drawable {}", owner, id);
                    owner
                }
                Classified::Unclassifiable => {
                    log::warn!("Skipping unclassifiable node {} in copy", id);
                    report.skipped.push((id, SkipReason::Unclassifiable));
                    continue;
                }
                Classified::Missing => {
                    report.skipped.push((id, SkipReason::Missing));
                    continue;
                }
            };
            if !seen.insert(source) {
                continue;
            }
            match describe(host, source, &ctx) {
                Ok(described) => {
                    report.snapshotted += described.snapshotted;
                    entries.push(described.descriptor);
                    report.sources.push(source);
                }
                Err(reason) => {
                    log::warn!("Skipping node {} in copy: {:?}", id, reason);
                    report.skipped.push((id, reason));
                }
            }
        }

        if entries.is_empty() {
            return Err(ClipboardError::NothingToCopy {
                skipped: report.skipped.len(),
            });
        }
        report.copied = entries.len();
        Ok((entries, report))
    }

    /// Rebuild the clipboard contents under `target`.
    ///
    /// Each paste moves the copies one more step away from the originals.
    /// With a pointer, the pasted group is centred on it instead.
    pub fn paste<H: SceneHost + MediaHost>(
        &mut self,
        host: &mut H,
        target: Option<NodeId>,
        pointer: Option<Point>,
        now: Instant,
    ) -> ClipboardResult<PasteReport> {
        if self.entries.is_empty() {
            return Err(ClipboardError::Empty);
        }
        let parent = self.resolve_target(host, target);
        self.paste_count += 1;
        let step = self.config.paste_step * f64::from(self.paste_count);
        let offset = Vec2::new(step, step);

        let mut report = PasteReport {
            offset,
            ..PasteReport::default()
        };
        let mut media_ids = Vec::new();
        for (index, entry) in self.entries.iter().enumerate() {
            let mut desc = entry.clone();
            desc.transform.translate(offset);
            match paste_one(host, &desc, parent, &mut media_ids) {
                Ok(pasted) => {
                    for (error, kind) in pasted.nested_failures {
                        log::warn!("Nested {:?} in pasted item {} not recreated: {}", kind, index, error);
                        report.failures.push(PasteFailure {
                            index,
                            kind,
                            nested_in: Some(pasted.id),
                            error,
                        });
                    }
                    report.created.push(pasted.id);
                }
                Err(error) => {
                    log::warn!("Failed to paste {:?} item {}: {}", desc.kind(), index, error);
                    report.failures.push(PasteFailure {
                        index,
                        kind: desc.kind(),
                        nested_in: None,
                        error,
                    });
                }
            }
        }

        if report.created.is_empty() {
            self.paste_count -= 1;
            return Err(ClipboardError::NothingPasted {
                failed: report.failures.len(),
            });
        }

        if let Some(pointer) = pointer {
            center_on(host, parent, &report.created, pointer);
        }

        for id in media_ids {
            if let Some(node) = host.get(id) {
                let props = NodeProps::capture(node);
                self.reapply.schedule(id, props, now);
            }
        }

        report.placements = report
            .created
            .iter()
            .filter_map(|&id| Placement::of(host, id))
            .collect();
        self.origins.extend(report.created.iter().copied());
        log::info!(
            "Pasted {} item(s) with offset {:?}, {} failed",
            report.created.len(),
            offset,
            report.failures.len()
        );
        self.notify(Some(report.created.len()));
        Ok(report)
    }

    /// Run the next-frame media reapply pass.
    pub fn on_animation_frame<H: SceneHost + ?Sized>(&mut self, host: &mut H) -> usize {
        self.reapply.on_animation_frame(host)
    }

    /// Run media reapply passes whose delay has elapsed.
    pub fn poll_reapply<H: SceneHost + ?Sized>(&mut self, host: &mut H, now: Instant) -> usize {
        self.reapply.poll(host, now)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.origins.clear();
        self.paste_count = 0;
        self.notify(None);
    }

    /// Serialize the contents for the system clipboard.
    pub fn export_json(&self) -> ClipboardResult<String> {
        let payload = ClipboardPayload {
            format: PAYLOAD_FORMAT.to_string(),
            entries: self.entries.clone(),
        };
        serde_json::to_string(&payload).map_err(|e| ClipboardError::Serialization(e.to_string()))
    }

    /// Replace the contents with descriptors read from the system clipboard.
    pub fn import_json(&mut self, json: &str) -> ClipboardResult<usize> {
        let payload: ClipboardPayload =
            serde_json::from_str(json).map_err(|e| ClipboardError::Serialization(e.to_string()))?;
        if payload.format != PAYLOAD_FORMAT {
            return Err(ClipboardError::Serialization(format!(
                "unsupported clipboard format {}",
                payload.format
            )));
        }
        if payload.entries.is_empty() {
            return Err(ClipboardError::Empty);
        }
        self.entries = payload.entries;
        self.origins.clear();
        self.paste_count = 0;
        self.notify(None);
        Ok(self.entries.len())
    }

    /// The container a paste lands in: `target` if it is a group, scene or
    /// the root, else the root.
    ///
    /// A target that is one of the copied nodes or their pasted copies, or
    /// lies inside one, is replaced by the parent of that node, so copies land
    /// beside the originals instead of inside them.
    fn resolve_target<H: SceneHost + ?Sized>(&self, host: &H, target: Option<NodeId>) -> NodeId {
        let mut candidate = target;
        while let Some(id) = candidate {
            let inside_origin = self
                .origins
                .iter()
                .any(|&origin| origin == id || is_ancestor(host, origin, id));
            if !inside_origin {
                break;
            }
            candidate = host.parent(id);
        }
        container_or_root(host, candidate)
    }
}

fn container_or_root<H: SceneHost + ?Sized>(host: &H, target: Option<NodeId>) -> NodeId {
    let root = host.root();
    match target {
        Some(id) if id == root => root,
        Some(id) => match host.get(id) {
            Some(node) if node.kind().is_container() => id,
            _ => {
                log::debug!("Paste target {} is not a container, using root", id);
                root
            }
        },
        None => root,
    }
}

/// A pasted top-level item and the nested media it could not recreate.
struct Pasted {
    id: NodeId,
    nested_failures: Vec<(ReconstructError, NodeKind)>,
}

fn paste_one<H: SceneHost + MediaHost>(
    host: &mut H,
    desc: &NodeDescriptor,
    parent: NodeId,
    media_ids: &mut Vec<NodeId>,
) -> Result<Pasted, ReconstructError> {
    if desc.kind() == NodeKind::Media {
        let id = create_media(host, desc, parent, None)?;
        media_ids.push(id);
        return Ok(Pasted {
            id,
            nested_failures: Vec::new(),
        });
    }
    let built = build_tree(desc)?;
    let index = host.children(parent).len();
    let id = host.insert(built.tree, parent, index)?;
    let mut nested_failures = Vec::new();
    for deferred in built.media {
        match create_media(host, deferred.descriptor, deferred.parent, Some(deferred.index)) {
            Ok(media_id) => media_ids.push(media_id),
            Err(err) => nested_failures.push((err, deferred.descriptor.kind())),
        }
    }
    Ok(Pasted {
        id,
        nested_failures,
    })
}

/// Shift `ids` so the centre of their union lands on `pointer`.
fn center_on<H: SceneHost + ?Sized>(host: &mut H, parent: NodeId, ids: &[NodeId], pointer: Point) {
    let Some(bounds) = union_bounds(host, ids) else { return };
    let to_local = host.world_transform(parent).inverse();
    let delta = (to_local * pointer) - (to_local * bounds.center());
    for &id in ids {
        if let Some(node) = host.get_mut(id) {
            node.transform.translate(delta);
            host.mark_updated(id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::testing::StubRasterizer;
    use crate::scene::{
        Graphics, HelperKind, Media, MediaKind, MediaSource, MediaState, Node, NodeContent, Scene,
        SerializableColor, Table, Transform,
    };
    use kurbo::Rect;
    use std::time::Duration;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    fn audio(url: &str) -> Node {
        Node::new(NodeContent::Media(Media {
            kind: MediaKind::Audio,
            source: MediaSource {
                url: url.into(),
                title: "Clip".into(),
                poster: None,
            },
            state: MediaState::Ready,
            width: 300.0,
            height: 54.0,
        }))
    }

    fn positions(scene: &Scene, ids: &[NodeId]) -> Vec<(f64, f64)> {
        ids.iter()
            .map(|&id| {
                let t = scene.get(id).unwrap().transform;
                (t.x, t.y)
            })
            .collect()
    }

    #[test]
    fn test_repeated_paste_offsets() {
        let mut scene = Scene::new();
        let root = scene.root();
        let a = scene.add(Node::text("a").at(10.0, 10.0), root).unwrap();
        let b = scene.add(Node::rect(5.0, 5.0).at(100.0, 0.0), root).unwrap();
        let mut clipboard = Clipboard::default();
        clipboard.copy(&scene, &[a, b], None).unwrap();

        let now = Instant::now();
        let first = clipboard.paste(&mut scene, None, None, now).unwrap();
        assert_eq!(first.created.len(), 2);
        assert_eq!(positions(&scene, &first.created), vec![(30.0, 30.0), (120.0, 20.0)]);

        let second = clipboard.paste(&mut scene, None, None, now).unwrap();
        assert_eq!(positions(&scene, &second.created), vec![(50.0, 50.0), (140.0, 40.0)]);
        assert_eq!(clipboard.paste_count(), 2);

        // A new copy resets the counter.
        clipboard.copy(&scene, &[a], None).unwrap();
        let third = clipboard.paste(&mut scene, None, None, now).unwrap();
        assert_eq!(positions(&scene, &third.created), vec![(30.0, 30.0)]);
    }

    #[test]
    fn test_copy_dedupes_selected_descendants() {
        let mut scene = Scene::new();
        let group = scene.add(Node::group(), scene.root()).unwrap();
        let child = scene.add(Node::rect(5.0, 5.0), group).unwrap();
        let mut clipboard = Clipboard::default();
        let report = clipboard.copy(&scene, &[child, group], None).unwrap();
        assert_eq!(report.copied, 1);
        assert_eq!(clipboard.entries()[0].node_count(), 2);
    }

    #[test]
    fn test_failed_copy_keeps_previous_contents() {
        let mut scene = Scene::new();
        let root = scene.root();
        let text = scene.add(Node::text("keep"), root).unwrap();
        let helper = scene.add(Node::helper(HelperKind::Marquee), root).unwrap();
        let mut clipboard = Clipboard::default();
        clipboard.copy(&scene, &[text], None).unwrap();
        clipboard.drain_events();

        let result = clipboard.copy(&scene, &[helper], None);
        assert_eq!(result, Err(ClipboardError::NothingToCopy { skipped: 1 }));
        assert_eq!(clipboard.entries().len(), 1);
        assert!(clipboard.drain_events().is_empty());
    }

    #[test]
    fn test_cut_then_paste() {
        let mut scene = Scene::new();
        let root = scene.root();
        let a = scene.add(Node::rect(5.0, 5.0), root).unwrap();
        let b = scene.add(Node::text("b"), root).unwrap();
        let mut clipboard = Clipboard::default();
        let (report, removed) = clipboard.cut(&mut scene, &[a, b], None).unwrap();
        assert_eq!(report.copied, 2);
        assert_eq!(removed.len(), 2);
        assert!(scene.children(root).is_empty());

        let pasted = clipboard.paste(&mut scene, None, None, Instant::now()).unwrap();
        assert_eq!(pasted.created.len(), 2);
        assert_eq!(scene.children(root).len(), 2);
    }

    #[test]
    fn test_empty_clipboard_paste_fails() {
        let mut scene = Scene::new();
        let mut clipboard = Clipboard::default();
        let result = clipboard.paste(&mut scene, None, None, Instant::now());
        assert_eq!(result, Err(ClipboardError::Empty));
    }

    #[test]
    fn test_table_round_trip() {
        let mut scene = Scene::new();
        let mut table = Table::grid(2, 3, 40.0, 20.0);
        table.settings.header_fill = Some(SerializableColor::new(0xee, 0xee, 0xee, 255));
        table.cell_mut(0, 0).unwrap().text = "Name".into();
        table.cell_mut(1, 2).unwrap().text = "42".into();
        let node = Node::new(NodeContent::Table(table.clone())).with_name("Scores");
        let id = scene.insert(table_tree(node), scene.root(), 0).unwrap();

        let mut clipboard = Clipboard::default();
        clipboard.copy(&scene, &[id], None).unwrap();
        let report = clipboard.paste(&mut scene, None, None, Instant::now()).unwrap();
        let pasted = scene.get(report.created[0]).unwrap();

        let NodeContent::Table(copy) = &pasted.content else {
            panic!("expected table");
        };
        assert_eq!(copy.settings, table.settings);
        assert_eq!(copy.cells, table.cells);
        assert_eq!(pasted.name.as_deref(), Some("Scores"));
        // Background + text per cell.
        assert_eq!(scene.children(report.created[0]).len(), 12);
    }

    #[test]
    fn test_paste_into_container_and_fallback() {
        let mut scene = Scene::new();
        let root = scene.root();
        let group = scene.add(Node::group(), root).unwrap();
        let leaf = scene.add(Node::rect(5.0, 5.0), root).unwrap();
        let mut clipboard = Clipboard::default();
        clipboard.copy(&scene, &[leaf], None).unwrap();

        let into_group = clipboard.paste(&mut scene, Some(group), None, Instant::now()).unwrap();
        assert_eq!(scene.parent(into_group.created[0]), Some(group));

        let fallback = clipboard.paste(&mut scene, Some(leaf), None, Instant::now()).unwrap();
        assert_eq!(scene.parent(fallback.created[0]), Some(root));
    }

    #[test]
    fn test_paste_centres_on_pointer() {
        let mut scene = Scene::new();
        let root = scene.root();
        let a = scene.add(Node::rect(20.0, 10.0).at(0.0, 0.0), root).unwrap();
        let b = scene.add(Node::rect(20.0, 10.0).at(80.0, 30.0), root).unwrap();
        let mut clipboard = Clipboard::default();
        clipboard.copy(&scene, &[a, b], None).unwrap();

        let pointer = Point::new(500.0, 400.0);
        let report = clipboard
            .paste(&mut scene, None, Some(pointer), Instant::now())
            .unwrap();
        let center = union_bounds(&scene, &report.created).unwrap().center();
        assert!(close(center.x, 500.0) && close(center.y, 400.0));
    }

    #[test]
    fn test_media_pasted_through_host_and_reapplied() {
        let mut scene = Scene::new();
        let root = scene.root();
        let original = scene
            .add_video_element("https://cdn.test/intro.mp4", "Intro", 0.0, 0.0, Some("p.png"))
            .unwrap();
        scene.resolve_media_loads();
        scene.get_mut(original).unwrap().transform.scale_x = 0.5;

        let mut clipboard = Clipboard::default();
        clipboard.copy(&scene, &[original], None).unwrap();
        let start = Instant::now();
        let report = clipboard.paste(&mut scene, Some(root), None, start).unwrap();
        let pasted = report.created[0];
        assert_eq!(scene.pending_media(), &[pasted]);
        assert_eq!(clipboard.reapply_queue().pending(), 1);

        // The load resolves and resets the scale; the next pass restores it.
        scene.resolve_media_loads();
        assert_eq!(scene.get(pasted).unwrap().transform.scale_x, 1.0);
        clipboard.poll_reapply(&mut scene, start + Duration::from_millis(60));
        assert_eq!(scene.get(pasted).unwrap().transform.scale_x, 0.5);
        assert!(matches!(
            &scene.get(pasted).unwrap().content,
            NodeContent::Media(m) if m.kind == MediaKind::Video && m.source.poster.as_deref() == Some("p.png")
        ));
    }

    #[test]
    fn test_per_item_failures_reported() {
        let mut scene = Scene::new();
        let text = scene.add(Node::text("ok"), scene.root()).unwrap();
        let mut clipboard = Clipboard::default();
        clipboard.copy(&scene, &[text], None).unwrap();
        let mut broken = clipboard.entries()[0].clone();
        broken.payload = DescriptorPayload::Table {
            settings: Table::grid(2, 2, 1.0, 1.0).settings,
            cells: Vec::new(),
        };
        clipboard.entries.push(broken);

        let report = clipboard.paste(&mut scene, None, None, Instant::now()).unwrap();
        assert_eq!(report.created.len(), 1);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].index, 1);
        assert_eq!(report.failures[0].kind, NodeKind::Table);
    }

    #[test]
    fn test_snapshot_counted_in_report() {
        let mut scene = Scene::new();
        let graphics = scene
            .add(
                Node::new(NodeContent::Graphics(Graphics {
                    bounds: Rect::new(0.0, 0.0, 10.0, 10.0),
                    color: SerializableColor::black(),
                })),
                scene.root(),
            )
            .unwrap();
        let rasterizer = StubRasterizer::default();
        let mut clipboard = Clipboard::default();
        let report = clipboard.copy(&scene, &[graphics], Some(&rasterizer)).unwrap();
        assert_eq!(report.snapshotted, 1);
        assert_eq!(clipboard.entries()[0].kind(), NodeKind::Image);

        let mut disabled = Clipboard::new(
            ClipboardConfig {
                snapshot_unknown: false,
                ..ClipboardConfig::default()
            },
            TraversalLimits::default(),
        );
        let result = disabled.copy(&scene, &[graphics], Some(&rasterizer));
        assert!(matches!(result, Err(ClipboardError::NothingToCopy { .. })));
    }

    #[test]
    fn test_export_import_json() {
        let mut scene = Scene::new();
        let node = scene
            .add(
                Node::rect(5.0, 5.0).with_transform(Transform {
                    rotation: 0.5,
                    ..Transform::at(3.0, 4.0)
                }),
                scene.root(),
            )
            .unwrap();
        let mut clipboard = Clipboard::default();
        clipboard.copy(&scene, &[node], None).unwrap();
        let json = clipboard.export_json().unwrap();

        let mut other = Clipboard::default();
        assert_eq!(other.import_json(&json).unwrap(), 1);
        assert_eq!(other.entries(), clipboard.entries());
        assert!(other.import_json("{\"format\":\"text/plain\",\"entries\":[]}").is_err());
    }

    #[test]
    fn test_events_emitted() {
        let mut scene = Scene::new();
        let node = scene.add(Node::text("x"), scene.root()).unwrap();
        let mut clipboard = Clipboard::default();
        clipboard.copy(&scene, &[node], None).unwrap();
        clipboard.paste(&mut scene, None, None, Instant::now()).unwrap();
        clipboard.clear();
        assert_eq!(
            clipboard.drain_events(),
            vec![
                ClipboardEvent::StateChanged {
                    has_clipboard: true,
                    pasted: None
                },
                ClipboardEvent::StateChanged {
                    has_clipboard: true,
                    pasted: Some(1)
                },
                ClipboardEvent::StateChanged {
                    has_clipboard: false,
                    pasted: None
                },
            ]
        );
    }

    #[test]
    fn test_paste_never_lands_inside_copied_group() {
        let mut scene = Scene::new();
        let root = scene.root();
        let group = scene
            .add(
                Node::group().with_transform(Transform {
                    scale_x: 2.0,
                    scale_y: 2.0,
                    ..Transform::at(100.0, 100.0)
                }),
                root,
            )
            .unwrap();
        scene.add(Node::rect(10.0, 10.0), group).unwrap();
        let mut clipboard = Clipboard::default();
        clipboard.copy(&scene, &[group], None).unwrap();

        let now = Instant::now();
        let first = clipboard.paste(&mut scene, Some(group), None, now).unwrap();
        let first_id = first.created[0];
        assert_eq!(scene.parent(first_id), Some(root));
        let t = scene.get(first_id).unwrap().transform;
        assert!(close(t.x, 120.0) && close(t.y, 120.0));

        // The fresh copy is selected next; the second paste goes beside it.
        let second = clipboard.paste(&mut scene, Some(first_id), None, now).unwrap();
        assert_eq!(scene.parent(second.created[0]), Some(root));
        let t = scene.get(second.created[0]).unwrap().transform;
        assert!(close(t.x, 140.0) && close(t.y, 140.0));
    }

    #[test]
    fn test_paste_target_inside_source_uses_source_parent() {
        let mut scene = Scene::new();
        let root = scene.root();
        let outer = scene.add(Node::group(), root).unwrap();
        let source = scene.add(Node::group(), outer).unwrap();
        let inner = scene.add(Node::group(), source).unwrap();
        let mut clipboard = Clipboard::default();
        clipboard.copy(&scene, &[source], None).unwrap();

        let report = clipboard.paste(&mut scene, Some(inner), None, Instant::now()).unwrap();
        assert_eq!(scene.parent(report.created[0]), Some(outer));
    }

    #[test]
    fn test_group_with_media_pasted_through_host() {
        let mut scene = Scene::new();
        let root = scene.root();
        let group = scene.add(Node::group(), root).unwrap();
        scene.add(Node::text("caption"), group).unwrap();
        scene.add(audio("https://cdn.test/clip.mp3").at(5.0, 5.0), group).unwrap();
        let mut clipboard = Clipboard::default();
        clipboard.copy(&scene, &[group], None).unwrap();

        let report = clipboard.paste(&mut scene, None, None, Instant::now()).unwrap();
        assert!(report.failures.is_empty());
        let children = scene.children(report.created[0]).to_vec();
        assert_eq!(children.len(), 2);
        assert_eq!(scene.get(children[1]).unwrap().kind(), NodeKind::Media);
        assert_eq!(scene.pending_media(), &[children[1]]);
        assert_eq!(clipboard.reapply_queue().pending(), 1);
    }

    #[test]
    fn test_nested_media_failure_reported() {
        let mut scene = Scene::new();
        let root = scene.root();
        let group = scene.add(Node::group(), root).unwrap();
        scene.add(Node::text("caption"), group).unwrap();
        scene.add(audio("  "), group).unwrap();
        let mut clipboard = Clipboard::default();
        clipboard.copy(&scene, &[group], None).unwrap();

        let report = clipboard.paste(&mut scene, None, None, Instant::now()).unwrap();
        assert_eq!(report.created.len(), 1);
        assert_eq!(scene.children(report.created[0]).len(), 1);
        assert_eq!(report.failures.len(), 1);
        let failure = &report.failures[0];
        assert_eq!(failure.index, 0);
        assert_eq!(failure.kind, NodeKind::Media);
        assert_eq!(failure.nested_in, Some(report.created[0]));
        assert!(matches!(failure.error, ReconstructError::MediaUnavailable(_)));
    }

    #[test]
    fn test_untagged_drawable_copies_its_owner() {
        let mut scene = Scene::new();
        let root = scene.root();
        let table = scene
            .insert(table_tree(Node::new(NodeContent::Table(Table::grid(1, 1, 10.0, 10.0)))), root, 0)
            .unwrap();
        let graphics = scene
            .add(
                Node::new(NodeContent::Graphics(Graphics {
                    bounds: Rect::new(0.0, 0.0, 2.0, 2.0),
                    color: SerializableColor::black(),
                })),
                table,
            )
            .unwrap();
        let mut clipboard = Clipboard::default();
        let report = clipboard.copy(&scene, &[graphics], None).unwrap();
        assert_eq!(report.sources, vec![table]);
        assert_eq!(report.snapshotted, 0);
        assert_eq!(clipboard.entries()[0].kind(), NodeKind::Table);

        // Owner and drawable together are one entry.
        let report = clipboard.copy(&scene, &[graphics, table], None).unwrap();
        assert_eq!(report.copied, 1);
    }
}
