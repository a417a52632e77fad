//! Editor state tying the subsystems to one scene host.

use crate::clipboard::{Clipboard, ClipboardError, CopyReport, PasteReport};
use crate::config::EditorConfig;
use crate::events::{ClipboardEvent, SceneEvent};
use crate::history::{History, HistoryEntry, HistoryError, detach_all};
use crate::layers::{DropMode, LayerController, LayerError, RenderedRow};
use crate::raster::NodeRasterizer;
use crate::scene::{MediaHost, NodeId, SceneHost, top_level_only};
use crate::selection::Selection;
use crate::tools::ToolKind;
use crate::transform::{
    HANDLE_HIT_TOLERANCE, ResizeHandle, ResizeSession, TransformError, TransformReport,
    hit_test_handles, scale_uniform, selection_bounds,
};
use kurbo::Point;
use thiserror::Error;

#[cfg(not(target_arch = "wasm32"))]
use std::time::Instant;

#[cfg(target_arch = "wasm32")]
use web_time::Instant;

/// Errors surfaced by editor commands.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum EditorError {
    #[error(transparent)]
    Transform(#[from] TransformError),
    #[error(transparent)]
    Clipboard(#[from] ClipboardError),
    #[error(transparent)]
    Layer(#[from] LayerError),
    #[error(transparent)]
    History(#[from] HistoryError),
    #[error("No resize in progress")]
    NoResize,
}

/// Result type for editor commands.
pub type EditorResult<T> = Result<T, EditorError>;

/// The editing session: a scene host plus selection, clipboard, history and
/// the layer panel.
pub struct Editor<H: SceneHost + MediaHost> {
    host: H,
    config: EditorConfig,
    selection: Selection,
    clipboard: Clipboard,
    history: History,
    layers: LayerController,
    tool: ToolKind,
    resize: Option<ResizeSession>,
}

impl<H: SceneHost + MediaHost> Editor<H> {
    pub fn new(host: H, config: EditorConfig) -> Self {
        let mut layers = LayerController::new(&config.layers, config.traversal);
        layers.refresh_now(&host);
        Self {
            clipboard: Clipboard::new(config.clipboard.clone(), config.traversal),
            layers,
            host,
            config,
            selection: Selection::new(),
            history: History::new(),
            tool: ToolKind::default(),
            resize: None,
        }
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    /// Direct host access. Changes made here are picked up on the next tick.
    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn selection_mut(&mut self) -> &mut Selection {
        &mut self.selection
    }

    pub fn clipboard(&self) -> &Clipboard {
        &self.clipboard
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn layers(&self) -> &LayerController {
        &self.layers
    }

    pub fn tool(&self) -> ToolKind {
        self.tool
    }

    pub fn set_tool(&mut self, tool: ToolKind, now: Instant) {
        if self.tool == tool {
            return;
        }
        self.tool = tool;
        self.layers.on_scene_event(&SceneEvent::ToolChanged(tool), now);
    }

    /// Forward host notifications to the layer panel. Returns how many were
    /// handled.
    pub fn process_events(&mut self, now: Instant) -> usize {
        let events = self.host.drain_events();
        let mut removed = false;
        for event in &events {
            removed |= matches!(event, SceneEvent::NodeRemoved(_));
            self.layers.on_scene_event(event, now);
        }
        if removed {
            self.selection.prune(&self.host);
        }
        events.len()
    }

    /// Run timers: media reapply, host notifications and the layer refresh.
    /// Returns whether the layer tree was rebuilt.
    pub fn tick(&mut self, now: Instant) -> bool {
        self.clipboard.poll_reapply(&mut self.host, now);
        self.process_events(now);
        self.layers.poll(&self.host, now)
    }

    /// Call once per rendered frame.
    pub fn on_animation_frame(&mut self) {
        self.clipboard.on_animation_frame(&mut self.host);
    }

    pub fn drain_clipboard_events(&mut self) -> Vec<ClipboardEvent> {
        self.clipboard.drain_events()
    }

    pub fn copy(&mut self, rasterizer: Option<&dyn NodeRasterizer>) -> EditorResult<CopyReport> {
        let ids = self.selection.ids().to_vec();
        Ok(self.clipboard.copy(&self.host, &ids, rasterizer)?)
    }

    pub fn cut(&mut self, rasterizer: Option<&dyn NodeRasterizer>) -> EditorResult<CopyReport> {
        let ids = self.selection.ids().to_vec();
        let (report, removed) = self.clipboard.cut(&mut self.host, &ids, rasterizer)?;
        if !removed.is_empty() {
            self.history.push(HistoryEntry::Remove(removed));
        }
        self.selection.clear();
        Ok(report)
    }

    /// Paste into the selected container, or the root, and select the result.
    ///
    /// Copies never land inside the nodes they were copied from, so pasting
    /// with the source still selected places the copy beside it.
    pub fn paste(&mut self, pointer: Option<Point>, now: Instant) -> EditorResult<PasteReport> {
        let target = match self.selection.ids() {
            [only] => Some(*only),
            _ => None,
        };
        let report = self.clipboard.paste(&mut self.host, target, pointer, now)?;
        self.history.push(HistoryEntry::Insert(report.placements.clone()));
        self.selection.set(report.created.iter().copied());
        Ok(report)
    }

    /// Remove the selected nodes. Returns how many were removed.
    pub fn delete_selected(&mut self) -> usize {
        let ids = top_level_only(&self.host, self.selection.ids());
        let removed = detach_all(&mut self.host, &ids);
        let count = removed.len();
        if count > 0 {
            self.history.push(HistoryEntry::Remove(removed));
            log::info!("Deleted {} node(s)", count);
        }
        self.selection.prune(&self.host);
        count
    }

    /// Undo the latest operation. Returns how many of its items no longer
    /// applied and were skipped.
    pub fn undo(&mut self) -> EditorResult<usize> {
        self.cancel_resize();
        let skipped = self.history.undo(&mut self.host)?;
        self.selection.prune(&self.host);
        Ok(skipped)
    }

    pub fn redo(&mut self) -> EditorResult<usize> {
        self.cancel_resize();
        let skipped = self.history.redo(&mut self.host)?;
        self.selection.prune(&self.host);
        Ok(skipped)
    }

    /// The resize handle of the selection box under `point`, if any.
    pub fn handle_at(&self, point: Point) -> Option<ResizeHandle> {
        let bounds = selection_bounds(&self.host, self.selection.ids()).ok()?;
        hit_test_handles(bounds, point, HANDLE_HIT_TOLERANCE)
    }

    pub fn begin_resize(
        &mut self,
        handle: ResizeHandle,
        drag_start: Point,
        maintain_aspect_ratio: bool,
    ) -> EditorResult<()> {
        self.cancel_resize();
        let constraints = self.config.transform.constraints(maintain_aspect_ratio);
        let session = ResizeSession::begin(
            &self.host,
            self.selection.ids(),
            handle,
            drag_start,
            constraints,
        )?;
        self.resize = Some(session);
        Ok(())
    }

    pub fn update_resize(&mut self, pointer: Point) -> EditorResult<TransformReport> {
        let session = self.resize.as_mut().ok_or(EditorError::NoResize)?;
        Ok(session.update(&mut self.host, pointer)?)
    }

    /// Finish the drag and record it. Returns the number of nodes changed.
    pub fn end_resize(&mut self) -> EditorResult<usize> {
        let session = self.resize.take().ok_or(EditorError::NoResize)?;
        let changes = session.commit(&self.host);
        let count = changes.len();
        if count > 0 {
            self.history.push(HistoryEntry::Transform(changes));
        }
        Ok(count)
    }

    pub fn cancel_resize(&mut self) {
        if let Some(session) = self.resize.take() {
            session.cancel(&mut self.host);
        }
    }

    pub fn is_resizing(&self) -> bool {
        self.resize.is_some()
    }

    /// Scale the selection about its centre.
    pub fn scale_selected(&mut self, factor: f64) -> EditorResult<TransformReport> {
        let ids = self.selection.ids().to_vec();
        let report = scale_uniform(&mut self.host, &ids, factor)?;
        if !report.transformed.is_empty() {
            self.history.push(HistoryEntry::Transform(report.transformed.clone()));
        }
        Ok(report)
    }

    /// Apply a drop from the layer panel.
    pub fn drop_layer(&mut self, node: NodeId, target: NodeId, mode: DropMode) -> EditorResult<()> {
        let entry = self.layers.drop_node(&mut self.host, node, target, mode)?;
        self.history.push(entry);
        Ok(())
    }

    /// Layer rows with thumbnails.
    pub fn layer_rows(&mut self, rasterizer: &dyn NodeRasterizer) -> Vec<RenderedRow> {
        self.layers.render_rows(&self.host, rasterizer)
    }
}
