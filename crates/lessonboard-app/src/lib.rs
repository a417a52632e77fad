//! Lessonboard application shell.
//!
//! Runs a scripted editing session against the in-memory scene host and
//! reports the resulting layer panel.

use kurbo::Point;
use lessonboard_core::clipboard::table_tree;
use lessonboard_core::config::{ConfigError, EditorConfig};
use lessonboard_core::layers::{DropMode, RenderedRow, Thumbnail};
use lessonboard_core::scene::{HelperKind, MediaHost, Node, NodeContent, Scene, SceneError, SceneHost, Table};
use lessonboard_core::transform::{Corner, ResizeHandle};
use lessonboard_core::{Editor, EditorError, ToolKind};
use lessonboard_render::SilhouetteRasterizer;
use std::path::Path;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Session errors.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
    #[error("Editor error: {0}")]
    Editor(#[from] EditorError),
    #[error("Scene error: {0}")]
    Scene(#[from] SceneError),
    #[error("Host refused media element")]
    Media,
}

/// What a session produced.
#[derive(Debug)]
pub struct SessionSummary {
    pub rows: Vec<RenderedRow>,
    pub node_count: usize,
    pub pasted: usize,
    pub undo_depth: usize,
    pub clipboard_json_len: usize,
}

impl SessionSummary {
    /// Indented layer listing, front-most first.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for rendered in &self.rows {
            let row = &rendered.row;
            let icon = match &rendered.thumbnail {
                Thumbnail::Image(image) => format!("{}x{}", image.width, image.height),
                Thumbnail::Placeholder => "--".to_string(),
            };
            out.push_str(&format!(
                "{}{} {} [{}] ({:?})\n",
                "  ".repeat(row.depth),
                if row.expandable { "+" } else { "-" },
                row.label,
                icon,
                row.kind
            ));
        }
        out.push_str(&format!(
            "{} nodes, {} pasted, {} undo steps, {} bytes on the clipboard\n",
            self.node_count, self.pasted, self.undo_depth, self.clipboard_json_len
        ));
        out
    }

    pub fn to_json(&self) -> serde_json::Value {
        let rows: Vec<serde_json::Value> = self
            .rows
            .iter()
            .map(|r| {
                serde_json::json!({
                    "id": r.row.id.to_string(),
                    "label": r.row.label,
                    "depth": r.row.depth,
                    "expandable": r.row.expandable,
                    "placeholder": r.thumbnail.is_placeholder(),
                })
            })
            .collect();
        serde_json::json!({
            "rows": rows,
            "node_count": self.node_count,
            "pasted": self.pasted,
            "undo_depth": self.undo_depth,
        })
    }
}

/// Load the config at `path`, or the defaults when there is none.
pub fn load_config(path: Option<&Path>) -> Result<EditorConfig, AppError> {
    match path {
        Some(path) => Ok(EditorConfig::load(path)?),
        None => Ok(EditorConfig::default()),
    }
}

/// Run the scripted session.
pub fn run(config_path: Option<&Path>) -> Result<SessionSummary, AppError> {
    let config = load_config(config_path)?;
    let mut editor = Editor::new(Scene::new(), config);
    let rasterizer = SilhouetteRasterizer::new();
    let start = Instant::now();

    // Lesson content.
    let root = editor.host().root();
    let lesson = editor
        .host_mut()
        .add(Node::group().with_name("Lesson 1"), root)?;
    editor
        .host_mut()
        .add(Node::text("Photosynthesis").with_name("Title").at(20.0, 20.0), lesson)?;
    editor
        .host_mut()
        .add(Node::rect(240.0, 120.0).with_name("Diagram").at(20.0, 80.0), lesson)?;

    let mut table = Table::grid(3, 2, 120.0, 32.0);
    for (col, header) in ["Input", "Output"].into_iter().enumerate() {
        if let Some(cell) = table.cell_mut(0, col) {
            cell.text = header.to_string();
        }
    }
    let table = Node::new(NodeContent::Table(table))
        .with_name("Summary")
        .at(300.0, 80.0);
    editor.host_mut().insert(table_tree(table), root, 1)?;

    let video = editor
        .host_mut()
        .add_video_element("https://cdn.example/leaf.mp4", "Leaf", 20.0, 240.0, None)
        .ok_or(AppError::Media)?;
    editor.host_mut().add(Node::helper(HelperKind::Guide), root)?;
    editor.set_tool(ToolKind::Shape, start);
    editor.tick(start);

    // Copy the lesson with its video and paste it twice.
    editor.selection_mut().set([lesson, video]);
    editor.copy(Some(&rasterizer))?;
    let mut pasted = 0;
    for _ in 0..2 {
        editor.selection_mut().clear();
        pasted += editor.paste(None, start)?.created.len();
    }
    editor.on_animation_frame();
    editor.host_mut().resolve_media_loads();

    // Resize the diagram from its bottom-right corner, then shrink the lesson.
    let diagram = editor.host().children(lesson)[1];
    editor.selection_mut().select(diagram);
    let corner = ResizeHandle::Corner(Corner::BottomRight);
    editor.begin_resize(corner, Point::new(260.0, 200.0), true)?;
    editor.update_resize(Point::new(300.0, 220.0))?;
    editor.end_resize()?;
    editor.selection_mut().select(lesson);
    editor.scale_selected(0.9)?;

    // Move the video into the lesson, and try an illegal drop.
    editor.drop_layer(video, lesson, DropMode::Nest)?;
    if let Err(err) = editor.drop_layer(lesson, diagram, DropMode::Nest) {
        log::info!("Drop refused as expected: {}", err);
    }
    editor.undo()?;

    // Let the reapply passes and the debounced refresh run.
    let later = start + Duration::from_millis(500);
    editor.tick(later);
    editor.tick(later + Duration::from_millis(50));

    let clipboard_json_len = editor
        .clipboard()
        .export_json()
        .map(|json| json.len())
        .unwrap_or_default();
    let rows = editor.layer_rows(&rasterizer);
    Ok(SessionSummary {
        node_count: editor.host().node_count(),
        pasted,
        undo_depth: editor.history().undo_len(),
        clipboard_json_len,
        rows,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_session_runs_with_defaults() {
        let summary = run(None).unwrap();
        assert_eq!(summary.pasted, 4);
        assert!(summary.clipboard_json_len > 0);
        // Lesson, table and video, plus two pasted lesson/video pairs. The
        // video drop was undone and the guide is hidden.
        assert!(summary.rows.iter().all(|r| r.row.label != "Helper"));
        let top_level = summary.rows.iter().filter(|r| r.row.depth == 0).count();
        assert_eq!(top_level, 7);
        assert!(summary.render().contains("Lesson 1"));
    }

    #[test]
    fn test_session_reads_config_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"clipboard": {{"paste_step": 5.0}}, "layers": {{"thumbnail_size": 16}}}}"#)
            .unwrap();
        let summary = run(Some(file.path())).unwrap();
        assert!(summary.rows.iter().all(|r| match &r.thumbnail {
            Thumbnail::Image(image) => image.width <= 16 && image.height <= 16,
            Thumbnail::Placeholder => true,
        }));
        assert_eq!(summary.to_json()["pasted"], 4);
    }

    #[test]
    fn test_missing_config_is_an_error() {
        let result = run(Some(Path::new("/nonexistent/lessonboard.json")));
        assert!(matches!(result, Err(AppError::Config(_))));
    }
}
