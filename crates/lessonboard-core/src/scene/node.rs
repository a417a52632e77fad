//! Node definitions for the scene graph.

use kurbo::{Affine, Point, Rect, Vec2};
use peniko::Color;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for nodes.
pub type NodeId = Uuid;

/// Serializable color representation (RGBA8).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerializableColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl SerializableColor {
    pub fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub fn black() -> Self {
        Self::new(0, 0, 0, 255)
    }

    pub fn white() -> Self {
        Self::new(255, 255, 255, 255)
    }
}

impl From<Color> for SerializableColor {
    fn from(color: Color) -> Self {
        let rgba = color.to_rgba8();
        Self {
            r: rgba.r,
            g: rgba.g,
            b: rgba.b,
            a: rgba.a,
        }
    }
}

impl From<SerializableColor> for Color {
    fn from(color: SerializableColor) -> Self {
        Color::from_rgba8(color.r, color.g, color.b, color.a)
    }
}

/// Position, scale, rotation and skew of a node relative to its parent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub x: f64,
    pub y: f64,
    pub scale_x: f64,
    pub scale_y: f64,
    /// Rotation in radians.
    pub rotation: f64,
    /// Skew angles in radians.
    pub skew_x: f64,
    pub skew_y: f64,
    /// Local point that `x`/`y` refer to.
    pub pivot_x: f64,
    pub pivot_y: f64,
    /// Normalized texture anchor, passed through to the renderer untouched.
    pub anchor_x: f64,
    pub anchor_y: f64,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            scale_x: 1.0,
            scale_y: 1.0,
            rotation: 0.0,
            skew_x: 0.0,
            skew_y: 0.0,
            pivot_x: 0.0,
            pivot_y: 0.0,
            anchor_x: 0.0,
            anchor_y: 0.0,
        }
    }
}

impl Transform {
    /// Identity transform placed at `(x, y)`.
    pub fn at(x: f64, y: f64) -> Self {
        Self {
            x,
            y,
            ..Self::default()
        }
    }

    pub fn position(&self) -> Point {
        Point::new(self.x, self.y)
    }

    pub fn set_position(&mut self, point: Point) {
        self.x = point.x;
        self.y = point.y;
    }

    pub fn translate(&mut self, delta: Vec2) {
        self.x += delta.x;
        self.y += delta.y;
    }

    /// Local-to-parent affine: `translate · rotate · skew · scale · translate(-pivot)`.
    pub fn to_affine(&self) -> Affine {
        Affine::translate((self.x, self.y))
            * Affine::rotate(self.rotation)
            * Affine::skew(self.skew_x.tan(), self.skew_y.tan())
            * Affine::scale_non_uniform(self.scale_x, self.scale_y)
            * Affine::translate((-self.pivot_x, -self.pivot_y))
    }

    pub fn is_finite(&self) -> bool {
        [
            self.x,
            self.y,
            self.scale_x,
            self.scale_y,
            self.rotation,
            self.skew_x,
            self.skew_y,
            self.pivot_x,
            self.pivot_y,
        ]
        .iter()
        .all(|v| v.is_finite())
    }
}

/// Compositing mode used by the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BlendMode {
    #[default]
    Normal,
    Multiply,
    Screen,
    Overlay,
    Add,
}

/// Properties shared by every drawable node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisualProps {
    /// Opacity (0.0 = fully transparent, 1.0 = fully opaque).
    pub alpha: f64,
    #[serde(default)]
    pub blend_mode: BlendMode,
    pub tint: SerializableColor,
    #[serde(default)]
    pub round_pixels: bool,
    /// Renderer filters. Opaque to the editor core.
    #[serde(default)]
    pub filters: Vec<serde_json::Value>,
}

impl Default for VisualProps {
    fn default() -> Self {
        Self {
            alpha: 1.0,
            blend_mode: BlendMode::default(),
            tint: SerializableColor::white(),
            round_pixels: false,
            filters: Vec::new(),
        }
    }
}

/// Dash pattern for strokes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum StrokeDash {
    #[default]
    Solid,
    Dashed,
    Dotted,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stroke {
    pub color: SerializableColor,
    pub width: f64,
    #[serde(default)]
    pub dash: StrokeDash,
}

impl Default for Stroke {
    fn default() -> Self {
        Self {
            color: SerializableColor::black(),
            width: 2.0,
            dash: StrokeDash::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TextAlign {
    #[default]
    Left,
    Center,
    Right,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextStyle {
    pub font_family: String,
    pub font_size: f64,
    pub font_weight: u16,
    #[serde(default)]
    pub italic: bool,
    pub color: SerializableColor,
    #[serde(default)]
    pub align: TextAlign,
    pub line_height: f64,
}

impl Default for TextStyle {
    fn default() -> Self {
        Self {
            font_family: "Noto Sans".to_string(),
            font_size: 20.0,
            font_weight: 400,
            italic: false,
            color: SerializableColor::black(),
            align: TextAlign::default(),
            line_height: 1.25,
        }
    }
}

/// A block of text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextContent {
    pub content: String,
    pub style: TextStyle,
    /// Wrapping width. None = no wrapping.
    #[serde(default)]
    pub wrap_width: Option<f64>,
}

impl TextContent {
    /// Approximate layout size. The renderer owns real text metrics.
    fn approximate_size(&self) -> (f64, f64) {
        let lines = self.content.lines().count().max(1) as f64;
        let longest = self
            .content
            .lines()
            .map(|l| l.chars().count())
            .max()
            .unwrap_or(0) as f64;
        let natural = longest * self.style.font_size * 0.55;
        let width = self.wrap_width.map_or(natural, |w| w.min(natural.max(1.0)));
        (width, lines * self.style.font_size * self.style.line_height)
    }
}

/// Geometry of a vector shape, in local coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ShapeGeometry {
    Rect {
        width: f64,
        height: f64,
        #[serde(default)]
        corner_radius: f64,
    },
    Ellipse {
        radius_x: f64,
        radius_y: f64,
    },
    Polygon {
        points: Vec<Point>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorShape {
    pub geometry: ShapeGeometry,
    pub stroke: Option<Stroke>,
    pub fill: Option<SerializableColor>,
}

/// A pen-tool anchor with optional bezier handles.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PathNode {
    pub point: Point,
    #[serde(default)]
    pub handle_in: Option<Point>,
    #[serde(default)]
    pub handle_out: Option<Point>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PenPath {
    pub nodes: Vec<PathNode>,
    pub closed: bool,
    pub fill: Option<SerializableColor>,
    pub stroke: Stroke,
}

/// A freehand brush stroke.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrushStroke {
    pub points: Vec<Point>,
    pub width: f64,
    pub color: SerializableColor,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableSettings {
    pub rows: usize,
    pub cols: usize,
    pub border: Stroke,
    #[serde(default)]
    pub header_fill: Option<SerializableColor>,
    #[serde(default)]
    pub cell_padding: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellStyle {
    pub fill: Option<SerializableColor>,
    pub text: TextStyle,
}

impl Default for CellStyle {
    fn default() -> Self {
        Self {
            fill: Some(SerializableColor::white()),
            text: TextStyle::default(),
        }
    }
}

/// One cell of a table, bounds in table-local coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableCell {
    pub row: usize,
    pub col: usize,
    pub bounds: Rect,
    pub text: String,
    pub style: CellStyle,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub settings: TableSettings,
    pub cells: Vec<TableCell>,
}

impl Table {
    /// Uniform grid of empty cells.
    pub fn grid(rows: usize, cols: usize, cell_width: f64, cell_height: f64) -> Self {
        let mut cells = Vec::with_capacity(rows * cols);
        for row in 0..rows {
            for col in 0..cols {
                let x = col as f64 * cell_width;
                let y = row as f64 * cell_height;
                cells.push(TableCell {
                    row,
                    col,
                    bounds: Rect::new(x, y, x + cell_width, y + cell_height),
                    text: String::new(),
                    style: CellStyle::default(),
                });
            }
        }
        Self {
            settings: TableSettings {
                rows,
                cols,
                border: Stroke {
                    width: 1.0,
                    ..Stroke::default()
                },
                header_fill: None,
                cell_padding: 4.0,
            },
            cells,
        }
    }

    pub fn cell_mut(&mut self, row: usize, col: usize) -> Option<&mut TableCell> {
        self.cells.iter_mut().find(|c| c.row == row && c.col == col)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MediaKind {
    Audio,
    Video,
}

/// Where a media element loads from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaSource {
    pub url: String,
    pub title: String,
    #[serde(default)]
    pub poster: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MediaState {
    #[default]
    Loading,
    Ready,
}

/// A playable element wrapping an external resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Media {
    pub kind: MediaKind,
    pub source: MediaSource,
    #[serde(default)]
    pub state: MediaState,
    pub width: f64,
    pub height: f64,
}

/// A static raster (PNG) image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StaticImage {
    pub pixel_width: u32,
    pub pixel_height: u32,
    /// PNG bytes, base64 encoded.
    pub data_base64: String,
    /// Display size in local units.
    pub width: f64,
    pub height: f64,
}

impl StaticImage {
    /// Wrap encoded PNG bytes, displayed at `width` x `height`.
    pub fn from_png(data: &[u8], pixel_width: u32, pixel_height: u32, width: f64, height: f64) -> Self {
        use base64::{Engine, engine::general_purpose::STANDARD};

        Self {
            pixel_width,
            pixel_height,
            data_base64: STANDARD.encode(data),
            width,
            height,
        }
    }

    /// The PNG bytes. None when the payload is not valid base64.
    pub fn data(&self) -> Option<Vec<u8>> {
        use base64::{Engine, engine::general_purpose::STANDARD};
        STANDARD.decode(&self.data_base64).ok()
    }
}

/// A drawable the editor has no tool tag for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Graphics {
    pub bounds: Rect,
    pub color: SerializableColor,
}

/// Transient UI nodes the host attaches to the scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HelperKind {
    Cursor,
    Guide,
    Handle,
    Marquee,
    SelectionBox,
    Grid,
    Ruler,
    Preview,
}

/// Kind-specific payload of a node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NodeContent {
    Text(TextContent),
    Shape(VectorShape),
    PenPath(PenPath),
    Brush(BrushStroke),
    Table(Table),
    Media(Media),
    Group,
    /// Animation scene container.
    Scene,
    Image(StaticImage),
    Graphics(Graphics),
    Helper(HelperKind),
}

/// Explicit kind tag, derived from the payload variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    Text,
    VectorShape,
    PenPath,
    BrushStroke,
    Table,
    Media,
    Group,
    Scene,
    Image,
    Graphics,
    Helper,
}

impl NodeKind {
    /// Kinds that tools create and the clipboard can describe directly.
    pub fn is_tool_kind(self) -> bool {
        !matches!(self, NodeKind::Graphics | NodeKind::Helper)
    }

    pub fn is_container(self) -> bool {
        matches!(self, NodeKind::Group | NodeKind::Scene)
    }

    /// Human-readable label for layer rows.
    pub fn label(self) -> &'static str {
        match self {
            NodeKind::Text => "Text",
            NodeKind::VectorShape => "Shape",
            NodeKind::PenPath => "Path",
            NodeKind::BrushStroke => "Brush",
            NodeKind::Table => "Table",
            NodeKind::Media => "Media",
            NodeKind::Group => "Group",
            NodeKind::Scene => "Scene",
            NodeKind::Image => "Image",
            NodeKind::Graphics => "Graphics",
            NodeKind::Helper => "Helper",
        }
    }
}

impl NodeContent {
    pub fn kind(&self) -> NodeKind {
        match self {
            NodeContent::Text(_) => NodeKind::Text,
            NodeContent::Shape(_) => NodeKind::VectorShape,
            NodeContent::PenPath(_) => NodeKind::PenPath,
            NodeContent::Brush(_) => NodeKind::BrushStroke,
            NodeContent::Table(_) => NodeKind::Table,
            NodeContent::Media(_) => NodeKind::Media,
            NodeContent::Group => NodeKind::Group,
            NodeContent::Scene => NodeKind::Scene,
            NodeContent::Image(_) => NodeKind::Image,
            NodeContent::Graphics(_) => NodeKind::Graphics,
            NodeContent::Helper(_) => NodeKind::Helper,
        }
    }

    /// Whether nodes of this content may have children.
    pub fn accepts_children(&self) -> bool {
        matches!(
            self,
            NodeContent::Group | NodeContent::Scene | NodeContent::Table(_)
        )
    }

    /// Bounds in local coordinates. None for containers and helpers.
    pub fn local_bounds(&self) -> Option<Rect> {
        match self {
            NodeContent::Text(text) => {
                let (w, h) = text.approximate_size();
                Some(Rect::new(0.0, 0.0, w, h))
            }
            NodeContent::Shape(shape) => match &shape.geometry {
                ShapeGeometry::Rect { width, height, .. } => {
                    Some(Rect::new(0.0, 0.0, *width, *height))
                }
                ShapeGeometry::Ellipse { radius_x, radius_y } => {
                    Some(Rect::new(0.0, 0.0, radius_x * 2.0, radius_y * 2.0))
                }
                ShapeGeometry::Polygon { points } => points_bounds(points.iter().copied()),
            },
            NodeContent::PenPath(path) => points_bounds(path.nodes.iter().flat_map(|n| {
                std::iter::once(n.point)
                    .chain(n.handle_in)
                    .chain(n.handle_out)
            })),
            NodeContent::Brush(brush) => points_bounds(brush.points.iter().copied())
                .map(|r| r.inflate(brush.width / 2.0, brush.width / 2.0)),
            NodeContent::Table(table) => table
                .cells
                .iter()
                .map(|c| c.bounds)
                .reduce(|a, b| a.union(b)),
            NodeContent::Media(media) => Some(Rect::new(0.0, 0.0, media.width, media.height)),
            NodeContent::Image(image) => Some(Rect::new(0.0, 0.0, image.width, image.height)),
            NodeContent::Graphics(graphics) => Some(graphics.bounds),
            NodeContent::Group | NodeContent::Scene | NodeContent::Helper(_) => None,
        }
    }
}

fn points_bounds(points: impl Iterator<Item = Point>) -> Option<Rect> {
    points.fold(None, |acc: Option<Rect>, p| match acc {
        Some(r) => Some(r.union_pt(p)),
        None => Some(Rect::from_points(p, p)),
    })
}

/// An entry in the scene graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    /// Display name shown in the layer tree.
    #[serde(default)]
    pub name: Option<String>,
    pub transform: Transform,
    #[serde(default)]
    pub visual: VisualProps,
    pub content: NodeContent,
    /// Stacking hint used by overlays. Authored content stays near zero.
    #[serde(default)]
    pub z_index: i32,
    #[serde(default)]
    pub locked: bool,
    #[serde(default = "default_visible")]
    pub visible: bool,
    /// Set by the host on UI and visual-aid nodes.
    #[serde(default)]
    pub transient: bool,
}

fn default_visible() -> bool {
    true
}

impl Node {
    /// Create a node with a fresh id at the origin.
    pub fn new(content: NodeContent) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: None,
            transform: Transform::default(),
            visual: VisualProps::default(),
            content,
            z_index: 0,
            locked: false,
            visible: true,
            transient: false,
        }
    }

    pub fn group() -> Self {
        Self::new(NodeContent::Group)
    }

    pub fn text(content: impl Into<String>) -> Self {
        Self::new(NodeContent::Text(TextContent {
            content: content.into(),
            style: TextStyle::default(),
            wrap_width: None,
        }))
    }

    pub fn rect(width: f64, height: f64) -> Self {
        Self::new(NodeContent::Shape(VectorShape {
            geometry: ShapeGeometry::Rect {
                width,
                height,
                corner_radius: 0.0,
            },
            stroke: Some(Stroke::default()),
            fill: None,
        }))
    }

    pub fn brush(points: Vec<Point>, width: f64, color: SerializableColor) -> Self {
        Self::new(NodeContent::Brush(BrushStroke {
            points,
            width,
            color,
        }))
    }

    pub fn helper(kind: HelperKind) -> Self {
        let mut node = Self::new(NodeContent::Helper(kind));
        node.transient = true;
        node
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    pub fn at(mut self, x: f64, y: f64) -> Self {
        self.transform.x = x;
        self.transform.y = y;
        self
    }

    pub fn kind(&self) -> NodeKind {
        self.content.kind()
    }

    pub fn local_bounds(&self) -> Option<Rect> {
        self.content.local_bounds()
    }

    /// Display label: explicit name, else the kind label.
    pub fn label(&self) -> &str {
        self.name.as_deref().unwrap_or_else(|| self.kind().label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_follows_content() {
        assert_eq!(Node::group().kind(), NodeKind::Group);
        assert_eq!(Node::text("hi").kind(), NodeKind::Text);
        assert_eq!(Node::rect(10.0, 10.0).kind(), NodeKind::VectorShape);
        assert_eq!(Node::helper(HelperKind::Guide).kind(), NodeKind::Helper);
        assert!(!NodeKind::Helper.is_tool_kind());
        assert!(NodeKind::Table.is_tool_kind());
    }

    #[test]
    fn test_transform_affine_identity() {
        let t = Transform::at(10.0, 20.0);
        let p = t.to_affine() * Point::new(1.0, 2.0);
        assert!((p.x - 11.0).abs() < 1e-9);
        assert!((p.y - 22.0).abs() < 1e-9);
    }

    #[test]
    fn test_transform_affine_scale_about_pivot() {
        let t = Transform {
            scale_x: 2.0,
            scale_y: 3.0,
            pivot_x: 5.0,
            pivot_y: 5.0,
            ..Transform::at(100.0, 100.0)
        };
        // Pivot maps onto the position.
        let p = t.to_affine() * Point::new(5.0, 5.0);
        assert!((p.x - 100.0).abs() < 1e-9);
        assert!((p.y - 100.0).abs() < 1e-9);
        let q = t.to_affine() * Point::new(6.0, 6.0);
        assert!((q.x - 102.0).abs() < 1e-9);
        assert!((q.y - 103.0).abs() < 1e-9);
    }

    #[test]
    fn test_brush_bounds_include_width() {
        let node = Node::brush(
            vec![Point::new(0.0, 0.0), Point::new(10.0, 0.0)],
            4.0,
            SerializableColor::black(),
        );
        let bounds = node.local_bounds().unwrap();
        assert!((bounds.y0 + 2.0).abs() < 1e-9);
        assert!((bounds.x1 - 12.0).abs() < 1e-9);
    }

    #[test]
    fn test_table_grid_bounds() {
        let table = Table::grid(2, 3, 50.0, 20.0);
        assert_eq!(table.cells.len(), 6);
        let bounds = NodeContent::Table(table).local_bounds().unwrap();
        assert!((bounds.width() - 150.0).abs() < 1e-9);
        assert!((bounds.height() - 40.0).abs() < 1e-9);
    }
}
