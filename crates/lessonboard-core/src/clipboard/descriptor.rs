//! Portable node descriptors and the copy-side classification.

use crate::raster::NodeRasterizer;
use crate::scene::{
    BrushStroke, MediaKind, MediaSource, Node, NodeContent, NodeId, NodeKind, PenPath,
    SceneHost, StaticImage, TableCell, TableSettings, TextContent, TraversalLimits, Transform,
    VectorShape, VisualProps, walk,
};
use serde::{Deserialize, Serialize};

/// Longest side of a static snapshot, in pixels.
pub const SNAPSHOT_MAX_SIZE: u32 = 512;

/// Kind-specific part of a descriptor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DescriptorPayload {
    Text(TextContent),
    Shape(VectorShape),
    PenPath(PenPath),
    Brush(BrushStroke),
    Table {
        settings: TableSettings,
        cells: Vec<TableCell>,
    },
    /// Only the source is kept; the element is recreated through the host.
    Media {
        kind: MediaKind,
        source: MediaSource,
    },
    Group(Vec<NodeDescriptor>),
    Scene(Vec<NodeDescriptor>),
    Image(StaticImage),
}

/// An independent value copy of a node, enough to rebuild it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeDescriptor {
    #[serde(default)]
    pub name: Option<String>,
    pub transform: Transform,
    #[serde(default)]
    pub visual: VisualProps,
    #[serde(default)]
    pub z_index: i32,
    #[serde(default)]
    pub locked: bool,
    #[serde(default = "default_visible")]
    pub visible: bool,
    pub payload: DescriptorPayload,
}

fn default_visible() -> bool {
    true
}

impl NodeDescriptor {
    pub fn kind(&self) -> NodeKind {
        match &self.payload {
            DescriptorPayload::Text(_) => NodeKind::Text,
            DescriptorPayload::Shape(_) => NodeKind::VectorShape,
            DescriptorPayload::PenPath(_) => NodeKind::PenPath,
            DescriptorPayload::Brush(_) => NodeKind::BrushStroke,
            DescriptorPayload::Table { .. } => NodeKind::Table,
            DescriptorPayload::Media { .. } => NodeKind::Media,
            DescriptorPayload::Group(_) => NodeKind::Group,
            DescriptorPayload::Scene(_) => NodeKind::Scene,
            DescriptorPayload::Image(_) => NodeKind::Image,
        }
    }

    pub fn children(&self) -> &[NodeDescriptor] {
        match &self.payload {
            DescriptorPayload::Group(children) | DescriptorPayload::Scene(children) => children,
            _ => &[],
        }
    }

    fn children_mut(&mut self) -> Option<&mut Vec<NodeDescriptor>> {
        match &mut self.payload {
            DescriptorPayload::Group(children) | DescriptorPayload::Scene(children) => {
                Some(children)
            }
            _ => None,
        }
    }

    /// Number of descriptors in this tree, self included.
    pub fn node_count(&self) -> usize {
        let mut count = 0;
        let mut stack = vec![self];
        while let Some(desc) = stack.pop() {
            count += 1;
            stack.extend(desc.children());
        }
        count
    }

    fn with_payload(node: &Node, payload: DescriptorPayload) -> Self {
        Self {
            name: node.name.clone(),
            transform: node.transform,
            visual: node.visual.clone(),
            z_index: node.z_index,
            locked: node.locked,
            visible: node.visible,
            payload,
        }
    }

    /// Describe a tool-created node without its children.
    ///
    /// Returns None for graphics and helpers, which have no tool tag.
    fn shallow<H: SceneHost + ?Sized>(host: &H, node: &Node) -> Option<Self> {
        let payload = match &node.content {
            NodeContent::Text(text) => DescriptorPayload::Text(text.clone()),
            NodeContent::Shape(shape) => DescriptorPayload::Shape(shape.clone()),
            NodeContent::PenPath(path) => DescriptorPayload::PenPath(path.clone()),
            NodeContent::Brush(brush) => DescriptorPayload::Brush(brush.clone()),
            NodeContent::Table(table) => {
                let mut cells = table.cells.clone();
                sync_cells_from_children(host, node.id, &table.settings, &mut cells);
                DescriptorPayload::Table {
                    settings: table.settings.clone(),
                    cells,
                }
            }
            NodeContent::Media(media) => DescriptorPayload::Media {
                kind: media.kind,
                source: media.source.clone(),
            },
            NodeContent::Group => DescriptorPayload::Group(Vec::new()),
            NodeContent::Scene => DescriptorPayload::Scene(Vec::new()),
            NodeContent::Image(image) => DescriptorPayload::Image(image.clone()),
            NodeContent::Graphics(_) | NodeContent::Helper(_) => return None,
        };
        Some(Self::with_payload(node, payload))
    }
}

/// Name of the text node holding a table cell's content.
pub(crate) fn cell_text_name(row: usize, col: usize) -> String {
    format!("cell:{}:{}", row, col)
}

/// Name of the rectangle drawing a table cell's background.
pub(crate) fn cell_background_name(row: usize, col: usize) -> String {
    format!("cell-bg:{}:{}", row, col)
}

/// Pick up edits made directly on the generated cell nodes.
///
/// Header backgrounds draw the table's header fill, so they never feed back
/// into the cell style.
fn sync_cells_from_children<H: SceneHost + ?Sized>(
    host: &H,
    table: NodeId,
    settings: &TableSettings,
    cells: &mut [TableCell],
) {
    for &child in host.children(table) {
        let Some(node) = host.get(child) else { continue };
        let Some(name) = node.name.as_deref() else { continue };
        for cell in cells.iter_mut() {
            match &node.content {
                NodeContent::Text(text) if name == cell_text_name(cell.row, cell.col) => {
                    cell.text = text.content.clone();
                    cell.style.text = text.style.clone();
                }
                NodeContent::Shape(shape) if name == cell_background_name(cell.row, cell.col) => {
                    if cell.row == 0 && settings.header_fill.is_some() {
                        continue;
                    }
                    cell.style.fill = shape.fill;
                }
                _ => {}
            }
        }
    }
}

/// Why a selected node produced no descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    Missing,
    /// Helpers and other transient UI.
    Unclassifiable,
    /// Unowned drawable and snapshots are unavailable or disabled.
    NoSnapshot,
    SnapshotFailed(String),
}

/// Result of classifying a selected node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Classified {
    /// The node carries a tool tag.
    Tagged(NodeId),
    /// An untagged drawable inside a tagged owner. Copy the owner.
    Owned { owner: NodeId },
    /// An untagged drawable with no owner within reach.
    Unowned(NodeId),
    Unclassifiable,
    Missing,
}

/// Classify a node from its tag, searching up to `max_depth` ancestors for
/// the owner of an untagged drawable.
pub(crate) fn classify<H: SceneHost + ?Sized>(host: &H, id: NodeId, max_depth: usize) -> Classified {
    let Some(node) = host.get(id) else {
        return Classified::Missing;
    };
    if node.transient {
        return Classified::Unclassifiable;
    }
    match node.kind() {
        NodeKind::Helper => Classified::Unclassifiable,
        NodeKind::Graphics => {
            let mut current = host.parent(id);
            for _ in 0..max_depth {
                let Some(ancestor) = current else { break };
                if let Some(owner) = host.get(ancestor) {
                    let kind = owner.kind();
                    if kind.is_tool_kind() && !kind.is_container() {
                        return Classified::Owned { owner: ancestor };
                    }
                }
                current = host.parent(ancestor);
            }
            Classified::Unowned(id)
        }
        _ => Classified::Tagged(id),
    }
}

/// What the describer may use to turn untagged drawables into images.
pub(crate) struct DescribeContext<'a> {
    pub rasterizer: Option<&'a dyn NodeRasterizer>,
    pub snapshot_unknown: bool,
    pub limits: TraversalLimits,
}

/// A described subtree.
#[derive(Debug)]
pub(crate) struct Described {
    pub descriptor: NodeDescriptor,
    pub snapshotted: usize,
}

/// Snapshot an untagged drawable into a static image descriptor, placed in
/// its parent's space.
fn snapshot<H: SceneHost>(
    host: &H,
    node: &Node,
    ctx: &DescribeContext<'_>,
) -> Result<NodeDescriptor, SkipReason> {
    if !ctx.snapshot_unknown {
        return Err(SkipReason::NoSnapshot);
    }
    let rasterizer = ctx.rasterizer.ok_or(SkipReason::NoSnapshot)?;
    let local = node.local_bounds().ok_or(SkipReason::NoSnapshot)?;
    let placed = node.transform.to_affine().transform_rect_bbox(local);
    let image = rasterizer
        .rasterize(host, node.id, SNAPSHOT_MAX_SIZE)
        .map_err(|e| SkipReason::SnapshotFailed(e.to_string()))?;
    log::warn!(
        "Copying untagged drawable {} as a static image snapshot",
        node.id
    );
    let mut descriptor = NodeDescriptor::with_payload(
        node,
        DescriptorPayload::Image(image.to_static_image(placed.width(), placed.height())),
    );
    descriptor.transform = Transform::at(placed.x0, placed.y0);
    Ok(descriptor)
}

/// Describe `root` and its descendants.
///
/// Built from a bounded pre-order walk: helpers and their subtrees are
/// dropped, table children are left to the table payload, and untagged
/// drawables are snapshotted when allowed.
pub(crate) fn describe<H: SceneHost>(
    host: &H,
    root: NodeId,
    ctx: &DescribeContext<'_>,
) -> Result<Described, SkipReason> {
    let visits = walk(host, root, ctx.limits);
    if visits.is_empty() {
        return Err(SkipReason::Missing);
    }

    let mut descriptors: Vec<Option<NodeDescriptor>> = Vec::with_capacity(visits.len());
    let mut snapshotted = 0;
    for (i, visit) in visits.iter().enumerate() {
        let parent_usable = match visit.parent_pos {
            None => true,
            Some(pos) => descriptors[pos]
                .as_ref()
                .is_some_and(|d| d.kind().is_container()),
        };
        let node = host.get(visit.id);
        let descriptor = match node {
            Some(node) if parent_usable && !node.transient => match node.kind() {
                NodeKind::Helper => None,
                NodeKind::Graphics => match snapshot(host, node, ctx) {
                    Ok(d) => {
                        snapshotted += 1;
                        Some(d)
                    }
                    Err(reason) => {
                        if i == 0 {
                            return Err(reason);
                        }
                        log::warn!("Dropping child {} from copy: {:?}", visit.id, reason);
                        None
                    }
                },
                _ => NodeDescriptor::shallow(host, node),
            },
            _ => None,
        };
        if i == 0 && descriptor.is_none() {
            return Err(SkipReason::Unclassifiable);
        }
        descriptors.push(descriptor);
    }

    // Pre-order puts parents first; folding from the back keeps child order.
    for i in (1..visits.len()).rev() {
        let Some(parent_pos) = visits[i].parent_pos else { continue };
        let Some(child) = descriptors[i].take() else { continue };
        if let Some(children) = descriptors[parent_pos].as_mut().and_then(|p| p.children_mut()) {
            children.insert(0, child);
        }
    }

    let descriptor = descriptors
        .into_iter()
        .next()
        .flatten()
        .ok_or(SkipReason::Unclassifiable)?;
    Ok(Described {
        descriptor,
        snapshotted,
    })
}
