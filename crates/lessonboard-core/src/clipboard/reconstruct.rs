//! Rebuilding live nodes from descriptors.

use super::descriptor::{DescriptorPayload, NodeDescriptor, cell_background_name, cell_text_name};
use crate::scene::{
    MediaHost, MediaKind, Node, NodeContent, NodeId, NodeTree, SceneError, SceneHost,
    ShapeGeometry, Table, TextContent, Transform, VectorShape,
};
use thiserror::Error;

/// Why a descriptor could not be turned back into nodes.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ReconstructError {
    #[error("Invalid transform")]
    InvalidTransform,
    #[error("Table has {cells} cells for a {rows}x{cols} grid")]
    InvalidTable { rows: usize, cols: usize, cells: usize },
    #[error("Image has no usable data")]
    EmptyImage,
    #[error("Host refused media element for {0}")]
    MediaUnavailable(String),
    #[error("Scene error: {0}")]
    Scene(#[from] SceneError),
}

/// Copy the full property set of a descriptor onto a node.
pub(crate) fn apply_properties(node: &mut Node, desc: &NodeDescriptor) {
    node.name = desc.name.clone();
    node.transform = desc.transform;
    node.visual = desc.visual.clone();
    node.z_index = desc.z_index;
    node.locked = desc.locked;
    node.visible = desc.visible;
}

/// Construct a single node at the origin, then re-apply every property.
///
/// Media are not constructed here; they go through [`create_media`].
fn construct(desc: &NodeDescriptor) -> Result<Option<Node>, ReconstructError> {
    if !desc.transform.is_finite() {
        return Err(ReconstructError::InvalidTransform);
    }
    let content = match &desc.payload {
        DescriptorPayload::Text(text) => NodeContent::Text(text.clone()),
        DescriptorPayload::Shape(shape) => NodeContent::Shape(shape.clone()),
        DescriptorPayload::PenPath(path) => NodeContent::PenPath(path.clone()),
        DescriptorPayload::Brush(brush) => NodeContent::Brush(brush.clone()),
        DescriptorPayload::Table { settings, cells } => {
            if settings.rows * settings.cols != cells.len() {
                return Err(ReconstructError::InvalidTable {
                    rows: settings.rows,
                    cols: settings.cols,
                    cells: cells.len(),
                });
            }
            NodeContent::Table(Table {
                settings: settings.clone(),
                cells: cells.clone(),
            })
        }
        DescriptorPayload::Media { .. } => return Ok(None),
        DescriptorPayload::Group(_) => NodeContent::Group,
        DescriptorPayload::Scene(_) => NodeContent::Scene,
        DescriptorPayload::Image(image) => {
            if image.data().is_none_or(|bytes| bytes.is_empty()) {
                return Err(ReconstructError::EmptyImage);
            }
            NodeContent::Image(image.clone())
        }
    };
    let mut node = Node::new(content);
    apply_properties(&mut node, desc);
    Ok(Some(node))
}

/// Build the generated children of a table node: a background rectangle and
/// a text node per cell.
pub fn table_tree(node: Node) -> NodeTree {
    let mut tree = NodeTree::leaf(node);
    let NodeContent::Table(table) = &tree.node.content else {
        return tree;
    };
    let padding = table.settings.cell_padding;
    let mut children = Vec::with_capacity(table.cells.len() * 2);
    for cell in &table.cells {
        let background = Node::new(NodeContent::Shape(VectorShape {
            geometry: ShapeGeometry::Rect {
                width: cell.bounds.width(),
                height: cell.bounds.height(),
                corner_radius: 0.0,
            },
            stroke: Some(table.settings.border.clone()),
            fill: if cell.row == 0 {
                table.settings.header_fill.or(cell.style.fill)
            } else {
                cell.style.fill
            },
        }))
        .with_name(cell_background_name(cell.row, cell.col))
        .at(cell.bounds.x0, cell.bounds.y0);
        let text = Node::new(NodeContent::Text(TextContent {
            content: cell.text.clone(),
            style: cell.style.text.clone(),
            wrap_width: Some((cell.bounds.width() - 2.0 * padding).max(1.0)),
        }))
        .with_name(cell_text_name(cell.row, cell.col))
        .at(cell.bounds.x0 + padding, cell.bounds.y0 + padding);
        children.push(NodeTree::leaf(background));
        children.push(NodeTree::leaf(text));
    }
    tree.children = children;
    tree
}

/// A media descriptor nested in a group, created after the group is inserted.
#[derive(Debug)]
pub(crate) struct DeferredMedia<'a> {
    pub parent: NodeId,
    pub index: usize,
    pub descriptor: &'a NodeDescriptor,
}

/// A subtree ready for insertion, plus nested media still to create.
#[derive(Debug)]
pub(crate) struct Built<'a> {
    pub tree: NodeTree,
    pub media: Vec<DeferredMedia<'a>>,
}

/// Build a node tree from a non-media descriptor.
pub(crate) fn build_tree(desc: &NodeDescriptor) -> Result<Built<'_>, ReconstructError> {
    // Pre-order with parent positions and sibling index.
    let mut order: Vec<(&NodeDescriptor, Option<usize>, usize)> = Vec::new();
    let mut stack = vec![(desc, None, 0)];
    while let Some((d, parent, index)) = stack.pop() {
        let pos = order.len();
        order.push((d, parent, index));
        for (i, child) in d.children().iter().enumerate().rev() {
            stack.push((child, Some(pos), i));
        }
    }

    let mut trees: Vec<Option<NodeTree>> = Vec::with_capacity(order.len());
    for (d, _, _) in &order {
        trees.push(construct(d)?.map(|node| {
            if matches!(node.content, NodeContent::Table(_)) {
                table_tree(node)
            } else {
                NodeTree::leaf(node)
            }
        }));
    }

    let mut media = Vec::new();
    for i in (1..order.len()).rev() {
        let (d, Some(parent_pos), index) = order[i] else { continue };
        let child = trees[i].take();
        let Some(parent) = trees[parent_pos].as_mut() else { continue };
        match child {
            Some(tree) => parent.children.insert(0, tree),
            None => media.push(DeferredMedia {
                parent: parent.node.id,
                index,
                descriptor: d,
            }),
        }
    }
    // Collected back to front; create in sibling order.
    media.reverse();

    let tree = trees
        .into_iter()
        .next()
        .flatten()
        .ok_or(ReconstructError::InvalidTransform)?;
    Ok(Built { tree, media })
}

/// Recreate a media element through the host capability and move it into
/// `parent` at `index` (appended when None).
pub(crate) fn create_media<H: SceneHost + MediaHost>(
    host: &mut H,
    desc: &NodeDescriptor,
    parent: NodeId,
    index: Option<usize>,
) -> Result<NodeId, ReconstructError> {
    let DescriptorPayload::Media { kind, source } = &desc.payload else {
        return Err(ReconstructError::MediaUnavailable(String::new()));
    };
    if !desc.transform.is_finite() {
        return Err(ReconstructError::InvalidTransform);
    }
    let Transform { x, y, .. } = desc.transform;
    let id = match kind {
        MediaKind::Audio => host.add_audio_element(&source.url, &source.title, x, y),
        MediaKind::Video => {
            host.add_video_element(&source.url, &source.title, x, y, source.poster.as_deref())
        }
    }
    .ok_or_else(|| ReconstructError::MediaUnavailable(source.url.clone()))?;

    if host.parent(id) != Some(parent) || index.is_some() {
        let index = index.unwrap_or_else(|| host.children(parent).len());
        if let Err(err) = host.move_node(id, parent, index) {
            host.remove(id);
            return Err(err.into());
        }
    }
    if let Some(node) = host.get_mut(id) {
        apply_properties(node, desc);
    }
    host.mark_updated(id);
    Ok(id)
}
