//! Seam to the external layout/render engine.
//!
//! The engine is injected into [`Viewer`](crate::Viewer) as a trait object.
//! Anything it reports asynchronously (layout finished, node dragged, node
//! selected) comes back as a [`RenderEvent`] on an mpsc channel, tagged with
//! the session that mounted the graph so late callbacks can be discarded.

use archview_core::{Graph, NodeType, Rect, Shape};
use tokio::sync::watch;

use crate::controller::{EdgeStyle, NodeStyle};

/// Identifies one mount of a graph. Bumped on every render and on teardown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct SessionId(pub u64);

impl SessionId {
    pub fn next(self) -> Self {
        SessionId(self.0 + 1)
    }
}

/// Measured size of the drawing surface.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SurfaceSize {
    pub width: f64,
    pub height: f64,
}

impl SurfaceSize {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    pub fn is_zero(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutAlgorithm {
    /// Hierarchical layered layout (dagre style). The default.
    Layered,
    Elk,
    ForceDirected,
    Breadthfirst,
    Grid,
    Circle,
    Concentric,
}

impl LayoutAlgorithm {
    /// Parse the document's layout-engine setting. Unknown names give `None`.
    pub fn from_setting(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "dagre" | "layered" | "hierarchical" => Some(LayoutAlgorithm::Layered),
            "elk" => Some(LayoutAlgorithm::Elk),
            "cose" | "fcose" | "cose-bilkent" | "force" => Some(LayoutAlgorithm::ForceDirected),
            "breadthfirst" => Some(LayoutAlgorithm::Breadthfirst),
            "grid" => Some(LayoutAlgorithm::Grid),
            "circle" => Some(LayoutAlgorithm::Circle),
            "concentric" => Some(LayoutAlgorithm::Concentric),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LayoutAlgorithm::Layered => "dagre",
            LayoutAlgorithm::Elk => "elk",
            LayoutAlgorithm::ForceDirected => "fcose",
            LayoutAlgorithm::Breadthfirst => "breadthfirst",
            LayoutAlgorithm::Grid => "grid",
            LayoutAlgorithm::Circle => "circle",
            LayoutAlgorithm::Concentric => "concentric",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RenderEvent {
    /// The layout started by `run_layout` has assigned positions.
    LayoutStop { session: SessionId },
    DragEnd {
        session: SessionId,
        node_id: String,
        bounds: Rect,
    },
    Select {
        session: SessionId,
        node_id: Option<String>,
    },
}

impl RenderEvent {
    pub fn session(&self) -> SessionId {
        match self {
            RenderEvent::LayoutStop { session }
            | RenderEvent::DragEnd { session, .. }
            | RenderEvent::Select { session, .. } => *session,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NodeElement {
    pub id: String,
    pub label: String,
    pub node_type: NodeType,
    /// Compound parent, only when the parent is part of the same element set.
    pub parent: Option<String>,
    pub external: bool,
    /// Fixed position in preset mode.
    pub position: Option<Rect>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EdgeElement {
    pub id: String,
    pub source: String,
    pub target: String,
    pub label: Option<String>,
}

/// What gets mounted into the render engine.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ElementSet {
    pub nodes: Vec<NodeElement>,
    pub edges: Vec<EdgeElement>,
}

impl ElementSet {
    pub fn from_graph(graph: &Graph, with_positions: bool) -> Self {
        let nodes = graph
            .nodes()
            .iter()
            .map(|n| NodeElement {
                id: n.id.clone(),
                label: n.label.clone(),
                node_type: n.node_type,
                parent: graph.effective_parent(&n.id).map(str::to_string),
                external: n.external,
                position: if with_positions { n.position } else { None },
            })
            .collect();
        let edges = graph
            .edges()
            .iter()
            .map(|e| EdgeElement {
                id: e.id.clone(),
                source: e.source.clone(),
                target: e.target.clone(),
                label: e.display_label().map(str::to_string),
            })
            .collect();
        Self { nodes, edges }
    }
}

/// Shape lookup keyed by node type, handed to the engine on mount.
pub type StyleFn = fn(&NodeType) -> Shape;

pub trait RenderBackend {
    /// Whether the mount point named `container` exists.
    fn container_exists(&self, container: &str) -> bool;

    fn surface_size(&self) -> SurfaceSize;

    /// Resize notifications, when the host can provide them. Without one the
    /// orchestrator falls back to polling `surface_size`.
    fn resize_notifications(&mut self) -> Option<watch::Receiver<SurfaceSize>> {
        None
    }

    fn mount(&mut self, session: SessionId, elements: &ElementSet, style: StyleFn);

    /// Start an algorithmic layout. Completion is reported as
    /// [`RenderEvent::LayoutStop`] for `session`.
    fn run_layout(&mut self, session: SessionId, algorithm: LayoutAlgorithm);

    fn fit(&mut self, padding: f64);

    fn set_node_style(&mut self, id: &str, style: NodeStyle);

    fn set_edge_style(&mut self, id: &str, style: EdgeStyle);

    /// Current bounds of every mounted node, including user drags.
    fn node_bounds(&self) -> Vec<(String, Rect)>;

    /// Tear down the mounted graph and its listeners.
    fn destroy(&mut self);
}
