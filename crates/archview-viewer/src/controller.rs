//! Progressive disclosure and focus dimming over a mounted graph.
//!
//! The controller keeps its own index of the snapshot it was created from and
//! derives visibility and opacity from two pieces of state: the set of
//! collapsed node ids and the current focus scope. Every mutation is
//! idempotent; styles are recomputed from scratch on demand.

use std::collections::{HashMap, HashSet};

use archview_core::{Graph, NodeType};

pub const FULL_OPACITY: f64 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NodeStyle {
    pub visible: bool,
    pub opacity: f64,
    /// Drawn with the collapsed marker.
    pub collapsed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EdgeStyle {
    pub visible: bool,
    pub opacity: f64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FocusScope {
    System(String),
    Container(String),
}

impl FocusScope {
    pub fn id(&self) -> &str {
        match self {
            FocusScope::System(id) | FocusScope::Container(id) => id,
        }
    }

    /// The id itself or anything nested under it.
    pub fn contains(&self, node_id: &str) -> bool {
        let scope = self.id();
        node_id == scope
            || node_id
                .strip_prefix(scope)
                .is_some_and(|rest| rest.starts_with('.'))
    }
}

#[derive(Debug, Clone)]
struct EdgeEntry {
    id: String,
    source: String,
    target: String,
}

#[derive(Debug, Clone, Default)]
pub struct ViewController {
    order: Vec<String>,
    parents: HashMap<String, String>,
    types: HashMap<String, NodeType>,
    edges: Vec<EdgeEntry>,
    collapsed: HashSet<String>,
    focus: Option<FocusScope>,
    dim_opacity: f64,
}

impl ViewController {
    pub fn new(graph: &Graph, dim_opacity: f64) -> Self {
        let mut parents = HashMap::new();
        let mut types = HashMap::new();
        let mut order = Vec::with_capacity(graph.nodes().len());
        for node in graph.nodes() {
            if let Some(parent) = graph.effective_parent(&node.id) {
                parents.insert(node.id.clone(), parent.to_string());
            }
            types.insert(node.id.clone(), node.node_type);
            order.push(node.id.clone());
        }
        let edges = graph
            .edges()
            .iter()
            .map(|e| EdgeEntry {
                id: e.id.clone(),
                source: e.source.clone(),
                target: e.target.clone(),
            })
            .collect();
        Self {
            order,
            parents,
            types,
            edges,
            collapsed: HashSet::new(),
            focus: None,
            dim_opacity,
        }
    }

    /// Keep collapse flags and focus from `previous` for nodes that still exist.
    pub fn carry_over(&mut self, previous: &ViewController) {
        self.collapsed = previous
            .collapsed
            .iter()
            .filter(|id| self.types.contains_key(*id))
            .cloned()
            .collect();
        self.focus = previous.focus.clone();
    }

    pub fn contains(&self, id: &str) -> bool {
        self.types.contains_key(id)
    }

    /// Mark `id` collapsed. Returns false for unknown ids.
    pub fn collapse(&mut self, id: &str) -> bool {
        if !self.contains(id) {
            return false;
        }
        self.collapsed.insert(id.to_string());
        true
    }

    /// Clear the collapsed flag on `id`. Descendants keep their own flags.
    pub fn expand(&mut self, id: &str) -> bool {
        if !self.contains(id) {
            return false;
        }
        self.collapsed.remove(id);
        true
    }

    pub fn toggle(&mut self, id: &str) -> bool {
        if self.is_collapsed(id) {
            self.expand(id)
        } else {
            self.collapse(id)
        }
    }

    fn ids_of_type(&self, node_type: NodeType) -> Vec<String> {
        self.order
            .iter()
            .filter(|id| self.types.get(*id) == Some(&node_type))
            .cloned()
            .collect()
    }

    pub fn collapse_by_type(&mut self, node_type: NodeType) -> usize {
        let ids = self.ids_of_type(node_type);
        ids.iter().filter(|id| self.collapse(id)).count()
    }

    pub fn expand_by_type(&mut self, node_type: NodeType) -> usize {
        let ids = self.ids_of_type(node_type);
        ids.iter().filter(|id| self.expand(id)).count()
    }

    pub fn is_collapsed(&self, id: &str) -> bool {
        self.collapsed.contains(id)
    }

    /// Hidden iff some ancestor is collapsed. A collapsed node itself stays visible.
    pub fn is_visible(&self, id: &str) -> bool {
        let mut cur = id;
        let mut steps = 0;
        while let Some(parent) = self.parents.get(cur) {
            if self.collapsed.contains(parent) {
                return false;
            }
            cur = parent;
            steps += 1;
            if steps > self.order.len() {
                break;
            }
        }
        true
    }

    pub fn hidden_nodes(&self) -> Vec<&str> {
        self.order
            .iter()
            .map(String::as_str)
            .filter(|id| !self.is_visible(id))
            .collect()
    }

    pub fn set_focus(&mut self, scope: Option<FocusScope>) {
        self.focus = scope;
    }

    pub fn focus(&self) -> Option<&FocusScope> {
        self.focus.as_ref()
    }

    pub fn in_focus(&self, id: &str) -> bool {
        self.focus.as_ref().map_or(true, |scope| scope.contains(id))
    }

    pub fn node_style(&self, id: &str) -> Option<NodeStyle> {
        if !self.contains(id) {
            return None;
        }
        Some(NodeStyle {
            visible: self.is_visible(id),
            opacity: if self.in_focus(id) { FULL_OPACITY } else { self.dim_opacity },
            collapsed: self.is_collapsed(id),
        })
    }

    fn style_for(&self, edge: &EdgeEntry) -> EdgeStyle {
        // Dimmed only when both ends are out of focus.
        let dimmed = !self.in_focus(&edge.source) && !self.in_focus(&edge.target);
        EdgeStyle {
            visible: self.is_visible(&edge.source) && self.is_visible(&edge.target),
            opacity: if dimmed { self.dim_opacity } else { FULL_OPACITY },
        }
    }

    pub fn edge_style(&self, id: &str) -> Option<EdgeStyle> {
        self.edges
            .iter()
            .find(|e| e.id == id)
            .map(|e| self.style_for(e))
    }

    pub fn node_styles(&self) -> Vec<(&str, NodeStyle)> {
        self.order
            .iter()
            .filter_map(|id| self.node_style(id).map(|s| (id.as_str(), s)))
            .collect()
    }

    pub fn edge_styles(&self) -> Vec<(&str, EdgeStyle)> {
        self.edges
            .iter()
            .map(|e| (e.id.as_str(), self.style_for(e)))
            .collect()
    }
}
