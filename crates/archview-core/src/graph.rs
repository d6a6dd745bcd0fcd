//! Flat, id-indexed graph snapshot derived from an [`ArchitectureBody`](crate::ArchitectureBody).
//!
//! Nodes carry qualified ids (`System.Container.Component`) and a parent link.
//! A projection or build produces a fresh `Graph`; it is replaced, not patched,
//! when the body or the requested scope changes. The editing helpers at the
//! bottom exist for the viewer's working copy only.

use serde::Serialize;
use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;
use std::str::FromStr;

use crate::{make_edge_id, Error, Metadata, Rect, Result};

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum NodeType {
    Person,
    System,
    Container,
    Component,
    Datastore,
    Queue,
    Requirement,
    Adr,
    Deployment,
}

impl NodeType {
    pub const ALL: [NodeType; 9] = [
        NodeType::Person,
        NodeType::System,
        NodeType::Container,
        NodeType::Component,
        NodeType::Datastore,
        NodeType::Queue,
        NodeType::Requirement,
        NodeType::Adr,
        NodeType::Deployment,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            NodeType::Person => "person",
            NodeType::System => "system",
            NodeType::Container => "container",
            NodeType::Component => "component",
            NodeType::Datastore => "datastore",
            NodeType::Queue => "queue",
            NodeType::Requirement => "requirement",
            NodeType::Adr => "adr",
            NodeType::Deployment => "deployment",
        }
    }

    /// Render shape for this node type. This is the style table handed to the renderer.
    pub fn shape(&self) -> Shape {
        match self {
            NodeType::Person => Shape::Person,
            NodeType::Datastore => Shape::Cylinder,
            NodeType::Queue => Shape::Pipe,
            NodeType::Requirement => Shape::Hexagon,
            NodeType::Adr => Shape::Trapezoid,
            NodeType::Deployment => Shape::Bucket,
            NodeType::System | NodeType::Container | NodeType::Component => Shape::Rectangle,
        }
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NodeType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        NodeType::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| {
                format!(
                    "Invalid node type '{}'. Must be: person, system, container, component, datastore, queue, requirement, adr, deployment",
                    s
                )
            })
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum Shape {
    Rectangle,
    Person,
    Cylinder,
    Pipe,
    Trapezoid,
    Bucket,
    Hexagon,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub id: String,
    #[serde(rename = "type")]
    pub node_type: NodeType,
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub technology: Option<String>,
    /// Set on nodes that stand in for something outside the projected scope.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub external: bool,
    #[serde(skip_serializing_if = "Metadata::is_empty")]
    pub metadata: Metadata,
    /// Type-specific scalar fields (requirement kind, ADR status, deployment instances).
    #[serde(skip_serializing_if = "Metadata::is_empty")]
    pub attributes: Metadata,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<Rect>,
}

impl Node {
    pub fn new(id: impl Into<String>, node_type: NodeType) -> Self {
        let id = id.into();
        Self {
            label: local_id(&id).to_string(),
            id,
            node_type,
            parent: None,
            description: None,
            technology: None,
            external: false,
            metadata: Metadata::default(),
            attributes: Metadata::default(),
            position: None,
        }
    }

    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Last segment of the qualified id.
    pub fn local_id(&self) -> &str {
        local_id(&self.id)
    }
}

/// Last dotted segment of a qualified id.
pub fn local_id(id: &str) -> &str {
    id.rsplit('.').next().unwrap_or(id)
}

/// First dotted segment of a qualified id: the owning top-level entity.
pub fn top_level_id(id: &str) -> &str {
    id.split('.').next().unwrap_or(id)
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Edge {
    pub id: String,
    pub source: String,
    pub target: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verb: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl Edge {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        let source = source.into();
        let target = target.into();
        Self {
            id: make_edge_id(&source, &target),
            source,
            target,
            verb: None,
            label: None,
        }
    }

    pub fn display_label(&self) -> Option<&str> {
        self.label.as_deref().or(self.verb.as_deref())
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Graph {
    nodes: Vec<Node>,
    edges: Vec<Edge>,
    #[serde(skip)]
    index: HashMap<String, usize>,
}

impl Graph {
    /// Build a snapshot. Duplicate node ids keep the first occurrence; edges
    /// whose endpoints are not in the node set are dropped; repeated edge ids
    /// get a numeric suffix.
    pub fn new(nodes: Vec<Node>, edges: Vec<Edge>) -> Self {
        let mut graph = Graph::default();
        for node in nodes {
            if graph.index.contains_key(&node.id) {
                tracing::debug!(id = %node.id, "duplicate node id, keeping first");
                continue;
            }
            graph.index.insert(node.id.clone(), graph.nodes.len());
            graph.nodes.push(node);
        }
        for edge in edges {
            if !graph.contains(&edge.source) || !graph.contains(&edge.target) {
                tracing::debug!(source = %edge.source, target = %edge.target, "dropping edge with unknown endpoint");
                continue;
            }
            graph.push_edge(edge);
        }
        graph
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.index.get(id).map(|&i| &self.nodes[i])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn edge(&self, id: &str) -> Option<&Edge> {
        self.edges.iter().find(|e| e.id == id)
    }

    /// The node's parent if that parent is part of this set. A dangling
    /// parent makes the node top-level for this set.
    pub fn effective_parent(&self, id: &str) -> Option<&str> {
        self.node(id)?
            .parent
            .as_deref()
            .filter(|p| self.contains(p))
    }

    pub fn children(&self, id: &str) -> Vec<&Node> {
        self.nodes
            .iter()
            .filter(|n| n.parent.as_deref() == Some(id) && self.contains(id))
            .collect()
    }

    /// Transitive descendants in breadth-first order.
    pub fn descendants(&self, id: &str) -> Vec<String> {
        let mut children_of: HashMap<&str, Vec<&str>> = HashMap::new();
        for node in &self.nodes {
            if let Some(parent) = self.effective_parent(&node.id) {
                children_of.entry(parent).or_default().push(&node.id);
            }
        }
        let mut out = Vec::new();
        let mut seen: HashSet<&str> = HashSet::new();
        let mut queue: VecDeque<&str> = VecDeque::from([id]);
        while let Some(cur) = queue.pop_front() {
            for &child in children_of.get(cur).map(Vec::as_slice).unwrap_or(&[]) {
                if seen.insert(child) {
                    out.push(child.to_string());
                    queue.push_back(child);
                }
            }
        }
        out
    }

    /// Ancestors present in this set, nearest first.
    pub fn ancestors(&self, id: &str) -> Vec<&str> {
        let mut chain = Vec::new();
        let mut cur = id;
        while let Some(parent) = self.effective_parent(cur) {
            if chain.contains(&parent) {
                break;
            }
            chain.push(parent);
            cur = parent;
        }
        chain
    }

    /// The system node owning `id` (itself if it is a system), walking up through parents.
    pub fn owning_system(&self, id: &str) -> Option<&str> {
        let node = self.node(id)?;
        if node.node_type == NodeType::System {
            return Some(node.id.as_str());
        }
        self.ancestors(id)
            .into_iter()
            .find(|a| self.node(a).map(|n| n.node_type) == Some(NodeType::System))
    }

    fn push_edge(&mut self, mut edge: Edge) {
        if self.edges.iter().any(|e| e.id == edge.id) {
            let base = edge.id.clone();
            let mut n = 2;
            while self.edges.iter().any(|e| e.id == format!("{}-{}", base, n)) {
                n += 1;
            }
            edge.id = format!("{}-{}", base, n);
        }
        self.edges.push(edge);
    }

    fn reindex(&mut self) {
        self.index = self
            .nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (n.id.clone(), i))
            .collect();
    }

    // --- Editing (viewer working copy) ---

    pub fn add_node(&mut self, node: Node) -> Result<()> {
        if self.contains(&node.id) {
            return Err(Error::DuplicateNode { id: node.id });
        }
        self.index.insert(node.id.clone(), self.nodes.len());
        self.nodes.push(node);
        Ok(())
    }

    /// Remove a node, its transitive descendants and every edge touching them.
    pub fn remove_node(&mut self, id: &str) -> Result<Vec<Node>> {
        if !self.contains(id) {
            return Err(Error::UnknownNode { id: id.to_string() });
        }
        let mut doomed: HashSet<String> = self.descendants(id).into_iter().collect();
        doomed.insert(id.to_string());

        let (removed, kept): (Vec<Node>, Vec<Node>) = std::mem::take(&mut self.nodes)
            .into_iter()
            .partition(|n| doomed.contains(&n.id));
        self.nodes = kept;
        self.edges
            .retain(|e| !doomed.contains(&e.source) && !doomed.contains(&e.target));
        self.reindex();
        Ok(removed)
    }

    /// Add an edge between existing nodes and return its id.
    pub fn add_edge(&mut self, mut edge: Edge) -> Result<String> {
        for endpoint in [&edge.source, &edge.target] {
            if !self.contains(endpoint) {
                return Err(Error::UnknownNode { id: endpoint.clone() });
            }
        }
        edge.id = make_edge_id(&edge.source, &edge.target);
        self.push_edge(edge);
        Ok(self.edges.last().map(|e| e.id.clone()).unwrap_or_default())
    }

    pub fn remove_edge(&mut self, id: &str) -> Result<Edge> {
        let pos = self
            .edges
            .iter()
            .position(|e| e.id == id)
            .ok_or_else(|| Error::UnknownEdge { id: id.to_string() })?;
        Ok(self.edges.remove(pos))
    }

    pub fn set_position(&mut self, id: &str, rect: Rect) -> Result<()> {
        let &i = self
            .index
            .get(id)
            .ok_or_else(|| Error::UnknownNode { id: id.to_string() })?;
        self.nodes[i].position = Some(rect);
        Ok(())
    }
}
