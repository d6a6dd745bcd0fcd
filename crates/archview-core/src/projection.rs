//! C4 projections: context, container and component views derived from the full graph.
//!
//! Every view is computed from the unscoped build alone, so any subset can be
//! produced in any order (or all at once via [`project_all`]).

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

use crate::build::build;
use crate::graph::{Edge, Graph, Node, NodeType};
use crate::ArchitectureBody;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum C4Level {
    Context,
    Container,
    Component,
}

/// Requested zoom scope.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Scope {
    /// System context: persons and systems only.
    Context,
    /// Container view of one system.
    System(String),
    /// Component view of one container: `(system_id, container_id)` with a local container id.
    Container(String, String),
}

impl Scope {
    pub fn level(&self) -> C4Level {
        match self {
            Scope::Context => C4Level::Context,
            Scope::System(_) => C4Level::Container,
            Scope::Container(..) => C4Level::Component,
        }
    }
}

/// Build the body and project it to `scope`.
pub fn project(body: &ArchitectureBody, scope: &Scope) -> Graph {
    project_graph(&build(body), scope)
}

/// Project an already-built unscoped graph. Positions on `full` carry over.
pub fn project_graph(full: &Graph, scope: &Scope) -> Graph {
    match scope {
        Scope::Context => context_view(full),
        Scope::System(system_id) => container_view(full, system_id),
        Scope::Container(system_id, container_id) => {
            component_view(full, &format!("{}.{}", system_id, container_id))
        }
    }
}

/// Every view of `body`: the context, one container view per system and one
/// component view per container.
pub fn project_all(body: &ArchitectureBody) -> BTreeMap<Scope, Graph> {
    let full = build(body);
    let mut views = BTreeMap::new();
    views.insert(Scope::Context, project_graph(&full, &Scope::Context));
    for system in &body.systems {
        let scope = Scope::System(system.id.clone());
        views.insert(scope.clone(), project_graph(&full, &scope));
        for container in &system.containers {
            let scope = Scope::Container(system.id.clone(), container.id.clone());
            views.insert(scope.clone(), project_graph(&full, &scope));
        }
    }
    views
}

/// Outermost ancestor of `id` in `full`, or `id` itself.
fn top_level<'a>(full: &'a Graph, id: &'a str) -> &'a str {
    full.ancestors(id).last().copied().unwrap_or(id)
}

/// Rolled-up edges, deduplicated by endpoint pair (first label wins), self-loops dropped.
fn rolled_edges<'a, F>(full: &'a Graph, visible: &HashSet<String>, mut roll: F) -> Vec<Edge>
where
    F: FnMut(&'a str) -> Option<&'a str>,
{
    let mut seen: HashSet<(&str, &str)> = HashSet::new();
    let mut edges = Vec::new();
    for edge in full.edges() {
        let (Some(from), Some(to)) = (roll(&edge.source), roll(&edge.target)) else {
            continue;
        };
        if from == to || !visible.contains(from) || !visible.contains(to) {
            continue;
        }
        if seen.insert((from, to)) {
            let mut rolled = Edge::new(from, to);
            rolled.verb = edge.verb.clone();
            rolled.label = edge.label.clone();
            edges.push(rolled);
        }
    }
    edges
}

fn context_view(full: &Graph) -> Graph {
    let nodes: Vec<Node> = full
        .nodes()
        .iter()
        .filter(|n| matches!(n.node_type, NodeType::Person | NodeType::System))
        .cloned()
        .collect();
    let visible: HashSet<String> = nodes.iter().map(|n| n.id.clone()).collect();
    let edges = rolled_edges(full, &visible, |id| Some(top_level(full, id)));
    Graph::new(nodes, edges)
}

fn container_view(full: &Graph, system_id: &str) -> Graph {
    let mut nodes = Vec::new();
    for node in full.nodes() {
        match node.node_type {
            NodeType::Person => nodes.push(node.clone()),
            NodeType::System if node.id != system_id => {
                let mut external = node.clone();
                external.external = true;
                nodes.push(external);
            }
            NodeType::Container | NodeType::Datastore | NodeType::Queue
                if full.effective_parent(&node.id) == Some(system_id) =>
            {
                nodes.push(node.clone());
            }
            _ => {}
        }
    }
    if !full.contains(system_id) {
        tracing::debug!(system = system_id, "container view of unknown system");
    }

    let visible: HashSet<String> = nodes.iter().map(|n| n.id.clone()).collect();
    let edges = rolled_edges(full, &visible, |id| {
        if id == system_id {
            return None;
        }
        // Inside the target system: the ancestor directly below it.
        let mut cur = id;
        loop {
            match full.effective_parent(cur) {
                Some(parent) if parent == system_id => return Some(cur),
                Some(parent) => cur = parent,
                None => break,
            }
        }
        Some(top_level(full, id))
    });
    Graph::new(nodes, edges)
}

fn component_view(full: &Graph, container_id: &str) -> Graph {
    let mut nodes: Vec<Node> = full
        .nodes()
        .iter()
        .filter(|n| {
            n.node_type == NodeType::Component && full.effective_parent(&n.id) == Some(container_id)
        })
        .cloned()
        .collect();
    let inner: HashSet<String> = nodes.iter().map(|n| n.id.clone()).collect();
    let mut included = inner.clone();

    let mut edges = Vec::new();
    for edge in full.edges() {
        if edge.source == edge.target {
            continue;
        }
        let other = match (inner.contains(&edge.source), inner.contains(&edge.target)) {
            (false, false) => continue,
            (true, true) => None,
            (true, false) => Some(&edge.target),
            (false, true) => Some(&edge.source),
        };
        if let Some(other) = other {
            if !included.contains(other) {
                let Some(found) = full.node(other) else {
                    continue;
                };
                let mut external = found.clone();
                external.external = true;
                included.insert(external.id.clone());
                nodes.push(external);
            }
        }
        edges.push(edge.clone());
    }
    Graph::new(nodes, edges)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Component, Container, Person, Relation, Store, System};

    fn rel(from: &str, to: &str) -> Relation {
        Relation { from: from.into(), to: to.into(), ..Default::default() }
    }

    fn two_systems() -> ArchitectureBody {
        ArchitectureBody {
            systems: vec![
                System {
                    id: "Sys1".into(),
                    containers: vec![Container { id: "API".into(), ..Default::default() }],
                    ..Default::default()
                },
                System {
                    id: "Sys2".into(),
                    containers: vec![Container { id: "DB".into(), ..Default::default() }],
                    ..Default::default()
                },
            ],
            relations: vec![rel("Sys1.API", "Sys2.DB")],
            ..Default::default()
        }
    }

    fn ids(g: &Graph) -> Vec<&str> {
        let mut ids: Vec<&str> = g.nodes().iter().map(|n| n.id.as_str()).collect();
        ids.sort();
        ids
    }

    fn pairs(g: &Graph) -> Vec<(&str, &str)> {
        g.edges().iter().map(|e| (e.source.as_str(), e.target.as_str())).collect()
    }

    #[test]
    fn context_rolls_container_edges_up_to_systems() {
        let g = project(&two_systems(), &Scope::Context);
        assert_eq!(ids(&g), vec!["Sys1", "Sys2"]);
        assert_eq!(pairs(&g), vec![("Sys1", "Sys2")]);
    }

    #[test]
    fn container_view_expands_target_and_collapses_others() {
        let g = project(&two_systems(), &Scope::System("Sys1".into()));
        assert_eq!(ids(&g), vec!["Sys1.API", "Sys2"]);
        assert!(g.node("Sys2").unwrap().external);
        assert!(!g.node("Sys1.API").unwrap().external);
        assert_eq!(pairs(&g), vec![("Sys1.API", "Sys2")]);
        // Parent is outside the set, so the container renders top-level.
        assert_eq!(g.effective_parent("Sys1.API"), None);
    }

    fn layered() -> ArchitectureBody {
        ArchitectureBody {
            persons: vec![Person { id: "User".into(), ..Default::default() }],
            systems: vec![
                System {
                    id: "Shop".into(),
                    containers: vec![
                        Container {
                            id: "Web".into(),
                            components: vec![
                                Component { id: "Cart".into(), ..Default::default() },
                                Component { id: "Auth".into(), ..Default::default() },
                            ],
                            ..Default::default()
                        },
                        Container { id: "Worker".into(), ..Default::default() },
                    ],
                    datastores: vec![Store { id: "DB".into(), ..Default::default() }],
                    queues: vec![Store { id: "Jobs".into(), ..Default::default() }],
                    relations: vec![
                        Relation { from: "Web.Cart".into(), to: "DB".into(), label: Some("writes orders".into()), verb: None },
                        Relation { from: "Web.Auth".into(), to: "DB".into(), label: Some("reads users".into()), verb: None },
                        rel("Web.Cart", "Web.Auth"),
                        rel("Web.Cart", "Jobs"),
                        rel("Worker", "Jobs"),
                    ],
                    ..Default::default()
                },
                System { id: "Payments".into(), ..Default::default() },
            ],
            relations: vec![
                rel("User", "Shop.Web.Cart"),
                rel("Shop.Web.Cart", "Payments"),
                rel("User", "Shop"),
            ],
            ..Default::default()
        }
    }

    #[test]
    fn context_dedupes_and_drops_self_loops() {
        let g = project(&layered(), &Scope::Context);
        assert_eq!(ids(&g), vec!["Payments", "Shop", "User"]);
        assert_eq!(pairs(&g), vec![("User", "Shop"), ("Shop", "Payments")]);
    }

    #[test]
    fn container_view_rolls_components_to_containers() {
        let g = project(&layered(), &Scope::System("Shop".into()));
        assert_eq!(
            ids(&g),
            vec!["Payments", "Shop.DB", "Shop.Jobs", "Shop.Web", "Shop.Worker", "User"]
        );
        let p = pairs(&g);
        assert!(p.contains(&("Shop.Web", "Shop.DB")));
        assert!(p.contains(&("Shop.Web", "Shop.Jobs")));
        assert!(p.contains(&("Shop.Worker", "Shop.Jobs")));
        assert!(p.contains(&("User", "Shop.Web")));
        assert!(p.contains(&("Shop.Web", "Payments")));
        // Cart -> Auth is internal to Web; User -> Shop targets the hidden system node.
        assert_eq!(p.len(), 5);
        let db = g.edges().iter().find(|e| e.target == "Shop.DB").unwrap();
        assert_eq!(db.label.as_deref(), Some("writes orders"));
    }

    #[test]
    fn component_view_synthesizes_external_neighbours() {
        let g = project(&layered(), &Scope::Container("Shop".into(), "Web".into()));
        assert_eq!(
            ids(&g),
            vec!["Payments", "Shop.DB", "Shop.Jobs", "Shop.Web.Auth", "Shop.Web.Cart", "User"]
        );
        assert_eq!(g.node("Shop.DB").unwrap().node_type, NodeType::Datastore);
        assert_eq!(g.node("User").unwrap().node_type, NodeType::Person);
        assert!(g.node("Payments").unwrap().external);
        assert!(!g.node("Shop.Web.Cart").unwrap().external);
        assert!(pairs(&g).contains(&("Shop.Web.Cart", "Shop.Web.Auth")));
        assert!(!g.contains("Shop.Worker"));
        assert_eq!(g.edges().len(), 6);
    }

    #[test]
    fn unknown_scope_yields_no_expanded_nodes() {
        let g = project(&layered(), &Scope::System("Nope".into()));
        assert!(g.nodes().iter().all(|n| n.node_type != NodeType::Container));
        let g = project(&layered(), &Scope::Container("Shop".into(), "Nope".into()));
        assert!(g.nodes().is_empty());
    }

    #[test]
    fn project_all_covers_every_scope_independently() {
        let body = layered();
        let all = project_all(&body);
        assert_eq!(all.len(), 1 + 2 + 2);
        for (scope, graph) in &all {
            let fresh = project(&body, scope);
            assert_eq!(ids(graph), ids(&fresh), "{:?}", scope);
            assert_eq!(pairs(graph), pairs(&fresh), "{:?}", scope);
        }
        assert_eq!(Scope::Container("Shop".into(), "Web".into()).level(), C4Level::Component);
    }
}
