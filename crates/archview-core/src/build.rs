//! Architecture tree -> flat graph over the whole hierarchy.

use std::collections::HashSet;

use crate::graph::{Edge, Graph, Node, NodeType};
use crate::resolve::resolve;
use crate::{ArchitectureBody, DeploymentNode, LayoutMap, Metadata, Relation, System};

/// Endpoint spelling for "the owning system itself" inside a system's relation list.
pub const SELF_REF: &str = ".";

/// Build the unscoped graph for `body`.
pub fn build(body: &ArchitectureBody) -> Graph {
    build_with_layout(body, None)
}

/// Build the unscoped graph and attach any stored positions from `layout`.
pub fn build_with_layout(body: &ArchitectureBody, layout: Option<&LayoutMap>) -> Graph {
    let mut nodes = collect_nodes(body);
    if let Some(layout) = layout {
        for node in &mut nodes {
            node.position = layout.get(&node.id).copied();
        }
    }
    let known: HashSet<String> = nodes.iter().map(|n| n.id.clone()).collect();
    let edges = collect_edges(body, &known);
    Graph::new(nodes, edges)
}

fn element(
    id: String,
    node_type: NodeType,
    label: &Option<String>,
    description: &Option<String>,
    metadata: &Metadata,
) -> Node {
    let mut node = Node::new(id, node_type);
    if let Some(label) = label {
        node.label = label.clone();
    }
    node.description = description.clone();
    node.metadata = metadata.clone();
    node
}

fn collect_nodes(body: &ArchitectureBody) -> Vec<Node> {
    let mut nodes = Vec::new();

    for person in &body.persons {
        nodes.push(element(
            person.id.clone(),
            NodeType::Person,
            &person.label,
            &person.description,
            &person.metadata,
        ));
    }

    for system in &body.systems {
        collect_system(system, &mut nodes);
    }

    for req in &body.requirements {
        let mut node = element(
            req.id.clone(),
            NodeType::Requirement,
            &req.label,
            &req.description,
            &req.metadata,
        );
        if let Some(kind) = &req.kind {
            node.attributes.insert("kind", kind.clone());
        }
        nodes.push(node);
    }

    for adr in &body.adrs {
        let mut node = element(adr.id.clone(), NodeType::Adr, &adr.title, &None, &adr.metadata);
        for (key, value) in [
            ("status", &adr.status),
            ("context", &adr.context),
            ("decision", &adr.decision),
            ("consequences", &adr.consequences),
        ] {
            if let Some(value) = value {
                node.attributes.insert(key, value.clone());
            }
        }
        nodes.push(node);
    }

    for deployment in &body.deployment {
        collect_deployment(deployment, None, &mut nodes);
    }

    nodes
}

fn collect_system(system: &System, nodes: &mut Vec<Node>) {
    let sid = &system.id;
    nodes.push(element(
        sid.clone(),
        NodeType::System,
        &system.label,
        &system.description,
        &system.metadata,
    ));

    for container in &system.containers {
        let cid = format!("{}.{}", sid, container.id);
        let mut node = element(
            cid.clone(),
            NodeType::Container,
            &container.label,
            &container.description,
            &container.metadata,
        )
        .with_parent(sid.clone());
        node.technology = container.technology.clone();
        nodes.push(node);

        for component in &container.components {
            let mut node = element(
                format!("{}.{}", cid, component.id),
                NodeType::Component,
                &component.label,
                &component.description,
                &component.metadata,
            )
            .with_parent(cid.clone());
            node.technology = component.technology.clone();
            nodes.push(node);
        }
    }

    for (stores, node_type) in [
        (&system.datastores, NodeType::Datastore),
        (&system.queues, NodeType::Queue),
    ] {
        for store in stores {
            let mut node = element(
                format!("{}.{}", sid, store.id),
                node_type,
                &store.label,
                &store.description,
                &store.metadata,
            )
            .with_parent(sid.clone());
            node.technology = store.technology.clone();
            nodes.push(node);
        }
    }
}

fn collect_deployment(deployment: &DeploymentNode, parent: Option<&str>, nodes: &mut Vec<Node>) {
    let id = match parent {
        Some(p) => format!("{}.{}", p, deployment.id),
        None => deployment.id.clone(),
    };
    let mut node = element(
        id.clone(),
        NodeType::Deployment,
        &deployment.label,
        &None,
        &deployment.metadata,
    );
    node.parent = parent.map(str::to_string);
    node.technology = deployment.technology.clone();
    if !deployment.instances.is_empty() {
        node.attributes.insert("instances", deployment.instances.join(","));
    }
    nodes.push(node);

    for child in &deployment.children {
        collect_deployment(child, Some(&id), nodes);
    }
}

fn collect_edges(body: &ArchitectureBody, known: &HashSet<String>) -> Vec<Edge> {
    let mut edges = Vec::new();

    for rel in &body.relations {
        let from = resolve(&rel.from, body, known);
        let to = resolve(&rel.to, body, known);
        push_relation(&mut edges, rel, from, to, known);
    }

    for system in &body.systems {
        for rel in &system.relations {
            let from = resolve_scoped(&rel.from, system, body, known);
            let to = resolve_scoped(&rel.to, system, body, known);
            push_relation(&mut edges, rel, from, to, known);
        }
    }

    edges
}

/// Endpoint inside a system's relation list: `.` is the system, otherwise
/// relative to it, falling back to an absolute reference.
fn resolve_scoped(
    reference: &str,
    system: &System,
    body: &ArchitectureBody,
    known: &HashSet<String>,
) -> Option<String> {
    if reference == SELF_REF {
        return Some(system.id.clone());
    }
    let local = format!("{}.{}", system.id, reference);
    if known.contains(&local) {
        return Some(local);
    }
    resolve(reference, body, known)
}

fn push_relation(
    edges: &mut Vec<Edge>,
    rel: &Relation,
    from: Option<String>,
    to: Option<String>,
    known: &HashSet<String>,
) {
    match (from, to) {
        (Some(from), Some(to)) if known.contains(&from) && known.contains(&to) => {
            let mut edge = Edge::new(from, to);
            edge.verb = rel.verb.clone();
            edge.label = rel.label.clone();
            edges.push(edge);
        }
        _ => {
            tracing::debug!(from = %rel.from, to = %rel.to, "dropping unresolved relation");
        }
    }
}
