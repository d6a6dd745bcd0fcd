//! Rendered graph -> nested architecture body plus a flat layout map.
//!
//! The output mirrors the source document but is not guaranteed to be
//! textually identical: relations may move between the top-level list and a
//! system's scoped list, and endpoints switch between absolute and relative
//! spelling. The set of resolved relations is preserved.

use serde::Serialize;

use crate::build::SELF_REF;
use crate::graph::{local_id, top_level_id, Graph, Node, NodeType};
use crate::{
    Adr, ArchitectureBody, Component, Container, DeploymentNode, LayoutMap, Person, Relation,
    Requirement, Store, System,
};

#[derive(Debug, Clone, Serialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Serialized {
    pub architecture_body: ArchitectureBody,
    pub layout_map: LayoutMap,
}

pub fn serialize(graph: &Graph) -> Serialized {
    Serialized {
        architecture_body: to_body(graph),
        layout_map: to_layout(graph),
    }
}

/// Rounded bounds of every positioned node. Nodes that were never laid out are skipped.
fn to_layout(graph: &Graph) -> LayoutMap {
    graph
        .nodes()
        .iter()
        .filter_map(|n| n.position.map(|p| (n.id.clone(), p.rounded())))
        .collect()
}

fn strip_owner<'a>(id: &'a str, owner: &str) -> &'a str {
    id.strip_prefix(owner)
        .and_then(|rest| rest.strip_prefix('.'))
        .unwrap_or_else(|| local_id(id))
}

/// Label worth storing: `None` when it is just the default local id.
fn stored_label(node: &Node) -> Option<String> {
    (node.label != node.local_id()).then(|| node.label.clone())
}

fn attr(node: &Node, key: &str) -> Option<String> {
    node.attributes.get(key).map(str::to_string)
}

fn system_entry<'a>(body: &'a mut ArchitectureBody, id: &str) -> &'a mut System {
    let pos = match body.systems.iter().position(|s| s.id == id) {
        Some(pos) => pos,
        None => {
            tracing::debug!(system = id, "creating owning system for orphaned child");
            body.systems.push(System { id: id.to_string(), ..Default::default() });
            body.systems.len() - 1
        }
    };
    &mut body.systems[pos]
}

/// Owning id and local id of a nested node, preferring its declared parent.
fn owner_of(node: &Node) -> Option<(String, String)> {
    let owner = match &node.parent {
        Some(parent) => parent.clone(),
        None if node.id.contains('.') => {
            let dot = node.id.rfind('.')?;
            node.id[..dot].to_string()
        }
        None => return None,
    };
    let local = strip_owner(&node.id, &owner).to_string();
    Some((owner, local))
}

fn to_body(graph: &Graph) -> ArchitectureBody {
    let mut body = ArchitectureBody::default();

    for node in graph.nodes() {
        match node.node_type {
            NodeType::Person => body.persons.push(Person {
                id: node.id.clone(),
                label: stored_label(node),
                description: node.description.clone(),
                metadata: node.metadata.clone(),
            }),
            NodeType::System => {
                let system = system_entry(&mut body, &node.id);
                system.label = stored_label(node);
                system.description = node.description.clone();
                system.metadata = node.metadata.clone();
            }
            NodeType::Requirement => body.requirements.push(Requirement {
                id: node.id.clone(),
                label: stored_label(node),
                kind: attr(node, "kind"),
                description: node.description.clone(),
                metadata: node.metadata.clone(),
            }),
            NodeType::Adr => body.adrs.push(Adr {
                id: node.id.clone(),
                title: stored_label(node),
                status: attr(node, "status"),
                context: attr(node, "context"),
                decision: attr(node, "decision"),
                consequences: attr(node, "consequences"),
                metadata: node.metadata.clone(),
            }),
            _ => {}
        }
    }

    for node in graph.nodes() {
        if !matches!(
            node.node_type,
            NodeType::Container | NodeType::Datastore | NodeType::Queue
        ) {
            continue;
        }
        let Some((owner, local)) = owner_of(node) else {
            tracing::warn!(id = %node.id, node_type = %node.node_type, "no owning system, skipping");
            continue;
        };
        let system = system_entry(&mut body, &owner);
        match node.node_type {
            NodeType::Container => {
                if let Some(existing) = system.containers.iter_mut().find(|c| c.id == local) {
                    existing.label = stored_label(node);
                    existing.description = node.description.clone();
                    existing.technology = node.technology.clone();
                    existing.metadata = node.metadata.clone();
                } else {
                    system.containers.push(Container {
                        id: local,
                        label: stored_label(node),
                        description: node.description.clone(),
                        technology: node.technology.clone(),
                        components: Vec::new(),
                        metadata: node.metadata.clone(),
                    });
                }
            }
            _ => {
                let store = Store {
                    id: local,
                    label: stored_label(node),
                    description: node.description.clone(),
                    technology: node.technology.clone(),
                    metadata: node.metadata.clone(),
                };
                if node.node_type == NodeType::Datastore {
                    system.datastores.push(store);
                } else {
                    system.queues.push(store);
                }
            }
        }
    }

    for node in graph.nodes().iter().filter(|n| n.node_type == NodeType::Component) {
        let Some((container_id, local)) = owner_of(node) else {
            tracing::warn!(id = %node.id, "component without container, skipping");
            continue;
        };
        let (system_id, container_local) = match graph.node(&container_id).and_then(owner_of) {
            Some(found) => found,
            None if container_id.contains('.') => (
                top_level_id(&container_id).to_string(),
                strip_owner(&container_id, top_level_id(&container_id)).to_string(),
            ),
            None => {
                tracing::warn!(id = %node.id, "component without owning system, skipping");
                continue;
            }
        };
        let system = system_entry(&mut body, &system_id);
        let pos = match system.containers.iter().position(|c| c.id == container_local) {
            Some(pos) => pos,
            None => {
                system.containers.push(Container { id: container_local, ..Default::default() });
                system.containers.len() - 1
            }
        };
        system.containers[pos].components.push(Component {
            id: local,
            label: stored_label(node),
            description: node.description.clone(),
            technology: node.technology.clone(),
            metadata: node.metadata.clone(),
        });
    }

    body.deployment = deployment_tree(graph, None);

    for edge in graph.edges() {
        let relation = |from: String, to: String| Relation {
            from,
            to,
            verb: edge.verb.clone(),
            label: edge.label.clone(),
        };
        // An outside target spelled absolutely inside a system's list would
        // rebind to a same-named local child on rebuild.
        let owner = graph.owning_system(&edge.source).filter(|system_id| {
            edge.target == *system_id
                || edge.target.starts_with(&format!("{}.", system_id))
                || !graph.contains(&format!("{}.{}", system_id, edge.target))
        });
        match owner {
            Some(system_id) => {
                let from = if edge.source == system_id {
                    SELF_REF.to_string()
                } else {
                    strip_owner(&edge.source, system_id).to_string()
                };
                let to = if edge.target == system_id {
                    SELF_REF.to_string()
                } else if edge.target.starts_with(&format!("{}.", system_id)) {
                    strip_owner(&edge.target, system_id).to_string()
                } else {
                    edge.target.clone()
                };
                system_entry(&mut body, system_id).relations.push(relation(from, to));
            }
            None => body
                .relations
                .push(relation(edge.source.clone(), edge.target.clone())),
        }
    }

    body
}

fn deployment_tree(graph: &Graph, parent: Option<&str>) -> Vec<DeploymentNode> {
    graph
        .nodes()
        .iter()
        .filter(|n| n.node_type == NodeType::Deployment && graph.effective_parent(&n.id) == parent)
        .map(|n| DeploymentNode {
            id: n.local_id().to_string(),
            label: stored_label(n),
            technology: n.technology.clone(),
            instances: n
                .attributes
                .get("instances")
                .map(|s| s.split(',').map(str::to_string).collect())
                .unwrap_or_default(),
            children: deployment_tree(graph, Some(&n.id)),
            metadata: n.metadata.clone(),
        })
        .collect()
}
