pub mod build;
pub mod error;
pub mod graph;
pub mod projection;
pub mod resolve;
pub mod serialize;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub use build::{build, build_with_layout};
pub use error::{Error, Result};
pub use graph::{Edge, Graph, Node, NodeType, Shape};
pub use projection::{project, project_all, project_graph, C4Level, Scope};
pub use resolve::resolve;
pub use serialize::{serialize, Serialized};

// --- Document types (produced by the compiler, consumed here) ---

/// Stored bounds of a laid out node.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, schemars::JsonSchema)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    /// Round every component to the nearest integer, as stored in the layout map.
    pub fn rounded(&self) -> Self {
        Self {
            x: self.x.round(),
            y: self.y.round(),
            width: self.width.round(),
            height: self.height.round(),
        }
    }
}

/// Node id -> stored bounds. Ordered so saved documents diff cleanly.
pub type LayoutMap = BTreeMap<String, Rect>;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, schemars::JsonSchema)]
pub struct MetadataEntry {
    pub key: String,
    pub value: String,
}

/// Ordered key/value pairs. Insertion order is kept for display.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq, schemars::JsonSchema)]
#[serde(transparent)]
pub struct Metadata(pub Vec<MetadataEntry>);

impl Metadata {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|e| e.key == key)
            .map(|e| e.value.as_str())
    }

    /// Replace the value of an existing key in place, or append a new entry.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.0.iter_mut().find(|e| e.key == key) {
            Some(entry) => entry.value = value,
            None => self.0.push(MetadataEntry { key, value }),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|e| (e.key.as_str(), e.value.as_str()))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Person {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Metadata::is_empty")]
    pub metadata: Metadata,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Component {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub technology: Option<String>,
    #[serde(default, skip_serializing_if = "Metadata::is_empty")]
    pub metadata: Metadata,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Container {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub technology: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub components: Vec<Component>,
    #[serde(default, skip_serializing_if = "Metadata::is_empty")]
    pub metadata: Metadata,
}

/// Data stores and queues share a shape; they differ only in node type.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Store {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub technology: Option<String>,
    #[serde(default, skip_serializing_if = "Metadata::is_empty")]
    pub metadata: Metadata,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq, Hash, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Relation {
    pub from: String,
    pub to: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verb: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct System {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub containers: Vec<Container>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub datastores: Vec<Store>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub queues: Vec<Store>,
    /// Endpoints are relative to this system; `.` is the system itself.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub relations: Vec<Relation>,
    #[serde(default, skip_serializing_if = "Metadata::is_empty")]
    pub metadata: Metadata,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Requirement {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// functional, performance, security, ...
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Metadata::is_empty")]
    pub metadata: Metadata,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Adr {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decision: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub consequences: Option<String>,
    #[serde(default, skip_serializing_if = "Metadata::is_empty")]
    pub metadata: Metadata,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentNode {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub technology: Option<String>,
    /// Qualified ids of containers deployed onto this node.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub instances: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<DeploymentNode>,
    #[serde(default, skip_serializing_if = "Metadata::is_empty")]
    pub metadata: Metadata,
}

/// The nested architecture tree. This is the only persisted form of the model.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ArchitectureBody {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub persons: Vec<Person>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub systems: Vec<System>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub relations: Vec<Relation>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub requirements: Vec<Requirement>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub adrs: Vec<Adr>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub deployment: Vec<DeploymentNode>,
}

impl ArchitectureBody {
    pub fn system(&self, id: &str) -> Option<&System> {
        self.systems.iter().find(|s| s.id == id)
    }

    pub fn system_mut(&mut self, id: &str) -> Option<&mut System> {
        self.systems.iter_mut().find(|s| s.id == id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DocumentMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Name of the layout algorithm to use when no stored positions apply.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layout_engine: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layout: Option<LayoutMap>,
    /// Keys this crate does not interpret, kept so a save does not drop them.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ArchitectureDocument {
    #[serde(default)]
    pub metadata: DocumentMetadata,
    #[serde(default)]
    pub architecture: ArchitectureBody,
}

impl ArchitectureDocument {
    pub fn from_json_str(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Merge positions into `metadata.layout`, overwriting entries for the same node id.
    pub fn merge_layout(&mut self, layout: &LayoutMap) {
        let stored = self.metadata.layout.get_or_insert_with(LayoutMap::new);
        for (id, rect) in layout {
            stored.insert(id.clone(), *rect);
        }
    }
}

/// JSON Schema of the document shape, for validating compiler output.
pub fn document_schema() -> serde_json::Value {
    let schema = schemars::schema_for!(ArchitectureDocument);
    serde_json::to_value(schema).unwrap_or(serde_json::Value::Null)
}

/// Generate an edge ID from source and target node IDs.
pub fn make_edge_id(source: &str, target: &str) -> String {
    format!("edge-{}-{}", source, target)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metadata_insert_keeps_order_and_replaces() {
        let mut meta = Metadata::default();
        meta.insert("owner", "payments");
        meta.insert("tier", "1");
        meta.insert("owner", "billing");

        let pairs: Vec<_> = meta.iter().collect();
        assert_eq!(pairs, vec![("owner", "billing"), ("tier", "1")]);
        assert_eq!(meta.get("tier"), Some("1"));
        assert_eq!(meta.get("missing"), None);
    }

    #[test]
    fn document_parses_camel_case_and_keeps_unknown_metadata() {
        let raw = r#"{
            "metadata": {
                "name": "shop",
                "layoutEngine": "elk",
                "layout": { "Shop": { "x": 1.0, "y": 2.0, "width": 100.0, "height": 50.0 } },
                "generator": "compiler 0.4"
            },
            "architecture": {
                "persons": [{ "id": "Customer" }],
                "systems": [{
                    "id": "Shop",
                    "containers": [{ "id": "API", "technology": "Rust" }],
                    "relations": [{ "from": ".", "to": "API", "verb": "hosts" }]
                }]
            }
        }"#;
        let doc = ArchitectureDocument::from_json_str(raw).unwrap();
        assert_eq!(doc.metadata.layout_engine.as_deref(), Some("elk"));
        assert_eq!(doc.metadata.layout.as_ref().unwrap()["Shop"].width, 100.0);
        assert_eq!(doc.architecture.systems[0].containers[0].technology.as_deref(), Some("Rust"));

        let out = doc.to_json_pretty().unwrap();
        assert!(out.contains("\"generator\": \"compiler 0.4\""));
        assert!(out.contains("\"layoutEngine\": \"elk\""));
    }

    #[test]
    fn merge_layout_overwrites_matching_ids_only() {
        let mut doc = ArchitectureDocument::default();
        doc.metadata.layout = Some(LayoutMap::from([
            ("A".to_string(), Rect::new(0.0, 0.0, 10.0, 10.0)),
            ("B".to_string(), Rect::new(5.0, 5.0, 10.0, 10.0)),
        ]));
        let update = LayoutMap::from([("B".to_string(), Rect::new(50.0, 60.0, 10.0, 10.0))]);
        doc.merge_layout(&update);

        let layout = doc.metadata.layout.unwrap();
        assert_eq!(layout["A"].x, 0.0);
        assert_eq!(layout["B"].x, 50.0);
    }

    #[test]
    fn schema_describes_architecture_section() {
        let schema = document_schema();
        let text = schema.to_string();
        assert!(text.contains("architecture"));
        assert!(text.contains("persons"));
    }
}
