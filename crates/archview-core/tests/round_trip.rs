use std::collections::{BTreeSet, HashSet};

use archview_core::graph::top_level_id;
use archview_core::{
    build, build_with_layout, project, serialize, ArchitectureBody, ArchitectureDocument,
    NodeType, Rect, Scope,
};
use rstest::{fixture, rstest};

const SHOP: &str = r#"{
  "metadata": { "name": "shop", "layoutEngine": "dagre" },
  "architecture": {
    "persons": [
      { "id": "Customer", "label": "Shopper" },
      { "id": "Admin", "metadata": [{ "key": "team", "value": "ops" }] }
    ],
    "systems": [
      {
        "id": "Shop",
        "label": "Web Shop",
        "containers": [
          { "id": "Web", "technology": "TypeScript", "components": [{ "id": "Cart" }, { "id": "Login" }] },
          { "id": "API", "technology": "Rust", "components": [{ "id": "Orders" }] }
        ],
        "datastores": [{ "id": "DB", "technology": "Postgres" }],
        "queues": [{ "id": "Events" }],
        "relations": [
          { "from": "Web", "to": "API", "verb": "calls" },
          { "from": "API.Orders", "to": "DB", "label": "persists" },
          { "from": "API", "to": "Payments", "verb": "charges" },
          { "from": "Events", "to": "Fulfilment.Worker" }
        ]
      },
      {
        "id": "Payments",
        "containers": [{ "id": "Gateway" }],
        "relations": [{ "from": ".", "to": "Shop", "verb": "notifies" }]
      },
      {
        "id": "Fulfilment",
        "containers": [{ "id": "Worker" }],
        "relations": [{ "from": "Worker", "to": "Events", "verb": "consumes" }]
      }
    ],
    "relations": [
      { "from": "Customer", "to": "Web", "verb": "browses" },
      { "from": "Admin", "to": "Orders" },
      { "from": "Customer", "to": "Shop" },
      { "from": "Admin", "to": "Nowhere" }
    ],
    "requirements": [{ "id": "R1", "kind": "performance", "description": "p99 < 200ms" }]
  }
}"#;

#[fixture]
fn shop() -> ArchitectureBody {
    ArchitectureDocument::from_json_str(SHOP).unwrap().architecture
}

type RelationKey = (String, String, Option<String>, Option<String>);

fn resolved_relations(body: &ArchitectureBody) -> BTreeSet<RelationKey> {
    build(body)
        .edges()
        .iter()
        .map(|e| (e.source.clone(), e.target.clone(), e.verb.clone(), e.label.clone()))
        .collect()
}

// `Shop` has a container named like the `Payments` system.
const SHADOWED: &str = r#"{
  "architecture": {
    "systems": [
      { "id": "Shop", "containers": [{ "id": "Web" }, { "id": "Payments" }] },
      { "id": "Payments", "containers": [{ "id": "Gateway" }] }
    ],
    "relations": [
      { "from": "Shop.Web", "to": "Payments", "verb": "charges" },
      { "from": "Shop.Web", "to": "Shop.Payments", "verb": "renders" }
    ]
  }
}"#;

#[rstest]
#[case::shop(SHOP, 9)]
#[case::target_shadowed_by_local_child(SHADOWED, 2)]
fn round_trip_preserves_the_resolved_relation_set(#[case] raw: &str, #[case] expected: usize) {
    let body = ArchitectureDocument::from_json_str(raw).unwrap().architecture;
    let original = resolved_relations(&body);
    assert_eq!(original.len(), expected);

    let round_tripped = serialize(&build(&body)).architecture_body;
    assert_eq!(resolved_relations(&round_tripped), original);
}

#[rstest]
fn round_trip_preserves_elements(shop: ArchitectureBody) {
    let out = serialize(&build(&shop)).architecture_body;

    assert_eq!(out.persons, shop.persons);
    assert_eq!(out.requirements, shop.requirements);
    let ids: Vec<&str> = out.systems.iter().map(|s| s.id.as_str()).collect();
    assert_eq!(ids, vec!["Shop", "Payments", "Fulfilment"]);

    let sys = out.system("Shop").unwrap();
    let original = shop.system("Shop").unwrap();
    assert_eq!(sys.label.as_deref(), Some("Web Shop"));
    assert_eq!(sys.containers, original.containers);
    assert_eq!(sys.datastores, original.datastores);
    assert_eq!(sys.queues, original.queues);
}

#[rstest]
fn second_round_trip_is_stable(shop: ArchitectureBody) {
    let once = serialize(&build(&shop)).architecture_body;
    let twice = serialize(&build(&once)).architecture_body;
    assert_eq!(once, twice);
}

#[rstest]
fn layout_survives_build_and_serialize(shop: ArchitectureBody) {
    let mut doc = ArchitectureDocument::from_json_str(SHOP).unwrap();
    doc.metadata.layout = Some(
        [("Shop.API".to_string(), Rect::new(12.0, 40.0, 160.0, 80.0))]
            .into_iter()
            .collect(),
    );
    let graph = build_with_layout(&shop, doc.metadata.layout.as_ref());
    let saved = serialize(&graph);
    assert_eq!(saved.layout_map.len(), 1);
    assert_eq!(saved.layout_map["Shop.API"], Rect::new(12.0, 40.0, 160.0, 80.0));

    let json = serde_json::to_value(&saved).unwrap();
    assert!(json.get("architectureBody").is_some());
    assert!(json.get("layoutMap").is_some());
}

#[rstest]
fn context_rollup_is_loss_free(shop: ArchitectureBody) {
    let full = build(&shop);
    let top_level: HashSet<&str> = full
        .nodes()
        .iter()
        .filter(|n| matches!(n.node_type, NodeType::Person | NodeType::System))
        .map(|n| n.id.as_str())
        .collect();
    let expected: BTreeSet<(&str, &str)> = full
        .edges()
        .iter()
        .map(|e| (top_level_id(&e.source), top_level_id(&e.target)))
        .filter(|(a, b)| a != b && top_level.contains(a) && top_level.contains(b))
        .collect();

    let context = project(&shop, &Scope::Context);
    let actual: Vec<(&str, &str)> = context
        .edges()
        .iter()
        .map(|e| (e.source.as_str(), e.target.as_str()))
        .collect();
    assert_eq!(actual.len(), expected.len(), "one edge per connected pair");
    assert_eq!(actual.into_iter().collect::<BTreeSet<_>>(), expected);
}

#[rstest]
#[case(Scope::Context, &["Admin", "Customer", "Fulfilment", "Payments", "Shop"])]
#[case(Scope::System("Shop".into()), &["Admin", "Customer", "Fulfilment", "Payments", "Shop.API", "Shop.DB", "Shop.Events", "Shop.Web"])]
#[case(Scope::Container("Shop".into(), "API".into()), &["Admin", "Shop.API.Orders", "Shop.DB"])]
fn projections_have_unique_expected_nodes(
    shop: ArchitectureBody,
    #[case] scope: Scope,
    #[case] expected: &[&str],
) {
    let g = project(&shop, &scope);
    let mut ids: Vec<&str> = g.nodes().iter().map(|n| n.id.as_str()).collect();
    ids.sort();
    let unique: HashSet<&str> = ids.iter().copied().collect();
    assert_eq!(unique.len(), ids.len());
    assert_eq!(ids, expected);
}
