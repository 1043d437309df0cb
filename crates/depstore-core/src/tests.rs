use serde_json::json;

use super::*;

fn ids(values: &[&str]) -> Vec<PkgId> {
    values.iter().map(|value| value.to_string()).collect()
}

fn link(graph: &mut Graph, referrer: &str, name: &str, target: &str) {
    if !graph.contains(referrer) {
        graph.insert(referrer, Node::default());
    }
    if !graph.contains(target) {
        graph.insert(target, Node::default());
    }
    graph
        .get_mut(referrer)
        .expect("referrer must exist")
        .dependencies
        .insert(name.to_string(), target.to_string());
    graph
        .get_mut(target)
        .expect("target must exist")
        .dependents
        .insert(referrer.to_string());
}

// root -> a -> b
fn chain_graph() -> Graph {
    let mut graph = Graph::new();
    link(&mut graph, ROOT_ID, "a", "a@1.0.0");
    link(&mut graph, "a@1.0.0", "b", "b@1.0.0");
    graph
}

// root -> {a, c}, a -> d, c -> d
fn diamond_graph() -> Graph {
    let mut graph = Graph::new();
    link(&mut graph, ROOT_ID, "a", "a@1.0.0");
    link(&mut graph, ROOT_ID, "c", "c@1.0.0");
    link(&mut graph, "a@1.0.0", "d", "d@1.0.0");
    link(&mut graph, "c@1.0.0", "d", "d@1.0.0");
    graph
}

fn dependents(graph: &Graph, id: &str) -> Vec<String> {
    graph
        .get(id)
        .expect("node must exist")
        .dependents
        .iter()
        .cloned()
        .collect()
}

#[test]
fn is_free_accepts_sole_referrer_or_no_referrer() {
    let mut graph = chain_graph();
    graph.insert("orphan@1.0.0", Node::default());

    assert!(graph.is_free("a@1.0.0", ROOT_ID).expect("a exists"));
    assert!(!graph.is_free("a@1.0.0", "other@1.0.0").expect("a exists"));
    assert!(graph.is_free("orphan@1.0.0", ROOT_ID).expect("orphan exists"));
}

#[test]
fn is_free_rejects_shared_node() {
    let graph = diamond_graph();
    assert!(!graph.is_free("d@1.0.0", "a@1.0.0").expect("d exists"));
}

#[test]
fn is_free_reports_missing_node() {
    let graph = chain_graph();
    let err = graph
        .is_free("ghost@0.0.1", ROOT_ID)
        .expect_err("missing node must be an invariant violation");
    assert_eq!(
        err,
        GraphError::MissingNode {
            id: "ghost@0.0.1".to_string()
        }
    );
}

#[test]
fn detach_edge_leaves_no_empty_dependents_field() {
    let mut graph = chain_graph();
    graph
        .detach_edge("a@1.0.0", "b@1.0.0")
        .expect("b exists");

    let rendered = graph.to_json_string().expect("must render");
    let value: serde_json::Value = serde_json::from_str(&rendered).expect("must be json");
    assert_eq!(value["b@1.0.0"], json!({}));
}

#[test]
fn remove_node_reports_missing_node() {
    let mut graph = chain_graph();
    let err = graph
        .remove_node("ghost@0.0.1")
        .expect_err("missing node must fail");
    assert!(err.to_string().contains("ghost@0.0.1"));
}

#[test]
fn cascade_removes_transitive_dependencies() {
    let mut graph = chain_graph();

    let removed = cascade(&mut graph, &ids(&["a@1.0.0"]), ROOT_ID).expect("must cascade");
    assert_eq!(removed, ids(&["a@1.0.0", "b@1.0.0"]));

    let stripped = graph.remove_root_dependencies(&["a"]);
    assert_eq!(stripped, vec!["a"]);
    assert_eq!(graph.len(), 1);
    let rendered = graph.to_json_string().expect("must render");
    assert_eq!(
        serde_json::from_str::<serde_json::Value>(&rendered).expect("must be json"),
        json!({ "/": {} })
    );
}

#[test]
fn cascade_keeps_dependency_still_referenced_by_root() {
    let mut graph = chain_graph();
    link(&mut graph, ROOT_ID, "b", "b@1.0.0");

    let removed = cascade(&mut graph, &ids(&["a@1.0.0"]), ROOT_ID).expect("must cascade");
    assert_eq!(removed, ids(&["a@1.0.0"]));
    assert_eq!(dependents(&graph, "b@1.0.0"), vec![ROOT_ID]);
    graph.remove_root_dependencies(&["a"]);
    graph.validate().expect("graph must stay consistent");
}

#[test]
fn cascade_retains_diamond_dependency() {
    let mut graph = diamond_graph();

    let removed = cascade(&mut graph, &ids(&["a@1.0.0"]), ROOT_ID).expect("must cascade");
    assert_eq!(removed, ids(&["a@1.0.0"]));
    assert_eq!(dependents(&graph, "d@1.0.0"), vec!["c@1.0.0"]);
}

#[test]
fn cascade_frees_diamond_once_every_referrer_is_gone() {
    let mut graph = diamond_graph();

    let removed = cascade(&mut graph, &ids(&["a@1.0.0", "c@1.0.0"]), ROOT_ID)
        .expect("must cascade");
    assert_eq!(removed, ids(&["a@1.0.0", "c@1.0.0", "d@1.0.0"]));
    graph.remove_root_dependencies(&["a", "c"]);
    assert!(graph.unreferenced_ids().is_empty());
    graph.validate().expect("graph must stay consistent");
}

#[test]
fn cascade_with_no_candidates_is_a_no_op() {
    let mut graph = diamond_graph();
    let before = graph.clone();

    let removed = cascade(&mut graph, &[], ROOT_ID).expect("must cascade");
    assert!(removed.is_empty());
    assert_eq!(graph, before);
}

#[test]
fn cascade_deduplicates_candidates() {
    let mut graph = chain_graph();

    let removed = cascade(&mut graph, &ids(&["a@1.0.0", "a@1.0.0"]), ROOT_ID)
        .expect("duplicate candidate must not fail");
    assert_eq!(removed, ids(&["a@1.0.0", "b@1.0.0"]));
}

#[test]
fn cascade_handles_aliased_dependency_edges() {
    let mut graph = Graph::new();
    link(&mut graph, ROOT_ID, "a", "a@1.0.0");
    link(&mut graph, "a@1.0.0", "b", "b@1.0.0");
    link(&mut graph, "a@1.0.0", "b-alias", "b@1.0.0");

    let removed = cascade(&mut graph, &ids(&["a@1.0.0"]), ROOT_ID).expect("must cascade");
    assert_eq!(removed, ids(&["a@1.0.0", "b@1.0.0"]));
}

#[test]
fn cascade_tolerates_cycles_in_persisted_graph() {
    let mut graph = Graph::new();
    link(&mut graph, ROOT_ID, "a", "a@1.0.0");
    link(&mut graph, "a@1.0.0", "b", "b@1.0.0");
    link(&mut graph, "b@1.0.0", "c", "c@1.0.0");
    link(&mut graph, "c@1.0.0", "b", "b@1.0.0");

    // b is held by both a and c, so the cycle keeps it alive.
    let removed = cascade(&mut graph, &ids(&["a@1.0.0"]), ROOT_ID).expect("must cascade");
    assert_eq!(removed, ids(&["a@1.0.0"]));
    assert_eq!(dependents(&graph, "b@1.0.0"), vec!["c@1.0.0"]);
}

#[test]
fn cascade_skips_back_edge_to_already_removed_node() {
    let mut graph = Graph::new();
    link(&mut graph, ROOT_ID, "a", "a@1.0.0");
    link(&mut graph, "a@1.0.0", "b", "b@1.0.0");
    // b points back at a, but a does not list b as a dependent.
    graph
        .get_mut("b@1.0.0")
        .expect("b exists")
        .dependencies
        .insert("a".to_string(), "a@1.0.0".to_string());

    let removed = cascade(&mut graph, &ids(&["a@1.0.0"]), ROOT_ID).expect("must cascade");
    assert_eq!(removed, ids(&["a@1.0.0", "b@1.0.0"]));
}

#[test]
fn cascade_fails_on_dangling_dependency() {
    let mut graph = chain_graph();
    graph
        .get_mut("a@1.0.0")
        .expect("a exists")
        .dependencies
        .insert("ghost".to_string(), "ghost@0.0.1".to_string());

    let err = cascade(&mut graph, &ids(&["a@1.0.0"]), ROOT_ID)
        .expect_err("dangling edge must be fatal");
    assert_eq!(
        err,
        GraphError::MissingNode {
            id: "ghost@0.0.1".to_string()
        }
    );
}

#[test]
fn cascade_terminates_within_removed_count_passes() {
    let mut graph = Graph::new();
    link(&mut graph, ROOT_ID, "a", "a@1.0.0");
    link(&mut graph, ROOT_ID, "b", "b@1.0.0");
    link(&mut graph, ROOT_ID, "keep", "keep@1.0.0");
    for (parent, child) in [
        ("a@1.0.0", "x@1.0.0"),
        ("x@1.0.0", "y@1.0.0"),
        ("b@1.0.0", "y@1.0.0"),
        ("keep@1.0.0", "z@1.0.0"),
    ] {
        let name = child.split('@').next().expect("name prefix");
        link(&mut graph, parent, name, child);
    }

    let outcome = cascade_with_stats(&mut graph, &ids(&["a@1.0.0", "b@1.0.0"]), ROOT_ID)
        .expect("must cascade");
    assert_eq!(outcome.removed.len(), 4);
    assert!(outcome.passes <= outcome.removed.len());
    assert!(graph.contains("keep@1.0.0"));
    assert!(graph.contains("z@1.0.0"));
}

#[test]
fn remove_root_dependencies_only_touches_named_entries() {
    let mut graph = Graph::new();
    link(&mut graph, ROOT_ID, "a", "a@1.0.0");
    link(&mut graph, ROOT_ID, "b", "b@1.0.0");
    link(&mut graph, ROOT_ID, "c", "c@1.0.0");

    let stripped = graph.remove_root_dependencies(&["a", "c", "missing"]);
    assert_eq!(stripped, vec!["a", "c"]);
    let root = graph.root().expect("root exists");
    assert_eq!(root.dependencies.len(), 1);
    assert_eq!(root.dependencies.get("b").map(String::as_str), Some("b@1.0.0"));
}

#[test]
fn remove_root_dependencies_without_root_entry_is_empty() {
    let mut graph = Graph::new();
    assert!(graph.remove_root_dependencies(&["a"]).is_empty());
    assert!(graph.is_empty());
}

#[test]
fn remove_root_dependencies_detaches_root_from_surviving_targets() {
    // root -> {a, x}, x -> a
    let mut graph = Graph::new();
    link(&mut graph, ROOT_ID, "a", "a@1.0.0");
    link(&mut graph, ROOT_ID, "x", "x@1.0.0");
    link(&mut graph, "x@1.0.0", "a", "a@1.0.0");

    let removed = cascade(&mut graph, &ids(&["a@1.0.0"]), ROOT_ID).expect("must cascade");
    assert!(removed.is_empty());
    graph.remove_root_dependencies(&["a"]);
    assert_eq!(dependents(&graph, "a@1.0.0"), vec!["x@1.0.0"]);
    graph.validate().expect("graph must stay consistent");

    let removed = cascade(&mut graph, &ids(&["x@1.0.0"]), ROOT_ID).expect("must cascade");
    assert_eq!(removed, ids(&["x@1.0.0", "a@1.0.0"]));
}

#[test]
fn remove_root_dependencies_keeps_back_edge_for_remaining_alias() {
    let mut graph = Graph::new();
    link(&mut graph, ROOT_ID, "p", "p@1.0.0");
    link(&mut graph, ROOT_ID, "p-alias", "p@1.0.0");

    graph.remove_root_dependencies(&["p"]);
    assert_eq!(dependents(&graph, "p@1.0.0"), vec![ROOT_ID]);
    graph.validate().expect("graph must stay consistent");
}

#[test]
fn validate_reports_dependent_without_edge() {
    let mut graph = chain_graph();
    graph
        .get_mut("b@1.0.0")
        .expect("b exists")
        .dependents
        .insert("ghost@1.0.0".to_string());
    assert_eq!(
        graph.validate(),
        Err(GraphError::StaleDependent {
            dependent: "ghost@1.0.0".to_string(),
            target: "b@1.0.0".to_string(),
        })
    );
}

#[test]
fn graph_parses_persisted_shape_without_empty_fields() {
    let raw = r#"{
  "/": { "dependencies": { "a": "a@1.0.0" } },
  "a@1.0.0": { "dependents": ["/"] }
}"#;
    let graph = Graph::from_json_str(raw).expect("must parse");
    assert!(graph.get("a@1.0.0").expect("a").dependencies.is_empty());
    graph.validate().expect("must be consistent");
}

#[test]
fn normalize_root_key_moves_legacy_project_path_entry() {
    let legacy = "/home/user/project";
    let mut graph = Graph::new();
    graph.insert(legacy, Node::with_dependencies([("a", "a@1.0.0")]));
    graph.insert(ROOT_ID, Node::with_dependencies([("a", "a@0.9.0"), ("b", "b@1.0.0")]));
    link(&mut graph, legacy, "a", "a@1.0.0");
    link(&mut graph, ROOT_ID, "b", "b@1.0.0");

    assert!(graph.normalize_root_key(legacy));
    assert!(!graph.contains(legacy));
    let root = graph.root().expect("root exists");
    assert_eq!(root.dependencies.get("a").map(String::as_str), Some("a@1.0.0"));
    assert_eq!(root.dependencies.get("b").map(String::as_str), Some("b@1.0.0"));
    assert_eq!(dependents(&graph, "a@1.0.0"), vec![ROOT_ID]);
    assert!(!graph.normalize_root_key(legacy));
}

#[test]
fn validate_reports_missing_back_edge() {
    let mut graph = chain_graph();
    graph
        .get_mut("b@1.0.0")
        .expect("b exists")
        .dependents
        .clear();
    assert_eq!(
        graph.validate(),
        Err(GraphError::MissingBackEdge {
            referrer: "a@1.0.0".to_string(),
            target: "b@1.0.0".to_string(),
        })
    );
}

#[test]
fn validate_rejects_root_with_dependents() {
    let mut graph = chain_graph();
    link(&mut graph, "a@1.0.0", "root", ROOT_ID);
    assert_eq!(graph.validate(), Err(GraphError::RootHasDependents));
}

#[test]
fn save_type_follows_flag_precedence() {
    assert_eq!(SaveType::from_flags(false, false, false), None);
    assert_eq!(SaveType::from_flags(true, false, false), Some(SaveType::Prod));
    assert_eq!(SaveType::from_flags(true, false, true), Some(SaveType::Optional));
    assert_eq!(SaveType::from_flags(true, true, true), Some(SaveType::Dev));
    assert_eq!(SaveType::Dev.field_name(), "devDependencies");
}

#[test]
fn parse_manifest_bin_shapes() {
    let single = ProjectManifest::from_json_str(r#"{"name":"@scope/tool","bin":"cli.js"}"#)
        .expect("single bin must parse");
    assert_eq!(single.bin, Some(BinField::Single("cli.js".to_string())));

    let named = ProjectManifest::from_json_str(
        r#"{"name":"tool","bin":{"tool":"bin/tool.js","tool-dev":"bin/dev.js"}}"#,
    )
    .expect("named bins must parse");
    let Some(BinField::Named(entries)) = named.bin else {
        panic!("expected named bins");
    };
    assert_eq!(entries.len(), 2);

    let dir = ProjectManifest::from_json_str(r#"{"name":"tool","directories":{"bin":"./bin"}}"#)
        .expect("directories.bin must parse");
    assert_eq!(
        dir.directories.and_then(|directories| directories.bin),
        Some("./bin".to_string())
    );
}

#[test]
fn manifest_keeps_unknown_fields() {
    let manifest = ProjectManifest::from_json_str(
        r#"{"name":"app","scripts":{"test":"node test.js"},"dependencies":{"a":"^1.0.0"}}"#,
    )
    .expect("must parse");
    assert!(manifest.extra.contains_key("scripts"));
    assert!(manifest.is_dependent_on("a"));
    assert!(!manifest.is_dependent_on("scripts"));
}

#[test]
fn remove_dependency_names_drops_empty_field_and_keeps_key_order() {
    let mut document = json!({
        "name": "app",
        "dependencies": { "a": "^1.0.0" },
        "devDependencies": { "b": "^2.0.0", "c": "^3.0.0" },
        "license": "MIT"
    });

    let removed = remove_dependency_names(&mut document, &["a", "b"], SaveType::Prod)
        .expect("must edit");
    assert_eq!(removed, vec!["a"]);

    let keys = document
        .as_object()
        .expect("object")
        .keys()
        .cloned()
        .collect::<Vec<_>>();
    assert_eq!(keys, vec!["name", "devDependencies", "license"]);
    assert_eq!(document["devDependencies"], json!({ "b": "^2.0.0", "c": "^3.0.0" }));
}

#[test]
fn remove_dependency_names_rejects_non_object_manifest() {
    let mut document = json!(["not", "a", "manifest"]);
    let err = remove_dependency_names(&mut document, &["a"], SaveType::Dev)
        .expect_err("array manifest must fail");
    assert!(err.to_string().contains("must be a JSON object"));
}

#[test]
fn lockfile_prune_is_shallow() {
    let manifest = ProjectManifest::from_json_str(
        r#"{"dependencies":{"a":"^1.0.0"},"devDependencies":{"t":"^1.0.0"}}"#,
    )
    .expect("must parse");
    let mut lockfile = Lockfile::from_json_str(
        r#"{"version":1,"dependencies":{"a":"a@1.0.0","b":"b@1.0.0","t":"t@1.0.0"},"registry":"https://registry.test/"}"#,
    )
    .expect("must parse");

    // b may still be needed by a, but only direct declarations count.
    let dropped = lockfile.prune_undeclared(&manifest);
    assert_eq!(dropped, vec!["b"]);
    assert_eq!(
        lockfile.dependencies.keys().cloned().collect::<Vec<_>>(),
        vec!["a", "t"]
    );
    assert!(lockfile.extra.contains_key("registry"));
}

#[test]
fn lockfile_rejects_unknown_version() {
    let err = Lockfile::from_json_str(r#"{"version":7}"#).expect_err("must reject");
    assert!(err.to_string().contains("unsupported lockfile version 7"));
}
