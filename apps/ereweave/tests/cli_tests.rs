//! Integration tests for Ereweave CLI commands.
//!
//! Uses tempfile for testing file-based operations.

// Allow unwrap and panic in tests - these are standard for test code
#![allow(clippy::unwrap_used, clippy::panic)]

use ereweave::cli::{
    SearchOptions, cmd_paths, cmd_search, cmd_snapshot, cmd_status, find_paths, format_path,
    graph_status,
    load_config, load_graph, run_search,
};
use ereweave_core::formats::is_snapshot;
use ereweave_core::{GraphStore, HypothesisCollection, QueryDocument, SearchConfig};
use std::path::PathBuf;
use tempfile::TempDir;

// =============================================================================
// HELPER FUNCTIONS
// =============================================================================

/// Create a temporary directory for tests.
fn create_temp_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp dir")
}

const GRAPH: &str = r#"{
    "theGraph": {
        "E1": {"type": "Entity", "name": "Alice"},
        "E1b": {"type": "Entity", "name": "A."},
        "E2": {"type": "Entity", "name": "Acme"},
        "E3": {"type": "Entity", "name": "Bob"},
        "V1": {"type": "Event"},
        "T1": {"type": "Statement", "subject": "V1", "predicate": "type", "object": "Conflict.Attack"},
        "S1": {"type": "Statement", "subject": "V1", "predicate": "Attacker", "object": "E1b"},
        "S2": {"type": "Statement", "subject": "V1", "predicate": "Target", "object": "E2"},
        "S3": {"type": "Statement", "subject": "V1", "predicate": "Target", "object": "E3"},
        "C1": {"type": "SameAsCluster", "prototype": "E1"},
        "M1": {"type": "ClusterMembership", "cluster": "C1", "clusterMember": "E1b"}
    }
}"#;

const QUERY: &str = r#"{
    "facets": [{
        "name": "attack",
        "queryConstraints": [["?X", "Attacker", "E1"], ["?X", "Target", "?Y"]]
    }]
}"#;

/// Create a sample graph document.
fn create_graph_json(dir: &TempDir) -> PathBuf {
    let path = dir.path().join("graph.json");
    std::fs::write(&path, GRAPH).unwrap();
    path
}

/// Create a sample query document.
fn create_query_json(dir: &TempDir) -> PathBuf {
    let path = dir.path().join("query.json");
    std::fs::write(&path, QUERY).unwrap();
    path
}

// =============================================================================
// SEARCH COMMAND TESTS
// =============================================================================

#[test]
fn test_search_without_coref_reports_failure() {
    let temp = create_temp_dir();
    let graph = create_graph_json(&temp);
    let query = create_query_json(&temp);
    let output = temp.path().join("out.json");

    cmd_search(&graph, &query, Some(&output), &SearchOptions::default()).unwrap();

    // E1 is only reachable through its coreferent mention E1b
    let collection = HypothesisCollection::from_json(&std::fs::read_to_string(&output).unwrap()).unwrap();
    assert!(collection.is_empty());
}

#[test]
fn test_search_with_coref_finds_both_targets() {
    let temp = create_temp_dir();
    let graph = create_graph_json(&temp);
    let query = create_query_json(&temp);
    let output = temp.path().join("out.json");
    let options = SearchOptions {
        coref: true,
        ..SearchOptions::default()
    };

    cmd_search(&graph, &query, Some(&output), &options).unwrap();

    let collection = HypothesisCollection::from_json(&std::fs::read_to_string(&output).unwrap()).unwrap();
    assert_eq!(collection.len(), 2);
    assert_eq!(collection.probs.len(), 2);
    let total: f64 = collection.probs.iter().sum();
    assert!((total - 1.0).abs() < 1e-9);
    for entry in &collection.support {
        assert!(entry.failed_queries.is_empty());
        assert!(entry.query_statements.contains(&"S1".to_string()));
    }
}

#[test]
fn test_run_search_with_canonical_names() {
    let graph = ereweave_core::formats::GraphDocument::from_json(GRAPH)
        .unwrap()
        .to_graph();
    let query = QueryDocument::from_json(QUERY).unwrap();
    let config = SearchConfig::default();

    let collection = run_search(&graph, &query, &config, true, true);
    assert_eq!(collection.len(), 2);
}

#[test]
fn test_search_missing_query_fails() {
    let temp = create_temp_dir();
    let graph = create_graph_json(&temp);
    let missing = temp.path().join("missing.json");

    let result = cmd_search(&graph, &missing, None, &SearchOptions::default());
    assert!(result.is_err());
}

#[test]
fn test_search_rejects_empty_query() {
    let temp = create_temp_dir();
    let graph = create_graph_json(&temp);
    let query = temp.path().join("empty.json");
    std::fs::write(&query, r#"{"facets": []}"#).unwrap();

    let result = cmd_search(&graph, &query, None, &SearchOptions::default());
    assert!(result.is_err());
}

// =============================================================================
// CONFIG TESTS
// =============================================================================

#[test]
fn test_config_file_and_overrides() {
    let temp = create_temp_dir();
    let path = temp.path().join("config.json");
    std::fs::write(&path, r#"{"max_hypotheses": 7, "novelty_top_k": 3}"#).unwrap();

    let options = SearchOptions {
        config: Some(path),
        top_k: Some(9),
        ..SearchOptions::default()
    };
    let config = load_config(&options).unwrap();
    assert_eq!(config.max_hypotheses, 7);
    assert_eq!(config.novelty_top_k, 9);
}

#[test]
fn test_zero_budget_is_rejected() {
    let options = SearchOptions {
        max_hypotheses: Some(0),
        ..SearchOptions::default()
    };
    assert!(load_config(&options).is_err());
}

// =============================================================================
// SNAPSHOT COMMAND TESTS
// =============================================================================

#[test]
fn test_snapshot_round_trip() {
    let temp = create_temp_dir();
    let graph_path = create_graph_json(&temp);
    let snap = temp.path().join("graph.ewg");

    cmd_snapshot(&graph_path, &snap).unwrap();
    assert!(is_snapshot(&std::fs::read(&snap).unwrap()));

    let from_json = load_graph(&graph_path).unwrap();
    let from_snap = load_graph(&snap).unwrap();
    assert_eq!(from_json.node_count(), from_snap.node_count());
    assert_eq!(from_json.triple_count(), from_snap.triple_count());
}

#[test]
fn test_search_accepts_snapshot() {
    let temp = create_temp_dir();
    let graph_path = create_graph_json(&temp);
    let snap = temp.path().join("graph.ewg");
    let query = create_query_json(&temp);
    let output = temp.path().join("out.json");
    cmd_snapshot(&graph_path, &snap).unwrap();

    let options = SearchOptions {
        coref: true,
        ..SearchOptions::default()
    };
    cmd_search(&snap, &query, Some(&output), &options).unwrap();
    let collection = HypothesisCollection::from_json(&std::fs::read_to_string(&output).unwrap()).unwrap();
    assert_eq!(collection.len(), 2);
}

#[test]
fn test_load_invalid_graph_fails() {
    let temp = create_temp_dir();
    let path = temp.path().join("bad.json");
    std::fs::write(&path, "not json").unwrap();
    assert!(load_graph(&path).is_err());
}

// =============================================================================
// PATHS / STATUS COMMAND TESTS
// =============================================================================

#[test]
fn test_paths_command() {
    let temp = create_temp_dir();
    let graph = create_graph_json(&temp);
    assert!(cmd_paths(&graph, "E2", "E3", 5, None).is_ok());
    assert!(cmd_paths(&graph, "E2", "missing", 5, None).is_ok());
    assert!(cmd_paths(&graph, "E2", "E3", 5, Some(&temp.path().join("missing.json"))).is_err());
}

#[test]
fn test_paths_honour_configured_exclusions() {
    let temp = create_temp_dir();
    let graph_path = create_graph_json(&temp);
    let config_path = temp.path().join("config.json");
    std::fs::write(&config_path, r#"{"excluded_roles": ["object"]}"#).unwrap();

    let graph = load_graph(&graph_path).unwrap();
    let default = SearchConfig::default();
    assert_eq!(find_paths(&graph, "E2", "E3", 5, &default).len(), 1);

    let options = SearchOptions {
        config: Some(config_path.clone()),
        ..SearchOptions::default()
    };
    let config = load_config(&options).unwrap();
    assert!(find_paths(&graph, "E2", "E3", 5, &config).is_empty());
    assert!(cmd_paths(&graph_path, "E2", "E3", 5, Some(&config_path)).is_ok());
}

#[test]
fn test_format_path() {
    let graph = load_graph(&create_graph_json(&create_temp_dir())).unwrap();
    let paths = ereweave_core::traversal::paths_between(
        &graph,
        "E2",
        "E3",
        &SearchConfig::default().excluded_roles,
        1,
    );
    assert_eq!(paths.len(), 1);
    assert_eq!(format_path(&paths[0]), "E2 <-object- S2 -subject-> V1 <-subject- S3 -object-> E3");
    assert_eq!(format_path(&[]), "");
}

#[test]
fn test_status_counts() {
    let temp = create_temp_dir();
    let graph_path = create_graph_json(&temp);
    let graph = load_graph(&graph_path).unwrap();

    let status = graph_status(&graph);
    assert_eq!(status["eres"], 5);
    assert_eq!(status["statements"], 4);
    assert_eq!(status["coreferenceClasses"], 1);

    assert!(cmd_status(&graph_path, true).is_ok());
    assert!(cmd_status(&graph_path, false).is_ok());
}
