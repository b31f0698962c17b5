//! End-to-end tests for the incremental graph service.

use std::collections::HashSet;
use std::sync::Arc;
use trailgraph_core::prelude::*;
use trailgraph_engine::prelude::*;
use trailgraph_oracle::{MockOracle, ProposedRelationship};

fn proposal(source: &str, target: &str, ty: &str, weight: f64) -> ProposedRelationship {
    ProposedRelationship {
        source_id: source.to_string(),
        target_id: target.to_string(),
        relationship_type: ty.to_string(),
        weight,
        explanation: "test".to_string(),
    }
}

fn service_with(
    oracle: MockOracle,
) -> (
    GraphService<MemoryGraphStore, Arc<MockOracle>, Arc<MemorySourceRepository>>,
    Arc<MockOracle>,
    Arc<MemorySourceRepository>,
) {
    let oracle = Arc::new(oracle);
    let repo = Arc::new(MemorySourceRepository::new());
    let service = GraphService::new(
        MemoryGraphStore::new(),
        Arc::clone(&oracle),
        Arc::clone(&repo),
    )
    .expect("fresh store");
    (service, oracle, repo)
}

fn seed_cluster(repo: &MemorySourceRepository, topic_id: i64, label: &str, items: &[(i64, &str)]) {
    repo.insert_topic(TopicRecord::new(topic_id, label));
    for &(id, item_label) in items {
        repo.insert_item(ItemRecord::new(id, topic_id, item_label));
    }
}

fn assert_no_orphan_edges(snapshot: &GraphSnapshot) {
    let ids: HashSet<&NodeId> = snapshot.nodes.iter().map(|n| &n.id).collect();
    for edge in &snapshot.edges {
        assert!(ids.contains(&edge.source), "orphan source {}", edge.source);
        assert!(ids.contains(&edge.target), "orphan target {}", edge.target);
    }
}

fn contains_edges(snapshot: &GraphSnapshot) -> Vec<&GraphEdge> {
    snapshot
        .edges
        .iter()
        .filter(|e| e.relationship == RelationshipType::Contains)
        .collect()
}

fn cross_edges(snapshot: &GraphSnapshot) -> Vec<&GraphEdge> {
    snapshot
        .edges
        .iter()
        .filter(|e| e.relationship != RelationshipType::Contains)
        .collect()
}

#[tokio::test]
async fn incremental_lifecycle_scenario() {
    // Oracle relates the item of cluster B to the first item of cluster A.
    let (service, oracle, repo) = service_with(
        MockOracle::new().with_proposals(vec![proposal("item_3", "item_1", "conceptual", 2.0)]),
    );

    // Cluster A alone: existing set is empty, so no oracle call at all.
    seed_cluster(&repo, 1, "Rust", &[(1, "Ownership"), (2, "Lifetimes")]);
    let outcome = service.on_topic_created(1).await.unwrap();
    assert_eq!(outcome.nodes_added, 3);
    assert_eq!(outcome.contains_edges_added, 2);
    assert_eq!(outcome.cross_edges_added, 0);
    assert!(!outcome.is_partial());
    assert!(oracle.requests().is_empty());

    let snapshot = service.graph(false).await.unwrap();
    assert_eq!(snapshot.nodes.len(), 3);
    assert_eq!(contains_edges(&snapshot).len(), 2);
    assert!(cross_edges(&snapshot).is_empty());

    // Cluster B: analyzed only against A's items.
    seed_cluster(&repo, 2, "Databases", &[(3, "SQL Joins")]);
    let outcome = service.on_topic_created(2).await.unwrap();
    assert_eq!(outcome.cross_edges_added, 1);

    let requests = oracle.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].new_ids, vec!["item_3"]);
    let existing: HashSet<&str> = requests[0].existing_ids.iter().map(|s| s.as_str()).collect();
    assert_eq!(existing, HashSet::from(["item_1", "item_2"]));

    let snapshot = service.graph(false).await.unwrap();
    assert_eq!(snapshot.nodes.len(), 5);
    assert_eq!(contains_edges(&snapshot).len(), 3);
    assert_eq!(cross_edges(&snapshot).len(), 1);
    assert_no_orphan_edges(&snapshot);

    // Deleting A removes exactly A's nodes and every edge touching them.
    repo.remove_topic(1);
    let removed = service.on_topic_deleted(1).await.unwrap();
    assert_eq!(removed, 3);

    let snapshot = service.graph(false).await.unwrap();
    assert_eq!(snapshot.nodes.len(), 2);
    assert_eq!(contains_edges(&snapshot).len(), 1);
    assert!(cross_edges(&snapshot).is_empty());
    assert_no_orphan_edges(&snapshot);
    // No further oracle calls for the deletion.
    assert_eq!(oracle.requests().len(), 1);
}

#[tokio::test]
async fn oracle_failure_is_partial_success() {
    let (service, _oracle, repo) = service_with(MockOracle::new().failing("unreachable"));

    seed_cluster(&repo, 1, "Rust", &[(1, "Ownership")]);
    service.on_topic_created(1).await.unwrap();

    seed_cluster(&repo, 2, "Databases", &[(2, "Indexes")]);
    let outcome = service.on_topic_created(2).await.unwrap();

    // Structure is authoritative; relationships were skipped, not fatal.
    assert!(outcome.is_partial());
    assert_eq!(outcome.nodes_added, 2);
    assert_eq!(outcome.cross_edges_added, 0);

    let snapshot = service.graph(false).await.unwrap();
    assert_eq!(snapshot.nodes.len(), 4);
    assert_eq!(contains_edges(&snapshot).len(), 2);
    assert!(cross_edges(&snapshot).is_empty());
}

#[tokio::test]
async fn weight_filter_applies_at_the_boundary() {
    let (service, _oracle, repo) = service_with(MockOracle::new().with_proposals(vec![
        proposal("item_2", "item_1", "prerequisite", 1.4999),
        proposal("item_3", "item_1", "complementary", 1.5),
    ]));

    seed_cluster(&repo, 1, "Rust", &[(1, "Ownership")]);
    service.on_topic_created(1).await.unwrap();

    seed_cluster(&repo, 2, "Databases", &[(2, "Indexes"), (3, "SQL Joins")]);
    let outcome = service.on_topic_created(2).await.unwrap();

    assert_eq!(outcome.cross_edges_added, 1);
    assert_eq!(outcome.filtered_below_threshold, 1);

    let snapshot = service.graph(false).await.unwrap();
    let cross = cross_edges(&snapshot);
    assert_eq!(cross.len(), 1);
    assert!(cross[0].weight >= MIN_RELATIONSHIP_WEIGHT);
}

#[tokio::test]
async fn same_side_proposals_never_become_edges() {
    // Both proposals violate the boundary: two new, two existing.
    let (service, _oracle, repo) = service_with(MockOracle::new().with_proposals(vec![
        proposal("item_3", "item_4", "conceptual", 2.0),
        proposal("item_1", "item_2", "conceptual", 2.0),
    ]));

    seed_cluster(&repo, 1, "Rust", &[(1, "Ownership"), (2, "Lifetimes")]);
    service.on_topic_created(1).await.unwrap();

    seed_cluster(&repo, 2, "Databases", &[(3, "Indexes"), (4, "SQL Joins")]);
    let outcome = service.on_topic_created(2).await.unwrap();

    assert_eq!(outcome.cross_edges_added, 0);
    assert_eq!(outcome.invalid_dropped, 2);
    assert!(cross_edges(&service.graph(false).await.unwrap()).is_empty());
}

#[tokio::test]
async fn creating_unknown_topic_is_not_found() {
    let (service, oracle, _repo) = service_with(MockOracle::new());

    let err = service.on_topic_created(99).await.unwrap_err();
    assert!(matches!(err, GraphError::NotFound(_)));

    // Nothing mutated, nothing analyzed.
    assert!(service.graph(false).await.unwrap().is_empty());
    assert!(oracle.requests().is_empty());
}

#[tokio::test]
async fn deleting_unknown_owner_is_not_found() {
    let (service, _oracle, repo) = service_with(MockOracle::new());
    seed_cluster(&repo, 1, "Rust", &[(1, "Ownership")]);
    service.on_topic_created(1).await.unwrap();

    let err = service.on_topic_deleted(42).await.unwrap_err();
    assert!(matches!(err, GraphError::NotFound(_)));
    assert_eq!(service.graph(false).await.unwrap().nodes.len(), 2);
}

#[tokio::test]
async fn duplicate_creation_is_a_conflict() {
    let (service, _oracle, repo) = service_with(MockOracle::new());
    seed_cluster(&repo, 1, "Rust", &[(1, "Ownership")]);

    service.on_topic_created(1).await.unwrap();
    let err = service.on_topic_created(1).await.unwrap_err();
    assert!(matches!(err, GraphError::Conflict(_)));

    // The failed batch left nothing behind.
    assert_eq!(service.graph(false).await.unwrap().nodes.len(), 2);
}

#[tokio::test]
async fn groups_are_monotonic_and_never_reused() {
    let (service, _oracle, repo) = service_with(MockOracle::new());

    seed_cluster(&repo, 1, "Rust", &[(1, "Ownership")]);
    service.on_topic_created(1).await.unwrap();

    repo.remove_topic(1);
    service.on_topic_deleted(1).await.unwrap();

    seed_cluster(&repo, 2, "Databases", &[(2, "Indexes")]);
    service.on_topic_created(2).await.unwrap();

    let snapshot = service.graph(false).await.unwrap();
    // Cluster 1 had group 0; its group is not recycled.
    assert!(snapshot.nodes.iter().all(|n| n.group == 1));
}

#[tokio::test]
async fn rebuild_restores_invariants_and_reassigns_groups() {
    let (service, oracle, repo) = service_with(MockOracle::new());

    seed_cluster(&repo, 1, "Rust", &[(1, "Ownership"), (2, "Lifetimes")]);
    seed_cluster(&repo, 2, "Databases", &[(3, "Indexes")]);
    service.on_topic_created(1).await.unwrap();
    service.on_topic_created(2).await.unwrap();

    repo.remove_topic(1);
    service.on_topic_deleted(1).await.unwrap();

    seed_cluster(&repo, 3, "Statistics", &[(4, "Regression")]);
    service.on_topic_created(3).await.unwrap();

    let outcome = service.graph(true).await.unwrap();
    assert_no_orphan_edges(&outcome);

    // Two topics remain; groups reassigned densely from zero.
    let groups: HashSet<u32> = outcome.nodes.iter().map(|n| n.group).collect();
    assert_eq!(groups, HashSet::from([0, 1]));

    // Exactly one contains edge per item node.
    for node in outcome.nodes.iter().filter(|n| n.kind == NodeKind::Item) {
        let count = outcome
            .edges
            .iter()
            .filter(|e| e.relationship == RelationshipType::Contains && e.target == node.id)
            .count();
        assert_eq!(count, 1, "item {} must have one contains edge", node.id);
    }

    // Rebuild analyzed all items in a single all-pairs request.
    let last = oracle.requests().pop().unwrap();
    assert_eq!(last.new_ids.len(), 2);
    assert!(last.existing_ids.is_empty());
}

#[tokio::test]
async fn cluster_with_no_items_is_just_a_topic_node() {
    let (service, oracle, repo) = service_with(MockOracle::new());
    repo.insert_topic(TopicRecord::new(1, "Empty"));

    let outcome = service.on_topic_created(1).await.unwrap();
    assert_eq!(outcome.nodes_added, 1);
    assert_eq!(outcome.contains_edges_added, 0);
    assert!(oracle.requests().is_empty());
}
