//! The incremental graph builder.
//!
//! Orchestrates node/edge lifecycle against a [`GraphStore`] and limits
//! relationship analysis to the changed subset of the graph: a new
//! cluster is analyzed only against the items that were already there,
//! so oracle cost is O(new × existing) instead of O(total²). The only
//! all-pairs path is the explicit rebuild, intended for recovery and
//! bootstrap.
//!
//! Concurrency model: one graph mutation in flight at a time (a
//! `tokio::sync::Mutex` held across the oracle call), while reads of the
//! committed graph proceed concurrently through an `RwLock` and observe
//! either the pre- or post-mutation snapshot, never a torn batch.

use std::collections::{HashMap, HashSet};
use std::sync::RwLock;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use trailgraph_core::error::{GraphError, Result};
use trailgraph_core::store::GraphStore;
use trailgraph_core::types::{
    GraphEdge, GraphNode, GraphSnapshot, ItemRecord, NodeId, NodeKind, RelationshipType,
    TopicRecord, MAX_RELATIONSHIP_WEIGHT, MIN_RELATIONSHIP_WEIGHT, WEIGHT_FLOOR,
};
use trailgraph_oracle::{Candidate, ProposedRelationship, RelationshipOracle};

use crate::source::SourceRepository;

/// What a single mutation did to the graph.
///
/// Structural counts are authoritative; cross-boundary relationship
/// edges are best-effort. When `oracle_skipped` is set the operation
/// succeeded structurally but no relationships were added — a later
/// rebuild can backfill them.
#[derive(Debug, Clone, Default)]
pub struct MutationOutcome {
    /// Nodes committed (topic and item nodes).
    pub nodes_added: usize,
    /// Containment edges committed with the node batch.
    pub contains_edges_added: usize,
    /// Oracle-proposed edges that passed validation and the weight filter.
    pub cross_edges_added: usize,
    /// Proposals discarded for weight below the minimum.
    pub filtered_below_threshold: usize,
    /// Proposals dropped for violating the contract (bad id, bad type,
    /// same owner, wrong side of the boundary, out-of-range weight).
    pub invalid_dropped: usize,
    /// Why relationship analysis was skipped, if it was.
    pub oracle_skipped: Option<String>,
}

impl MutationOutcome {
    /// True when structure was committed but relationships were not.
    pub fn is_partial(&self) -> bool {
        self.oracle_skipped.is_some()
    }
}

/// How proposals are matched against the submitted candidate sets.
pub(crate) enum AdmissionMode<'a> {
    /// Exactly one endpoint from each list.
    CrossBoundary {
        new: &'a HashMap<String, i64>,
        existing: &'a HashMap<String, i64>,
    },
    /// Both endpoints anywhere in the candidate set, different owners.
    AllPairs { candidates: &'a HashMap<String, i64> },
}

#[derive(Debug, Default)]
pub(crate) struct Admitted {
    pub edges: Vec<GraphEdge>,
    pub below_threshold: usize,
    pub invalid: usize,
}

/// Validate oracle proposals against a fixed schema before they reach
/// the typed edge model. Violations drop the single relationship, never
/// the batch.
pub(crate) fn admit_proposals(
    proposals: Vec<ProposedRelationship>,
    mode: &AdmissionMode<'_>,
) -> Admitted {
    let mut admitted = Admitted::default();
    let mut seen: HashSet<(String, String)> = HashSet::new();

    for proposal in proposals {
        let relationship = match RelationshipType::parse(&proposal.relationship_type) {
            Some(RelationshipType::Contains) | None => {
                warn!(
                    relationship_type = %proposal.relationship_type,
                    "dropping proposal with relationship type outside the taxonomy"
                );
                admitted.invalid += 1;
                continue;
            }
            Some(ty) => ty,
        };

        let owners = match mode {
            AdmissionMode::CrossBoundary { new, existing } => {
                match (
                    new.get(&proposal.source_id),
                    existing.get(&proposal.target_id),
                    existing.get(&proposal.source_id),
                    new.get(&proposal.target_id),
                ) {
                    (Some(&s), Some(&t), _, _) => Some((s, t)),
                    (_, _, Some(&s), Some(&t)) => Some((s, t)),
                    _ => None,
                }
            }
            AdmissionMode::AllPairs { candidates } => {
                match (
                    candidates.get(&proposal.source_id),
                    candidates.get(&proposal.target_id),
                ) {
                    (Some(&s), Some(&t)) => Some((s, t)),
                    _ => None,
                }
            }
        };

        let (source_owner, target_owner) = match owners {
            Some(pair) => pair,
            None => {
                warn!(
                    source = %proposal.source_id,
                    target = %proposal.target_id,
                    "dropping proposal with endpoints outside the submitted candidate sets"
                );
                admitted.invalid += 1;
                continue;
            }
        };

        if source_owner == target_owner {
            warn!(
                source = %proposal.source_id,
                target = %proposal.target_id,
                "dropping proposal relating two nodes of the same cluster"
            );
            admitted.invalid += 1;
            continue;
        }

        if !proposal.weight.is_finite()
            || proposal.weight < WEIGHT_FLOOR
            || proposal.weight > MAX_RELATIONSHIP_WEIGHT
        {
            warn!(weight = proposal.weight, "dropping proposal with out-of-range weight");
            admitted.invalid += 1;
            continue;
        }

        if proposal.weight < MIN_RELATIONSHIP_WEIGHT {
            debug!(
                source = %proposal.source_id,
                target = %proposal.target_id,
                weight = proposal.weight,
                "filtered weak relationship"
            );
            admitted.below_threshold += 1;
            continue;
        }

        if !seen.insert((proposal.source_id.clone(), proposal.target_id.clone())) {
            admitted.invalid += 1;
            continue;
        }

        admitted.edges.push(GraphEdge::new(
            NodeId::from(proposal.source_id),
            NodeId::from(proposal.target_id),
            proposal.weight,
            relationship,
        ));
    }

    admitted
}

/// Build the node batch for one topic cluster: the topic node, one item
/// node per item, and one containment edge per item node.
pub(crate) fn assemble_cluster(
    topic: &TopicRecord,
    items: &[ItemRecord],
    group: u32,
) -> (Vec<GraphNode>, Vec<GraphEdge>) {
    let mut nodes = Vec::with_capacity(items.len() + 1);
    let mut edges = Vec::with_capacity(items.len());

    nodes.push(GraphNode::topic(topic.id, topic.label.clone(), group));
    for item in items {
        nodes.push(GraphNode::item(item.id, topic.id, item.label.clone(), group));
        edges.push(GraphEdge::contains(NodeId::topic(topic.id), NodeId::item(item.id)));
    }

    (nodes, edges)
}

pub(crate) fn candidate_map(candidates: &[Candidate]) -> HashMap<String, i64> {
    candidates
        .iter()
        .map(|c| (c.id.clone(), c.owner_id))
        .collect()
}

/// The incremental graph service.
///
/// Owns the store, the oracle, and the source-record boundary; exposes
/// the three operations of the query surface: `graph`, `on_topic_created`,
/// `on_topic_deleted`.
pub struct GraphService<S, O, R> {
    store: RwLock<S>,
    oracle: O,
    sources: R,
    /// Serializes mutations and guards the monotonic group counter.
    /// Groups are never reused after deletion within a process lifetime.
    mutation: Mutex<u32>,
}

impl<S, O, R> GraphService<S, O, R>
where
    S: GraphStore,
    O: RelationshipOracle,
    R: SourceRepository,
{
    /// Create a service over an existing store, seeding the group
    /// counter past anything already persisted.
    pub fn new(store: S, oracle: O, sources: R) -> Result<Self> {
        let next_group = store.max_group()?.map(|g| g + 1).unwrap_or(0);
        Ok(Self {
            store: RwLock::new(store),
            oracle,
            sources,
            mutation: Mutex::new(next_group),
        })
    }

    /// The committed graph. With `force_refresh`, clears and rebuilds
    /// the whole graph first (the O(total²) recovery path).
    pub async fn graph(&self, force_refresh: bool) -> Result<GraphSnapshot> {
        if force_refresh {
            info!("force refresh requested, rebuilding entire graph");
            self.rebuild().await?;
        }
        self.store.read().unwrap().snapshot()
    }

    /// React to a topic cluster being created in the source records.
    ///
    /// Commits the cluster's nodes and containment edges atomically,
    /// then asks the oracle to relate the new items to the items of
    /// every *other* cluster. Oracle failure never rolls the structure
    /// back; the outcome is reported as partial instead.
    pub async fn on_topic_created(&self, topic_id: i64) -> Result<MutationOutcome> {
        let topic = self
            .sources
            .topic(topic_id)
            .await?
            .ok_or_else(|| GraphError::topic_not_found(topic_id))?;
        let items = self.sources.items_for(topic_id).await?;

        let mut next_group = self.mutation.lock().await;
        let group = *next_group;

        let (nodes, contains_edges) = assemble_cluster(&topic, &items, group);

        // Snapshot the analysis boundary before committing: item nodes
        // of every other owner.
        let existing: Vec<Candidate> = {
            let store = self.store.read().unwrap();
            store
                .nodes()?
                .iter()
                .filter(|n| n.kind == NodeKind::Item && n.owner_id != topic_id)
                .map(Candidate::from)
                .collect()
        };

        self.store
            .write()
            .unwrap()
            .add_batch(&nodes, &contains_edges)?;
        *next_group = group + 1;

        info!(
            topic_id,
            nodes = nodes.len(),
            contains_edges = contains_edges.len(),
            group,
            "cluster committed to graph"
        );

        let mut outcome = MutationOutcome {
            nodes_added: nodes.len(),
            contains_edges_added: contains_edges.len(),
            ..Default::default()
        };

        let new: Vec<Candidate> = nodes
            .iter()
            .filter(|n| n.kind == NodeKind::Item)
            .map(Candidate::from)
            .collect();

        // An edge needs one endpoint from each set.
        if new.is_empty() || existing.is_empty() {
            debug!(
                new = new.len(),
                existing = existing.len(),
                "skipping relationship analysis, one side of the boundary is empty"
            );
            return Ok(outcome);
        }

        debug!(
            new = new.len(),
            existing = existing.len(),
            "analyzing new items against existing graph"
        );

        match self.oracle.propose_across(&new, &existing).await {
            Ok(proposals) => {
                let new_map = candidate_map(&new);
                let existing_map = candidate_map(&existing);
                let admitted = admit_proposals(
                    proposals,
                    &AdmissionMode::CrossBoundary {
                        new: &new_map,
                        existing: &existing_map,
                    },
                );

                let mut store = self.store.write().unwrap();
                for edge in &admitted.edges {
                    store.add_edge(edge.clone())?;
                }

                outcome.cross_edges_added = admitted.edges.len();
                outcome.filtered_below_threshold = admitted.below_threshold;
                outcome.invalid_dropped = admitted.invalid;
                info!(
                    topic_id,
                    cross_edges = admitted.edges.len(),
                    filtered = admitted.below_threshold,
                    "cross-boundary relationships committed"
                );
            }
            Err(e) => {
                warn!(
                    topic_id,
                    oracle = self.oracle.name(),
                    error = %e,
                    "oracle unavailable, cluster committed structure-only"
                );
                outcome.oracle_skipped = Some(e.to_string());
            }
        }

        Ok(outcome)
    }

    /// React to a topic cluster being deleted from the source records.
    ///
    /// Cascade removal only — deletion never needs semantic re-analysis.
    /// Returns the number of nodes removed.
    pub async fn on_topic_deleted(&self, topic_id: i64) -> Result<usize> {
        let _mutation = self.mutation.lock().await;

        let removed = self.store.write().unwrap().remove_by_owner(topic_id)?;
        if removed == 0 {
            return Err(GraphError::owner_not_found(topic_id));
        }

        info!(topic_id, removed, "cluster removed from graph");
        Ok(removed)
    }

    /// Clear the store and rebuild the whole graph from source records.
    ///
    /// All item nodes are analyzed in a single all-pairs request —
    /// O(total²) oracle cost. Recovery/bootstrap path, not a steady-state
    /// operation. Concurrent rebuilds serialize behind the mutation lock.
    pub async fn rebuild(&self) -> Result<MutationOutcome> {
        let mut next_group = self.mutation.lock().await;

        let topics = self.sources.topics().await?;
        let mut all_nodes = Vec::new();
        let mut all_contains = Vec::new();
        for (group, topic) in topics.iter().enumerate() {
            let items = self.sources.items_for(topic.id).await?;
            let (nodes, edges) = assemble_cluster(topic, &items, group as u32);
            all_nodes.extend(nodes);
            all_contains.extend(edges);
        }

        {
            let mut store = self.store.write().unwrap();
            store.clear()?;
            store.add_batch(&all_nodes, &all_contains)?;
        }
        // Groups were reassigned from zero; continue counting past them.
        *next_group = topics.len() as u32;

        info!(
            topics = topics.len(),
            nodes = all_nodes.len(),
            "graph structure rebuilt from scratch"
        );

        let mut outcome = MutationOutcome {
            nodes_added: all_nodes.len(),
            contains_edges_added: all_contains.len(),
            ..Default::default()
        };

        let candidates: Vec<Candidate> = all_nodes
            .iter()
            .filter(|n| n.kind == NodeKind::Item)
            .map(Candidate::from)
            .collect();

        if candidates.len() < 2 {
            return Ok(outcome);
        }

        match self.oracle.propose_all(&candidates).await {
            Ok(proposals) => {
                let map = candidate_map(&candidates);
                let admitted =
                    admit_proposals(proposals, &AdmissionMode::AllPairs { candidates: &map });

                let mut store = self.store.write().unwrap();
                for edge in &admitted.edges {
                    store.add_edge(edge.clone())?;
                }

                outcome.cross_edges_added = admitted.edges.len();
                outcome.filtered_below_threshold = admitted.below_threshold;
                outcome.invalid_dropped = admitted.invalid;
                info!(cross_edges = admitted.edges.len(), "rebuild relationships committed");
            }
            Err(e) => {
                warn!(
                    oracle = self.oracle.name(),
                    error = %e,
                    "oracle unavailable during rebuild, structure-only graph"
                );
                outcome.oracle_skipped = Some(e.to_string());
            }
        }

        Ok(outcome)
    }
}
