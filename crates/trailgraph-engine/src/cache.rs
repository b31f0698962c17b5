//! Fingerprint-gated full-graph cache — the alternative design.
//!
//! Instead of persistent incremental nodes, this model recomputes the
//! entire graph whenever the source records change and serves the last
//! result from a single-slot cache keyed by the content fingerprint.
//! Simpler mental model, O(total²) oracle cost on every source change;
//! suited to low-churn deployments. It is an alternative to the
//! incremental [`GraphService`](crate::builder::GraphService), never a
//! complement — the two are not wired to the same store.

use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use trailgraph_core::error::Result;
use trailgraph_core::fingerprint::{fingerprint, Fingerprint};
use trailgraph_core::types::{GraphSnapshot, NodeKind};
use trailgraph_oracle::{Candidate, RelationshipOracle};

use crate::builder::{admit_proposals, assemble_cluster, candidate_map, AdmissionMode};
use crate::source::SourceRepository;

/// Single-slot cache: at most one graph exists at a time, keyed by the
/// fingerprint that produced it.
#[derive(Debug, Default)]
pub struct GraphCache {
    slot: Option<(Fingerprint, GraphSnapshot)>,
}

impl GraphCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The cached graph, if it was produced from this fingerprint.
    pub fn get(&self, fingerprint: &Fingerprint) -> Option<&GraphSnapshot> {
        match &self.slot {
            Some((key, graph)) if key == fingerprint => Some(graph),
            _ => None,
        }
    }

    /// Replace the cached graph, evicting any prior entry unconditionally.
    pub fn put(&mut self, fingerprint: Fingerprint, graph: GraphSnapshot) {
        self.slot = Some((fingerprint, graph));
    }

    pub fn is_empty(&self) -> bool {
        self.slot.is_none()
    }

    pub fn clear(&mut self) {
        self.slot = None;
    }
}

/// Recompute-everything graph service gated by the content fingerprint.
pub struct CachedGraphService<O, R> {
    oracle: O,
    sources: R,
    cache: Mutex<GraphCache>,
}

impl<O, R> CachedGraphService<O, R>
where
    O: RelationshipOracle,
    R: SourceRepository,
{
    pub fn new(oracle: O, sources: R) -> Self {
        Self {
            oracle,
            sources,
            cache: Mutex::new(GraphCache::new()),
        }
    }

    /// The current graph.
    ///
    /// Computes the fingerprint over current source records; on a hit
    /// the cached graph is returned verbatim with no oracle call, on a
    /// miss the whole graph is recomputed and cached under the new
    /// fingerprint.
    pub async fn graph(&self) -> Result<GraphSnapshot> {
        let records = self.sources.records().await?;
        let key = fingerprint(&records);

        let mut cache = self.cache.lock().await;
        if let Some(graph) = cache.get(&key) {
            debug!(%key, "graph cache hit");
            return Ok(graph.clone());
        }

        info!(%key, "graph cache miss, recomputing entire graph");
        let (graph, complete) = self.recompute().await?;
        // A structure-only result is not pinned into the cache: the next
        // read retries relationship analysis.
        if complete {
            cache.put(key, graph.clone());
        }
        Ok(graph)
    }

    async fn recompute(&self) -> Result<(GraphSnapshot, bool)> {
        let topics = self.sources.topics().await?;

        let mut snapshot = GraphSnapshot::default();
        for (group, topic) in topics.iter().enumerate() {
            let items = self.sources.items_for(topic.id).await?;
            let (nodes, edges) = assemble_cluster(topic, &items, group as u32);
            snapshot.nodes.extend(nodes);
            snapshot.edges.extend(edges);
        }

        let candidates: Vec<Candidate> = snapshot
            .nodes
            .iter()
            .filter(|n| n.kind == NodeKind::Item)
            .map(Candidate::from)
            .collect();

        if candidates.len() < 2 {
            return Ok((snapshot, true));
        }

        match self.oracle.propose_all(&candidates).await {
            Ok(proposals) => {
                let map = candidate_map(&candidates);
                let admitted =
                    admit_proposals(proposals, &AdmissionMode::AllPairs { candidates: &map });
                snapshot.edges.extend(admitted.edges);
                Ok((snapshot, true))
            }
            Err(e) => {
                warn!(
                    oracle = self.oracle.name(),
                    error = %e,
                    "oracle unavailable, serving structure-only graph uncached"
                );
                Ok((snapshot, false))
            }
        }
    }
}
