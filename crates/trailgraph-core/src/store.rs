//! GraphStore — the storage contract for the knowledge graph.
//!
//! Pure storage, no policy. The incremental builder decides *what* to
//! persist; a store only keeps nodes and edges keyed by stable ids.
//!
//! This is a trait rather than a concrete type so that deployments can
//! choose a backend: the engine crate ships a petgraph-backed in-memory
//! store and a SQLite-backed durable store.

use crate::error::Result;
use crate::types::{GraphEdge, GraphNode, GraphSnapshot, NodeId};

/// Durable mapping of nodes and edges keyed by stable identifiers.
pub trait GraphStore: Send {
    /// Insert a node. Fails with a Conflict error if the id exists.
    fn add_node(&mut self, node: GraphNode) -> Result<()>;

    /// Insert an edge. Both endpoints must already be nodes.
    ///
    /// Insertion does not deduplicate by (source, target) — callers are
    /// responsible for not requesting duplicate analysis of a pair.
    fn add_edge(&mut self, edge: GraphEdge) -> Result<()>;

    /// Insert a batch of nodes and edges as one atomic unit.
    ///
    /// Either everything is committed or nothing is. Used for cluster
    /// creation, where item nodes and their containment edges must never
    /// be observable separately.
    fn add_batch(&mut self, nodes: &[GraphNode], edges: &[GraphEdge]) -> Result<()>;

    /// Remove every node owned by a topic cluster, cascading to all
    /// edges touching those nodes. Returns the number of nodes removed.
    fn remove_by_owner(&mut self, owner_id: i64) -> Result<usize>;

    /// Look up a node by id.
    fn node(&self, id: &NodeId) -> Result<Option<GraphNode>>;

    /// Whether a node with this id exists.
    fn contains_node(&self, id: &NodeId) -> Result<bool> {
        Ok(self.node(id)?.is_some())
    }

    /// All nodes.
    fn nodes(&self) -> Result<Vec<GraphNode>>;

    /// All edges.
    fn edges(&self) -> Result<Vec<GraphEdge>>;

    /// Number of nodes.
    fn node_count(&self) -> Result<usize>;

    /// Number of edges.
    fn edge_count(&self) -> Result<usize>;

    /// Highest presentation group currently in the store, if any.
    /// Seeds the monotonic group counter on startup.
    fn max_group(&self) -> Result<Option<u32>>;

    /// Remove every node and edge.
    fn clear(&mut self) -> Result<()>;

    /// A copy of the committed graph.
    fn snapshot(&self) -> Result<GraphSnapshot> {
        Ok(GraphSnapshot {
            nodes: self.nodes()?,
            edges: self.edges()?,
        })
    }
}
