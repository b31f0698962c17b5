//! Petgraph-backed in-memory implementation of the GraphStore trait.
//!
//! Uses `StableGraph` as the backing store with a HashMap index for O(1)
//! node lookup by id. Stable indices matter here: owner-scoped removal
//! deletes nodes while other indices stay valid.

use petgraph::stable_graph::{EdgeIndex, NodeIndex, StableDiGraph};
use std::collections::HashMap;
use trailgraph_core::error::{GraphError, Result};
use trailgraph_core::store::GraphStore;
use trailgraph_core::types::{GraphEdge, GraphNode, NodeId, RelationshipType};

/// Edge payload; endpoints live on the graph structure itself.
#[derive(Debug, Clone)]
struct EdgeAttrs {
    weight: f64,
    relationship: RelationshipType,
}

/// In-memory graph store.
pub struct MemoryGraphStore {
    graph: StableDiGraph<GraphNode, EdgeAttrs>,
    /// Map from our NodeId to petgraph's internal index.
    node_index: HashMap<NodeId, NodeIndex>,
}

impl MemoryGraphStore {
    pub fn new() -> Self {
        Self {
            graph: StableDiGraph::new(),
            node_index: HashMap::new(),
        }
    }

    fn edge_at(&self, idx: EdgeIndex) -> GraphEdge {
        let (a, b) = self
            .graph
            .edge_endpoints(idx)
            .expect("edge index from iteration is valid");
        let attrs = &self.graph[idx];
        GraphEdge {
            source: self.graph[a].id.clone(),
            target: self.graph[b].id.clone(),
            weight: attrs.weight,
            relationship: attrs.relationship,
        }
    }
}

impl Default for MemoryGraphStore {
    fn default() -> Self {
        Self::new()
    }
}

impl GraphStore for MemoryGraphStore {
    fn add_node(&mut self, node: GraphNode) -> Result<()> {
        if self.node_index.contains_key(&node.id) {
            return Err(GraphError::duplicate_node(&node.id));
        }
        let id = node.id.clone();
        let idx = self.graph.add_node(node);
        self.node_index.insert(id, idx);
        Ok(())
    }

    fn add_edge(&mut self, edge: GraphEdge) -> Result<()> {
        let &source = self
            .node_index
            .get(&edge.source)
            .ok_or_else(|| GraphError::missing_endpoint(&edge.source))?;
        let &target = self
            .node_index
            .get(&edge.target)
            .ok_or_else(|| GraphError::missing_endpoint(&edge.target))?;

        self.graph.add_edge(
            source,
            target,
            EdgeAttrs {
                weight: edge.weight,
                relationship: edge.relationship,
            },
        );
        Ok(())
    }

    fn add_batch(&mut self, nodes: &[GraphNode], edges: &[GraphEdge]) -> Result<()> {
        // Validate everything before touching the graph so the batch is
        // all-or-nothing.
        for node in nodes {
            if self.node_index.contains_key(&node.id) {
                return Err(GraphError::duplicate_node(&node.id));
            }
        }
        let batch_ids: std::collections::HashSet<&NodeId> = nodes.iter().map(|n| &n.id).collect();
        for edge in edges {
            for endpoint in [&edge.source, &edge.target] {
                if !batch_ids.contains(endpoint) && !self.node_index.contains_key(endpoint) {
                    return Err(GraphError::missing_endpoint(endpoint));
                }
            }
        }

        for node in nodes {
            self.add_node(node.clone())?;
        }
        for edge in edges {
            self.add_edge(edge.clone())?;
        }
        Ok(())
    }

    fn remove_by_owner(&mut self, owner_id: i64) -> Result<usize> {
        let doomed: Vec<(NodeId, NodeIndex)> = self
            .node_index
            .iter()
            .filter(|(_, &idx)| self.graph[idx].owner_id == owner_id)
            .map(|(id, &idx)| (id.clone(), idx))
            .collect();

        // StableGraph removes every edge touching a node along with it.
        for (id, idx) in &doomed {
            self.graph.remove_node(*idx);
            self.node_index.remove(id);
        }
        Ok(doomed.len())
    }

    fn node(&self, id: &NodeId) -> Result<Option<GraphNode>> {
        Ok(self.node_index.get(id).map(|&idx| self.graph[idx].clone()))
    }

    fn contains_node(&self, id: &NodeId) -> Result<bool> {
        Ok(self.node_index.contains_key(id))
    }

    fn nodes(&self) -> Result<Vec<GraphNode>> {
        Ok(self
            .graph
            .node_indices()
            .map(|idx| self.graph[idx].clone())
            .collect())
    }

    fn edges(&self) -> Result<Vec<GraphEdge>> {
        Ok(self
            .graph
            .edge_indices()
            .map(|idx| self.edge_at(idx))
            .collect())
    }

    fn node_count(&self) -> Result<usize> {
        Ok(self.graph.node_count())
    }

    fn edge_count(&self) -> Result<usize> {
        Ok(self.graph.edge_count())
    }

    fn max_group(&self) -> Result<Option<u32>> {
        Ok(self
            .graph
            .node_indices()
            .map(|idx| self.graph[idx].group)
            .max())
    }

    fn clear(&mut self) -> Result<()> {
        self.graph.clear();
        self.node_index.clear();
        Ok(())
    }
}
