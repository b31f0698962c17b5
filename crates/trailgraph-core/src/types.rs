//! Shared types used across the Trailgraph crates.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Minimum weight an oracle-proposed relationship must carry to be
/// persisted. Anything below is discarded and logged, never stored.
pub const MIN_RELATIONSHIP_WEIGHT: f64 = 1.5;

/// Lower bound of the oracle's weight range.
pub const WEIGHT_FLOOR: f64 = 1.0;

/// Upper bound of the oracle's weight range.
pub const MAX_RELATIONSHIP_WEIGHT: f64 = 3.0;

/// Weight carried by every containment edge.
pub const CONTAINS_WEIGHT: f64 = 3.0;

/// Stable identifier for a node in the knowledge graph.
///
/// Derived deterministically from the source record's kind and primary
/// key, so a topic node and an item node can never collide.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    /// Id for a topic-cluster node.
    pub fn topic(pk: i64) -> Self {
        Self(format!("topic_{}", pk))
    }

    /// Id for a learning-item node.
    pub fn item(pk: i64) -> Self {
        Self(format!("item_{}", pk))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for NodeId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for NodeId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// The class of a graph node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    /// A topic cluster (owns itself and its items).
    Topic,
    /// A learning item within a topic cluster.
    Item,
}

impl NodeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Topic => "topic",
            NodeKind::Item => "item",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "topic" => Some(NodeKind::Topic),
            "item" => Some(NodeKind::Item),
            _ => None,
        }
    }
}

/// A node in the knowledge graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: NodeId,
    /// Display text.
    pub label: String,
    pub kind: NodeKind,
    /// Presentation grouping (one group per topic cluster). Assigned
    /// monotonically on cluster creation, never reused after deletion
    /// within the same process lifetime.
    pub group: u32,
    /// Primary key of the owning topic cluster. A topic node owns itself.
    pub owner_id: i64,
}

impl GraphNode {
    /// Build a topic node. A topic owns itself.
    pub fn topic(pk: i64, label: impl Into<String>, group: u32) -> Self {
        Self {
            id: NodeId::topic(pk),
            label: label.into(),
            kind: NodeKind::Topic,
            group,
            owner_id: pk,
        }
    }

    /// Build an item node owned by a topic cluster.
    pub fn item(pk: i64, owner_id: i64, label: impl Into<String>, group: u32) -> Self {
        Self {
            id: NodeId::item(pk),
            label: label.into(),
            kind: NodeKind::Item,
            group,
            owner_id,
        }
    }
}

/// The semantic class of an edge.
///
/// `Contains` is structural (topic → item, created with the node batch);
/// the other four come from the relationship oracle and are the only
/// kinds subject to weight filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelationshipType {
    Contains,
    Prerequisite,
    Complementary,
    Conceptual,
    Transfer,
}

impl RelationshipType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RelationshipType::Contains => "contains",
            RelationshipType::Prerequisite => "prerequisite",
            RelationshipType::Complementary => "complementary",
            RelationshipType::Conceptual => "conceptual",
            RelationshipType::Transfer => "transfer",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "contains" => Some(RelationshipType::Contains),
            "prerequisite" => Some(RelationshipType::Prerequisite),
            "complementary" => Some(RelationshipType::Complementary),
            "conceptual" => Some(RelationshipType::Conceptual),
            "transfer" => Some(RelationshipType::Transfer),
            _ => None,
        }
    }
}

/// An edge in the knowledge graph.
///
/// Presentation is undirected, but the (source, target) pair is stored
/// with a fixed direction for identity purposes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphEdge {
    pub source: NodeId,
    pub target: NodeId,
    /// Magnitude of relatedness, bounded by the oracle's weight range.
    pub weight: f64,
    pub relationship: RelationshipType,
}

impl GraphEdge {
    pub fn new(
        source: NodeId,
        target: NodeId,
        weight: f64,
        relationship: RelationshipType,
    ) -> Self {
        Self {
            source,
            target,
            weight,
            relationship,
        }
    }

    /// The mandatory containment edge, topic → item.
    pub fn contains(topic: NodeId, item: NodeId) -> Self {
        Self::new(topic, item, CONTAINS_WEIGHT, RelationshipType::Contains)
    }
}

/// A read-only view of the committed graph.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphSnapshot {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
}

impl GraphSnapshot {
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty()
    }
}

/// A topic cluster as the source collaborator exposes it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicRecord {
    pub id: i64,
    pub label: String,
}

impl TopicRecord {
    pub fn new(id: i64, label: impl Into<String>) -> Self {
        Self {
            id,
            label: label.into(),
        }
    }
}

/// A learning item as the source collaborator exposes it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemRecord {
    pub id: i64,
    /// Primary key of the owning topic cluster.
    pub topic_id: i64,
    pub label: String,
}

impl ItemRecord {
    pub fn new(id: i64, topic_id: i64, label: impl Into<String>) -> Self {
        Self {
            id,
            topic_id,
            label: label.into(),
        }
    }
}

/// A source record of either kind, as fed to the fingerprinter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum SourceRecord {
    Topic(TopicRecord),
    Item(ItemRecord),
}

impl SourceRecord {
    /// Primary key within the record's kind.
    pub fn pk(&self) -> i64 {
        match self {
            SourceRecord::Topic(t) => t.id,
            SourceRecord::Item(i) => i.id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_ids_are_deterministic() {
        assert_eq!(NodeId::topic(7), NodeId::topic(7));
        assert_eq!(NodeId::topic(7).as_str(), "topic_7");
        assert_eq!(NodeId::item(7).as_str(), "item_7");
    }

    #[test]
    fn kind_prefixes_never_collide() {
        // Same primary key, different kinds.
        assert_ne!(NodeId::topic(1), NodeId::item(1));
    }

    #[test]
    fn topic_node_owns_itself() {
        let node = GraphNode::topic(3, "Databases", 0);
        assert_eq!(node.owner_id, 3);
        assert_eq!(node.kind, NodeKind::Topic);
    }

    #[test]
    fn contains_edge_runs_topic_to_item() {
        let edge = GraphEdge::contains(NodeId::topic(1), NodeId::item(10));
        assert_eq!(edge.relationship, RelationshipType::Contains);
        assert_eq!(edge.weight, CONTAINS_WEIGHT);
        assert_eq!(edge.source, NodeId::topic(1));
    }

    #[test]
    fn relationship_type_parse_roundtrip() {
        for ty in [
            RelationshipType::Contains,
            RelationshipType::Prerequisite,
            RelationshipType::Complementary,
            RelationshipType::Conceptual,
            RelationshipType::Transfer,
        ] {
            assert_eq!(RelationshipType::parse(ty.as_str()), Some(ty));
        }
        assert_eq!(RelationshipType::parse("related"), None);
    }

    #[test]
    fn node_serializes_with_lowercase_kind() {
        let json = serde_json::to_string(&GraphNode::item(2, 1, "Ownership", 4)).unwrap();
        assert!(json.contains(r#""kind":"item""#));
        assert!(json.contains(r#""id":"item_2""#));
    }
}
