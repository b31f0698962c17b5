//! Prelude for convenient imports.

pub use crate::error::{GraphError, Result};
pub use crate::fingerprint::{fingerprint, Fingerprint};
pub use crate::store::GraphStore;
pub use crate::types::{
    GraphEdge, GraphNode, GraphSnapshot, ItemRecord, NodeId, NodeKind, RelationshipType,
    SourceRecord, TopicRecord, CONTAINS_WEIGHT, MAX_RELATIONSHIP_WEIGHT, MIN_RELATIONSHIP_WEIGHT,
    WEIGHT_FLOOR,
};
