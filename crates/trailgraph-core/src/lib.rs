//! # Trailgraph Core
//!
//! Core types and contracts for the Trailgraph knowledge-graph engine.
//!
//! The knowledge graph is derived data: topic clusters and learning items
//! come from a source-record collaborator, and semantic relationships
//! between items come from an external relationship oracle. This crate
//! defines the shared vocabulary the rest of the workspace builds on:
//!
//! - **types** — nodes, edges, identifiers, and the relationship taxonomy
//! - **store** — the `GraphStore` trait (pure storage, no policy)
//! - **fingerprint** — deterministic digest of the source-record set,
//!   used as a staleness signal
//! - **error** — structured error enums instead of panics
//!
//! ## Quick Start
//!
//! ```rust
//! use trailgraph_core::prelude::*;
//!
//! let id = NodeId::topic(42);
//! assert_eq!(id.as_str(), "topic_42");
//!
//! let node = GraphNode::topic(42, "Rust", 0);
//! assert_eq!(node.kind, NodeKind::Topic);
//! ```

pub mod error;
pub mod fingerprint;
pub mod prelude;
pub mod store;
pub mod types;

pub use error::{GraphError, Result};
pub use fingerprint::{fingerprint, Fingerprint};
pub use store::GraphStore;
pub use types::{
    GraphEdge, GraphNode, GraphSnapshot, ItemRecord, NodeId, NodeKind, RelationshipType,
    SourceRecord, TopicRecord, CONTAINS_WEIGHT, MAX_RELATIONSHIP_WEIGHT, MIN_RELATIONSHIP_WEIGHT,
    WEIGHT_FLOOR,
};
