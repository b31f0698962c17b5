//! Error types for graph operations.
//!
//! Provides structured error handling instead of panics. Oracle failures
//! are deliberately *not* represented here: they degrade an operation to
//! structure-only instead of failing it, and stay in the oracle crate's
//! own error type.

use std::error::Error;
use std::fmt;

/// Result type for graph operations.
pub type Result<T> = std::result::Result<T, GraphError>;

/// Errors that can occur while maintaining the knowledge graph.
#[derive(Debug, Clone)]
pub enum GraphError {
    /// Malformed identifier or out-of-range weight admitted from outside.
    Validation(String),
    /// Duplicate node id — signals an identity bug upstream.
    Conflict(String),
    /// Operation referenced an owner or source record that does not exist.
    NotFound(String),
    /// Backing-store failure.
    Storage(String),
    /// Serialization errors.
    Serialization(String),
}

impl fmt::Display for GraphError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GraphError::Validation(msg) => write!(f, "Validation error: {}", msg),
            GraphError::Conflict(msg) => write!(f, "Conflict: {}", msg),
            GraphError::NotFound(msg) => write!(f, "Not found: {}", msg),
            GraphError::Storage(msg) => write!(f, "Storage error: {}", msg),
            GraphError::Serialization(msg) => write!(f, "Serialization error: {}", msg),
        }
    }
}

impl Error for GraphError {}

impl From<serde_json::Error> for GraphError {
    fn from(e: serde_json::Error) -> Self {
        GraphError::Serialization(e.to_string())
    }
}

// Convenience constructors
impl GraphError {
    pub fn duplicate_node(id: impl fmt::Display) -> Self {
        GraphError::Conflict(format!("node already exists: {}", id))
    }

    pub fn missing_endpoint(id: impl fmt::Display) -> Self {
        GraphError::Validation(format!("edge endpoint is not a node: {}", id))
    }

    pub fn owner_not_found(owner_id: i64) -> Self {
        GraphError::NotFound(format!("no nodes owned by topic {}", owner_id))
    }

    pub fn topic_not_found(topic_id: i64) -> Self {
        GraphError::NotFound(format!("topic record {} does not exist", topic_id))
    }
}
