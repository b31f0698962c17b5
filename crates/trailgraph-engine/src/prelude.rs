//! Prelude for convenient imports.

pub use crate::builder::{GraphService, MutationOutcome};
pub use crate::cache::{CachedGraphService, GraphCache};
pub use crate::memory_store::MemoryGraphStore;
pub use crate::source::{MemorySourceRepository, SourceRepository};
pub use trailgraph_core::prelude::*;

#[cfg(feature = "sqlite")]
pub use crate::sqlite_store::SqliteGraphStore;
