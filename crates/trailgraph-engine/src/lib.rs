//! # Trailgraph Engine
//!
//! The incremental knowledge-graph maintenance engine: keeps a derived
//! graph of topic clusters and learning items consistent with a changing
//! set of source records, invoking the relationship oracle only on the
//! parts of the graph that changed.
//!
//! Two designs live here:
//!
//! - [`GraphService`] — persistent incremental nodes. A created cluster
//!   is analyzed only against pre-existing items (O(new × existing));
//!   deletion is a pure cascade; a full rebuild is the explicit
//!   recovery path. This is the primary design.
//! - [`CachedGraphService`] — fingerprint-gated full cache that
//!   recomputes everything on any source change. A documented
//!   alternative for low-churn deployments, never combined with the
//!   incremental store.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use trailgraph_engine::prelude::*;
//! use trailgraph_oracle::MockOracle;
//!
//! let service = GraphService::new(
//!     MemoryGraphStore::new(),
//!     MockOracle::new(),
//!     MemorySourceRepository::new(),
//! )?;
//! let outcome = service.on_topic_created(1).await?;
//! let snapshot = service.graph(false).await?;
//! ```

pub mod builder;
pub mod cache;
pub mod memory_store;
pub mod prelude;
pub mod source;

#[cfg(feature = "sqlite")]
pub mod sqlite_store;

pub use builder::{GraphService, MutationOutcome};
pub use cache::{CachedGraphService, GraphCache};
pub use memory_store::MemoryGraphStore;
pub use source::{MemorySourceRepository, SourceRepository};

#[cfg(feature = "sqlite")]
pub use sqlite_store::SqliteGraphStore;
