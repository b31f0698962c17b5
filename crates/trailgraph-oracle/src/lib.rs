//! # Trailgraph Oracle
//!
//! The relationship-oracle contract: an external text-understanding
//! service that, given two disjoint sets of candidate nodes, proposes
//! weighted, typed relationships between them.
//!
//! The engine only depends on the [`RelationshipOracle`] trait. The
//! proposals an oracle returns are *untrusted*: the engine validates
//! endpoints, taxonomy, and weight range before anything reaches the
//! typed edge model.
//!
//! ## Features
//!
//! - `api`: Gemini HTTP backend
//!
//! ## Usage
//!
//! ```rust,ignore
//! use trailgraph_oracle::{GeminiOracle, RelationshipOracle};
//!
//! let oracle = GeminiOracle::from_env()?;
//! let proposals = oracle.propose_across(&new_candidates, &existing_candidates).await?;
//! ```

mod backend;
mod prompt;

pub use backend::{
    Candidate, MockOracle, OracleConfig, OracleError, OracleResult, ProposedRelationship,
    RecordedRequest, RelationshipOracle,
};
pub use prompt::{parse_relationships_json, AllPairsPrompt, CrossBoundaryPrompt, PromptTemplate};

#[cfg(feature = "api")]
mod gemini;
#[cfg(feature = "api")]
pub use gemini::GeminiOracle;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::{Candidate, OracleError, OracleResult, ProposedRelationship, RelationshipOracle};
    pub use crate::{MockOracle, OracleConfig};

    #[cfg(feature = "api")]
    pub use crate::GeminiOracle;
}
