//! Core relationship-oracle trait.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use thiserror::Error;
use trailgraph_core::types::GraphNode;

/// Oracle-related errors.
///
/// These never abort a graph mutation: the engine treats every variant
/// as "no cross-boundary edges for this batch" and reports the operation
/// as a partial success.
#[derive(Debug, Error)]
pub enum OracleError {
    #[error("API error: {0}")]
    Api(String),

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Rate limited: retry after {0} seconds")]
    RateLimited(u32),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Parsing failed: {0}")]
    Parse(String),

    #[error("Authentication failed")]
    AuthenticationFailed,

    #[error("Timeout after {0} seconds")]
    Timeout(u32),
}

/// Result type for oracle operations.
pub type OracleResult<T> = Result<T, OracleError>;

/// Configuration for oracle requests.
#[derive(Debug, Clone)]
pub struct OracleConfig {
    /// Model name/identifier.
    pub model: String,
    /// Maximum tokens to generate.
    pub max_output_tokens: u32,
    /// Temperature (0.0 = deterministic).
    pub temperature: f32,
    /// Request timeout in seconds. Timeout degrades the batch exactly
    /// like any other oracle error.
    pub timeout_secs: u32,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            model: "gemini-2.5-flash".to_string(),
            max_output_tokens: 4096,
            temperature: 0.0,
            timeout_secs: 30,
        }
    }
}

impl OracleConfig {
    /// Set the model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set max output tokens.
    pub fn with_max_output_tokens(mut self, max: u32) -> Self {
        self.max_output_tokens = max;
        self
    }

    /// Set temperature.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature.clamp(0.0, 2.0);
        self
    }

    /// Set timeout.
    pub fn with_timeout(mut self, timeout_secs: u32) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }
}

/// A candidate node submitted for relationship analysis.
///
/// The oracle only ever sees id, label, and owner — nothing else about
/// the graph leaves the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub id: String,
    pub label: String,
    pub owner_id: i64,
}

impl From<&GraphNode> for Candidate {
    fn from(node: &GraphNode) -> Self {
        Self {
            id: node.id.as_str().to_string(),
            label: node.label.clone(),
            owner_id: node.owner_id,
        }
    }
}

/// A relationship proposed by the oracle, before validation.
///
/// Fields are raw strings/floats on purpose: the oracle's JSON is not
/// trusted until the engine has checked endpoints, taxonomy, and weight
/// range. `explanation` is informational only and never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProposedRelationship {
    pub source_id: String,
    pub target_id: String,
    pub relationship_type: String,
    pub weight: f64,
    #[serde(default)]
    pub explanation: String,
}

/// Core trait for relationship oracles.
#[async_trait]
pub trait RelationshipOracle: Send + Sync {
    /// Get the backend name.
    fn name(&self) -> &str;

    /// Propose relationships with exactly one endpoint in each list.
    ///
    /// This is the incremental protocol: `new` is the batch just added,
    /// `existing` is every item node already in the graph under a
    /// different owner. Relationships among `new` alone or `existing`
    /// alone are out of contract.
    async fn propose_across(
        &self,
        new: &[Candidate],
        existing: &[Candidate],
    ) -> OracleResult<Vec<ProposedRelationship>>;

    /// Propose relationships across all candidate pairs with different
    /// owners. The rebuild/bootstrap protocol.
    async fn propose_all(&self, candidates: &[Candidate]) -> OracleResult<Vec<ProposedRelationship>>;
}

#[async_trait]
impl<T: RelationshipOracle + ?Sized> RelationshipOracle for std::sync::Arc<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    async fn propose_across(
        &self,
        new: &[Candidate],
        existing: &[Candidate],
    ) -> OracleResult<Vec<ProposedRelationship>> {
        (**self).propose_across(new, existing).await
    }

    async fn propose_all(&self, candidates: &[Candidate]) -> OracleResult<Vec<ProposedRelationship>> {
        (**self).propose_all(candidates).await
    }
}

/// A request as seen by the [`MockOracle`], for assertions in tests.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedRequest {
    pub new_ids: Vec<String>,
    pub existing_ids: Vec<String>,
}

/// A mock oracle for tests and offline runs.
///
/// Returns its canned proposals verbatim for every request and records
/// the candidate ids it was called with.
pub struct MockOracle {
    proposals: Vec<ProposedRelationship>,
    fail_with: Option<String>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl MockOracle {
    /// An oracle that proposes nothing.
    pub fn new() -> Self {
        Self {
            proposals: Vec::new(),
            fail_with: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Set the canned proposals.
    pub fn with_proposals(mut self, proposals: Vec<ProposedRelationship>) -> Self {
        self.proposals = proposals;
        self
    }

    /// Make every call fail, simulating an unreachable oracle.
    pub fn failing(mut self, reason: impl Into<String>) -> Self {
        self.fail_with = Some(reason.into());
        self
    }

    /// Requests seen so far.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    fn record(&self, new: &[Candidate], existing: &[Candidate]) {
        self.requests.lock().unwrap().push(RecordedRequest {
            new_ids: new.iter().map(|c| c.id.clone()).collect(),
            existing_ids: existing.iter().map(|c| c.id.clone()).collect(),
        });
    }
}

impl Default for MockOracle {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RelationshipOracle for MockOracle {
    fn name(&self) -> &str {
        "mock"
    }

    async fn propose_across(
        &self,
        new: &[Candidate],
        existing: &[Candidate],
    ) -> OracleResult<Vec<ProposedRelationship>> {
        self.record(new, existing);
        match &self.fail_with {
            Some(reason) => Err(OracleError::ConnectionFailed(reason.clone())),
            None => Ok(self.proposals.clone()),
        }
    }

    async fn propose_all(&self, candidates: &[Candidate]) -> OracleResult<Vec<ProposedRelationship>> {
        self.record(candidates, &[]);
        match &self.fail_with {
            Some(reason) => Err(OracleError::ConnectionFailed(reason.clone())),
            None => Ok(self.proposals.clone()),
        }
    }
}
