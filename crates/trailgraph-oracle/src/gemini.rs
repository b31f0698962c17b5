//! Gemini backend for the Google Generative Language API.
//!
//! Requires the `api` feature and a Gemini API key.

use crate::backend::{
    Candidate, OracleConfig, OracleError, OracleResult, ProposedRelationship, RelationshipOracle,
};
use crate::prompt::{parse_relationships_json, AllPairsPrompt, CrossBoundaryPrompt, PromptTemplate};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Gemini API request.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiContent>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiContent {
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiPart {
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
    /// Forces the model to emit a bare JSON document.
    response_mime_type: String,
}

/// Gemini API response.
#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: GeminiContent,
}

/// Gemini backend for the Google Generative Language API.
///
/// # Example
///
/// ```rust,ignore
/// use trailgraph_oracle::{GeminiOracle, RelationshipOracle};
///
/// let oracle = GeminiOracle::new("AIza...");
/// let proposals = oracle.propose_across(&new, &existing).await?;
/// ```
pub struct GeminiOracle {
    api_key: String,
    config: OracleConfig,
    client: reqwest::Client,
}

impl GeminiOracle {
    /// Create a new Gemini oracle with the default config.
    pub fn new(api_key: &str) -> Self {
        Self::with_config(api_key, OracleConfig::default())
    }

    /// Create with custom config.
    pub fn with_config(api_key: &str, config: OracleConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs as u64))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            api_key: api_key.to_string(),
            config,
            client,
        }
    }

    /// Create from the `GEMINI_API_KEY` environment variable.
    pub fn from_env() -> OracleResult<Self> {
        let api_key =
            std::env::var("GEMINI_API_KEY").map_err(|_| OracleError::AuthenticationFailed)?;
        Ok(Self::new(&api_key))
    }

    /// Get the current configuration.
    pub fn config(&self) -> &OracleConfig {
        &self.config
    }

    /// Set the model.
    pub fn with_model(mut self, model: &str) -> Self {
        self.config.model = model.to_string();
        self
    }

    /// Use Gemini Flash (default, fastest).
    pub fn flash(mut self) -> Self {
        self.config.model = "gemini-2.5-flash".to_string();
        self
    }

    /// Use Gemini Pro.
    pub fn pro(mut self) -> Self {
        self.config.model = "gemini-2.5-pro".to_string();
        self
    }

    /// Make a generateContent request and return the model's text.
    async fn request(&self, prompt: &str, system: Option<&str>) -> OracleResult<String> {
        let url = format!(
            "{}/models/{}:generateContent",
            GEMINI_API_BASE, self.config.model
        );

        let request = GeminiRequest {
            contents: vec![GeminiContent {
                parts: vec![GeminiPart {
                    text: prompt.to_string(),
                }],
            }],
            system_instruction: system.map(|s| GeminiContent {
                parts: vec![GeminiPart {
                    text: s.to_string(),
                }],
            }),
            generation_config: GenerationConfig {
                temperature: self.config.temperature,
                max_output_tokens: self.config.max_output_tokens,
                response_mime_type: "application/json".to_string(),
            },
        };

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .header("content-type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() {
                    OracleError::ConnectionFailed("Cannot connect to Gemini API".to_string())
                } else if e.is_timeout() {
                    OracleError::Timeout(self.config.timeout_secs)
                } else {
                    OracleError::Api(e.to_string())
                }
            })?;

        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();

            return Err(match status.as_u16() {
                401 | 403 => OracleError::AuthenticationFailed,
                429 => OracleError::RateLimited(60),
                _ => OracleError::Api(format!("Gemini API error {}: {}", status, body)),
            });
        }

        let resp: GeminiResponse = response
            .json()
            .await
            .map_err(|e| OracleError::InvalidResponse(e.to_string()))?;

        resp.candidates
            .first()
            .and_then(|c| c.content.parts.first())
            .map(|p| p.text.clone())
            .ok_or_else(|| OracleError::InvalidResponse("No content in response".to_string()))
    }

    async fn propose(&self, prompt: &dyn PromptTemplate) -> OracleResult<Vec<ProposedRelationship>> {
        let system = prompt.system_prompt();
        let response = self.request(&prompt.generate(), system.as_deref()).await?;

        debug!(bytes = response.len(), "gemini response received");

        parse_relationships_json(&response).map_err(|e| {
            OracleError::Parse(format!(
                "Failed to parse relationships: {}. Response: {}",
                e, response
            ))
        })
    }
}

#[async_trait]
impl RelationshipOracle for GeminiOracle {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn propose_across(
        &self,
        new: &[Candidate],
        existing: &[Candidate],
    ) -> OracleResult<Vec<ProposedRelationship>> {
        let prompt = CrossBoundaryPrompt::new(new.to_vec(), existing.to_vec());
        self.propose(&prompt).await
    }

    async fn propose_all(&self, candidates: &[Candidate]) -> OracleResult<Vec<ProposedRelationship>> {
        let prompt = AllPairsPrompt::new(candidates.to_vec());
        self.propose(&prompt).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gemini_config_defaults() {
        let oracle = GeminiOracle::new("test-key");
        assert!(oracle.config.model.contains("flash"));
        assert_eq!(oracle.config.timeout_secs, 30);
    }

    #[test]
    fn model_variants() {
        let pro = GeminiOracle::new("key").pro();
        assert!(pro.config.model.contains("pro"));

        let flash = GeminiOracle::new("key").flash();
        assert!(flash.config.model.contains("flash"));
    }
}
