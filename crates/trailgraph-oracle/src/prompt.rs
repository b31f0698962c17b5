//! Prompt templates for relationship analysis.

use crate::backend::{Candidate, ProposedRelationship};
use trailgraph_core::types::{MAX_RELATIONSHIP_WEIGHT, MIN_RELATIONSHIP_WEIGHT};

/// A prompt template for oracle requests.
pub trait PromptTemplate {
    /// Generate the prompt text.
    fn generate(&self) -> String;

    /// Get the system prompt (if any).
    fn system_prompt(&self) -> Option<String> {
        None
    }
}

fn candidates_json(candidates: &[Candidate]) -> String {
    serde_json::to_string_pretty(candidates).unwrap_or_else(|_| "[]".to_string())
}

/// Prompt for the incremental protocol: relate a batch of newly added
/// items to the items already in the graph, and nothing else.
#[derive(Debug, Clone)]
pub struct CrossBoundaryPrompt {
    pub new: Vec<Candidate>,
    pub existing: Vec<Candidate>,
}

impl CrossBoundaryPrompt {
    pub fn new(new: Vec<Candidate>, existing: Vec<Candidate>) -> Self {
        Self { new, existing }
    }
}

impl PromptTemplate for CrossBoundaryPrompt {
    fn system_prompt(&self) -> Option<String> {
        Some(
            "You are analyzing learning topics in a knowledge graph. \
             Propose only truly meaningful relationships. \
             Respond ONLY with a JSON object, no explanation outside it."
                .to_string(),
        )
    }

    fn generate(&self) -> String {
        format!(
            r#"NEW topics were just added to an existing knowledge graph.
Find meaningful relationships between the NEW topics and the EXISTING topics.

NEW TOPICS (just added):
{}

EXISTING TOPICS (already in the graph):
{}

Instructions:
1. Only connect a NEW topic with an EXISTING topic
2. Do NOT connect two NEW topics
3. Do NOT connect two EXISTING topics
4. Look for prerequisite relationships (one topic is foundational for another)
5. Look for complementary relationships (topics that build on each other)
6. Look for conceptual connections (shared concepts or techniques)
7. Consider cross-domain knowledge transfer
8. BE HIGHLY SELECTIVE - only truly meaningful relationships
9. Weight must be between {} and {}; omit anything weaker

Respond with JSON of this exact shape:
{{
  "relationships": [
    {{
      "source_id": "item_X",
      "target_id": "item_Y",
      "relationship_type": "prerequisite|complementary|conceptual|transfer",
      "weight": {} to {},
      "explanation": "Brief explanation"
    }}
  ]
}}

Important: one endpoint must be from NEW topics, one from EXISTING topics.

JSON:"#,
            candidates_json(&self.new),
            candidates_json(&self.existing),
            MIN_RELATIONSHIP_WEIGHT,
            MAX_RELATIONSHIP_WEIGHT,
            MIN_RELATIONSHIP_WEIGHT,
            MAX_RELATIONSHIP_WEIGHT,
        )
    }
}

/// Prompt for the rebuild protocol: all-pairs analysis over every item,
/// restricted to pairs from different owning clusters.
#[derive(Debug, Clone)]
pub struct AllPairsPrompt {
    pub candidates: Vec<Candidate>,
}

impl AllPairsPrompt {
    pub fn new(candidates: Vec<Candidate>) -> Self {
        Self { candidates }
    }
}

impl PromptTemplate for AllPairsPrompt {
    fn system_prompt(&self) -> Option<String> {
        Some(
            "You are analyzing learning topics in a knowledge graph. \
             Propose only truly meaningful relationships. \
             Respond ONLY with a JSON object, no explanation outside it."
                .to_string(),
        )
    }

    fn generate(&self) -> String {
        format!(
            r#"Analyze the following learning topics and identify meaningful relationships between them.

Topics to analyze:
{}

Instructions:
1. Look for prerequisite, complementary, conceptual, and transfer relationships
2. Only connect topics with DIFFERENT owner_id values
3. BE HIGHLY SELECTIVE - only truly meaningful relationships
4. Weight must be between {} and {}; omit anything weaker

Respond with JSON of this exact shape:
{{
  "relationships": [
    {{
      "source_id": "item_X",
      "target_id": "item_Y",
      "relationship_type": "prerequisite|complementary|conceptual|transfer",
      "weight": {} to {},
      "explanation": "Brief explanation"
    }}
  ]
}}

JSON:"#,
            candidates_json(&self.candidates),
            MIN_RELATIONSHIP_WEIGHT,
            MAX_RELATIONSHIP_WEIGHT,
            MIN_RELATIONSHIP_WEIGHT,
            MAX_RELATIONSHIP_WEIGHT,
        )
    }
}

/// Parse proposed relationships from an oracle's JSON response.
///
/// Tolerates markdown code fences and prose around the JSON object.
/// Individual field validation is the engine's job; this only gets the
/// payload into shape.
pub fn parse_relationships_json(
    json: &str,
) -> Result<Vec<ProposedRelationship>, serde_json::Error> {
    #[derive(serde::Deserialize)]
    struct Envelope {
        #[serde(default)]
        relationships: Vec<ProposedRelationship>,
    }

    let json_str = extract_json_object(json);
    let envelope: Envelope = serde_json::from_str(json_str)?;
    Ok(envelope.relationships)
}

/// Extract a JSON object from text (handles markdown code blocks).
fn extract_json_object(text: &str) -> &str {
    let text = text.trim();
    let text = text.strip_prefix("```json").unwrap_or(text);
    let text = text.strip_prefix("```").unwrap_or(text);
    let text = text.strip_suffix("```").unwrap_or(text);
    let text = text.trim();

    if let (Some(start), Some(end)) = (text.find('{'), text.rfind('}')) {
        &text[start..=end]
    } else {
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cand(id: &str, label: &str, owner: i64) -> Candidate {
        Candidate {
            id: id.to_string(),
            label: label.to_string(),
            owner_id: owner,
        }
    }

    #[test]
    fn cross_boundary_prompt_names_both_sets() {
        let prompt = CrossBoundaryPrompt::new(
            vec![cand("item_3", "SQL Joins", 2)],
            vec![cand("item_1", "Ownership", 1)],
        );

        let generated = prompt.generate();
        assert!(generated.contains("SQL Joins"));
        assert!(generated.contains("Ownership"));
        assert!(generated.contains("NEW TOPICS"));
        assert!(generated.contains("1.5"));
    }

    #[test]
    fn all_pairs_prompt_requires_different_owners() {
        let prompt = AllPairsPrompt::new(vec![
            cand("item_1", "Ownership", 1),
            cand("item_2", "Indexes", 2),
        ]);

        let generated = prompt.generate();
        assert!(generated.contains("DIFFERENT owner_id"));
        assert!(generated.contains("Indexes"));
    }

    #[test]
    fn parse_plain_envelope() {
        let json = r#"{"relationships": [
            {"source_id": "item_1", "target_id": "item_2",
             "relationship_type": "prerequisite", "weight": 2.5,
             "explanation": "builds on"}
        ]}"#;

        let parsed = parse_relationships_json(json).unwrap();
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].relationship_type, "prerequisite");
        assert!((parsed[0].weight - 2.5).abs() < 1e-9);
    }

    #[test]
    fn parse_with_code_fence_and_prose() {
        let json = "Here you go:\n```json\n{\"relationships\": []}\n```";
        let parsed = parse_relationships_json(json).unwrap();
        assert!(parsed.is_empty());
    }

    #[test]
    fn parse_missing_explanation_defaults_empty() {
        let json = r#"{"relationships": [
            {"source_id": "a", "target_id": "b",
             "relationship_type": "conceptual", "weight": 1.7}
        ]}"#;
        let parsed = parse_relationships_json(json).unwrap();
        assert_eq!(parsed[0].explanation, "");
    }

    #[test]
    fn parse_non_numeric_weight_is_an_error() {
        let json = r#"{"relationships": [
            {"source_id": "a", "target_id": "b",
             "relationship_type": "conceptual", "weight": "strong"}
        ]}"#;
        assert!(parse_relationships_json(json).is_err());
    }
}
