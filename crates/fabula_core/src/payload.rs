//! Typed views over provider payloads.
//!
//! Provider results are opaque JSON objects. The engine only reads the few
//! fields its routers and finalizers need; everything else is kept in
//! `extra` so nothing a provider returns is lost.

use crate::AgentRole;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use std::collections::HashMap;

/// Planner output: which agents should run and in what order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrchestrationPlan {
    /// Agent sequence at the top level of the payload.
    #[serde(default)]
    pub agent_sequence: Vec<String>,

    /// Nested plan (`orchestration_plan.workflow_plan.agent_sequence`).
    #[serde(default)]
    pub orchestration_plan: Option<JsonValue>,

    /// Remaining payload fields.
    #[serde(flatten)]
    pub extra: Map<String, JsonValue>,
}

impl OrchestrationPlan {
    /// Planned agent names, wherever the planner put them.
    pub fn planned_agents(&self) -> Vec<String> {
        if !self.agent_sequence.is_empty() {
            return self.agent_sequence.clone();
        }
        self.orchestration_plan
            .as_ref()
            .and_then(|plan| plan.pointer("/workflow_plan/agent_sequence"))
            .and_then(JsonValue::as_array)
            .map(|seq| {
                seq.iter()
                    .filter_map(JsonValue::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Whether the plan asks for `role` to run.
    pub fn requests(&self, role: AgentRole) -> bool {
        self.planned_agents()
            .iter()
            .any(|name| role.matches_name(name))
    }
}

/// Narrator output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NarrativeOutput {
    /// Generated text.
    pub content: String,

    /// Word count reported by the narrator.
    #[serde(default)]
    pub word_count: Option<usize>,

    /// Per-character consistency scores.
    #[serde(default)]
    pub character_consistency_scores: HashMap<String, f64>,

    /// Remaining payload fields.
    #[serde(flatten)]
    pub extra: Map<String, JsonValue>,
}

impl NarrativeOutput {
    /// Reported word count, or a count of the content when none was reported.
    pub fn effective_word_count(&self) -> usize {
        self.word_count
            .unwrap_or_else(|| crate::word_count(&self.content))
    }
}

/// Individual quality scores, each in `[0, 1]`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QualityMetrics {
    /// Aggregate score the quality gate reads.
    #[serde(default)]
    pub overall_quality_score: Option<f64>,

    /// Remaining scores (grammar, readability, coherence, ...).
    #[serde(flatten)]
    pub scores: Map<String, JsonValue>,
}

/// Reviewer output.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QualityAssessment {
    /// Scores.
    #[serde(default)]
    pub quality_metrics: QualityMetrics,

    /// Problems the reviewer found.
    #[serde(default)]
    pub identified_issues: Vec<String>,

    /// Suggestions for a rewrite.
    #[serde(default)]
    pub improvement_suggestions: Vec<String>,

    /// Whether a human should look at the content.
    #[serde(default)]
    pub requires_human_review: bool,

    /// Remaining payload fields.
    #[serde(flatten)]
    pub extra: Map<String, JsonValue>,
}

impl QualityAssessment {
    /// Score assumed when the reviewer reports none.
    pub const DEFAULT_SCORE: f64 = 0.5;

    /// Aggregate score clamped to `[0, 1]`.
    pub fn overall_score(&self) -> f64 {
        self.quality_metrics
            .overall_quality_score
            .unwrap_or(Self::DEFAULT_SCORE)
            .clamp(0.0, 1.0)
    }
}

/// World builder output.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorldOutput {
    /// Setting enhancements.
    #[serde(default)]
    pub setting_enhancements: JsonValue,

    /// Remaining payload fields.
    #[serde(flatten)]
    pub extra: Map<String, JsonValue>,
}

/// Visual analyzer output.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VisualOutput {
    /// Prompt for an image generator.
    #[serde(default)]
    pub image_generation_prompt: String,

    /// Elements of the analyzed scene.
    #[serde(default)]
    pub scene_elements: Vec<JsonValue>,

    /// Remaining payload fields.
    #[serde(flatten)]
    pub extra: Map<String, JsonValue>,
}

/// Continuity tracker output.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContinuityOutput {
    /// Compact story state for the next invocation.
    #[serde(default)]
    pub continuation_context: JsonValue,

    /// Remaining payload fields.
    #[serde(flatten)]
    pub extra: Map<String, JsonValue>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_plan_reads_nested_agent_sequence() {
        let plan: OrchestrationPlan = serde_json::from_value(json!({
            "orchestration_plan": {
                "workflow_plan": {"agent_sequence": ["narrative_intelligence", "world_building"]}
            }
        }))
        .unwrap();
        assert!(plan.requests(AgentRole::WorldBuilder));
        assert!(!plan.requests(AgentRole::VisualAnalyzer));
    }

    #[test]
    fn test_plan_without_sequence_requests_nothing() {
        let plan: OrchestrationPlan = serde_json::from_value(json!({"notes": "none"})).unwrap();
        assert!(plan.planned_agents().is_empty());
        assert_eq!(plan.extra.get("notes"), Some(&json!("none")));
    }

    #[test]
    fn test_quality_score_defaults_and_clamps() {
        let missing: QualityAssessment = serde_json::from_value(json!({})).unwrap();
        assert_eq!(missing.overall_score(), QualityAssessment::DEFAULT_SCORE);

        let high: QualityAssessment = serde_json::from_value(json!({
            "quality_metrics": {"overall_quality_score": 1.7, "grammar_score": 0.9}
        }))
        .unwrap();
        assert_eq!(high.overall_score(), 1.0);
        assert!(high.quality_metrics.scores.contains_key("grammar_score"));
    }

    #[test]
    fn test_narrative_requires_content() {
        let result = serde_json::from_value::<NarrativeOutput>(json!({"word_count": 3}));
        assert!(result.is_err());

        let output: NarrativeOutput =
            serde_json::from_value(json!({"content": "one two three four"})).unwrap();
        assert_eq!(output.effective_word_count(), 4);
    }
}
