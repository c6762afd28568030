//! Workflow results.

use crate::{ContinuationMode, GenerationMode, QualityAssessment, QualityMetrics, TaskId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::HashMap;

/// Outcome of the quality gate for one quality check.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum QualityVerdict {
    /// Score met the threshold.
    Accept,
    /// Score missed the threshold and a regeneration is still allowed.
    Regenerate,
    /// Score missed the threshold after the regeneration budget was spent.
    AcceptDegraded,
}

impl QualityVerdict {
    /// Whether the checked content is kept.
    pub fn is_accepted(&self) -> bool {
        !matches!(self, Self::Regenerate)
    }
}

/// One quality check, as recorded by the workflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityRecord {
    /// Segment the check applies to (1-based; 1 for single-shot output).
    pub segment_number: u32,
    /// Attempt number for this segment (1-based).
    pub attempt: u32,
    /// Aggregate score the verdict was based on.
    pub score: f64,
    /// Gate outcome.
    pub verdict: QualityVerdict,
    /// Full reviewer output.
    pub assessment: QualityAssessment,
}

/// One accepted increment of a chapter continuation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentResult {
    /// Position in the continuation (1-based).
    pub segment_number: u32,
    /// Segment text.
    pub content: String,
    /// Words in `content`.
    pub word_count: usize,
    /// Score of the last quality check, if one succeeded.
    pub quality_score: Option<f64>,
    /// Whether the last quality check met the threshold.
    pub quality_passed: Option<bool>,
    /// Narrator execution time.
    pub execution_time_ms: u64,
}

/// Image prompt and scene elements for generated content.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VisualElements {
    /// Prompt for an image generator.
    pub image_prompt: String,
    /// Elements of the analyzed scene.
    pub scene_elements: Vec<JsonValue>,
}

/// Diagnostics of a single-shot generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationMetadata {
    /// Steps that completed, in execution order.
    pub completed_steps: Vec<String>,
    /// Steps whose provider call failed, in execution order.
    pub failed_steps: Vec<String>,
    /// Whole-workflow restarts performed.
    pub retry_count: u32,
    /// Generation mode.
    pub generation_mode: GenerationMode,
    /// Requested word budget.
    pub target_word_count: u32,
}

/// Final result of a single-shot generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationResult {
    /// Task that produced this result.
    pub task_id: TaskId,
    /// Generated text.
    pub content: String,
    /// Words in `content`.
    pub word_count: usize,
    /// Scores of the accepted content.
    pub quality_metrics: QualityMetrics,
    /// Reviewer suggestions.
    pub improvement_suggestions: Vec<String>,
    /// Whether the reviewer asked for a human look.
    pub requires_human_review: bool,
    /// Per-character consistency scores.
    pub character_consistency_scores: HashMap<String, f64>,
    /// World builder enhancements, if world building ran.
    pub world_enhancements: Option<JsonValue>,
    /// Visual elements, if visual analysis ran.
    pub visual_elements: Option<VisualElements>,
    /// Continuity context derived before generation.
    pub continuation_context: Option<JsonValue>,
    /// Errors absorbed during the execution.
    pub errors: Vec<String>,
    /// Degraded quality or skipped enrichments.
    pub warnings: Vec<String>,
    /// True when any error was absorbed.
    pub partial_success: bool,
    /// Diagnostics.
    pub metadata: GenerationMetadata,
    /// When the result was assembled.
    pub completed_at: DateTime<Utc>,
}

/// Diagnostics of a chapter continuation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChapterMetadata {
    /// Continuation mode.
    pub continuation_mode: ContinuationMode,
    /// Requested number of segments.
    pub target_segments: u32,
    /// Segments actually accepted.
    pub actual_segments: u32,
    /// True when the segment loop ended normally.
    pub chapter_complete: bool,
}

/// Final result of a chapter continuation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChapterResult {
    /// Task that produced this result.
    pub task_id: TaskId,
    /// Chapter that was continued.
    pub chapter_id: String,
    /// Previous content followed by every accepted segment.
    pub content: String,
    /// Words in `content`.
    pub word_count: usize,
    /// Accepted segments, in order.
    pub segments: Vec<SegmentResult>,
    /// Continuity summary for the next invocation.
    pub continuation_context: Option<JsonValue>,
    /// Every quality check performed.
    pub quality_checks: Vec<QualityRecord>,
    /// World builder updates, one per enriched segment.
    pub world_updates: Vec<JsonValue>,
    /// Visual analyses, one per visualized segment.
    pub visual_generations: Vec<JsonValue>,
    /// Errors absorbed during the execution.
    pub errors: Vec<String>,
    /// Degraded quality or skipped enrichments.
    pub warnings: Vec<String>,
    /// Diagnostics.
    pub metadata: ChapterMetadata,
    /// When the result was assembled.
    pub completed_at: DateTime<Utc>,
}

impl ChapterResult {
    /// Number of accepted segments.
    pub fn segments_generated(&self) -> usize {
        self.segments.len()
    }
}

/// Result of either workflow shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, derive_more::From)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FinalResult {
    /// Single-shot generation.
    Generation(GenerationResult),
    /// Chapter continuation.
    Chapter(ChapterResult),
}

impl FinalResult {
    /// Task that produced this result.
    pub fn task_id(&self) -> &TaskId {
        match self {
            Self::Generation(result) => &result.task_id,
            Self::Chapter(result) => &result.task_id,
        }
    }

    /// Final text.
    pub fn content(&self) -> &str {
        match self {
            Self::Generation(result) => &result.content,
            Self::Chapter(result) => &result.content,
        }
    }

    /// Warnings recorded by the execution.
    pub fn warnings(&self) -> &[String] {
        match self {
            Self::Generation(result) => &result.warnings,
            Self::Chapter(result) => &result.warnings,
        }
    }

    /// Errors absorbed by the execution.
    pub fn errors(&self) -> &[String] {
        match self {
            Self::Generation(result) => &result.errors,
            Self::Chapter(result) => &result.errors,
        }
    }
}
