//! Per-execution workflow state.
//!
//! A [`WorkflowState`] is owned by exactly one execution. Step handlers fold
//! provider results into it; routers only read it; the engine alone moves
//! `current_step`.

use crate::StepTag;
use chrono::{DateTime, Utc};
use fabula_core::{
    AgentRole, ContinuationMode, ContinuityOutput, FinalResult, GenerationMode, NarrativeOutput,
    OrchestrationPlan, QualityAssessment, QualityRecord, QualityVerdict, SegmentResult,
    StoryContext, TaskId, VisualOutput, WorldOutput,
};
use fabula_error::FabulaError;
use serde_json::Value as JsonValue;
use std::sync::Arc;

/// Mode of the workflow shape being run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display)]
pub enum WorkflowMode {
    /// Single-shot generation mode.
    #[display("{}", _0)]
    Generation(GenerationMode),
    /// Chapter continuation mode.
    #[display("{}", _0)]
    Continuation(ContinuationMode),
}

/// What error handling decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum Recovery {
    /// Restart the workflow from its entry step.
    Retry,
    /// Finalize with whatever output exists.
    Degrade,
    /// Stop without a result.
    Terminate,
}

/// Last successful result of each step.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StepOutputs {
    /// Planner output.
    pub plan: Option<OrchestrationPlan>,
    /// Continuity tracker output from context analysis.
    pub continuity: Option<ContinuityOutput>,
    /// Narrator output (single-shot).
    pub narrative: Option<NarrativeOutput>,
    /// Reviewer output.
    pub quality: Option<QualityAssessment>,
    /// World builder output.
    pub world: Option<WorldOutput>,
    /// Visual analyzer output.
    pub visual: Option<VisualOutput>,
    /// Segment awaiting the quality gate (continuation).
    pub pending_segment: Option<SegmentResult>,
}

/// Mutable record of one workflow execution.
#[derive(Debug, Clone, derive_getters::Getters)]
pub struct WorkflowState<S: StepTag> {
    pub(crate) task_id: TaskId,
    pub(crate) story_context: Arc<StoryContext>,
    pub(crate) user_input: String,
    pub(crate) mode: WorkflowMode,
    pub(crate) target_count: u32,
    pub(crate) images_enabled: bool,
    pub(crate) chapter_id: Option<String>,
    pub(crate) previous_content: String,

    pub(crate) step_outputs: StepOutputs,
    pub(crate) completed_segments: Vec<SegmentResult>,
    pub(crate) quality_checks: Vec<QualityRecord>,
    pub(crate) world_updates: Vec<JsonValue>,
    pub(crate) visual_generations: Vec<JsonValue>,
    pub(crate) current_segment: u32,

    pub(crate) retry_count: u32,
    pub(crate) errors: Vec<String>,
    pub(crate) warnings: Vec<String>,
    pub(crate) completed_steps: Vec<S>,
    pub(crate) failed_steps: Vec<S>,
    pub(crate) last_failure: Option<S>,
    pub(crate) recovery: Option<Recovery>,

    pub(crate) current_step: S,
    pub(crate) transitions: u32,
    pub(crate) started_at: DateTime<Utc>,
    pub(crate) final_result: Option<FinalResult>,
}

impl<S: StepTag> WorkflowState<S> {
    /// Fresh state positioned at the entry step.
    pub fn new(
        task_id: TaskId,
        story_context: Arc<StoryContext>,
        user_input: impl Into<String>,
        mode: WorkflowMode,
        target_count: u32,
    ) -> Self {
        Self {
            task_id,
            story_context,
            user_input: user_input.into(),
            mode,
            target_count,
            images_enabled: false,
            chapter_id: None,
            previous_content: String::new(),
            step_outputs: StepOutputs::default(),
            completed_segments: Vec::new(),
            quality_checks: Vec::new(),
            world_updates: Vec::new(),
            visual_generations: Vec::new(),
            current_segment: 0,
            retry_count: 0,
            errors: Vec::new(),
            warnings: Vec::new(),
            completed_steps: Vec::new(),
            failed_steps: Vec::new(),
            last_failure: None,
            recovery: None,
            current_step: S::ENTRY,
            transitions: 0,
            started_at: Utc::now(),
            final_result: None,
        }
    }

    /// Enable or disable visual analysis.
    pub fn with_images(mut self, enabled: bool) -> Self {
        self.images_enabled = enabled;
        self
    }

    /// Set the chapter being continued and its existing text.
    pub fn with_chapter(
        mut self,
        chapter_id: impl Into<String>,
        previous_content: impl Into<String>,
    ) -> Self {
        self.chapter_id = Some(chapter_id.into());
        self.previous_content = previous_content.into();
        self
    }

    /// Continuation mode, if this is a continuation.
    pub fn continuation_mode(&self) -> Option<ContinuationMode> {
        match self.mode {
            WorkflowMode::Continuation(mode) => Some(mode),
            WorkflowMode::Generation(_) => None,
        }
    }

    /// 1-based number of the segment currently being produced.
    pub fn segment_number(&self) -> u32 {
        self.current_segment + 1
    }

    /// Quality checks already recorded for a segment.
    pub fn quality_attempts(&self, segment_number: u32) -> u32 {
        self.quality_checks
            .iter()
            .filter(|check| check.segment_number == segment_number)
            .count() as u32
    }

    /// Verdict of the latest quality check for a segment.
    pub fn latest_verdict(&self, segment_number: u32) -> Option<QualityVerdict> {
        self.quality_checks
            .iter()
            .rev()
            .find(|check| check.segment_number == segment_number)
            .map(|check| check.verdict)
    }

    /// Whether any output exists that finalization could use.
    pub fn has_output(&self) -> bool {
        self.step_outputs.narrative.is_some() || !self.completed_segments.is_empty()
    }

    /// Whether `step` was the last step to fail critically.
    pub fn step_failed(&self, step: S) -> bool {
        self.last_failure == Some(step)
    }

    pub(crate) fn record_success(&mut self, step: S) {
        self.completed_steps.push(step);
        self.last_failure = None;
    }

    /// Fold a provider failure into the state.
    ///
    /// Failures of non-critical roles become warnings and never route to
    /// error handling.
    pub(crate) fn record_failure(&mut self, step: S, role: AgentRole, error: &FabulaError) {
        self.failed_steps.push(step);
        let message = format!("{} failed: {}", step.name(), error);
        if role.is_critical() {
            tracing::warn!(task_id = %self.task_id, step = step.name(), role = %role, error = %error, "Step failed");
            self.errors.push(message);
            self.last_failure = Some(step);
        } else {
            tracing::info!(task_id = %self.task_id, step = step.name(), role = %role, error = %error, "Optional step failed, continuing");
            self.warnings.push(message);
            self.last_failure = None;
        }
    }

    /// Record a critical failure that did not come from a provider.
    pub(crate) fn record_error(&mut self, step: S, message: impl Into<String>) {
        self.failed_steps.push(step);
        self.errors.push(message.into());
        self.last_failure = Some(step);
    }

    pub(crate) fn warn(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }

    /// Clear step outputs before a whole-workflow restart.
    ///
    /// Errors, warnings, diagnostics and the retry counter survive.
    pub(crate) fn reset_for_retry(&mut self) {
        self.step_outputs = StepOutputs::default();
        self.last_failure = None;
    }
}
