//! Task submissions.

use crate::{ContinuationStep, GenerationStep, WorkflowMode, WorkflowPolicy, WorkflowState};
use fabula_core::{ContinuationMode, GenerationMode, StoryContext, TaskId};
use fabula_error::{FabulaResult, WorkflowError};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Request for a single-shot generation.
///
/// # Examples
///
/// ```
/// use fabula_core::{GenerationMode, StoryContext};
/// use fabula_workflow::GenerationRequest;
///
/// let request = GenerationRequest::builder()
///     .task_id("task-1")
///     .story_context(StoryContext::default())
///     .user_input("A storm reaches the harbor")
///     .mode(GenerationMode::Collaborative)
///     .target_word_count(800u32)
///     .build()
///     .unwrap();
///
/// assert!(!request.include_images());
/// ```
#[derive(
    Debug,
    Clone,
    PartialEq,
    Serialize,
    Deserialize,
    derive_builder::Builder,
    derive_getters::Getters,
)]
#[builder(setter(into))]
pub struct GenerationRequest {
    /// Caller-chosen task identifier.
    task_id: TaskId,
    /// Story snapshot.
    story_context: StoryContext,
    /// What to write about.
    #[builder(default)]
    #[serde(default)]
    user_input: String,
    /// How the generation is steered.
    #[builder(default)]
    #[serde(default)]
    mode: GenerationMode,
    /// Word budget.
    #[builder(default = "1000")]
    #[serde(default = "default_target_word_count")]
    target_word_count: u32,
    /// Whether to run visual analysis.
    #[builder(default)]
    #[serde(default)]
    include_images: bool,
}

fn default_target_word_count() -> u32 {
    1000
}

impl GenerationRequest {
    /// Start building a request.
    pub fn builder() -> GenerationRequestBuilder {
        GenerationRequestBuilder::default()
    }

    /// Reject requests the workflow cannot run.
    ///
    /// # Errors
    ///
    /// Returns a validation error for a blank task id or a word budget
    /// outside the configured bounds.
    pub fn validate(&self, policy: &WorkflowPolicy) -> FabulaResult<()> {
        if self.task_id.is_blank() {
            return Err(WorkflowError::validation("task_id must not be empty").into());
        }
        let range = policy.min_target_word_count..=policy.max_target_word_count;
        if !range.contains(&self.target_word_count) {
            return Err(WorkflowError::validation(format!(
                "target_word_count {} outside [{}, {}]",
                self.target_word_count, policy.min_target_word_count, policy.max_target_word_count
            ))
            .into());
        }
        Ok(())
    }

    /// Initial workflow state for this request.
    pub fn into_state(self) -> WorkflowState<GenerationStep> {
        WorkflowState::new(
            self.task_id,
            Arc::new(self.story_context),
            self.user_input,
            WorkflowMode::Generation(self.mode),
            self.target_word_count,
        )
        .with_images(self.include_images)
    }
}

/// Request to continue a chapter segment by segment.
#[derive(
    Debug,
    Clone,
    PartialEq,
    Serialize,
    Deserialize,
    derive_builder::Builder,
    derive_getters::Getters,
)]
#[builder(setter(into))]
pub struct ContinuationRequest {
    /// Caller-chosen task identifier.
    task_id: TaskId,
    /// Story snapshot.
    story_context: StoryContext,
    /// Chapter being continued.
    chapter_id: String,
    /// Existing chapter text.
    previous_content: String,
    /// Optional steering for the continuation.
    #[builder(default)]
    #[serde(default)]
    user_direction: Option<String>,
    /// How the loop proceeds between segments.
    #[builder(default)]
    #[serde(default)]
    continuation_mode: ContinuationMode,
    /// Segments to produce.
    #[builder(default = "5")]
    #[serde(default = "default_target_segments")]
    target_segments: u32,
}

fn default_target_segments() -> u32 {
    5
}

impl ContinuationRequest {
    /// Start building a request.
    pub fn builder() -> ContinuationRequestBuilder {
        ContinuationRequestBuilder::default()
    }

    /// Reject requests the workflow cannot run.
    ///
    /// # Errors
    ///
    /// Returns a validation error for a blank task id or missing previous
    /// content.
    pub fn validate(&self) -> FabulaResult<()> {
        if self.task_id.is_blank() {
            return Err(WorkflowError::validation("task_id must not be empty").into());
        }
        if self.previous_content.trim().is_empty() {
            return Err(WorkflowError::validation(
                "continuation requires previous content",
            )
            .into());
        }
        Ok(())
    }

    /// Initial workflow state for this request.
    ///
    /// Visual analysis follows the story's image settings.
    pub fn into_state(self) -> WorkflowState<ContinuationStep> {
        let images_enabled = self.story_context.images_enabled();
        WorkflowState::new(
            self.task_id,
            Arc::new(self.story_context),
            self.user_direction.unwrap_or_default(),
            WorkflowMode::Continuation(self.continuation_mode),
            self.target_segments,
        )
        .with_images(images_enabled)
        .with_chapter(self.chapter_id, self.previous_content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_word_budget_bounds() {
        let policy = WorkflowPolicy::default();
        let request = GenerationRequest::builder()
            .task_id("t")
            .story_context(StoryContext::default())
            .target_word_count(10u32)
            .build()
            .unwrap();
        let err = request.validate(&policy).unwrap_err();
        assert!(err.as_workflow().is_some_and(|e| e.is_validation()));
    }

    #[test]
    fn test_continuation_requires_previous_content() {
        let request = ContinuationRequest::builder()
            .task_id("t")
            .story_context(StoryContext::default())
            .chapter_id("ch-1")
            .previous_content("   ")
            .build()
            .unwrap();
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_blank_task_id_rejected() {
        let request = ContinuationRequest::builder()
            .task_id(" ")
            .story_context(StoryContext::default())
            .chapter_id("ch-1")
            .previous_content("Once.")
            .build()
            .unwrap();
        assert!(request.validate().is_err());
    }
}
