//! Result assembly.

use crate::{GenerationStep, ContinuationStep, Recovery, StepTag, WorkflowState};
use chrono::Utc;
use fabula_core::{
    ChapterMetadata, ChapterResult, GenerationMetadata, GenerationMode, GenerationResult,
    SegmentResult, VisualElements, word_count,
};
use serde_json::Value as JsonValue;

/// Join previous content and accepted segments into chapter text.
///
/// Empty pieces are skipped; pieces are separated by a blank line. Returns
/// the text and its word count. The same inputs always produce the same
/// output.
pub fn assemble_chapter(previous_content: &str, segments: &[SegmentResult]) -> (String, usize) {
    let content = std::iter::once(previous_content)
        .chain(segments.iter().map(|segment| segment.content.as_str()))
        .filter(|piece| !piece.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n");
    let words = word_count(&content);
    (content, words)
}

fn step_names<S: StepTag>(steps: &[S]) -> Vec<String> {
    steps.iter().map(|step| step.name().to_string()).collect()
}

/// Assemble a single-shot result from whatever the execution produced.
pub(crate) fn generation_result(state: &WorkflowState<GenerationStep>) -> GenerationResult {
    let outputs = &state.step_outputs;
    let narrative = outputs.narrative.as_ref();
    let quality = outputs.quality.as_ref();

    let generation_mode = match state.mode {
        crate::WorkflowMode::Generation(mode) => mode,
        crate::WorkflowMode::Continuation(_) => GenerationMode::default(),
    };

    let mut completed_steps = step_names(&state.completed_steps);
    completed_steps.push(GenerationStep::FinalizeOutput.name().to_string());

    GenerationResult {
        task_id: state.task_id.clone(),
        content: narrative.map(|n| n.content.clone()).unwrap_or_default(),
        word_count: narrative.map(|n| n.effective_word_count()).unwrap_or(0),
        quality_metrics: quality.map(|q| q.quality_metrics.clone()).unwrap_or_default(),
        improvement_suggestions: quality
            .map(|q| q.improvement_suggestions.clone())
            .unwrap_or_default(),
        requires_human_review: quality.is_some_and(|q| q.requires_human_review),
        character_consistency_scores: narrative
            .map(|n| n.character_consistency_scores.clone())
            .unwrap_or_default(),
        world_enhancements: outputs.world.as_ref().map(|w| w.setting_enhancements.clone()),
        visual_elements: outputs.visual.as_ref().map(|v| VisualElements {
            image_prompt: v.image_generation_prompt.clone(),
            scene_elements: v.scene_elements.clone(),
        }),
        continuation_context: outputs
            .continuity
            .as_ref()
            .map(|c| c.continuation_context.clone()),
        errors: state.errors.clone(),
        warnings: state.warnings.clone(),
        partial_success: !state.errors.is_empty(),
        metadata: GenerationMetadata {
            completed_steps,
            failed_steps: step_names(&state.failed_steps),
            retry_count: state.retry_count,
            generation_mode,
            target_word_count: state.target_count,
        },
        completed_at: Utc::now(),
    }
}

/// Assemble a chapter result from the accepted segments.
pub(crate) fn chapter_result(
    state: &WorkflowState<ContinuationStep>,
    content: String,
    word_count: usize,
    continuation_context: Option<JsonValue>,
) -> ChapterResult {
    let actual_segments = state.completed_segments.len() as u32;
    ChapterResult {
        task_id: state.task_id.clone(),
        chapter_id: state.chapter_id.clone().unwrap_or_default(),
        content,
        word_count,
        segments: state.completed_segments.clone(),
        continuation_context,
        quality_checks: state.quality_checks.clone(),
        world_updates: state.world_updates.clone(),
        visual_generations: state.visual_generations.clone(),
        errors: state.errors.clone(),
        warnings: state.warnings.clone(),
        metadata: ChapterMetadata {
            continuation_mode: state.continuation_mode().unwrap_or_default(),
            target_segments: state.target_count,
            actual_segments,
            chapter_complete: state.recovery != Some(Recovery::Degrade),
        },
        completed_at: Utc::now(),
    }
}
