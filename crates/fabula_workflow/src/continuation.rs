//! Chapter continuation workflow.
//!
//! ```text
//! analyze_continuation_context -> plan_continuation
//!   -> loop { generate_segment -> check_segment_quality -> [update_world_context]
//!             -> [generate_segment_visuals] -> evaluate_continuation }
//!   -> finalize_chapter
//! ```
//!
//! A generated segment waits in `pending_segment` until it passes the quality
//! gate (or exhausts its regeneration) and is accepted by
//! `evaluate_continuation`, so a regenerated segment is never stored twice.

use crate::runtime::data;
use crate::{
    ContinuationStep, Recovery, StepMachine, WorkflowPolicy, WorkflowRuntime, WorkflowState,
    engine, finalizer,
};
use async_trait::async_trait;
use fabula_core::{
    AgentRole, ChapterResult, ContinuationMode, ContinuityOutput, FinalResult, NarrativeOutput,
    OrchestrationPlan, QualityAssessment, QualityRecord, QualityVerdict, SegmentResult,
    tail_chars,
};
use fabula_error::FabulaResult;
use serde_json::{Value as JsonValue, json};

/// Step handlers and router of a chapter continuation.
#[derive(Debug, Clone)]
pub struct ContinuationWorkflow {
    runtime: WorkflowRuntime,
}

impl ContinuationWorkflow {
    /// Create the workflow.
    pub fn new(runtime: WorkflowRuntime) -> Self {
        Self { runtime }
    }

    async fn analyze_context(&self, state: &mut WorkflowState<ContinuationStep>) {
        let step = ContinuationStep::AnalyzeContinuationContext;
        let input = data([
            ("content", json!(state.previous_content)),
            ("chapter_id", json!(state.chapter_id)),
        ]);
        match self
            .runtime
            .call(state, AgentRole::ContinuityTracker, "create_continuation_context", input)
            .await
            .and_then(|r| r.parse::<ContinuityOutput>())
        {
            Ok(continuity) => {
                state.step_outputs.continuity = Some(continuity);
                state.record_success(step);
            }
            Err(e) => state.record_failure(step, AgentRole::ContinuityTracker, &e),
        }
    }

    async fn plan(&self, state: &mut WorkflowState<ContinuationStep>) {
        let step = ContinuationStep::PlanContinuation;
        let analysis = state
            .step_outputs
            .continuity
            .as_ref()
            .map(|c| serde_json::to_value(c).unwrap_or_default())
            .unwrap_or_default();
        let input = data([
            ("context_analysis", analysis),
            ("continuation_mode", json!(mode_name(state))),
            ("target_segments", json!(state.target_count)),
        ]);
        match self
            .runtime
            .call(state, AgentRole::Planner, "plan_workflow", input)
            .await
            .and_then(|r| r.parse::<OrchestrationPlan>())
        {
            Ok(plan) => {
                tracing::info!(target_segments = state.target_count, "Continuation planned");
                state.step_outputs.plan = Some(plan);
                state.record_success(step);
            }
            Err(e) => state.record_failure(step, AgentRole::Planner, &e),
        }
    }

    async fn generate_segment(&self, state: &mut WorkflowState<ContinuationStep>) {
        let step = ContinuationStep::GenerateSegment;
        let segment_number = state.segment_number();

        let completed: Vec<&str> = state
            .completed_segments
            .iter()
            .map(|s| s.content.as_str())
            .collect();
        let segment_context = json!({
            "previous_content": state.previous_content,
            "completed_segments": completed,
            "continuation_plan": state.step_outputs.plan,
            "context_analysis": state.step_outputs.continuity,
        });
        let mut input = data([
            ("segment_number", json!(segment_number)),
            ("segment_context", segment_context),
            ("target_word_count", json!(self.runtime.policy().segment_word_count)),
        ]);
        if state.quality_attempts(segment_number) > 0
            && let Some(quality) = &state.step_outputs.quality
        {
            input.insert(
                "improvement_suggestions".to_string(),
                json!(quality.improvement_suggestions),
            );
        }

        let outcome = self
            .runtime
            .call(state, AgentRole::Narrator, "generate_content", input)
            .await
            .and_then(|r| r.parse::<NarrativeOutput>().map(|n| (n, r.execution_time_ms())));
        match outcome {
            Ok((narrative, execution_time_ms)) => {
                let word_count = narrative.effective_word_count();
                tracing::info!(segment = segment_number, words = word_count, "Segment generated");
                state.step_outputs.pending_segment = Some(SegmentResult {
                    segment_number,
                    content: narrative.content,
                    word_count,
                    quality_score: None,
                    quality_passed: None,
                    execution_time_ms,
                });
                state.record_success(step);
            }
            Err(e) => state.record_failure(step, AgentRole::Narrator, &e),
        }
    }

    async fn check_segment_quality(&self, state: &mut WorkflowState<ContinuationStep>) {
        let step = ContinuationStep::CheckSegmentQuality;
        let segment_number = state.segment_number();
        let Some(content) = state
            .step_outputs
            .pending_segment
            .as_ref()
            .map(|s| s.content.clone())
        else {
            state.record_error(
                step,
                format!("check_segment_quality failed: no segment {} to check", segment_number),
            );
            return;
        };

        let input = data([
            ("content", json!(content)),
            (
                "segment_context",
                json!({
                    "segment_number": segment_number,
                    "previous_content": state.previous_content,
                }),
            ),
        ]);
        let assessment = match self
            .runtime
            .call(state, AgentRole::Reviewer, "full_quality_check", input)
            .await
            .and_then(|r| r.parse::<QualityAssessment>())
        {
            Ok(assessment) => assessment,
            Err(e) => {
                state.record_failure(step, AgentRole::Reviewer, &e);
                return;
            }
        };

        let gate = self.runtime.gate();
        let score = assessment.overall_score();
        let attempt = state.quality_attempts(segment_number) + 1;
        let verdict = gate.verdict(score, attempt);
        tracing::info!(segment = segment_number, score, attempt, verdict = %verdict, "Segment quality checked");

        state.quality_checks.push(QualityRecord {
            segment_number,
            attempt,
            score,
            verdict,
            assessment: assessment.clone(),
        });
        state.step_outputs.quality = Some(assessment);
        if let Some(pending) = state.step_outputs.pending_segment.as_mut() {
            pending.quality_score = Some(score);
            pending.quality_passed = Some(score >= gate.threshold());
        }

        if verdict == QualityVerdict::AcceptDegraded {
            let shortfall = format!(
                "below quality threshold ({:.2} < {:.2}) after {} attempts",
                score,
                gate.threshold(),
                attempt
            );
            if self.runtime.policy().reject_below_threshold {
                state.step_outputs.pending_segment = None;
                state.record_error(
                    step,
                    format!("{} failed: segment {} {}", step, segment_number, shortfall),
                );
                return;
            }
            state.warn(format!("Segment {} accepted {}", segment_number, shortfall));
        }
        state.record_success(step);
    }

    async fn update_world_context(&self, state: &mut WorkflowState<ContinuationStep>) {
        let step = ContinuationStep::UpdateWorldContext;
        let segment_number = state.segment_number();
        let input = data([
            ("content", json!(pending_content(state))),
            ("segment_context", json!(true)),
        ]);
        match self
            .runtime
            .call(state, AgentRole::WorldBuilder, "enhance_setting", input)
            .await
        {
            Ok(response) => {
                state
                    .world_updates
                    .push(tag_segment(response.payload().clone(), segment_number));
                state.record_success(step);
            }
            Err(e) => state.record_failure(step, AgentRole::WorldBuilder, &e),
        }
    }

    async fn generate_segment_visuals(&self, state: &mut WorkflowState<ContinuationStep>) {
        let step = ContinuationStep::GenerateSegmentVisuals;
        let segment_number = state.segment_number();
        let input = data([("content", json!(pending_content(state)))]);
        match self
            .runtime
            .call(state, AgentRole::VisualAnalyzer, "analyze_visual_opportunities", input)
            .await
        {
            Ok(response) => {
                state
                    .visual_generations
                    .push(tag_segment(response.payload().clone(), segment_number));
                state.record_success(step);
            }
            Err(e) => state.record_failure(step, AgentRole::VisualAnalyzer, &e),
        }
    }

    fn evaluate_continuation(&self, state: &mut WorkflowState<ContinuationStep>) {
        let step = ContinuationStep::EvaluateContinuation;
        match state.step_outputs.pending_segment.take() {
            Some(segment) => {
                tracing::info!(segment = segment.segment_number, "Segment accepted");
                state.completed_segments.push(segment);
                state.current_segment += 1;
                state.record_success(step);
            }
            None => {
                let message = format!(
                    "evaluate_continuation failed: no segment {} to accept",
                    state.segment_number()
                );
                state.record_error(step, message);
            }
        }
    }

    async fn finalize_chapter(&self, state: &mut WorkflowState<ContinuationStep>) {
        let step = ContinuationStep::FinalizeChapter;
        if state.final_result.is_some() {
            tracing::debug!("Chapter already assembled");
            return;
        }

        let (content, word_count) =
            finalizer::assemble_chapter(&state.previous_content, &state.completed_segments);

        let tail = tail_chars(&content, self.runtime.policy().continuity_tail_chars);
        let input = data([
            ("content", json!(tail)),
            ("chapter_id", json!(state.chapter_id)),
        ]);
        let continuation_context = match self
            .runtime
            .call(state, AgentRole::ContinuityTracker, "create_continuation_context", input)
            .await
            .and_then(|r| r.parse::<ContinuityOutput>())
        {
            Ok(continuity) => Some(continuity.continuation_context),
            Err(e) => {
                tracing::warn!(error = %e, "Continuity summary failed, finalizing without it");
                state.warn(format!("{} continuity summary failed: {}", step, e));
                None
            }
        };

        let result = finalizer::chapter_result(state, content, word_count, continuation_context);
        tracing::info!(
            segments = result.segments_generated(),
            words = result.word_count,
            "Chapter finalized"
        );
        state.final_result = Some(FinalResult::Chapter(result));
        state.record_success(step);
    }

    fn handle_error(&self, state: &mut WorkflowState<ContinuationStep>) {
        let decision = self.runtime.recovery().decide(state);
        tracing::warn!(
            errors = state.errors.len(),
            retry_count = state.retry_count,
            completed_segments = state.completed_segments.len(),
            decision = %decision,
            "Handling continuation error"
        );
        if decision == Recovery::Retry {
            state.retry_count += 1;
            state.reset_for_retry();
        }
        state.recovery = Some(decision);
        state.record_success(ContinuationStep::HandleContinuationError);
    }
}

fn mode_name(state: &WorkflowState<ContinuationStep>) -> String {
    state.mode.to_string()
}

fn pending_content(state: &WorkflowState<ContinuationStep>) -> String {
    state
        .step_outputs
        .pending_segment
        .as_ref()
        .map(|s| s.content.clone())
        .unwrap_or_default()
}

fn tag_segment(payload: JsonValue, segment_number: u32) -> JsonValue {
    match payload {
        JsonValue::Object(mut fields) => {
            fields.insert("segment_number".to_string(), json!(segment_number));
            JsonValue::Object(fields)
        }
        other => json!({"segment_number": segment_number, "result": other}),
    }
}

/// Whether the segment loop should produce another segment.
///
/// Stops at the target, after every segment in user-guided mode, and once
/// more errors than the continuation budget have accumulated.
pub fn should_continue(state: &WorkflowState<ContinuationStep>, policy: &WorkflowPolicy) -> bool {
    state.current_segment < state.target_count
        && state.continuation_mode() != Some(ContinuationMode::UserGuided)
        && state.errors.len() <= policy.continuation_error_budget
}

/// Router decisions one segment can take: every generate and check pair the
/// quality gate allows, then enrichment, visuals and evaluation.
pub fn segment_transitions(policy: &WorkflowPolicy) -> u32 {
    policy
        .max_regenerations
        .saturating_add(1)
        .saturating_mul(2)
        .saturating_add(3)
}

/// Next step of a chapter continuation.
pub fn route_continuation(
    step: ContinuationStep,
    state: &WorkflowState<ContinuationStep>,
    policy: &WorkflowPolicy,
) -> ContinuationStep {
    use ContinuationStep::*;

    if state.step_failed(step) {
        return HandleContinuationError;
    }

    match step {
        AnalyzeContinuationContext => PlanContinuation,
        PlanContinuation => {
            if state.target_count == 0 {
                FinalizeChapter
            } else {
                GenerateSegment
            }
        }
        GenerateSegment => CheckSegmentQuality,
        CheckSegmentQuality => match state.latest_verdict(state.segment_number()) {
            Some(QualityVerdict::Regenerate) => GenerateSegment,
            Some(QualityVerdict::Accept) => UpdateWorldContext,
            Some(QualityVerdict::AcceptDegraded) => EvaluateContinuation,
            None => HandleContinuationError,
        },
        UpdateWorldContext => {
            if state.images_enabled {
                GenerateSegmentVisuals
            } else {
                EvaluateContinuation
            }
        }
        GenerateSegmentVisuals => EvaluateContinuation,
        EvaluateContinuation => {
            if should_continue(state, policy) {
                GenerateSegment
            } else {
                FinalizeChapter
            }
        }
        FinalizeChapter => End,
        HandleContinuationError => match state.recovery {
            Some(Recovery::Retry) => AnalyzeContinuationContext,
            Some(Recovery::Degrade) => FinalizeChapter,
            Some(Recovery::Terminate) | None => End,
        },
        End => End,
    }
}

#[async_trait]
impl StepMachine for ContinuationWorkflow {
    type Step = ContinuationStep;
    type Output = ChapterResult;

    async fn execute(&self, step: ContinuationStep, state: &mut WorkflowState<ContinuationStep>) {
        match step {
            ContinuationStep::AnalyzeContinuationContext => self.analyze_context(state).await,
            ContinuationStep::PlanContinuation => self.plan(state).await,
            ContinuationStep::GenerateSegment => self.generate_segment(state).await,
            ContinuationStep::CheckSegmentQuality => self.check_segment_quality(state).await,
            ContinuationStep::UpdateWorldContext => self.update_world_context(state).await,
            ContinuationStep::GenerateSegmentVisuals => {
                self.generate_segment_visuals(state).await
            }
            ContinuationStep::EvaluateContinuation => self.evaluate_continuation(state),
            ContinuationStep::FinalizeChapter => self.finalize_chapter(state).await,
            ContinuationStep::HandleContinuationError => self.handle_error(state),
            ContinuationStep::End => {}
        }
    }

    fn route(
        &self,
        step: ContinuationStep,
        state: &WorkflowState<ContinuationStep>,
    ) -> ContinuationStep {
        route_continuation(step, state, self.runtime.policy())
    }

    fn transition_allowance(&self, state: &WorkflowState<ContinuationStep>) -> u32 {
        let policy = self.runtime.policy();
        segment_transitions(policy)
            .saturating_mul(state.target_count)
            .saturating_mul(policy.max_workflow_retries.saturating_add(1))
    }

    fn into_output(&self, state: WorkflowState<ContinuationStep>) -> FabulaResult<ChapterResult> {
        match state.final_result {
            Some(FinalResult::Chapter(result)) => Ok(result),
            _ => Err(engine::exhausted(state).into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{FabulaConfig, WorkflowMode};
    use fabula_core::{StoryContext, TaskId};
    use fabula_error::ProviderError;
    use fabula_interface::{CapabilityProvider, ProviderContext, ProviderSet};
    use std::sync::Arc;

    struct Offline(AgentRole);

    #[async_trait]
    impl CapabilityProvider for Offline {
        fn role(&self) -> AgentRole {
            self.0
        }

        fn name(&self) -> &str {
            "offline"
        }

        async fn invoke(&self, _context: &ProviderContext) -> FabulaResult<JsonValue> {
            Err(ProviderError::failed(self.0.to_string(), "backend offline").into())
        }
    }

    fn offline_workflow() -> ContinuationWorkflow {
        let providers = [
            AgentRole::Planner,
            AgentRole::Narrator,
            AgentRole::Reviewer,
            AgentRole::WorldBuilder,
            AgentRole::VisualAnalyzer,
            AgentRole::ContinuityTracker,
        ]
        .into_iter()
        .fold(ProviderSet::builder(), |builder, role| {
            builder.provider(Arc::new(Offline(role)))
        })
        .build()
        .unwrap();
        ContinuationWorkflow::new(WorkflowRuntime::new(
            providers,
            Arc::new(FabulaConfig::default()),
        ))
    }

    fn state(mode: ContinuationMode, target: u32) -> WorkflowState<ContinuationStep> {
        WorkflowState::new(
            TaskId::new("t"),
            Arc::new(StoryContext::default()),
            "",
            WorkflowMode::Continuation(mode),
            target,
        )
        .with_chapter("ch-1", "It was late.")
    }

    #[test]
    fn test_loop_stops_at_target() {
        let policy = WorkflowPolicy::default();
        let mut state = state(ContinuationMode::Seamless, 2);
        state.current_segment = 1;
        assert_eq!(
            route_continuation(ContinuationStep::EvaluateContinuation, &state, &policy),
            ContinuationStep::GenerateSegment
        );
        state.current_segment = 2;
        assert_eq!(
            route_continuation(ContinuationStep::EvaluateContinuation, &state, &policy),
            ContinuationStep::FinalizeChapter
        );
    }

    #[test]
    fn test_user_guided_stops_after_each_segment() {
        let policy = WorkflowPolicy::default();
        let mut state = state(ContinuationMode::UserGuided, 5);
        state.current_segment = 1;
        assert!(!should_continue(&state, &policy));
    }

    #[test]
    fn test_error_budget_stops_loop() {
        let policy = WorkflowPolicy::default();
        let mut state = state(ContinuationMode::Seamless, 5);
        state.current_segment = 1;
        state.errors = vec!["a".into(), "b".into(), "c".into()];
        assert!(should_continue(&state, &policy));
        state.errors.push("d".into());
        assert!(!should_continue(&state, &policy));
    }

    #[test]
    fn test_zero_target_skips_loop() {
        let policy = WorkflowPolicy::default();
        let state = state(ContinuationMode::Seamless, 0);
        assert_eq!(
            route_continuation(ContinuationStep::PlanContinuation, &state, &policy),
            ContinuationStep::FinalizeChapter
        );
    }

    #[test]
    fn test_degraded_segment_skips_enrichment() {
        let policy = WorkflowPolicy::default();
        let mut state = state(ContinuationMode::Seamless, 3);
        state.quality_checks.push(QualityRecord {
            segment_number: 1,
            attempt: 2,
            score: 0.4,
            verdict: QualityVerdict::AcceptDegraded,
            assessment: QualityAssessment::default(),
        });
        assert_eq!(
            route_continuation(ContinuationStep::CheckSegmentQuality, &state, &policy),
            ContinuationStep::EvaluateContinuation
        );
    }

    #[test]
    fn test_segment_transitions_cover_regenerations() {
        let mut policy = WorkflowPolicy::default();
        assert_eq!(segment_transitions(&policy), 7);
        policy.max_regenerations = 0;
        assert_eq!(segment_transitions(&policy), 5);
    }

    #[tokio::test]
    async fn test_finalize_without_summary_is_recorded_once() {
        let workflow = offline_workflow();
        let mut state = state(ContinuationMode::Seamless, 0);

        workflow.finalize_chapter(&mut state).await;

        assert!(state.final_result.is_some());
        assert!(state.failed_steps.is_empty());
        assert_eq!(state.completed_steps, vec![ContinuationStep::FinalizeChapter]);
        assert_eq!(state.warnings.len(), 1);
        assert!(state.errors.is_empty());
        assert_eq!(
            route_continuation(
                ContinuationStep::FinalizeChapter,
                &state,
                workflow.runtime.policy()
            ),
            ContinuationStep::End
        );
    }

    #[test]
    fn test_tag_segment_keeps_payload_fields() {
        let tagged = tag_segment(json!({"setting_enhancements": {}}), 2);
        assert_eq!(tagged["segment_number"], 2);
        assert!(tagged.get("setting_enhancements").is_some());
    }
}
