//! Single-shot generation workflow.
//!
//! ```text
//! orchestrate -> analyze_context -> [enhance_world] -> generate_narrative
//!   -> check_quality -> [generate_narrative | generate_visuals] -> finalize_output
//! ```
//!
//! Any critical failure routes to `handle_error`, which retries from
//! `orchestrate`, finalizes with partial output, or ends the execution.

use crate::runtime::data;
use crate::{
    GenerationStep, Recovery, StepMachine, WorkflowPolicy, WorkflowRuntime, WorkflowState,
    engine, finalizer,
};
use async_trait::async_trait;
use fabula_core::{
    AgentRole, ContinuityOutput, FinalResult, GenerationResult, NarrativeOutput,
    OrchestrationPlan, QualityAssessment, QualityRecord, QualityVerdict, VisualOutput,
    WorldOutput,
};
use fabula_error::FabulaResult;
use serde_json::{Map, Value as JsonValue, json};

/// The only output of a single-shot generation is segment 1.
const OUTPUT_SEGMENT: u32 = 1;

/// Step handlers and router of a single-shot generation.
#[derive(Debug, Clone)]
pub struct GenerationWorkflow {
    runtime: WorkflowRuntime,
}

impl GenerationWorkflow {
    /// Create the workflow.
    pub fn new(runtime: WorkflowRuntime) -> Self {
        Self { runtime }
    }

    async fn orchestrate(&self, state: &mut WorkflowState<GenerationStep>) {
        let step = GenerationStep::Orchestrate;
        let input = data([
            ("generation_mode", json!(state.mode.to_string())),
            ("target_word_count", json!(state.target_count)),
            ("include_images", json!(state.images_enabled)),
        ]);
        match self
            .runtime
            .call(state, AgentRole::Planner, "orchestrate_generation", input)
            .await
            .and_then(|r| r.parse::<OrchestrationPlan>())
        {
            Ok(plan) => {
                tracing::info!(planned = ?plan.planned_agents(), "Orchestration planned");
                state.step_outputs.plan = Some(plan);
                state.record_success(step);
            }
            Err(e) => state.record_failure(step, AgentRole::Planner, &e),
        }
    }

    async fn analyze_context(&self, state: &mut WorkflowState<GenerationStep>) {
        let step = GenerationStep::AnalyzeContext;
        let input = data([("content", json!(""))]);
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

    async fn enhance_world(&self, state: &mut WorkflowState<GenerationStep>) {
        let step = GenerationStep::EnhanceWorld;
        let content = narrative_content(state);
        let input = data([("content", json!(content))]);
        match self
            .runtime
            .call(state, AgentRole::WorldBuilder, "enhance_setting", input)
            .await
            .and_then(|r| r.parse::<WorldOutput>())
        {
            Ok(world) => {
                state.step_outputs.world = Some(world);
                state.record_success(step);
            }
            Err(e) => state.record_failure(step, AgentRole::WorldBuilder, &e),
        }
    }

    async fn generate_narrative(&self, state: &mut WorkflowState<GenerationStep>) {
        let step = GenerationStep::GenerateNarrative;
        let mut input = data([
            ("target_word_count", json!(state.target_count)),
            ("generation_mode", json!(state.mode.to_string())),
            ("narrative_context", JsonValue::Object(narrative_context(state))),
        ]);
        if let Some(quality) = &state.step_outputs.quality {
            input.insert(
                "improvement_suggestions".to_string(),
                json!(quality.improvement_suggestions),
            );
        }

        match self
            .runtime
            .call(state, AgentRole::Narrator, "generate_content", input)
            .await
            .and_then(|r| r.parse::<NarrativeOutput>())
        {
            Ok(narrative) => {
                tracing::info!(words = narrative.effective_word_count(), "Narrative generated");
                state.step_outputs.narrative = Some(narrative);
                state.record_success(step);
            }
            Err(e) => state.record_failure(step, AgentRole::Narrator, &e),
        }
    }

    async fn check_quality(&self, state: &mut WorkflowState<GenerationStep>) {
        let step = GenerationStep::CheckQuality;
        let Some(content) = state
            .step_outputs
            .narrative
            .as_ref()
            .map(|n| n.content.clone())
        else {
            state.record_error(step, "check_quality failed: no content to check");
            return;
        };

        let input = data([("content", json!(content))]);
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

        let score = assessment.overall_score();
        let attempt = state.quality_attempts(OUTPUT_SEGMENT) + 1;
        let verdict = self.runtime.gate().verdict(score, attempt);
        tracing::info!(score, attempt, verdict = %verdict, "Quality checked");

        state.quality_checks.push(QualityRecord {
            segment_number: OUTPUT_SEGMENT,
            attempt,
            score,
            verdict,
            assessment: assessment.clone(),
        });
        state.step_outputs.quality = Some(assessment);

        if verdict == QualityVerdict::AcceptDegraded {
            let shortfall = format!(
                "below quality threshold ({:.2} < {:.2}) after {} attempts",
                score,
                self.runtime.gate().threshold(),
                attempt
            );
            if self.runtime.policy().reject_below_threshold {
                state.step_outputs.narrative = None;
                state.record_error(step, format!("{} failed: content {}", step, shortfall));
                return;
            }
            state.warn(format!("Content accepted {}", shortfall));
        }
        state.record_success(step);
    }

    async fn generate_visuals(&self, state: &mut WorkflowState<GenerationStep>) {
        let step = GenerationStep::GenerateVisuals;
        let content = narrative_content(state);
        let input = data([("content", json!(content))]);
        match self
            .runtime
            .call(state, AgentRole::VisualAnalyzer, "analyze_scene", input)
            .await
            .and_then(|r| r.parse::<VisualOutput>())
        {
            Ok(visual) => {
                state.step_outputs.visual = Some(visual);
                state.record_success(step);
            }
            Err(e) => state.record_failure(step, AgentRole::VisualAnalyzer, &e),
        }
    }

    fn finalize_output(&self, state: &mut WorkflowState<GenerationStep>) {
        if state.final_result.is_some() {
            tracing::debug!("Result already assembled");
            return;
        }
        let result = finalizer::generation_result(state);
        tracing::info!(
            words = result.word_count,
            partial_success = result.partial_success,
            "Generation finalized"
        );
        state.final_result = Some(FinalResult::Generation(result));
        state.record_success(GenerationStep::FinalizeOutput);
    }

    fn handle_error(&self, state: &mut WorkflowState<GenerationStep>) {
        let decision = self.runtime.recovery().decide(state);
        tracing::warn!(
            errors = state.errors.len(),
            retry_count = state.retry_count,
            decision = %decision,
            "Handling workflow error"
        );
        if decision == Recovery::Retry {
            state.retry_count += 1;
            state.reset_for_retry();
        }
        state.recovery = Some(decision);
        state.record_success(GenerationStep::HandleError);
    }
}

fn narrative_content(state: &WorkflowState<GenerationStep>) -> String {
    state
        .step_outputs
        .narrative
        .as_ref()
        .map(|n| n.content.clone())
        .unwrap_or_default()
}

/// Planner and continuity outputs merged into one object for the narrator.
fn narrative_context(state: &WorkflowState<GenerationStep>) -> Map<String, JsonValue> {
    let mut merged = Map::new();
    let plan = state
        .step_outputs
        .plan
        .as_ref()
        .map(|p| serde_json::to_value(p).unwrap_or_default());
    let continuity = state
        .step_outputs
        .continuity
        .as_ref()
        .map(|c| serde_json::to_value(c).unwrap_or_default());
    for value in [plan, continuity].into_iter().flatten() {
        if let JsonValue::Object(fields) = value {
            merged.extend(fields);
        }
    }
    merged
}

/// Next step of a single-shot generation.
pub fn route_generation(
    step: GenerationStep,
    state: &WorkflowState<GenerationStep>,
    _policy: &WorkflowPolicy,
) -> GenerationStep {
    use GenerationStep::*;

    if state.step_failed(step) {
        return HandleError;
    }

    match step {
        Orchestrate => AnalyzeContext,
        AnalyzeContext => {
            let wants_world = state
                .step_outputs
                .plan
                .as_ref()
                .is_some_and(|plan| plan.requests(AgentRole::WorldBuilder));
            if wants_world {
                EnhanceWorld
            } else {
                GenerateNarrative
            }
        }
        EnhanceWorld => GenerateNarrative,
        GenerateNarrative => CheckQuality,
        CheckQuality => match state.latest_verdict(OUTPUT_SEGMENT) {
            Some(QualityVerdict::Regenerate) => GenerateNarrative,
            Some(QualityVerdict::Accept | QualityVerdict::AcceptDegraded) => {
                if state.images_enabled {
                    GenerateVisuals
                } else {
                    FinalizeOutput
                }
            }
            None => HandleError,
        },
        GenerateVisuals => FinalizeOutput,
        FinalizeOutput => End,
        HandleError => match state.recovery {
            Some(Recovery::Retry) => Orchestrate,
            Some(Recovery::Degrade) => FinalizeOutput,
            Some(Recovery::Terminate) | None => End,
        },
        End => End,
    }
}

#[async_trait]
impl StepMachine for GenerationWorkflow {
    type Step = GenerationStep;
    type Output = GenerationResult;

    async fn execute(&self, step: GenerationStep, state: &mut WorkflowState<GenerationStep>) {
        match step {
            GenerationStep::Orchestrate => self.orchestrate(state).await,
            GenerationStep::AnalyzeContext => self.analyze_context(state).await,
            GenerationStep::EnhanceWorld => self.enhance_world(state).await,
            GenerationStep::GenerateNarrative => self.generate_narrative(state).await,
            GenerationStep::CheckQuality => self.check_quality(state).await,
            GenerationStep::GenerateVisuals => self.generate_visuals(state).await,
            GenerationStep::FinalizeOutput => self.finalize_output(state),
            GenerationStep::HandleError => self.handle_error(state),
            GenerationStep::End => {}
        }
    }

    fn route(&self, step: GenerationStep, state: &WorkflowState<GenerationStep>) -> GenerationStep {
        route_generation(step, state, self.runtime.policy())
    }

    fn into_output(&self, state: WorkflowState<GenerationStep>) -> FabulaResult<GenerationResult> {
        match state.final_result {
            Some(FinalResult::Generation(result)) => Ok(result),
            _ => Err(engine::exhausted(state).into()),
        }
    }
}
