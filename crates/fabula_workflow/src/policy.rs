//! Quality gate and recovery decisions.

use crate::{Recovery, StepTag, WorkflowPolicy, WorkflowState};
use fabula_core::QualityVerdict;

/// Threshold check shared by both workflow shapes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QualityGate {
    threshold: f64,
    max_regenerations: u32,
}

impl QualityGate {
    /// Gate with an explicit threshold and regeneration budget.
    pub fn new(threshold: f64, max_regenerations: u32) -> Self {
        Self {
            threshold,
            max_regenerations,
        }
    }

    /// Gate configured from a workflow policy.
    pub fn from_policy(policy: &WorkflowPolicy) -> Self {
        Self::new(policy.quality_threshold, policy.max_regenerations)
    }

    /// Acceptance threshold.
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Verdict for the `attempt`-th check (1-based) of the same output.
    pub fn verdict(&self, score: f64, attempt: u32) -> QualityVerdict {
        if score >= self.threshold {
            QualityVerdict::Accept
        } else if attempt.saturating_sub(1) < self.max_regenerations {
            QualityVerdict::Regenerate
        } else {
            QualityVerdict::AcceptDegraded
        }
    }
}

/// Decides what error handling does with a failed execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecoveryPolicy {
    terminal_error_budget: usize,
    max_workflow_retries: u32,
}

impl RecoveryPolicy {
    /// Policy configured from a workflow policy.
    pub fn from_policy(policy: &WorkflowPolicy) -> Self {
        Self {
            terminal_error_budget: policy.terminal_error_budget,
            max_workflow_retries: policy.max_workflow_retries,
        }
    }

    /// Terminate past the error budget, degrade when output exists, retry
    /// while restarts remain, otherwise terminate.
    pub fn decide<S: StepTag>(&self, state: &WorkflowState<S>) -> Recovery {
        if state.errors.len() > self.terminal_error_budget {
            Recovery::Terminate
        } else if state.has_output() {
            Recovery::Degrade
        } else if state.retry_count < self.max_workflow_retries {
            Recovery::Retry
        } else {
            Recovery::Terminate
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{GenerationStep, WorkflowMode};
    use fabula_core::{GenerationMode, NarrativeOutput, StoryContext, TaskId};
    use std::sync::Arc;

    fn state() -> WorkflowState<GenerationStep> {
        WorkflowState::new(
            TaskId::new("t"),
            Arc::new(StoryContext::default()),
            "",
            WorkflowMode::Generation(GenerationMode::AiGuided),
            500,
        )
    }

    #[test]
    fn test_gate_allows_one_regeneration() {
        let gate = QualityGate::new(0.7, 1);
        assert_eq!(gate.verdict(0.7, 1), QualityVerdict::Accept);
        assert_eq!(gate.verdict(0.5, 1), QualityVerdict::Regenerate);
        assert_eq!(gate.verdict(0.5, 2), QualityVerdict::AcceptDegraded);
        assert_eq!(gate.verdict(0.75, 2), QualityVerdict::Accept);
    }

    #[test]
    fn test_gate_without_regenerations_degrades_immediately() {
        let gate = QualityGate::new(0.7, 0);
        assert_eq!(gate.verdict(0.2, 1), QualityVerdict::AcceptDegraded);
    }

    #[test]
    fn test_recovery_retries_until_budget() {
        let policy = RecoveryPolicy::from_policy(&WorkflowPolicy::default());
        let mut state = state();
        state.errors.push("narrator failed".into());
        assert_eq!(policy.decide(&state), Recovery::Retry);

        state.retry_count = 3;
        assert_eq!(policy.decide(&state), Recovery::Terminate);
    }

    #[test]
    fn test_recovery_degrades_with_output() {
        let policy = RecoveryPolicy::from_policy(&WorkflowPolicy::default());
        let mut state = state();
        state.errors.push("reviewer failed".into());
        state.step_outputs.narrative = Some(NarrativeOutput {
            content: "text".into(),
            word_count: None,
            character_consistency_scores: Default::default(),
            extra: Default::default(),
        });
        assert_eq!(policy.decide(&state), Recovery::Degrade);
    }

    #[test]
    fn test_recovery_terminates_past_error_budget() {
        let policy = RecoveryPolicy::from_policy(&WorkflowPolicy::default());
        let mut state = state();
        state.errors = (0..6).map(|i| format!("error {i}")).collect();
        state.step_outputs.narrative = Some(NarrativeOutput {
            content: "text".into(),
            word_count: None,
            character_consistency_scores: Default::default(),
            extra: Default::default(),
        });
        assert_eq!(policy.decide(&state), Recovery::Terminate);
    }
}
