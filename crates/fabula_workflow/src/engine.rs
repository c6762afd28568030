//! The step/route loop that drives every workflow execution.

use crate::{StepTag, WorkflowState};
use async_trait::async_trait;
use fabula_error::{FabulaResult, WorkflowError, WorkflowErrorKind};
use tokio::sync::watch;

/// A workflow shape: step handlers, a total router and result extraction.
#[async_trait]
pub trait StepMachine: Send + Sync {
    /// Step identifiers of this shape.
    type Step: StepTag;
    /// What a successful execution produces.
    type Output: Send;

    /// Run the handler of `step`, folding its provider result into `state`.
    ///
    /// Handlers never fail; provider failures are recorded in the state and
    /// left to the router.
    async fn execute(&self, step: Self::Step, state: &mut WorkflowState<Self::Step>);

    /// Choose the step after `step` from the state it left behind.
    fn route(&self, step: Self::Step, state: &WorkflowState<Self::Step>) -> Self::Step;

    /// Router decisions this execution may need on top of the engine's
    /// fixed allowance, derived from the request it was started with.
    fn transition_allowance(&self, _state: &WorkflowState<Self::Step>) -> u32 {
        0
    }

    /// Extract the result of a finished execution.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowErrorKind::Exhausted`] when the execution ended
    /// without a result.
    fn into_output(&self, state: WorkflowState<Self::Step>) -> FabulaResult<Self::Output>;
}

/// Drives a [`StepMachine`] until its terminal step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkflowEngine {
    max_transitions: u32,
}

impl WorkflowEngine {
    /// Engine allowing `max_transitions` router decisions per execution, plus
    /// whatever allowance the machine claims for the request.
    pub fn new(max_transitions: u32) -> Self {
        Self { max_transitions }
    }

    /// Run one execution to completion.
    ///
    /// Cancellation is observed between steps: once `cancel` reads `true`
    /// the next step is not started.
    ///
    /// # Errors
    ///
    /// Returns an error if the execution is cancelled, exceeds the
    /// transition budget, or ends without a result.
    #[tracing::instrument(
        skip(self, machine, state, cancel),
        fields(task_id = %state.task_id(), entry = %state.current_step())
    )]
    pub async fn run<M: StepMachine>(
        &self,
        machine: &M,
        mut state: WorkflowState<M::Step>,
        cancel: watch::Receiver<bool>,
    ) -> FabulaResult<M::Output> {
        let budget = self
            .max_transitions
            .saturating_add(machine.transition_allowance(&state));
        tracing::info!(budget, "Starting workflow execution");

        while state.current_step != M::Step::END {
            if *cancel.borrow() {
                tracing::info!(step = state.current_step.name(), "Execution cancelled");
                return Err(WorkflowError::new(WorkflowErrorKind::Cancelled(
                    state.task_id.to_string(),
                ))
                .into());
            }

            let step = state.current_step;
            tracing::debug!(step = step.name(), "Executing step");
            machine.execute(step, &mut state).await;

            let next = machine.route(step, &state);
            state.transitions += 1;
            if state.transitions > budget {
                tracing::error!(transitions = state.transitions, "Transition budget exceeded");
                return Err(WorkflowError::new(WorkflowErrorKind::TransitionBudget(budget)).into());
            }

            tracing::debug!(from = step.name(), to = next.name(), "Routed");
            state.current_step = next;
        }

        tracing::info!(
            transitions = state.transitions,
            errors = state.errors.len(),
            warnings = state.warnings.len(),
            retry_count = state.retry_count,
            "Workflow execution finished"
        );
        machine.into_output(state)
    }
}

/// Error for an execution that stopped without a result.
#[track_caller]
pub(crate) fn exhausted<S: StepTag>(state: WorkflowState<S>) -> WorkflowError {
    WorkflowError::new(WorkflowErrorKind::Exhausted {
        errors: state.errors,
        retry_count: state.retry_count,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{GenerationStep, WorkflowMode};
    use fabula_core::{GenerationMode, StoryContext, TaskId};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Walks `steps` in order, or loops on the entry step when empty.
    #[derive(Default)]
    struct Scripted {
        steps: Vec<GenerationStep>,
        allowance: u32,
        executed: AtomicUsize,
    }

    #[async_trait]
    impl StepMachine for Scripted {
        type Step = GenerationStep;
        type Output = u32;

        async fn execute(&self, _step: GenerationStep, _state: &mut WorkflowState<GenerationStep>) {
            self.executed.fetch_add(1, Ordering::SeqCst);
        }

        fn route(&self, _step: GenerationStep, state: &WorkflowState<GenerationStep>) -> GenerationStep {
            self.steps
                .get(state.transitions as usize)
                .copied()
                .unwrap_or(GenerationStep::ENTRY)
        }

        fn transition_allowance(&self, _state: &WorkflowState<GenerationStep>) -> u32 {
            self.allowance
        }

        fn into_output(&self, state: WorkflowState<GenerationStep>) -> FabulaResult<u32> {
            Ok(state.transitions)
        }
    }

    fn state() -> WorkflowState<GenerationStep> {
        WorkflowState::new(
            TaskId::new("t"),
            Arc::new(StoryContext::default()),
            "",
            WorkflowMode::Generation(GenerationMode::AiGuided),
            500,
        )
    }

    fn kind(err: fabula_error::FabulaError) -> WorkflowErrorKind {
        err.as_workflow().expect("workflow error").kind.clone()
    }

    #[tokio::test]
    async fn test_runs_until_end() {
        let machine = Scripted {
            steps: vec![GenerationStep::GenerateNarrative, GenerationStep::End],
            ..Default::default()
        };
        let (_tx, rx) = watch::channel(false);
        let transitions = WorkflowEngine::new(10).run(&machine, state(), rx).await.unwrap();
        assert_eq!(transitions, 2);
        assert_eq!(machine.executed.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_transition_budget_stops_runaway_router() {
        let machine = Scripted::default();
        let (_tx, rx) = watch::channel(false);
        let err = WorkflowEngine::new(5).run(&machine, state(), rx).await.unwrap_err();
        assert_eq!(kind(err), WorkflowErrorKind::TransitionBudget(5));
        assert_eq!(machine.executed.load(Ordering::SeqCst), 6);
    }

    #[tokio::test]
    async fn test_machine_allowance_extends_budget() {
        let mut steps = vec![GenerationStep::GenerateNarrative; 11];
        steps.push(GenerationStep::End);
        let machine = Scripted {
            steps,
            allowance: 10,
            ..Default::default()
        };
        let (_tx, rx) = watch::channel(false);
        let transitions = WorkflowEngine::new(5).run(&machine, state(), rx).await.unwrap();
        assert_eq!(transitions, 12);

        let runaway = Scripted {
            allowance: 10,
            ..Default::default()
        };
        let (_tx, rx) = watch::channel(false);
        let err = WorkflowEngine::new(5).run(&runaway, state(), rx).await.unwrap_err();
        assert_eq!(kind(err), WorkflowErrorKind::TransitionBudget(15));
    }

    #[tokio::test]
    async fn test_cancelled_before_first_step() {
        let machine = Scripted::default();
        let (_tx, rx) = watch::channel(true);
        let err = WorkflowEngine::new(5).run(&machine, state(), rx).await.unwrap_err();
        assert!(matches!(kind(err), WorkflowErrorKind::Cancelled(_)));
        assert_eq!(machine.executed.load(Ordering::SeqCst), 0);
    }
}
