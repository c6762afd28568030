//! Task orchestrator: accepts submissions and runs each one as an isolated
//! workflow execution on its own tokio task.

use crate::{
    ContinuationRequest, ContinuationWorkflow, FabulaConfig, GenerationRequest,
    GenerationWorkflow, StepMachine, WorkflowEngine, WorkflowRuntime, WorkflowState,
};
use fabula_core::{ChapterResult, FinalResult, GenerationResult, TaskId};
use fabula_error::{FabulaError, FabulaResult, WorkflowError, WorkflowErrorKind};
use fabula_interface::{
    ProviderSet, TaskKind, TaskRecord, TaskRepository, TaskSnapshot, TaskStatus,
};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{RwLock, Semaphore, watch};

/// Runs generation and continuation tasks.
///
/// Providers are injected once at construction and shared by every task.
/// Each task gets its own [`WorkflowState`]; the only cross-task state is the
/// task repository and the per-task cancellation flags.
#[derive(Clone)]
pub struct StoryOrchestrator {
    generation: Arc<GenerationWorkflow>,
    continuation: Arc<ContinuationWorkflow>,
    engine: WorkflowEngine,
    config: Arc<FabulaConfig>,
    repository: Arc<dyn TaskRepository>,
    permits: Arc<Semaphore>,
    cancellations: Arc<RwLock<HashMap<TaskId, watch::Sender<bool>>>>,
}

impl std::fmt::Debug for StoryOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoryOrchestrator")
            .field("engine", &self.engine)
            .field("available_permits", &self.permits.available_permits())
            .finish_non_exhaustive()
    }
}

impl StoryOrchestrator {
    /// Create an orchestrator.
    pub fn new(
        providers: ProviderSet,
        config: FabulaConfig,
        repository: Arc<dyn TaskRepository>,
    ) -> Self {
        let config = Arc::new(config);
        let runtime = WorkflowRuntime::new(providers, Arc::clone(&config));
        Self {
            generation: Arc::new(GenerationWorkflow::new(runtime.clone())),
            continuation: Arc::new(ContinuationWorkflow::new(runtime)),
            engine: WorkflowEngine::new(config.workflow.max_transitions),
            permits: Arc::new(Semaphore::new(config.orchestrator.max_concurrent_tasks)),
            config,
            repository,
            cancellations: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Effective configuration.
    pub fn config(&self) -> &FabulaConfig {
        &self.config
    }

    /// Accept a single-shot generation and start it in the background.
    ///
    /// # Errors
    ///
    /// Returns a validation error (the task is not stored) or a duplicate
    /// task error.
    #[tracing::instrument(skip(self, request), fields(task_id = %request.task_id()))]
    pub async fn start_generation(&self, request: GenerationRequest) -> FabulaResult<TaskId> {
        request.validate(&self.config.workflow)?;
        let task_id = request.task_id().clone();
        let state = request.into_state();
        self.submit(Arc::clone(&self.generation), state, TaskKind::Generation)
            .await?;
        Ok(task_id)
    }

    /// Accept a chapter continuation and start it in the background.
    ///
    /// # Errors
    ///
    /// Returns a validation error (the task is not stored) or a duplicate
    /// task error.
    #[tracing::instrument(skip(self, request), fields(task_id = %request.task_id()))]
    pub async fn start_continuation(&self, request: ContinuationRequest) -> FabulaResult<TaskId> {
        request.validate()?;
        let task_id = request.task_id().clone();
        let state = request.into_state();
        self.submit(Arc::clone(&self.continuation), state, TaskKind::Continuation)
            .await?;
        Ok(task_id)
    }

    /// Current status of a task, with its result once completed.
    ///
    /// # Errors
    ///
    /// Returns a task-not-found error for an unknown id.
    pub async fn get_result(&self, task_id: &TaskId) -> FabulaResult<TaskSnapshot> {
        Ok(self.repository.load(task_id).await?.snapshot())
    }

    /// Like [`get_result`](Self::get_result), but a finished task is removed
    /// once read so the repository only keeps tasks still in flight.
    ///
    /// # Errors
    ///
    /// Returns a task-not-found error for an unknown id.
    #[tracing::instrument(skip(self), fields(task_id = %task_id))]
    pub async fn take_result(&self, task_id: &TaskId) -> FabulaResult<TaskSnapshot> {
        let record = self.repository.load(task_id).await?;
        if !record.status().is_terminal() {
            return Ok(record.snapshot());
        }
        let record = self.repository.remove(task_id).await?;
        tracing::debug!(status = %record.status(), "Finished task released");
        Ok(record.snapshot())
    }

    /// All known tasks, optionally filtered by status.
    ///
    /// # Errors
    ///
    /// Returns an error if the repository cannot be read.
    pub async fn list_tasks(&self, status: Option<TaskStatus>) -> FabulaResult<Vec<TaskSnapshot>> {
        Ok(self
            .repository
            .list(status)
            .await?
            .iter()
            .map(TaskRecord::snapshot)
            .collect())
    }

    /// Ask a running or pending task to stop before its next step.
    ///
    /// Cancelling a finished task has no effect.
    ///
    /// # Errors
    ///
    /// Returns a task-not-found error for an unknown id.
    #[tracing::instrument(skip(self), fields(task_id = %task_id))]
    pub async fn cancel(&self, task_id: &TaskId) -> FabulaResult<()> {
        if let Some(flag) = self.cancellations.read().await.get(task_id) {
            tracing::info!("Cancellation requested");
            flag.send_replace(true);
            return Ok(());
        }
        let record = self.repository.load(task_id).await?;
        tracing::debug!(status = %record.status(), "Task already finished");
        Ok(())
    }

    /// Run a single-shot generation on the current task and wait for it.
    ///
    /// # Errors
    ///
    /// Returns a validation error, or the error that ended the execution.
    #[tracing::instrument(skip(self, request), fields(task_id = %request.task_id()))]
    pub async fn run_generation(&self, request: GenerationRequest) -> FabulaResult<GenerationResult> {
        request.validate(&self.config.workflow)?;
        let (_cancel, flag) = watch::channel(false);
        self.engine
            .run(self.generation.as_ref(), request.into_state(), flag)
            .await
    }

    /// Run a chapter continuation on the current task and wait for it.
    ///
    /// # Errors
    ///
    /// Returns a validation error, or the error that ended the execution.
    #[tracing::instrument(skip(self, request), fields(task_id = %request.task_id()))]
    pub async fn run_continuation(&self, request: ContinuationRequest) -> FabulaResult<ChapterResult> {
        request.validate()?;
        let (_cancel, flag) = watch::channel(false);
        self.engine
            .run(self.continuation.as_ref(), request.into_state(), flag)
            .await
    }

    async fn submit<M>(
        &self,
        machine: Arc<M>,
        state: WorkflowState<M::Step>,
        kind: TaskKind,
    ) -> FabulaResult<()>
    where
        M: StepMachine + 'static,
        M::Output: Into<FinalResult> + 'static,
    {
        let task_id = state.task_id().clone();
        self.repository
            .create(TaskRecord::pending(task_id.clone(), kind))
            .await?;

        let (cancel, flag) = watch::channel(false);
        self.cancellations
            .write()
            .await
            .insert(task_id.clone(), cancel);

        let orchestrator = self.clone();
        tokio::spawn(async move {
            let outcome = orchestrator.execute(machine, state, flag).await;
            orchestrator.finish(&task_id, outcome).await;
        });
        tracing::info!(kind = %kind, "Task accepted");
        Ok(())
    }

    async fn execute<M>(
        &self,
        machine: Arc<M>,
        state: WorkflowState<M::Step>,
        flag: watch::Receiver<bool>,
    ) -> FabulaResult<FinalResult>
    where
        M: StepMachine + 'static,
        M::Output: Into<FinalResult> + 'static,
    {
        let task_id = state.task_id().clone();
        let _permit = Arc::clone(&self.permits)
            .acquire_owned()
            .await
            .map_err(|e| WorkflowError::new(WorkflowErrorKind::Join(e.to_string())))?;

        if *flag.borrow() {
            return Err(WorkflowError::new(WorkflowErrorKind::Cancelled(task_id.to_string())).into());
        }
        self.update(&task_id, |record| record.set_status(TaskStatus::Processing))
            .await?;

        let engine = self.engine;
        let execution =
            tokio::spawn(async move { engine.run(machine.as_ref(), state, flag).await });
        match execution.await {
            Ok(outcome) => outcome.map(Into::into),
            Err(e) => {
                tracing::error!(error = %e, "Workflow execution aborted");
                Err(WorkflowError::new(WorkflowErrorKind::Join(e.to_string())).into())
            }
        }
    }

    async fn finish(&self, task_id: &TaskId, outcome: FabulaResult<FinalResult>) {
        self.cancellations.write().await.remove(task_id);

        let updated = match outcome {
            Ok(result) => {
                tracing::info!(task_id = %task_id, warnings = result.warnings().len(), "Task completed");
                self.update(task_id, |record| record.complete(result)).await
            }
            Err(e) => {
                let (status, errors) = failure_details(&e);
                tracing::warn!(task_id = %task_id, status = %status, error = %e, "Task ended without result");
                self.update(task_id, |record| record.fail(status, errors))
                    .await
            }
        };
        if let Err(e) = updated {
            tracing::error!(task_id = %task_id, error = %e, "Failed to record task outcome");
        }
    }

    async fn update(
        &self,
        task_id: &TaskId,
        change: impl FnOnce(&mut TaskRecord),
    ) -> FabulaResult<()> {
        let mut record = self.repository.load(task_id).await?;
        change(&mut record);
        self.repository.save(&record).await
    }
}

fn failure_details(error: &FabulaError) -> (TaskStatus, Vec<String>) {
    match error.as_workflow() {
        Some(workflow) if matches!(workflow.kind, WorkflowErrorKind::Cancelled(_)) => {
            (TaskStatus::Cancelled, vec![workflow.kind.to_string()])
        }
        Some(workflow) if !workflow.recorded_errors().is_empty() => {
            (TaskStatus::Failed, workflow.recorded_errors().to_vec())
        }
        _ => (TaskStatus::Failed, vec![error.to_string()]),
    }
}
