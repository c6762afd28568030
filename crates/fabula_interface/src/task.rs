//! Task status tracking.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fabula_core::{FinalResult, TaskId};
use fabula_error::FabulaResult;
use serde::{Deserialize, Serialize};

/// Lifecycle of a submitted task.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TaskStatus {
    /// Accepted, waiting for an execution slot.
    Pending,
    /// Workflow running.
    Processing,
    /// Finished with a result.
    Completed,
    /// Finished without a result.
    Failed,
    /// Stopped by the caller.
    Cancelled,
}

impl TaskStatus {
    /// Whether the task has stopped running.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }
}

/// Workflow shape a task runs.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TaskKind {
    /// Single-shot generation.
    Generation,
    /// Chapter continuation.
    Continuation,
}

/// Stored state of one task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, derive_getters::Getters)]
pub struct TaskRecord {
    task_id: TaskId,
    kind: TaskKind,
    status: TaskStatus,
    result: Option<FinalResult>,
    errors: Vec<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TaskRecord {
    /// A freshly accepted task.
    pub fn pending(task_id: TaskId, kind: TaskKind) -> Self {
        let now = Utc::now();
        Self {
            task_id,
            kind,
            status: TaskStatus::Pending,
            result: None,
            errors: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Move to `status`.
    pub fn set_status(&mut self, status: TaskStatus) {
        self.status = status;
        self.updated_at = Utc::now();
    }

    /// Record a successful result.
    pub fn complete(&mut self, result: FinalResult) {
        self.errors = result.errors().to_vec();
        self.result = Some(result);
        self.set_status(TaskStatus::Completed);
    }

    /// Record a terminal failure.
    pub fn fail(&mut self, status: TaskStatus, errors: Vec<String>) {
        self.errors = errors;
        self.set_status(status);
    }

    /// Polling view of this record.
    pub fn snapshot(&self) -> TaskSnapshot {
        TaskSnapshot {
            task_id: self.task_id.clone(),
            status: self.status,
            warnings: self
                .result
                .as_ref()
                .map(|r| r.warnings().to_vec())
                .unwrap_or_default(),
            result: self.result.clone(),
            errors: self.errors.clone(),
        }
    }
}

/// What a polling caller sees.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskSnapshot {
    /// Task identifier.
    pub task_id: TaskId,
    /// Current status.
    pub status: TaskStatus,
    /// Final result, once completed.
    pub result: Option<FinalResult>,
    /// Errors recorded by the execution.
    pub errors: Vec<String>,
    /// Warnings recorded by the execution.
    pub warnings: Vec<String>,
}

/// Storage for task records.
///
/// The orchestrator keeps no other cross-task state; implementations must
/// be safe for concurrent use.
#[async_trait]
pub trait TaskRepository: Send + Sync {
    /// Store a new task.
    ///
    /// # Errors
    ///
    /// Returns a `DuplicateTask` error if the id is already stored.
    async fn create(&self, record: TaskRecord) -> FabulaResult<()>;

    /// Load a task.
    ///
    /// # Errors
    ///
    /// Returns a `TaskNotFound` error for an unknown id.
    async fn load(&self, task_id: &TaskId) -> FabulaResult<TaskRecord>;

    /// Replace a stored task.
    ///
    /// # Errors
    ///
    /// Returns a `TaskNotFound` error for an unknown id.
    async fn save(&self, record: &TaskRecord) -> FabulaResult<()>;

    /// Remove a stored task, returning it.
    ///
    /// # Errors
    ///
    /// Returns a `TaskNotFound` error for an unknown id.
    async fn remove(&self, task_id: &TaskId) -> FabulaResult<TaskRecord>;

    /// List tasks, optionally filtered by status, oldest first.
    async fn list(&self, status: Option<TaskStatus>) -> FabulaResult<Vec<TaskRecord>>;
}
