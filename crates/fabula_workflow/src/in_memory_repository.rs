//! In-memory implementation of TaskRepository.
//!
//! Stores task records in a HashMap behind an RwLock. All data is lost when
//! the repository is dropped.

use async_trait::async_trait;
use fabula_core::TaskId;
use fabula_error::{FabulaResult, WorkflowError, WorkflowErrorKind};
use fabula_interface::{TaskRecord, TaskRepository, TaskStatus};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// In-memory task repository.
///
/// # Example
/// ```
/// use fabula_workflow::InMemoryTaskRepository;
///
/// #[tokio::main]
/// async fn main() {
///     let repo = InMemoryTaskRepository::new();
///     assert!(repo.is_empty().await);
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct InMemoryTaskRepository {
    tasks: Arc<RwLock<HashMap<TaskId, TaskRecord>>>,
}

impl InMemoryTaskRepository {
    /// Create a new empty repository.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored tasks.
    pub async fn len(&self) -> usize {
        self.tasks.read().await.len()
    }

    /// Whether no task is stored.
    pub async fn is_empty(&self) -> bool {
        self.tasks.read().await.is_empty()
    }

    /// Drop every stored task.
    pub async fn clear(&self) {
        self.tasks.write().await.clear();
    }
}

fn not_found(task_id: &TaskId) -> WorkflowError {
    WorkflowError::new(WorkflowErrorKind::TaskNotFound(task_id.to_string()))
}

#[async_trait]
impl TaskRepository for InMemoryTaskRepository {
    async fn create(&self, record: TaskRecord) -> FabulaResult<()> {
        let mut tasks = self.tasks.write().await;
        if tasks.contains_key(record.task_id()) {
            return Err(WorkflowError::new(WorkflowErrorKind::DuplicateTask(
                record.task_id().to_string(),
            ))
            .into());
        }
        tracing::debug!(task_id = %record.task_id(), "Stored task");
        tasks.insert(record.task_id().clone(), record);
        Ok(())
    }

    async fn load(&self, task_id: &TaskId) -> FabulaResult<TaskRecord> {
        self.tasks
            .read()
            .await
            .get(task_id)
            .cloned()
            .ok_or_else(|| not_found(task_id).into())
    }

    async fn save(&self, record: &TaskRecord) -> FabulaResult<()> {
        let mut tasks = self.tasks.write().await;
        match tasks.get_mut(record.task_id()) {
            Some(stored) => {
                *stored = record.clone();
                Ok(())
            }
            None => Err(not_found(record.task_id()).into()),
        }
    }

    async fn remove(&self, task_id: &TaskId) -> FabulaResult<TaskRecord> {
        let removed = self.tasks.write().await.remove(task_id);
        tracing::debug!(task_id = %task_id, found = removed.is_some(), "Removed task");
        removed.ok_or_else(|| not_found(task_id).into())
    }

    async fn list(&self, status: Option<TaskStatus>) -> FabulaResult<Vec<TaskRecord>> {
        let tasks = self.tasks.read().await;
        let mut records: Vec<TaskRecord> = tasks
            .values()
            .filter(|record| status.is_none_or(|s| *record.status() == s))
            .cloned()
            .collect();
        records.sort_by(|a, b| a.created_at().cmp(b.created_at()));
        Ok(records)
    }
}
