//! Workflow error types.

/// Conditions that end a workflow task without a result.
#[derive(Debug, Clone, PartialEq, Eq, Hash, derive_more::Display)]
pub enum WorkflowErrorKind {
    /// Required context missing or out of range; the task is rejected
    #[display("Validation failed: {}", _0)]
    Validation(String),
    /// Retry budget or error budget exhausted
    #[display("Workflow exhausted after {} retries with {} errors", retry_count, errors.len())]
    Exhausted {
        /// Every error recorded during the execution, in order
        errors: Vec<String>,
        /// Whole-workflow restarts performed
        retry_count: u32,
    },
    /// Router chain exceeded the configured number of transitions
    #[display("Workflow exceeded {} step transitions", _0)]
    TransitionBudget(u32),
    /// Task cancelled between steps
    #[display("Task {} was cancelled", _0)]
    Cancelled(String),
    /// Unknown task identifier
    #[display("Task not found: {}", _0)]
    TaskNotFound(String),
    /// Task identifier already in use
    #[display("Task already exists: {}", _0)]
    DuplicateTask(String),
    /// Background task panicked or was aborted
    #[display("Task execution aborted: {}", _0)]
    Join(String),
}

/// Error type for workflow execution.
///
/// # Examples
///
/// ```
/// use fabula_error::{WorkflowError, WorkflowErrorKind};
///
/// let err = WorkflowError::new(WorkflowErrorKind::Validation(
///     "continuation requires previous content".to_string(),
/// ));
/// assert!(err.is_validation());
/// assert!(format!("{}", err).contains("previous content"));
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Workflow Error: {} at line {} in {}", kind, line, file)]
pub struct WorkflowError {
    /// The specific error condition
    pub kind: WorkflowErrorKind,
    /// Line number where the error occurred
    pub line: u32,
    /// Source file where the error occurred
    pub file: &'static str,
}

impl WorkflowError {
    /// Create a new WorkflowError with automatic location tracking.
    #[track_caller]
    pub fn new(kind: WorkflowErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }

    /// Shorthand for a [`WorkflowErrorKind::Validation`] error.
    #[track_caller]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(WorkflowErrorKind::Validation(message.into()))
    }

    /// Whether the task was rejected before running.
    pub fn is_validation(&self) -> bool {
        matches!(self.kind, WorkflowErrorKind::Validation(_))
    }

    /// Errors accumulated by the execution, if it ran.
    pub fn recorded_errors(&self) -> &[String] {
        match &self.kind {
            WorkflowErrorKind::Exhausted { errors, .. } => errors,
            _ => &[],
        }
    }
}
