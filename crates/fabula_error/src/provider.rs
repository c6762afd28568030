//! Capability provider error types.

/// Failure conditions of a single capability provider call.
///
/// The orchestrator treats every kind uniformly as "step failed"; the
/// distinction only matters for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Hash, derive_more::Display)]
pub enum ProviderErrorKind {
    /// Provider returned an error
    #[display("{} provider failed: {}", role, message)]
    Failed {
        /// Provider role name
        role: String,
        /// Error message
        message: String,
    },
    /// Provider did not answer before its deadline
    #[display("{} provider timed out after {}ms", role, after_ms)]
    Timeout {
        /// Provider role name
        role: String,
        /// Deadline in milliseconds
        after_ms: u64,
    },
    /// Provider answered with a payload of the wrong shape
    #[display("{} provider returned malformed output: {}", role, message)]
    MalformedOutput {
        /// Provider role name
        role: String,
        /// Error message
        message: String,
    },
    /// No provider registered for the role
    #[display("No provider configured for role {}", _0)]
    NotConfigured(String),
}

/// Error type for capability provider calls.
///
/// # Examples
///
/// ```
/// use fabula_error::{ProviderError, ProviderErrorKind};
///
/// let err = ProviderError::new(ProviderErrorKind::Timeout {
///     role: "narrator".to_string(),
///     after_ms: 500,
/// });
/// assert!(format!("{}", err).contains("timed out"));
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Provider Error: {} at line {} in {}", kind, line, file)]
pub struct ProviderError {
    /// The specific error condition
    pub kind: ProviderErrorKind,
    /// Line number where the error occurred
    pub line: u32,
    /// Source file where the error occurred
    pub file: &'static str,
}

impl ProviderError {
    /// Create a new ProviderError with automatic location tracking.
    #[track_caller]
    pub fn new(kind: ProviderErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }

    /// Shorthand for a [`ProviderErrorKind::Failed`] error.
    #[track_caller]
    pub fn failed(role: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::Failed {
            role: role.into(),
            message: message.into(),
        })
    }
}
