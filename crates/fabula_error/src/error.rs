//! Top-level error wrapper types.

use crate::{ConfigError, JsonError, ProviderError, WorkflowError};

/// Every error condition a Fabula crate can surface.
///
/// # Examples
///
/// ```
/// use fabula_error::{FabulaError, ProviderError};
///
/// let provider_err = ProviderError::failed("reviewer", "upstream rejected request");
/// let err: FabulaError = provider_err.into();
/// assert!(format!("{}", err).contains("Provider Error"));
/// ```
#[derive(Debug, derive_more::From, derive_more::Display, derive_more::Error)]
pub enum FabulaErrorKind {
    /// Capability provider error
    #[from(ProviderError)]
    Provider(ProviderError),
    /// Workflow error
    #[from(WorkflowError)]
    Workflow(WorkflowError),
    /// Configuration error
    #[from(ConfigError)]
    Config(ConfigError),
    /// JSON serialization/deserialization error
    #[from(JsonError)]
    Json(JsonError),
}

/// Fabula error with kind discrimination.
///
/// # Examples
///
/// ```
/// use fabula_error::{FabulaError, FabulaResult, WorkflowError};
///
/// fn start() -> FabulaResult<()> {
///     Err(WorkflowError::validation("task id must not be empty"))?
/// }
///
/// let err = start().unwrap_err();
/// assert!(err.as_workflow().is_some());
/// ```
#[derive(Debug, derive_more::Display, derive_more::Error)]
#[display("Fabula Error: {}", _0)]
pub struct FabulaError(Box<FabulaErrorKind>);

impl FabulaError {
    /// Create a new error from a kind.
    pub fn new(kind: FabulaErrorKind) -> Self {
        Self(Box::new(kind))
    }

    /// Get the error kind.
    pub fn kind(&self) -> &FabulaErrorKind {
        &self.0
    }

    /// The workflow error, if this is one.
    pub fn as_workflow(&self) -> Option<&WorkflowError> {
        match self.kind() {
            FabulaErrorKind::Workflow(e) => Some(e),
            _ => None,
        }
    }

    /// The provider error, if this is one.
    pub fn as_provider(&self) -> Option<&ProviderError> {
        match self.kind() {
            FabulaErrorKind::Provider(e) => Some(e),
            _ => None,
        }
    }
}

// Generic From implementation for any type that converts to FabulaErrorKind
impl<T> From<T> for FabulaError
where
    T: Into<FabulaErrorKind>,
{
    fn from(err: T) -> Self {
        Self::new(err.into())
    }
}

/// Result type for Fabula operations.
pub type FabulaResult<T> = std::result::Result<T, FabulaError>;
