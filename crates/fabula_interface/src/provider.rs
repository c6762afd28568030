//! Capability provider contract.

use crate::ProviderSettings;
use async_trait::async_trait;
use fabula_core::{AgentRole, StoryContext, TaskId};
use fabula_error::{FabulaResult, ProviderError, ProviderErrorKind};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value as JsonValue};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Everything a provider receives for one call.
///
/// Built by a step handler from the workflow state. The story context is
/// shared and read-only; `data` carries the step-specific inputs such as
/// prior step outputs.
#[derive(Debug, Clone, derive_builder::Builder, derive_getters::Getters)]
#[builder(setter(into))]
pub struct ProviderContext {
    /// Role being invoked.
    role: AgentRole,
    /// Task the call belongs to.
    task_id: TaskId,
    /// Kind of work requested (e.g. `generate_content`, `full_quality_check`).
    task_type: String,
    /// Story snapshot supplied by the caller.
    story_context: Arc<StoryContext>,
    /// Free-form caller input.
    #[builder(default)]
    user_input: String,
    /// Step-specific inputs.
    #[builder(default)]
    data: Map<String, JsonValue>,
    /// Call limits for the role.
    #[builder(default)]
    settings: ProviderSettings,
}

impl ProviderContext {
    /// Start building a context.
    pub fn builder() -> ProviderContextBuilder {
        ProviderContextBuilder::default()
    }

    /// A string field of `data`, if present.
    pub fn data_str(&self, key: &str) -> Option<&str> {
        self.data.get(key).and_then(JsonValue::as_str)
    }
}

/// Trait every capability provider implements.
///
/// Providers are shared across concurrently running tasks and must be safe
/// for concurrent use. They never see or mutate workflow state; the calling
/// step folds the returned payload in.
#[async_trait]
pub trait CapabilityProvider: Send + Sync {
    /// Role this provider plays.
    fn role(&self) -> AgentRole;

    /// Provider name for diagnostics (e.g. "template", "anthropic").
    fn name(&self) -> &str;

    /// Perform one unit of work.
    ///
    /// # Errors
    ///
    /// Returns an error if the upstream call fails or is rejected.
    async fn invoke(&self, context: &ProviderContext) -> FabulaResult<JsonValue>;
}

/// Provider payload with its measured execution time.
#[derive(Debug, Clone, PartialEq, derive_getters::Getters)]
pub struct ProviderResponse {
    /// Role that produced the payload.
    role: AgentRole,
    /// Raw payload.
    payload: JsonValue,
    /// Wall-clock time of the call.
    execution_time: Duration,
}

impl ProviderResponse {
    /// Create a response.
    pub fn new(role: AgentRole, payload: JsonValue, execution_time: Duration) -> Self {
        Self {
            role,
            payload,
            execution_time,
        }
    }

    /// Execution time in whole milliseconds.
    pub fn execution_time_ms(&self) -> u64 {
        u64::try_from(self.execution_time.as_millis()).unwrap_or(u64::MAX)
    }

    /// Read the payload as a typed view.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderErrorKind::MalformedOutput`] if the payload does not
    /// have the expected shape.
    pub fn parse<T: DeserializeOwned>(&self) -> FabulaResult<T> {
        serde_json::from_value(self.payload.clone()).map_err(|e| {
            ProviderError::new(ProviderErrorKind::MalformedOutput {
                role: self.role.to_string(),
                message: e.to_string(),
            })
            .into()
        })
    }
}

/// Call a provider under a deadline and measure how long it took.
///
/// A call that outlives `timeout` fails with [`ProviderErrorKind::Timeout`];
/// any other failure is reported as [`ProviderErrorKind::Failed`] unless the
/// provider already returned a provider error.
///
/// # Errors
///
/// Returns a provider error when the call fails or times out.
#[tracing::instrument(
    skip(provider, context),
    fields(
        role = %context.role(),
        provider = provider.name(),
        task_id = %context.task_id(),
        task_type = context.task_type().as_str(),
    )
)]
pub async fn invoke_with_deadline(
    provider: &dyn CapabilityProvider,
    context: &ProviderContext,
    timeout: Duration,
) -> FabulaResult<ProviderResponse> {
    let role = *context.role();
    let started = Instant::now();

    let outcome = tokio::time::timeout(timeout, provider.invoke(context)).await;
    let execution_time = started.elapsed();

    match outcome {
        Ok(Ok(payload)) => {
            tracing::debug!(elapsed_ms = execution_time.as_millis() as u64, "Provider call succeeded");
            Ok(ProviderResponse::new(role, payload, execution_time))
        }
        Ok(Err(e)) => {
            tracing::warn!(error = %e, elapsed_ms = execution_time.as_millis() as u64, "Provider call failed");
            if e.as_provider().is_some() {
                Err(e)
            } else {
                Err(ProviderError::failed(role.to_string(), e.to_string()).into())
            }
        }
        Err(_) => {
            let after_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
            tracing::warn!(after_ms, "Provider call timed out");
            Err(ProviderError::new(ProviderErrorKind::Timeout {
                role: role.to_string(),
                after_ms,
            })
            .into())
        }
    }
}
