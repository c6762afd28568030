//! Provider calls on behalf of step handlers.

use crate::{FabulaConfig, QualityGate, RecoveryPolicy, StepTag, WorkflowPolicy, WorkflowState};
use fabula_core::AgentRole;
use fabula_error::{FabulaResult, WorkflowError};
use fabula_interface::{ProviderContext, ProviderResponse, ProviderSet, invoke_with_deadline};
use serde_json::{Map, Value as JsonValue};
use std::sync::Arc;

/// Providers and configuration shared by the step handlers of one machine.
#[derive(Debug, Clone)]
pub struct WorkflowRuntime {
    providers: ProviderSet,
    config: Arc<FabulaConfig>,
}

impl WorkflowRuntime {
    /// Create a runtime.
    pub fn new(providers: ProviderSet, config: Arc<FabulaConfig>) -> Self {
        Self { providers, config }
    }

    /// Workflow thresholds and budgets.
    pub fn policy(&self) -> &WorkflowPolicy {
        &self.config.workflow
    }

    /// Configured quality gate.
    pub fn gate(&self) -> QualityGate {
        QualityGate::from_policy(self.policy())
    }

    /// Configured recovery policy.
    pub fn recovery(&self) -> RecoveryPolicy {
        RecoveryPolicy::from_policy(self.policy())
    }

    /// Call the provider for `role` with a context built from `state`.
    ///
    /// # Errors
    ///
    /// Returns the provider failure, or a not-configured error when the
    /// provider set has no provider for `role`.
    pub async fn call<S: StepTag>(
        &self,
        state: &WorkflowState<S>,
        role: AgentRole,
        task_type: &str,
        data: Map<String, JsonValue>,
    ) -> FabulaResult<ProviderResponse> {
        let provider = self.providers.get(role)?;
        let settings = self.config.provider_settings(role);

        let context = ProviderContext::builder()
            .role(role)
            .task_id(state.task_id.clone())
            .task_type(task_type)
            .story_context(Arc::clone(&state.story_context))
            .user_input(state.user_input.clone())
            .data(data)
            .settings(settings)
            .build()
            .map_err(|e| WorkflowError::validation(format!("Invalid provider context: {}", e)))?;

        invoke_with_deadline(provider.as_ref(), &context, settings.timeout()).await
    }
}

/// Build a JSON object from key/value pairs.
pub(crate) fn data<const N: usize>(pairs: [(&str, JsonValue); N]) -> Map<String, JsonValue> {
    pairs
        .into_iter()
        .map(|(key, value)| (key.to_string(), value))
        .collect()
}
