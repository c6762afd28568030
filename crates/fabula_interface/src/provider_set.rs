//! The bundle of providers injected into an orchestrator.

use crate::CapabilityProvider;
use fabula_core::AgentRole;
use fabula_error::{FabulaResult, ProviderError, ProviderErrorKind};
use std::collections::HashMap;
use std::sync::Arc;
use strum::IntoEnumIterator;

/// One provider per role.
///
/// Constructed once by the caller and shared (cheaply cloned) by every task
/// an orchestrator runs.
#[derive(Clone)]
pub struct ProviderSet {
    providers: HashMap<AgentRole, Arc<dyn CapabilityProvider>>,
}

impl std::fmt::Debug for ProviderSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<_> = self
            .providers
            .iter()
            .map(|(role, p)| format!("{}={}", role, p.name()))
            .collect();
        names.sort();
        f.debug_struct("ProviderSet").field("providers", &names).finish()
    }
}

impl ProviderSet {
    /// Start building a provider set.
    pub fn builder() -> ProviderSetBuilder {
        ProviderSetBuilder::default()
    }

    /// Provider for a role.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderErrorKind::NotConfigured`] if no provider is
    /// registered for `role`.
    pub fn get(&self, role: AgentRole) -> FabulaResult<Arc<dyn CapabilityProvider>> {
        self.providers
            .get(&role)
            .cloned()
            .ok_or_else(|| ProviderError::new(ProviderErrorKind::NotConfigured(role.to_string())).into())
    }
}

/// Builder for [`ProviderSet`].
#[derive(Default)]
pub struct ProviderSetBuilder {
    providers: HashMap<AgentRole, Arc<dyn CapabilityProvider>>,
}

impl ProviderSetBuilder {
    /// Register a provider under the role it reports.
    ///
    /// A later registration for the same role replaces the earlier one.
    #[tracing::instrument(skip(self, provider), fields(role = %provider.role(), provider = provider.name()))]
    pub fn provider(mut self, provider: Arc<dyn CapabilityProvider>) -> Self {
        if self.providers.insert(provider.role(), provider).is_some() {
            tracing::warn!("Provider already registered for role, overwriting");
        }
        self
    }

    /// Roles without a registered provider.
    pub fn missing_roles(&self) -> Vec<AgentRole> {
        AgentRole::iter()
            .filter(|role| !self.providers.contains_key(role))
            .collect()
    }

    /// Build the provider set.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderErrorKind::NotConfigured`] naming every role that
    /// has no provider.
    pub fn build(self) -> FabulaResult<ProviderSet> {
        let missing = self.missing_roles();
        if !missing.is_empty() {
            let names: Vec<String> = missing.iter().map(ToString::to_string).collect();
            return Err(ProviderError::new(ProviderErrorKind::NotConfigured(names.join(", "))).into());
        }
        Ok(ProviderSet {
            providers: self.providers,
        })
    }
}
