//! Per-role provider call settings.

use fabula_core::AgentRole;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Limits handed to a provider with every call.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, derive_getters::Getters)]
pub struct ProviderSettings {
    /// Deadline for one call, in seconds.
    #[serde(default = "default_timeout_secs")]
    timeout_secs: u64,

    /// Maximum tokens the provider should produce.
    #[serde(default = "default_max_tokens")]
    max_tokens: u32,

    /// Sampling temperature.
    #[serde(default = "default_temperature")]
    temperature: f32,
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_max_tokens() -> u32 {
    1000
}

fn default_temperature() -> f32 {
    0.7
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
        }
    }
}

impl ProviderSettings {
    /// Create settings from explicit values.
    pub fn new(timeout_secs: u64, max_tokens: u32, temperature: f32) -> Self {
        Self {
            timeout_secs,
            max_tokens,
            temperature,
        }
    }

    /// Built-in settings for a role.
    pub fn for_role(role: AgentRole) -> Self {
        let (max_tokens, temperature) = match role {
            AgentRole::Planner => (1000, 0.5),
            AgentRole::Narrator => (3000, 0.8),
            AgentRole::Reviewer => (1500, 0.3),
            AgentRole::WorldBuilder => (2000, 0.7),
            AgentRole::VisualAnalyzer => (500, 0.6),
            AgentRole::ContinuityTracker => (1000, 0.4),
        };
        Self::new(default_timeout_secs(), max_tokens, temperature)
    }

    /// Call deadline.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_defaults() {
        let narrator = ProviderSettings::for_role(AgentRole::Narrator);
        assert_eq!(*narrator.max_tokens(), 3000);
        assert_eq!(narrator.timeout(), Duration::from_secs(60));

        let reviewer = ProviderSettings::for_role(AgentRole::Reviewer);
        assert!(*reviewer.temperature() < *narrator.temperature());
    }

    #[test]
    fn test_partial_table_fills_defaults() {
        let settings: ProviderSettings = from_json(r#"{"timeout_secs": 5}"#);
        assert_eq!(settings.timeout(), Duration::from_secs(5));
        assert_eq!(*settings.max_tokens(), 1000);
    }

    fn from_json(json: &str) -> ProviderSettings {
        serde_json::from_str(json).unwrap()
    }
}
