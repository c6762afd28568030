//! Configuration for workflows and the task orchestrator.
//!
//! Configuration is layered with the `config` crate:
//! - Bundled defaults (include_str! from fabula.toml)
//! - User overrides (~/.config/fabula/fabula.toml, then ./fabula.toml)
//!
//! Later sources override earlier ones key by key, so an override file only
//! needs the values it changes.

use fabula_core::AgentRole;
use fabula_error::{ConfigError, FabulaError, FabulaResult};
use fabula_interface::ProviderSettings;
use config::{Config, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, instrument};

/// Bundled default configuration.
const DEFAULT_CONFIG: &str = include_str!("../../../fabula.toml");

/// Thresholds and budgets that bound a workflow execution.
///
/// # Example
///
/// ```toml
/// [workflow]
/// quality_threshold = 0.8
/// max_regenerations = 1
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowPolicy {
    /// Aggregate reviewer score required for acceptance
    #[serde(default = "default_quality_threshold")]
    pub quality_threshold: f64,

    /// Regenerations allowed per segment
    #[serde(default = "default_max_regenerations")]
    pub max_regenerations: u32,

    /// Whole-workflow restarts before termination
    #[serde(default = "default_max_workflow_retries")]
    pub max_workflow_retries: u32,

    /// Errors tolerated before the segment loop stops
    #[serde(default = "default_continuation_error_budget")]
    pub continuation_error_budget: usize,

    /// Errors tolerated before the error step terminates
    #[serde(default = "default_terminal_error_budget")]
    pub terminal_error_budget: usize,

    /// Word budget per segment
    #[serde(default = "default_segment_word_count")]
    pub segment_word_count: u32,

    /// Characters of final content handed to the continuity tracker
    #[serde(default = "default_continuity_tail_chars")]
    pub continuity_tail_chars: usize,

    /// Fixed router decisions per execution, before per-request allowances
    #[serde(default = "default_max_transitions")]
    pub max_transitions: u32,

    /// Treat sub-threshold acceptance as an error
    #[serde(default)]
    pub reject_below_threshold: bool,

    /// Smallest single-shot word budget accepted
    #[serde(default = "default_min_target_word_count")]
    pub min_target_word_count: u32,

    /// Largest single-shot word budget accepted
    #[serde(default = "default_max_target_word_count")]
    pub max_target_word_count: u32,
}

fn default_quality_threshold() -> f64 {
    0.7
}

fn default_max_regenerations() -> u32 {
    1
}

fn default_max_workflow_retries() -> u32 {
    3
}

fn default_continuation_error_budget() -> usize {
    3
}

fn default_terminal_error_budget() -> usize {
    5
}

fn default_segment_word_count() -> u32 {
    250
}

fn default_continuity_tail_chars() -> usize {
    2000
}

fn default_max_transitions() -> u32 {
    256
}

fn default_min_target_word_count() -> u32 {
    50
}

fn default_max_target_word_count() -> u32 {
    5000
}

impl Default for WorkflowPolicy {
    fn default() -> Self {
        Self {
            quality_threshold: default_quality_threshold(),
            max_regenerations: default_max_regenerations(),
            max_workflow_retries: default_max_workflow_retries(),
            continuation_error_budget: default_continuation_error_budget(),
            terminal_error_budget: default_terminal_error_budget(),
            segment_word_count: default_segment_word_count(),
            continuity_tail_chars: default_continuity_tail_chars(),
            max_transitions: default_max_transitions(),
            reject_below_threshold: false,
            min_target_word_count: default_min_target_word_count(),
            max_target_word_count: default_max_target_word_count(),
        }
    }
}

/// Task orchestrator limits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrchestratorSettings {
    /// Workflow executions allowed to run at once
    #[serde(default = "default_max_concurrent_tasks")]
    pub max_concurrent_tasks: usize,
}

fn default_max_concurrent_tasks() -> usize {
    10
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            max_concurrent_tasks: default_max_concurrent_tasks(),
        }
    }
}

/// Top-level Fabula configuration.
///
/// # Example
///
/// ```no_run
/// use fabula_workflow::FabulaConfig;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let config = FabulaConfig::load()?;
/// println!("threshold: {}", config.workflow.quality_threshold);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct FabulaConfig {
    /// Workflow thresholds and budgets
    #[serde(default)]
    pub workflow: WorkflowPolicy,

    /// Orchestrator limits
    #[serde(default)]
    pub orchestrator: OrchestratorSettings,

    /// Per-role provider call settings, keyed by role name
    #[serde(default)]
    pub providers: BTreeMap<String, ProviderSettings>,
}

impl FabulaConfig {
    /// Load configuration from a specific file path, on top of the bundled defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed, or validated.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn from_file(path: impl AsRef<std::path::Path>) -> FabulaResult<Self> {
        debug!("Loading configuration from file");

        let builder = Config::builder()
            .add_source(File::from_str(DEFAULT_CONFIG, FileFormat::Toml))
            .add_source(File::from(path.as_ref()));
        Self::finish(builder)
    }

    /// Parse configuration from a TOML string, on top of the bundled defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the string cannot be parsed or validated.
    pub fn from_toml_str(toml: &str) -> FabulaResult<Self> {
        let builder = Config::builder()
            .add_source(File::from_str(DEFAULT_CONFIG, FileFormat::Toml))
            .add_source(File::from_str(toml, FileFormat::Toml));
        Self::finish(builder)
    }

    /// Load configuration with precedence: current dir > home dir > bundled defaults.
    ///
    /// User config files are optional and silently skipped if not found.
    ///
    /// # Errors
    ///
    /// Returns an error if a present file cannot be parsed or the merged
    /// values fail validation.
    #[instrument]
    pub fn load() -> FabulaResult<Self> {
        debug!("Loading configuration with precedence: current dir > home dir > bundled defaults");

        let mut builder =
            Config::builder().add_source(File::from_str(DEFAULT_CONFIG, FileFormat::Toml));

        if let Some(home) = dirs::home_dir() {
            let home_config = home.join(".config/fabula/fabula.toml");
            builder = builder.add_source(File::from(home_config).required(false));
        }

        builder = builder.add_source(File::with_name("fabula").required(false));

        Self::finish(builder)
    }

    fn finish(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> FabulaResult<Self> {
        let config: Self = builder
            .build()
            .map_err(|e| {
                FabulaError::from(ConfigError::new(format!(
                    "Failed to build configuration: {}",
                    e
                )))
            })?
            .try_deserialize()
            .map_err(|e| {
                FabulaError::from(ConfigError::new(format!(
                    "Failed to parse configuration: {}",
                    e
                )))
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] describing the first invalid value.
    pub fn validate(&self) -> FabulaResult<()> {
        let workflow = &self.workflow;
        if !(0.0..=1.0).contains(&workflow.quality_threshold) {
            return Err(ConfigError::new(format!(
                "workflow.quality_threshold must be within [0, 1], got {}",
                workflow.quality_threshold
            ))
            .into());
        }
        if workflow.min_target_word_count > workflow.max_target_word_count {
            return Err(ConfigError::new(format!(
                "workflow.min_target_word_count ({}) exceeds max_target_word_count ({})",
                workflow.min_target_word_count, workflow.max_target_word_count
            ))
            .into());
        }
        if workflow.segment_word_count == 0 {
            return Err(ConfigError::new("workflow.segment_word_count must be positive").into());
        }
        if workflow.max_transitions == 0 {
            return Err(ConfigError::new("workflow.max_transitions must be positive").into());
        }
        if self.orchestrator.max_concurrent_tasks == 0 {
            return Err(
                ConfigError::new("orchestrator.max_concurrent_tasks must be positive").into(),
            );
        }
        for (role, settings) in &self.providers {
            if role.parse::<AgentRole>().is_err() {
                return Err(ConfigError::new(format!("Unknown provider role: {}", role)).into());
            }
            if *settings.timeout_secs() == 0 {
                return Err(ConfigError::new(format!(
                    "providers.{}.timeout_secs must be positive",
                    role
                ))
                .into());
            }
        }
        Ok(())
    }

    /// Call settings for a role, falling back to the built-in role defaults.
    pub fn provider_settings(&self, role: AgentRole) -> ProviderSettings {
        self.providers
            .get(role.to_string().as_str())
            .copied()
            .unwrap_or_else(|| ProviderSettings::for_role(role))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bundled_defaults_match_code_defaults() {
        let config = FabulaConfig::from_toml_str("").unwrap();
        assert_eq!(config.workflow, WorkflowPolicy::default());
        assert_eq!(config.orchestrator, OrchestratorSettings::default());
        assert_eq!(
            config.provider_settings(AgentRole::Narrator),
            ProviderSettings::for_role(AgentRole::Narrator)
        );
    }

    #[test]
    fn test_validate_rejects_threshold_out_of_range() {
        let mut config = FabulaConfig::default();
        config.workflow.quality_threshold = 1.5;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("quality_threshold"));
    }

    #[test]
    fn test_validate_rejects_unknown_role() {
        let err = FabulaConfig::from_toml_str("[providers.poet]\ntimeout_secs = 5\n").unwrap_err();
        assert!(err.to_string().contains("poet"));
    }

    #[test]
    fn test_validate_rejects_inverted_word_bounds() {
        let mut config = FabulaConfig::default();
        config.workflow.min_target_word_count = 6000;
        assert!(config.validate().is_err());
    }
}
