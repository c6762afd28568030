//! Layered configuration loading.

use fabula_core::AgentRole;
use fabula_error::FabulaErrorKind;
use fabula_workflow::{FabulaConfig, WorkflowPolicy};
use std::path::PathBuf;

fn write_temp_config(name: &str, contents: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!("fabula-{}-{}.toml", name, std::process::id()));
    std::fs::write(&path, contents).unwrap();
    path
}

#[test]
fn test_file_overrides_only_named_values() {
    let path = write_temp_config(
        "partial",
        r#"
[workflow]
quality_threshold = 0.8

[providers.narrator]
timeout_secs = 5
"#,
    );

    let config = FabulaConfig::from_file(&path).unwrap();
    std::fs::remove_file(&path).ok();

    assert_eq!(config.workflow.quality_threshold, 0.8);
    assert_eq!(config.workflow.max_regenerations, 1);
    assert_eq!(config.workflow.continuity_tail_chars, 2000);

    let narrator = config.provider_settings(AgentRole::Narrator);
    assert_eq!(*narrator.timeout_secs(), 5);
    assert_eq!(*narrator.max_tokens(), 3000);

    let reviewer = config.provider_settings(AgentRole::Reviewer);
    assert_eq!(*reviewer.timeout_secs(), 60);
}

#[test]
fn test_missing_file_is_a_config_error() {
    let path = std::env::temp_dir().join("fabula-does-not-exist.toml");
    let err = FabulaConfig::from_file(&path).unwrap_err();
    assert!(matches!(err.kind(), FabulaErrorKind::Config(_)));
}

#[test]
fn test_invalid_values_in_file_are_rejected() {
    let path = write_temp_config(
        "invalid",
        r#"
[orchestrator]
max_concurrent_tasks = 0
"#,
    );

    let err = FabulaConfig::from_file(&path).unwrap_err();
    std::fs::remove_file(&path).ok();
    assert!(err.to_string().contains("max_concurrent_tasks"));
}

#[test]
fn test_strict_quality_gate_from_toml() {
    let config = FabulaConfig::from_toml_str(
        r#"
[workflow]
reject_below_threshold = true
max_workflow_retries = 1
"#,
    )
    .unwrap();

    assert!(config.workflow.reject_below_threshold);
    assert_eq!(config.workflow.max_workflow_retries, 1);
    assert_eq!(
        config.workflow.quality_threshold,
        WorkflowPolicy::default().quality_threshold
    );
}

#[test]
fn test_malformed_toml_is_reported() {
    let err = FabulaConfig::from_toml_str("[workflow\nquality_threshold = ").unwrap_err();
    assert!(matches!(err.kind(), FabulaErrorKind::Config(_)));
}
