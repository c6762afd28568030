//! Tests for provider invocation and the provider set.

use async_trait::async_trait;
use fabula_core::{AgentRole, NarrativeOutput, StoryContext, TaskId};
use fabula_error::{FabulaResult, ProviderErrorKind, WorkflowError};
use fabula_interface::{
    CapabilityProvider, ProviderContext, ProviderSet, invoke_with_deadline,
};
use serde_json::{Value as JsonValue, json};
use std::sync::Arc;
use std::time::Duration;

struct EchoProvider {
    role: AgentRole,
    delay: Duration,
}

#[async_trait]
impl CapabilityProvider for EchoProvider {
    fn role(&self) -> AgentRole {
        self.role
    }

    fn name(&self) -> &str {
        "echo"
    }

    async fn invoke(&self, context: &ProviderContext) -> FabulaResult<JsonValue> {
        tokio::time::sleep(self.delay).await;
        Ok(json!({"content": context.user_input()}))
    }
}

struct BrokenProvider;

#[async_trait]
impl CapabilityProvider for BrokenProvider {
    fn role(&self) -> AgentRole {
        AgentRole::Narrator
    }

    fn name(&self) -> &str {
        "broken"
    }

    async fn invoke(&self, _context: &ProviderContext) -> FabulaResult<JsonValue> {
        Err(WorkflowError::validation("upstream rejected the request"))?
    }
}

fn context(role: AgentRole, input: &str) -> ProviderContext {
    ProviderContext::builder()
        .role(role)
        .task_id(TaskId::new("task-1"))
        .task_type("generate_content")
        .story_context(Arc::new(StoryContext::default()))
        .user_input(input)
        .build()
        .unwrap()
}

#[tokio::test]
async fn test_invoke_returns_payload_and_timing() {
    let provider = EchoProvider {
        role: AgentRole::Narrator,
        delay: Duration::from_millis(5),
    };
    let response = invoke_with_deadline(
        &provider,
        &context(AgentRole::Narrator, "once upon a time"),
        Duration::from_secs(1),
    )
    .await
    .unwrap();

    assert_eq!(*response.role(), AgentRole::Narrator);
    assert!(*response.execution_time() >= Duration::from_millis(5));
    let narrative: NarrativeOutput = response.parse().unwrap();
    assert_eq!(narrative.content, "once upon a time");
}

#[tokio::test]
async fn test_invoke_times_out() {
    let provider = EchoProvider {
        role: AgentRole::Reviewer,
        delay: Duration::from_millis(200),
    };
    let err = invoke_with_deadline(
        &provider,
        &context(AgentRole::Reviewer, ""),
        Duration::from_millis(10),
    )
    .await
    .unwrap_err();

    let provider_err = err.as_provider().expect("provider error");
    assert!(matches!(
        provider_err.kind,
        ProviderErrorKind::Timeout { after_ms: 10, .. }
    ));
}

#[tokio::test]
async fn test_invoke_wraps_foreign_errors_as_failed() {
    let err = invoke_with_deadline(
        &BrokenProvider,
        &context(AgentRole::Narrator, ""),
        Duration::from_secs(1),
    )
    .await
    .unwrap_err();

    let provider_err = err.as_provider().expect("provider error");
    match &provider_err.kind {
        ProviderErrorKind::Failed { role, message } => {
            assert_eq!(role, "narrator");
            assert!(message.contains("upstream rejected"));
        }
        other => panic!("unexpected kind: {other}"),
    }
}

#[tokio::test]
async fn test_parse_rejects_wrong_shape() {
    let provider = EchoProvider {
        role: AgentRole::Narrator,
        delay: Duration::ZERO,
    };
    let response = invoke_with_deadline(
        &provider,
        &context(AgentRole::Narrator, "text"),
        Duration::from_secs(1),
    )
    .await
    .unwrap();

    #[derive(Debug, serde::Deserialize)]
    #[allow(dead_code)]
    struct NeedsScore {
        score: f64,
    }

    let err = response.parse::<NeedsScore>().unwrap_err();
    assert!(matches!(
        err.as_provider().map(|e| &e.kind),
        Some(ProviderErrorKind::MalformedOutput { .. })
    ));
}

#[test]
fn test_provider_set_requires_every_role() {
    let err = ProviderSet::builder()
        .provider(Arc::new(EchoProvider {
            role: AgentRole::Narrator,
            delay: Duration::ZERO,
        }))
        .build()
        .unwrap_err();

    let message = err.to_string();
    assert!(message.contains("planner"));
    assert!(!message.contains("narrator,"));
}

#[test]
fn test_provider_set_lookup() {
    use strum::IntoEnumIterator;

    let set = AgentRole::iter()
        .fold(ProviderSet::builder(), |builder, role| {
            builder.provider(Arc::new(EchoProvider {
                role,
                delay: Duration::ZERO,
            }))
        })
        .build()
        .unwrap();

    assert_eq!(set.get(AgentRole::WorldBuilder).unwrap().role(), AgentRole::WorldBuilder);
}
