//! Scripted capability providers for workflow tests.

#![allow(dead_code)]

use async_trait::async_trait;
use fabula_core::{AgentRole, StoryContext};
use fabula_error::{FabulaResult, ProviderError};
use fabula_interface::{CapabilityProvider, ProviderContext, ProviderSet};
use fabula_workflow::{FabulaConfig, InMemoryTaskRepository, StoryOrchestrator};
use serde_json::{Value as JsonValue, json};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// One scripted answer.
#[derive(Debug, Clone)]
pub enum Step {
    /// Return this payload.
    Reply(JsonValue),
    /// Fail with this message.
    Fail(String),
    /// Wait, then answer.
    Delay(Duration, Box<Step>),
}

type Responder = dyn Fn(&ProviderContext, usize) -> JsonValue + Send + Sync;

/// Provider that answers from a script, then from a default responder.
pub struct ScriptedProvider {
    role: AgentRole,
    script: Mutex<VecDeque<Step>>,
    fallback: Mutex<Option<Step>>,
    responder: Box<Responder>,
    contexts: Mutex<Vec<ProviderContext>>,
}

impl ScriptedProvider {
    pub fn new(
        role: AgentRole,
        responder: impl Fn(&ProviderContext, usize) -> JsonValue + Send + Sync + 'static,
    ) -> Self {
        Self {
            role,
            script: Mutex::new(VecDeque::new()),
            fallback: Mutex::new(None),
            responder: Box::new(responder),
            contexts: Mutex::new(Vec::new()),
        }
    }

    /// Queue scripted answers, used before the default responder.
    pub fn script(&self, steps: impl IntoIterator<Item = Step>) {
        self.script.lock().unwrap().extend(steps);
    }

    /// Answer every unscripted call with `step`.
    pub fn always(&self, step: Step) {
        *self.fallback.lock().unwrap() = Some(step);
    }

    /// Number of calls received.
    pub fn calls(&self) -> usize {
        self.contexts.lock().unwrap().len()
    }

    /// Contexts of every call received.
    pub fn contexts(&self) -> Vec<ProviderContext> {
        self.contexts.lock().unwrap().clone()
    }

    fn next_step(&self, context: &ProviderContext, call: usize) -> Step {
        if let Some(step) = self.script.lock().unwrap().pop_front() {
            return step;
        }
        if let Some(step) = self.fallback.lock().unwrap().clone() {
            return step;
        }
        Step::Reply((self.responder)(context, call))
    }
}

#[async_trait]
impl CapabilityProvider for ScriptedProvider {
    fn role(&self) -> AgentRole {
        self.role
    }

    fn name(&self) -> &str {
        "scripted"
    }

    async fn invoke(&self, context: &ProviderContext) -> FabulaResult<JsonValue> {
        let call = {
            let mut contexts = self.contexts.lock().unwrap();
            contexts.push(context.clone());
            contexts.len()
        };
        let mut step = self.next_step(context, call);
        loop {
            match step {
                Step::Reply(payload) => return Ok(payload),
                Step::Fail(message) => {
                    return Err(ProviderError::failed(self.role.to_string(), message).into());
                }
                Step::Delay(delay, then) => {
                    tokio::time::sleep(delay).await;
                    step = *then;
                }
            }
        }
    }
}

/// Reviewer reply with the given aggregate score.
pub fn score(value: f64) -> Step {
    Step::Reply(json!({
        "quality_metrics": {"overall_quality_score": value},
        "improvement_suggestions": ["tighten the pacing"],
        "requires_human_review": false
    }))
}

/// Handles to one scripted provider per role.
pub struct MockProviders {
    pub planner: Arc<ScriptedProvider>,
    pub narrator: Arc<ScriptedProvider>,
    pub reviewer: Arc<ScriptedProvider>,
    pub world_builder: Arc<ScriptedProvider>,
    pub visual_analyzer: Arc<ScriptedProvider>,
    pub continuity_tracker: Arc<ScriptedProvider>,
}

impl MockProviders {
    /// Providers that all succeed; the reviewer scores 0.85.
    pub fn healthy() -> Self {
        Self {
            planner: Arc::new(ScriptedProvider::new(AgentRole::Planner, |_, _| {
                json!({
                    "orchestration_plan": {
                        "workflow_plan": {
                            "agent_sequence": ["creative_director", "narrative_intelligence", "quality_assurance"]
                        }
                    }
                })
            })),
            narrator: Arc::new(ScriptedProvider::new(AgentRole::Narrator, |context, call| {
                let label = context
                    .data()
                    .get("segment_number")
                    .and_then(JsonValue::as_u64)
                    .map(|n| format!("Segment {n}"))
                    .unwrap_or_else(|| "Story".to_string());
                json!({
                    "content": format!("{label} draft {call} moves the plot forward."),
                    "character_consistency_scores": {"Mara": 0.9}
                })
            })),
            reviewer: Arc::new(ScriptedProvider::new(AgentRole::Reviewer, |_, _| {
                json!({
                    "quality_metrics": {"overall_quality_score": 0.85, "grammar_score": 0.9},
                    "improvement_suggestions": [],
                    "requires_human_review": false
                })
            })),
            world_builder: Arc::new(ScriptedProvider::new(AgentRole::WorldBuilder, |_, _| {
                json!({"setting_enhancements": {"weather": "fog"}})
            })),
            visual_analyzer: Arc::new(ScriptedProvider::new(AgentRole::VisualAnalyzer, |_, _| {
                json!({"image_generation_prompt": "a foggy harbor at dusk", "scene_elements": ["harbor", "fog"]})
            })),
            continuity_tracker: Arc::new(ScriptedProvider::new(
                AgentRole::ContinuityTracker,
                |context, _| {
                    let chars = context.data_str("content").map(str::len).unwrap_or(0);
                    json!({"continuation_context": {"summary": "Mara waits", "chars_seen": chars}})
                },
            )),
        }
    }

    /// Provider set wired to these mocks.
    pub fn set(&self) -> ProviderSet {
        ProviderSet::builder()
            .provider(self.planner.clone())
            .provider(self.narrator.clone())
            .provider(self.reviewer.clone())
            .provider(self.world_builder.clone())
            .provider(self.visual_analyzer.clone())
            .provider(self.continuity_tracker.clone())
            .build()
            .unwrap()
    }

    /// Orchestrator over these mocks with default configuration.
    pub fn orchestrator(&self) -> StoryOrchestrator {
        self.orchestrator_with(FabulaConfig::default())
    }

    /// Orchestrator over these mocks with the given configuration.
    pub fn orchestrator_with(&self, config: FabulaConfig) -> StoryOrchestrator {
        StoryOrchestrator::new(self.set(), config, Arc::new(InMemoryTaskRepository::new()))
    }
}

/// Story context with images switched on or off.
pub fn story(images: bool) -> StoryContext {
    StoryContext::builder()
        .story_id("story-1")
        .image_settings(json!({"enabled": images}).as_object().cloned().unwrap())
        .build()
        .unwrap()
}
