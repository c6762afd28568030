//! Offline template providers.
//!
//! Deterministic stand-ins for every capability provider role. They build
//! their answers from the story context and the step inputs alone, so a
//! workflow can be run end to end without a model backend. The output is
//! plausible but formulaic; it exists to exercise the engine, not to write
//! fiction.

use async_trait::async_trait;
use fabula_core::{AgentRole, StoryContext, word_count};
use fabula_error::FabulaResult;
use fabula_interface::{CapabilityProvider, ProviderContext, ProviderSet};
use serde_json::{Value as JsonValue, json};
use std::sync::Arc;
use strum::IntoEnumIterator;

const BEATS: [&str; 8] = [
    "{who} paused at the edge of {where} and listened.",
    "Something in the air had changed since morning.",
    "{who} weighed what had been said against what had been left out.",
    "Far off, {where} answered with a sound nobody could name.",
    "It was not yet time to act, but it was close.",
    "A memory surfaced, sharp and unwelcome, then sank again.",
    "{who} counted the reasons to stay and found fewer than before.",
    "The light shifted, and {where} looked briefly like somewhere else.",
];

/// Longest passage a template narrator writes in one call.
const MAX_TEMPLATE_WORDS: usize = 300;

/// Score the template reviewer gives any non-empty content.
const TEMPLATE_SCORE: f64 = 0.8;

/// A deterministic provider for one role.
///
/// # Examples
///
/// ```
/// use fabula::TemplateProvider;
/// use fabula_core::AgentRole;
/// use fabula_interface::CapabilityProvider;
///
/// let provider = TemplateProvider::new(AgentRole::Narrator);
/// assert_eq!(provider.role(), AgentRole::Narrator);
/// assert_eq!(provider.name(), "template");
/// ```
#[derive(Debug, Clone, Copy)]
pub struct TemplateProvider {
    role: AgentRole,
}

impl TemplateProvider {
    /// Create a template provider for `role`.
    pub fn new(role: AgentRole) -> Self {
        Self { role }
    }

    fn plan(&self, context: &ProviderContext) -> JsonValue {
        let story = context.story_context();
        let mut agents = vec![
            AgentRole::ContinuityTracker.agent_name(),
            AgentRole::Narrator.agent_name(),
            AgentRole::Reviewer.agent_name(),
        ];
        if !story.world_elements().is_empty() {
            agents.push(AgentRole::WorldBuilder.agent_name());
        }
        let images = context
            .data()
            .get("include_images")
            .and_then(JsonValue::as_bool)
            .unwrap_or_else(|| story.images_enabled());
        if images {
            agents.push(AgentRole::VisualAnalyzer.agent_name());
        }
        json!({
            "agent_sequence": agents,
            "rationale": format!("template plan for {}", context.task_type()),
        })
    }

    fn narrate(&self, context: &ProviderContext) -> JsonValue {
        let story = context.story_context();
        let target = context
            .data()
            .get("target_word_count")
            .and_then(JsonValue::as_u64)
            .map_or(MAX_TEMPLATE_WORDS, |n| n as usize)
            .clamp(1, MAX_TEMPLATE_WORDS);
        let who = first_name(story.characters()).unwrap_or_else(|| "The traveler".to_string());
        let place = first_name(story.world_elements()).unwrap_or_else(|| "the old road".to_string());

        let offset = context
            .data()
            .get("segment_number")
            .and_then(JsonValue::as_u64)
            .unwrap_or(0) as usize;
        let mut sentences: Vec<String> = Vec::new();
        let lead = context.user_input().trim();
        if !lead.is_empty() {
            sentences.push(lead.to_string());
        }
        let mut words = sentences.iter().map(|s| word_count(s)).sum::<usize>();
        for beat in BEATS.iter().cycle().skip(offset % BEATS.len()) {
            if words >= target {
                break;
            }
            let sentence = beat.replace("{who}", &who).replace("{where}", &place);
            words += word_count(&sentence);
            sentences.push(sentence);
        }

        let content = sentences.join(" ");
        let scores: serde_json::Map<String, JsonValue> = character_names(story)
            .into_iter()
            .map(|name| (name, json!(1.0)))
            .collect();
        json!({
            "content": content,
            "word_count": word_count(&content),
            "character_consistency_scores": scores,
        })
    }

    fn review(&self, context: &ProviderContext) -> JsonValue {
        let content = context.data_str("content").unwrap_or_default();
        let words = word_count(content);
        let score = if words == 0 { 0.0 } else { TEMPLATE_SCORE };
        let suggestions: Vec<&str> = if words == 0 {
            vec!["write the passage"]
        } else {
            Vec::new()
        };
        json!({
            "quality_metrics": {
                "overall_quality_score": score,
                "word_count": words,
            },
            "improvement_suggestions": suggestions,
            "requires_human_review": false,
        })
    }

    fn build_world(&self, context: &ProviderContext) -> JsonValue {
        let elements: Vec<String> = context
            .story_context()
            .world_elements()
            .iter()
            .filter_map(name_of)
            .collect();
        json!({
            "setting_enhancements": {
                "elements": elements,
                "atmosphere": "unchanged",
            }
        })
    }

    fn analyze_visuals(&self, context: &ProviderContext) -> JsonValue {
        let content = context.data_str("content").unwrap_or_default();
        let scene = content
            .split_inclusive(['.', '!', '?'])
            .next()
            .unwrap_or(content)
            .trim();
        json!({
            "image_generation_prompt": format!("Illustration: {}", scene),
            "scene_elements": character_names(context.story_context()),
        })
    }

    fn track_continuity(&self, context: &ProviderContext) -> JsonValue {
        let content = context.data_str("content").unwrap_or_default();
        let last_sentence = content
            .trim_end()
            .rsplit_terminator(['.', '!', '?'])
            .next()
            .unwrap_or_default()
            .trim();
        json!({
            "continuation_context": {
                "last_sentence": last_sentence,
                "characters": character_names(context.story_context()),
                "word_count": word_count(content),
            }
        })
    }
}

#[async_trait]
impl CapabilityProvider for TemplateProvider {
    fn role(&self) -> AgentRole {
        self.role
    }

    fn name(&self) -> &str {
        "template"
    }

    #[tracing::instrument(skip(self, context), fields(role = %self.role, task_type = %context.task_type()))]
    async fn invoke(&self, context: &ProviderContext) -> FabulaResult<JsonValue> {
        let payload = match self.role {
            AgentRole::Planner => self.plan(context),
            AgentRole::Narrator => self.narrate(context),
            AgentRole::Reviewer => self.review(context),
            AgentRole::WorldBuilder => self.build_world(context),
            AgentRole::VisualAnalyzer => self.analyze_visuals(context),
            AgentRole::ContinuityTracker => self.track_continuity(context),
        };
        tracing::debug!("Template payload built");
        Ok(payload)
    }
}

/// A provider set with a [`TemplateProvider`] for every role.
///
/// # Errors
///
/// Never fails in practice; the result mirrors [`ProviderSet::builder`].
pub fn template_providers() -> FabulaResult<ProviderSet> {
    AgentRole::iter()
        .fold(ProviderSet::builder(), |builder, role| {
            builder.provider(Arc::new(TemplateProvider::new(role)))
        })
        .build()
}

fn name_of(value: &JsonValue) -> Option<String> {
    value.get("name").and_then(JsonValue::as_str).map(str::to_string)
}

fn first_name(values: &[JsonValue]) -> Option<String> {
    values.iter().find_map(name_of)
}

fn character_names(story: &StoryContext) -> Vec<String> {
    story.characters().iter().filter_map(name_of).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use fabula_core::TaskId;

    fn context(role: AgentRole, data: JsonValue) -> ProviderContext {
        let story = StoryContext::builder()
            .story_id("s1")
            .characters(vec![json!({"name": "Mara"})])
            .world_elements(vec![json!({"name": "the harbor"})])
            .build()
            .unwrap();
        ProviderContext::builder()
            .role(role)
            .task_id(TaskId::new("t"))
            .task_type("generate_content")
            .story_context(Arc::new(story))
            .data(data.as_object().cloned().unwrap_or_default())
            .build()
            .unwrap()
    }

    #[test]
    fn test_narrator_respects_word_budget() {
        let provider = TemplateProvider::new(AgentRole::Narrator);
        let payload = provider.narrate(&context(
            AgentRole::Narrator,
            json!({"target_word_count": 20}),
        ));
        let content = payload["content"].as_str().unwrap();
        assert!(content.starts_with("Mara paused at the edge of the harbor"));
        let words = word_count(content);
        assert!((20..=32).contains(&words), "got {words} words");
    }

    #[test]
    fn test_narrator_is_deterministic() {
        let provider = TemplateProvider::new(AgentRole::Narrator);
        let ctx = context(AgentRole::Narrator, json!({"segment_number": 2}));
        assert_eq!(provider.narrate(&ctx), provider.narrate(&ctx));
    }

    #[test]
    fn test_reviewer_fails_empty_content() {
        let provider = TemplateProvider::new(AgentRole::Reviewer);
        let payload = provider.review(&context(AgentRole::Reviewer, json!({"content": ""})));
        assert_eq!(payload["quality_metrics"]["overall_quality_score"], json!(0.0));
    }

    #[test]
    fn test_planner_requests_world_building_for_rich_stories() {
        let provider = TemplateProvider::new(AgentRole::Planner);
        let payload = provider.plan(&context(AgentRole::Planner, json!({"include_images": false})));
        let agents = payload["agent_sequence"].as_array().unwrap();
        assert!(agents.contains(&json!("world_building")));
        assert!(!agents.contains(&json!("visual_storytelling")));
    }

    #[test]
    fn test_continuity_keeps_last_sentence() {
        let provider = TemplateProvider::new(AgentRole::ContinuityTracker);
        let payload = provider.track_continuity(&context(
            AgentRole::ContinuityTracker,
            json!({"content": "The door opened. Nobody came in."}),
        ));
        assert_eq!(
            payload["continuation_context"]["last_sentence"],
            json!("Nobody came in")
        );
    }
}
