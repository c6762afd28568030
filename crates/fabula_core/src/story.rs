//! Story context supplied by the caller.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

/// Read-only snapshot of the story a task works on.
///
/// The caller assembles this from its own storage; every step hands it to
/// its provider unchanged.
///
/// # Examples
///
/// ```
/// use fabula_core::StoryContext;
/// use serde_json::json;
///
/// let context = StoryContext::builder()
///     .story_id("story-1")
///     .image_settings(json!({"enabled": true}).as_object().cloned().unwrap())
///     .build()
///     .unwrap();
///
/// assert!(context.images_enabled());
/// assert_eq!(context.story_id(), "story-1");
/// ```
#[derive(
    Debug,
    Clone,
    Default,
    PartialEq,
    Serialize,
    Deserialize,
    derive_builder::Builder,
    derive_getters::Getters,
)]
#[builder(setter(into), default)]
pub struct StoryContext {
    /// Story identifier.
    story_id: String,

    /// Chapter currently being written, if any.
    #[serde(default)]
    current_chapter_id: Option<String>,

    /// Title, genre, tone and other free-form metadata.
    #[serde(default)]
    story_metadata: Map<String, JsonValue>,

    /// Caller-level generation preferences.
    #[serde(default)]
    generation_settings: Map<String, JsonValue>,

    /// Image preferences; `enabled` switches visual steps on.
    #[serde(default)]
    image_settings: Map<String, JsonValue>,

    /// Character sheets.
    #[serde(default)]
    characters: Vec<JsonValue>,

    /// Locations, cultures and other world elements.
    #[serde(default)]
    world_elements: Vec<JsonValue>,

    /// Story text written so far.
    #[serde(default)]
    previous_content: Option<String>,

    /// Continuity summary produced by the previous invocation.
    #[serde(default)]
    continuation_context: Map<String, JsonValue>,
}

impl StoryContext {
    /// Creates a new story context builder.
    pub fn builder() -> StoryContextBuilder {
        StoryContextBuilder::default()
    }

    /// Whether the caller enabled image generation for this story.
    pub fn images_enabled(&self) -> bool {
        self.image_settings
            .get("enabled")
            .and_then(JsonValue::as_bool)
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_deserialize_minimal_context() {
        let context: StoryContext = serde_json::from_value(json!({"story_id": "s1"})).unwrap();
        assert_eq!(context.story_id(), "s1");
        assert!(context.characters().is_empty());
        assert!(!context.images_enabled());
    }

    #[test]
    fn test_images_enabled_requires_boolean_true() {
        let context: StoryContext = serde_json::from_value(json!({
            "story_id": "s1",
            "image_settings": {"enabled": "yes"}
        }))
        .unwrap();
        assert!(!context.images_enabled());
    }
}
