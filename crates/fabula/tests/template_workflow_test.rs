//! End-to-end runs against the offline template providers.

use fabula::{
    ContinuationMode, ContinuationRequest, FabulaConfig, FinalResult, GenerationMode,
    GenerationRequest, InMemoryTaskRepository, StoryContext, StoryOrchestrator, TaskStatus,
    template_providers, word_count,
};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

fn orchestrator() -> StoryOrchestrator {
    StoryOrchestrator::new(
        template_providers().unwrap(),
        FabulaConfig::default(),
        Arc::new(InMemoryTaskRepository::new()),
    )
}

fn story() -> StoryContext {
    StoryContext::builder()
        .story_id("harbor")
        .characters(vec![json!({"name": "Mara", "role": "pilot"})])
        .world_elements(vec![json!({"name": "the harbor", "kind": "location"})])
        .image_settings(json!({"enabled": true}).as_object().cloned().unwrap())
        .build()
        .unwrap()
}

#[tokio::test]
async fn test_template_generation_runs_every_step() {
    let request = GenerationRequest::builder()
        .task_id("gen-template")
        .story_context(story())
        .user_input("The ferry is late.")
        .mode(GenerationMode::Collaborative)
        .target_word_count(120u32)
        .include_images(true)
        .build()
        .unwrap();

    let result = orchestrator().run_generation(request).await.unwrap();

    assert!(result.content.starts_with("The ferry is late. "));
    assert!(result.content.contains("Mara"));
    assert_eq!(result.word_count, word_count(&result.content));
    assert!(result.errors.is_empty());
    assert!(result.warnings.is_empty());
    assert!(result.world_enhancements.is_some());
    let visuals = result.visual_elements.expect("visual elements");
    assert!(visuals.image_prompt.starts_with("Illustration: The ferry is late."));
    assert_eq!(
        result.metadata.completed_steps,
        vec![
            "orchestrate",
            "analyze_context",
            "enhance_world",
            "generate_narrative",
            "check_quality",
            "generate_visuals",
            "finalize_output",
        ]
    );
}

#[tokio::test]
async fn test_template_continuation_through_task_api() {
    let orchestrator = orchestrator();
    let request = ContinuationRequest::builder()
        .task_id("cont-template")
        .story_context(story())
        .chapter_id("chapter-2")
        .previous_content("The harbor lights went out one by one.")
        .continuation_mode(ContinuationMode::Seamless)
        .target_segments(3u32)
        .build()
        .unwrap();

    let task_id = orchestrator.start_continuation(request).await.unwrap();
    let mut snapshot = orchestrator.get_result(&task_id).await.unwrap();
    for _ in 0..200 {
        if snapshot.status.is_terminal() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
        snapshot = orchestrator.get_result(&task_id).await.unwrap();
    }

    assert_eq!(snapshot.status, TaskStatus::Completed);
    let Some(FinalResult::Chapter(chapter)) = snapshot.result else {
        panic!("expected a chapter result");
    };
    assert_eq!(chapter.segments_generated(), 3);
    assert!(chapter.content.starts_with("The harbor lights went out one by one.\n\n"));
    assert_eq!(chapter.visual_generations.len(), 3);
    assert_eq!(chapter.world_updates.len(), 3);
    assert!(chapter.continuation_context.is_some());
}

#[tokio::test]
async fn test_template_runs_are_deterministic() {
    let request = || {
        GenerationRequest::builder()
            .task_id("gen-repeat")
            .story_context(story())
            .target_word_count(80u32)
            .build()
            .unwrap()
    };

    let first = orchestrator().run_generation(request()).await.unwrap();
    let second = orchestrator().run_generation(request()).await.unwrap();
    assert_eq!(first.content, second.content);
}
