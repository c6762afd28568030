//! Workflow command handlers.

use super::OutputFormat;
use fabula::{
    ChapterResult, FinalResult, GenerationResult, JsonError, StoryContext, StoryOrchestrator,
    TaskId, TaskSnapshot, TaskStatus,
};
use std::error::Error;
use std::path::Path;
use std::time::Duration;

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Read a story context from a JSON file, or use an empty story.
pub fn load_story(path: Option<&Path>) -> Result<StoryContext, Box<dyn Error>> {
    let Some(path) = path else {
        tracing::debug!("No story file given, using an empty story");
        return Ok(StoryContext::builder().story_id("cli").build()?);
    };
    tracing::info!(path = %path.display(), "Loading story context");
    let text = std::fs::read_to_string(path)
        .map_err(|e| format!("Failed to read story file {}: {}", path.display(), e))?;
    let story = serde_json::from_str(&text)
        .map_err(|e| JsonError::new(format!("Invalid story context in {}: {}", path.display(), e)))?;
    Ok(story)
}

/// Task id from the command line, or a generated one.
pub fn task_id(requested: Option<String>) -> TaskId {
    requested.map(TaskId::from).unwrap_or_else(TaskId::generate)
}

/// Wait for a submitted task, cancelling it on CTRL+C.
#[tracing::instrument(skip(orchestrator), fields(task_id = %task_id))]
pub async fn await_task(
    orchestrator: &StoryOrchestrator,
    task_id: &TaskId,
) -> Result<TaskSnapshot, Box<dyn Error>> {
    let interrupt = tokio::signal::ctrl_c();
    tokio::pin!(interrupt);
    let mut cancelling = false;

    loop {
        let snapshot = orchestrator.take_result(task_id).await?;
        if snapshot.status.is_terminal() {
            return Ok(snapshot);
        }
        tokio::select! {
            _ = &mut interrupt, if !cancelling => {
                tracing::warn!("Interrupt received, cancelling task");
                orchestrator.cancel(task_id).await?;
                cancelling = true;
            }
            _ = tokio::time::sleep(POLL_INTERVAL) => {}
        }
    }
}

/// Print a finished task, or turn a failed one into an error.
pub fn report(snapshot: TaskSnapshot, format: OutputFormat) -> Result<(), Box<dyn Error>> {
    match (snapshot.status, snapshot.result) {
        (TaskStatus::Completed, Some(result)) => {
            match format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&result)?),
                OutputFormat::Human => match &result {
                    FinalResult::Generation(generation) => print_generation(generation),
                    FinalResult::Chapter(chapter) => print_chapter(chapter),
                },
            }
            Ok(())
        }
        (status, _) => {
            for error in &snapshot.errors {
                eprintln!("error: {}", error);
            }
            Err(format!("Task {} ended as {}", snapshot.task_id, status).into())
        }
    }
}

fn print_generation(result: &GenerationResult) {
    println!("{}", result.content);
    println!();
    println!("--- {} words", result.word_count);
    if let Some(score) = result.quality_metrics.overall_quality_score {
        println!("--- quality {:.2}", score);
    }
    if let Some(visuals) = &result.visual_elements {
        println!("--- image prompt: {}", visuals.image_prompt);
    }
    print_notes(&result.warnings, &result.errors);
}

fn print_chapter(result: &ChapterResult) {
    println!("{}", result.content);
    println!();
    println!(
        "--- {} words, {} of {} segments",
        result.word_count,
        result.segments_generated(),
        result.metadata.target_segments
    );
    if !result.metadata.chapter_complete {
        println!("--- chapter incomplete");
    }
    print_notes(&result.warnings, &result.errors);
}

fn print_notes(warnings: &[String], errors: &[String]) {
    for warning in warnings {
        println!("warning: {}", warning);
    }
    for error in errors {
        println!("error: {}", error);
    }
}
