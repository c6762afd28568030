//! Fabula CLI binary.
//!
//! This binary runs Fabula workflows from the command line:
//! - Generate a single passage from a story context
//! - Continue a chapter segment by segment
//! - Inspect and validate configuration
//!
//! Workflows run against offline template providers.

use clap::Parser;
use fabula::observability::{ObservabilityConfig, init_observability_with_config};
use fabula::{
    ContinuationRequest, FabulaConfig, GenerationRequest, InMemoryTaskRepository,
    StoryOrchestrator, template_providers,
};
use std::sync::Arc;

mod cli;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    use cli::{Cli, Commands, await_task, handle_config_command, load_story, report, task_id};

    dotenvy::dotenv().ok();

    // Parse command-line arguments
    let cli = Cli::parse();

    // Initialize tracing
    let mut observability = ObservabilityConfig::default().with_json_logs(cli.json_logs);
    if cli.verbose {
        observability = observability.with_log_level("debug");
    }
    init_observability_with_config(observability)?;

    let config = match &cli.config {
        Some(path) => FabulaConfig::from_file(path)?,
        None => FabulaConfig::load()?,
    };

    match cli.command {
        Commands::Generate {
            story,
            input,
            mode,
            words,
            images,
            task_id: requested,
            format,
        } => {
            let request = GenerationRequest::builder()
                .task_id(task_id(requested))
                .story_context(load_story(story.as_deref())?)
                .user_input(input)
                .mode(mode)
                .target_word_count(words)
                .include_images(images)
                .build()?;

            let orchestrator = orchestrator(config)?;
            let id = orchestrator.start_generation(request).await?;
            report(await_task(&orchestrator, &id).await?, format)?;
        }

        Commands::Continue {
            story,
            previous,
            chapter_id,
            mode,
            segments,
            direction,
            task_id: requested,
            format,
        } => {
            let previous_content = std::fs::read_to_string(&previous).map_err(|e| {
                format!("Failed to read chapter text {}: {}", previous.display(), e)
            })?;
            let request = ContinuationRequest::builder()
                .task_id(task_id(requested))
                .story_context(load_story(story.as_deref())?)
                .chapter_id(chapter_id)
                .previous_content(previous_content)
                .user_direction(direction)
                .continuation_mode(mode)
                .target_segments(segments)
                .build()?;

            let orchestrator = orchestrator(config)?;
            let id = orchestrator.start_continuation(request).await?;
            report(await_task(&orchestrator, &id).await?, format)?;
        }

        Commands::Config(config_cmd) => {
            handle_config_command(config_cmd, &config)?;
        }
    }

    Ok(())
}

fn orchestrator(config: FabulaConfig) -> Result<StoryOrchestrator, Box<dyn std::error::Error>> {
    Ok(StoryOrchestrator::new(
        template_providers()?,
        config,
        Arc::new(InMemoryTaskRepository::new()),
    ))
}
