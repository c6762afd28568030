//! Fabula - narrative workflow orchestration
//!
//! Fabula drives story generation through a graph of capability providers
//! (planner, narrator, reviewer, world builder, visual analyzer, continuity
//! tracker). It supports two workflow shapes:
//!
//! - **Single-shot generation**: plan, write, review, optionally enrich, and
//!   finalize one passage.
//! - **Chapter continuation**: write a chapter segment by segment, gating
//!   each segment on quality, then assemble the chapter.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use fabula::{FabulaConfig, GenerationRequest, InMemoryTaskRepository, StoryContext,
//!     StoryOrchestrator, template_providers};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let orchestrator = StoryOrchestrator::new(
//!         template_providers()?,
//!         FabulaConfig::load()?,
//!         Arc::new(InMemoryTaskRepository::new()),
//!     );
//!
//!     let request = GenerationRequest::builder()
//!         .task_id("demo")
//!         .story_context(StoryContext::builder().story_id("harbor").build()?)
//!         .user_input("The ferry is late.")
//!         .build()?;
//!
//!     let result = orchestrator.run_generation(request).await?;
//!     println!("{}", result.content);
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! - `fabula_error` - Error types
//! - `fabula_core` - Story context, roles, payload views and results
//! - `fabula_interface` - Provider and task repository traits
//! - `fabula_workflow` - Workflow engine, routers, policies and orchestrator
//!
//! This crate re-exports everything and adds offline [`TemplateProvider`]s
//! plus logging setup for the `fabula` binary.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod observability;
mod template;

pub use fabula_core::*;
pub use fabula_error::*;
pub use fabula_interface::*;
pub use fabula_workflow::*;
pub use template::{TemplateProvider, template_providers};
