//! Workflow orchestration engine for Fabula.
//!
//! A workflow execution repeatedly runs the handler of the current step,
//! which calls exactly one capability provider and folds its result into the
//! [`WorkflowState`], then asks the router for the next step. Two shapes are
//! provided:
//!
//! - [`GenerationWorkflow`]: single-shot generation with a quality gate,
//!   optional world building and visual analysis.
//! - [`ContinuationWorkflow`]: bounded segment-by-segment chapter
//!   continuation with per-segment quality gating.
//!
//! Both are driven by the [`WorkflowEngine`], and the [`StoryOrchestrator`]
//! runs many executions concurrently, one tokio task each.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod continuation;
mod engine;
mod finalizer;
mod generation;
mod in_memory_repository;
mod orchestrator;
mod policy;
mod request;
mod runtime;
mod state;
mod step;

pub use config::{FabulaConfig, OrchestratorSettings, WorkflowPolicy};
pub use continuation::{
    ContinuationWorkflow, route_continuation, segment_transitions, should_continue,
};
pub use engine::{StepMachine, WorkflowEngine};
pub use finalizer::assemble_chapter;
pub use generation::{GenerationWorkflow, route_generation};
pub use in_memory_repository::InMemoryTaskRepository;
pub use orchestrator::StoryOrchestrator;
pub use policy::{QualityGate, RecoveryPolicy};
pub use request::{
    ContinuationRequest, ContinuationRequestBuilder, GenerationRequest, GenerationRequestBuilder,
};
pub use runtime::WorkflowRuntime;
pub use state::{Recovery, StepOutputs, WorkflowMode, WorkflowState};
pub use step::{ContinuationStep, GenerationStep, StepTag};
