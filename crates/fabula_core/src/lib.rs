//! Core data types for the Fabula story orchestration engine.
//!
//! This crate provides the data types shared by the provider interface,
//! the workflow engine and its callers: the story context handed in by the
//! caller, agent roles and modes, typed views over provider payloads, and
//! the final results a workflow produces.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod mode;
mod payload;
mod result;
mod role;
mod story;
mod task;
mod text;

pub use mode::{ContinuationMode, GenerationMode};
pub use payload::{
    ContinuityOutput, NarrativeOutput, OrchestrationPlan, QualityAssessment, QualityMetrics,
    VisualOutput, WorldOutput,
};
pub use result::{
    ChapterMetadata, ChapterResult, FinalResult, GenerationMetadata, GenerationResult,
    QualityRecord, QualityVerdict, SegmentResult, VisualElements,
};
pub use role::AgentRole;
pub use story::{StoryContext, StoryContextBuilder};
pub use task::TaskId;
pub use text::{tail_chars, word_count};
