//! Trait definitions for the Fabula story orchestration engine.
//!
//! This crate defines the seams between the workflow engine and its
//! collaborators: the capability providers a workflow calls, the bundle of
//! providers injected into an orchestrator, and the repository that keeps
//! task status for polling callers.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod provider;
mod provider_set;
mod settings;
mod task;

pub use provider::{
    CapabilityProvider, ProviderContext, ProviderContextBuilder, ProviderResponse,
    invoke_with_deadline,
};
pub use provider_set::{ProviderSet, ProviderSetBuilder};
pub use settings::ProviderSettings;
pub use task::{TaskKind, TaskRecord, TaskRepository, TaskSnapshot, TaskStatus};
