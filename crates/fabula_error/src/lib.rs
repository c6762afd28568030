//! Error types for the Fabula story orchestration engine.
//!
//! This crate provides the foundation error types used throughout the Fabula workspace.
//!
//! # Error Hierarchy
//!
//! All errors follow the `ErrorKind` + wrapper struct pattern:
//! - `*ErrorKind` enum defines specific error conditions
//! - `*Error` struct wraps the kind with source location tracking
//! - All constructors use `#[track_caller]` for automatic location capture
//!
//! # Examples
//!
//! ```
//! use fabula_error::{FabulaResult, ConfigError};
//!
//! fn load() -> FabulaResult<String> {
//!     Err(ConfigError::new("quality_threshold must be within [0, 1]"))?
//! }
//!
//! match load() {
//!     Ok(data) => println!("Got: {}", data),
//!     Err(e) => eprintln!("Error: {}", e),
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod error;
mod json;
mod provider;
mod workflow;

pub use config::ConfigError;
pub use error::{FabulaError, FabulaErrorKind, FabulaResult};
pub use json::JsonError;
pub use provider::{ProviderError, ProviderErrorKind};
pub use workflow::{WorkflowError, WorkflowErrorKind};
