//! Generation and continuation modes.

use serde::{Deserialize, Serialize};

/// How a single-shot generation is steered.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum GenerationMode {
    /// The planner decides direction.
    #[default]
    AiGuided,
    /// The caller's input decides direction.
    UserGuided,
    /// Planner and caller input are blended.
    Collaborative,
}

/// How a chapter continuation proceeds between segments.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ContinuationMode {
    /// Keep generating segments until the target is reached.
    #[default]
    Seamless,
    /// Stop after every segment and wait for the caller's direction.
    UserGuided,
    /// Continue up to a chapter boundary.
    ChapterBreak,
}
