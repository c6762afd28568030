//! Capability provider roles.

use serde::{Deserialize, Serialize};

/// The role a capability provider plays in a workflow.
///
/// Each step handler calls exactly one role.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AgentRole {
    /// Plans which downstream steps run and in what order.
    Planner,
    /// Writes narrative content.
    Narrator,
    /// Scores content quality.
    Reviewer,
    /// Enriches setting and world details.
    WorldBuilder,
    /// Analyzes scenes for image prompts.
    VisualAnalyzer,
    /// Summarizes story state for the next invocation.
    ContinuityTracker,
}

impl AgentRole {
    /// Whether a failure of this role may fail the task.
    ///
    /// World building and visual analysis only ever produce warnings.
    pub fn is_critical(&self) -> bool {
        !matches!(self, Self::WorldBuilder | Self::VisualAnalyzer)
    }

    /// Agent name used by planners when listing an agent sequence.
    pub fn agent_name(&self) -> &'static str {
        match self {
            Self::Planner => "creative_director",
            Self::Narrator => "narrative_intelligence",
            Self::Reviewer => "quality_assurance",
            Self::WorldBuilder => "world_building",
            Self::VisualAnalyzer => "visual_storytelling",
            Self::ContinuityTracker => "continuation_context",
        }
    }

    /// Whether `name` refers to this role, by role name or agent name.
    pub fn matches_name(&self, name: &str) -> bool {
        name == self.agent_name() || name == self.to_string()
    }
}
