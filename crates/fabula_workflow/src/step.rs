//! Step identifiers of the two workflow shapes.

use std::fmt::{Debug, Display};

/// A closed set of named steps with a fixed entry and terminal step.
pub trait StepTag: Copy + Eq + Debug + Display + Send + Sync + 'static {
    /// First step of every execution (and of every whole-workflow retry).
    const ENTRY: Self;
    /// Terminal marker; never executed.
    const END: Self;

    /// Step name as used in logs and diagnostics.
    fn name(&self) -> &'static str;
}

/// Steps of a single-shot generation.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    strum::Display,
    strum::EnumIter,
    strum::IntoStaticStr,
)]
#[strum(serialize_all = "snake_case")]
pub enum GenerationStep {
    /// Plan downstream steps.
    Orchestrate,
    /// Derive continuity context.
    AnalyzeContext,
    /// Enrich the setting before writing.
    EnhanceWorld,
    /// Write the content.
    GenerateNarrative,
    /// Score the content.
    CheckQuality,
    /// Analyze the content for image prompts.
    GenerateVisuals,
    /// Assemble the result.
    FinalizeOutput,
    /// Decide how to recover from a failure.
    HandleError,
    /// Terminal marker.
    End,
}

impl StepTag for GenerationStep {
    const ENTRY: Self = Self::Orchestrate;
    const END: Self = Self::End;

    fn name(&self) -> &'static str {
        self.into()
    }
}

/// Steps of a chapter continuation.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    strum::Display,
    strum::EnumIter,
    strum::IntoStaticStr,
)]
#[strum(serialize_all = "snake_case")]
pub enum ContinuationStep {
    /// Summarize the story so far.
    AnalyzeContinuationContext,
    /// Plan the continuation.
    PlanContinuation,
    /// Write one segment.
    GenerateSegment,
    /// Score the pending segment.
    CheckSegmentQuality,
    /// Fold the segment into the world state.
    UpdateWorldContext,
    /// Analyze the segment for image prompts.
    GenerateSegmentVisuals,
    /// Accept the segment and advance the counter.
    EvaluateContinuation,
    /// Assemble the chapter.
    FinalizeChapter,
    /// Decide how to recover from a failure.
    HandleContinuationError,
    /// Terminal marker.
    End,
}

impl StepTag for ContinuationStep {
    const ENTRY: Self = Self::AnalyzeContinuationContext;
    const END: Self = Self::End;

    fn name(&self) -> &'static str {
        self.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_names_are_snake_case() {
        assert_eq!(GenerationStep::GenerateNarrative.name(), "generate_narrative");
        assert_eq!(
            ContinuationStep::HandleContinuationError.to_string(),
            "handle_continuation_error"
        );
    }
}
