use super::PipelineStage;
use crate::campaign::ValidationError;
use crate::lm::GenerationError;

/// Failures surfaced by pipeline operations.
///
/// None of these discard stage results already recorded in the state.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Parameters rejected before any stage ran.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The generation call for `stage` failed; the state did not advance.
    #[error("{stage} stage failed: {source}")]
    Generation {
        stage: PipelineStage,
        #[source]
        source: GenerationError,
    },

    /// An operation was requested before its dependencies completed.
    #[error("precondition failed: {0}")]
    Precondition(String),
}

impl PipelineError {
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::Validation(_) => "validation",
            PipelineError::Generation { .. } => "generation",
            PipelineError::Precondition(_) => "precondition",
        }
    }

    /// Stage whose generation failed, if any.
    pub fn failed_stage(&self) -> Option<PipelineStage> {
        match self {
            PipelineError::Generation { stage, .. } => Some(*stage),
            _ => None,
        }
    }

    pub fn generation_error(&self) -> Option<&GenerationError> {
        match self {
            PipelineError::Generation { source, .. } => Some(source),
            _ => None,
        }
    }
}
