use std::fmt;

use thiserror::Error;

/// Which of the two chained models an error came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Regression,
    Classification,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Regression => f.write_str("regression"),
            Stage::Classification => f.write_str("classification"),
        }
    }
}

/// Failure of a single model invocation.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("feature length mismatch: got {got}, expected {expected}")]
    ShapeMismatch { expected: usize, got: usize },

    #[error("unexpected model output: {0}")]
    InvalidOutput(String),

    #[cfg(feature = "torch")]
    #[error(transparent)]
    Torch(#[from] tch::TchError),
}

/// Everything a prediction request can fail with.
///
/// Only the HTTP boundary turns these into responses; nothing below it
/// swallows them.
#[derive(Debug, Error)]
pub enum PredictError {
    #[error("missing required field(s): {0}")]
    Validation(String),

    #[error("parking facility '{parking_name}' not found in city '{city}'")]
    FacilityNotFound { city: String, parking_name: String },

    #[error("{stage} model failed: {source}")]
    Prediction {
        stage: Stage,
        #[source]
        source: ModelError,
    },

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl PredictError {
    pub fn prediction(stage: Stage, source: ModelError) -> Self {
        PredictError::Prediction { stage, source }
    }

    /// True for errors caused by the caller's input.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            PredictError::Validation(_) | PredictError::FacilityNotFound { .. }
        )
    }
}
