use thiserror::Error;

/// Errors surfaced by layer construction, network wiring and persistence.
///
/// Numeric edge cases (neurons that never fire, non-causal spike pairs) are
/// not errors and never produce one.
#[derive(Debug, Error)]
pub enum SpikeError {
    #[error("invalid configuration for `{field}`: {reason}")]
    InvalidConfig { field: &'static str, reason: String },

    #[error("shape mismatch in {context}: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        context: &'static str,
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    #[error("tensor `{0}` missing from model file")]
    MissingTensor(String),

    #[error(transparent)]
    Candle(#[from] candle_core::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),
}

pub type Result<T> = std::result::Result<T, SpikeError>;

impl SpikeError {
    pub(crate) fn config(field: &'static str, reason: impl Into<String>) -> Self {
        SpikeError::InvalidConfig {
            field,
            reason: reason.into(),
        }
    }
}
