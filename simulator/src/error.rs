//! Error type shared by every generation stage.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum GenerationError {
    /// Invalid or mutually incompatible sampling parameters.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A bounded acceptance-rejection loop ran out of attempts.
    #[error("{stage} did not converge after {attempts} attempts")]
    NonConvergence { stage: &'static str, attempts: u32 },

    /// Covariate matrices are not square, symmetric or positive semi-definite.
    #[error("dimension mismatch: {0}")]
    DimensionMismatch(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, GenerationError>;

impl GenerationError {
    pub fn config(msg: impl Into<String>) -> Self {
        GenerationError::Configuration(msg.into())
    }
}
