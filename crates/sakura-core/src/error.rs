// ── Error Types ──

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SakuraError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("storage error for key {key}: {reason}")]
    Storage { key: String, reason: String },

    #[error("upstream model request failed: {0}")]
    Upstream(String),

    #[error("model returned no response text")]
    EmptyResponse,

    #[error("model response does not match the analysis schema: {0}")]
    SchemaValidation(String),

    #[error("analysis was cancelled")]
    Cancelled,

    #[error("configuration error in {path}: {reason}")]
    Config { path: String, reason: String },
}

impl SakuraError {
    pub fn storage(key: &str, reason: impl ToString) -> Self {
        SakuraError::Storage {
            key: key.to_string(),
            reason: reason.to_string(),
        }
    }

    /// True for failures of the consultation round-trip, as opposed to
    /// local knowledge-base or configuration problems.
    pub fn is_analysis_failure(&self) -> bool {
        matches!(
            self,
            SakuraError::Upstream(_)
                | SakuraError::EmptyResponse
                | SakuraError::SchemaValidation(_)
                | SakuraError::Cancelled
        )
    }
}

pub type Result<T> = std::result::Result<T, SakuraError>;
