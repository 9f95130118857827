//! Engine error kinds.
//!
//! Every error is a rejected operation: it is raised before any history is
//! touched, and nothing is retried internally.

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EngineError {
    /// Score out of range, non-monotonic attempt timestamp, or a config
    /// value outside its allowed range.
    #[error("validation error: {0}")]
    Validation(String),
    /// Negative age or a timestamp in the future of the evaluation instant.
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

pub type EngineResult<T> = Result<T, EngineError>;
