//! Error types for Kanon operations

use crate::outcome::ParseIssue;

/// Result type for Kanon operations
pub type Result<T> = std::result::Result<T, KanonError>;

/// Error types for the Kanon library surface
#[derive(Debug, thiserror::Error)]
pub enum KanonError {
    /// Every extraction strategy rejected the input and the string
    /// fallback was disabled
    #[error("no JSON value could be recovered from the response")]
    ExtractionFailed,

    /// Recursion limit reached while extracting or coercing
    #[error("recursion depth limit of {0} exceeded")]
    DepthExceeded(usize),

    /// The coerced value still carries validation issues
    #[error("value does not conform to the schema ({} issue(s))", .0.len())]
    Validation(Vec<ParseIssue>),

    /// Deserializing the coerced value into a caller type failed
    #[error("typed decode error: {0}")]
    Decode(#[from] serde_json::Error),

    /// Schema definition problem (bad schema file, unknown construct)
    #[error("schema error: {0}")]
    Schema(String),
}

impl KanonError {
    /// Validation issues carried by this error, if any
    pub fn issues(&self) -> &[ParseIssue] {
        match self {
            KanonError::Validation(issues) => issues,
            _ => &[],
        }
    }
}
