//! Error types for the conversational core

use thiserror::Error;

/// Errors produced by the context core and its collaborators
#[derive(Debug, Error)]
pub enum FolioError {
    /// Malformed symbol/weight syntax, empty input, unknown command
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A button referenced data that no longer (or never) existed
    #[error("no active comparison or portfolio context")]
    NoActiveContext,

    /// Stale or unknown portfolio identifier
    #[error("unknown identifier: {0}")]
    IdentifierNotFound(String),

    /// Analytics engine, chart renderer or AI service failure
    #[error("upstream service unavailable: {0}")]
    UpstreamUnavailable(String),

    /// Chat platform delivery failure
    #[error("platform error: {0}")]
    Platform(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),
}

/// Result type alias for core operations
pub type Result<T> = std::result::Result<T, FolioError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = FolioError::IdentifierNotFound("PF_7".to_string());
        assert_eq!(err.to_string(), "unknown identifier: PF_7");

        let err = FolioError::InvalidInput("empty input".to_string());
        assert_eq!(err.to_string(), "invalid input: empty input");
    }
}
