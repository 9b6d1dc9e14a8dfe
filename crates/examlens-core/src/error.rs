use thiserror::Error;

/// Top-level error type for ExamLens.
///
/// Subsystem crates define their own error types and implement
/// `From<SubsystemError> for ExamLensError` so that the `?` operator works
/// across crate boundaries.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ExamLensError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Clustering error: {0}")]
    Clustering(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<toml::de::Error> for ExamLensError {
    fn from(err: toml::de::Error) -> Self {
        ExamLensError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for ExamLensError {
    fn from(err: toml::ser::Error) -> Self {
        ExamLensError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for ExamLensError {
    fn from(err: serde_json::Error) -> Self {
        ExamLensError::Serialization(err.to_string())
    }
}

/// A specialized `Result` type for ExamLens operations.
pub type Result<T> = std::result::Result<T, ExamLensError>;
