use examlens_core::ExamLensError;
use thiserror::Error;

/// Errors raised by the clustering engine.
///
/// All of them are input contract violations: the engine does no I/O, so
/// nothing here is transient or worth retrying.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ClusterError {
    #[error("backend selection failed: {0}")]
    BackendSelection(String),
    #[error("precondition violated: {0}")]
    PreconditionViolation(String),
    #[error("embedding dimension mismatch: {left} vs {right}")]
    DimensionMismatch { left: usize, right: usize },
}

impl From<ClusterError> for ExamLensError {
    fn from(err: ClusterError) -> Self {
        ExamLensError::Clustering(err.to_string())
    }
}
