pub mod collab;
pub mod config;
pub mod error;
pub mod types;

pub use collab::{ClusterSink, QuestionSource};
pub use config::ExamLensConfig;
pub use error::{ExamLensError, Result};
pub use types::*;
