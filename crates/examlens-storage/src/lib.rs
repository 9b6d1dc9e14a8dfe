//! ExamLens storage crate - SQLite persistence for questions and clusters.
//!
//! Provides a WAL-mode SQLite database with versioned migrations and the
//! repositories that implement the clustering engine's collaborator traits.

pub mod db;
pub mod migrations;
pub mod repository;

pub use db::Database;
pub use repository::{ClusterRepository, QuestionRepository};
