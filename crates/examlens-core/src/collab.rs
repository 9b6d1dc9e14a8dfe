//! Contracts for the collaborators the clustering engine depends on.
//!
//! The engine never talks to a database directly. The orchestrator pulls
//! questions through [`QuestionSource`] and hands finished cluster sets to
//! [`ClusterSink`]; `examlens-storage` provides the SQLite implementations.

use uuid::Uuid;

use crate::error::Result;
use crate::types::{QuestionView, TopicClusterView};

/// Read side: a stable snapshot of a subject's questions.
pub trait QuestionSource {
    /// Fetch questions for a subject.
    ///
    /// With `module_id = Some(m)` only module `m` is returned; with `None`
    /// every question of the subject is returned, classified or not.
    /// Implementations must return a consistent snapshot in a stable order.
    fn fetch_questions(&self, subject_id: Uuid, module_id: Option<Uuid>)
        -> Result<Vec<QuestionView>>;
}

/// Write side: atomic replacement of one scope's clusters.
pub trait ClusterSink {
    /// Modules of `subject_id` that currently hold stored clusters.
    ///
    /// `None` stands for the unclassified scope. A subject-wide run uses
    /// this to empty scopes whose questions have all moved elsewhere.
    fn stored_scopes(&self, subject_id: Uuid) -> Result<Vec<Option<Uuid>>>;

    /// Replace every cluster of the (subject, module) scope with `clusters`.
    ///
    /// `module_id = None` addresses the unclassified scope. The delete of
    /// the old set and the insert of the new one must be a single atomic
    /// operation, so readers never observe an empty scope mid-update.
    fn replace_clusters(
        &self,
        subject_id: Uuid,
        module_id: Option<Uuid>,
        clusters: &[TopicClusterView],
    ) -> Result<()>;
}
