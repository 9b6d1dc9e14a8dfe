//! Clustering orchestrator: scopes questions, selects a backend, groups,
//! builds, and hands complete cluster sets to the persistence collaborator.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use examlens_core::{
    ClusterResult, ClusterSink, ExamLensConfig, QuestionSource, QuestionView,
};
use serde::Serialize;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::builder::ClusterBuilder;
use crate::error::ClusterError;
use crate::grouping::group_components;
use crate::normalize::normalize_text;
use crate::similarity::SimilarityBackend;
use crate::state::ScopeState;

/// Cluster the questions of one (subject, module) scope.
///
/// Pure computation: no I/O, no shared state. Returns the complete
/// replacement cluster set for the scope, or a typed error when the input
/// breaks the engine's contract. An empty scope is a successful no-op.
pub fn cluster_scope(
    subject_id: Uuid,
    module_id: Option<Uuid>,
    questions: &[QuestionView],
    config: &ExamLensConfig,
) -> Result<ClusterResult, ClusterError> {
    cluster_scope_staged(subject_id, module_id, questions, config).map_err(|f| f.error)
}

/// A scope run that stopped before its clusters were complete.
#[derive(Debug, Clone, PartialEq)]
pub struct ScopeFailure {
    /// State the run was in when the error was raised.
    pub stage: ScopeState,
    pub error: ClusterError,
}

/// [`cluster_scope`], reporting the stage a failed run stopped at.
pub fn cluster_scope_staged(
    subject_id: Uuid,
    module_id: Option<Uuid>,
    questions: &[QuestionView],
    config: &ExamLensConfig,
) -> Result<ClusterResult, ScopeFailure> {
    let mut state = ScopeState::Idle;
    run_scope(&mut state, subject_id, module_id, questions, config).map_err(|error| {
        let stage = state;
        if !state.is_terminal() && state != ScopeState::Idle {
            // Loading, Grouping and Building may always move to Failed.
            let _ = state.advance(ScopeState::Failed);
        }
        ScopeFailure { stage, error }
    })
}

fn run_scope(
    state: &mut ScopeState,
    subject_id: Uuid,
    module_id: Option<Uuid>,
    questions: &[QuestionView],
    config: &ExamLensConfig,
) -> Result<ClusterResult, ClusterError> {
    state.advance(ScopeState::Loading)?;
    validate_scope(module_id, questions)?;

    state.advance(ScopeState::Grouping)?;
    let normalized: Vec<String> = questions.iter().map(|q| normalize_text(&q.raw_text)).collect();
    let (backend, mut warnings) = SimilarityBackend::select(questions, &normalized, &config.clustering)?;
    let groupable: Vec<bool> = normalized.iter().map(|t| !t.is_empty()).collect();
    for (q, _) in questions.iter().zip(&groupable).filter(|(_, ok)| !**ok) {
        warnings.push(format!(
            "question {} has no comparable text after normalization; kept as a singleton",
            q.id
        ));
    }
    for warning in &warnings {
        warn!(%subject_id, module_id = ?module_id, "{}", warning);
    }
    let threshold = backend.threshold(&config.clustering);
    let components = group_components(&backend, threshold, &groupable)?;

    state.advance(ScopeState::Building)?;
    let clusters = ClusterBuilder::new(subject_id, module_id, &config.clustering, &config.priority)
        .build(questions, &normalized, &backend, &components)?;

    state.advance(ScopeState::Persisted)?;
    info!(
        %subject_id,
        module_id = ?module_id,
        questions = questions.len(),
        clusters = clusters.len(),
        backend = backend.kind().as_str(),
        "Scope clustered"
    );

    Ok(ClusterResult {
        clusters,
        backend_used: backend.kind(),
        warnings,
    })
}

/// Reject input that would break partition or scope invariants.
fn validate_scope(module_id: Option<Uuid>, questions: &[QuestionView]) -> Result<(), ClusterError> {
    let mut seen = HashSet::with_capacity(questions.len());
    for q in questions {
        if q.raw_text.trim().is_empty() {
            return Err(ClusterError::PreconditionViolation(format!(
                "question {} has empty text",
                q.id
            )));
        }
        if q.module_id != module_id {
            return Err(ClusterError::PreconditionViolation(format!(
                "question {} belongs to module {:?}, not scope module {:?}",
                q.id, q.module_id, module_id
            )));
        }
        if !seen.insert(q.id) {
            return Err(ClusterError::PreconditionViolation(format!(
                "question {} appears more than once",
                q.id
            )));
        }
    }
    Ok(())
}

/// Split a subject's questions into per-module scopes, in module order.
///
/// Unclassified questions (`module_id = None`) form their own scope, which
/// sorts first.
pub fn partition_by_module(questions: Vec<QuestionView>) -> BTreeMap<Option<Uuid>, Vec<QuestionView>> {
    let mut scopes: BTreeMap<Option<Uuid>, Vec<QuestionView>> = BTreeMap::new();
    for q in questions {
        scopes.entry(q.module_id).or_default().push(q);
    }
    scopes
}

/// What happened to one scope during a subject run.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ScopeOutcome {
    /// Clusters were built and the stored set was replaced.
    Completed {
        module_id: Option<Uuid>,
        result: ClusterResult,
    },
    /// The scope failed; its previously stored clusters are untouched.
    ///
    /// `stage` is the state the run stopped in: `Persisted` when the sink
    /// rejected a complete set, `None` when the worker thread died.
    Failed {
        module_id: Option<Uuid>,
        stage: Option<ScopeState>,
        error: String,
    },
}

impl ScopeOutcome {
    pub fn module_id(&self) -> Option<Uuid> {
        match self {
            Self::Completed { module_id, .. } | Self::Failed { module_id, .. } => *module_id,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }

    /// Where a failed scope stopped; `None` for completed scopes.
    pub fn failed_stage(&self) -> Option<ScopeState> {
        match self {
            Self::Failed { stage, .. } => *stage,
            Self::Completed { .. } => None,
        }
    }
}

/// Summary of clustering every scope of a subject.
#[derive(Debug, Clone, Serialize)]
pub struct SubjectReport {
    pub subject_id: Uuid,
    pub outcomes: Vec<ScopeOutcome>,
}

impl SubjectReport {
    pub fn clusters_created(&self) -> usize {
        self.completed().map(|r| r.clusters.len()).sum()
    }

    pub fn questions_clustered(&self) -> usize {
        self.completed().map(ClusterResult::questions_clustered).sum()
    }

    pub fn failed_scopes(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_failed()).count()
    }

    fn completed(&self) -> impl Iterator<Item = &ClusterResult> {
        self.outcomes.iter().filter_map(|o| match o {
            ScopeOutcome::Completed { result, .. } => Some(result),
            ScopeOutcome::Failed { .. } => None,
        })
    }
}

/// Runs clustering for whole subjects against the storage collaborators.
#[derive(Debug, Clone)]
pub struct ClusteringService {
    config: Arc<ExamLensConfig>,
}

impl ClusteringService {
    /// Build a service over a validated configuration.
    ///
    /// Thresholds and display limits are checked here, so a run never
    /// starts with a NaN or zero threshold.
    pub fn new(config: ExamLensConfig) -> examlens_core::Result<Self> {
        config.validate()?;
        Ok(Self {
            config: Arc::new(config),
        })
    }

    pub fn config(&self) -> &ExamLensConfig {
        &self.config
    }

    /// Cluster a subject, one module at a time.
    ///
    /// With `module_id` set only that module is processed; otherwise every
    /// module (plus the unclassified scope) is, including stored modules that
    /// no longer have questions, which are replaced with an empty set. Each
    /// successful scope is persisted through `sink`; a failed scope leaves
    /// its stored clusters alone and does not stop the others. Only a failed
    /// fetch aborts the run.
    pub fn analyze<S, K>(
        &self,
        source: &S,
        sink: &K,
        subject_id: Uuid,
        module_id: Option<Uuid>,
    ) -> examlens_core::Result<SubjectReport>
    where
        S: QuestionSource + ?Sized,
        K: ClusterSink + ?Sized,
    {
        let scopes = self.load_scopes(source, sink, subject_id, module_id)?;
        let outcomes = scopes
            .into_iter()
            .map(|(scope_module, questions)| {
                let result = cluster_scope_staged(subject_id, scope_module, &questions, &self.config);
                persist(sink, subject_id, scope_module, result)
            })
            .collect();
        Ok(self.finish(subject_id, outcomes))
    }

    /// Like [`analyze`](Self::analyze), but clusters the modules in
    /// parallel on blocking worker threads. Results are still persisted one
    /// scope at a time, in module order.
    pub async fn analyze_concurrent<S, K>(
        &self,
        source: &S,
        sink: &K,
        subject_id: Uuid,
        module_id: Option<Uuid>,
    ) -> examlens_core::Result<SubjectReport>
    where
        S: QuestionSource + ?Sized,
        K: ClusterSink + ?Sized,
    {
        let scopes = self.load_scopes(source, sink, subject_id, module_id)?;

        let handles: Vec<_> = scopes
            .into_iter()
            .map(|(scope_module, questions)| {
                let config = Arc::clone(&self.config);
                let handle = tokio::task::spawn_blocking(move || {
                    cluster_scope_staged(subject_id, scope_module, &questions, &config)
                });
                (scope_module, handle)
            })
            .collect();

        let mut outcomes = Vec::with_capacity(handles.len());
        for (scope_module, handle) in handles {
            let outcome = match handle.await {
                Ok(result) => persist(sink, subject_id, scope_module, result),
                Err(e) => {
                    error!(%subject_id, module_id = ?scope_module, error = %e, "Clustering worker failed");
                    ScopeOutcome::Failed {
                        module_id: scope_module,
                        stage: None,
                        error: format!("worker failed: {}", e),
                    }
                }
            };
            outcomes.push(outcome);
        }
        Ok(self.finish(subject_id, outcomes))
    }

    fn load_scopes<S, K>(
        &self,
        source: &S,
        sink: &K,
        subject_id: Uuid,
        module_id: Option<Uuid>,
    ) -> examlens_core::Result<Vec<(Option<Uuid>, Vec<QuestionView>)>>
    where
        S: QuestionSource + ?Sized,
        K: ClusterSink + ?Sized,
    {
        let questions = source.fetch_questions(subject_id, module_id)?;
        info!(%subject_id, module_id = ?module_id, questions = questions.len(), "Loaded questions");
        if let Some(m) = module_id {
            return Ok(vec![(Some(m), questions)]);
        }

        let mut scopes = partition_by_module(questions);
        for stored in sink.stored_scopes(subject_id)? {
            scopes.entry(stored).or_insert_with(|| {
                debug!(%subject_id, module_id = ?stored, "Stored scope has no questions left");
                Vec::new()
            });
        }
        Ok(scopes.into_iter().collect())
    }

    fn finish(&self, subject_id: Uuid, outcomes: Vec<ScopeOutcome>) -> SubjectReport {
        let report = SubjectReport {
            subject_id,
            outcomes,
        };
        info!(
            %subject_id,
            scopes = report.outcomes.len(),
            clusters = report.clusters_created(),
            questions = report.questions_clustered(),
            failed = report.failed_scopes(),
            "Subject analysis complete"
        );
        report
    }
}

fn persist<K>(
    sink: &K,
    subject_id: Uuid,
    module_id: Option<Uuid>,
    result: Result<ClusterResult, ScopeFailure>,
) -> ScopeOutcome
where
    K: ClusterSink + ?Sized,
{
    let result = match result {
        Ok(result) => result,
        Err(ScopeFailure { stage, error: e }) => {
            error!(
                %subject_id,
                module_id = ?module_id,
                stage = stage.as_str(),
                error = %e,
                "Scope failed; stored clusters left unchanged"
            );
            return ScopeOutcome::Failed {
                module_id,
                stage: Some(stage),
                error: e.to_string(),
            };
        }
    };
    match sink.replace_clusters(subject_id, module_id, &result.clusters) {
        Ok(()) => ScopeOutcome::Completed { module_id, result },
        Err(e) => {
            error!(%subject_id, module_id = ?module_id, error = %e, "Failed to persist clusters");
            ScopeOutcome::Failed {
                module_id,
                stage: Some(ScopeState::Persisted),
                error: e.to_string(),
            }
        }
    }
}
