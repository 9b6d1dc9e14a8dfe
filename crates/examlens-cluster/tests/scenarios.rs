//! End-to-end clustering scenarios over in-memory collaborators.

use std::collections::BTreeMap;
use std::sync::Mutex;

use examlens_cluster::{cluster_scope, ClusterError, ClusteringService};
use examlens_core::{
    BackendKind, ClusterSink, ExamLensConfig, PriorityTier, QuestionSource, QuestionView,
    TopicClusterView,
};
use uuid::Uuid;

const SUBJECT: Uuid = Uuid::from_u128(0x5B);
const MODULE: Uuid = Uuid::from_u128(0x40);

fn question(n: u128, text: &str, year: &str) -> QuestionView {
    QuestionView::new(Uuid::from_u128(n), text)
        .with_module(MODULE)
        .with_year(year)
}

#[derive(Default)]
struct InMemory {
    questions: Vec<QuestionView>,
    clusters: Mutex<BTreeMap<Option<Uuid>, Vec<TopicClusterView>>>,
    replace_calls: Mutex<usize>,
}

impl QuestionSource for InMemory {
    fn fetch_questions(
        &self,
        _subject_id: Uuid,
        module_id: Option<Uuid>,
    ) -> examlens_core::Result<Vec<QuestionView>> {
        Ok(self
            .questions
            .iter()
            .filter(|q| module_id.is_none() || q.module_id == module_id)
            .cloned()
            .collect())
    }
}

impl ClusterSink for InMemory {
    fn replace_clusters(
        &self,
        _subject_id: Uuid,
        module_id: Option<Uuid>,
        clusters: &[TopicClusterView],
    ) -> examlens_core::Result<()> {
        *self.replace_calls.lock().unwrap() += 1;
        self.clusters.lock().unwrap().insert(module_id, clusters.to_vec());
        Ok(())
    }

    fn stored_scopes(&self, _subject_id: Uuid) -> examlens_core::Result<Vec<Option<Uuid>>> {
        Ok(self.clusters.lock().unwrap().keys().copied().collect())
    }
}

#[test]
fn low_overlap_questions_stay_separate() {
    let questions = vec![
        question(1, "Define entropy.", "2019"),
        question(2, "What is entropy?", "2020"),
        question(3, "Explain photosynthesis.", "2021"),
    ];
    let result = cluster_scope(SUBJECT, Some(MODULE), &questions, &ExamLensConfig::default()).unwrap();

    assert_eq!(result.backend_used, BackendKind::Keyword);
    assert_eq!(result.clusters.len(), 3);
    for cluster in &result.clusters {
        assert_eq!(cluster.question_count, 1);
        assert_eq!(cluster.priority_tier, PriorityTier::Tier4);
    }
}

#[test]
fn reworded_question_merges_into_pair() {
    let questions = vec![
        question(1, "Define entropy concept", "2019"),
        question(2, "Entropy concept definition", "2021"),
    ];
    let result = cluster_scope(SUBJECT, Some(MODULE), &questions, &ExamLensConfig::default()).unwrap();

    assert_eq!(result.clusters.len(), 1);
    let cluster = &result.clusters[0];
    assert_eq!(cluster.question_count, 2);
    assert_eq!(cluster.priority_tier, PriorityTier::Tier3);
    assert_eq!(cluster.member_ids, vec![Uuid::from_u128(1), Uuid::from_u128(2)]);
}

#[test]
fn marks_annotation_before_year_still_pairs() {
    let questions = vec![
        question(1, "Define entropy (5 marks) 2019", "2019"),
        question(2, "Define entropy (5 marks)", "2020"),
    ];
    let result = cluster_scope(SUBJECT, Some(MODULE), &questions, &ExamLensConfig::default()).unwrap();

    assert_eq!(result.clusters.len(), 1);
    assert_eq!(result.clusters[0].question_count, 2);
    assert_eq!(result.clusters[0].priority_tier, PriorityTier::Tier3);
    assert_eq!(result.clusters[0].representative_text, "define entropy");
}

#[test]
fn repeated_question_across_four_years_is_top_tier() {
    let questions = vec![
        question(1, "Q1. Define entropy. (5 marks)", "2019"),
        question(2, "Define entropy (5 marks)", "2020"),
        question(3, "q3) define   ENTROPY", "2021"),
        question(4, "Define entropy.", "2022"),
    ];
    let result = cluster_scope(SUBJECT, Some(MODULE), &questions, &ExamLensConfig::default()).unwrap();

    assert_eq!(result.clusters.len(), 1);
    let cluster = &result.clusters[0];
    assert_eq!(cluster.question_count, 4);
    assert_eq!(cluster.years_appeared, vec!["2019", "2020", "2021", "2022"]);
    assert_eq!(cluster.priority_tier, PriorityTier::Tier1);
    assert!(cluster.is_evergreen);
    assert_eq!(cluster.representative_text, "define entropy");
}

#[test]
fn stray_embedding_dimension_fails_without_touching_prior_clusters() {
    let mut questions: Vec<QuestionView> = (1..=5)
        .map(|n| question(n, "Define entropy", "2020").with_embedding(vec![0.1; 384]))
        .collect();
    questions.push(question(6, "Define entropy", "2021").with_embedding(vec![0.1; 128]));

    let err = cluster_scope(SUBJECT, Some(MODULE), &questions, &ExamLensConfig::default()).unwrap_err();
    assert!(matches!(err, ClusterError::BackendSelection(_)));

    let prior = cluster_scope(
        SUBJECT,
        Some(MODULE),
        &[question(99, "Explain photosynthesis", "2018")],
        &ExamLensConfig::default(),
    )
    .unwrap()
    .clusters;
    let store = InMemory {
        questions,
        ..Default::default()
    };
    store.clusters.lock().unwrap().insert(Some(MODULE), prior.clone());

    let report = ClusteringService::new(ExamLensConfig::default())
        .unwrap()
        .analyze(&store, &store, SUBJECT, Some(MODULE))
        .unwrap();

    assert_eq!(report.failed_scopes(), 1);
    assert_eq!(report.clusters_created(), 0);
    assert_eq!(*store.replace_calls.lock().unwrap(), 0);
    assert_eq!(store.clusters.lock().unwrap()[&Some(MODULE)], prior);
}

#[test]
fn embedding_backend_groups_by_cosine() {
    let mut config = ExamLensConfig::default();
    config.clustering.embedding_dim = Some(3);
    let questions = vec![
        question(1, "Define entropy", "2019").with_embedding(vec![1.0, 0.0, 0.0]),
        question(2, "Entropy, what is it", "2020").with_embedding(vec![0.95, 0.05, 0.0]),
        question(3, "Explain photosynthesis", "2021").with_embedding(vec![0.0, 0.0, 1.0]),
    ];
    let result = cluster_scope(SUBJECT, Some(MODULE), &questions, &config).unwrap();

    assert_eq!(result.backend_used, BackendKind::Embedding);
    assert_eq!(result.clusters.len(), 2);
    assert_eq!(result.clusters[0].question_count, 2);
}

#[test]
fn rerun_replaces_stored_set() {
    let store = InMemory {
        questions: vec![
            question(1, "Define entropy", "2019"),
            question(2, "Define entropy", "2020"),
        ],
        ..Default::default()
    };
    let service = ClusteringService::new(ExamLensConfig::default()).unwrap();
    service.analyze(&store, &store, SUBJECT, None).unwrap();
    service.analyze(&store, &store, SUBJECT, None).unwrap();

    let stored = store.clusters.lock().unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[&Some(MODULE)].len(), 1);
    assert_eq!(*store.replace_calls.lock().unwrap(), 2);
}
