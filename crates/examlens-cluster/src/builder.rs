//! Turns connected components into topic cluster records.

use std::cmp::Reverse;
use std::collections::BTreeSet;
use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use examlens_core::config::{ClusteringConfig, PriorityConfig};
use examlens_core::{ClusterKind, ExamPart, QuestionView, TopicClusterView};
use regex::Regex;
use uuid::Uuid;

use crate::error::ClusterError;
use crate::similarity::SimilarityBackend;
use crate::tier::priority_tier;
use crate::topic::{topic_name, truncate_chars};

static YEAR_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(?:19|20)\d{2}\b").expect("valid year regex"));

/// Builds [`TopicClusterView`]s for one (subject, module) scope.
pub struct ClusterBuilder<'a> {
    subject_id: Uuid,
    module_id: Option<Uuid>,
    clustering: &'a ClusteringConfig,
    priority: &'a PriorityConfig,
}

impl<'a> ClusterBuilder<'a> {
    pub fn new(
        subject_id: Uuid,
        module_id: Option<Uuid>,
        clustering: &'a ClusteringConfig,
        priority: &'a PriorityConfig,
    ) -> Self {
        Self {
            subject_id,
            module_id,
            clustering,
            priority,
        }
    }

    /// Build one cluster per component.
    ///
    /// `questions`, `normalized` and `backend` are indexed alike. The result
    /// is ordered by priority tier, then size (largest first), then
    /// representative question id.
    pub fn build(
        &self,
        questions: &[QuestionView],
        normalized: &[String],
        backend: &SimilarityBackend<'_>,
        components: &[Vec<usize>],
    ) -> Result<Vec<TopicClusterView>, ClusterError> {
        let threshold = backend.threshold(self.clustering);
        let created_at = Utc::now();
        let mut clusters = components
            .iter()
            .map(|members| {
                self.build_one(questions, normalized, backend, threshold, members, created_at)
            })
            .collect::<Result<Vec<_>, _>>()?;

        clusters.sort_by_key(|c| {
            (
                c.priority_tier,
                Reverse(c.question_count),
                c.representative_question_id,
            )
        });
        Ok(clusters)
    }

    fn build_one(
        &self,
        questions: &[QuestionView],
        normalized: &[String],
        backend: &SimilarityBackend<'_>,
        threshold: f64,
        members: &[usize],
        created_at: DateTime<Utc>,
    ) -> Result<TopicClusterView, ClusterError> {
        let representative = representative_index(questions, members).ok_or_else(|| {
            ClusterError::PreconditionViolation("cannot build a cluster with no members".to_string())
        })?;
        let rep = &questions[representative];

        let representative_text = if normalized[representative].is_empty() {
            truncate_chars(rep.raw_text.trim(), self.clustering.representative_max_chars)
        } else {
            truncate_chars(&normalized[representative], self.clustering.representative_max_chars)
        };

        let mut member_ids: Vec<Uuid> = members.iter().map(|&i| questions[i].id).collect();
        member_ids.sort();

        let years: BTreeSet<String> = members
            .iter()
            .filter_map(|&i| questions[i].paper_year.as_deref())
            .map(str::trim)
            .filter(|y| !y.is_empty())
            .map(str::to_string)
            .collect();

        let paper_ids: BTreeSet<Uuid> = members.iter().filter_map(|&i| questions[i].paper_id).collect();

        let total_marks = members
            .iter()
            .filter_map(|&i| questions[i].marks)
            .fold(0u32, u32::saturating_add);
        let part_count = |part: ExamPart| {
            members
                .iter()
                .filter(|&&i| questions[i].part == Some(part))
                .count() as u32
        };

        let (min_similarity, avg_similarity) = pairwise_stats(backend, members)?;
        let kind = if avg_similarity >= self.clustering.duplicate_threshold {
            ClusterKind::Duplicate
        } else if avg_similarity >= threshold {
            ClusterKind::Similar
        } else {
            ClusterKind::Thematic
        };

        let priority_tier = priority_tier(members.len(), self.priority)?;
        let is_evergreen = members.len() >= self.priority.tier_2_min as usize
            && year_span(&years).is_some_and(|span| span > self.priority.recency_window_years);

        Ok(TopicClusterView {
            id: Uuid::new_v4(),
            subject_id: self.subject_id,
            module_id: self.module_id,
            kind,
            topic_name: topic_name(&rep.raw_text, self.clustering.topic_name_max_chars),
            representative_text,
            representative_question_id: rep.id,
            member_ids,
            question_count: members.len() as u32,
            frequency_count: years.len() as u32,
            years_appeared: years.into_iter().collect(),
            paper_ids: paper_ids.into_iter().collect(),
            total_marks,
            part_a_count: part_count(ExamPart::A),
            part_b_count: part_count(ExamPart::B),
            min_similarity,
            avg_similarity,
            priority_tier,
            is_evergreen,
            created_at,
        })
    }
}

/// Member with the longest raw text; ties go to the lowest question id.
fn representative_index(questions: &[QuestionView], members: &[usize]) -> Option<usize> {
    members.iter().copied().max_by(|&a, &b| {
        let (qa, qb) = (&questions[a], &questions[b]);
        qa.raw_text
            .chars()
            .count()
            .cmp(&qb.raw_text.chars().count())
            .then_with(|| qb.id.cmp(&qa.id))
    })
}

/// Minimum and mean similarity over all member pairs.
///
/// Re-scored here because union-find keeps no edge weights. A singleton
/// has both values fixed at 1.0.
fn pairwise_stats(
    backend: &SimilarityBackend<'_>,
    members: &[usize],
) -> Result<(f64, f64), ClusterError> {
    if members.len() < 2 {
        return Ok((1.0, 1.0));
    }
    let mut min = f64::INFINITY;
    let mut sum = 0.0;
    let mut pairs = 0usize;
    for (pos, &i) in members.iter().enumerate() {
        for &j in &members[pos + 1..] {
            let score = backend.similarity(i, j)?;
            min = min.min(score);
            sum += score;
            pairs += 1;
        }
    }
    Ok((min, sum / pairs as f64))
}

/// Years between the earliest and latest parseable year label.
fn year_span(labels: &BTreeSet<String>) -> Option<u32> {
    let years: Vec<u32> = labels
        .iter()
        .filter_map(|label| YEAR_NUMBER.find(label))
        .filter_map(|m| m.as_str().parse().ok())
        .collect();
    let min = years.iter().min()?;
    let max = years.iter().max()?;
    Some(max - min)
}
