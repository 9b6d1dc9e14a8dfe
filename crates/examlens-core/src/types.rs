use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Which half of an exam paper a question was printed in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExamPart {
    /// Short-answer section.
    A,
    /// Long-answer section.
    B,
}

impl ExamPart {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::A => "A",
            Self::B => "B",
        }
    }

    /// Parse a part label, accepting either case.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "A" | "a" => Some(Self::A),
            "B" | "b" => Some(Self::B),
            _ => None,
        }
    }
}

/// A previously-extracted exam question, as handed to the clustering engine.
///
/// Supplied by the extraction/persistence layer. The engine never mutates it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct QuestionView {
    pub id: Uuid,
    /// Owning module; `None` for questions that were never classified.
    pub module_id: Option<Uuid>,
    pub raw_text: String,
    /// Pre-computed dense embedding (e.g. 384 floats), if the provider ran.
    pub embedding: Option<Vec<f32>>,
    pub marks: Option<u32>,
    pub paper_id: Option<Uuid>,
    /// Year label of the source paper ("2019", "Dec 2021", ...).
    pub paper_year: Option<String>,
    pub part: Option<ExamPart>,
    pub question_number: Option<String>,
}

impl QuestionView {
    pub fn new(id: Uuid, raw_text: impl Into<String>) -> Self {
        Self {
            id,
            module_id: None,
            raw_text: raw_text.into(),
            embedding: None,
            marks: None,
            paper_id: None,
            paper_year: None,
            part: None,
            question_number: None,
        }
    }

    pub fn with_module(mut self, module_id: Uuid) -> Self {
        self.module_id = Some(module_id);
        self
    }

    pub fn with_year(mut self, year: impl Into<String>) -> Self {
        self.paper_year = Some(year.into());
        self
    }

    pub fn with_paper(mut self, paper_id: Uuid) -> Self {
        self.paper_id = Some(paper_id);
        self
    }

    pub fn with_marks(mut self, marks: u32) -> Self {
        self.marks = Some(marks);
        self
    }

    pub fn with_part(mut self, part: ExamPart) -> Self {
        self.part = Some(part);
        self
    }

    pub fn with_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = Some(embedding);
        self
    }
}

/// A question together with the subject it belongs to.
///
/// This is the import/storage shape; the engine itself only sees
/// [`QuestionView`]s already scoped to one subject.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct QuestionRecord {
    pub subject_id: Uuid,
    #[serde(flatten)]
    pub question: QuestionView,
}

/// Ordinal study priority derived from how often a topic recurs.
///
/// `Tier1` is the most urgent; variants order from most to least urgent.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PriorityTier {
    /// Appeared 4+ times.
    #[serde(rename = "tier_1")]
    Tier1,
    /// Appeared 3 times.
    #[serde(rename = "tier_2")]
    Tier2,
    /// Appeared twice.
    #[serde(rename = "tier_3")]
    Tier3,
    /// Appeared once.
    #[serde(rename = "tier_4")]
    Tier4,
}

impl PriorityTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Tier1 => "tier_1",
            Self::Tier2 => "tier_2",
            Self::Tier3 => "tier_3",
            Self::Tier4 => "tier_4",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "tier_1" => Some(Self::Tier1),
            "tier_2" => Some(Self::Tier2),
            "tier_3" => Some(Self::Tier3),
            "tier_4" => Some(Self::Tier4),
            _ => None,
        }
    }

    /// Numeric level, 1 (top) through 4 (low).
    pub fn level(&self) -> u8 {
        match self {
            Self::Tier1 => 1,
            Self::Tier2 => 2,
            Self::Tier3 => 3,
            Self::Tier4 => 4,
        }
    }

    /// Human-readable label shown in reports.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Tier1 => "Top Priority",
            Self::Tier2 => "High Priority",
            Self::Tier3 => "Medium Priority",
            Self::Tier4 => "Low Priority",
        }
    }
}

/// How tightly the members of a cluster match each other.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClusterKind {
    /// Average pairwise similarity at or above the duplicate cutoff.
    Duplicate,
    /// Average pairwise similarity at or above the backend threshold.
    Similar,
    /// Transitively linked members whose average falls below the threshold.
    Thematic,
}

impl ClusterKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Duplicate => "duplicate",
            Self::Similar => "similar",
            Self::Thematic => "thematic",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "duplicate" => Some(Self::Duplicate),
            "similar" => Some(Self::Similar),
            "thematic" => Some(Self::Thematic),
            _ => None,
        }
    }
}

/// Similarity strategy used for a scope.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// Jaccard overlap of extracted keyword sets.
    Keyword,
    /// Cosine similarity of pre-computed embeddings.
    Embedding,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Keyword => "keyword",
            Self::Embedding => "embedding",
        }
    }
}

/// A group of recurring questions within one (subject, module) scope.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TopicClusterView {
    pub id: Uuid,
    pub subject_id: Uuid,
    pub module_id: Option<Uuid>,
    pub kind: ClusterKind,
    pub topic_name: String,
    pub representative_text: String,
    pub representative_question_id: Uuid,
    /// Member question ids, sorted ascending.
    pub member_ids: Vec<Uuid>,
    pub question_count: u32,
    /// Distinct year labels, sorted.
    pub years_appeared: Vec<String>,
    /// Number of distinct years.
    pub frequency_count: u32,
    /// Distinct source papers, sorted.
    pub paper_ids: Vec<Uuid>,
    pub total_marks: u32,
    pub part_a_count: u32,
    pub part_b_count: u32,
    pub min_similarity: f64,
    pub avg_similarity: f64,
    pub priority_tier: PriorityTier,
    pub is_evergreen: bool,
    pub created_at: DateTime<Utc>,
}

/// Outcome of clustering one scope.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClusterResult {
    pub clusters: Vec<TopicClusterView>,
    pub backend_used: BackendKind,
    pub warnings: Vec<String>,
}

impl ClusterResult {
    /// Total number of questions across all clusters.
    pub fn questions_clustered(&self) -> usize {
        self.clusters.iter().map(|c| c.member_ids.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priority_tier_ordering() {
        assert!(PriorityTier::Tier1 < PriorityTier::Tier2);
        assert!(PriorityTier::Tier2 < PriorityTier::Tier3);
        assert!(PriorityTier::Tier3 < PriorityTier::Tier4);
    }

    #[test]
    fn test_priority_tier_parse_as_str_roundtrip() {
        for tier in [
            PriorityTier::Tier1,
            PriorityTier::Tier2,
            PriorityTier::Tier3,
            PriorityTier::Tier4,
        ] {
            assert_eq!(PriorityTier::parse(tier.as_str()), Some(tier));
        }
        assert_eq!(PriorityTier::parse("tier_5"), None);
    }

    #[test]
    fn test_priority_tier_serialization() {
        let json = serde_json::to_string(&PriorityTier::Tier1).unwrap();
        assert_eq!(json, "\"tier_1\"");
        let rt: PriorityTier = serde_json::from_str("\"tier_4\"").unwrap();
        assert_eq!(rt, PriorityTier::Tier4);
    }

    #[test]
    fn test_priority_tier_levels_and_labels() {
        assert_eq!(PriorityTier::Tier1.level(), 1);
        assert_eq!(PriorityTier::Tier4.level(), 4);
        assert_eq!(PriorityTier::Tier2.label(), "High Priority");
    }

    #[test]
    fn test_cluster_kind_parse() {
        assert_eq!(ClusterKind::parse("duplicate"), Some(ClusterKind::Duplicate));
        assert_eq!(ClusterKind::parse("thematic"), Some(ClusterKind::Thematic));
        assert_eq!(ClusterKind::parse("Similar"), None);
    }

    #[test]
    fn test_backend_kind_serialization() {
        assert_eq!(
            serde_json::to_string(&BackendKind::Embedding).unwrap(),
            "\"embedding\""
        );
        assert_eq!(BackendKind::Keyword.as_str(), "keyword");
    }

    #[test]
    fn test_exam_part_parse() {
        assert_eq!(ExamPart::parse("a"), Some(ExamPart::A));
        assert_eq!(ExamPart::parse(" B "), Some(ExamPart::B));
        assert_eq!(ExamPart::parse(""), None);
    }

    #[test]
    fn test_question_record_flattens_view() {
        let json = r#"{
            "subject_id": "00000000-0000-0000-0000-000000000001",
            "id": "00000000-0000-0000-0000-000000000002",
            "raw_text": "Define entropy. (3 marks)",
            "paper_year": "2021",
            "part": "A"
        }"#;
        let record: QuestionRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.subject_id, Uuid::from_u128(1));
        assert_eq!(record.question.id, Uuid::from_u128(2));
        assert_eq!(record.question.paper_year.as_deref(), Some("2021"));
        assert_eq!(record.question.part, Some(ExamPart::A));
        assert!(record.question.embedding.is_none());
        assert!(record.question.module_id.is_none());
    }

    #[test]
    fn test_question_view_builders() {
        let q = QuestionView::new(Uuid::from_u128(7), "Explain entropy")
            .with_module(Uuid::from_u128(3))
            .with_year("2020")
            .with_marks(5)
            .with_part(ExamPart::B)
            .with_embedding(vec![0.1, 0.2]);
        assert_eq!(q.module_id, Some(Uuid::from_u128(3)));
        assert_eq!(q.marks, Some(5));
        assert_eq!(q.embedding.as_ref().map(|e| e.len()), Some(2));
    }
}
