//! Repository implementations for SQLite-backed persistence.
//!
//! [`QuestionRepository`] stores imported questions and serves them to the
//! clustering engine; [`ClusterRepository`] stores each scope's cluster set.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rusqlite::types::FromSql;
use rusqlite::{Connection, Row};
use tracing::debug;
use uuid::Uuid;

use examlens_core::{
    ClusterKind, ClusterSink, ExamLensError, ExamPart, PriorityTier, QuestionRecord,
    QuestionSource, QuestionView, TopicClusterView,
};

use crate::db::Database;

/// Repository for extracted exam questions.
pub struct QuestionRepository {
    db: Arc<Database>,
}

impl QuestionRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Store a question, replacing any previous row with the same id.
    pub fn save(&self, record: &QuestionRecord) -> Result<(), ExamLensError> {
        self.db.with_conn(|conn| insert_question(conn, record))
    }

    /// Store a batch of questions atomically. Returns the number stored.
    pub fn save_many(&self, records: &[QuestionRecord]) -> Result<usize, ExamLensError> {
        self.db.with_conn(|conn| {
            let tx = conn
                .unchecked_transaction()
                .map_err(|e| ExamLensError::Storage(format!("Failed to begin transaction: {}", e)))?;
            for record in records {
                insert_question(&tx, record)?;
            }
            tx.commit()
                .map_err(|e| ExamLensError::Storage(format!("Failed to commit questions: {}", e)))?;
            debug!(count = records.len(), "Saved question batch");
            Ok(records.len())
        })
    }

    /// Count questions for a subject.
    pub fn count(&self, subject_id: Uuid) -> Result<u64, ExamLensError> {
        self.db.with_conn(|conn| {
            let count: i64 = conn
                .query_row(
                    "SELECT COUNT(*) FROM questions WHERE subject_id = ?1",
                    rusqlite::params![subject_id.to_string()],
                    |row| row.get(0),
                )
                .map_err(|e| ExamLensError::Storage(e.to_string()))?;
            Ok(count as u64)
        })
    }
}

impl QuestionSource for QuestionRepository {
    /// Questions ordered by id, so repeated fetches see the same order.
    fn fetch_questions(
        &self,
        subject_id: Uuid,
        module_id: Option<Uuid>,
    ) -> Result<Vec<QuestionView>, ExamLensError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT id, module_id, raw_text, embedding, marks, paper_id, paper_year, part, question_number
                     FROM questions
                     WHERE subject_id = ?1 AND (?2 IS NULL OR module_id = ?2)
                     ORDER BY id ASC",
                )
                .map_err(|e| ExamLensError::Storage(e.to_string()))?;

            let rows = stmt
                .query_map(
                    rusqlite::params![subject_id.to_string(), module_id.map(|m| m.to_string())],
                    |row| Ok(row_to_question(row)),
                )
                .map_err(|e| ExamLensError::Storage(e.to_string()))?;

            let mut questions = Vec::new();
            for row in rows {
                let question = row.map_err(|e| ExamLensError::Storage(e.to_string()))??;
                questions.push(question);
            }
            Ok(questions)
        })
    }
}

/// Repository for topic clusters.
pub struct ClusterRepository {
    db: Arc<Database>,
}

impl ClusterRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// List stored clusters for a subject in their stored order.
    ///
    /// With `module_id = None` every scope of the subject is listed,
    /// unclassified clusters first.
    pub fn list(
        &self,
        subject_id: Uuid,
        module_id: Option<Uuid>,
    ) -> Result<Vec<TopicClusterView>, ExamLensError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT id, subject_id, module_id, kind, topic_name, representative_text,
                            representative_question_id, question_count, years_appeared, frequency_count,
                            paper_ids, total_marks, part_a_count, part_b_count, min_similarity,
                            avg_similarity, priority_tier, is_evergreen, created_at
                     FROM topic_clusters
                     WHERE subject_id = ?1 AND (?2 IS NULL OR module_id = ?2)
                     ORDER BY module_id ASC, position ASC",
                )
                .map_err(|e| ExamLensError::Storage(e.to_string()))?;

            let rows = stmt
                .query_map(
                    rusqlite::params![subject_id.to_string(), module_id.map(|m| m.to_string())],
                    |row| Ok(row_to_cluster(row)),
                )
                .map_err(|e| ExamLensError::Storage(e.to_string()))?;

            let mut clusters = Vec::new();
            for row in rows {
                let mut cluster = row.map_err(|e| ExamLensError::Storage(e.to_string()))??;
                cluster.member_ids = load_members(conn, cluster.id)?;
                clusters.push(cluster);
            }
            Ok(clusters)
        })
    }

    /// Count clusters stored for one exact scope.
    pub fn count_scope(&self, subject_id: Uuid, module_id: Option<Uuid>) -> Result<u64, ExamLensError> {
        self.db.with_conn(|conn| {
            let count: i64 = conn
                .query_row(
                    "SELECT COUNT(*) FROM topic_clusters WHERE subject_id = ?1 AND module_id IS ?2",
                    rusqlite::params![subject_id.to_string(), module_id.map(|m| m.to_string())],
                    |row| row.get(0),
                )
                .map_err(|e| ExamLensError::Storage(e.to_string()))?;
            Ok(count as u64)
        })
    }
}

impl ClusterSink for ClusterRepository {
    /// Delete the scope's old clusters and insert the new set in one
    /// transaction. Any failure rolls the scope back to its previous set.
    fn replace_clusters(
        &self,
        subject_id: Uuid,
        module_id: Option<Uuid>,
        clusters: &[TopicClusterView],
    ) -> Result<(), ExamLensError> {
        self.db.with_conn(|conn| {
            let tx = conn
                .unchecked_transaction()
                .map_err(|e| ExamLensError::Storage(format!("Failed to begin transaction: {}", e)))?;

            let removed = tx
                .execute(
                    "DELETE FROM topic_clusters WHERE subject_id = ?1 AND module_id IS ?2",
                    rusqlite::params![subject_id.to_string(), module_id.map(|m| m.to_string())],
                )
                .map_err(|e| ExamLensError::Storage(format!("Failed to delete clusters: {}", e)))?;

            for (position, cluster) in clusters.iter().enumerate() {
                if cluster.subject_id != subject_id || cluster.module_id != module_id {
                    return Err(ExamLensError::Storage(format!(
                        "cluster {} does not belong to the scope being replaced",
                        cluster.id
                    )));
                }
                insert_cluster(&tx, position, cluster)?;
            }

            tx.commit()
                .map_err(|e| ExamLensError::Storage(format!("Failed to commit clusters: {}", e)))?;
            debug!(
                %subject_id,
                module_id = ?module_id,
                removed,
                inserted = clusters.len(),
                "Replaced scope clusters"
            );
            Ok(())
        })
    }

    fn stored_scopes(&self, subject_id: Uuid) -> Result<Vec<Option<Uuid>>, ExamLensError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT DISTINCT module_id FROM topic_clusters WHERE subject_id = ?1 ORDER BY module_id ASC",
                )
                .map_err(|e| ExamLensError::Storage(e.to_string()))?;
            let rows = stmt
                .query_map(rusqlite::params![subject_id.to_string()], |row| {
                    row.get::<_, Option<String>>(0)
                })
                .map_err(|e| ExamLensError::Storage(e.to_string()))?;

            let mut scopes = Vec::new();
            for row in rows {
                let module = row.map_err(|e| ExamLensError::Storage(e.to_string()))?;
                scopes.push(parse_optional_uuid(module)?);
            }
            Ok(scopes)
        })
    }
}

fn insert_question(conn: &Connection, record: &QuestionRecord) -> Result<(), ExamLensError> {
    let q = &record.question;
    let embedding = q.embedding.as_ref().map(serde_json::to_string).transpose()?;
    conn.execute(
        "INSERT OR REPLACE INTO questions
             (id, subject_id, module_id, paper_id, paper_year, part, question_number, raw_text, marks, embedding)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        rusqlite::params![
            q.id.to_string(),
            record.subject_id.to_string(),
            q.module_id.map(|m| m.to_string()),
            q.paper_id.map(|p| p.to_string()),
            q.paper_year,
            q.part.map(|p| p.as_str()),
            q.question_number,
            q.raw_text,
            q.marks,
            embedding,
        ],
    )
    .map_err(|e| ExamLensError::Storage(format!("Failed to save question {}: {}", q.id, e)))?;
    Ok(())
}

fn insert_cluster(
    conn: &Connection,
    position: usize,
    cluster: &TopicClusterView,
) -> Result<(), ExamLensError> {
    conn.execute(
        "INSERT INTO topic_clusters
             (id, subject_id, module_id, position, kind, topic_name, representative_text,
              representative_question_id, question_count, years_appeared, frequency_count, paper_ids,
              total_marks, part_a_count, part_b_count, min_similarity, avg_similarity, priority_tier,
              is_evergreen, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20)",
        rusqlite::params![
            cluster.id.to_string(),
            cluster.subject_id.to_string(),
            cluster.module_id.map(|m| m.to_string()),
            position as i64,
            cluster.kind.as_str(),
            cluster.topic_name,
            cluster.representative_text,
            cluster.representative_question_id.to_string(),
            cluster.question_count,
            serde_json::to_string(&cluster.years_appeared)?,
            cluster.frequency_count,
            serde_json::to_string(&cluster.paper_ids)?,
            cluster.total_marks,
            cluster.part_a_count,
            cluster.part_b_count,
            cluster.min_similarity,
            cluster.avg_similarity,
            cluster.priority_tier.as_str(),
            cluster.is_evergreen,
            cluster.created_at.to_rfc3339(),
        ],
    )
    .map_err(|e| ExamLensError::Storage(format!("Failed to save cluster {}: {}", cluster.id, e)))?;

    let mut stmt = conn
        .prepare_cached("INSERT INTO topic_cluster_members (cluster_id, question_id) VALUES (?1, ?2)")
        .map_err(|e| ExamLensError::Storage(e.to_string()))?;
    for member in &cluster.member_ids {
        stmt.execute(rusqlite::params![cluster.id.to_string(), member.to_string()])
            .map_err(|e| ExamLensError::Storage(format!("Failed to save cluster member: {}", e)))?;
    }
    Ok(())
}

fn load_members(conn: &Connection, cluster_id: Uuid) -> Result<Vec<Uuid>, ExamLensError> {
    let mut stmt = conn
        .prepare_cached(
            "SELECT question_id FROM topic_cluster_members WHERE cluster_id = ?1 ORDER BY question_id ASC",
        )
        .map_err(|e| ExamLensError::Storage(e.to_string()))?;
    let rows = stmt
        .query_map(rusqlite::params![cluster_id.to_string()], |row| row.get::<_, String>(0))
        .map_err(|e| ExamLensError::Storage(e.to_string()))?;

    let mut members = Vec::new();
    for row in rows {
        let id = row.map_err(|e| ExamLensError::Storage(e.to_string()))?;
        members.push(parse_uuid(&id)?);
    }
    Ok(members)
}

// ============================================================================
// Helper functions for row-to-entity conversion.
// ============================================================================

fn column<T: FromSql>(row: &Row<'_>, idx: usize) -> Result<T, ExamLensError> {
    row.get(idx).map_err(|e| ExamLensError::Storage(e.to_string()))
}

fn parse_uuid(s: &str) -> Result<Uuid, ExamLensError> {
    Uuid::parse_str(s).map_err(|e| ExamLensError::Storage(format!("Invalid UUID: {}", e)))
}

fn parse_optional_uuid(s: Option<String>) -> Result<Option<Uuid>, ExamLensError> {
    s.as_deref().map(parse_uuid).transpose()
}

fn row_to_question(row: &Row<'_>) -> Result<QuestionView, ExamLensError> {
    let id: String = column(row, 0)?;
    let embedding: Option<String> = column(row, 3)?;
    let part: Option<String> = column(row, 7)?;

    Ok(QuestionView {
        id: parse_uuid(&id)?,
        module_id: parse_optional_uuid(column(row, 1)?)?,
        raw_text: column(row, 2)?,
        embedding: embedding.as_deref().map(serde_json::from_str).transpose()?,
        marks: column(row, 4)?,
        paper_id: parse_optional_uuid(column(row, 5)?)?,
        paper_year: column(row, 6)?,
        part: part.as_deref().and_then(ExamPart::parse),
        question_number: column(row, 8)?,
    })
}

/// Build a cluster from a row; members are filled in separately.
fn row_to_cluster(row: &Row<'_>) -> Result<TopicClusterView, ExamLensError> {
    let id: String = column(row, 0)?;
    let subject_id: String = column(row, 1)?;
    let kind: String = column(row, 3)?;
    let representative_id: String = column(row, 6)?;
    let years: String = column(row, 8)?;
    let papers: String = column(row, 10)?;
    let tier: String = column(row, 16)?;
    let created_at: String = column(row, 18)?;

    Ok(TopicClusterView {
        id: parse_uuid(&id)?,
        subject_id: parse_uuid(&subject_id)?,
        module_id: parse_optional_uuid(column(row, 2)?)?,
        kind: ClusterKind::parse(&kind)
            .ok_or_else(|| ExamLensError::Storage(format!("Unknown cluster kind: {}", kind)))?,
        topic_name: column(row, 4)?,
        representative_text: column(row, 5)?,
        representative_question_id: parse_uuid(&representative_id)?,
        member_ids: Vec::new(),
        question_count: column(row, 7)?,
        years_appeared: serde_json::from_str(&years)?,
        frequency_count: column(row, 9)?,
        paper_ids: serde_json::from_str(&papers)?,
        total_marks: column(row, 11)?,
        part_a_count: column(row, 12)?,
        part_b_count: column(row, 13)?,
        min_similarity: column(row, 14)?,
        avg_similarity: column(row, 15)?,
        priority_tier: PriorityTier::parse(&tier)
            .ok_or_else(|| ExamLensError::Storage(format!("Unknown priority tier: {}", tier)))?,
        is_evergreen: column(row, 17)?,
        created_at: DateTime::parse_from_rfc3339(&created_at)
            .map_err(|e| ExamLensError::Storage(format!("Invalid timestamp: {}", e)))?
            .with_timezone(&Utc),
    })
}
