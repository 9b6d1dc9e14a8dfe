//! Database schema migrations.
//!
//! Applies the initial schema: questions, topic_clusters,
//! topic_cluster_members and schema_migrations.

use rusqlite::Connection;
use tracing::info;

use examlens_core::ExamLensError;

/// Run all pending database migrations.
pub fn run_migrations(conn: &Connection) -> Result<(), ExamLensError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version     INTEGER PRIMARY KEY NOT NULL,
            name        TEXT NOT NULL,
            applied_at  INTEGER NOT NULL DEFAULT (strftime('%s', 'now'))
        );",
    )
    .map_err(|e| ExamLensError::Storage(format!("Failed to create migrations table: {}", e)))?;

    let current_version: i64 = conn
        .query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
            [],
            |row| row.get(0),
        )
        .map_err(|e| ExamLensError::Storage(format!("Failed to query migration version: {}", e)))?;

    if current_version < 1 {
        apply_v1(conn)?;
        info!("Applied migration v1: initial_schema");
    }

    Ok(())
}

/// Version 1: Initial schema.
fn apply_v1(conn: &Connection) -> Result<(), ExamLensError> {
    conn.execute_batch(
        "
        -- Extracted exam questions. Embeddings are JSON float arrays.
        CREATE TABLE IF NOT EXISTS questions (
            id              TEXT PRIMARY KEY NOT NULL,
            subject_id      TEXT NOT NULL,
            module_id       TEXT,
            paper_id        TEXT,
            paper_year      TEXT,
            part            TEXT CHECK (part IN ('A', 'B')),
            question_number TEXT,
            raw_text        TEXT NOT NULL,
            marks           INTEGER,
            embedding       TEXT,
            created_at      INTEGER NOT NULL DEFAULT (strftime('%s', 'now'))
        );

        CREATE INDEX IF NOT EXISTS idx_questions_scope
            ON questions (subject_id, module_id, id);

        -- Topic clusters, one complete set per (subject, module) scope.
        CREATE TABLE IF NOT EXISTS topic_clusters (
            id                          TEXT PRIMARY KEY NOT NULL,
            subject_id                  TEXT NOT NULL,
            module_id                   TEXT,
            position                    INTEGER NOT NULL,
            kind                        TEXT NOT NULL
                                        CHECK (kind IN ('duplicate', 'similar', 'thematic')),
            topic_name                  TEXT NOT NULL,
            representative_text         TEXT NOT NULL,
            representative_question_id  TEXT NOT NULL,
            question_count              INTEGER NOT NULL CHECK (question_count > 0),
            years_appeared              TEXT NOT NULL DEFAULT '[]',
            frequency_count             INTEGER NOT NULL DEFAULT 0,
            paper_ids                   TEXT NOT NULL DEFAULT '[]',
            total_marks                 INTEGER NOT NULL DEFAULT 0,
            part_a_count                INTEGER NOT NULL DEFAULT 0,
            part_b_count                INTEGER NOT NULL DEFAULT 0,
            min_similarity              REAL NOT NULL,
            avg_similarity              REAL NOT NULL,
            priority_tier               TEXT NOT NULL
                                        CHECK (priority_tier IN ('tier_1', 'tier_2', 'tier_3', 'tier_4')),
            is_evergreen                INTEGER NOT NULL DEFAULT 0,
            created_at                  TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_topic_clusters_scope
            ON topic_clusters (subject_id, module_id, position);

        CREATE TABLE IF NOT EXISTS topic_cluster_members (
            cluster_id      TEXT NOT NULL,
            question_id     TEXT NOT NULL,
            PRIMARY KEY (cluster_id, question_id),
            FOREIGN KEY (cluster_id) REFERENCES topic_clusters(id) ON DELETE CASCADE
        );

        CREATE INDEX IF NOT EXISTS idx_topic_cluster_members_question
            ON topic_cluster_members (question_id);

        INSERT OR IGNORE INTO schema_migrations (version, name) VALUES (1, 'initial_schema');
        ",
    )
    .map_err(|e| ExamLensError::Storage(format!("Failed to apply migration v1: {}", e)))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_test_conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("PRAGMA foreign_keys = ON;").unwrap();
        run_migrations(&conn).unwrap();
        conn
    }

    fn insert_cluster(conn: &Connection, id: &str, tier: &str) -> rusqlite::Result<usize> {
        conn.execute(
            "INSERT INTO topic_clusters (id, subject_id, position, kind, topic_name, representative_text,
                 representative_question_id, question_count, min_similarity, avg_similarity,
                 priority_tier, created_at)
             VALUES (?1, 's', 0, 'similar', 'Entropy', 'define entropy', 'q1', 2, 0.8, 0.9, ?2,
                 '2024-01-01T00:00:00Z')",
            rusqlite::params![id, tier],
        )
    }

    #[test]
    fn test_migrations_run_once() {
        let conn = open_test_conn();
        run_migrations(&conn).unwrap();

        let version: i64 = conn
            .query_row("SELECT MAX(version) FROM schema_migrations", [], |row| {
                row.get(0)
            })
            .unwrap();
        assert_eq!(version, 1);
    }

    #[test]
    fn test_question_part_check() {
        let conn = open_test_conn();
        let result = conn.execute(
            "INSERT INTO questions (id, subject_id, raw_text, part) VALUES ('q', 's', 'x', 'C')",
            [],
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_priority_tier_check() {
        let conn = open_test_conn();
        assert!(insert_cluster(&conn, "ok", "tier_1").is_ok());
        assert!(insert_cluster(&conn, "bad", "tier_5").is_err());
    }

    #[test]
    fn test_members_cascade_with_cluster() {
        let conn = open_test_conn();
        insert_cluster(&conn, "c1", "tier_3").unwrap();
        conn.execute(
            "INSERT INTO topic_cluster_members (cluster_id, question_id) VALUES ('c1', 'q1'), ('c1', 'q2')",
            [],
        )
        .unwrap();

        conn.execute("DELETE FROM topic_clusters WHERE id = 'c1'", []).unwrap();
        let members: i64 = conn
            .query_row("SELECT COUNT(*) FROM topic_cluster_members", [], |row| row.get(0))
            .unwrap();
        assert_eq!(members, 0);
    }
}
