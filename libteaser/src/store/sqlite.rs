//! SQLite-backed store

use std::path::Path;

use async_trait::async_trait;
use sqlx::sqlite::SqlitePool;
use sqlx::Row;
use tracing::debug;

use crate::error::{DbError, Result};
use crate::store::{RecordedResult, TeaserStore};
use crate::types::{CredentialKey, DispatchOutcome};

#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Open (creating if needed) the database at `db_path` and migrate it
    pub async fn new(db_path: &str) -> Result<Self> {
        let expanded_path = shellexpand::tilde(db_path).to_string();
        let path = Path::new(&expanded_path);

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(DbError::IoError)?;
        }

        // Forward slashes keep the URL valid on Windows; mode=rwc creates the file
        let db_url = format!("sqlite://{}?mode=rwc", expanded_path.replace('\\', "/"));

        let pool = SqlitePool::connect(&db_url)
            .await
            .map_err(DbError::SqlxError)?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(DbError::MigrationError)?;

        debug!("Opened teaser database at {}", expanded_path);
        Ok(Self { pool })
    }

    /// Subjects already dispatched, most recent first
    pub async fn teased_subjects(&self) -> Result<Vec<String>> {
        let rows = sqlx::query(
            r#"
            SELECT subject_id FROM teased_subjects ORDER BY teased_at DESC, subject_id
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(DbError::SqlxError)?;

        Ok(rows.iter().map(|r| r.get("subject_id")).collect())
    }
}

#[async_trait]
impl TeaserStore for Database {
    async fn get_marker(&self, subject_id: &str) -> Result<bool> {
        let row = sqlx::query(
            r#"
            SELECT 1 FROM teased_subjects WHERE subject_id = ?
            "#,
        )
        .bind(subject_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(DbError::SqlxError)?;

        Ok(row.is_some())
    }

    async fn set_marker(&self, subject_id: &str) -> Result<bool> {
        let result = sqlx::query(
            r#"
            INSERT OR IGNORE INTO teased_subjects (subject_id, teased_at)
            VALUES (?, ?)
            "#,
        )
        .bind(subject_id)
        .bind(chrono::Utc::now().timestamp())
        .execute(&self.pool)
        .await
        .map_err(DbError::SqlxError)?;

        Ok(result.rows_affected() == 1)
    }

    async fn record_result(
        &self,
        subject_id: &str,
        key: &CredentialKey,
        outcome: &DispatchOutcome,
    ) -> Result<()> {
        let now = chrono::Utc::now().timestamp();
        let Some(record) = RecordedResult::from_outcome(subject_id, key, outcome, now) else {
            return Ok(());
        };

        let response = record
            .response
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(DbError::Encode)?;

        sqlx::query(
            r#"
            INSERT INTO publish_results
                (subject_id, platform, credential_id, status, response,
                 error_kind, error_message, recorded_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&record.subject_id)
        .bind(&record.key.platform)
        .bind(&record.key.credential_id)
        .bind(&record.status)
        .bind(response)
        .bind(&record.error_kind)
        .bind(&record.error_message)
        .bind(record.recorded_at)
        .execute(&self.pool)
        .await
        .map_err(DbError::SqlxError)?;

        Ok(())
    }

    async fn results_for(&self, subject_id: &str) -> Result<Vec<RecordedResult>> {
        let rows = sqlx::query(
            r#"
            SELECT subject_id, platform, credential_id, status, response,
                   error_kind, error_message, recorded_at
            FROM publish_results
            WHERE subject_id = ?
            ORDER BY id
            "#,
        )
        .bind(subject_id)
        .fetch_all(&self.pool)
        .await
        .map_err(DbError::SqlxError)?;

        rows.iter()
            .map(|r| -> Result<RecordedResult> {
                let response = r
                    .get::<Option<String>, _>("response")
                    .map(|raw| serde_json::from_str::<serde_json::Value>(&raw))
                    .transpose()
                    .map_err(DbError::Encode)?;

                Ok(RecordedResult {
                    subject_id: r.get("subject_id"),
                    key: CredentialKey::new(
                        r.get::<String, _>("platform"),
                        r.get::<String, _>("credential_id"),
                    ),
                    status: r.get("status"),
                    response,
                    error_kind: r.get("error_kind"),
                    error_message: r.get("error_message"),
                    recorded_at: r.get("recorded_at"),
                })
            })
            .collect()
    }
}
