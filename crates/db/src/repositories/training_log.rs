use async_trait::async_trait;
use chrono::SecondsFormat;
use sqlx::{sqlite::SqliteRow, Row};

use aura_core::errors::ApplicationError;
use aura_core::ml::log::{TrainingLogEntry, TrainingStatus};
use aura_core::ml::store::TrainingLogStore;

use super::model::parse_timestamp;
use super::RepositoryError;
use crate::DbPool;

#[derive(Clone)]
pub struct SqlTrainingLogStore {
    pool: DbPool,
}

impl SqlTrainingLogStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn insert(&self, entry: &TrainingLogEntry) -> Result<(), RepositoryError> {
        sqlx::query("INSERT INTO training_logs (status, message, logged_at) VALUES (?, ?, ?)")
            .bind(entry.status.as_str())
            .bind(&entry.message)
            .bind(entry.timestamp.to_rfc3339_opts(SecondsFormat::Micros, true))
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn list_recent(&self, limit: u32) -> Result<Vec<TrainingLogEntry>, RepositoryError> {
        // Ties on the timestamp resolve by insertion order.
        let rows = sqlx::query(
            r#"
            SELECT status, message, logged_at
            FROM training_logs
            ORDER BY logged_at DESC, id DESC
            LIMIT ?
            "#,
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(entry_from_row).collect()
    }
}

fn entry_from_row(row: &SqliteRow) -> Result<TrainingLogEntry, RepositoryError> {
    let status: String = row.try_get("status")?;
    let logged_at: String = row.try_get("logged_at")?;

    Ok(TrainingLogEntry {
        status: status
            .parse::<TrainingStatus>()
            .map_err(|e| RepositoryError::Decode(e.to_string()))?,
        message: row.try_get("message")?,
        timestamp: parse_timestamp("logged_at", logged_at)?,
    })
}

#[async_trait]
impl TrainingLogStore for SqlTrainingLogStore {
    async fn append(&self, entry: TrainingLogEntry) -> Result<(), ApplicationError> {
        Ok(self.insert(&entry).await?)
    }

    async fn recent(&self, limit: u32) -> Result<Vec<TrainingLogEntry>, ApplicationError> {
        Ok(self.list_recent(limit).await?)
    }
}
