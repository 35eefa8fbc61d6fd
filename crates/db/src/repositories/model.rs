use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::{sqlite::SqliteRow, Row};

use aura_core::errors::ApplicationError;
use aura_core::ml::model::{ModelParameters, Weights};
use aura_core::ml::store::ModelStore;

use super::RepositoryError;
use crate::DbPool;

const PARAMETER_ROW_ID: i64 = 1;

/// Single-row `model_weights` table. Updates touch every column in one
/// statement, so readers never see a half-written parameter set.
#[derive(Clone)]
pub struct SqlModelStore {
    pool: DbPool,
}

impl SqlModelStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn load(&self) -> Result<ModelParameters, RepositoryError> {
        let row = sqlx::query(
            "SELECT bias, w_view, w_click, w_buy, accuracy, updated_at \
             FROM model_weights WHERE id = ?",
        )
        .bind(PARAMETER_ROW_ID)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => parameters_from_row(&row),
            None => Ok(ModelParameters::initial(Utc::now())),
        }
    }

    async fn store(&self, parameters: &ModelParameters) -> Result<(), RepositoryError> {
        let weights = &parameters.weights;
        sqlx::query(
            r#"
            INSERT INTO model_weights (id, bias, w_view, w_click, w_buy, accuracy, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                bias = excluded.bias,
                w_view = excluded.w_view,
                w_click = excluded.w_click,
                w_buy = excluded.w_buy,
                accuracy = excluded.accuracy,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(PARAMETER_ROW_ID)
        .bind(weights.bias)
        .bind(weights.w_view)
        .bind(weights.w_click)
        .bind(weights.w_buy)
        .bind(parameters.accuracy)
        .bind(parameters.updated_at.to_rfc3339_opts(SecondsFormat::Micros, true))
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

fn parameters_from_row(row: &SqliteRow) -> Result<ModelParameters, RepositoryError> {
    let updated_at: String = row.try_get("updated_at")?;

    Ok(ModelParameters {
        weights: Weights {
            bias: row.try_get("bias")?,
            w_view: row.try_get("w_view")?,
            w_click: row.try_get("w_click")?,
            w_buy: row.try_get("w_buy")?,
        },
        accuracy: row.try_get("accuracy")?,
        updated_at: parse_timestamp("updated_at", updated_at)?,
    })
}

pub(crate) fn parse_timestamp(
    column: &str,
    value: String,
) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(&value)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Decode(format!("invalid timestamp in `{column}`: {e}")))
}

#[async_trait]
impl ModelStore for SqlModelStore {
    async fn current(&self) -> Result<ModelParameters, ApplicationError> {
        Ok(self.load().await?)
    }

    async fn replace(&self, parameters: ModelParameters) -> Result<(), ApplicationError> {
        Ok(self.store(&parameters).await?)
    }
}
