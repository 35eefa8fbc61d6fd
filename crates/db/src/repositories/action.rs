use async_trait::async_trait;
use chrono::SecondsFormat;
use sqlx::{sqlite::SqliteRow, Row};

use aura_core::domain::action::{TrackedAction, UserId};
use aura_core::domain::product::ProductId;
use aura_core::errors::ApplicationError;
use aura_core::ml::counts::{InteractionCounts, ProductCounts, UserProductCounts};
use aura_core::ml::store::EventLog;

use super::RepositoryError;
use crate::DbPool;

/// Append-only `actions` table. Aggregates are returned in order of each pair's
/// first recorded action.
#[derive(Clone)]
pub struct SqlEventLog {
    pool: DbPool,
}

impl SqlEventLog {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn count(&self) -> Result<u64, RepositoryError> {
        let row = sqlx::query("SELECT COUNT(*) AS count FROM actions").fetch_one(&self.pool).await?;
        let count: i64 = row.try_get("count")?;
        Ok(count.max(0) as u64)
    }

    async fn load_user_counts(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<ProductCounts>, RepositoryError> {
        let rows = sqlx::query(
            r#"
            SELECT
                product_id,
                SUM(CASE WHEN action_type = 'view' THEN 1 ELSE 0 END) AS view_count,
                SUM(CASE WHEN action_type = 'click' THEN 1 ELSE 0 END) AS click_count,
                SUM(CASE WHEN action_type = 'buy' THEN 1 ELSE 0 END) AS buy_count
            FROM actions
            WHERE user_id = ?
            GROUP BY product_id
            ORDER BY MIN(id)
            "#,
        )
        .bind(user_id.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(product_counts_from_row).collect()
    }

    async fn load_grouped_counts(&self) -> Result<Vec<UserProductCounts>, RepositoryError> {
        let rows = sqlx::query(
            r#"
            SELECT
                user_id,
                product_id,
                SUM(CASE WHEN action_type = 'view' THEN 1 ELSE 0 END) AS view_count,
                SUM(CASE WHEN action_type = 'click' THEN 1 ELSE 0 END) AS click_count,
                SUM(CASE WHEN action_type = 'buy' THEN 1 ELSE 0 END) AS buy_count
            FROM actions
            GROUP BY user_id, product_id
            ORDER BY MIN(id)
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(pair_counts_from_row).collect()
    }

    /// Appends every action in one transaction, preserving slice order.
    pub async fn append_batch(&self, actions: &[TrackedAction]) -> Result<u64, RepositoryError> {
        let mut tx = self.pool.begin().await?;
        for action in actions {
            sqlx::query(
                "INSERT INTO actions (user_id, action_type, product_id, occurred_at)
                 VALUES (?, ?, ?, ?)",
            )
            .bind(action.user_id.as_str())
            .bind(action.kind.as_str())
            .bind(action.product_id.as_str())
            .bind(action.occurred_at.to_rfc3339_opts(SecondsFormat::Micros, true))
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(actions.len() as u64)
    }
}

fn counts_from_row(row: &SqliteRow) -> Result<InteractionCounts, RepositoryError> {
    Ok(InteractionCounts::from_columns(
        row.try_get("view_count")?,
        row.try_get("click_count")?,
        row.try_get("buy_count")?,
    ))
}

fn product_counts_from_row(row: &SqliteRow) -> Result<ProductCounts, RepositoryError> {
    let product_id: String = row.try_get("product_id")?;
    Ok(ProductCounts { product_id: ProductId(product_id), counts: counts_from_row(row)? })
}

fn pair_counts_from_row(row: &SqliteRow) -> Result<UserProductCounts, RepositoryError> {
    let user_id: String = row.try_get("user_id")?;
    let product_id: String = row.try_get("product_id")?;
    Ok(UserProductCounts {
        user_id: UserId(user_id),
        product_id: ProductId(product_id),
        counts: counts_from_row(row)?,
    })
}

#[async_trait]
impl EventLog for SqlEventLog {
    async fn action_counts(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<ProductCounts>, ApplicationError> {
        Ok(self.load_user_counts(user_id).await?)
    }

    async fn grouped_counts(&self) -> Result<Vec<UserProductCounts>, ApplicationError> {
        Ok(self.load_grouped_counts().await?)
    }

    async fn append(&self, action: TrackedAction) -> Result<(), ApplicationError> {
        self.append_batch(std::slice::from_ref(&action)).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use aura_core::domain::action::{ActionKind, TrackedAction, UserId};
    use aura_core::ml::counts::InteractionCounts;
    use aura_core::ml::store::EventLog;

    use super::SqlEventLog;
    use crate::{connect_with_settings, migrations};

    async fn event_log() -> SqlEventLog {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        SqlEventLog::new(pool)
    }

    async fn record(log: &SqlEventLog, user: &str, kind: ActionKind, product: &str) {
        log.append(TrackedAction::new(user, kind, product).expect("action")).await.expect("append");
    }

    #[tokio::test]
    async fn user_counts_are_grouped_per_product() {
        let log = event_log().await;
        record(&log, "u1", ActionKind::View, "p2").await;
        record(&log, "u1", ActionKind::Click, "p2").await;
        record(&log, "u1", ActionKind::Click, "p2").await;
        record(&log, "u1", ActionKind::Buy, "p1").await;
        record(&log, "u2", ActionKind::Buy, "p2").await;

        let counts = log.action_counts(&UserId("u1".to_string())).await.expect("counts");

        assert_eq!(counts.len(), 2);
        assert_eq!(counts[0].product_id.as_str(), "p2");
        assert_eq!(counts[0].counts, InteractionCounts::new(1, 2, 0));
        assert_eq!(counts[1].product_id.as_str(), "p1");
        assert_eq!(counts[1].counts, InteractionCounts::new(0, 0, 1));
    }

    #[tokio::test]
    async fn unknown_user_has_no_counts() {
        let log = event_log().await;
        record(&log, "u1", ActionKind::View, "p1").await;

        let counts = log.action_counts(&UserId("nobody".to_string())).await.expect("counts");
        assert!(counts.is_empty());
    }

    #[tokio::test]
    async fn grouped_counts_follow_first_appearance_order() {
        let log = event_log().await;
        record(&log, "u2", ActionKind::View, "p3").await;
        record(&log, "u1", ActionKind::Click, "p1").await;
        record(&log, "u2", ActionKind::Buy, "p3").await;
        record(&log, "u1", ActionKind::View, "p2").await;

        let grouped = log.grouped_counts().await.expect("grouped");
        let pairs: Vec<(&str, &str)> =
            grouped.iter().map(|g| (g.user_id.as_str(), g.product_id.as_str())).collect();

        assert_eq!(pairs, vec![("u2", "p3"), ("u1", "p1"), ("u1", "p2")]);
        assert_eq!(grouped[0].counts, InteractionCounts::new(1, 0, 1));
        assert_eq!(log.count().await.expect("count"), 4);
    }
}
