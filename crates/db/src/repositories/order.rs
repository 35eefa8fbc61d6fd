use chrono::SecondsFormat;

use aura_core::domain::order::Order;

use super::{OrderRepository, RepositoryError};
use crate::DbPool;

pub struct SqlOrderRepository {
    pool: DbPool,
}

impl SqlOrderRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl OrderRepository for SqlOrderRepository {
    async fn place(&self, order: &Order) -> Result<i64, RepositoryError> {
        let result = sqlx::query(
            r#"
            INSERT INTO orders (customer_name, phone, product, quantity, placed_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&order.customer_name)
        .bind(&order.phone)
        .bind(&order.product)
        .bind(i64::from(order.quantity))
        .bind(order.placed_at.to_rfc3339_opts(SecondsFormat::Micros, true))
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }
}
