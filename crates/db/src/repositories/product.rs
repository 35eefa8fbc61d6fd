use sqlx::{sqlite::SqliteRow, Row};

use aura_core::domain::product::{Product, ProductId};

use super::{ProductRepository, RepositoryError};
use crate::DbPool;

const PRODUCT_COLUMNS: &str = "id, name, tagline, description, long_description, price, category, \
                               image_url, features_json";

pub struct SqlProductRepository {
    pool: DbPool,
}

impl SqlProductRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl ProductRepository for SqlProductRepository {
    async fn list(&self) -> Result<Vec<Product>, RepositoryError> {
        let rows =
            sqlx::query(&format!("SELECT {PRODUCT_COLUMNS} FROM products ORDER BY position, id"))
                .fetch_all(&self.pool)
                .await?;

        rows.iter().map(product_from_row).collect()
    }

    async fn find_by_id(&self, id: &ProductId) -> Result<Option<Product>, RepositoryError> {
        let row = sqlx::query(&format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?"))
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await?;

        row.map(|r| product_from_row(&r)).transpose()
    }

    async fn save(&self, product: Product) -> Result<(), RepositoryError> {
        let features_json = serde_json::to_string(&product.features)
            .map_err(|e| RepositoryError::Decode(format!("features encode failed: {e}")))?;

        // New products go to the end of the catalog; updates keep their slot.
        sqlx::query(
            r#"
            INSERT INTO products (
                id, position, name, tagline, description, long_description,
                price, category, image_url, features_json
            ) VALUES (
                ?, (SELECT COALESCE(MAX(position), 0) + 1 FROM products),
                ?, ?, ?, ?, ?, ?, ?, ?
            )
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                tagline = excluded.tagline,
                description = excluded.description,
                long_description = excluded.long_description,
                price = excluded.price,
                category = excluded.category,
                image_url = excluded.image_url,
                features_json = excluded.features_json
            "#,
        )
        .bind(product.id.as_str())
        .bind(&product.name)
        .bind(&product.tagline)
        .bind(&product.description)
        .bind(&product.long_description)
        .bind(product.price)
        .bind(&product.category)
        .bind(&product.image_url)
        .bind(features_json)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

fn product_from_row(row: &SqliteRow) -> Result<Product, RepositoryError> {
    let id: String = row.try_get("id")?;
    let features_json: String = row.try_get("features_json")?;
    let features: Vec<String> = serde_json::from_str(&features_json)
        .map_err(|e| RepositoryError::Decode(format!("invalid features for product `{id}`: {e}")))?;

    Ok(Product {
        id: ProductId(id),
        name: row.try_get("name")?,
        tagline: row.try_get("tagline")?,
        description: row.try_get("description")?,
        long_description: row.try_get("long_description")?,
        price: row.try_get("price")?,
        category: row.try_get("category")?,
        image_url: row.try_get("image_url")?,
        features,
    })
}
