use secrecy::ExposeSecret;
use sqlx::{sqlite::SqliteRow, Row};

use aura_core::domain::user::{Credentials, User};

use super::{RepositoryError, UserRepository};
use crate::DbPool;

pub struct SqlUserRepository {
    pool: DbPool,
}

impl SqlUserRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn find_by_username(
        &self,
        username: &str,
    ) -> Result<Option<(User, String)>, RepositoryError> {
        let row = sqlx::query("SELECT id, username, password FROM users WHERE username = ?")
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;

        row.map(|r| user_from_row(&r)).transpose()
    }
}

fn user_from_row(row: &SqliteRow) -> Result<(User, String), RepositoryError> {
    let user = User { id: row.try_get("id")?, username: row.try_get("username")? };
    let password: String = row.try_get("password")?;
    Ok((user, password))
}

#[async_trait::async_trait]
impl UserRepository for SqlUserRepository {
    async fn verify(&self, credentials: &Credentials) -> Result<Option<User>, RepositoryError> {
        let found = self.find_by_username(&credentials.username).await?;
        Ok(found.and_then(|(user, stored)| credentials.matches(&stored).then_some(user)))
    }

    async fn ensure(&self, credentials: &Credentials) -> Result<User, RepositoryError> {
        sqlx::query("INSERT OR IGNORE INTO users (username, password) VALUES (?, ?)")
            .bind(&credentials.username)
            .bind(credentials.password.expose_secret())
            .execute(&self.pool)
            .await?;

        self.find_by_username(&credentials.username).await?.map(|(user, _)| user).ok_or_else(|| {
            RepositoryError::Decode(format!("user `{}` missing after insert", credentials.username))
        })
    }

    async fn count(&self) -> Result<u64, RepositoryError> {
        let row = sqlx::query("SELECT COUNT(*) AS count FROM users").fetch_one(&self.pool).await?;
        let count: i64 = row.try_get("count")?;
        Ok(count.max(0) as u64)
    }
}

#[cfg(test)]
mod tests {
    use aura_core::domain::user::Credentials;

    use super::SqlUserRepository;
    use crate::repositories::UserRepository;
    use crate::{connect_with_settings, migrations};

    async fn repository() -> SqlUserRepository {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        SqlUserRepository::new(pool)
    }

    #[tokio::test]
    async fn verify_requires_exact_password() {
        let repo = repository().await;
        let created = repo.ensure(&Credentials::new("test", "1234")).await.expect("ensure");

        let accepted = repo.verify(&Credentials::new("test", "1234")).await.expect("verify");
        assert_eq!(accepted, Some(created));

        let rejected = repo.verify(&Credentials::new("test", "12345")).await.expect("verify");
        assert!(rejected.is_none());

        let unknown = repo.verify(&Credentials::new("ghost", "1234")).await.expect("verify");
        assert!(unknown.is_none());
    }

    #[tokio::test]
    async fn ensure_is_idempotent_and_keeps_first_password() {
        let repo = repository().await;
        let first = repo.ensure(&Credentials::new("user1", "password123")).await.expect("ensure");
        let second = repo.ensure(&Credentials::new("user1", "changed")).await.expect("ensure");

        assert_eq!(first, second);
        assert_eq!(repo.count().await.expect("count"), 1);
        assert!(repo
            .verify(&Credentials::new("user1", "password123"))
            .await
            .expect("verify")
            .is_some());
    }
}
