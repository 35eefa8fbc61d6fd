use async_trait::async_trait;
use thiserror::Error;

use aura_core::domain::order::Order;
use aura_core::domain::product::{Product, ProductId};
use aura_core::domain::user::{Credentials, User};
use aura_core::errors::ApplicationError;

pub mod action;
pub mod model;
pub mod order;
pub mod product;
pub mod training_log;
pub mod user;

pub use action::SqlEventLog;
pub use model::SqlModelStore;
pub use order::SqlOrderRepository;
pub use product::SqlProductRepository;
pub use training_log::SqlTrainingLogStore;
pub use user::SqlUserRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
}

impl From<RepositoryError> for ApplicationError {
    fn from(error: RepositoryError) -> Self {
        ApplicationError::Persistence(error.to_string())
    }
}

#[async_trait]
pub trait ProductRepository: Send + Sync {
    /// Whole catalog in display order.
    async fn list(&self) -> Result<Vec<Product>, RepositoryError>;
    async fn find_by_id(&self, id: &ProductId) -> Result<Option<Product>, RepositoryError>;
    async fn save(&self, product: Product) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Stores the order and returns its row id.
    async fn place(&self, order: &Order) -> Result<i64, RepositoryError>;
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Returns the account when username and password both match.
    async fn verify(&self, credentials: &Credentials) -> Result<Option<User>, RepositoryError>;
    /// Inserts the account unless the username is already taken.
    async fn ensure(&self, credentials: &Credentials) -> Result<User, RepositoryError>;
    async fn count(&self) -> Result<u64, RepositoryError>;
}
