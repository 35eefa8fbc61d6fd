pub mod connection;
pub mod fixtures;
pub mod migrations;
pub mod repositories;

pub use connection::{connect_with_config, connect_with_settings, DbPool};
pub use fixtures::{DemoSeedDataset, SeedResult};
pub use repositories::{
    OrderRepository, ProductRepository, RepositoryError, SqlEventLog, SqlModelStore,
    SqlOrderRepository, SqlProductRepository, SqlTrainingLogStore, SqlUserRepository,
    UserRepository,
};
