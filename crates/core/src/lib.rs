pub mod config;
pub mod domain;
pub mod errors;
pub mod ml;

pub use domain::action::{ActionKind, TrackedAction, UserId};
pub use domain::product::{Product, ProductId};
pub use domain::user::{Credentials, User};
pub use errors::{ApplicationError, DomainError, InterfaceError};
pub use ml::{
    InteractionCounts, ModelParameters, Recommendation, RecommendationEngine, TrainingError,
    TrainingLogEntry, TrainingOutcome, TrainingStatus, Weights,
};
