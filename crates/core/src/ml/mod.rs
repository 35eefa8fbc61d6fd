//! Purchase-probability model
//!
//! Logistic regression over per-user, per-product interaction counts. The
//! model is deterministic for a fixed event order; every training run leaves
//! exactly one entry in the training log.

pub mod counts;
pub mod log;
pub mod model;
pub mod recommend;
pub mod service;
pub mod store;
pub mod training;

use thiserror::Error;

use crate::errors::ApplicationError;

pub use counts::{InteractionCounts, ProductCounts, UserProductCounts};
pub use log::{TrainingLogEntry, TrainingStatus};
pub use model::{score, sigmoid, ModelParameters, Weights};
pub use recommend::{rank_recommendations, Recommendation};
pub use service::{RecommendationEngine, TrainingOutcome, TrainingReport, NO_DATA_MESSAGE};
pub use store::{
    EventLog, InMemoryEventLog, InMemoryModelStore, InMemoryTrainingLog, ModelStore,
    TrainingLogStore,
};
pub use training::{fit, label_for, Fit, Hyperparameters, LabeledSample};

#[derive(Clone, Debug, Error, PartialEq)]
pub enum TrainingError {
    #[error("no training data available")]
    NoData,
    #[error(transparent)]
    Storage(#[from] ApplicationError),
}
