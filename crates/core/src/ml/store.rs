//! Storage seams of the recommendation engine, plus in-process adapters.
//!
//! The SQL adapters live in `aura-db`; the in-memory ones here back tests and
//! ephemeral demo runs.

use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;

use super::counts::{aggregate, aggregate_for_user, ProductCounts, UserProductCounts};
use super::log::TrainingLogEntry;
use super::model::ModelParameters;
use crate::domain::action::{TrackedAction, UserId};
use crate::errors::ApplicationError;

/// Read/append access to the action log.
#[async_trait]
pub trait EventLog: Send + Sync {
    /// Per-product counts for one user, products without events omitted.
    async fn action_counts(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<ProductCounts>, ApplicationError>;

    /// Counts for every (user, product) pair with at least one event, in a stable order.
    async fn grouped_counts(&self) -> Result<Vec<UserProductCounts>, ApplicationError>;

    async fn append(&self, action: TrackedAction) -> Result<(), ApplicationError>;
}

/// Holder of the single live parameter set. `replace` must swap every field at once.
#[async_trait]
pub trait ModelStore: Send + Sync {
    async fn current(&self) -> Result<ModelParameters, ApplicationError>;

    async fn replace(&self, parameters: ModelParameters) -> Result<(), ApplicationError>;
}

#[async_trait]
pub trait TrainingLogStore: Send + Sync {
    async fn append(&self, entry: TrainingLogEntry) -> Result<(), ApplicationError>;

    /// Most recent entries first.
    async fn recent(&self, limit: u32) -> Result<Vec<TrainingLogEntry>, ApplicationError>;
}

fn lock<T>(mutex: &Arc<Mutex<T>>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

#[derive(Clone, Default)]
pub struct InMemoryEventLog {
    actions: Arc<Mutex<Vec<TrackedAction>>>,
}

impl InMemoryEventLog {
    pub fn with_actions(actions: Vec<TrackedAction>) -> Self {
        Self { actions: Arc::new(Mutex::new(actions)) }
    }
}

#[async_trait]
impl EventLog for InMemoryEventLog {
    async fn action_counts(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<ProductCounts>, ApplicationError> {
        let actions = lock(&self.actions);
        Ok(aggregate_for_user(user_id, actions.iter()))
    }

    async fn grouped_counts(&self) -> Result<Vec<UserProductCounts>, ApplicationError> {
        let actions = lock(&self.actions);
        Ok(aggregate(actions.iter()))
    }

    async fn append(&self, action: TrackedAction) -> Result<(), ApplicationError> {
        lock(&self.actions).push(action);
        Ok(())
    }
}

#[derive(Clone, Default)]
pub struct InMemoryModelStore {
    parameters: Arc<Mutex<ModelParameters>>,
}

#[async_trait]
impl ModelStore for InMemoryModelStore {
    async fn current(&self) -> Result<ModelParameters, ApplicationError> {
        Ok(lock(&self.parameters).clone())
    }

    async fn replace(&self, parameters: ModelParameters) -> Result<(), ApplicationError> {
        *lock(&self.parameters) = parameters;
        Ok(())
    }
}

#[derive(Clone, Default)]
pub struct InMemoryTrainingLog {
    entries: Arc<Mutex<Vec<TrainingLogEntry>>>,
}

impl InMemoryTrainingLog {
    pub fn entries(&self) -> Vec<TrainingLogEntry> {
        lock(&self.entries).clone()
    }
}

#[async_trait]
impl TrainingLogStore for InMemoryTrainingLog {
    async fn append(&self, entry: TrainingLogEntry) -> Result<(), ApplicationError> {
        lock(&self.entries).push(entry);
        Ok(())
    }

    async fn recent(&self, limit: u32) -> Result<Vec<TrainingLogEntry>, ApplicationError> {
        let entries = lock(&self.entries);
        Ok(entries.iter().rev().take(limit as usize).cloned().collect())
    }
}
