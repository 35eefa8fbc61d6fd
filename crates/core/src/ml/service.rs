use chrono::Utc;
use serde::Serialize;
use tracing::{error, info, warn};

use super::log::TrainingLogEntry;
use super::counts::InteractionCounts;
use super::model::{score, ModelParameters, Weights};
use super::recommend::{rank_recommendations, Recommendation};
use super::store::{EventLog, ModelStore, TrainingLogStore};
use super::training::{fit, Fit, Hyperparameters, LabeledSample};
use super::TrainingError;
use crate::domain::action::{TrackedAction, UserId};
use crate::domain::product::Product;
use crate::errors::ApplicationError;

pub const NO_DATA_MESSAGE: &str = "No training data available.";

/// Result of one `train` call. Only `Trained` counts as success.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(into = "TrainingReport")]
pub enum TrainingOutcome {
    Trained { accuracy: f64, weights: Weights, sample_count: usize },
    Skipped { message: String },
    Failed { error: String },
}

impl TrainingOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Trained { .. })
    }
}

/// Wire shape of a training outcome: `{success, accuracy, weights}` or
/// `{success: false, message | error}`.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TrainingReport {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accuracy: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weights: Option<Weights>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<TrainingOutcome> for TrainingReport {
    fn from(outcome: TrainingOutcome) -> Self {
        let empty =
            Self { success: false, accuracy: None, weights: None, message: None, error: None };
        match outcome {
            TrainingOutcome::Trained { accuracy, weights, .. } => {
                Self { success: true, accuracy: Some(accuracy), weights: Some(weights), ..empty }
            }
            TrainingOutcome::Skipped { message } => Self { message: Some(message), ..empty },
            TrainingOutcome::Failed { error } => Self { error: Some(error), ..empty },
        }
    }
}

/// Scores, ranks and retrains against whichever storage adapters it is built with.
pub struct RecommendationEngine<E, M, L> {
    events: E,
    models: M,
    training_log: L,
    hyperparameters: Hyperparameters,
}

impl<E: EventLog, M: ModelStore, L: TrainingLogStore> RecommendationEngine<E, M, L> {
    pub fn new(events: E, models: M, training_log: L) -> Self {
        Self { events, models, training_log, hyperparameters: Hyperparameters::default() }
    }

    pub fn with_hyperparameters(mut self, hyperparameters: Hyperparameters) -> Self {
        self.hyperparameters = hyperparameters;
        self
    }

    pub async fn track(&self, action: TrackedAction) -> Result<(), ApplicationError> {
        info!(
            event_name = "ml.action.tracked",
            user_id = %action.user_id,
            product_id = %action.product_id,
            action_kind = action.kind.as_str(),
            "action appended to event log"
        );
        self.events.append(action).await
    }

    pub async fn recommend(
        &self,
        user_id: &UserId,
        catalog: &[Product],
    ) -> Result<Vec<Recommendation>, ApplicationError> {
        let parameters = self.models.current().await?;
        let counts = self.events.action_counts(user_id).await?;
        let ranked = rank_recommendations(&counts, catalog, &parameters.weights);

        if let Some(top) = ranked.first() {
            info!(
                event_name = "ml.recommend.ranked",
                user_id = %user_id,
                top_product = %top.id,
                top_probability = top.probability_percent,
                "recommendations ranked"
            );
        }
        Ok(ranked)
    }

    /// Purchase probability for ad-hoc counts under the live parameters.
    pub async fn score_counts(&self, counts: &InteractionCounts) -> Result<f64, ApplicationError> {
        let parameters = self.models.current().await?;
        Ok(score(counts, &parameters.weights))
    }

    pub async fn current_parameters(&self) -> Result<ModelParameters, ApplicationError> {
        self.models.current().await
    }

    pub async fn training_log(
        &self,
        limit: u32,
    ) -> Result<Vec<TrainingLogEntry>, ApplicationError> {
        self.training_log.recent(limit).await
    }

    /// Refits the model from the full event log. Never returns an error: every
    /// outcome is reported in the return value and recorded in the training log.
    pub async fn train(&self) -> TrainingOutcome {
        info!(
            event_name = "ml.training.start",
            learning_rate = self.hyperparameters.learning_rate,
            epochs = self.hyperparameters.epochs,
            "model training started"
        );

        match self.run_training().await {
            Ok(result) => {
                info!(
                    event_name = "ml.training.succeeded",
                    sample_count = result.sample_count,
                    accuracy = result.accuracy,
                    bias = result.weights.bias,
                    w_view = result.weights.w_view,
                    w_click = result.weights.w_click,
                    w_buy = result.weights.w_buy,
                    "model training finished"
                );
                TrainingOutcome::Trained {
                    accuracy: result.accuracy,
                    weights: result.weights,
                    sample_count: result.sample_count,
                }
            }
            Err(TrainingError::NoData) => {
                warn!(
                    event_name = "ml.training.skipped",
                    "no interactions recorded, training skipped"
                );
                let entry = TrainingLogEntry::skipped(NO_DATA_MESSAGE);
                match self.training_log.append(entry).await {
                    Ok(()) => TrainingOutcome::Skipped { message: NO_DATA_MESSAGE.to_string() },
                    Err(log_error) => {
                        self.report_unrecorded(&log_error);
                        TrainingOutcome::Failed { error: log_error.to_string() }
                    }
                }
            }
            Err(TrainingError::Storage(cause)) => {
                let message = cause.to_string();
                error!(
                    event_name = "ml.training.failed",
                    error = %message,
                    "model training failed"
                );
                if let Err(log_error) =
                    self.training_log.append(TrainingLogEntry::error(message.clone())).await
                {
                    self.report_unrecorded(&log_error);
                }
                TrainingOutcome::Failed { error: message }
            }
        }
    }

    async fn run_training(&self) -> Result<Fit, TrainingError> {
        let samples: Vec<LabeledSample> = self
            .events
            .grouped_counts()
            .await?
            .into_iter()
            .map(|pair| LabeledSample::from_counts(pair.counts))
            .collect();
        if samples.is_empty() {
            return Err(TrainingError::NoData);
        }

        let current = self.models.current().await?;
        let result = fit(current.weights, &samples, &self.hyperparameters)?;

        self.models
            .replace(ModelParameters {
                weights: result.weights,
                accuracy: result.accuracy,
                updated_at: Utc::now(),
            })
            .await?;
        self.training_log.append(TrainingLogEntry::success(success_message(&result))).await?;

        Ok(result)
    }

    fn report_unrecorded(&self, log_error: &ApplicationError) {
        error!(
            event_name = "ml.training.log_unavailable",
            error = %log_error,
            "training outcome could not be written to the training log"
        );
    }
}

fn success_message(result: &Fit) -> String {
    format!(
        "Learned. Accuracy: {:.1}%, weights: v={:.2}, c={:.2}",
        result.accuracy, result.weights.w_view, result.weights.w_click
    )
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use serde_json::json;

    use super::{RecommendationEngine, TrainingOutcome, NO_DATA_MESSAGE};
    use crate::domain::action::{ActionKind, TrackedAction, UserId};
    use crate::domain::product::Product;
    use crate::errors::ApplicationError;
    use crate::ml::counts::{InteractionCounts, ProductCounts, UserProductCounts};
    use crate::ml::log::TrainingStatus;
    use crate::ml::model::{sigmoid, ModelParameters, Weights};
    use crate::ml::store::{
        EventLog, InMemoryEventLog, InMemoryModelStore, InMemoryTrainingLog, ModelStore,
        TrainingLogStore,
    };
    use crate::ml::training::{label_for, W_BUY_FLOOR, W_CLICK_FLOOR, W_VIEW_FLOOR};

    struct UnavailableEventLog;

    #[async_trait]
    impl EventLog for UnavailableEventLog {
        async fn action_counts(
            &self,
            _user_id: &UserId,
        ) -> Result<Vec<ProductCounts>, ApplicationError> {
            Err(ApplicationError::Persistence("event log offline".to_string()))
        }

        async fn grouped_counts(&self) -> Result<Vec<UserProductCounts>, ApplicationError> {
            Err(ApplicationError::Persistence("event log offline".to_string()))
        }

        async fn append(&self, _action: TrackedAction) -> Result<(), ApplicationError> {
            Err(ApplicationError::Persistence("event log offline".to_string()))
        }
    }

    /// Reads succeed, writes fail.
    #[derive(Default)]
    struct ReadOnlyModelStore {
        inner: InMemoryModelStore,
    }

    #[async_trait]
    impl ModelStore for ReadOnlyModelStore {
        async fn current(&self) -> Result<ModelParameters, ApplicationError> {
            self.inner.current().await
        }

        async fn replace(&self, _parameters: ModelParameters) -> Result<(), ApplicationError> {
            Err(ApplicationError::Persistence("model store is read-only".to_string()))
        }
    }

    fn action(user: &str, kind: ActionKind, product: &str) -> TrackedAction {
        TrackedAction::new(user, kind, product).expect("valid action")
    }

    fn seeded_log() -> InMemoryEventLog {
        let mut actions = Vec::new();
        for _ in 0..5 {
            actions.push(action("u1", ActionKind::View, "p1"));
        }
        actions.push(action("u1", ActionKind::Click, "p2"));
        actions.push(action("u2", ActionKind::Buy, "p2"));
        actions.push(action("u2", ActionKind::View, "p3"));
        for _ in 0..3 {
            actions.push(action("u3", ActionKind::Click, "p1"));
        }
        actions.push(action("u3", ActionKind::View, "p3"));
        InMemoryEventLog::with_actions(actions)
    }

    #[tokio::test]
    async fn training_with_empty_log_is_skipped_without_touching_parameters() {
        let models = InMemoryModelStore::default();
        let journal = InMemoryTrainingLog::default();
        let before = models.current().await.expect("current");
        let engine =
            RecommendationEngine::new(InMemoryEventLog::default(), models.clone(), journal.clone());

        let outcome = engine.train().await;

        assert_eq!(outcome, TrainingOutcome::Skipped { message: NO_DATA_MESSAGE.to_string() });
        assert!(!outcome.is_success());
        assert_eq!(models.current().await.expect("current"), before);
        let entries = journal.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].status, TrainingStatus::Skipped);
    }

    #[tokio::test]
    async fn successful_training_replaces_parameters_and_logs_summary() {
        let events = seeded_log();
        let models = InMemoryModelStore::default();
        let journal = InMemoryTrainingLog::default();
        let engine = RecommendationEngine::new(events.clone(), models.clone(), journal.clone());

        let outcome = engine.train().await;
        let TrainingOutcome::Trained { accuracy, weights, sample_count } = outcome.clone() else {
            panic!("expected a trained outcome, got {outcome:?}");
        };

        assert_eq!(sample_count, 6);
        assert!(weights.w_view >= W_VIEW_FLOOR);
        assert!(weights.w_click >= W_CLICK_FLOOR);
        assert!(weights.w_buy >= W_BUY_FLOOR);

        let stored = models.current().await.expect("current");
        assert_eq!(stored.weights, weights);
        assert_eq!(stored.accuracy, accuracy);

        let grouped = events.grouped_counts().await.expect("grouped");
        let correct = grouped
            .iter()
            .filter(|pair| {
                (sigmoid(weights.linear(&pair.counts)) >= 0.5) == label_for(&pair.counts)
            })
            .count();
        assert_eq!(accuracy, 100.0 * correct as f64 / grouped.len() as f64);

        let entries = journal.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].status, TrainingStatus::Success);
        assert_eq!(
            entries[0].message,
            format!(
                "Learned. Accuracy: {:.1}%, weights: v={:.2}, c={:.2}",
                accuracy, weights.w_view, weights.w_click
            )
        );
    }

    #[tokio::test]
    async fn repeated_training_keeps_accuracy_in_range() {
        let journal = InMemoryTrainingLog::default();
        let engine =
            RecommendationEngine::new(seeded_log(), InMemoryModelStore::default(), journal.clone());

        for _ in 0..3 {
            match engine.train().await {
                TrainingOutcome::Trained { accuracy, .. } => {
                    assert!((0.0..=100.0).contains(&accuracy));
                }
                other => panic!("expected success, got {other:?}"),
            }
        }
        assert_eq!(journal.entries().len(), 3);
    }

    #[tokio::test]
    async fn unreadable_event_log_is_reported_as_failure() {
        let models = InMemoryModelStore::default();
        let journal = InMemoryTrainingLog::default();
        let before = models.current().await.expect("current");
        let engine =
            RecommendationEngine::new(UnavailableEventLog, models.clone(), journal.clone());

        let outcome = engine.train().await;

        assert_eq!(
            outcome,
            TrainingOutcome::Failed { error: "persistence failure: event log offline".to_string() }
        );
        assert_eq!(models.current().await.expect("current"), before);
        let entries = journal.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].status, TrainingStatus::Error);
        assert_eq!(entries[0].message, "persistence failure: event log offline");
    }

    #[tokio::test]
    async fn failed_parameter_write_is_logged_as_error() {
        let journal = InMemoryTrainingLog::default();
        let engine =
            RecommendationEngine::new(seeded_log(), ReadOnlyModelStore::default(), journal.clone());

        let outcome = engine.train().await;

        assert!(matches!(
            outcome,
            TrainingOutcome::Failed { ref error } if error.contains("read-only")
        ));
        let recent = journal.recent(10).await.expect("recent");
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].status, TrainingStatus::Error);
    }

    #[tokio::test]
    async fn recommendations_rank_engaged_products_first() {
        let events = InMemoryEventLog::default();
        let engine = RecommendationEngine::new(
            events,
            InMemoryModelStore::default(),
            InMemoryTrainingLog::default(),
        );
        for _ in 0..5 {
            engine.track(action("u1", ActionKind::Click, "p2")).await.expect("track");
        }
        engine.track(action("u2", ActionKind::Buy, "p1")).await.expect("track");

        let catalog =
            vec![Product::named("p1", "Aura Harmony"), Product::named("p2", "Aura Epoch")];
        let ranked =
            engine.recommend(&UserId("u1".to_string()), &catalog).await.expect("recommend");

        assert_eq!(ranked[0].id.as_str(), "p2");
        assert_eq!(ranked[0].actions.click_count, 5);
        assert_eq!(ranked[1].id.as_str(), "p1");
        assert_eq!(ranked[1].probability_percent, 27);
    }

    #[tokio::test]
    async fn ad_hoc_counts_are_scored_with_live_parameters() {
        let models = InMemoryModelStore::default();
        let engine = RecommendationEngine::new(
            InMemoryEventLog::default(),
            models.clone(),
            InMemoryTrainingLog::default(),
        );

        let cold = engine.score_counts(&InteractionCounts::ZERO).await.expect("score");
        assert!((cold - sigmoid(-1.0)).abs() < 1e-12);

        models
            .replace(ModelParameters {
                weights: Weights { bias: 0.0, w_view: 0.1, w_click: 0.5, w_buy: 1.0 },
                ..ModelParameters::default()
            })
            .await
            .expect("replace");
        let bought = engine.score_counts(&InteractionCounts::new(0, 0, 2)).await.expect("score");
        assert!((bought - sigmoid(2.0)).abs() < 1e-12);
    }

    #[test]
    fn outcomes_serialize_to_report_shape() {
        let trained = TrainingOutcome::Trained {
            accuracy: 83.5,
            weights: Weights { bias: -0.9, w_view: 0.4, w_click: 1.6, w_buy: 3.1 },
            sample_count: 12,
        };
        assert_eq!(
            serde_json::to_value(&trained).expect("serialize"),
            json!({
                "success": true,
                "accuracy": 83.5,
                "weights": { "bias": -0.9, "w_view": 0.4, "w_click": 1.6, "w_buy": 3.1 }
            })
        );

        let failed = TrainingOutcome::Failed { error: "disk full".to_string() };
        assert_eq!(
            serde_json::to_value(&failed).expect("serialize"),
            json!({ "success": false, "error": "disk full" })
        );
    }
}
