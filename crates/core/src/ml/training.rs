//! Online logistic regression over labeled interaction counts.

use serde::{Deserialize, Serialize};

use super::counts::InteractionCounts;
use super::model::{sigmoid, Weights};
use super::TrainingError;

pub const DEFAULT_LEARNING_RATE: f64 = 0.01;
pub const DEFAULT_EPOCHS: usize = 100;

/// Minimum weights enforced after every update. Clicks and purchases are trusted
/// more than views.
pub const W_VIEW_FLOOR: f64 = 0.1;
pub const W_CLICK_FLOOR: f64 = 0.5;
pub const W_BUY_FLOOR: f64 = 1.0;

/// Thresholds of the labeling heuristic.
pub const CLICKS_FOR_POSITIVE: u32 = 3;
pub const VIEWS_FOR_POSITIVE: u32 = 5;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Hyperparameters {
    pub learning_rate: f64,
    pub epochs: usize,
}

impl Default for Hyperparameters {
    fn default() -> Self {
        Self { learning_rate: DEFAULT_LEARNING_RATE, epochs: DEFAULT_EPOCHS }
    }
}

impl Hyperparameters {
    pub fn new(learning_rate: f64, epochs: usize) -> Self {
        Self { learning_rate, epochs }
    }
}

/// Ground truth for one (user, product) pair.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabeledSample {
    pub counts: InteractionCounts,
    pub label: bool,
}

impl LabeledSample {
    pub fn from_counts(counts: InteractionCounts) -> Self {
        Self { counts, label: label_for(&counts) }
    }

    fn target(&self) -> f64 {
        if self.label {
            1.0
        } else {
            0.0
        }
    }
}

/// A pair is positive once the user bought it, clicked it three times, or viewed it five times.
pub fn label_for(counts: &InteractionCounts) -> bool {
    counts.buy_count > 0
        || counts.click_count >= CLICKS_FOR_POSITIVE
        || counts.view_count >= VIEWS_FOR_POSITIVE
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Fit {
    pub weights: Weights,
    /// Percent of samples classified correctly by `weights`.
    pub accuracy: f64,
    pub sample_count: usize,
}

/// Refits `start` with per-sample gradient steps, visiting `samples` in the given
/// order once per epoch.
pub fn fit(
    start: Weights,
    samples: &[LabeledSample],
    hyperparameters: &Hyperparameters,
) -> Result<Fit, TrainingError> {
    if samples.is_empty() {
        return Err(TrainingError::NoData);
    }

    let learning_rate = hyperparameters.learning_rate;
    let mut weights = start;

    for _ in 0..hyperparameters.epochs {
        for sample in samples {
            step(&mut weights, sample, learning_rate);
        }
    }

    Ok(Fit { weights, accuracy: accuracy(&weights, samples), sample_count: samples.len() })
}

fn step(weights: &mut Weights, sample: &LabeledSample, learning_rate: f64) {
    let view_count = f64::from(sample.counts.view_count);
    let click_count = f64::from(sample.counts.click_count);
    let buy_count = f64::from(sample.counts.buy_count);

    let prediction = sigmoid(weights.linear(&sample.counts));
    let error = sample.target() - prediction;

    weights.bias += learning_rate * error;
    weights.w_view = (weights.w_view + learning_rate * error * view_count).max(W_VIEW_FLOOR);
    weights.w_click = (weights.w_click + learning_rate * error * click_count).max(W_CLICK_FLOOR);
    weights.w_buy = (weights.w_buy + learning_rate * error * buy_count).max(W_BUY_FLOOR);
}

/// Percent of samples whose thresholded prediction (`sigmoid(z) >= 0.5`) matches the label.
pub fn accuracy(weights: &Weights, samples: &[LabeledSample]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }

    let correct = samples
        .iter()
        .filter(|sample| (sigmoid(weights.linear(&sample.counts)) >= 0.5) == sample.label)
        .count();

    100.0 * correct as f64 / samples.len() as f64
}
