use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::counts::InteractionCounts;

pub const DEFAULT_BIAS: f64 = -1.0;
pub const DEFAULT_W_VIEW: f64 = 0.5;
pub const DEFAULT_W_CLICK: f64 = 1.5;
pub const DEFAULT_W_BUY: f64 = 3.0;

/// Keeps `score` strictly inside (0, 1); `1 / (1 + e^-z)` rounds to exactly 1.0
/// in f64 once z passes roughly 37.
const PROBABILITY_MARGIN: f64 = 1e-12;

/// The four learned scalars of the purchase-likelihood model.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Weights {
    pub bias: f64,
    pub w_view: f64,
    pub w_click: f64,
    pub w_buy: f64,
}

impl Default for Weights {
    fn default() -> Self {
        Self {
            bias: DEFAULT_BIAS,
            w_view: DEFAULT_W_VIEW,
            w_click: DEFAULT_W_CLICK,
            w_buy: DEFAULT_W_BUY,
        }
    }
}

impl Weights {
    pub fn linear(&self, counts: &InteractionCounts) -> f64 {
        self.bias
            + self.w_view * f64::from(counts.view_count)
            + self.w_click * f64::from(counts.click_count)
            + self.w_buy * f64::from(counts.buy_count)
    }
}

/// The live model: weights plus the bookkeeping written by the last training run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ModelParameters {
    #[serde(flatten)]
    pub weights: Weights,
    /// Training-set accuracy in percent (0..=100).
    pub accuracy: f64,
    pub updated_at: DateTime<Utc>,
}

impl Default for ModelParameters {
    fn default() -> Self {
        Self::initial(Utc::now())
    }
}

impl ModelParameters {
    pub fn initial(updated_at: DateTime<Utc>) -> Self {
        Self { weights: Weights::default(), accuracy: 0.0, updated_at }
    }

    pub fn predict(&self, counts: &InteractionCounts) -> f64 {
        score(counts, &self.weights)
    }
}

/// Logistic function. NaN input maps to 0.5.
pub fn sigmoid(z: f64) -> f64 {
    let z = if z.is_nan() { 0.0 } else { z.clamp(-500.0, 500.0) };
    1.0 / (1.0 + (-z).exp())
}

/// Purchase likelihood for one interaction triple, strictly within (0, 1).
pub fn score(counts: &InteractionCounts, weights: &Weights) -> f64 {
    sigmoid(weights.linear(counts)).clamp(PROBABILITY_MARGIN, 1.0 - PROBABILITY_MARGIN)
}
