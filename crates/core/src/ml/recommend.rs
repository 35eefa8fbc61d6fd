use std::collections::HashMap;

use serde::Serialize;

use super::counts::{InteractionCounts, ProductCounts};
use super::model::{score, Weights};
use crate::domain::product::{Product, ProductId};

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Recommendation {
    pub id: ProductId,
    pub name: String,
    /// Probability rounded to the nearest whole percent.
    #[serde(rename = "probability")]
    pub probability_percent: u8,
    #[serde(skip)]
    pub probability: f64,
    pub actions: InteractionCounts,
}

/// Scores every catalog product for one user and orders them by descending
/// probability. Products without recorded actions score as all-zero counts.
/// Equal probabilities fall back to ascending product id.
pub fn rank_recommendations(
    user_counts: &[ProductCounts],
    catalog: &[Product],
    weights: &Weights,
) -> Vec<Recommendation> {
    let by_product: HashMap<&ProductId, InteractionCounts> =
        user_counts.iter().map(|entry| (&entry.product_id, entry.counts)).collect();

    let mut ranked: Vec<Recommendation> = catalog
        .iter()
        .map(|product| {
            let counts = by_product.get(&product.id).copied().unwrap_or(InteractionCounts::ZERO);
            let probability = score(&counts, weights);
            Recommendation {
                id: product.id.clone(),
                name: product.name.clone(),
                probability_percent: to_percent(probability),
                probability,
                actions: counts,
            }
        })
        .collect();

    ranked.sort_by(|a, b| b.probability.total_cmp(&a.probability).then_with(|| a.id.cmp(&b.id)));
    ranked
}

pub fn to_percent(probability: f64) -> u8 {
    (probability * 100.0).round().clamp(0.0, 100.0) as u8
}
