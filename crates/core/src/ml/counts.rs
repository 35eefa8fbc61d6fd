//! Interaction counts and the aggregation that derives them from the event log.
//!
//! Counts arriving from loosely typed sources (JSON bodies, nullable SQL columns)
//! are parsed here, once. Anything absent, null, non-numeric, negative or
//! non-finite becomes zero so the scoring math only ever sees clean integers.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::domain::action::{ActionKind, TrackedAction, UserId};
use crate::domain::product::ProductId;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InteractionCounts {
    pub view_count: u32,
    pub click_count: u32,
    pub buy_count: u32,
}

impl InteractionCounts {
    pub const ZERO: InteractionCounts =
        InteractionCounts { view_count: 0, click_count: 0, buy_count: 0 };

    pub fn new(view_count: u32, click_count: u32, buy_count: u32) -> Self {
        Self { view_count, click_count, buy_count }
    }

    /// Parses an untyped record such as `{"view_count": "3", "click_count": null}`.
    pub fn from_record(record: &Map<String, Value>) -> Self {
        Self {
            view_count: coerce_count(record.get("view_count")),
            click_count: coerce_count(record.get("click_count")),
            buy_count: coerce_count(record.get("buy_count")),
        }
    }

    /// Builds counts from nullable integer columns (`SUM(...)` over no rows yields NULL).
    pub fn from_columns(
        view_count: Option<i64>,
        click_count: Option<i64>,
        buy_count: Option<i64>,
    ) -> Self {
        Self {
            view_count: clamp_count(view_count),
            click_count: clamp_count(click_count),
            buy_count: clamp_count(buy_count),
        }
    }

    pub fn record(&mut self, kind: ActionKind) {
        let slot = match kind {
            ActionKind::View => &mut self.view_count,
            ActionKind::Click => &mut self.click_count,
            ActionKind::Buy => &mut self.buy_count,
        };
        *slot = slot.saturating_add(1);
    }
}

/// Counts for one product, scoped to a single user.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductCounts {
    pub product_id: ProductId,
    pub counts: InteractionCounts,
}

/// Counts for one (user, product) pair; the unit of training data.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProductCounts {
    pub user_id: UserId,
    pub product_id: ProductId,
    pub counts: InteractionCounts,
}

/// Groups actions by (user, product). Pairs come out in the order their first
/// action appears, so repeated calls over the same log yield the same sequence.
pub fn aggregate<'a, I>(actions: I) -> Vec<UserProductCounts>
where
    I: IntoIterator<Item = &'a TrackedAction>,
{
    let mut positions: HashMap<(&'a UserId, &'a ProductId), usize> = HashMap::new();
    let mut grouped: Vec<UserProductCounts> = Vec::new();

    for action in actions {
        let key = (&action.user_id, &action.product_id);
        let index = *positions.entry(key).or_insert_with(|| {
            grouped.push(UserProductCounts {
                user_id: action.user_id.clone(),
                product_id: action.product_id.clone(),
                counts: InteractionCounts::ZERO,
            });
            grouped.len() - 1
        });
        grouped[index].counts.record(action.kind);
    }

    grouped
}

/// Per-product counts for one user, in first-appearance order.
pub fn aggregate_for_user<'a, I>(user_id: &UserId, actions: I) -> Vec<ProductCounts>
where
    I: IntoIterator<Item = &'a TrackedAction>,
{
    aggregate(actions.into_iter().filter(|action| &action.user_id == user_id))
        .into_iter()
        .map(|pair| ProductCounts { product_id: pair.product_id, counts: pair.counts })
        .collect()
}

pub fn coerce_count(value: Option<&Value>) -> u32 {
    let real = coerce_real(value);
    if real <= 0.0 {
        0
    } else if real >= f64::from(u32::MAX) {
        u32::MAX
    } else {
        real.trunc() as u32
    }
}

/// Numeric coercion for untyped fields: numbers pass through, numeric strings are
/// parsed, `true` is 1, everything else (including NaN and infinities) is 0.
fn coerce_real(value: Option<&Value>) -> f64 {
    let parsed = match value {
        Some(Value::Number(number)) => number.as_f64().unwrap_or(0.0),
        Some(Value::String(text)) => text.trim().parse::<f64>().unwrap_or(0.0),
        Some(Value::Bool(true)) => 1.0,
        _ => 0.0,
    };

    if parsed.is_finite() {
        parsed
    } else {
        0.0
    }
}

fn clamp_count(value: Option<i64>) -> u32 {
    value.unwrap_or(0).clamp(0, i64::from(u32::MAX)) as u32
}
