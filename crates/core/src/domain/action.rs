use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::product::ProductId;
use crate::errors::DomainError;

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

impl UserId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// The three interaction types the storefront records between a user and a product.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    View,
    Click,
    Buy,
}

impl ActionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::View => "view",
            Self::Click => "click",
            Self::Buy => "buy",
        }
    }
}

impl FromStr for ActionKind {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "view" => Ok(Self::View),
            "click" => Ok(Self::Click),
            "buy" => Ok(Self::Buy),
            other => Err(DomainError::UnknownActionKind(other.to_string())),
        }
    }
}

impl std::fmt::Display for ActionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of the append-only event log.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedAction {
    pub user_id: UserId,
    pub kind: ActionKind,
    pub product_id: ProductId,
    pub occurred_at: DateTime<Utc>,
}

impl TrackedAction {
    /// Builds an action stamped with the current time. Identifiers are trimmed and
    /// must be non-empty.
    pub fn new(user_id: &str, kind: ActionKind, product_id: &str) -> Result<Self, DomainError> {
        Self::at(user_id, kind, product_id, Utc::now())
    }

    pub fn at(
        user_id: &str,
        kind: ActionKind,
        product_id: &str,
        occurred_at: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        let user_id = user_id.trim();
        if user_id.is_empty() {
            return Err(DomainError::MissingField("userId"));
        }
        let product_id = product_id.trim();
        if product_id.is_empty() {
            return Err(DomainError::MissingField("productId"));
        }

        Ok(Self {
            user_id: UserId(user_id.to_string()),
            kind,
            product_id: ProductId(product_id.to_string()),
            occurred_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{ActionKind, TrackedAction};
    use crate::errors::DomainError;

    #[test]
    fn action_kind_parses_case_insensitively() {
        assert_eq!("view".parse::<ActionKind>(), Ok(ActionKind::View));
        assert_eq!(" Click ".parse::<ActionKind>(), Ok(ActionKind::Click));
        assert_eq!("BUY".parse::<ActionKind>(), Ok(ActionKind::Buy));
    }

    #[test]
    fn unknown_action_kind_is_rejected() {
        let error = "cart".parse::<ActionKind>().expect_err("cart is not tracked");
        assert_eq!(error, DomainError::UnknownActionKind("cart".to_string()));
    }

    #[test]
    fn tracked_action_requires_identifiers() {
        assert_eq!(
            TrackedAction::new("  ", ActionKind::View, "p1"),
            Err(DomainError::MissingField("userId"))
        );
        assert_eq!(
            TrackedAction::new("test", ActionKind::View, ""),
            Err(DomainError::MissingField("productId"))
        );

        let action = TrackedAction::new(" test ", ActionKind::Buy, "p2").expect("valid action");
        assert_eq!(action.user_id.as_str(), "test");
        assert_eq!(action.product_id.as_str(), "p2");
        assert_eq!(action.kind, ActionKind::Buy);
    }
}
