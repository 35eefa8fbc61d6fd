use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::DomainError;

/// A purchase request captured from the storefront order form. `product` is the
/// free-text item name the customer submitted, not a catalog id.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub customer_name: String,
    pub phone: String,
    pub product: String,
    pub quantity: u32,
    pub placed_at: DateTime<Utc>,
}

impl Order {
    /// Text fields are trimmed and must be non-empty; quantity must be at least 1.
    pub fn new(
        customer_name: &str,
        phone: &str,
        product: &str,
        quantity: u32,
    ) -> Result<Self, DomainError> {
        let customer_name = required(customer_name, "name")?;
        let phone = required(phone, "phone")?;
        let product = required(product, "product")?;
        if quantity == 0 {
            return Err(DomainError::InvariantViolation(
                "order quantity must be at least 1".to_string(),
            ));
        }

        Ok(Self { customer_name, phone, product, quantity, placed_at: Utc::now() })
    }
}

fn required(value: &str, field: &'static str) -> Result<String, DomainError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(DomainError::MissingField(field));
    }
    Ok(value.to_string())
}

#[cfg(test)]
mod tests {
    use super::Order;
    use crate::errors::DomainError;

    #[test]
    fn order_fields_are_trimmed() {
        let order = Order::new(" Kim ", "010-9999-8888", " Aura Epoch ", 2).expect("valid order");
        assert_eq!(order.customer_name, "Kim");
        assert_eq!(order.product, "Aura Epoch");
        assert_eq!(order.quantity, 2);
    }

    #[test]
    fn order_requires_every_field() {
        assert_eq!(Order::new("", "010", "p", 1), Err(DomainError::MissingField("name")));
        assert_eq!(Order::new("Kim", "  ", "p", 1), Err(DomainError::MissingField("phone")));
        assert_eq!(Order::new("Kim", "010", "", 1), Err(DomainError::MissingField("product")));
    }

    #[test]
    fn zero_quantity_is_rejected() {
        let error = Order::new("Kim", "010", "Aura Beam", 0).expect_err("zero quantity");
        assert!(matches!(error, DomainError::InvariantViolation(_)));
    }
}
