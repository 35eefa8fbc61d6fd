use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(pub String);

impl ProductId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ProductId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Catalog entry as shown in the storefront. `price` is in whole currency units.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub tagline: String,
    pub description: String,
    pub long_description: String,
    pub price: i64,
    pub category: String,
    pub image_url: String,
    pub features: Vec<String>,
}

impl Product {
    /// Minimal catalog entry; descriptive fields are left empty.
    pub fn named(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: ProductId(id.into()),
            name: name.into(),
            tagline: String::new(),
            description: String::new(),
            long_description: String::new(),
            price: 0,
            category: String::new(),
            image_url: String::new(),
            features: Vec::new(),
        }
    }
}
