//! Product types

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::ValidationError;

/// Unique product identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(pub Uuid);

impl ProductId {
    /// Create a new random product ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse a product ID from a string
    pub fn parse(s: &str) -> Result<Self, uuid::Error> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

impl Default for ProductId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ProductId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for ProductId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

/// A catalog product
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub product_name: String,
    pub code: String,
    pub price: f64,
    pub model: String,
}

impl Product {
    /// Build a product from validated input
    pub fn from_input(id: ProductId, input: ProductInput) -> Self {
        Self {
            id,
            product_name: input.product_name,
            code: input.code,
            price: input.price,
            model: input.model,
        }
    }
}

/// Client-supplied product fields (create and update)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductInput {
    pub product_name: String,
    pub code: String,
    pub price: f64,
    #[serde(default)]
    pub model: String,
}

impl ProductInput {
    /// Validate the input before it reaches the store.
    ///
    /// The code ends up inside event partition keys (`#product_{code}`), so it
    /// cannot carry the `#` separator.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.product_name.trim().is_empty() {
            return Err(ValidationError::Blank("productName"));
        }
        if self.code.trim().is_empty() {
            return Err(ValidationError::Blank("code"));
        }
        if self.code.contains('#') {
            return Err(ValidationError::InvalidCode);
        }
        if !self.price.is_finite() || self.price < 0.0 {
            return Err(ValidationError::InvalidPrice);
        }
        Ok(())
    }
}
