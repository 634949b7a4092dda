use serde::{Deserialize, Serialize};

/// Catalog entry an order refers to. Immutable once the order is created.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Item {
    pub id: String,
    pub name: String,
    pub price: f64,
}
