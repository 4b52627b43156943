use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::StockStatus;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoreStock {
    pub store: String,
    pub status: StockStatus,
}

impl StoreStock {
    pub fn available(store: impl Into<String>) -> Self {
        Self { store: store.into(), status: StockStatus::Available }
    }

    pub fn unavailable(store: impl Into<String>) -> Self {
        Self { store: store.into(), status: StockStatus::Unavailable }
    }

    pub fn is_available(&self) -> bool {
        self.status == StockStatus::Available
    }
}

/// Normalized result of one scrape. Built fresh every check, never persisted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProductSnapshot {
    pub name: String,
    pub price: Decimal,
    pub stores_with_stock: Vec<StoreStock>,
}

impl ProductSnapshot {
    /// Names of stores reporting the product in stock, in page order.
    pub fn in_stock_stores(&self) -> impl Iterator<Item = &str> {
        self.stores_with_stock
            .iter()
            .filter(|s| s.is_available())
            .map(|s| s.store.as_str())
    }
}
