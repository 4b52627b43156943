use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::DealRules;

/// Outcome of one check cycle.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DealResult {
    pub name: String,
    pub link: String,
    pub price: Decimal,
    pub deal: bool,
    /// Matching in-stock stores; empty unless `deal` is true.
    pub stores: Vec<String>,
    pub criteria: DealRules,
}

/// Per-checker alert bookkeeping, owned by the alert router.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlertState {
    pub last_email_alert: DateTime<Utc>,
}

impl AlertState {
    pub fn never_sent() -> Self {
        // DateTime<Utc>::default() is the Unix epoch
        Self { last_email_alert: DateTime::<Utc>::default() }
    }

    pub fn is_never_sent(&self) -> bool {
        self.last_email_alert == DateTime::<Utc>::default()
    }
}

impl Default for AlertState {
    fn default() -> Self {
        Self::never_sent()
    }
}
