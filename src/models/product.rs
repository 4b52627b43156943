use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

use crate::models::StockRule;
use crate::utils::error::{AppError, Result};

/// Deal rules a product is evaluated against on every check.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DealRules {
    pub price_below_usd: Decimal,
    #[serde(default)]
    pub stores: Vec<String>,
    #[serde(default)]
    pub stock: StockRule,
    #[serde(default, deserialize_with = "crate::models::string_or_number")]
    pub zip_code: String,
}

impl fmt::Display for DealRules {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Price below: ${}", self.price_below_usd)?;
        writeln!(f, "Stores: {}", self.stores.join(", "))?;
        writeln!(f, "Stock: {}", self.stock)?;
        write!(f, "Zip code: {}", self.zip_code)
    }
}

/// Fully merged per-product configuration; one per Checker.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CheckerConfig {
    pub label: String,
    pub link: String,
    pub rules: DealRules,
    pub check_interval_m: f64,
    #[serde(default)]
    pub check_interval_jitter_m: f64,
}

impl CheckerConfig {
    /// Deserializes a merged product document and validates it.
    pub fn from_value(label: &str, value: serde_json::Value) -> Result<Self> {
        let config: CheckerConfig =
            serde_json::from_value(value).map_err(|e| AppError::InvalidProduct {
                label: label.to_string(),
                message: e.to_string(),
            })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let invalid = |message: &str| AppError::InvalidProduct {
            label: self.label.clone(),
            message: message.to_string(),
        };

        if Url::parse(&self.link).is_err() {
            return Err(invalid("link is not a valid URL"));
        }
        if !(self.check_interval_m.is_finite() && self.check_interval_m > 0.0) {
            return Err(invalid("check_interval_m must be greater than 0"));
        }
        if !(self.check_interval_jitter_m.is_finite() && self.check_interval_jitter_m >= 0.0) {
            return Err(invalid("check_interval_jitter_m must not be negative"));
        }
        if self.rules.price_below_usd.is_sign_negative() {
            return Err(invalid("rules.price_below_usd must not be negative"));
        }
        if self.check_interval_jitter_m > self.check_interval_m {
            tracing::warn!(
                "Product {}: jitter ({}m) exceeds the base interval ({}m); some draws will be negative",
                self.label,
                self.check_interval_jitter_m,
                self.check_interval_m
            );
        }

        Ok(())
    }

    pub fn url(&self) -> Result<Url> {
        Url::parse(&self.link).map_err(|e| AppError::InvalidProduct {
            label: self.label.clone(),
            message: format!("invalid link: {}", e),
        })
    }
}
