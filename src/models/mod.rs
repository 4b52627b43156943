use serde::{Deserialize, Deserializer, Serialize};

pub mod product;
pub mod snapshot;
pub mod deal;

// Re-exports for convenience
pub use product::*;
pub use snapshot::*;
pub use deal::*;

/// Stock requirement for a deal.
///
/// `"available"` demands at least one in-stock store; any other value means stock is not
/// considered on its own (store matching still applies).
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StockRule {
    Available,
    #[default]
    Any,
}

impl<'de> Deserialize<'de> for StockRule {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = serde_json::Value::deserialize(deserializer)?;
        Ok(match raw.as_str() {
            Some(s) if s.eq_ignore_ascii_case("available") => StockRule::Available,
            _ => StockRule::Any,
        })
    }
}

impl std::fmt::Display for StockRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StockRule::Available => write!(f, "available"),
            StockRule::Any => write!(f, "any"),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum StockStatus {
    Available,
    Unavailable,
}

/// Accepts zip codes written either as JSON strings or bare numbers.
pub(crate) fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        serde_json::Value::Null => Ok(String::new()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number, found {}",
            other
        ))),
    }
}
