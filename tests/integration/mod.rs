// Integration tests for DealMon
// These tests drive the monitor end to end with scripted checkers and a recording transport

pub mod monitor_tests;
pub mod site_pipeline_tests;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde_json::json;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use dealmon::config::{AppConfig, Settings};
use dealmon::models::{CheckerConfig, DealRules, ProductSnapshot, StockRule, StoreStock};
use dealmon::plugins::{AlertMessage, AlertTransport, Checker, CheckerBox};
use dealmon::{AppError, Result};

/// Transport that keeps every message instead of sending it
#[derive(Default)]
pub struct RecordingTransport {
    sent: Mutex<Vec<AlertMessage>>,
    closed: AtomicBool,
}

impl RecordingTransport {
    pub fn sent(&self) -> Vec<AlertMessage> {
        self.sent.lock().unwrap().clone()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AlertTransport for RecordingTransport {
    fn name(&self) -> &str {
        "recording"
    }

    async fn send(&self, message: &AlertMessage) -> Result<()> {
        self.sent.lock().unwrap().push(message.clone());
        Ok(())
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

/// Checker that replays a fixed list of prices, repeating the last one. A `None` entry
/// is a failed scrape.
pub struct ScriptedChecker {
    config: CheckerConfig,
    prices: VecDeque<Option<i64>>,
    last: Option<i64>,
}

impl ScriptedChecker {
    pub fn boxed(label: &str, prices: &[Option<i64>]) -> CheckerBox {
        Box::new(Self {
            config: product_config(label),
            prices: prices.iter().copied().collect(),
            last: None,
        })
    }
}

#[async_trait]
impl Checker for ScriptedChecker {
    fn site(&self) -> &str {
        "scripted"
    }

    fn config(&self) -> &CheckerConfig {
        &self.config
    }

    async fn scrape_site(&mut self) -> Result<ProductSnapshot> {
        let price = match self.prices.pop_front() {
            Some(next) => {
                self.last = next;
                next
            }
            None => self.last,
        };
        let price = price.ok_or_else(|| AppError::Scraping("site unreachable".to_string()))?;

        Ok(ProductSnapshot {
            name: format!("{} product", self.config.label),
            price: Decimal::from(price),
            stores_with_stock: vec![StoreStock::available("Store A")],
        })
    }
}

pub fn product_config(label: &str) -> CheckerConfig {
    CheckerConfig {
        label: label.to_string(),
        link: format!("http://shop.example.com/product/{}", label),
        rules: DealRules {
            price_below_usd: Decimal::from(50),
            stores: vec!["Store A".to_string()],
            stock: StockRule::Available,
            zip_code: "95131".to_string(),
        },
        check_interval_m: 30.0,
        check_interval_jitter_m: 0.0,
    }
}

pub fn email_settings(cooldown_m: f64) -> Settings {
    let config = AppConfig::from_value(json!({
        "settings": {
            "email": {
                "enabled": true,
                "alert_list": ["me@example.com", "you@example.com"],
                "cooldown_m": cooldown_m,
                "smtp_mailer": {
                    "server": "smtp.example.com",
                    "login": "alerts@example.com",
                    "from": "DealMon",
                    "subject_prefix": "[DealMon] "
                }
            }
        }
    }))
    .expect("test settings are valid");
    config.settings
}
