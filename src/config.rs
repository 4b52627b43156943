use config::{Config, ConfigError, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::path::Path;

use crate::models::CheckerConfig;
use crate::utils::error::{AppError, Result};
use crate::utils::merge::{deep_merge, deep_merge_into};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub settings: Settings,
    /// Per-product overrides keyed by label, kept raw until merged with the globals.
    #[serde(default)]
    pub products: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "empty_object")]
    pub global_product_settings: Value,
    #[serde(default)]
    pub email: EmailSettings,
    #[serde(default)]
    pub scraper: ScraperSettings,
    #[serde(default)]
    pub scheduler: SchedulerSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            global_product_settings: empty_object(),
            email: EmailSettings::default(),
            scraper: ScraperSettings::default(),
            scheduler: SchedulerSettings::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct EmailSettings {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub alert_list: Vec<String>,
    #[serde(default)]
    pub cooldown_m: f64,
    #[serde(default)]
    pub smtp_mailer: SmtpMailerConfig,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SmtpSecurity {
    /// STARTTLS upgrade, usually port 587
    Tls,
    /// Implicit TLS, usually port 465
    Ssl,
    #[default]
    #[serde(other)]
    None,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmtpMailerConfig {
    #[serde(default)]
    pub server: String,
    #[serde(default = "default_smtp_port")]
    pub port: u16,
    #[serde(default)]
    pub security: SmtpSecurity,
    #[serde(default)]
    pub domain: String,
    #[serde(default)]
    pub login: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub from: String,
    #[serde(default)]
    pub subject_prefix: String,
}

impl Default for SmtpMailerConfig {
    fn default() -> Self {
        Self {
            server: String::new(),
            port: default_smtp_port(),
            security: SmtpSecurity::None,
            domain: String::new(),
            login: String::new(),
            password: String::new(),
            from: String::new(),
            subject_prefix: String::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScraperSettings {
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_s: u64,
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: usize,
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
}

impl Default for ScraperSettings {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            request_timeout_s: default_request_timeout(),
            retry_attempts: default_retry_attempts(),
            retry_delay_ms: default_retry_delay_ms(),
        }
    }
}

/// How a scheduled unit waits between checks.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum PacingMode {
    /// Sleep the absolute value of a freshly drawn interval after a check that finished
    /// inside its interval; no sleep after an overrun.
    #[default]
    FullInterval,
    /// Sleep the freshly drawn interval minus the time the check took, never below zero.
    Remaining,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerSettings {
    #[serde(default)]
    pub pacing: PacingMode,
    /// Upper bound for the sleep multiplier applied after consecutive failed checks.
    #[serde(default = "default_failure_backoff_max")]
    pub failure_backoff_max: u32,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            pacing: PacingMode::default(),
            failure_backoff_max: default_failure_backoff_max(),
        }
    }
}

fn empty_object() -> Value {
    json!({})
}

fn default_smtp_port() -> u16 {
    587
}

fn default_user_agent() -> String {
    concat!("DealMon/", env!("CARGO_PKG_VERSION")).to_string()
}

fn default_request_timeout() -> u64 {
    30
}

fn default_retry_attempts() -> usize {
    2
}

fn default_retry_delay_ms() -> u64 {
    1000
}

fn default_failure_backoff_max() -> u32 {
    4
}

impl AppConfig {
    /// Loads the JSON configuration at `path`, layered with `DEALMON_*` environment
    /// overrides (`__` separates nesting levels). Overrides apply to `settings` only;
    /// products come from the file. A missing file yields an empty configuration.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let path_str = path.to_string_lossy();

        let s = Config::builder()
            .add_source(File::new(&path_str, FileFormat::Json).required(false))
            // e.g. DEALMON_SETTINGS__EMAIL__SMTP_MAILER__PASSWORD
            .add_source(
                Environment::with_prefix("DEALMON")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let mut config: AppConfig = s.try_deserialize()?;
        // `config` lowercases map keys; product labels are read as written
        config.products = Self::read_products(path)?;
        config.validate()?;
        Ok(config)
    }

    /// The `products` table of the file at `path`, keys untouched. Empty when the file is
    /// missing or has no products.
    fn read_products(path: &Path) -> Result<BTreeMap<String, Value>> {
        if !path.exists() {
            return Ok(BTreeMap::new());
        }

        let raw: Value = serde_json::from_str(&std::fs::read_to_string(path)?)?;
        match raw.get("products") {
            Some(products) => Ok(serde_json::from_value(products.clone())?),
            None => Ok(BTreeMap::new()),
        }
    }

    /// Like [`AppConfig::load`], but never fails: a missing or unreadable file is reported
    /// and replaced by an empty configuration.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        if !path.exists() {
            tracing::warn!("Configuration file {} not found; starting with an empty configuration", path.display());
        }

        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                tracing::error!("Failed to load configuration from {}: {}; starting with an empty configuration", path.display(), e);
                Self::default()
            }
        }
    }

    pub fn from_value(value: Value) -> Result<Self> {
        let config: AppConfig = serde_json::from_value(value)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        let email = &self.settings.email;
        if email.enabled {
            if email.smtp_mailer.server.trim().is_empty() {
                return Err(ConfigError::Message("settings.email.smtp_mailer.server is required when email is enabled".into()));
            }
            if email.smtp_mailer.port == 0 {
                return Err(ConfigError::Message("SMTP port must be greater than 0".into()));
            }
            if email.alert_list.is_empty() {
                tracing::warn!("Email alerts are enabled but settings.email.alert_list is empty");
            }
        }

        if !(email.cooldown_m.is_finite() && email.cooldown_m >= 0.0) {
            return Err(ConfigError::Message("settings.email.cooldown_m must not be negative".into()));
        }

        if self.settings.scraper.request_timeout_s == 0 {
            return Err(ConfigError::Message("Scraper request_timeout_s must be greater than 0".into()));
        }

        if self.settings.scheduler.failure_backoff_max == 0 {
            return Err(ConfigError::Message("Scheduler failure_backoff_max must be greater than 0".into()));
        }

        Ok(())
    }

    /// Merged product document: globals, then the injected label, then the product's own
    /// overrides.
    pub fn merged_product(&self, label: &str) -> Option<Value> {
        let overrides = self.products.get(label)?;
        let mut merged = deep_merge(&self.settings.global_product_settings, &json!({ "label": label }));
        deep_merge_into(&mut merged, overrides.clone());
        Some(merged)
    }

    /// Builds every product's [`CheckerConfig`]. Invalid products are returned as errors
    /// alongside the valid ones so the caller can skip them individually.
    pub fn checker_configs(&self) -> Vec<std::result::Result<CheckerConfig, AppError>> {
        self.products
            .keys()
            .filter_map(|label| {
                self.merged_product(label)
                    .map(|merged| CheckerConfig::from_value(label, merged))
            })
            .collect()
    }
}
