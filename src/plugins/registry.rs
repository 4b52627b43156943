use regex::Regex;

use super::checkers::frys::{self, FrysChecker};
use super::traits::CheckerBox;
use crate::config::ScraperSettings;
use crate::models::CheckerConfig;
use crate::utils::error::{AppError, Result};

pub type CheckerConstructor =
    Box<dyn Fn(CheckerConfig, &ScraperSettings) -> Result<CheckerBox> + Send + Sync>;

struct RegistryEntry {
    site: String,
    pattern: Regex,
    constructor: CheckerConstructor,
}

/// Maps link patterns to checker constructors. Entries are consulted in registration
/// order and the first match wins.
pub struct CheckerRegistry {
    entries: Vec<RegistryEntry>,
}

impl CheckerRegistry {
    pub fn new() -> Self {
        Self { entries: Vec::new() }
    }

    /// Registry with every built-in site adapter.
    pub fn with_default_sites() -> Self {
        let mut registry = Self::new();
        registry
            .register(frys::SITE, frys::LINK_PATTERN, |config, settings| {
                Ok(Box::new(FrysChecker::new(config, settings)?) as CheckerBox)
            })
            .expect("built-in link patterns are valid");
        registry
    }

    /// Register a checker variant for links matching `pattern`
    pub fn register<F>(&mut self, site: &str, pattern: &str, constructor: F) -> Result<()>
    where
        F: Fn(CheckerConfig, &ScraperSettings) -> Result<CheckerBox> + Send + Sync + 'static,
    {
        let pattern = Regex::new(pattern).map_err(|e| AppError::Validation(format!(
            "invalid link pattern for site {}: {}",
            site, e
        )))?;

        self.entries.push(RegistryEntry {
            site: site.to_string(),
            pattern,
            constructor: Box::new(constructor),
        });
        Ok(())
    }

    /// Site name of the first entry matching `link`
    pub fn site_for(&self, link: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|entry| entry.pattern.is_match(link))
            .map(|entry| entry.site.as_str())
    }

    pub fn list_sites(&self) -> Vec<String> {
        self.entries.iter().map(|entry| entry.site.clone()).collect()
    }

    /// Builds the checker for a product, or `UnsupportedSite` when no pattern matches.
    pub fn build(&self, config: CheckerConfig, settings: &ScraperSettings) -> Result<CheckerBox> {
        let entry = self
            .entries
            .iter()
            .find(|entry| entry.pattern.is_match(&config.link))
            .ok_or_else(|| AppError::UnsupportedSite { link: config.link.clone() })?;

        tracing::debug!("Building {} checker for product {}", entry.site, config.label);
        (entry.constructor)(config, settings)
    }
}

impl Default for CheckerRegistry {
    fn default() -> Self {
        Self::with_default_sites()
    }
}
