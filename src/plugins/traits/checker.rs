use async_trait::async_trait;

use crate::evaluator::assemble_result;
use crate::models::{CheckerConfig, DealResult, ProductSnapshot};
use crate::utils::error::Result;

pub type CheckerBox = Box<dyn Checker>;

/// Monitors one product against one rule set.
///
/// Implementors only provide the site-specific scrape; evaluation and result assembly
/// are shared. A checker is owned by exactly one scheduled unit, so `scrape_site` may
/// mutate session state freely.
#[async_trait]
pub trait Checker: Send {
    /// Site identifier, e.g. "frys"
    fn site(&self) -> &str;

    fn config(&self) -> &CheckerConfig;

    fn label(&self) -> &str {
        &self.config().label
    }

    /// Fetches a fresh snapshot. Must be safe to call again after a failure.
    async fn scrape_site(&mut self) -> Result<ProductSnapshot>;

    /// Scrapes and evaluates the product against its rules.
    async fn check_product(&mut self) -> Result<DealResult> {
        let snapshot = self.scrape_site().await?;
        Ok(assemble_result(self.config(), snapshot))
    }
}
