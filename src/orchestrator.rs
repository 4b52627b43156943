use futures::future::join_all;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::alerts::{AlertDispatcher, DispatchOutcome};
use crate::config::{AppConfig, Settings};
use crate::models::{AlertState, DealResult};
use crate::plugins::registry::CheckerRegistry;
use crate::plugins::traits::{AlertTransport, CheckerBox};
use crate::scheduler::{CheckReport, CheckScheduler};
use crate::utils::error::{AppError, Result};

/// Outcome of a single check in `--once` mode.
#[derive(Debug)]
pub struct CheckOutcome {
    pub label: String,
    pub result: Result<DealResult>,
    pub dispatch: Option<DispatchOutcome>,
}

/// Owns every checker, the shared alert dispatcher and the scheduler.
pub struct DealMon {
    checkers: Vec<CheckerBox>,
    labels: Vec<String>,
    dispatcher: Arc<AlertDispatcher>,
    scheduler: CheckScheduler,
    router: Option<JoinHandle<()>>,
}

impl DealMon {
    /// Builds one checker per configured product. Products that fail validation or whose
    /// link matches no registered site are logged and skipped.
    pub fn new(config: &AppConfig, registry: &CheckerRegistry, transport: Arc<dyn AlertTransport>) -> Self {
        let mut checkers = Vec::new();

        for checker_config in config.checker_configs() {
            let checker_config = match checker_config {
                Ok(c) => c,
                Err(e) => {
                    tracing::error!("Skipping product: {}", e);
                    continue;
                }
            };

            let label = checker_config.label.clone();
            match registry.build(checker_config, &config.settings.scraper) {
                Ok(checker) => {
                    tracing::info!("Monitoring {} on {}", label, checker.site());
                    checkers.push(checker);
                }
                Err(AppError::UnsupportedSite { link }) => {
                    tracing::error!("Skipping product {}: no checker supports {}", label, link);
                }
                Err(e) => {
                    tracing::error!("Skipping product {}: {}", label, e);
                }
            }
        }

        if checkers.is_empty() {
            tracing::warn!("No products to monitor");
        }

        Self::with_checkers(&config.settings, checkers, transport)
    }

    pub fn with_checkers(settings: &Settings, checkers: Vec<CheckerBox>, transport: Arc<dyn AlertTransport>) -> Self {
        let labels = checkers.iter().map(|c| c.label().to_string()).collect();
        Self {
            checkers,
            labels,
            dispatcher: Arc::new(AlertDispatcher::new(settings.email.clone(), transport)),
            scheduler: CheckScheduler::new(settings.scheduler.clone()),
            router: None,
        }
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn checker_count(&self) -> usize {
        self.labels.len()
    }

    pub fn is_running(&self) -> bool {
        self.router.is_some()
    }

    pub fn scheduler(&self) -> &CheckScheduler {
        &self.scheduler
    }

    /// Schedules every checker and starts routing deals to the dispatcher.
    pub async fn start(&mut self) -> Result<()> {
        if self.router.is_some() {
            return Err(AppError::Internal("monitor already started".to_string()));
        }

        let (tx, rx) = mpsc::unbounded_channel();
        self.router = Some(tokio::spawn(Self::route_alerts(
            Arc::clone(&self.dispatcher),
            self.labels.clone(),
            rx,
        )));

        for (checker_id, checker) in self.checkers.drain(..).enumerate() {
            self.scheduler.schedule(checker_id, checker, tx.clone()).await?;
        }

        tracing::info!("Started monitoring {} products", self.labels.len());
        Ok(())
    }

    /// Single consumer of check reports, so dispatches never overlap.
    async fn route_alerts(
        dispatcher: Arc<AlertDispatcher>,
        labels: Vec<String>,
        mut reports: mpsc::UnboundedReceiver<CheckReport>,
    ) {
        let mut states = vec![AlertState::never_sent(); labels.len()];

        while let Some(report) = reports.recv().await {
            let Some(state) = states.get_mut(report.checker_id) else {
                tracing::warn!("Report from unknown checker {} ({})", report.checker_id, report.label);
                continue;
            };
            let outcome = dispatcher.handle_alert(&report.result, state).await;
            tracing::debug!("Alert for {}: {:?}", report.label, outcome);
        }
    }

    /// Cancels every scheduled check immediately and releases the alert transport.
    pub async fn stop(&mut self) {
        self.scheduler.shutdown().await;

        if let Some(router) = self.router.take() {
            router.abort();
            if let Err(e) = router.await {
                if !e.is_cancelled() {
                    tracing::warn!("Alert router ended abnormally: {}", e);
                }
            }
        }

        self.dispatcher.close().await;
        tracing::info!("Monitoring stopped");
    }

    /// Runs until `shutdown` resolves, then stops.
    pub async fn run_until<F>(&mut self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        self.start().await?;
        shutdown.await;
        self.stop().await;
        Ok(())
    }

    /// Checks every product once, concurrently, and dispatches any deals found.
    pub async fn run_once(&mut self) -> Result<Vec<CheckOutcome>> {
        if self.router.is_some() {
            return Err(AppError::Internal("run_once called on a started monitor".to_string()));
        }

        let results = join_all(self.checkers.iter_mut().map(|c| c.check_product())).await;

        let mut outcomes = Vec::with_capacity(results.len());
        for (label, result) in self.labels.iter().zip(results) {
            let dispatch = match &result {
                Ok(deal) => {
                    tracing::info!("Checked {}: {} at ${} (deal: {})", label, deal.name, deal.price, deal.deal);
                    let mut state = AlertState::never_sent();
                    Some(self.dispatcher.handle_alert(deal, &mut state).await)
                }
                Err(e) => {
                    tracing::error!("Check failed for {}: {}", label, e);
                    None
                }
            };
            outcomes.push(CheckOutcome {
                label: label.clone(),
                result,
                dispatch,
            });
        }

        self.dispatcher.close().await;
        Ok(outcomes)
    }
}
