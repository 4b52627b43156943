use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;

use crate::config::EmailSettings;
use crate::models::{AlertState, DealResult};
use crate::plugins::traits::{AlertMessage, AlertTransport};
use crate::utils::time::minutes;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Alerting is switched off globally
    Disabled,
    NotADeal,
    CoolingDown { remaining: Duration },
    Sent { delivered: usize, failed: usize },
}

/// Cooldown-gated email notifier shared by every checker.
///
/// Callers serialize access (the orchestrator routes every result through one task);
/// the transport itself also guards its connection.
pub struct AlertDispatcher {
    settings: EmailSettings,
    transport: Arc<dyn AlertTransport>,
}

impl AlertDispatcher {
    pub fn new(settings: EmailSettings, transport: Arc<dyn AlertTransport>) -> Self {
        Self { settings, transport }
    }

    pub fn is_enabled(&self) -> bool {
        self.settings.enabled
    }

    pub fn cooldown(&self) -> Duration {
        minutes(self.settings.cooldown_m)
    }

    pub async fn handle_alert(&self, deal: &DealResult, state: &mut AlertState) -> DispatchOutcome {
        self.handle_alert_at(deal, state, Utc::now()).await
    }

    /// Same as [`handle_alert`](Self::handle_alert) with an explicit clock.
    pub async fn handle_alert_at(
        &self,
        deal: &DealResult,
        state: &mut AlertState,
        now: DateTime<Utc>,
    ) -> DispatchOutcome {
        if !self.settings.enabled {
            return DispatchOutcome::Disabled;
        }
        if !deal.deal {
            return DispatchOutcome::NotADeal;
        }

        // A clock that moved backwards counts as no time elapsed
        let elapsed = (now - state.last_email_alert).to_std().unwrap_or(Duration::ZERO);
        let cooldown = self.cooldown();
        if !state.is_never_sent() && elapsed < cooldown {
            let remaining = cooldown - elapsed;
            tracing::info!("Cooling down for {}: {}s left", deal.name, remaining.as_secs());
            return DispatchOutcome::CoolingDown { remaining };
        }

        tracing::info!("Sending deal alert for {} to {} recipients", deal.name, self.settings.alert_list.len());
        let mut delivered = 0;
        let mut failed = 0;
        for recipient in &self.settings.alert_list {
            let message = self.render_message(deal, recipient);
            match self.transport.send(&message).await {
                Ok(()) => {
                    delivered += 1;
                    tracing::info!("Sent email to {} about {}", recipient, deal.name);
                }
                Err(e) => {
                    failed += 1;
                    tracing::error!("Failed to send alert for {} to {}: {}", deal.name, recipient, e);
                }
            }
        }

        if delivered > 0 {
            state.last_email_alert = now;
        }

        DispatchOutcome::Sent { delivered, failed }
    }

    pub fn render_message(&self, deal: &DealResult, recipient: &str) -> AlertMessage {
        let smtp = &self.settings.smtp_mailer;
        AlertMessage {
            from_name: smtp.from.clone(),
            from_address: smtp.login.clone(),
            to: recipient.to_string(),
            subject: format!("{}{}", smtp.subject_prefix, deal.name),
            body: render_body(deal),
        }
    }

    pub async fn close(&self) {
        self.transport.close().await;
    }
}

pub fn render_body(deal: &DealResult) -> String {
    let mut text = String::new();

    text.push_str("Your deal was found!\n");
    text.push_str(&format!("Product: {}\n", deal.name));
    text.push_str(&format!("Link: {}\n", deal.link));
    text.push_str(&format!("Price: ${}\n", deal.price));
    text.push_str(&format!("Stores: {}\n\n", deal.stores.join(", ")));
    text.push_str("Your deal criteria:\n");
    text.push_str(&deal.criteria.to_string());
    text.push('\n');

    text
}
