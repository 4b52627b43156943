use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::utils::error::Result;

/// One rendered alert for one recipient.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AlertMessage {
    /// Display name of the sender
    pub from_name: String,
    pub from_address: String,
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// Outbound alert channel shared by every checker.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AlertTransport: Send + Sync {
    fn name(&self) -> &str;

    /// Delivers one message, opening the underlying connection on first use.
    async fn send(&self, message: &AlertMessage) -> Result<()>;

    /// Releases the underlying connection. Safe to call when nothing was opened.
    async fn close(&self);
}
