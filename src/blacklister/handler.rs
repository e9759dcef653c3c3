//! Subscription glue between the event source and the engine.

use async_trait::async_trait;

use crate::blacklister::engine::Blacklister;
use crate::blacklister::error::BlacklistError;
use crate::event::{Disposition, EventHandler, TimeoutReport};

#[async_trait]
impl EventHandler for Blacklister {
    type Event = TimeoutReport;
    type Error = BlacklistError;

    async fn handle(&self, event: TimeoutReport) -> Result<(), BlacklistError> {
        match self.on_timeout_report(&event).await {
            Ok(_) => Ok(()),
            Err(e) => {
                if e.is_expected() {
                    tracing::debug!(url = %event.url, error = %e, "Report ignored");
                } else {
                    tracing::warn!(url = %event.url, error = %e, "Failed to handle timeout report");
                }
                Err(e)
            }
        }
    }

    fn disposition(&self, error: &BlacklistError) -> Disposition {
        if error.is_retryable() {
            Disposition::Redeliver
        } else {
            Disposition::Reject
        }
    }
}
