use std::time::Duration;

use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, warn};

use super::{Browser, BrowserError, TabId, TabStatus};

/// One-shot "this tab finished loading" signal.
///
/// Register it before triggering the reload or navigation, then `wait()`.
/// Waiting consumes the signal, so the subscription goes away after it fires.
pub struct CompletionSignal {
    tab_id: TabId,
    updates: broadcast::Receiver<super::TabUpdated>,
    timeout: Option<Duration>,
}

impl CompletionSignal {
    pub fn register(browser: &dyn Browser, tab_id: &TabId) -> Self {
        Self {
            tab_id: tab_id.clone(),
            updates: browser.tab_updates(),
            timeout: None,
        }
    }

    /// Bound the wait. Without a timeout a tab that never completes stalls forever.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub async fn wait(self) -> Result<(), BrowserError> {
        let tab_id = self.tab_id.clone();
        let timeout = self.timeout;
        match timeout {
            Some(limit) => tokio::time::timeout(limit, self.wait_complete())
                .await
                .map_err(|_| {
                    BrowserError::Timeout(format!("tab {} did not finish loading", tab_id))
                })?,
            None => self.wait_complete().await,
        }
    }

    async fn wait_complete(mut self) -> Result<(), BrowserError> {
        loop {
            match self.updates.recv().await {
                Ok(update)
                    if update.tab_id == self.tab_id && update.status == TabStatus::Complete =>
                {
                    debug!(tab = %self.tab_id, "tab load complete");
                    return Ok(());
                }
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => {
                    warn!(tab = %self.tab_id, skipped, "missed tab updates");
                }
                Err(RecvError::Closed) => return Err(BrowserError::Disconnected),
            }
        }
    }
}
