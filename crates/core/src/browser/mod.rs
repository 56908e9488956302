//! Browser abstraction: tabs, their load lifecycle, and page-side evaluation.
//!
//! The pipeline only talks to [`Browser`]; [`cdp::CdpBrowser`] drives a real
//! Chrome through the DevTools Protocol.

pub mod cdp;
mod completion;
mod error;

use std::{fmt, sync::Arc};

use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;
use tokio::sync::broadcast;

pub use completion::CompletionSignal;
pub use error::BrowserError;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, serde::Deserialize)]
pub struct TabId(pub String);

impl fmt::Display for TabId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TabId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, serde::Deserialize)]
pub struct Tab {
    pub id: TabId,
    pub url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TabStatus {
    Loading,
    Complete,
}

/// Lifecycle notification for one tab.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TabUpdated {
    pub tab_id: TabId,
    pub status: TabStatus,
}

#[async_trait]
pub trait Browser: Send + Sync {
    /// The tab the user is looking at.
    async fn active_tab(&self) -> Result<Tab, BrowserError>;

    async fn tab(&self, id: &TabId) -> Result<Tab, BrowserError>;

    /// Force a full reload, bypassing the cache.
    async fn reload(&self, id: &TabId) -> Result<(), BrowserError>;

    /// Open a blank tab. Navigation is a separate step so a completion
    /// listener can be registered before the load starts.
    async fn create_tab(&self) -> Result<TabId, BrowserError>;

    async fn navigate(&self, id: &TabId, url: &str) -> Result<(), BrowserError>;

    /// Evaluate a JavaScript expression in the tab and return its JSON value.
    async fn evaluate(&self, id: &TabId, expression: &str) -> Result<Value, BrowserError>;

    /// Subscribe to lifecycle notifications for every tab.
    fn tab_updates(&self) -> broadcast::Receiver<TabUpdated>;
}

/// A tab bound to the browser that owns it.
#[derive(Clone)]
pub struct Page {
    browser: Arc<dyn Browser>,
    tab_id: TabId,
}

impl Page {
    pub fn new(browser: Arc<dyn Browser>, tab_id: TabId) -> Self {
        Self { browser, tab_id }
    }

    pub fn tab_id(&self) -> &TabId {
        &self.tab_id
    }

    pub async fn evaluate(&self, expression: &str) -> Result<Value, BrowserError> {
        self.browser.evaluate(&self.tab_id, expression).await
    }

    pub async fn evaluate_as<T: DeserializeOwned>(
        &self,
        expression: &str,
    ) -> Result<T, BrowserError> {
        let value = self.evaluate(expression).await?;
        Ok(serde_json::from_value(value)?)
    }
}

/// Encode a Rust string as a JavaScript string literal.
pub fn js_string(value: &str) -> String {
    // JSON strings are valid JS literals except for U+2028/U+2029 in old engines.
    serde_json::to_string(value)
        .unwrap_or_else(|_| "\"\"".to_string())
        .replace('\u{2028}', "\\u2028")
        .replace('\u{2029}', "\\u2029")
}

#[cfg(any(test, feature = "test-support"))]
pub mod fake;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn js_string_escapes_quotes_and_newlines() {
        assert_eq!(js_string("say \"hi\"\nnow"), r#""say \"hi\"\nnow""#);
    }

    #[test]
    fn js_string_escapes_line_separators() {
        assert_eq!(js_string("a\u{2028}b"), r#""a\u2028b""#);
    }
}
