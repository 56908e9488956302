use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::{Value, json};
use tokio::sync::{Mutex, broadcast};
use tracing::debug;

use super::client::CdpClient;
use crate::browser::{Browser, BrowserError, Tab, TabId, TabUpdated};

/// [`Browser`] backed by a Chrome remote-debugging endpoint.
pub struct CdpBrowser {
    client: CdpClient,
    /// Tab → flattened session id.
    attached: Mutex<HashMap<TabId, String>>,
}

impl CdpBrowser {
    pub async fn connect(endpoint: &str) -> Result<Self, BrowserError> {
        Ok(Self {
            client: CdpClient::connect(endpoint).await?,
            attached: Mutex::new(HashMap::new()),
        })
    }

    /// Attach to the tab on first use and enable the domains we listen to.
    async fn session(&self, tab: &TabId) -> Result<String, BrowserError> {
        let mut attached = self.attached.lock().await;
        if let Some(session_id) = attached.get(tab) {
            return Ok(session_id.clone());
        }

        let result = self
            .client
            .call(
                "Target.attachToTarget",
                Some(json!({"targetId": tab.0, "flatten": true})),
                None,
            )
            .await?;

        let session_id = result["sessionId"]
            .as_str()
            .ok_or_else(|| BrowserError::InvalidResponse("Missing sessionId".to_string()))?
            .to_string();

        self.client.register_session(&session_id, tab);
        self.client
            .call("Page.enable", None, Some(&session_id))
            .await?;
        self.client
            .call("Runtime.enable", None, Some(&session_id))
            .await?;

        debug!(tab = %tab, session = %session_id, "attached to tab");
        attached.insert(tab.clone(), session_id.clone());
        Ok(session_id)
    }
}

#[async_trait]
impl Browser for CdpBrowser {
    async fn active_tab(&self) -> Result<Tab, BrowserError> {
        self.client
            .list_pages()
            .await?
            .into_iter()
            .find(|p| p.page_type == "page")
            .map(|p| Tab {
                id: TabId(p.id),
                url: p.url,
            })
            .ok_or(BrowserError::NoActiveTab)
    }

    async fn tab(&self, id: &TabId) -> Result<Tab, BrowserError> {
        self.client
            .list_pages()
            .await?
            .into_iter()
            .find(|p| p.id == id.0)
            .map(|p| Tab {
                id: TabId(p.id),
                url: p.url,
            })
            .ok_or_else(|| BrowserError::TabNotFound(id.to_string()))
    }

    async fn reload(&self, id: &TabId) -> Result<(), BrowserError> {
        let session_id = self.session(id).await?;
        self.client
            .call(
                "Page.reload",
                Some(json!({"ignoreCache": true})),
                Some(&session_id),
            )
            .await?;
        debug!(tab = %id, "reload issued");
        Ok(())
    }

    async fn create_tab(&self) -> Result<TabId, BrowserError> {
        let result = self
            .client
            .call(
                "Target.createTarget",
                Some(json!({"url": "about:blank"})),
                None,
            )
            .await?;

        let target_id = result["targetId"]
            .as_str()
            .ok_or_else(|| BrowserError::InvalidResponse("Missing targetId".to_string()))?;
        let tab = TabId::from(target_id);

        self.session(&tab).await?;
        debug!(tab = %tab, "created tab");
        Ok(tab)
    }

    async fn navigate(&self, id: &TabId, url: &str) -> Result<(), BrowserError> {
        let session_id = self.session(id).await?;
        let result = self
            .client
            .call("Page.navigate", Some(json!({"url": url})), Some(&session_id))
            .await?;

        if let Some(error) = result.get("errorText") {
            return Err(BrowserError::NavigationFailed(
                error.as_str().unwrap_or("Unknown error").to_string(),
            ));
        }

        debug!(tab = %id, url, "navigation started");
        Ok(())
    }

    async fn evaluate(&self, id: &TabId, expression: &str) -> Result<Value, BrowserError> {
        let session_id = self.session(id).await?;
        let result = self
            .client
            .call(
                "Runtime.evaluate",
                Some(json!({
                    "expression": expression,
                    "returnByValue": true,
                    "awaitPromise": true,
                })),
                Some(&session_id),
            )
            .await?;

        if let Some(exception) = result.get("exceptionDetails") {
            let text = exception["exception"]["description"]
                .as_str()
                .or_else(|| exception["text"].as_str())
                .unwrap_or("Unknown error");
            return Err(BrowserError::JavaScript(text.to_string()));
        }

        Ok(result["result"]["value"].clone())
    }

    fn tab_updates(&self) -> broadcast::Receiver<TabUpdated> {
        self.client.subscribe()
    }
}
