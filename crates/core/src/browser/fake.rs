//! In-memory [`Browser`] for tests.

use std::{
    sync::atomic::{AtomicU64, Ordering},
    time::Duration,
};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::broadcast;

use super::{Browser, BrowserError, Tab, TabId, TabStatus, TabUpdated};

/// Something the fake browser was asked to do, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Reload(TabId),
    CreateTab(TabId),
    Navigate(TabId, String),
    Evaluate(TabId, String),
}

type Responder = Box<dyn Fn(&TabId, &str) -> Option<Value> + Send + Sync>;

pub struct FakeBrowser {
    tabs: Mutex<Vec<Tab>>,
    calls: Mutex<Vec<Call>>,
    updates: Mutex<Option<broadcast::Sender<TabUpdated>>>,
    responders: Mutex<Vec<Responder>>,
    next_tab: AtomicU64,
    /// Emit `Complete` right after reload/navigate.
    auto_complete: bool,
    /// How long each evaluation takes to answer.
    latency: Duration,
}

impl Default for FakeBrowser {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeBrowser {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(64);
        Self {
            tabs: Mutex::new(Vec::new()),
            calls: Mutex::new(Vec::new()),
            updates: Mutex::new(Some(tx)),
            responders: Mutex::new(Vec::new()),
            next_tab: AtomicU64::new(1),
            auto_complete: false,
            latency: Duration::ZERO,
        }
    }

    pub fn auto_complete(mut self) -> Self {
        self.auto_complete = true;
        self
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn with_tab(self, id: &str, url: &str) -> Self {
        self.tabs.lock().push(Tab {
            id: TabId::from(id),
            url: url.to_string(),
        });
        self
    }

    /// Answer evaluations; the first responder returning `Some` wins.
    /// Unanswered evaluations return `null`.
    pub fn respond<F>(&self, responder: F)
    where
        F: Fn(&TabId, &str) -> Option<Value> + Send + Sync + 'static,
    {
        self.responders.lock().push(Box::new(responder));
    }

    pub fn emit(&self, update: TabUpdated) {
        if let Some(tx) = self.updates.lock().as_ref() {
            let _ = tx.send(update);
        }
    }

    pub fn disconnect(&self) {
        self.updates.lock().take();
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    pub fn evaluations(&self, tab: &TabId) -> Vec<String> {
        self.calls
            .lock()
            .iter()
            .filter_map(|c| match c {
                Call::Evaluate(id, expr) if id == tab => Some(expr.clone()),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: Call) {
        self.calls.lock().push(call);
    }

    fn complete(&self, id: &TabId) {
        if self.auto_complete {
            self.emit(TabUpdated {
                tab_id: id.clone(),
                status: TabStatus::Loading,
            });
            self.emit(TabUpdated {
                tab_id: id.clone(),
                status: TabStatus::Complete,
            });
        }
    }
}

#[async_trait]
impl Browser for FakeBrowser {
    async fn active_tab(&self) -> Result<Tab, BrowserError> {
        self.tabs
            .lock()
            .first()
            .cloned()
            .ok_or(BrowserError::NoActiveTab)
    }

    async fn tab(&self, id: &TabId) -> Result<Tab, BrowserError> {
        self.tabs
            .lock()
            .iter()
            .find(|t| &t.id == id)
            .cloned()
            .ok_or_else(|| BrowserError::TabNotFound(id.to_string()))
    }

    async fn reload(&self, id: &TabId) -> Result<(), BrowserError> {
        self.record(Call::Reload(id.clone()));
        self.complete(id);
        Ok(())
    }

    async fn create_tab(&self) -> Result<TabId, BrowserError> {
        let id = TabId(format!("tab-{}", self.next_tab.fetch_add(1, Ordering::SeqCst)));
        self.tabs.lock().push(Tab {
            id: id.clone(),
            url: "about:blank".to_string(),
        });
        self.record(Call::CreateTab(id.clone()));
        Ok(id)
    }

    async fn navigate(&self, id: &TabId, url: &str) -> Result<(), BrowserError> {
        self.record(Call::Navigate(id.clone(), url.to_string()));
        if let Some(tab) = self.tabs.lock().iter_mut().find(|t| &t.id == id) {
            tab.url = url.to_string();
        }
        self.complete(id);
        Ok(())
    }

    async fn evaluate(&self, id: &TabId, expression: &str) -> Result<Value, BrowserError> {
        self.record(Call::Evaluate(id.clone(), expression.to_string()));
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        let value = self
            .responders
            .lock()
            .iter()
            .find_map(|respond| respond(id, expression));
        Ok(value.unwrap_or(Value::Null))
    }

    fn tab_updates(&self) -> broadcast::Receiver<TabUpdated> {
        match self.updates.lock().as_ref() {
            Some(tx) => tx.subscribe(),
            None => broadcast::channel(1).1,
        }
    }
}
