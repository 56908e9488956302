//! CDP WebSocket client.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use tokio::net::TcpStream;
use tokio::sync::{broadcast, oneshot};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, trace, warn};

use super::protocol::{BrowserVersion, CdpRequest, CdpResponse, PageInfo, lifecycle_status};
use crate::browser::{BrowserError, TabId, TabUpdated};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = SplitSink<WsStream, Message>;
type WsSource = SplitStream<WsStream>;

type Pending = Arc<Mutex<HashMap<u64, oneshot::Sender<Result<Value, BrowserError>>>>>;
type Sessions = Arc<RwLock<HashMap<String, TabId>>>;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const UPDATE_BUFFER: usize = 64;

/// Browser-level CDP connection. Page sessions are multiplexed over it
/// (`flatten: true`), so every command carries an optional session id.
pub struct CdpClient {
    http_endpoint: String,
    ws_tx: tokio::sync::Mutex<WsSink>,
    request_id: AtomicU64,
    pending: Pending,
    /// Session id → tab, used to route page events.
    sessions: Sessions,
    /// Template receiver; the only sender lives in the receive loop, so
    /// subscribers see `Closed` once the socket goes away.
    updates: Mutex<broadcast::Receiver<TabUpdated>>,
    recv_task: tokio::task::JoinHandle<()>,
}

impl CdpClient {
    /// Connect to Chrome at the given endpoint, e.g. `http://localhost:9222`.
    pub async fn connect(endpoint: &str) -> Result<Self, BrowserError> {
        let http_endpoint = endpoint.trim_end_matches('/').to_string();

        let version_url = format!("{}/json/version", http_endpoint);
        debug!("Fetching browser version from {}", version_url);

        let version: BrowserVersion = reqwest::get(&version_url)
            .await
            .map_err(|e| BrowserError::ChromeNotAvailable(format!("{}: {}", endpoint, e)))?
            .json()
            .await
            .map_err(|e| BrowserError::ChromeNotAvailable(format!("{}: {}", endpoint, e)))?;

        debug!("Connected to browser: {}", version.browser);

        let (ws_stream, _) = tokio_tungstenite::connect_async(&version.web_socket_debugger_url)
            .await
            .map_err(|e| BrowserError::ConnectionFailed(format!("WebSocket: {}", e)))?;

        let (ws_sink, ws_source) = ws_stream.split();
        let pending: Pending = Arc::new(Mutex::new(HashMap::new()));
        let sessions: Sessions = Arc::new(RwLock::new(HashMap::new()));
        let (updates_tx, updates_rx) = broadcast::channel(UPDATE_BUFFER);

        let recv_task = {
            let pending = Arc::clone(&pending);
            let sessions = Arc::clone(&sessions);
            tokio::spawn(async move {
                Self::receive_loop(ws_source, pending, sessions, updates_tx).await;
            })
        };

        Ok(Self {
            http_endpoint,
            ws_tx: tokio::sync::Mutex::new(ws_sink),
            request_id: AtomicU64::new(1),
            pending,
            sessions,
            updates: Mutex::new(updates_rx),
            recv_task,
        })
    }

    async fn receive_loop(
        mut ws_source: WsSource,
        pending: Pending,
        sessions: Sessions,
        updates: broadcast::Sender<TabUpdated>,
    ) {
        while let Some(msg) = ws_source.next().await {
            match msg {
                Ok(Message::Text(text)) => {
                    trace!("CDP recv: {}", text);
                    match serde_json::from_str::<CdpResponse>(&text) {
                        Ok(resp) => Self::dispatch(resp, &pending, &sessions, &updates),
                        Err(e) => warn!("Failed to parse CDP message: {}", e),
                    }
                }
                Ok(Message::Close(_)) => {
                    debug!("WebSocket closed");
                    break;
                }
                Err(e) => {
                    error!("WebSocket error: {}", e);
                    break;
                }
                _ => {}
            }
        }

        // Fail whatever is still in flight.
        for (_, tx) in pending.lock().drain() {
            let _ = tx.send(Err(BrowserError::SessionClosed));
        }
    }

    fn dispatch(
        resp: CdpResponse,
        pending: &Pending,
        sessions: &Sessions,
        updates: &broadcast::Sender<TabUpdated>,
    ) {
        if let Some(id) = resp.id {
            if let Some(tx) = pending.lock().remove(&id) {
                let result = match resp.error {
                    Some(error) => Err(BrowserError::Protocol {
                        code: error.code,
                        message: error.message,
                    }),
                    None => Ok(resp.result.unwrap_or(Value::Null)),
                };
                let _ = tx.send(result);
            }
            return;
        }

        let (Some(method), Some(session_id)) = (resp.method.as_deref(), resp.session_id.as_ref())
        else {
            return;
        };
        let Some(status) = lifecycle_status(method) else {
            return;
        };
        let Some(tab_id) = sessions.read().get(session_id).cloned() else {
            return;
        };

        trace!(tab = %tab_id, ?status, "tab updated");
        // No subscribers is fine: nobody is waiting on this tab.
        let _ = updates.send(TabUpdated { tab_id, status });
    }

    /// Send a CDP command and wait for its response.
    pub async fn call(
        &self,
        method: &str,
        params: Option<Value>,
        session_id: Option<&str>,
    ) -> Result<Value, BrowserError> {
        let id = self.request_id.fetch_add(1, Ordering::SeqCst);

        let request = CdpRequest {
            id,
            method: method.to_string(),
            params,
            session_id: session_id.map(|s| s.to_string()),
        };

        let json = serde_json::to_string(&request)?;
        trace!("CDP send: {}", json);

        let (tx, rx) = oneshot::channel();
        self.pending.lock().insert(id, tx);

        {
            let mut ws = self.ws_tx.lock().await;
            if let Err(e) = ws.send(Message::Text(json.into())).await {
                self.pending.lock().remove(&id);
                return Err(e.into());
            }
        }

        match tokio::time::timeout(REQUEST_TIMEOUT, rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(BrowserError::SessionClosed),
            Err(_) => {
                self.pending.lock().remove(&id);
                Err(BrowserError::Timeout(format!("Request {} timed out", method)))
            }
        }
    }

    /// List all targets via the HTTP endpoint, most recently focused first.
    pub async fn list_pages(&self) -> Result<Vec<PageInfo>, BrowserError> {
        let url = format!("{}/json/list", self.http_endpoint);
        let pages: Vec<PageInfo> = reqwest::get(&url).await?.json().await?;
        Ok(pages)
    }

    /// Route page events from `session_id` to `tab_id`.
    pub fn register_session(&self, session_id: &str, tab_id: &TabId) {
        self.sessions
            .write()
            .insert(session_id.to_string(), tab_id.clone());
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TabUpdated> {
        self.updates.lock().resubscribe()
    }
}

impl Drop for CdpClient {
    fn drop(&mut self) {
        self.recv_task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::TabStatus;

    fn frame(json: &str) -> CdpResponse {
        serde_json::from_str(json).unwrap()
    }

    #[tokio::test]
    async fn responses_resolve_pending_requests() {
        let pending: Pending = Arc::new(Mutex::new(HashMap::new()));
        let sessions: Sessions = Arc::new(RwLock::new(HashMap::new()));
        let (updates, _rx) = broadcast::channel(4);

        let (tx, rx) = oneshot::channel();
        pending.lock().insert(3, tx);

        CdpClient::dispatch(
            frame(r#"{"id":3,"result":{"frameId":"F"}}"#),
            &pending,
            &sessions,
            &updates,
        );

        let value = rx.await.unwrap().unwrap();
        assert_eq!(value["frameId"], "F");
        assert!(pending.lock().is_empty());
    }

    #[tokio::test]
    async fn protocol_errors_are_surfaced() {
        let pending: Pending = Arc::new(Mutex::new(HashMap::new()));
        let sessions: Sessions = Arc::new(RwLock::new(HashMap::new()));
        let (updates, _rx) = broadcast::channel(4);

        let (tx, rx) = oneshot::channel();
        pending.lock().insert(1, tx);

        CdpClient::dispatch(
            frame(r#"{"id":1,"error":{"code":-32000,"message":"No target"}}"#),
            &pending,
            &sessions,
            &updates,
        );

        assert!(matches!(
            rx.await.unwrap(),
            Err(BrowserError::Protocol { code: -32000, .. })
        ));
    }

    #[test]
    fn load_events_are_routed_by_session() {
        let pending: Pending = Arc::new(Mutex::new(HashMap::new()));
        let sessions: Sessions = Arc::new(RwLock::new(HashMap::new()));
        sessions
            .write()
            .insert("S1".to_string(), TabId::from("video"));
        let (updates, mut rx) = broadcast::channel(4);

        CdpClient::dispatch(
            frame(r#"{"method":"Page.loadEventFired","params":{},"sessionId":"S1"}"#),
            &pending,
            &sessions,
            &updates,
        );
        CdpClient::dispatch(
            frame(r#"{"method":"Page.loadEventFired","params":{},"sessionId":"unknown"}"#),
            &pending,
            &sessions,
            &updates,
        );

        assert_eq!(
            rx.try_recv().unwrap(),
            TabUpdated {
                tab_id: TabId::from("video"),
                status: TabStatus::Complete,
            }
        );
        assert!(rx.try_recv().is_err());
    }
}
