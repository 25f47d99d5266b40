//! Connection Registry - the single authoritative notion of "is an
//! extension connected, and to which tab"
//!
//! Design decisions:
//! 1. At most one bound connection. A new extension socket replaces the
//!    old one: the extension side only ever keeps one active socket, so
//!    a fresh connect means the previous connection is stale. The stale
//!    connection's pending requests resolve with `ConnectionLost`.
//! 2. Status is a locally cached snapshot behind a std lock, updated on
//!    state transitions. Reading it never touches the network and never
//!    waits on in-flight automation commands.
//! 3. Inbound frames split at the boundary: correlated responses go to
//!    the connection's RPC channel, notifications to the registry,
//!    anything malformed is logged and dropped.

use futures_util::StreamExt;
use serde_json::Value;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{accept_async, WebSocketStream};
use uuid::Uuid;

use crate::error::{BridgeError, Result};
use crate::rpc::protocol::{BridgeStatus, StatusReport};
use crate::rpc::{Method, RpcChannel, WireMessage, WireNotification};

/// Deadline for the connect-time status probe; failure only leaves the
/// snapshot cold, it does not affect the connection.
const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// One live extension connection.
pub(crate) struct Connection {
    pub(crate) id: Uuid,
    pub(crate) channel: RpcChannel,
}

impl Connection {
    async fn teardown(&self) {
        self.channel.shutdown().await;
    }
}

struct Shared {
    /// The bound connection, if any. Guard is never held across an await;
    /// callers clone the Arc out and drop the guard before any I/O.
    bound: RwLock<Option<Arc<Connection>>>,

    /// Cached status snapshot, updated on every state transition.
    status: RwLock<BridgeStatus>,
}

impl Shared {
    fn bound_connection(&self) -> Option<Arc<Connection>> {
        self.bound
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    fn set_status(&self, status: BridgeStatus) {
        *self.status.write().unwrap_or_else(|e| e.into_inner()) = status;
    }

    /// Register a freshly accepted socket, replacing any bound connection.
    async fn attach(self: &Arc<Self>, ws: WebSocketStream<TcpStream>, peer: SocketAddr) {
        let (sink, stream) = ws.split();
        let conn = Arc::new(Connection {
            id: Uuid::now_v7(),
            channel: RpcChannel::new(sink),
        });

        let previous = self
            .bound
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .replace(conn.clone());

        if let Some(old) = previous {
            tracing::info!(old = %old.id, new = %conn.id, %peer, "replacing bound extension connection");
            old.teardown().await;
        } else {
            tracing::info!(id = %conn.id, %peer, "extension connected");
        }

        self.set_status(BridgeStatus {
            connected: true,
            ..BridgeStatus::default()
        });

        let shared = self.clone();
        let reader_conn = conn.clone();
        tokio::spawn(async move {
            shared.read_loop(reader_conn, stream).await;
        });

        // Warm the snapshot so status() is useful right after connect.
        let shared = self.clone();
        tokio::spawn(async move {
            match conn
                .channel
                .call(Method::GetConnectionStatus, None, PROBE_TIMEOUT)
                .await
            {
                Ok(report) => shared.apply_status_report(&conn, report),
                Err(e) => tracing::debug!(id = %conn.id, error = %e, "status probe failed"),
            }
        });
    }

    async fn read_loop(
        self: Arc<Self>,
        conn: Arc<Connection>,
        mut stream: futures_util::stream::SplitStream<WebSocketStream<TcpStream>>,
    ) {
        while let Some(msg) = stream.next().await {
            match msg {
                Ok(Message::Text(text)) => self.handle_frame(&conn, &text),
                Ok(Message::Close(_)) => {
                    tracing::debug!(id = %conn.id, "extension sent close frame");
                    break;
                }
                Ok(_) => {} // ping/pong handled by tungstenite
                Err(e) => {
                    tracing::warn!(id = %conn.id, error = %e, "websocket read error");
                    break;
                }
            }
        }
        self.detach(&conn);
        conn.teardown().await;
    }

    fn handle_frame(&self, conn: &Arc<Connection>, text: &str) {
        match serde_json::from_str::<WireMessage>(text) {
            Ok(WireMessage::Response(response)) => conn.channel.resolve(response),
            Ok(WireMessage::Notification(notification)) => {
                self.handle_notification(conn, notification)
            }
            Err(e) => {
                // ProtocolError: logged and dropped, never crashes the bridge.
                tracing::warn!(id = %conn.id, error = %e, "malformed frame from extension, dropping");
            }
        }
    }

    fn handle_notification(&self, conn: &Arc<Connection>, notification: WireNotification) {
        match notification.method.as_str() {
            "statusChanged" => {
                let report = notification.params.unwrap_or(Value::Null);
                self.apply_status_report(conn, report);
            }
            other => {
                tracing::warn!(id = %conn.id, method = other, "unrecognized notification, dropping");
            }
        }
    }

    /// Fold an extension status report into the snapshot, but only while
    /// the reporting connection is still the bound one.
    fn apply_status_report(&self, conn: &Arc<Connection>, report: Value) {
        if !self.is_bound(conn) {
            return;
        }
        match serde_json::from_value::<StatusReport>(report) {
            Ok(report) => {
                tracing::debug!(
                    id = %conn.id,
                    tab_id = ?report.tab_id,
                    stealth = ?report.stealth_mode,
                    "status report"
                );
                self.set_status(BridgeStatus {
                    connected: true,
                    tab_id: report.tab_id,
                    stealth_mode: report.stealth_mode,
                    project_name: report.project_name,
                });
            }
            Err(e) => {
                tracing::warn!(id = %conn.id, error = %e, "malformed status report, dropping");
            }
        }
    }

    fn is_bound(&self, conn: &Arc<Connection>) -> bool {
        self.bound
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
            .map(|bound| bound.id == conn.id)
            .unwrap_or(false)
    }

    /// Transition a connection to disconnected. Terminal for that
    /// connection; a replaced connection does not clear its successor.
    fn detach(&self, conn: &Arc<Connection>) {
        let mut bound = self.bound.write().unwrap_or_else(|e| e.into_inner());
        if bound.as_ref().map(|b| b.id) == Some(conn.id) {
            *bound = None;
            drop(bound);
            self.set_status(BridgeStatus::default());
            tracing::info!(id = %conn.id, "extension disconnected");
        }
    }
}

/// Accepts extension sockets and routes commands to the bound connection.
pub struct ExtensionRegistry {
    shared: Arc<Shared>,
    accept_task: Mutex<Option<JoinHandle<()>>>,
    local_addr: SocketAddr,
}

impl ExtensionRegistry {
    /// Begin listening for extension connections.
    ///
    /// Fails with `BindError` if the port is unavailable. Start is not
    /// idempotent: one registry, one listener.
    pub async fn start(host: &str, port: u16) -> Result<Self> {
        let addr = format!("{host}:{port}");
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|source| BridgeError::Bind { addr, source })?;
        let local_addr = listener
            .local_addr()
            .map_err(|source| BridgeError::Bind {
                addr: "unknown".to_string(),
                source,
            })?;

        let shared = Arc::new(Shared {
            bound: RwLock::new(None),
            status: RwLock::new(BridgeStatus::default()),
        });

        let accept_shared = shared.clone();
        let accept_task = tokio::spawn(async move {
            loop {
                let (stream, peer) = match listener.accept().await {
                    Ok(accepted) => accepted,
                    Err(e) => {
                        tracing::warn!(error = %e, "accept failed");
                        continue;
                    }
                };
                match accept_async(stream).await {
                    Ok(ws) => accept_shared.attach(ws, peer).await,
                    Err(e) => {
                        tracing::warn!(%peer, error = %e, "websocket handshake failed");
                    }
                }
            }
        });

        tracing::info!(%local_addr, "extension registry listening");
        Ok(Self {
            shared,
            accept_task: Mutex::new(Some(accept_task)),
            local_addr,
        })
    }

    /// Address the listener actually bound (useful with port 0).
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Route a command to the bound connection's RPC channel.
    pub async fn send_command(
        &self,
        method: Method,
        params: Option<Value>,
        timeout: Duration,
    ) -> Result<Value> {
        let conn = self
            .shared
            .bound_connection()
            .ok_or(BridgeError::NoConnection)?;
        conn.channel.call(method, params, timeout).await
    }

    /// Synchronous snapshot of the connection state. Never blocks on
    /// network I/O or pending automation commands.
    pub fn status(&self) -> BridgeStatus {
        self.shared
            .status
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Identity of the bound connection, if any. Changes whenever the
    /// extension reconnects; the stealth coordinator keys its memo on it.
    pub fn connection_id(&self) -> Option<Uuid> {
        self.shared.bound_connection().map(|conn| conn.id)
    }

    /// Stop listening, tear down the bound connection, and reject its
    /// pending requests. Safe to call once from the shutdown path.
    pub async fn stop(&self) {
        let task = self
            .accept_task
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        if let Some(task) = task {
            task.abort();
        }

        let conn = self
            .shared
            .bound
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        if let Some(conn) = conn {
            conn.teardown().await;
        }
        self.shared.set_status(BridgeStatus::default());
        tracing::info!("extension registry stopped");
    }
}
