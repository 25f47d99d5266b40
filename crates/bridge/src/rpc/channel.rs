//! RPC Channel - request/response correlation over one extension socket
//!
//! Design decisions:
//! 1. Monotonic id allocation - an id is never reused while pending
//! 2. Exactly-once resolution - success, extension error, timeout, or
//!    connection loss, whichever wins removes the pending entry
//! 3. A late response for an abandoned id is a logged no-op
//! 4. Fail fast - no retries, no queuing. Let the caller decide.

use dashmap::DashMap;
use futures_util::{stream::SplitSink, SinkExt};
use serde_json::Value;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::{oneshot, Mutex};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;

use super::protocol::{Method, RequestId, WireRequest, WireResponse};
use crate::error::{BridgeError, Result};

type WsSink = SplitSink<WebSocketStream<TcpStream>, Message>;

/// Per-connection RPC channel. Owned by the registry's `Connection`.
pub struct RpcChannel {
    /// Monotonic request ID counter
    next_id: AtomicU64,

    /// Pending requests waiting for responses
    /// Key: request id, Value: oneshot sender for the outcome
    pending: DashMap<RequestId, oneshot::Sender<Result<Value>>>,

    /// WebSocket write half (mutexed for concurrent sending)
    sink: Mutex<WsSink>,

    /// Set once the socket is known dead; guards new calls
    closed: AtomicBool,
}

impl RpcChannel {
    pub(crate) fn new(sink: WsSink) -> Self {
        Self {
            next_id: AtomicU64::new(1),
            pending: DashMap::new(),
            sink: Mutex::new(sink),
            closed: AtomicBool::new(false),
        }
    }

    /// Send a request and suspend until it resolves or the deadline elapses.
    pub async fn call(
        &self,
        method: Method,
        params: Option<Value>,
        timeout: Duration,
    ) -> Result<Value> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(BridgeError::ConnectionLost);
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = oneshot::channel();
        self.pending.insert(id, tx);

        // Recheck after insertion: fail_pending may have swept the table
        // between the guard above and the insert.
        if self.closed.load(Ordering::SeqCst) {
            self.pending.remove(&id);
            return Err(BridgeError::ConnectionLost);
        }

        let json = match serde_json::to_string(&WireRequest { id, method, params }) {
            Ok(json) => json,
            Err(e) => {
                self.pending.remove(&id);
                return Err(e.into());
            }
        };

        {
            let mut sink = self.sink.lock().await;
            if let Err(e) = sink.send(Message::Text(json)).await {
                self.pending.remove(&id);
                return Err(e.into());
            }
        }
        tracing::debug!(id, method = method.as_str(), "request sent");

        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(outcome)) => outcome,
            // Sender dropped without resolving: the connection went away.
            Ok(Err(_)) => Err(BridgeError::ConnectionLost),
            Err(_) => {
                // Abandon the id. The command may still complete on the
                // extension side; its eventual response is dropped in
                // resolve() as uncorrelated.
                self.pending.remove(&id);
                tracing::debug!(id, method = method.as_str(), "request timed out");
                Err(BridgeError::Timeout(timeout))
            }
        }
    }

    /// Route a correlated response to its waiting caller.
    pub(crate) fn resolve(&self, response: WireResponse) {
        let Some((_, tx)) = self.pending.remove(&response.id) else {
            tracing::warn!(id = response.id, "response for unknown or abandoned request, dropping");
            return;
        };

        let outcome = match response.error {
            Some(error) => Err(BridgeError::Extension(error.message)),
            None => Ok(response.result.unwrap_or(Value::Null)),
        };
        // Receiver may have dropped between removal and send; nothing to do.
        let _ = tx.send(outcome);
    }

    /// Resolve every outstanding call with `ConnectionLost` and refuse
    /// new ones. Idempotent; called on socket close and on replacement.
    pub(crate) fn fail_pending(&self) {
        self.closed.store(true, Ordering::SeqCst);
        let ids: Vec<RequestId> = self.pending.iter().map(|entry| *entry.key()).collect();
        for id in ids {
            if let Some((_, tx)) = self.pending.remove(&id) {
                let _ = tx.send(Err(BridgeError::ConnectionLost));
            }
        }
    }

    /// Tear the channel down from our side: reject pending calls and
    /// close the write half.
    pub(crate) async fn shutdown(&self) {
        self.fail_pending();
        let mut sink = self.sink.lock().await;
        let _ = sink.close().await;
    }
}
