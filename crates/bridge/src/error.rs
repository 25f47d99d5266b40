//! Bridge error taxonomy.
//!
//! Propagation policy: transport failures resolve the specific pending
//! call(s) they affect and never tear down the registry or unrelated
//! commands. Only a failed bind at startup is fatal to the process.

use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("no extension connection is bound")]
    NoConnection,

    #[error("connection lost while the request was pending")]
    ConnectionLost,

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// The extension answered the request with an application-level error.
    #[error("extension reported an error: {0}")]
    Extension(String),

    /// Page-side exception during an `evaluate` call.
    #[error("page evaluation failed: {0}")]
    Evaluation(String),

    /// An interaction action failed; earlier actions in the sequence have
    /// already taken effect on the page and are not rolled back.
    #[error("action {index} ({kind}) failed: {source}")]
    Action {
        index: usize,
        kind: &'static str,
        #[source]
        source: Box<BridgeError>,
    },

    #[error("malformed frame from extension: {0}")]
    Protocol(String),

    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for bridge operations
pub type Result<T> = std::result::Result<T, BridgeError>;
