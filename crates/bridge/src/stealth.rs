//! Stealth Coordinator - arm-before-navigate sequencing
//!
//! The anti-detection patches themselves live in the extension's
//! injected script; the bridge's only obligations are ordering (the
//! script must be armed for a tab before any command acts on it) and
//! surfacing the extension-reported flag through the status snapshot.

use serde_json::json;
use std::sync::Mutex;
use std::time::Duration;
use uuid::Uuid;

use crate::error::Result;
use crate::registry::ExtensionRegistry;
use crate::rpc::protocol::TabId;
use crate::rpc::Method;

/// Tracks which (connection, tab) pair has been armed so the
/// `setStealthMode` call is issued once per binding, not per command.
pub struct StealthCoordinator {
    enabled: bool,
    armed: Mutex<Option<(Uuid, TabId)>>,
    rpc_timeout: Duration,
}

impl StealthCoordinator {
    pub fn new(enabled: bool, rpc_timeout: Duration) -> Self {
        Self {
            enabled,
            armed: Mutex::new(None),
            rpc_timeout,
        }
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Arm the injected script for the currently bound tab if it has not
    /// been armed yet. A reconnect or a tab re-bind invalidates the memo
    /// because the memo is keyed on the connection identity.
    pub async fn ensure_armed(&self, registry: &ExtensionRegistry) -> Result<()> {
        if !self.enabled {
            return Ok(());
        }
        let Some(conn_id) = registry.connection_id() else {
            // Nothing bound; the command itself will surface NoConnection.
            return Ok(());
        };
        let Some(tab_id) = registry.status().tab_id else {
            // No tab reported yet; nothing to arm against.
            return Ok(());
        };

        {
            let armed = self.armed.lock().unwrap_or_else(|e| e.into_inner());
            if *armed == Some((conn_id, tab_id)) {
                return Ok(());
            }
        }

        registry
            .send_command(
                Method::SetStealthMode,
                Some(json!({ "enabled": true })),
                self.rpc_timeout,
            )
            .await?;
        tracing::info!(%conn_id, tab_id, "stealth patches armed for bound tab");

        *self.armed.lock().unwrap_or_else(|e| e.into_inner()) = Some((conn_id, tab_id));
        Ok(())
    }
}
