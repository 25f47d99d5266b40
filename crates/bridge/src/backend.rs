//! Command Dispatcher - the only entry point for the tool layer
//!
//! Two primitives, `evaluate` and `interact`, both funneled through one
//! command lock: the page has a single execution context, so commands
//! against the bound tab must never interleave. Concurrency lives in
//! the I/O layer underneath, not in the automation semantics.

use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

use crate::config::DEFAULT_RPC_TIMEOUT;
use crate::error::{BridgeError, Result};
use crate::registry::ExtensionRegistry;
use crate::rpc::protocol::BridgeStatus;
use crate::rpc::{InteractionAction, Method};
use crate::stealth::StealthCoordinator;

pub struct Backend {
    registry: Arc<ExtensionRegistry>,
    stealth: StealthCoordinator,

    /// Serializes all evaluate/interact calls. tokio's Mutex queues
    /// waiters in FIFO order, so commands execute first-submitted-first.
    command_lock: Mutex<()>,

    rpc_timeout: Duration,
}

impl Backend {
    pub fn new(registry: Arc<ExtensionRegistry>, stealth_enabled: bool) -> Self {
        Self::with_rpc_timeout(registry, stealth_enabled, DEFAULT_RPC_TIMEOUT)
    }

    pub fn with_rpc_timeout(
        registry: Arc<ExtensionRegistry>,
        stealth_enabled: bool,
        rpc_timeout: Duration,
    ) -> Self {
        Self {
            stealth: StealthCoordinator::new(stealth_enabled, rpc_timeout),
            registry,
            command_lock: Mutex::new(()),
            rpc_timeout,
        }
    }

    /// Run a script in the bound tab's page context and return the raw
    /// evaluation result.
    pub async fn evaluate(&self, script: &str) -> Result<Value> {
        let _guard = self.command_lock.lock().await;
        self.stealth.ensure_armed(&self.registry).await?;

        self.registry
            .send_command(
                Method::Evaluate,
                Some(json!({ "script": script })),
                self.rpc_timeout,
            )
            .await
            .map_err(|e| match e {
                BridgeError::Extension(message) => BridgeError::Evaluation(message),
                other => other,
            })
    }

    /// Execute a sequence of simulated user actions, strictly in order.
    ///
    /// Each action becomes its own RPC call, and action n+1 is not
    /// dispatched until action n's result is known. `Wait` is a pure
    /// local delay on an independent clock; it issues no RPC and does
    /// not consume any RPC deadline. A failing action aborts the rest;
    /// effects already applied to the page stay applied.
    pub async fn interact(&self, actions: &[InteractionAction]) -> Result<()> {
        let _guard = self.command_lock.lock().await;
        self.stealth.ensure_armed(&self.registry).await?;

        for (index, action) in actions.iter().enumerate() {
            match action {
                InteractionAction::Wait { timeout } => {
                    tokio::time::sleep(Duration::from_millis(*timeout)).await;
                }
                action => {
                    self.registry
                        .send_command(
                            Method::Interact,
                            Some(json!({ "actions": [action] })),
                            self.rpc_timeout,
                        )
                        .await
                        .map_err(|source| BridgeError::Action {
                            index,
                            kind: action.kind(),
                            source: Box::new(source),
                        })?;
                }
            }
        }
        Ok(())
    }

    /// Snapshot of the connection state; never blocks on a pending command.
    pub fn status(&self) -> BridgeStatus {
        self.registry.status()
    }

    pub fn registry(&self) -> &Arc<ExtensionRegistry> {
        &self.registry
    }

    pub fn stealth_enabled(&self) -> bool {
        self.stealth.enabled()
    }
}
