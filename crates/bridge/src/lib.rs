//! Marketplace Automation Bridge - Core
//!
//! Connects a tool-calling client to a live, already-authenticated
//! browser tab driven by a separately running extension. The extension
//! dials in over a local WebSocket; the bridge keeps exactly one
//! automation session bound, correlates requests with asynchronous
//! responses, and interprets the two primitives every higher-level
//! site tool is built on: evaluate a script, perform an ordered
//! sequence of interaction actions.
//!
//! Layering, leaves first:
//!
//! 1. [`rpc`]: wire protocol types and the per-connection RPC channel
//! 2. [`registry`]: the single authoritative connection/session state
//! 3. [`backend`]: the serialized command dispatcher
//! 4. [`stealth`]: arm-before-navigate sequencing for the injected
//!    anti-detection script (patch contents live in the extension)

pub mod backend;
pub mod config;
pub mod error;
pub mod registry;
pub mod rpc;
pub mod stealth;

pub use backend::Backend;
pub use config::{BridgeConfig, DEFAULT_RPC_TIMEOUT};
pub use error::{BridgeError, Result};
pub use registry::ExtensionRegistry;
pub use rpc::{BridgeStatus, InteractionAction, Method};
pub use stealth::StealthCoordinator;
