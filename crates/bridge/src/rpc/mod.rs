//! RPC layer for the bridge <-> extension socket
//!
//! Core principle: one WebSocket per extension connection, requests
//! correlated by id, notifications routed out-of-band to the registry.

pub mod channel;
pub mod protocol;

pub use channel::RpcChannel;
pub use protocol::{
    BridgeStatus, InteractionAction, Method, WireMessage, WireNotification, WireRequest,
    WireResponse,
};
