//! sockgate: a distributed WebSocket delivery gateway.
//!
//! Two planes share this crate. The control plane (`sockgate-api`) exposes
//! the backend-facing HTTP API: minting claims, sending messages, managing
//! channel membership, disconnecting, and introspection. The worker plane
//! (`sockgate-worker`) terminates client WebSockets and applies the
//! payloads the control plane pushes to it, over Redis pub/sub or direct
//! HTTP. Redis holds the shared connection directory; each worker's
//! in-memory registry is authoritative for its own sockets.

pub mod api;
pub mod config;
pub mod error;
pub mod http;
pub mod proto;
pub mod store;
pub mod target;
pub mod util;
pub mod worker;
