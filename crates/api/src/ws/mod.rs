//! WebSocket infrastructure for the relay.
//!
//! Provides the connection registry, per-connection liveness monitoring,
//! the client protocol router and the HTTP upgrade handler used by Axum
//! routes.

mod handler;
pub mod liveness;
pub mod manager;
pub mod protocol;

pub use handler::ws_handler;
pub use liveness::LivenessMonitor;
pub use manager::{AuthState, ConnectionInfo, ConnectionRegistry, SilenceCheck};
pub use protocol::MessageRouter;
