use std::sync::Arc;

use crate::auth::AuthResolver;
use crate::config::ServerConfig;
use crate::ws::{ConnectionRegistry, LivenessMonitor, MessageRouter};

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Server configuration (webhook secret, liveness interval).
    pub config: Arc<ServerConfig>,
    /// Live WebSocket connections.
    pub registry: Arc<ConnectionRegistry>,
    /// Client protocol handling and event delivery.
    pub messages: Arc<MessageRouter>,
    /// Per-connection liveness monitoring.
    pub liveness: LivenessMonitor,
    /// Token-to-user lookup (also reports backing store health).
    pub auth: Arc<dyn AuthResolver>,
}

impl AppState {
    /// Wire up the registry, liveness monitor and message router around a
    /// token resolver.
    pub fn new(config: ServerConfig, auth: Arc<dyn AuthResolver>) -> Self {
        let registry = Arc::new(ConnectionRegistry::new());
        let liveness = LivenessMonitor::new(Arc::clone(&registry), config.ping_interval);
        let messages = Arc::new(MessageRouter::new(Arc::clone(&registry), Arc::clone(&auth)));

        Self {
            config: Arc::new(config),
            registry,
            messages,
            liveness,
            auth,
        }
    }
}
