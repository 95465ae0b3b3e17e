use std::sync::Arc;
use std::time::Duration;

use tokio::time::MissedTickBehavior;

use crate::ws::manager::{ConnectionRegistry, SilenceCheck};

/// How often each monitor checks its connection, independent of the
/// configured interval.
pub const LIVENESS_TICK: Duration = Duration::from_secs(3);

/// Close reason sent to evicted connections.
pub const EVICTION_REASON: &str = "Closed due to no activity";

/// Evicts connections that have not sent a protocol `PING` within the
/// configured interval.
///
/// With no interval configured, [`watch`](Self::watch) does nothing and
/// connections are only removed when they close.
#[derive(Clone)]
pub struct LivenessMonitor {
    registry: Arc<ConnectionRegistry>,
    interval: Option<Duration>,
}

impl LivenessMonitor {
    pub fn new(registry: Arc<ConnectionRegistry>, interval: Option<Duration>) -> Self {
        Self { registry, interval }
    }

    pub fn interval(&self) -> Option<Duration> {
        self.interval
    }

    /// Start monitoring a registered connection.
    ///
    /// The spawned task is owned by the connection's registry entry and is
    /// cancelled whenever that entry is removed.
    pub async fn watch(&self, conn_id: &str) {
        let Some(interval) = self.interval else {
            return;
        };

        let handle = tokio::spawn(run_monitor(
            Arc::clone(&self.registry),
            conn_id.to_string(),
            interval,
        ));
        self.registry.attach_liveness_task(conn_id, handle).await;
    }
}

async fn run_monitor(registry: Arc<ConnectionRegistry>, conn_id: String, interval: Duration) {
    let mut ticker = tokio::time::interval(LIVENESS_TICK);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;

        match registry
            .evict_if_silent(&conn_id, interval, EVICTION_REASON)
            .await
        {
            SilenceCheck::Gone => break,
            SilenceCheck::Active { silent_for } => {
                tracing::trace!(
                    conn_id = %conn_id,
                    silent_ms = silent_for.as_millis() as u64,
                    "Liveness tick"
                );
            }
            SilenceCheck::Evicted {
                silent_for,
                remote_addr,
            } => {
                tracing::info!(
                    conn_id = %conn_id,
                    remote_addr = ?remote_addr,
                    silent_ms = silent_for.as_millis() as u64,
                    "Evicted inactive WebSocket connection"
                );
                break;
            }
        }
    }
}
