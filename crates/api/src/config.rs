use std::time::Duration;

/// Server configuration loaded from environment variables.
///
/// All fields except the database URL have defaults suitable for local
/// development. In production, override via environment variables.
#[derive(Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Upper bound on post-shutdown cleanup in seconds (default: `30`).
    pub shutdown_timeout_secs: u64,
    /// Maximum silence before a socket is evicted. `None` disables eviction.
    pub ping_interval: Option<Duration>,
    /// Shared secret used to verify EventSub webhook signatures.
    pub eventsub_secret: String,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                | Default   |
    /// |------------------------|-----------|
    /// | `HOST`                 | `0.0.0.0` |
    /// | `PORT`                 | `3000`    |
    /// | `REQUEST_TIMEOUT_SECS` | `30`      |
    /// | `SHUTDOWN_TIMEOUT_SECS`| `30`      |
    /// | `PING_INTERVAL`        | `-1`      |
    /// | `EVENTSUB_SECRET`      | empty     |
    ///
    /// `PING_INTERVAL` is in seconds (fractions allowed); zero or negative
    /// disables liveness eviction.
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let shutdown_timeout_secs: u64 = std::env::var("SHUTDOWN_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("SHUTDOWN_TIMEOUT_SECS must be a valid u64");

        let ping_interval_secs: f64 = std::env::var("PING_INTERVAL")
            .unwrap_or_else(|_| "-1".into())
            .parse()
            .expect("PING_INTERVAL must be a number of seconds");

        let eventsub_secret = std::env::var("EVENTSUB_SECRET").unwrap_or_default();
        if eventsub_secret.is_empty() {
            tracing::warn!("EVENTSUB_SECRET is empty; webhook signatures use an empty key");
        }

        Self {
            host,
            port,
            request_timeout_secs,
            shutdown_timeout_secs,
            ping_interval: ping_interval_from_secs(ping_interval_secs),
            eventsub_secret,
        }
    }
}

impl std::fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("shutdown_timeout_secs", &self.shutdown_timeout_secs)
            .field("ping_interval", &self.ping_interval)
            .field("eventsub_secret", &"<redacted>")
            .finish()
    }
}

/// Convert the `PING_INTERVAL` seconds value into an eviction interval.
pub fn ping_interval_from_secs(secs: f64) -> Option<Duration> {
    (secs.is_finite() && secs > 0.0).then(|| Duration::from_secs_f64(secs))
}
