use linewatch_core::topics::DEFAULT_TRANSPORT_TOPICS;

/// Server configuration loaded from environment variables.
///
/// All fields have sensible defaults suitable for local development.
/// In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Transport WebSocket endpoints to subscribe to, comma-separated.
    pub transport_urls: Vec<String>,
    /// Transport topics to subscribe each endpoint to.
    pub transport_topics: Vec<String>,
    /// Upper bound on a single event store write, in seconds (default: `5`).
    pub store_write_timeout_secs: u64,
    /// TTL for cached sensor registry entries, in seconds (default: `30`).
    pub registry_ttl_secs: u64,
    /// Interval between dashboard and sensor snapshots (default: `1`).
    pub snapshot_interval_secs: u64,
    /// Interval between alert feed snapshots (default: `10`).
    pub alert_snapshot_interval_secs: u64,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                       | Default                    |
    /// |-------------------------------|----------------------------|
    /// | `HOST`                        | `0.0.0.0`                  |
    /// | `PORT`                        | `3000`                     |
    /// | `CORS_ORIGINS`                | `http://localhost:5173`    |
    /// | `REQUEST_TIMEOUT_SECS`        | `30`                       |
    /// | `TRANSPORT_URLS`              | (empty, no listeners)      |
    /// | `TRANSPORT_TOPICS`            | the extruder topic set     |
    /// | `STORE_WRITE_TIMEOUT_SECS`    | `5`                        |
    /// | `REGISTRY_TTL_SECS`           | `30`                       |
    /// | `SNAPSHOT_INTERVAL_SECS`      | `1`                        |
    /// | `ALERT_SNAPSHOT_INTERVAL_SECS`| `10`                       |
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins = parse_list(
            &std::env::var("CORS_ORIGINS").unwrap_or_else(|_| "http://localhost:5173".into()),
        );

        let request_timeout_secs = parse_secs("REQUEST_TIMEOUT_SECS", 30);

        let transport_urls = parse_list(&std::env::var("TRANSPORT_URLS").unwrap_or_default());

        let transport_topics = match std::env::var("TRANSPORT_TOPICS") {
            Ok(raw) => parse_list(&raw),
            Err(_) => DEFAULT_TRANSPORT_TOPICS
                .iter()
                .map(|t| t.to_string())
                .collect(),
        };

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            transport_urls,
            transport_topics,
            store_write_timeout_secs: parse_secs("STORE_WRITE_TIMEOUT_SECS", 5),
            registry_ttl_secs: parse_secs("REGISTRY_TTL_SECS", 30),
            snapshot_interval_secs: parse_secs("SNAPSHOT_INTERVAL_SECS", 1),
            alert_snapshot_interval_secs: parse_secs("ALERT_SNAPSHOT_INTERVAL_SECS", 10),
        }
    }
}

fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn parse_secs(var: &str, default: u64) -> u64 {
    std::env::var(var)
        .unwrap_or_else(|_| default.to_string())
        .parse()
        .unwrap_or_else(|_| panic!("{var} must be a valid u64"))
}
