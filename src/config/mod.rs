/// Configuration management for the stepway engine
///
/// Handles server configuration, storage backends, and engine runtime parameters.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server configuration
    pub server: ServerConfig,
    /// Storage configuration
    pub database: DatabaseConfig,
    /// Execution engine tuning
    pub engine: EngineConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Server bind address (e.g., "0.0.0.0")
    pub host: String,
    /// Server port number
    pub port: u16,
}

/// Which backend holds definitions and instance documents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// Process-local maps, lost on restart
    Memory,
    /// SQLite file under `data_dir`
    Sqlite,
}

impl StoreBackend {
    fn from_env_value(value: &str) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "memory" | "mem" => StoreBackend::Memory,
            _ => StoreBackend::Sqlite,
        }
    }
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Base directory for the SQLite database file (default: "data")
    /// Creates: {data_dir}/stepway.db
    pub data_dir: String,
    /// Storage backend for definitions and instances
    pub backend: StoreBackend,
}

impl DatabaseConfig {
    /// Full path of the SQLite database file
    pub fn sqlite_path(&self) -> std::path::PathBuf {
        std::path::Path::new(&self.data_dir).join("stepway.db")
    }
}

/// Execution engine parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Expiry applied to every instance write; None keeps instances forever
    pub instance_ttl_secs: Option<u64>,
    /// Buffer size of the lifecycle event broadcast channel
    pub event_channel_capacity: usize,
    /// Artificial latency of the built-in simulated functions
    pub simulated_latency_ms: u64,
    /// Register the sample signup workflow at startup
    pub seed_sample_workflow: bool,
}

impl EngineConfig {
    pub fn instance_ttl(&self) -> Option<Duration> {
        self.instance_ttl_secs.map(Duration::from_secs)
    }

    pub fn simulated_latency(&self) -> Duration {
        Duration::from_millis(self.simulated_latency_ms)
    }
}

impl Default for Config {
    /// Default configuration with ENV_VAR support for container deployment
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: std::env::var("STEPWAY_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: std::env::var("STEPWAY_PORT")
                    .unwrap_or_else(|_| "3000".to_string())
                    .parse()
                    .unwrap_or(3000),
            },
            database: DatabaseConfig {
                data_dir: std::env::var("STEPWAY_DATA_DIR")
                    .unwrap_or_else(|_| "data".to_string()),
                backend: std::env::var("STEPWAY_STORE")
                    .map(|v| StoreBackend::from_env_value(&v))
                    .unwrap_or(StoreBackend::Sqlite),
            },
            engine: EngineConfig {
                instance_ttl_secs: std::env::var("STEPWAY_INSTANCE_TTL_SECS")
                    .ok()
                    .and_then(|v| v.parse().ok()),
                event_channel_capacity: std::env::var("STEPWAY_EVENT_CAPACITY")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(1024),
                simulated_latency_ms: std::env::var("STEPWAY_SIMULATED_LATENCY_MS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(0),
                seed_sample_workflow: std::env::var("STEPWAY_SEED_SAMPLE")
                    .map(|v| !matches!(v.as_str(), "0" | "false" | "no"))
                    .unwrap_or(true),
            },
        }
    }
}
