use std::time::Duration;
use serde::{Deserialize, Serialize};

pub mod database;
pub mod exchange;
pub mod server;
pub mod loader;

pub use database::DatabaseConfig;
pub use exchange::ExchangeConfig;
pub use loader::AppConfig;
pub use server::{MetricsConfig, ServerConfig};

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct HealthConfig {
    pub warmup_secs: u64,
}

impl HealthConfig {
    pub fn warmup(&self) -> Duration {
        Duration::from_secs(self.warmup_secs)
    }
}

impl Default for HealthConfig {
    fn default() -> Self {
        HealthConfig {
            warmup_secs: 5,
        }
    }
}

#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    Pretty,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
    /// OTLP/gRPC collector for span export, e.g. `http://localhost:4317`.
    /// Spans stay local when unset.
    pub otlp_endpoint: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: "info".to_string(),
            format: LogFormat::Json,
            otlp_endpoint: None,
        }
    }
}
