use crate::config::{
    DatabaseConfig, ExchangeConfig, HealthConfig, LoggingConfig, MetricsConfig, ServerConfig,
};
use crate::error::{Error, Result};
use config::{Config, Environment, File};
use serde::Deserialize;

pub const ENV_PREFIX: &str = "USDT_RATES";

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub metrics: MetricsConfig,
    pub database: DatabaseConfig,
    pub exchange: ExchangeConfig,
    pub health: HealthConfig,
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Layers `config/default`, `config/{env}`, the file named by
    /// `CONFIG_PATH` and `USDT_RATES__*` environment variables, in that order.
    pub fn load(env: &str) -> Result<Self> {
        let mut builder = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", env)).required(false));

        if let Ok(path) = std::env::var("CONFIG_PATH") {
            builder = builder.add_source(File::with_name(&path));
        }

        let config = builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| Error::ConfigError(e.to_string()))?;

        let cfg: AppConfig = config.try_deserialize()
            .map_err(|e| Error::ConfigError(e.to_string()))?;

        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::from_str(contents, config::FileFormat::Toml))
            .build()
            .map_err(|e| Error::ConfigError(e.to_string()))?;

        let cfg: AppConfig = config.try_deserialize()
            .map_err(|e| Error::ConfigError(e.to_string()))?;

        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(Error::ConfigError("server.port must be non-zero".to_string()));
        }
        if self.database.host.is_empty() || self.database.dbname.is_empty() {
            return Err(Error::ConfigError("database.host and database.dbname are required".to_string()));
        }
        if self.database.connect_timeout_secs == 0 {
            return Err(Error::ConfigError("database.connect_timeout_secs must be non-zero".to_string()));
        }
        if self.exchange.base_url.is_empty() {
            return Err(Error::ConfigError("exchange.base_url is required".to_string()));
        }
        if self.exchange.request_timeout_secs == 0 {
            return Err(Error::ConfigError("exchange.request_timeout_secs must be non-zero".to_string()));
        }
        Ok(())
    }
}
