pub mod api;
pub mod config;
pub mod context;
pub mod core;
pub mod error;
pub mod health;
pub mod interfaces;
pub mod observability;
pub mod price_infra;
pub mod storage;
pub mod types;
pub mod utils;

/// Environment variable selecting the `config/{env}` overlay.
pub const ENV_VAR: &str = "USDT_RATES_ENV";
