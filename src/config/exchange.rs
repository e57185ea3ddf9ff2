use std::time::Duration;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct ExchangeConfig {
    pub base_url: String,
    pub market: String,
    pub request_timeout_secs: u64,
}

impl ExchangeConfig {
    /// Order book endpoint, e.g. `https://garantex.org/api/v2/depth?market=usdtrub`.
    pub fn depth_url(&self) -> String {
        format!(
            "{}/api/v2/depth?market={}",
            self.base_url.trim_end_matches('/'),
            self.market
        )
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        ExchangeConfig {
            base_url: "https://garantex.org".to_string(),
            market: "usdtrub".to_string(),
            request_timeout_secs: 10,
        }
    }
}
