use std::time::Duration;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub dbname: String,
    pub sslmode: String,
    pub pool_size: u32,
    pub connect_timeout_secs: u64,
}

impl DatabaseConfig {
    pub fn url(&self) -> String {
        self.url_with_password(&self.password)
    }

    /// Same as [`url`](Self::url) with the password masked, for logs.
    pub fn redacted_url(&self) -> String {
        self.url_with_password("****")
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    fn url_with_password(&self, password: &str) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}?sslmode={}",
            self.username, password, self.host, self.port, self.dbname, self.sslmode
        )
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        DatabaseConfig {
            host: "localhost".to_string(),
            port: 5432,
            username: "postgres".to_string(),
            password: String::new(),
            dbname: "rates".to_string(),
            sslmode: "disable".to_string(),
            pool_size: 8,
            connect_timeout_secs: 30,
        }
    }
}
