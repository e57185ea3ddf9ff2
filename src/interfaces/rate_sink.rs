use async_trait::async_trait;
use crate::error::Result;
use crate::types::{NewRate, Rate};

/// Append-only destination for fetched quotes. There is no read path.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RateSink: Send + Sync {
    /// Inserts one row and returns it with the storage-assigned id and timestamp.
    async fn save_rate(&self, rate: &NewRate) -> Result<Rate>;
}
