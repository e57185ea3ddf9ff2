use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    // Storage Bootstrap Errors
    #[error("Storage connection timed out after {attempts} attempts ({elapsed_ms} ms): {last_error}")]
    ConnectionTimeout {
        attempts: u32,
        elapsed_ms: u128,
        last_error: String,
    },

    #[error("Storage connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Migration failed: {0}")]
    Migration(String),

    // Upstream Exchange Errors
    #[error("Upstream unreachable: {0}")]
    UpstreamUnreachable(String),

    #[error("Upstream returned non-success status: {code}")]
    UpstreamBadStatus { code: u16 },

    #[error("Upstream response malformed: {0}")]
    UpstreamMalformed(String),

    #[error("Upstream order book is empty")]
    UpstreamEmptyBook,

    #[error("Failed to parse {which} price: {raw:?}")]
    UpstreamPriceParse { which: PriceSide, raw: String },

    // Persistence Errors
    #[error("Persistence error: {0}")]
    Persistence(String),

    // Health Errors
    #[error("Unknown health status: {value}")]
    UnknownHealthStatus { value: String },

    // Call Context Errors
    #[error("Call cancelled")]
    Cancelled,

    #[error("Deadline exceeded")]
    DeadlineExceeded,

    // System Errors
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Metrics error: {0}")]
    MetricsError(String),

    #[error("Server error: {0}")]
    ServerError(String),

    #[error("Graceful shutdown did not finish within {timeout_secs}s")]
    ShutdownTimeout { timeout_secs: u64 },

    #[error("Task failure: {0}")]
    TaskFailure(String),

    // IO Errors
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl Error {
    /// True for every failure that originates at the exchange.
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            Error::UpstreamUnreachable(_)
                | Error::UpstreamBadStatus { .. }
                | Error::UpstreamMalformed(_)
                | Error::UpstreamEmptyBook
                | Error::UpstreamPriceParse { .. }
        )
    }

    /// True when the caller gave up (cancel or deadline).
    pub fn is_context(&self) -> bool {
        matches!(self, Error::Cancelled | Error::DeadlineExceeded)
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriceSide {
    Ask,
    Bid,
}

impl std::fmt::Display for PriceSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PriceSide::Ask => write!(f, "ask"),
            PriceSide::Bid => write!(f, "bid"),
        }
    }
}
