//! Wire messages for `proto/rates.proto` and `proto/health.proto`.
//!
//! The service plumbing is generated by `build.rs`; the messages are plain
//! `prost` structs declared here.

#[derive(Clone, Copy, PartialEq, prost::Message)]
pub struct GetRatesRequest {}

#[derive(Clone, Copy, PartialEq, prost::Message)]
pub struct GetRatesResponse {
    #[prost(double, tag = "1")]
    pub ask: f64,
    #[prost(double, tag = "2")]
    pub bid: f64,
    /// Unix seconds of the persisted record.
    #[prost(int64, tag = "3")]
    pub timestamp: i64,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct HealthCheckRequest {
    #[prost(string, tag = "1")]
    pub service: String,
}

#[derive(Clone, Copy, PartialEq, prost::Message)]
pub struct HealthCheckResponse {
    #[prost(enumeration = "ServingStatus", tag = "1")]
    pub status: i32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum ServingStatus {
    Unknown = 0,
    Serving = 1,
    NotServing = 2,
}

impl ServingStatus {
    /// Enum value name as written in `health.proto`.
    pub fn as_str_name(&self) -> &'static str {
        match self {
            ServingStatus::Unknown => "UNKNOWN",
            ServingStatus::Serving => "SERVING",
            ServingStatus::NotServing => "NOT_SERVING",
        }
    }
}

pub mod rates {
    include!(concat!(env!("OUT_DIR"), "/rates.RatesService.rs"));
}

pub mod health {
    include!(concat!(env!("OUT_DIR"), "/health.Health.rs"));
}
