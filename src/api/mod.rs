pub mod grpc;
pub mod proto;
pub mod rest;

pub use grpc::{HealthServer, RatesServer};
