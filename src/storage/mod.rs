//! Durable storage for fetched quotes.
//!
//! - [`bootstrap`] establishes the connection pool under a bounded retry
//!   policy and applies the embedded migrations.
//! - [`postgres`] holds the Postgres connector and the append-only
//!   [`RateSink`](crate::interfaces::RateSink) implementation.

pub mod bootstrap;
pub mod model;
pub mod postgres;
pub mod schema;

pub use bootstrap::{bootstrap, RetryPolicy, StorageConnector};
pub use postgres::{PgConnector, PgPool, PgRateStore};
