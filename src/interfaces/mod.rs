pub mod quote_source;
pub mod rate_sink;

pub use quote_source::QuoteSource;
pub use rate_sink::RateSink;
