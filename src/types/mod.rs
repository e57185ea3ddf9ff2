pub mod health;
pub mod rate;

pub use health::HealthStatus;
pub use rate::{NewRate, Rate};
