use serde::{Deserialize, Serialize};
use std::fmt;

/// Coarse liveness derived from process uptime.
///
/// `Unhealthy` has no producing transition yet; it is kept so the wire
/// mapping can express `NOT_SERVING` once a dependency check exists.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum HealthStatus {
    Initializing,
    Healthy,
    Unhealthy,
}

impl HealthStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            HealthStatus::Initializing => "Initializing",
            HealthStatus::Healthy => "Healthy",
            HealthStatus::Unhealthy => "Unhealthy",
        }
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
