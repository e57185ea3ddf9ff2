use std::time::Duration;
use tokio::time::Instant;
use crate::context::CallContext;
use crate::error::Result;
use crate::types::HealthStatus;

pub const DEFAULT_WARMUP: Duration = Duration::from_secs(5);

/// Uptime based liveness.
///
/// `Initializing` until `warmup` has elapsed since construction, `Healthy`
/// afterwards. The start instant is fixed at construction and never
/// mutated, so the monitor can be shared without locking.
#[derive(Clone, Debug)]
pub struct HealthMonitor {
    started_at: Instant,
    warmup: Duration,
}

impl HealthMonitor {
    pub fn new(warmup: Duration) -> Self {
        HealthMonitor {
            started_at: Instant::now(),
            warmup,
        }
    }

    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }

    pub fn status(&self) -> HealthStatus {
        self.status_at(Instant::now())
    }

    pub fn status_at(&self, now: Instant) -> HealthStatus {
        if now.saturating_duration_since(self.started_at) < self.warmup {
            HealthStatus::Initializing
        } else {
            HealthStatus::Healthy
        }
    }

    /// Current status, unless the caller has already given up.
    pub fn check(&self, ctx: &CallContext) -> Result<HealthStatus> {
        ctx.check()?;
        Ok(self.status())
    }
}

impl Default for HealthMonitor {
    fn default() -> Self {
        Self::new(DEFAULT_WARMUP)
    }
}
