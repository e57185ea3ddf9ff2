use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;
use uuid::Uuid;
use crate::error::{Error, Result};

/// Header carrying the client deadline on gRPC calls.
pub const GRPC_TIMEOUT_HEADER: &str = "grpc-timeout";

/// Per-call context: an optional deadline, a cancellation flag and a
/// request id for log correlation.
///
/// Clones share the cancellation flag, so cancelling any clone cancels
/// every suspend point that runs under the context.
#[derive(Clone, Debug)]
pub struct CallContext {
    request_id: Uuid,
    deadline: Option<Instant>,
    cancel_tx: Arc<watch::Sender<bool>>,
}

impl CallContext {
    pub fn new() -> Self {
        let (cancel_tx, _) = watch::channel(false);
        CallContext {
            request_id: Uuid::new_v4(),
            deadline: None,
            cancel_tx: Arc::new(cancel_tx),
        }
    }

    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Keeps the earlier of the current and the given deadline.
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(match self.deadline {
            Some(current) if current < deadline => current,
            _ => deadline,
        });
        self
    }

    /// Builds a context from gRPC request metadata, honouring `grpc-timeout`.
    pub fn from_metadata(metadata: &tonic::metadata::MetadataMap) -> Self {
        let ctx = CallContext::new();
        match metadata
            .get(GRPC_TIMEOUT_HEADER)
            .and_then(|value| value.to_str().ok())
            .and_then(parse_grpc_timeout)
        {
            Some(timeout) => ctx.with_timeout(timeout),
            None => ctx,
        }
    }

    pub fn request_id(&self) -> Uuid {
        self.request_id
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn cancel(&self) {
        self.cancel_tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.cancel_tx.borrow()
    }

    /// `Cancelled` or `DeadlineExceeded` once the context is done.
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            return Err(Error::Cancelled);
        }
        if let Some(deadline) = self.deadline {
            if Instant::now() >= deadline {
                return Err(Error::DeadlineExceeded);
            }
        }
        Ok(())
    }

    /// Drives `fut` until it completes, the deadline passes or the context
    /// is cancelled, whichever comes first.
    pub async fn run<F, T>(&self, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        self.check()?;

        let mut cancel_rx = self.cancel_tx.subscribe();
        let cancelled = async move {
            // The sender lives as long as `self`, so this only ends on cancel.
            let _ = cancel_rx.wait_for(|cancelled| *cancelled).await;
        };

        match self.deadline {
            Some(deadline) => tokio::select! {
                res = fut => res,
                _ = tokio::time::sleep_until(deadline) => Err(Error::DeadlineExceeded),
                _ = cancelled => Err(Error::Cancelled),
            },
            None => tokio::select! {
                res = fut => res,
                _ = cancelled => Err(Error::Cancelled),
            },
        }
    }
}

impl Default for CallContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Parses a `grpc-timeout` value: at most 8 ASCII digits followed by one of
/// `H`, `M`, `S`, `m`, `u`, `n`.
pub fn parse_grpc_timeout(value: &str) -> Option<Duration> {
    if value.len() < 2 || value.len() > 9 {
        return None;
    }
    let (digits, unit) = value.split_at(value.len() - 1);
    if !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let amount: u64 = digits.parse().ok()?;

    match unit {
        "H" => Some(Duration::from_secs(amount * 3600)),
        "M" => Some(Duration::from_secs(amount * 60)),
        "S" => Some(Duration::from_secs(amount)),
        "m" => Some(Duration::from_millis(amount)),
        "u" => Some(Duration::from_micros(amount)),
        "n" => Some(Duration::from_nanos(amount)),
        _ => None,
    }
}
