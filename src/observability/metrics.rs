use lazy_static::lazy_static;
use prometheus::{
    Encoder, Histogram, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, Registry,
    TextEncoder,
};
use crate::error::{Error, Result};

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();

    // gRPC metrics
    pub static ref GRPC_REQUESTS: IntCounterVec = IntCounterVec::new(
        Opts::new("grpc_requests_total", "Total number of gRPC requests"),
        &["method", "code"]
    ).unwrap();

    pub static ref GRPC_REQUEST_LATENCY: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            "grpc_request_latency_seconds",
            "Histogram of gRPC request latencies"
        ),
        &["method"]
    ).unwrap();

    // Upstream metrics
    pub static ref UPSTREAM_REQUESTS: IntCounterVec = IntCounterVec::new(
        Opts::new("upstream_requests_total", "Exchange order book requests by outcome"),
        &["outcome"]
    ).unwrap();

    pub static ref UPSTREAM_LATENCY: Histogram = Histogram::with_opts(
        HistogramOpts::new(
            "upstream_request_latency_seconds",
            "Exchange order book request latency"
        ).buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0])
    ).unwrap();

    // Storage metrics
    pub static ref RATES_PERSISTED: IntCounter = IntCounter::new(
        "rates_persisted_total",
        "Total number of rates written to storage"
    ).unwrap();

    pub static ref PERSISTENCE_FAILURES: IntCounter = IntCounter::new(
        "rate_persistence_failures_total",
        "Total number of failed rate inserts"
    ).unwrap();

    pub static ref STORAGE_CONNECT_ATTEMPTS: IntCounter = IntCounter::new(
        "storage_connect_attempts_total",
        "Storage connection attempts made during bootstrap"
    ).unwrap();
}

/// Registers every collector with [`REGISTRY`]. Calling it twice is an error.
pub fn register_metrics() -> Result<()> {
    let collectors: Vec<Box<dyn prometheus::core::Collector>> = vec![
        Box::new(GRPC_REQUESTS.clone()),
        Box::new(GRPC_REQUEST_LATENCY.clone()),
        Box::new(UPSTREAM_REQUESTS.clone()),
        Box::new(UPSTREAM_LATENCY.clone()),
        Box::new(RATES_PERSISTED.clone()),
        Box::new(PERSISTENCE_FAILURES.clone()),
        Box::new(STORAGE_CONNECT_ATTEMPTS.clone()),
    ];

    for collector in collectors {
        REGISTRY.register(collector)
            .map_err(|e| Error::MetricsError(e.to_string()))?;
    }
    Ok(())
}

/// Prometheus text exposition of [`REGISTRY`].
pub fn render() -> Result<String> {
    let mut buffer = Vec::new();
    TextEncoder::new()
        .encode(&REGISTRY.gather(), &mut buffer)
        .map_err(|e| Error::MetricsError(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| Error::MetricsError(e.to_string()))
}

pub fn observe_grpc(method: &str, code: tonic::Code, elapsed_secs: f64) {
    GRPC_REQUESTS
        .with_label_values(&[method, code_label(code)])
        .inc();
    GRPC_REQUEST_LATENCY
        .with_label_values(&[method])
        .observe(elapsed_secs);
}

fn code_label(code: tonic::Code) -> &'static str {
    match code {
        tonic::Code::Ok => "ok",
        tonic::Code::Cancelled => "cancelled",
        tonic::Code::Unknown => "unknown",
        tonic::Code::DeadlineExceeded => "deadline_exceeded",
        tonic::Code::Unavailable => "unavailable",
        tonic::Code::Internal => "internal",
        _ => "other",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_includes_registered_families() {
        // Registration may already have happened in another test.
        let _ = register_metrics();
        observe_grpc("GetRates", tonic::Code::Ok, 0.01);

        let text = render().unwrap();
        assert!(text.contains("grpc_requests_total"));
        assert!(text.contains("method=\"GetRates\""));
    }

    #[test]
    fn second_registration_fails() {
        let _ = register_metrics();
        assert!(matches!(register_metrics(), Err(Error::MetricsError(_))));
    }
}
