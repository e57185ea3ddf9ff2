use opentelemetry::trace::TracerProvider as _;
use opentelemetry::KeyValue;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::trace::TracerProvider;
use opentelemetry_sdk::{runtime, Resource};
use tracing::Span;
use tracing::field::Empty;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};
use crate::config::{LogFormat, LoggingConfig};
use crate::context::CallContext;
use crate::error::{Error, Result};

pub const SERVICE_NAME: &str = "usdt-rates";

/// Keeps the span exporter alive; flush it with [`TracingGuard::shutdown`]
/// once the server has stopped.
pub struct TracingGuard {
    provider: Option<TracerProvider>,
}

impl TracingGuard {
    pub fn is_exporting(&self) -> bool {
        self.provider.is_some()
    }

    /// Flushes buffered spans and stops the exporter. Blocks.
    pub fn shutdown(self) {
        if let Some(provider) = self.provider {
            if let Err(e) = provider.shutdown() {
                tracing::warn!("Failed to flush span exporter: {}", e);
            }
        }
    }
}

/// Installs the global subscriber. `RUST_LOG` wins over `logging.level`.
///
/// With `logging.otlp_endpoint` set, spans are also exported over OTLP/gRPC.
pub fn init_tracing(config: &LoggingConfig) -> Result<TracingGuard> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .map_err(|e| Error::ConfigError(format!("invalid log level: {}", e)))?;

    let (json, pretty) = match config.format {
        LogFormat::Json => (Some(fmt::layer().json().with_current_span(true).with_target(true)), None),
        LogFormat::Pretty => (None, Some(fmt::layer().pretty().with_target(true))),
    };

    let provider = config.otlp_endpoint
        .as_deref()
        .map(tracer_provider)
        .transpose()?;
    let otel = provider
        .as_ref()
        .map(|provider| tracing_opentelemetry::layer().with_tracer(provider.tracer(SERVICE_NAME)));

    tracing_subscriber::registry()
        .with(filter)
        .with(json)
        .with(pretty)
        .with(otel)
        .try_init()
        .map_err(|e| Error::ConfigError(format!("tracing already initialised: {}", e)))?;

    if let Some(endpoint) = &config.otlp_endpoint {
        tracing::info!("Exporting spans to {}", endpoint);
    }
    Ok(TracingGuard { provider })
}

/// Batch OTLP/gRPC exporter tagged with [`service_resource`]. Must be called
/// inside the tokio runtime.
pub fn tracer_provider(endpoint: &str) -> Result<TracerProvider> {
    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(endpoint)
        .build()
        .map_err(|e| Error::ConfigError(format!("span exporter: {}", e)))?;

    Ok(TracerProvider::builder()
        .with_batch_exporter(exporter, runtime::Tokio)
        .with_resource(service_resource())
        .build())
}

pub fn service_resource() -> Resource {
    Resource::new(vec![
        KeyValue::new("service.name", SERVICE_NAME),
        KeyValue::new("service.version", env!("CARGO_PKG_VERSION")),
    ])
}

pub fn trace_get_rates(ctx: &CallContext) -> Span {
    tracing::info_span!(
        "GetRates",
        rpc.system = "grpc",
        rpc.service = "RatesService",
        rpc.method = "GetRates",
        request_id = %ctx.request_id(),
        rate.ask = Empty,
        rate.bid = Empty,
        rate.timestamp = Empty,
        error = Empty,
    )
}

pub fn trace_check_health(ctx: &CallContext) -> Span {
    tracing::info_span!(
        "CheckHealth",
        rpc.system = "grpc",
        rpc.service = "Health",
        rpc.method = "Check",
        request_id = %ctx.request_id(),
        health.status = Empty,
        error = Empty,
    )
}

pub fn trace_fetch_quote(source_id: &str, url: &str) -> Span {
    tracing::info_span!(
        "fetch_quote",
        source = source_id,
        http.method = "GET",
        http.url = url,
        http.status = Empty,
        http.duration_ms = Empty,
        rate.ask = Empty,
        rate.bid = Empty,
    )
}

pub fn trace_save_rate() -> Span {
    tracing::info_span!(
        "save_rate",
        rate.id = Empty,
        rate.ask = Empty,
        rate.bid = Empty,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use opentelemetry::{Key, Value};

    #[test]
    fn resource_names_the_service() {
        let resource = service_resource();
        assert_eq!(resource.get(Key::from_static_str("service.name")), Some(Value::from(SERVICE_NAME)));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn exporter_builds_without_a_reachable_collector() {
        let provider = tracer_provider("http://127.0.0.1:4317").unwrap();
        let guard = TracingGuard { provider: Some(provider) };
        assert!(guard.is_exporting());

        tokio::task::spawn_blocking(move || guard.shutdown()).await.unwrap();
    }
}
