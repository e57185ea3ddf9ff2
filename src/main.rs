use std::sync::Arc;
use anyhow::{Context, Result};
use tracing::{error, info};
use usdt_rates::config::AppConfig;
use usdt_rates::core::App;
use usdt_rates::health::HealthMonitor;
use usdt_rates::observability::{metrics, tracing::{init_tracing, TracingGuard}};
use usdt_rates::price_infra::connectors::GarantexConnector;
use usdt_rates::storage::{bootstrap, PgConnector, PgRateStore, RetryPolicy};

#[tokio::main]
async fn main() -> Result<()> {
    let env = std::env::var(usdt_rates::ENV_VAR).unwrap_or_else(|_| "default".to_string());
    let config = AppConfig::load(&env).context("failed to load configuration")?;

    let tracing_guard = init_tracing(&config.logging)?;
    metrics::register_metrics()?;
    info!("Starting usdt-rates ({} environment)", env);

    // Uptime counts from here, before storage comes up.
    let monitor = HealthMonitor::new(config.health.warmup());

    let connector = PgConnector::new(&config.database);
    let pool = match bootstrap(&connector, &RetryPolicy::from_config(&config.database)).await {
        Ok(pool) => pool,
        Err(e) => {
            error!("Storage is unavailable, refusing to start: {}", e);
            flush_spans(tracing_guard).await;
            return Err(e.into());
        }
    };

    let quotes = Arc::new(GarantexConnector::new(&config.exchange)?);
    let sink = Arc::new(PgRateStore::new(Arc::clone(&pool)));

    let app = App::new(quotes, sink, monitor, config.server.shutdown_timeout());
    let result = app.run(&config, shutdown_signal()).await;

    drop(pool);
    info!("Storage pool closed");

    flush_spans(tracing_guard).await;

    result.map_err(Into::into)
}

async fn flush_spans(guard: TracingGuard) {
    if !guard.is_exporting() {
        return;
    }
    info!("Flushing exported spans");
    if let Err(e) = tokio::task::spawn_blocking(move || guard.shutdown()).await {
        error!("Span exporter shutdown task failed: {}", e);
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutdown signal received, gracefully stopping");
}
