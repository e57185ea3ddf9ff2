use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio_stream::wrappers::TcpListenerStream;
use tonic::transport::Server;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};
use crate::api::rest::{self, ApiState};
use crate::api::{HealthServer, RatesServer};
use crate::config::AppConfig;
use crate::error::{Error, Result};
use crate::health::HealthMonitor;
use crate::interfaces::{QuoteSource, RateSink};
use crate::utils::TaskSupervisor;

/// The gRPC server plus its metrics side channel.
pub struct App {
    rates: RatesServer,
    health: HealthServer,
    monitor: HealthMonitor,
    shutdown_timeout: Duration,
}

impl App {
    pub fn new(
        quotes: Arc<dyn QuoteSource>,
        sink: Arc<dyn RateSink>,
        monitor: HealthMonitor,
        shutdown_timeout: Duration,
    ) -> Self {
        App {
            rates: RatesServer::new(quotes, sink),
            health: HealthServer::new(monitor.clone()),
            monitor,
            shutdown_timeout,
        }
    }

    /// Binds the configured ports and serves until `shutdown` resolves.
    pub async fn run<F>(self, config: &AppConfig, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send,
    {
        let grpc_listener = bind(config.server.addr()).await?;
        let metrics_listener = bind(config.metrics.addr()).await?;
        self.serve(grpc_listener, Some(metrics_listener), shutdown).await
    }

    /// Serves on already bound listeners.
    ///
    /// Once `shutdown` resolves the server stops accepting calls and waits up
    /// to the shutdown timeout for in-flight ones; past that it gives up with
    /// `ShutdownTimeout`.
    pub async fn serve<F>(
        self,
        grpc_listener: TcpListener,
        metrics_listener: Option<TcpListener>,
        shutdown: F,
    ) -> Result<()>
    where
        F: Future<Output = ()> + Send,
    {
        let (stop_tx, stop_rx) = watch::channel(false);
        let mut supervisor = TaskSupervisor::new();

        if let Some(listener) = metrics_listener {
            let addr = listener.local_addr()?;
            let state = Arc::new(ApiState { health: self.monitor.clone() });
            let signal = stopped(stop_rx.clone());
            info!("Metrics endpoint is running on {}", addr);
            supervisor.spawn("metrics_http", async move {
                if let Err(e) = rest::serve(listener, state, signal).await {
                    error!("Metrics endpoint stopped: {}", e);
                }
            });
        }

        let addr = grpc_listener.local_addr()?;
        let server = Server::builder()
            .layer(TraceLayer::new_for_grpc())
            .add_service(self.rates.into_service())
            .add_service(self.health.into_service())
            .serve_with_incoming_shutdown(
                TcpListenerStream::new(grpc_listener),
                stopped(stop_rx),
            );
        tokio::pin!(server);
        info!("gRPC server is running on {}", addr);

        let finished = tokio::select! {
            res = server.as_mut() => Some(res),
            _ = shutdown => None,
        };

        if let Err(e) = supervisor.check_health() {
            warn!("Side channel ended before shutdown: {}", e);
        }

        let result = match finished {
            Some(res) => res.map_err(|e| Error::ServerError(e.to_string())),
            None => {
                info!(
                    "Shutdown requested, draining in-flight calls for up to {:?}",
                    self.shutdown_timeout
                );
                stop_tx.send_replace(true);
                match tokio::time::timeout(self.shutdown_timeout, server.as_mut()).await {
                    Ok(res) => res.map_err(|e| Error::ServerError(e.to_string())),
                    Err(_) => {
                        warn!("In-flight calls did not drain within {:?}", self.shutdown_timeout);
                        Err(Error::ShutdownTimeout {
                            timeout_secs: self.shutdown_timeout.as_secs(),
                        })
                    }
                }
            }
        };

        supervisor.shutdown_all().await;

        if result.is_ok() {
            info!("gRPC server stopped");
        }
        result
    }
}

async fn stopped(mut rx: watch::Receiver<bool>) {
    let _ = rx.wait_for(|stop| *stop).await;
}

async fn bind(addr: SocketAddr) -> Result<TcpListener> {
    TcpListener::bind(addr)
        .await
        .map_err(|e| Error::ServerError(format!("failed to bind {}: {}", addr, e)))
}
