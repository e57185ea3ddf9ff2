use std::sync::Arc;
use std::time::Instant;
use tonic::{Request, Response, Status};
use tracing::{debug, info, warn, Instrument};
use crate::api::proto::health::health_server::{self, Health};
use crate::api::proto::rates::rates_service_server::{RatesService, RatesServiceServer};
use crate::api::proto::{
    GetRatesRequest, GetRatesResponse, HealthCheckRequest, HealthCheckResponse, ServingStatus,
};
use crate::context::CallContext;
use crate::error::{Error, Result};
use crate::health::HealthMonitor;
use crate::interfaces::{QuoteSource, RateSink};
use crate::observability::metrics::observe_grpc;
use crate::observability::tracing::{trace_check_health, trace_get_rates};
use crate::types::{HealthStatus, Rate};

/// `RatesService` handler: one fetch, one insert, one reply.
pub struct RatesServer {
    quotes: Arc<dyn QuoteSource>,
    sink: Arc<dyn RateSink>,
}

impl RatesServer {
    pub fn new(quotes: Arc<dyn QuoteSource>, sink: Arc<dyn RateSink>) -> Self {
        RatesServer { quotes, sink }
    }

    pub fn into_service(self) -> RatesServiceServer<Self> {
        RatesServiceServer::new(self)
    }

    /// Fetches the top of book and persists it.
    ///
    /// A failed fetch never reaches the sink. A failed insert discards the
    /// fetched quote; the caller gets the error and nothing else.
    pub async fn fetch_and_store(&self, ctx: &CallContext) -> Result<Rate> {
        let quote = self.quotes.fetch_quote(ctx).await?;
        self.sink.save_rate(&quote).await
    }
}

#[tonic::async_trait]
impl RatesService for RatesServer {
    async fn get_rates(
        &self,
        request: Request<GetRatesRequest>,
    ) -> std::result::Result<Response<GetRatesResponse>, Status> {
        let started = Instant::now();
        let ctx = CallContext::from_metadata(request.metadata());
        let span = trace_get_rates(&ctx);

        let result = self.fetch_and_store(&ctx).instrument(span.clone()).await;

        let reply = match result {
            Ok(rate) => {
                span.record("rate.ask", tracing::field::display(rate.ask));
                span.record("rate.bid", tracing::field::display(rate.bid));
                span.record("rate.timestamp", rate.unix_timestamp());
                span.in_scope(|| info!("Served rate {} from {}", rate.id, self.quotes.source_id()));
                Ok(Response::new(GetRatesResponse {
                    ask: rate.ask_f64(),
                    bid: rate.bid_f64(),
                    timestamp: rate.unix_timestamp(),
                }))
            }
            Err(e) => {
                span.record("error", tracing::field::display(&e));
                span.in_scope(|| {
                    if e.is_context() {
                        info!("GetRates abandoned by caller: {}", e);
                    } else {
                        warn!("GetRates failed: {}", e);
                    }
                });
                Err(to_status(&e))
            }
        };

        let code = reply.as_ref().map(|_| tonic::Code::Ok).unwrap_or_else(|s| s.code());
        observe_grpc("GetRates", code, started.elapsed().as_secs_f64());
        reply
    }
}

/// `Health` handler backed by the uptime monitor.
pub struct HealthServer {
    monitor: HealthMonitor,
}

impl HealthServer {
    pub fn new(monitor: HealthMonitor) -> Self {
        HealthServer { monitor }
    }

    pub fn into_service(self) -> health_server::HealthServer<Self> {
        health_server::HealthServer::new(self)
    }
}

#[tonic::async_trait]
impl Health for HealthServer {
    async fn check(
        &self,
        request: Request<HealthCheckRequest>,
    ) -> std::result::Result<Response<HealthCheckResponse>, Status> {
        let started = Instant::now();
        let ctx = CallContext::from_metadata(request.metadata());
        let span = trace_check_health(&ctx);

        let result = span.in_scope(|| {
            let status = self.monitor.check(&ctx)?;
            span.record("health.status", status.as_str());
            serving_status(status)
        });

        let reply = match result {
            Ok(status) => {
                span.in_scope(|| debug!("Health check answered {}", status.as_str_name()));
                Ok(Response::new(HealthCheckResponse { status: status as i32 }))
            }
            Err(e) => {
                span.record("error", tracing::field::display(&e));
                Err(to_status(&e))
            }
        };

        let code = reply.as_ref().map(|_| tonic::Code::Ok).unwrap_or_else(|s| s.code());
        observe_grpc("Check", code, started.elapsed().as_secs_f64());
        reply
    }
}

/// Maps an internal status onto the wire enum.
///
/// Only `Healthy` and `Unhealthy` have a wire form; anything else, including
/// the warm-up state, is reported to the caller as an error.
pub fn serving_status(status: HealthStatus) -> Result<ServingStatus> {
    match status {
        HealthStatus::Healthy => Ok(ServingStatus::Serving),
        HealthStatus::Unhealthy => Ok(ServingStatus::NotServing),
        other => Err(Error::UnknownHealthStatus { value: other.to_string() }),
    }
}

/// gRPC status for a handler error.
pub fn to_status(error: &Error) -> Status {
    match error {
        e if e.is_upstream() => Status::unavailable(format!("upstream error: {}", e)),
        Error::Persistence(_) => Status::internal(format!("persistence error: {}", error)),
        Error::UnknownHealthStatus { .. } => Status::unknown(error.to_string()),
        Error::Cancelled => Status::cancelled(error.to_string()),
        Error::DeadlineExceeded => Status::deadline_exceeded(error.to_string()),
        other => Status::internal(other.to_string()),
    }
}
