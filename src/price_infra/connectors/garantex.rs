use async_trait::async_trait;
use reqwest::Client;
use std::time::{Duration, Instant};
use tracing::Instrument;
use crate::config::ExchangeConfig;
use crate::context::CallContext;
use crate::error::{Error, Result};
use crate::interfaces::QuoteSource;
use crate::observability::metrics::{UPSTREAM_LATENCY, UPSTREAM_REQUESTS};
use crate::observability::tracing::trace_fetch_quote;
use crate::price_infra::UpstreamQuote;
use crate::types::NewRate;

const USER_AGENT: &str = concat!("usdt-rates/", env!("CARGO_PKG_VERSION"));

/// REST client for the exchange order book endpoint.
///
/// Each `fetch_quote` is a single GET with a fixed per-call timeout; there is
/// no retry at this layer.
pub struct GarantexConnector {
    source_id: String,
    url: String,
    client: Client,
}

impl GarantexConnector {
    pub fn new(config: &ExchangeConfig) -> Result<Self> {
        Self::with_timeout(config.depth_url(), config.request_timeout())
    }

    pub fn with_timeout(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| Error::ConfigError(format!("HTTP client: {}", e)))?;

        Ok(GarantexConnector {
            source_id: "garantex".to_string(),
            url: url.into(),
            client,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn fetch_once(&self) -> Result<NewRate> {
        let span = tracing::Span::current();
        let started = Instant::now();

        let response = self.client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| Error::UpstreamUnreachable(e.to_string()))?;

        let elapsed = started.elapsed();
        UPSTREAM_LATENCY.observe(elapsed.as_secs_f64());
        span.record("http.duration_ms", elapsed.as_millis() as u64);

        let status = response.status();
        span.record("http.status", status.as_u16());
        if !status.is_success() {
            return Err(Error::UpstreamBadStatus { code: status.as_u16() });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| Error::UpstreamUnreachable(e.to_string()))?;

        let rate = UpstreamQuote::from_slice(&body)?.top_of_book()?;
        span.record("rate.ask", tracing::field::display(rate.ask));
        span.record("rate.bid", tracing::field::display(rate.bid));
        Ok(rate)
    }
}

#[async_trait]
impl QuoteSource for GarantexConnector {
    async fn fetch_quote(&self, ctx: &CallContext) -> Result<NewRate> {
        let span = trace_fetch_quote(&self.source_id, &self.url);

        let result = ctx.run(self.fetch_once()).instrument(span.clone()).await;

        let _guard = span.enter();
        match &result {
            Ok(rate) => {
                UPSTREAM_REQUESTS.with_label_values(&["ok"]).inc();
                tracing::debug!("Fetched quote from {}: ask={} bid={}", self.source_id, rate.ask, rate.bid);
            }
            Err(e) => {
                UPSTREAM_REQUESTS.with_label_values(&[outcome_label(e)]).inc();
                tracing::warn!("Quote fetch from {} failed: {}", self.source_id, e);
            }
        }
        result
    }

    fn source_id(&self) -> &str {
        &self.source_id
    }
}

fn outcome_label(error: &Error) -> &'static str {
    match error {
        Error::UpstreamUnreachable(_) => "unreachable",
        Error::UpstreamBadStatus { .. } => "bad_status",
        Error::UpstreamMalformed(_) => "malformed",
        Error::UpstreamEmptyBook => "empty_book",
        Error::UpstreamPriceParse { .. } => "price_parse",
        Error::Cancelled => "cancelled",
        Error::DeadlineExceeded => "deadline_exceeded",
        _ => "other",
    }
}
