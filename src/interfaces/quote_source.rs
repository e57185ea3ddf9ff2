use async_trait::async_trait;
use crate::context::CallContext;
use crate::error::Result;
use crate::types::NewRate;

/// Something that can produce the current top-of-book quote.
///
/// One call is one upstream attempt; retrying is the caller's decision.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait QuoteSource: Send + Sync {
    async fn fetch_quote(&self, ctx: &CallContext) -> Result<NewRate>;
    fn source_id(&self) -> &str;
}
