#![allow(missing_docs)]

use async_trait::async_trait;

use crate::error::Result;
use crate::value_objects::{CompletionRequest, CompletionResponse};

/// LLM text generation gateway.
///
/// One provider instance serves every configured model of its family; the
/// request carries the model id. Providers classify their transport errors
/// into the domain taxonomy (`ProviderUnavailable`, `RateLimited`,
/// `InvalidRequest`) and never retry internally.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse>;
    fn provider_name(&self) -> &str;

    async fn health_check(&self) -> Result<()> {
        Ok(())
    }
}
