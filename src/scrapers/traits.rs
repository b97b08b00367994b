use crate::error::FetchError;
use crate::scrapers::types::RenderOptions;
use async_trait::async_trait;

/// Fetches the raw HTML of a portal page.
///
/// Implementations own their timeout; callers treat every error the same way.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str, options: &RenderOptions) -> Result<String, FetchError>;
}
