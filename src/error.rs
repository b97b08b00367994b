use thiserror::Error;

/// Problems detected before any request is made
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("ScrapingAnt API key is required: set SCRAPINGANT_API_KEY or pass --api-key")]
    MissingApiKey,
    #[error("invalid property type '{0}': expected one of all, apartment, house")]
    InvalidPropertyType(String),
    #[error("worker count must be at least 1")]
    NoWorkers,
}

/// A single failed request through the rendering API
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("request timed out")]
    Timeout,
    #[error("rendering API returned {status}: {detail}")]
    Status { status: u16, detail: String },
    #[error("failed to read response body: {0}")]
    Body(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FetchError::Timeout
        } else if err.is_body() || err.is_decode() {
            FetchError::Body(err.to_string())
        } else {
            FetchError::Transport(err.to_string())
        }
    }
}

/// Why a single field stayed empty; never escapes the listing parser
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FieldError {
    #[error("not present in document")]
    Missing,
    #[error("could not interpret {0:?}")]
    Unparsable(String),
}

/// Errors that abort a scrape run
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("failed to fetch search page {page} ({url}): {source}")]
    PageFetch {
        page: u32,
        url: String,
        #[source]
        source: FetchError,
    },
}
