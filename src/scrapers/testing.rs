use crate::error::FetchError;
use crate::scrapers::traits::PageFetcher;
use crate::scrapers::types::RenderOptions;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Serves canned pages and records every request it sees
#[derive(Default)]
pub struct MockFetcher {
    pages: HashMap<String, Result<String, FetchError>>,
    requested: Mutex<Vec<String>>,
    delay: Duration,
    page_delays: HashMap<String, Duration>,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, url: impl Into<String>, html: impl Into<String>) -> Self {
        self.pages.insert(url.into(), Ok(html.into()));
        self
    }

    pub fn with_error(mut self, url: impl Into<String>, err: FetchError) -> Self {
        self.pages.insert(url.into(), Err(err));
        self
    }

    /// Holds every fetch open for `delay` so overlapping requests are observable
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Overrides the delay for one URL, to control completion order
    pub fn with_page_delay(mut self, url: impl Into<String>, delay: Duration) -> Self {
        self.page_delays.insert(url.into(), delay);
        self
    }

    pub fn requested(&self) -> Vec<String> {
        self.requested.lock().unwrap().clone()
    }

    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PageFetcher for MockFetcher {
    async fn fetch(&self, url: &str, _options: &RenderOptions) -> Result<String, FetchError> {
        self.requested.lock().unwrap().push(url.to_string());
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);

        let delay = self.page_delays.get(url).copied().unwrap_or(self.delay);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.pages.get(url).cloned().unwrap_or_else(|| {
            Err(FetchError::Status {
                status: 404,
                detail: format!("no mock for {url}"),
            })
        })
    }
}
