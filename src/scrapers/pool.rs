use crate::error::FetchError;
use crate::models::PropertyListing;
use crate::scrapers::traits::PageFetcher;
use crate::scrapers::types::RenderOptions;
use futures::stream::{self, StreamExt};
use tracing::{debug, info, warn};

const PROGRESS_EVERY: usize = 20;

/// Result of fetching one listing's detail page
#[derive(Debug, Clone)]
pub struct DetailOutcome {
    pub listing_id: String,
    pub url: String,
    pub result: Result<String, FetchError>,
}

/// A detail page that could not be fetched
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedFetch {
    pub url: String,
    pub error: String,
}

/// Tally of one pool run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PoolReport {
    pub successes: usize,
    pub failures: Vec<FailedFetch>,
}

impl PoolReport {
    pub fn from_outcomes(outcomes: &[DetailOutcome]) -> Self {
        let mut report = PoolReport::default();
        for outcome in outcomes {
            match &outcome.result {
                Ok(_) => report.successes += 1,
                Err(err) => report.failures.push(FailedFetch {
                    url: outcome.url.clone(),
                    error: err.to_string(),
                }),
            }
        }
        report
    }

    pub fn failure_count(&self) -> usize {
        self.failures.len()
    }
}

/// Fetches detail pages with a bounded number of requests in flight
pub struct DetailFetchPool<'a> {
    fetcher: &'a dyn PageFetcher,
    workers: usize,
    options: RenderOptions,
}

impl<'a> DetailFetchPool<'a> {
    pub fn new(fetcher: &'a dyn PageFetcher, workers: usize) -> Self {
        Self {
            fetcher,
            workers: workers.max(1),
            options: RenderOptions::browser_waiting_for("main"),
        }
    }

    /// Fetches every stub's detail page once.
    ///
    /// Outcomes arrive in completion order and carry the stub identity; a
    /// failure never stops the remaining fetches.
    pub async fn fetch_all(&self, stubs: &[PropertyListing]) -> Vec<DetailOutcome> {
        let total = stubs.len();
        info!(total, workers = self.workers, "Fetching detail pages");

        let mut pending = stream::iter(stubs)
            .map(|stub| async move {
                let result = self.fetcher.fetch(&stub.url, &self.options).await;
                DetailOutcome {
                    listing_id: stub.listing_id.clone(),
                    url: stub.url.clone(),
                    result,
                }
            })
            .buffer_unordered(self.workers);

        let mut outcomes = Vec::with_capacity(total);
        let mut failed = 0usize;
        while let Some(outcome) = pending.next().await {
            match &outcome.result {
                Ok(html) => debug!(url = %outcome.url, bytes = html.len(), "Fetched details"),
                Err(err) => {
                    failed += 1;
                    warn!(url = %outcome.url, error = %err, "Failed to fetch detail page");
                }
            }
            outcomes.push(outcome);

            let processed = outcomes.len();
            if processed % PROGRESS_EVERY == 0 || processed == total {
                info!(processed, total, failed, "Detail fetch progress");
            }
        }
        outcomes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scrapers::testing::MockFetcher;
    use std::collections::HashSet;
    use std::time::Duration;

    fn stubs(n: usize) -> Vec<PropertyListing> {
        (0..n)
            .map(|i| {
                PropertyListing::stub(
                    format!("https://huispedia.nl/delft/2611gv/markt/{i}"),
                    format!("delft-2611gv-markt-{i}"),
                )
            })
            .collect()
    }

    fn fetcher_for(stubs: &[PropertyListing]) -> MockFetcher {
        stubs.iter().fold(MockFetcher::new(), |fetcher, stub| {
            fetcher.with_page(stub.url.clone(), format!("<html>{}</html>", stub.listing_id))
        })
    }

    #[tokio::test]
    async fn never_exceeds_worker_count() {
        let stubs = stubs(12);
        let fetcher = fetcher_for(&stubs).with_delay(Duration::from_millis(20));
        let pool = DetailFetchPool::new(&fetcher, 3);

        let outcomes = pool.fetch_all(&stubs).await;

        assert_eq!(outcomes.len(), 12);
        assert!(fetcher.peak_in_flight() <= 3, "peak was {}", fetcher.peak_in_flight());
        assert_eq!(fetcher.peak_in_flight(), 3);
    }

    #[tokio::test]
    async fn outcomes_are_correlated_by_identity() {
        let stubs = stubs(8);
        let fetcher = fetcher_for(&stubs).with_delay(Duration::from_millis(5));
        let pool = DetailFetchPool::new(&fetcher, 4);

        let outcomes = pool.fetch_all(&stubs).await;

        let ids: HashSet<&str> = outcomes.iter().map(|o| o.listing_id.as_str()).collect();
        assert_eq!(ids.len(), 8);
        for outcome in &outcomes {
            let html = outcome.result.as_ref().unwrap();
            assert_eq!(html, &format!("<html>{}</html>", outcome.listing_id));
            assert!(outcome.url.ends_with(outcome.listing_id.rsplit('-').next().unwrap()));
        }
    }

    #[tokio::test]
    async fn outcomes_follow_completion_not_input_order() {
        let stubs = stubs(4);
        // Earlier stubs take longer, so they finish last
        let fetcher = stubs.iter().enumerate().fold(fetcher_for(&stubs), |fetcher, (i, stub)| {
            fetcher.with_page_delay(stub.url.clone(), Duration::from_millis(80 - 20 * i as u64))
        });
        let pool = DetailFetchPool::new(&fetcher, 4);

        let outcomes = pool.fetch_all(&stubs).await;

        let order: Vec<&str> = outcomes.iter().map(|o| o.listing_id.as_str()).collect();
        assert_eq!(
            order,
            vec![
                "delft-2611gv-markt-3",
                "delft-2611gv-markt-2",
                "delft-2611gv-markt-1",
                "delft-2611gv-markt-0",
            ]
        );
        for outcome in &outcomes {
            let html = outcome.result.as_ref().unwrap();
            assert_eq!(html, &format!("<html>{}</html>", outcome.listing_id));
            assert!(outcome.url.ends_with(outcome.listing_id.rsplit('-').next().unwrap()));
        }
    }

    #[tokio::test]
    async fn failures_are_isolated_and_reported() {
        let stubs = stubs(5);
        let broken = stubs[2].url.clone();
        let fetcher = fetcher_for(&stubs)
            .with_error(broken.clone(), FetchError::Transport("connection reset".into()));
        let pool = DetailFetchPool::new(&fetcher, 2);

        let outcomes = pool.fetch_all(&stubs).await;
        let report = PoolReport::from_outcomes(&outcomes);

        assert_eq!(outcomes.len(), 5);
        assert_eq!(report.successes, 4);
        assert_eq!(report.failure_count(), 1);
        assert_eq!(report.failures[0].url, broken);
        assert!(report.failures[0].error.contains("connection reset"));
        assert_eq!(fetcher.requested().len(), 5);
    }

    #[tokio::test]
    async fn each_stub_is_fetched_once() {
        let stubs = stubs(6);
        let fetcher = fetcher_for(&stubs);
        DetailFetchPool::new(&fetcher, 10).fetch_all(&stubs).await;

        let mut requested = fetcher.requested();
        requested.sort();
        let mut expected: Vec<String> = stubs.iter().map(|s| s.url.clone()).collect();
        expected.sort();
        assert_eq!(requested, expected);
    }
}
