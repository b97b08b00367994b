use crate::config::ScrapeConfig;
use crate::error::{FetchError, ScrapeError};
use crate::models::PropertyListing;
use crate::scrapers::detail::parse_detail_page;
use crate::scrapers::fetcher::ScrapingAntFetcher;
use crate::scrapers::pool::{DetailFetchPool, PoolReport};
use crate::scrapers::search::SearchWalker;
use crate::scrapers::traits::PageFetcher;
use crate::scrapers::types::SearchParams;
use anyhow::Result;
use std::collections::HashMap;
use tracing::info;

/// Listings of one run plus the detail stage tally, if that stage ran
#[derive(Debug)]
pub struct ScrapeOutcome {
    pub listings: Vec<PropertyListing>,
    pub details: Option<PoolReport>,
}

/// Huispedia scraper: search walk, detail fetch and merge
pub struct HuispediaScraper<F = ScrapingAntFetcher> {
    fetcher: F,
    config: ScrapeConfig,
}

impl HuispediaScraper<ScrapingAntFetcher> {
    /// Create a scraper that fetches through ScrapingAnt
    pub fn new(config: ScrapeConfig) -> Result<Self> {
        let fetcher = ScrapingAntFetcher::new(&config)?;
        Ok(Self::with_fetcher(fetcher, config))
    }
}

impl<F: PageFetcher> HuispediaScraper<F> {
    pub fn with_fetcher(fetcher: F, config: ScrapeConfig) -> Self {
        Self { fetcher, config }
    }

    /// Runs one scrape.
    ///
    /// Listings keep the order in which the search pages produced them. A
    /// listing whose detail page failed stays in the result with only its
    /// search card fields.
    pub async fn scrape(&self, params: &SearchParams) -> Result<ScrapeOutcome, ScrapeError> {
        info!(
            location = %params.location,
            property_type = %params.property_type,
            "Starting scrape"
        );

        let mut listings = SearchWalker::new(&self.fetcher, &self.config, params)
            .collect()
            .await?;

        if !params.fetch_details || listings.is_empty() {
            return Ok(ScrapeOutcome {
                listings,
                details: None,
            });
        }

        let outcomes = DetailFetchPool::new(&self.fetcher, self.config.max_workers)
            .fetch_all(&listings)
            .await;
        let report = PoolReport::from_outcomes(&outcomes);

        let mut documents: HashMap<String, Result<String, FetchError>> = outcomes
            .into_iter()
            .map(|outcome| (outcome.listing_id, outcome.result))
            .collect();
        for listing in &mut listings {
            if let Some(Ok(html)) = documents.remove(&listing.listing_id) {
                parse_detail_page(&html, &self.config.base_url, listing);
            }
        }

        info!(
            successes = report.successes,
            failures = report.failure_count(),
            "Detail stage complete"
        );
        Ok(ScrapeOutcome {
            listings,
            details: Some(report),
        })
    }
}
