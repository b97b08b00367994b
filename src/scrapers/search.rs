use crate::config::ScrapeConfig;
use crate::error::ScrapeError;
use crate::models::PropertyListing;
use crate::scrapers::extract::{
    element_text, normalize_postal_code, parse_area, parse_number, parse_price, parse_price_type,
    parse_rooms, parse_value_comparison, text, POSTAL_CODE,
};
use crate::scrapers::traits::PageFetcher;
use crate::scrapers::types::{RenderOptions, SearchParams};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use std::sync::LazyLock;
use tracing::{debug, info};

static ARTICLE: LazyLock<Selector> = LazyLock::new(|| Selector::parse("article").unwrap());
static LINK: LazyLock<Selector> = LazyLock::new(|| Selector::parse("a[href]").unwrap());
static HEADING: LazyLock<Selector> = LazyLock::new(|| Selector::parse("h2").unwrap());
static H1: LazyLock<Selector> = LazyLock::new(|| Selector::parse("h1").unwrap());
static NAV: LazyLock<Selector> = LazyLock::new(|| Selector::parse("nav").unwrap());

static LISTING_HREF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^/[a-z\-]+/\d+[a-z]+/").unwrap());
static PAGINATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Resultaten?\s*(\d+)\s*-\s*(\d+)\s*van\s*([\d.]+)").unwrap());
static TOTAL_COUNT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([\d.]+)\s*Koopwoningen").unwrap());

/// Position reported by the "Resultaten 1-10 van 58.480" banner
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub start: u32,
    pub end: u32,
    pub total: u32,
}

impl Pagination {
    pub fn is_last_page(&self) -> bool {
        self.total > 0 && self.end >= self.total
    }
}

/// Builds the search URL for a 1-based `page`
pub fn build_list_url(base_url: &str, location: &str, slug: Option<&str>, page: u32) -> String {
    let mut url = format!("{}/koopwoningen/{}", base_url.trim_end_matches('/'), location);
    if let Some(slug) = slug {
        url.push('/');
        url.push_str(slug);
    }
    if page > 1 {
        url.push_str(&format!("/{page}_p"));
    }
    url
}

/// Listing id derived from the detail path: "/delft/2611gv/markt/12" -> "delft-2611gv-markt-12"
pub fn extract_listing_id(href: &str, base_url: &str) -> String {
    let path = href.strip_prefix(base_url).unwrap_or(href);
    let parts: Vec<&str> = path.split('/').filter(|p| !p.is_empty()).collect();
    if parts.len() >= 4 {
        parts[..4].join("-")
    } else {
        parts.join("-")
    }
}

fn card_text_nodes(card: ElementRef<'_>) -> Vec<String> {
    card.text().filter_map(text).collect()
}

fn parse_card(card: ElementRef<'_>, base_url: &str) -> Option<PropertyListing> {
    let nodes = card_text_nodes(card);
    if nodes.iter().any(|node| node.to_lowercase().contains("advertentie")) {
        return None;
    }

    let href = card
        .select(&LINK)
        .filter_map(|link| link.value().attr("href"))
        .find(|href| LISTING_HREF.is_match(href))?;

    let url = format!("{}{}", base_url.trim_end_matches('/'), href);
    let mut listing = PropertyListing::stub(url, extract_listing_id(href, base_url));

    listing.street_address = card.select(&HEADING).next().map(element_text).and_then(|t| text(&t));

    // "2611 GV Delft"
    if let Some(location) = nodes.iter().find(|node| POSTAL_CODE.is_match(node)) {
        listing.postal_code = normalize_postal_code(location);
        listing.city = POSTAL_CODE
            .find(location)
            .and_then(|m| text(&location[m.end()..]));
    }

    if let Some(price) = nodes.iter().find(|node| parse_price(node).is_some()) {
        listing.price = parse_price(price);
        listing.price_type = parse_price_type(price);
    }

    let mut areas = nodes.iter().filter_map(|node| parse_area(node));
    listing.living_area = areas.next();
    listing.plot_size = areas.next();

    listing.rooms = nodes.iter().find_map(|node| parse_rooms(node));
    listing.value_comparison = nodes.iter().find_map(|node| parse_value_comparison(node));

    Some(listing)
}

/// Listing stubs found on one search results page, in page order
pub fn parse_property_cards(document: &Html, base_url: &str) -> Vec<PropertyListing> {
    document
        .select(&ARTICLE)
        .filter_map(|card| parse_card(card, base_url))
        .collect()
}

pub fn get_pagination_info(document: &Html) -> Option<Pagination> {
    document.select(&NAV).find_map(|nav| {
        let banner = element_text(nav);
        let caps = PAGINATION.captures(&banner)?;
        Some(Pagination {
            start: caps[1].parse().ok()?,
            end: caps[2].parse().ok()?,
            total: parse_number(&caps[3])?,
        })
    })
}

/// Total number of listings announced in the page heading
pub fn get_total_count(document: &Html) -> Option<u32> {
    let heading = element_text(document.select(&H1).next()?);
    let caps = TOTAL_COUNT.captures(&heading)?;
    parse_number(&caps[1])
}

/// Walks the paginated search results for one query
pub struct SearchWalker<'a> {
    fetcher: &'a dyn PageFetcher,
    config: &'a ScrapeConfig,
    params: &'a SearchParams,
    location: String,
}

impl<'a> SearchWalker<'a> {
    pub fn new(fetcher: &'a dyn PageFetcher, config: &'a ScrapeConfig, params: &'a SearchParams) -> Self {
        Self {
            fetcher,
            config,
            params,
            location: params.location_slug(),
        }
    }

    /// Starts a fresh walk from page 1
    pub fn walk(&self) -> SearchWalk<'_, 'a> {
        SearchWalk {
            walker: self,
            next_page: 1,
            collected: 0,
            seen: HashSet::new(),
            finished: false,
        }
    }

    /// Runs a complete walk and returns every stub in discovery order
    pub async fn collect(&self) -> Result<Vec<PropertyListing>, ScrapeError> {
        let mut walk = self.walk();
        let mut stubs = Vec::new();
        while let Some(page) = walk.next_page().await? {
            stubs.extend(page);
        }
        info!(count = stubs.len(), "Total properties found");
        Ok(stubs)
    }

    fn page_url(&self, page: u32) -> String {
        build_list_url(
            &self.config.base_url,
            &self.location,
            self.params.property_type.slug(),
            page,
        )
    }
}

/// State of one walk; yields one page of stubs at a time
pub struct SearchWalk<'w, 'a> {
    walker: &'w SearchWalker<'a>,
    next_page: u32,
    collected: usize,
    seen: HashSet<String>,
    finished: bool,
}

impl SearchWalk<'_, '_> {
    /// Fetches the next results page.
    ///
    /// Returns `Ok(None)` once the results are exhausted or a configured
    /// bound is hit. A failed page fetch ends the walk with an error.
    pub async fn next_page(&mut self) -> Result<Option<Vec<PropertyListing>>, ScrapeError> {
        if self.finished {
            return Ok(None);
        }
        let params = self.walker.params;
        let page = self.next_page;

        if params.max_pages.is_some_and(|max| page > max) {
            info!(max_pages = params.max_pages, "Reached max pages limit");
            return Ok(self.finish());
        }
        if params.limit.is_some_and(|limit| self.collected >= limit) {
            info!(limit = params.limit, "Reached property limit");
            return Ok(self.finish());
        }

        if page > 1 && !self.walker.config.page_delay.is_zero() {
            tokio::time::sleep(self.walker.config.page_delay).await;
        }

        let url = self.walker.page_url(page);
        info!(page, %url, "Fetching search page");
        let html = self
            .walker
            .fetcher
            .fetch(&url, &RenderOptions::browser_waiting_for("article"))
            .await;
        self.next_page += 1;
        let html = match html {
            Ok(html) => html,
            Err(source) => {
                self.finished = true;
                return Err(ScrapeError::PageFetch { page, url, source });
            }
        };

        let document = Html::parse_document(&html);
        let base_url = &self.walker.config.base_url;
        let mut stubs: Vec<PropertyListing> = parse_property_cards(&document, base_url)
            .into_iter()
            .filter(|stub| self.seen.insert(stub.listing_id.clone()))
            .collect();

        if stubs.is_empty() {
            info!(page, "No properties found on page, stopping");
            return Ok(self.finish());
        }

        if page == 1 {
            if let Some(total) = get_total_count(&document) {
                info!(total, "Listings available for this search");
            }
        }

        if let Some(limit) = params.limit {
            stubs.truncate(limit - self.collected);
        }
        self.collected += stubs.len();
        info!(page, count = stubs.len(), "Found properties on page");

        if let Some(pagination) = get_pagination_info(&document) {
            debug!(
                start = pagination.start,
                end = pagination.end,
                total = pagination.total,
                "Pagination"
            );
            if pagination.is_last_page() {
                info!("Reached last page");
                self.finished = true;
            }
        }

        Ok(Some(stubs))
    }

    fn finish(&mut self) -> Option<Vec<PropertyListing>> {
        self.finished = true;
        None
    }
}
