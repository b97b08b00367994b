mod config;
mod error;
mod models;
mod output;
mod scrapers;

use anyhow::Context;
use clap::Parser;
use config::{ScrapeConfig, DEFAULT_MAX_WORKERS};
use scrapers::{HuispediaScraper, PoolReport, PropertyType, SearchParams};
use std::path::PathBuf;
use std::str::FromStr;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Scrape property listings from Huispedia.nl into a CSV file
#[derive(Parser, Debug)]
#[command(name = "huispedia-scraper", version)]
#[command(about = "Scrape property listings from Huispedia.nl", long_about = None)]
struct Args {
    /// City or region to search (e.g. amsterdam, den-haag)
    #[arg(short, long, default_value = "amsterdam")]
    location: String,

    /// Property type: all, apartment or house
    #[arg(short, long, default_value = "all", value_parser = PropertyType::from_str)]
    property: PropertyType,

    /// Output file; a .json extension writes JSON instead of CSV
    #[arg(short, long, default_value = "properties.csv")]
    output: PathBuf,

    /// Maximum number of listings to collect
    #[arg(long)]
    limit: Option<usize>,

    /// Maximum number of search result pages to walk
    #[arg(long)]
    max_pages: Option<u32>,

    /// Number of detail pages fetched concurrently
    #[arg(short = 'w', long, default_value_t = DEFAULT_MAX_WORKERS)]
    max_workers: usize,

    /// Only collect search results, skip detail pages
    #[arg(long)]
    no_details: bool,

    /// ScrapingAnt API key (defaults to SCRAPINGANT_API_KEY)
    #[arg(short = 'k', long)]
    api_key: Option<String>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("huispedia_scraper={default_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn print_summary(listing_count: usize, output: &std::path::Path, details: Option<&PoolReport>) {
    println!();
    println!("Scraped {listing_count} properties -> {}", output.display());
    match details {
        Some(report) => {
            println!(
                "Detail pages: {} succeeded, {} failed",
                report.successes,
                report.failure_count()
            );
            for failure in &report.failures {
                println!("   FAILED {} ({})", failure.url, failure.error);
            }
        }
        None => println!("Detail pages: skipped"),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    info!("🏠 Huispedia scraper");

    let config = ScrapeConfig::from_env(args.api_key.clone())?.with_max_workers(args.max_workers)?;
    let params = SearchParams {
        location: args.location.clone(),
        property_type: args.property,
        max_pages: args.max_pages,
        limit: args.limit,
        fetch_details: !args.no_details,
    };

    let scraper = HuispediaScraper::new(config)?;
    let outcome = scraper
        .scrape(&params)
        .await
        .context("Scrape aborted")?;

    output::write_listings(&args.output, &outcome.listings).await?;

    if let Some(report) = &outcome.details {
        info!(
            successes = report.successes,
            failures = report.failure_count(),
            "Detail fetch summary"
        );
        if !report.failures.is_empty() {
            warn!(
                failed = report.failure_count(),
                "Some detail pages could not be fetched; those rows only carry search card data"
            );
        }
    }
    print_summary(outcome.listings.len(), &args.output, outcome.details.as_ref());

    Ok(())
}
