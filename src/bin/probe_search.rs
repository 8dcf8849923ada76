//! Probe: search endpoint, page 1
//!
//! Fetches the first result page of the configured search and documents:
//! - Paging metadata (page count, hits, page size)
//! - The normalized shape of the first listing
//! - How many listings survive the configured filters

use std::path::Path;

use anyhow::Result;

use immowatch::api::ImmoScoutSource;
use immowatch::config::{AppConfig, CONFIG_PATH};
use immowatch::engine;

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::load(Path::new(CONFIG_PATH))?;
    let client = reqwest::Client::new();
    let source = ImmoScoutSource::new(client, config.search.url.clone());

    println!("=== Probe: search page 1 ===");
    println!("URL: {}", config.search.url);
    println!();

    let page = source.fetch_page(1).await?;
    println!("pageNumber: {}", page.paging.page_number);
    println!("pageSize: {}", page.paging.page_size);
    println!("numberOfPages: {}", page.paging.number_of_pages);
    println!("numberOfHits: {}", page.paging.number_of_hits);
    println!("numberOfListings: {}", page.paging.number_of_listings);
    println!("listings on this page: {}", page.listings.len());
    println!();

    if let Some(first) = page.listings.first() {
        println!("Sample listing (first, normalized):");
        println!("{}", serde_json::to_string_pretty(first)?);
        println!();
    }

    let rules = config.search.rules();
    let ordered = engine::select_and_order(page.listings, &rules);
    println!("After filters: {} listing(s)", ordered.len());
    for listing in ordered.iter().take(5) {
        println!(
            "  {} {} — {} ({})",
            listing.warm_rent.value, listing.warm_rent.currency, listing.title, listing.link
        );
    }

    println!();
    println!("=== Probe complete ===");
    Ok(())
}
