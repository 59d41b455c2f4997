//! Pagination driver: walks a site's listing pages sequentially and
//! aggregates the extracted entries.
//!
//! Stop conditions, in order of checking: fetch failure (earlier pages are
//! kept — a mid-run block should not erase results already gathered), a page
//! with zero listing elements (end-of-results and anti-bot blocks look the
//! same and are treated the same), a missing next-page control, and the page
//! ceiling.

use tracing::{debug, info, warn};

use crate::fetch::PageSource;
use crate::models::{ListingEntry, ListingMode};
use crate::traits::SiteScraper;

pub const MAX_PAGES: u32 = 10;

pub async fn collect_listing(
    scraper: &dyn SiteScraper,
    source: &dyn PageSource,
    base_url: &str,
    mode: &ListingMode,
) -> Vec<ListingEntry> {
    let config = scraper.config();
    let ceiling = match mode {
        ListingMode::Latest if !config.latest_pagination => 1,
        _ => MAX_PAGES,
    };

    let mut entries: Vec<ListingEntry> = Vec::new();
    let mut page: u32 = 1;

    loop {
        let url = scraper.listing_url(base_url, mode, page);
        debug!(site = %config.key, page, url, "fetching listing page");

        let html = match source.get(&url, config.uses_challenge_bypass).await {
            Ok(html) => html,
            Err(error) => {
                warn!(site = %config.key, page, %error, "listing fetch failed, keeping partial results");
                break;
            }
        };

        let listing = scraper.parse_listing(&html, mode, base_url);
        if listing.entries.is_empty() {
            info!(site = %config.key, page, "no listing elements found, stopping");
            break;
        }
        entries.extend(listing.entries);

        if !listing.has_next || page >= ceiling {
            break;
        }

        page += 1;
        tokio::time::sleep(config.page_delay).await;
    }

    info!(site = %config.key, pages = page, total = entries.len(), "listing collected");
    entries
}
