//! Traits and interfaces for site-agnostic listing and download scraping

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;

use crate::fetch::PageSource;
use crate::models::{DownloadEntry, ListingMode, ListingPage, SiteKey};

/// Configuration for a site scraper.
///
/// Besides identity this carries the per-site behavior knobs that observed
/// site revisions disagree on, so policy lives in data rather than in
/// conditionals scattered through the adapters.
#[derive(Debug, Clone)]
pub struct ScraperConfig {
    /// Which site this adapter handles.
    pub key: SiteKey,
    /// Whether fetches must go through the anti-bot challenge solver.
    pub uses_challenge_bypass: bool,
    /// Whether the latest/browse listing paginates; a single-page latest
    /// listing stops the driver after page 1 regardless of markup.
    pub latest_pagination: bool,
    /// Whether download candidates must also match the inclusion keyword
    /// allowlist, on top of the always-applied exclusion denylist.
    pub require_inclusion_keywords: bool,
    /// Politeness delay between successive listing pages.
    pub page_delay: Duration,
}

/// Trait for site-specific scrapers.
///
/// Listing extraction is split into URL construction and a pure parse so the
/// pagination driver owns all fetching; download extraction fetches through
/// the injected [`PageSource`] because one site needs a second hop.
#[async_trait]
pub trait SiteScraper: Send + Sync {
    /// Get the configuration for this scraper
    fn config(&self) -> &ScraperConfig;

    /// Build the URL for one listing page. Page 1 must be the bare URL; the
    /// sites treat `/page/1/` inconsistently.
    fn listing_url(&self, base_url: &str, mode: &ListingMode, page: u32) -> String;

    /// Extract listing entries and the next-page affordance from a fetched
    /// listing document. `base_url` is used to absolutize relative hrefs.
    fn parse_listing(&self, html: &str, mode: &ListingMode, base_url: &str) -> ListingPage;

    /// Extract filtered download entries for one selected title.
    ///
    /// # Returns
    /// * Entries in document order; the caller deduplicates and caps.
    async fn download_entries(
        &self,
        source: &dyn PageSource,
        detail_url: &str,
    ) -> Result<Vec<DownloadEntry>>;
}
