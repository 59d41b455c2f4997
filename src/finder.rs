//! Multi-site orchestration: fan out one pagination run per site, merge
//! whatever finished, and extract download links for a selected title.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinSet;
use tokio::time::timeout;
use tracing::{error, info, warn};

use crate::fetch::PageSource;
use crate::models::{DownloadEntry, ListingEntry, ListingMode, SearchHit, SiteKey, SiteTarget};
use crate::normalize::dedupe_downloads;
use crate::pagination::collect_listing;
use crate::retry::RetryPolicy;
use crate::scrapers::scraper_for;

/// A site that hasn't produced its pages by now is blocked or down; the
/// other sites' results shouldn't wait on it.
pub const SITE_TASK_TIMEOUT: Duration = Duration::from_secs(20);

/// Cap on download entries shown for one title.
pub const MAX_DOWNLOAD_LINKS: usize = 10;

/// Stateless orchestrator over the scraping core. Base URLs are injected per
/// call, so a domain repoint takes effect on the next request, and nothing
/// here is shared mutable state across user sessions.
#[derive(Clone)]
pub struct MovieFinder {
    source: Arc<dyn PageSource>,
}

impl MovieFinder {
    pub fn new(source: Arc<dyn PageSource>) -> Self {
        Self { source }
    }

    /// Search every target site for a title, concurrently.
    pub async fn search(&self, targets: &[SiteTarget], query: &str) -> Vec<SearchHit> {
        self.run_listing(targets, ListingMode::Search(query.trim().to_string()))
            .await
    }

    /// Collect the latest/browse listings of every target site, concurrently.
    pub async fn latest(&self, targets: &[SiteTarget]) -> Vec<SearchHit> {
        self.run_listing(targets, ListingMode::Latest).await
    }

    async fn run_listing(&self, targets: &[SiteTarget], mode: ListingMode) -> Vec<SearchHit> {
        let mut tasks = JoinSet::new();
        for target in targets {
            let source = Arc::clone(&self.source);
            let target = target.clone();
            let mode = mode.clone();
            tasks.spawn(async move {
                let scraper = scraper_for(target.key);
                let run = collect_listing(scraper.as_ref(), source.as_ref(), &target.base_url, &mode);
                let entries = match timeout(SITE_TASK_TIMEOUT, run).await {
                    Ok(entries) => entries,
                    Err(_) => {
                        warn!(site = %target.key, "site task timed out, contributing no results");
                        Vec::new()
                    }
                };
                (target.key, entries)
            });
        }

        let mut by_site: HashMap<SiteKey, Vec<ListingEntry>> = HashMap::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((key, entries)) => {
                    by_site.insert(key, entries);
                }
                Err(error) => warn!(%error, "site task failed"),
            }
        }

        // Merge in the caller-supplied site order so numbering is stable
        // regardless of which task finished first.
        let mut hits = Vec::new();
        for target in targets {
            if let Some(entries) = by_site.remove(&target.key) {
                hits.extend(entries.into_iter().map(|entry| SearchHit {
                    site: target.key,
                    entry,
                }));
            }
        }
        info!(sites = targets.len(), total = hits.len(), "listing fan-out merged");
        hits
    }

    /// Extract, dedupe, and cap the download links for one selected title,
    /// rendered as `"label: url"` lines. Persistent failure is an empty
    /// list, never an error.
    pub async fn downloads(&self, site: SiteKey, detail_url: &str) -> Vec<String> {
        let scraper = scraper_for(site);
        let extracted = RetryPolicy::downloads()
            .run(|| scraper.download_entries(self.source.as_ref(), detail_url))
            .await;

        let entries = match extracted {
            Ok(entries) => entries,
            Err(error) => {
                error!(site = %site, url = detail_url, %error, "download extraction failed after retries");
                Vec::new()
            }
        };

        let mut deduped = dedupe_downloads(entries);
        deduped.truncate(MAX_DOWNLOAD_LINKS);
        deduped.iter().map(DownloadEntry::render).collect()
    }
}
