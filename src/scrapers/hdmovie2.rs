//! Hdmovie2 scraper implementation
//!
//! Dooplay-style markup: search results are `div.result-item` blocks. The
//! detail page carries no links itself, only an indirection anchor to a
//! dedicated download-aggregator page that must be fetched as a second hop.
//! Sits behind a JavaScript challenge gate, so fetches use the solver.

use anyhow::Result;
use async_trait::async_trait;
use scraper::{Html, Selector};
use std::time::Duration;
use tracing::info;

use crate::fetch::PageSource;
use crate::models::{DownloadEntry, ListingEntry, ListingMode, ListingPage, SiteKey};
use crate::scrapers::{absolutize, accept_link, element_text, encode_query, is_boilerplate_title};
use crate::traits::{ScraperConfig, SiteScraper};

/// Host of the download-aggregator pages the detail page points at.
const DOWNLOAD_HUB_MARKER: &str = "dwo.hair";

pub struct Hdmovie2Scraper {
    config: ScraperConfig,
}

impl Hdmovie2Scraper {
    pub fn new() -> Self {
        let config = ScraperConfig {
            key: SiteKey::Hdmovie2,
            uses_challenge_bypass: true,
            // The front page is a curated single page; /page/N/ serves the
            // same items again.
            latest_pagination: false,
            // The aggregator page is already download-only; exclusion
            // keywords are enough.
            require_inclusion_keywords: false,
            page_delay: Duration::from_secs(3),
        };

        Self { config }
    }

    /// Pull the aggregator-page URL out of a detail document, if present.
    fn indirection_url(&self, html: &str) -> Option<String> {
        let document = Html::parse_document(html);
        let selector =
            Selector::parse(&format!(r#"div.wp-content p a[href*="{DOWNLOAD_HUB_MARKER}"]"#))
                .unwrap();
        document
            .select(&selector)
            .next()
            .and_then(|link| link.value().attr("href"))
            .map(str::to_string)
    }

    fn parse_download_page(&self, html: &str) -> Vec<DownloadEntry> {
        let document = Html::parse_document(html);
        let link_selector = Selector::parse("div.download-links-section p a[href]").unwrap();

        let mut entries = Vec::new();
        for link in document.select(&link_selector) {
            let Some(href) = link.value().attr("href") else {
                continue;
            };
            let label = element_text(link);
            if accept_link(&self.config, &label, href) {
                entries.push(DownloadEntry {
                    label,
                    url: href.to_string(),
                });
            }
        }
        entries
    }
}

#[async_trait]
impl SiteScraper for Hdmovie2Scraper {
    fn config(&self) -> &ScraperConfig {
        &self.config
    }

    fn listing_url(&self, base_url: &str, mode: &ListingMode, page: u32) -> String {
        let base = base_url.trim_end_matches('/');
        match mode {
            ListingMode::Search(query) => {
                let query = encode_query(query, '+');
                if page <= 1 {
                    format!("{base}/?s={query}")
                } else {
                    format!("{base}/page/{page}/?s={query}")
                }
            }
            ListingMode::Latest => {
                if page <= 1 {
                    format!("{base}/")
                } else {
                    format!("{base}/page/{page}/")
                }
            }
        }
    }

    fn parse_listing(&self, html: &str, _mode: &ListingMode, base_url: &str) -> ListingPage {
        let document = Html::parse_document(html);

        let item_selector = Selector::parse("div.result-item").unwrap();
        let title_selector = Selector::parse("div.details div.title a").unwrap();
        let pagination_selector = Selector::parse("div.pagination").unwrap();
        // Dooplay marks the presence of further pages with an "inactive"
        // anchor; no inactive anchor means this is the last page.
        let more_selector = Selector::parse("a.inactive").unwrap();

        let mut entries = Vec::new();
        for item in document.select(&item_selector) {
            if let Some(title_link) = item.select(&title_selector).next()
                && let Some(href) = title_link.value().attr("href")
            {
                let title = element_text(title_link);
                if title.is_empty() || is_boilerplate_title(&title) {
                    continue;
                }
                entries.push(ListingEntry {
                    title,
                    url: absolutize(base_url, href),
                });
            }
        }

        let has_next = document
            .select(&pagination_selector)
            .next()
            .is_some_and(|pagination| pagination.select(&more_selector).next().is_some());

        ListingPage { entries, has_next }
    }

    async fn download_entries(
        &self,
        source: &dyn PageSource,
        detail_url: &str,
    ) -> Result<Vec<DownloadEntry>> {
        let bypass = self.config.uses_challenge_bypass;
        let detail_html = source.get(detail_url, bypass).await?;

        let Some(hub_url) = self.indirection_url(&detail_html) else {
            info!(url = detail_url, "no download page link found on hdmovie2 detail page");
            return Ok(Vec::new());
        };

        let hub_html = source.get(&hub_url, bypass).await?;
        let entries = self.parse_download_page(&hub_html);
        info!(count = entries.len(), url = detail_url, "hdmovie2 download links extracted");
        Ok(entries)
    }
}
