//! HDHub4u scraper implementation
//!
//! Listing entries are `li` items in the `ul.recent-movies` grid with the
//! title in a `figcaption` and the link on the poster `figure`. Download
//! links sit directly in `h3`/`h4` headings on the detail page. Reachable
//! with plain browser headers, no challenge gate.

use anyhow::Result;
use async_trait::async_trait;
use scraper::{Html, Selector};
use std::time::Duration;
use tracing::info;

use crate::fetch::PageSource;
use crate::models::{DownloadEntry, ListingEntry, ListingMode, ListingPage, SiteKey};
use crate::scrapers::{absolutize, accept_link, element_text, encode_query, is_boilerplate_title};
use crate::traits::{ScraperConfig, SiteScraper};

pub struct Hdhub4uScraper {
    config: ScraperConfig,
}

impl Hdhub4uScraper {
    pub fn new() -> Self {
        let config = ScraperConfig {
            key: SiteKey::Hdhub4u,
            uses_challenge_bypass: false,
            latest_pagination: true,
            // Labels are often episode or host names; an allowlist would
            // wrongly drop them, so exclusion-only here.
            require_inclusion_keywords: false,
            page_delay: Duration::from_secs(1),
        };

        Self { config }
    }

    fn heading_links(&self, document: &Html) -> Vec<DownloadEntry> {
        let link_selector = Selector::parse("h3 a[href], h4 a[href]").unwrap();
        let em_selector = Selector::parse("em").unwrap();

        let mut entries = Vec::new();
        for link in document.select(&link_selector) {
            let Some(href) = link.value().attr("href") else {
                continue;
            };
            // The quality string is usually italicised inside the anchor.
            let label = link
                .select(&em_selector)
                .next()
                .map(element_text)
                .filter(|text| !text.is_empty())
                .unwrap_or_else(|| element_text(link));

            if accept_link(&self.config, &label, href) {
                entries.push(DownloadEntry {
                    label,
                    url: href.to_string(),
                });
            }
        }
        entries
    }

    fn anchor_links(&self, document: &Html, selector: &str) -> Vec<DownloadEntry> {
        let link_selector = Selector::parse(selector).unwrap();

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

    fn parse_download_page(&self, html: &str) -> Vec<DownloadEntry> {
        let document = Html::parse_document(html);

        // Newer pages link hosts from headings; older ones scatter anchors
        // through the content body. First strategy with a hit wins.
        let entries = self.heading_links(&document);
        if !entries.is_empty() {
            return entries;
        }
        let entries =
            self.anchor_links(&document, "div.entry-content a[href], div.download-links a[href]");
        if !entries.is_empty() {
            return entries;
        }
        self.anchor_links(&document, "p a[href]")
    }
}

#[async_trait]
impl SiteScraper for Hdhub4uScraper {
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

        let item_selector = Selector::parse("ul.recent-movies li").unwrap();
        let title_selector = Selector::parse("figcaption p").unwrap();
        let title_fallback_selector = Selector::parse("figcaption a").unwrap();
        let link_selector = Selector::parse("figure a[href]").unwrap();
        let pagination_selector = Selector::parse("div.pagination-wrap").unwrap();
        let next_selector = Selector::parse("a.next.page-numbers").unwrap();

        let mut entries = Vec::new();
        for item in document.select(&item_selector) {
            let title = item
                .select(&title_selector)
                .next()
                .or_else(|| item.select(&title_fallback_selector).next())
                .map(element_text)
                .unwrap_or_default();

            if let Some(link) = item.select(&link_selector).next()
                && let Some(href) = link.value().attr("href")
            {
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
            .is_some_and(|pagination| pagination.select(&next_selector).next().is_some());

        ListingPage { entries, has_next }
    }

    async fn download_entries(
        &self,
        source: &dyn PageSource,
        detail_url: &str,
    ) -> Result<Vec<DownloadEntry>> {
        let html = source
            .get(detail_url, self.config.uses_challenge_bypass)
            .await?;

        let entries = self.parse_download_page(&html);
        info!(count = entries.len(), url = detail_url, "hdhub4u download links extracted");
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "https://hdhub4u.example";

    fn search_mode() -> ListingMode {
        ListingMode::Search("test".to_string())
    }

    #[test]
    fn search_query_uses_plus_separator() {
        let scraper = Hdhub4uScraper::new();
        let mode = ListingMode::Search("Dune Part Two".to_string());
        assert_eq!(
            scraper.listing_url(BASE, &mode, 1),
            "https://hdhub4u.example/?s=dune+part+two"
        );
        assert_eq!(
            scraper.listing_url(BASE, &mode, 2),
            "https://hdhub4u.example/page/2/?s=dune+part+two"
        );
    }

    #[test]
    fn listing_reads_figcaption_and_figure_link() {
        let html = r#"
            <html><body>
              <ul class="recent-movies">
                <li>
                  <figure><a href="https://hdhub4u.example/movie-a/"><img src="a.jpg"></a></figure>
                  <figcaption><p>Movie A (2024) Hindi 1080p</p></figcaption>
                </li>
                <li>
                  <figure><a href="/movie-b/"><img src="b.jpg"></a></figure>
                  <figcaption><p>Movie B (2023)</p></figcaption>
                </li>
              </ul>
              <div class="pagination-wrap">
                <a class="next page-numbers" href="/page/2/">Next</a>
              </div>
            </body></html>
        "#;
        let page = Hdhub4uScraper::new().parse_listing(html, &search_mode(), BASE);
        assert_eq!(page.entries.len(), 2);
        assert_eq!(page.entries[0].title, "Movie A (2024) Hindi 1080p");
        assert_eq!(page.entries[1].url, "https://hdhub4u.example/movie-b/");
        assert!(page.has_next);
    }

    #[test]
    fn next_control_outside_pagination_wrap_does_not_count() {
        let html = r#"
            <html><body>
              <ul class="recent-movies">
                <li>
                  <figure><a href="/movie/"><img></a></figure>
                  <figcaption><p>Movie</p></figcaption>
                </li>
              </ul>
              <a class="next page-numbers" href="/page/2/">stray</a>
            </body></html>
        "#;
        let page = Hdhub4uScraper::new().parse_listing(html, &search_mode(), BASE);
        assert_eq!(page.entries.len(), 1);
        assert!(!page.has_next);
    }

    #[test]
    fn boilerplate_caption_is_skipped() {
        let html = r#"
            <html><body><ul class="recent-movies">
              <li>
                <figure><a href="/real/"><img></a></figure>
                <figcaption><p>Real Movie</p></figcaption>
              </li>
              <li>
                <figure><a href="/footer/"><img></a></figure>
                <figcaption><p>© All Rights Reserved</p></figcaption>
              </li>
            </ul></body></html>
        "#;
        let page = Hdhub4uScraper::new().parse_listing(html, &search_mode(), BASE);
        assert_eq!(page.entries.len(), 1);
        assert_eq!(page.entries[0].title, "Real Movie");
    }

    #[test]
    fn download_labels_prefer_em_text() {
        let html = r#"
            <html><body>
              <h3><a href="https://gdflix.example/a"><em>1080p WEB-DL [2.1GB]</em></a></h3>
              <h4><a href="https://filepress.example/b">720p HEVC</a></h4>
              <h3><a href="https://telegram.me/chan"><em>Join Telegram</em></a></h3>
            </body></html>
        "#;
        let entries = Hdhub4uScraper::new().parse_download_page(html);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].label, "1080p WEB-DL [2.1GB]");
        assert_eq!(entries[1].label, "720p HEVC");
    }

    #[test]
    fn falls_back_to_content_links_when_headings_empty() {
        let html = r#"
            <html><body>
              <div class="entry-content">
                <a href="https://files.example/x">Episode 1 480p</a>
              </div>
            </body></html>
        "#;
        let entries = Hdhub4uScraper::new().parse_download_page(html);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].label, "Episode 1 480p");
    }
}
