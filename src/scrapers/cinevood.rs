//! CineVood scraper implementation
//!
//! WordPress/MagOne markup: listing entries are `article.latestPost.excerpt`
//! cards, the browse feed lives inside `div#content_box`, and download
//! sections are `div.download-btns` blocks headed by an `h6` quality line.
//! Sits behind a JavaScript challenge gate, so fetches use the solver.

use anyhow::Result;
use async_trait::async_trait;
use scraper::{Html, Selector};
use std::time::Duration;
use tracing::info;

use crate::fetch::PageSource;
use crate::models::{DownloadEntry, ListingEntry, ListingMode, ListingPage, SiteKey};
use crate::scrapers::{
    absolutize, accept_link, element_text, encode_query, is_boilerplate_title, preceding_heading,
};
use crate::traits::{ScraperConfig, SiteScraper};

pub struct CinevoodScraper {
    config: ScraperConfig,
}

impl CinevoodScraper {
    pub fn new() -> Self {
        let config = ScraperConfig {
            key: SiteKey::Cinevood,
            uses_challenge_bypass: true,
            latest_pagination: true,
            // Download sections mix in promo links; labels here are quality
            // strings that reliably match the allowlist.
            require_inclusion_keywords: true,
            page_delay: Duration::from_secs(1),
        };

        Self { config }
    }

    /// Structured download sections: an `h6` description above rows of
    /// button-wrapped links.
    fn button_section_links(&self, document: &Html) -> Vec<DownloadEntry> {
        let section_selector = Selector::parse("div.download-btns").unwrap();
        let heading_selector = Selector::parse("h6").unwrap();
        let link_selector = Selector::parse("div.cat-btn-div2 a[href]").unwrap();
        let button_selector = Selector::parse("button").unwrap();

        let mut entries = Vec::new();
        for section in document.select(&section_selector) {
            let heading = section
                .select(&heading_selector)
                .next()
                .map(element_text)
                .filter(|text| !text.is_empty());

            for link in section.select(&link_selector) {
                let Some(href) = link.value().attr("href") else {
                    continue;
                };
                let button_text = link
                    .select(&button_selector)
                    .next()
                    .map(element_text)
                    .filter(|text| !text.is_empty())
                    .unwrap_or_else(|| element_text(link));

                let label = match &heading {
                    Some(heading) => format!("{heading} [{button_text}]"),
                    None => button_text,
                };

                if accept_link(&self.config, &label, href) {
                    entries.push(DownloadEntry {
                        label,
                        url: href.to_string(),
                    });
                }
            }
        }
        entries
    }

    /// Broad anchor sweep used when the structured sections are absent;
    /// labels prefer the nearest preceding `h6`.
    fn anchor_links(&self, document: &Html, selector: &str) -> Vec<DownloadEntry> {
        let link_selector = Selector::parse(selector).unwrap();

        let mut entries = Vec::new();
        for link in document.select(&link_selector) {
            let Some(href) = link.value().attr("href") else {
                continue;
            };
            let text = element_text(link);
            if text.is_empty() {
                continue;
            }
            let label = preceding_heading(link).unwrap_or(text);

            if accept_link(&self.config, &label, href) {
                entries.push(DownloadEntry {
                    label,
                    url: href.to_string(),
                });
            }
        }
        entries
    }

    /// `a.maxbutton` links from the maxbuttons plugin, labelled by their
    /// `span.mb-text` caption under the preceding heading.
    fn maxbutton_links(&self, document: &Html) -> Vec<DownloadEntry> {
        let button_selector = Selector::parse("a.maxbutton").unwrap();
        let caption_selector = Selector::parse("span.mb-text").unwrap();

        let mut entries = Vec::new();
        for button in document.select(&button_selector) {
            let Some(href) = button.value().attr("href") else {
                continue;
            };
            let caption = button
                .select(&caption_selector)
                .next()
                .map(element_text)
                .filter(|text| !text.is_empty())
                .unwrap_or_else(|| "Download".to_string());

            let label = match preceding_heading(button) {
                Some(heading) => format!("{heading} [{caption}]"),
                None => caption,
            };

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

        // The download section markup has been reshuffled several times;
        // try the specific strategies first and take the first that bites.
        let entries = self.button_section_links(&document);
        if !entries.is_empty() {
            return entries;
        }
        let entries = self.anchor_links(&document, "div.entry-content a[href]");
        if !entries.is_empty() {
            return entries;
        }
        let entries = self.anchor_links(&document, "p a[href]");
        if !entries.is_empty() {
            return entries;
        }
        self.maxbutton_links(&document)
    }
}

#[async_trait]
impl SiteScraper for CinevoodScraper {
    fn config(&self) -> &ScraperConfig {
        &self.config
    }

    fn listing_url(&self, base_url: &str, mode: &ListingMode, page: u32) -> String {
        let base = base_url.trim_end_matches('/');
        match mode {
            ListingMode::Search(query) => {
                let query = encode_query(query, '-');
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

    fn parse_listing(&self, html: &str, mode: &ListingMode, base_url: &str) -> ListingPage {
        let document = Html::parse_document(html);

        let content_box_selector = Selector::parse("div#content_box").unwrap();
        let card_selector = Selector::parse("article.latestPost.excerpt").unwrap();
        let title_selector = Selector::parse("h2.title.front-view-title a").unwrap();
        let pagination_selector = Selector::parse("div.pagination").unwrap();
        let next_selector = Selector::parse("a.next").unwrap();

        // The browse feed shares its page with "also viewed" widgets; scope
        // extraction to the main content region so those don't leak in.
        let cards: Vec<_> = match mode {
            ListingMode::Latest => match document.select(&content_box_selector).next() {
                Some(content_box) => content_box.select(&card_selector).collect(),
                None => return ListingPage::default(),
            },
            ListingMode::Search(_) => document.select(&card_selector).collect(),
        };

        let mut entries = Vec::new();
        for card in cards {
            if let Some(title_link) = card.select(&title_selector).next()
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
        info!(count = entries.len(), url = detail_url, "cinevood download links extracted");
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "https://1cinevood.example";

    fn search_mode() -> ListingMode {
        ListingMode::Search("test movie".to_string())
    }

    #[test]
    fn search_urls_follow_site_convention() {
        let scraper = CinevoodScraper::new();
        let mode = ListingMode::Search("The Creator".to_string());
        assert_eq!(
            scraper.listing_url(BASE, &mode, 1),
            "https://1cinevood.example/?s=the-creator"
        );
        assert_eq!(
            scraper.listing_url(BASE, &mode, 3),
            "https://1cinevood.example/page/3/?s=the-creator"
        );
        assert_eq!(
            scraper.listing_url(BASE, &ListingMode::Latest, 1),
            "https://1cinevood.example/"
        );
        assert_eq!(
            scraper.listing_url(BASE, &ListingMode::Latest, 2),
            "https://1cinevood.example/page/2/"
        );
    }

    #[test]
    fn listing_extracts_titles_and_links() {
        let html = r#"
            <html><body>
              <article class="latestPost excerpt">
                <h2 class="title front-view-title"><a href="https://1cinevood.example/movie-a/">Movie A (2024) 1080p</a></h2>
              </article>
              <article class="latestPost excerpt">
                <h2 class="title front-view-title"><a href="/movie-b/">Movie B (2023) 720p</a></h2>
              </article>
              <div class="pagination"><a class="next" href="/page/2/?s=movie">Next</a></div>
            </body></html>
        "#;
        let page = CinevoodScraper::new().parse_listing(html, &search_mode(), BASE);
        assert_eq!(page.entries.len(), 2);
        assert_eq!(page.entries[0].title, "Movie A (2024) 1080p");
        assert_eq!(page.entries[1].url, "https://1cinevood.example/movie-b/");
        assert!(page.has_next);
    }

    #[test]
    fn boilerplate_titles_are_skipped() {
        let html = r#"
            <html><body>
              <article class="latestPost excerpt">
                <h2 class="title front-view-title"><a href="/real/">Real Movie</a></h2>
              </article>
              <article class="latestPost excerpt">
                <h2 class="title front-view-title"><a href="/footer/">© 2024 Site — All Rights Reserved</a></h2>
              </article>
            </body></html>
        "#;
        let page = CinevoodScraper::new().parse_listing(html, &search_mode(), BASE);
        assert_eq!(page.entries.len(), 1);
        assert_eq!(page.entries[0].title, "Real Movie");
        assert!(!page.has_next);
    }

    #[test]
    fn latest_listing_is_scoped_to_content_box() {
        let html = r#"
            <html><body>
              <div id="content_box">
                <article class="latestPost excerpt">
                  <h2 class="title front-view-title"><a href="/fresh/">Fresh Release</a></h2>
                </article>
              </div>
              <aside>
                <article class="latestPost excerpt">
                  <h2 class="title front-view-title"><a href="/old/">Also Viewed Widget</a></h2>
                </article>
              </aside>
            </body></html>
        "#;
        let scraper = CinevoodScraper::new();

        let latest = scraper.parse_listing(html, &ListingMode::Latest, BASE);
        assert_eq!(latest.entries.len(), 1);
        assert_eq!(latest.entries[0].title, "Fresh Release");

        // Search pages have no content_box scoping.
        let search = scraper.parse_listing(html, &search_mode(), BASE);
        assert_eq!(search.entries.len(), 2);
    }

    #[test]
    fn latest_without_content_box_yields_nothing() {
        let html = r#"<html><body><article class="latestPost excerpt">
            <h2 class="title front-view-title"><a href="/x/">X</a></h2>
        </article></body></html>"#;
        let page = CinevoodScraper::new().parse_listing(html, &ListingMode::Latest, BASE);
        assert!(page.entries.is_empty());
        assert!(!page.has_next);
    }

    #[test]
    fn download_sections_keep_genuine_links_only() {
        let html = r#"
            <html><body>
              <div class="download-btns">
                <h6>Movie A 1080p WEB-DL</h6>
                <div class="cat-btn-div2">
                  <a href="https://gdflix.example/abc"><button>GDFlix</button></a>
                  <a href="https://stream.example/watch"><button>Watch Online</button></a>
                </div>
              </div>
              <div class="download-btns">
                <h6>Movie A 720p</h6>
                <div class="cat-btn-div2">
                  <a href="https://filepress.example/def"><button>FilePress</button></a>
                </div>
              </div>
            </body></html>
        "#;
        let entries = CinevoodScraper::new().parse_download_page(html);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].label, "Movie A 1080p WEB-DL [GDFlix]");
        assert_eq!(entries[0].url, "https://gdflix.example/abc");
        assert_eq!(entries[1].label, "Movie A 720p [FilePress]");
    }

    #[test]
    fn decoy_anchor_is_dropped_and_download_kept() {
        let html = r#"
            <html><body><div class="entry-content">
              <p><a href="https://stream.example/w">Watch Online</a></p>
              <p><a href="https://files.example/d">Download 1080p</a></p>
            </div></body></html>
        "#;
        let entries = CinevoodScraper::new().parse_download_page(html);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].label, "Download 1080p");
    }

    #[test]
    fn falls_back_to_paragraph_links_when_sections_absent() {
        let html = r#"
            <html><body>
              <p><a href="https://files.example/a">Download 720p</a></p>
            </body></html>
        "#;
        let entries = CinevoodScraper::new().parse_download_page(html);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].url, "https://files.example/a");
    }

    #[test]
    fn anchor_label_prefers_preceding_heading() {
        let html = r#"
            <html><body><div class="entry-content">
              <h6>Movie A 4K HDR</h6>
              <p><a href="https://files.example/4k">GDFlix</a></p>
            </div></body></html>
        "#;
        let entries = CinevoodScraper::new().parse_download_page(html);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].label, "Movie A 4K HDR");
    }
}
