//! Site-specific scraper implementations and the heuristics they share

mod cinevood;
mod hdhub4u;
mod hdmovie2;

pub use cinevood::CinevoodScraper;
pub use hdhub4u::Hdhub4uScraper;
pub use hdmovie2::Hdmovie2Scraper;

use scraper::ElementRef;

use crate::models::SiteKey;
use crate::traits::{ScraperConfig, SiteScraper};

/// Link text/URL fragments that mark decoys rather than downloads.
const EXCLUDED_LINK_KEYWORDS: [&str; 6] = [
    "watch online",
    "trailer",
    "telegram",
    "join",
    "home",
    "how to download",
];

/// Fragments a genuine download link is expected to carry, for adapters
/// whose policy enforces the allowlist.
const INCLUDED_LINK_KEYWORDS: [&str; 7] = [
    "download", "gdflix", "filepress", "1080p", "720p", "480p", "hd",
];

/// Listing titles that are site boilerplate, not movies.
const BOILERPLATE_TITLE_KEYWORDS: [&str; 2] = ["©", "all rights reserved"];

/// Look up the adapter for a site key.
pub fn scraper_for(key: SiteKey) -> Box<dyn SiteScraper> {
    match key {
        SiteKey::Cinevood => Box::new(CinevoodScraper::new()),
        SiteKey::Hdhub4u => Box::new(Hdhub4uScraper::new()),
        SiteKey::Hdmovie2 => Box::new(Hdmovie2Scraper::new()),
    }
}

/// Copyright notices and similar boilerplate occasionally render inside the
/// listing containers; skip them rather than emit them as entries.
pub fn is_boilerplate_title(title: &str) -> bool {
    let lower = title.to_lowercase();
    BOILERPLATE_TITLE_KEYWORDS
        .iter()
        .any(|keyword| lower.contains(keyword))
}

/// Apply the exclusion denylist (always) and the inclusion allowlist (per
/// adapter policy) to one download candidate.
pub fn accept_link(config: &ScraperConfig, label: &str, url: &str) -> bool {
    if label.is_empty() || url.is_empty() {
        return false;
    }

    let label_lower = label.to_lowercase();
    let url_lower = url.to_lowercase();

    let excluded = EXCLUDED_LINK_KEYWORDS
        .iter()
        .any(|keyword| label_lower.contains(keyword) || url_lower.contains(keyword));
    if excluded {
        return false;
    }

    if config.require_inclusion_keywords {
        return INCLUDED_LINK_KEYWORDS
            .iter()
            .any(|keyword| label_lower.contains(keyword) || url_lower.contains(keyword));
    }

    true
}

/// Collect an element's visible text, trimmed.
pub fn element_text(element: ElementRef) -> String {
    element.text().collect::<String>().trim().to_string()
}

/// Convert a possibly site-relative href to an absolute URL.
pub fn absolutize(base_url: &str, href: &str) -> String {
    if href.starts_with("http") {
        href.to_string()
    } else if href.starts_with("//") {
        format!("https:{href}")
    } else {
        format!("{}/{}", base_url.trim_end_matches('/'), href.trim_start_matches('/'))
    }
}

/// Lowercase a search phrase and join its terms with the site's separator,
/// percent-encoding each term.
pub fn encode_query(query: &str, separator: char) -> String {
    query
        .trim()
        .to_lowercase()
        .split_whitespace()
        .map(|term| urlencoding::encode(term).into_owned())
        .collect::<Vec<_>>()
        .join(&separator.to_string())
}

/// Find the closest `h6` heading before `element`, walking back through its
/// preceding siblings and then its ancestors' preceding siblings. The sites
/// put the quality description in a heading just above the button row.
pub fn preceding_heading(element: ElementRef) -> Option<String> {
    let heading_selector = scraper::Selector::parse("h6").ok()?;
    let mut node = *element;
    loop {
        for sibling in node.prev_siblings() {
            if let Some(el) = ElementRef::wrap(sibling) {
                if el.value().name() == "h6" {
                    let text = element_text(el);
                    if !text.is_empty() {
                        return Some(text);
                    }
                }
                // A heading nested at the end of a preceding block also counts.
                if let Some(nested) = el.select(&heading_selector).last() {
                    let text = element_text(nested);
                    if !text.is_empty() {
                        return Some(text);
                    }
                }
            }
        }
        node = node.parent()?;
    }
}
