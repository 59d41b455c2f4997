//! Data models for scraped movie listings and Telegram Bot API payloads

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The closed set of supported sites. Adapters are selected by this key,
/// and the domain store persists one base URL per key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SiteKey {
    Cinevood,
    Hdhub4u,
    Hdmovie2,
}

impl SiteKey {
    pub const ALL: [SiteKey; 3] = [SiteKey::Cinevood, SiteKey::Hdhub4u, SiteKey::Hdmovie2];

    pub fn as_str(&self) -> &'static str {
        match self {
            SiteKey::Cinevood => "cinevood",
            SiteKey::Hdhub4u => "hdhub4u",
            SiteKey::Hdmovie2 => "hdmovie2",
        }
    }
}

impl fmt::Display for SiteKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SiteKey {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cinevood" => Ok(SiteKey::Cinevood),
            "hdhub4u" => Ok(SiteKey::Hdhub4u),
            "hdmovie2" => Ok(SiteKey::Hdmovie2),
            other => Err(anyhow::anyhow!("unknown site key: {other}")),
        }
    }
}

/// One title extracted from a listing element on a search or browse page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingEntry {
    /// Trimmed, non-empty display title.
    pub title: String,
    /// Detail-page URL, absolutized against the site's base URL.
    pub url: String,
}

/// One download link extracted from a detail page, after filtering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadEntry {
    /// Quality/source description; falls back to the link's own text.
    pub label: String,
    pub url: String,
}

impl DownloadEntry {
    /// The user-facing rendering, also the dedup key.
    pub fn render(&self) -> String {
        format!("{}: {}", self.label, self.url)
    }
}

/// A listing entry tagged with the site it came from. The position of a hit
/// within a merged result list is the number users select by.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchHit {
    pub site: SiteKey,
    pub entry: ListingEntry,
}

/// A site selected for a listing run, with its base URL already resolved
/// from the domain store.
#[derive(Debug, Clone)]
pub struct SiteTarget {
    pub key: SiteKey,
    pub base_url: String,
}

/// One page of extracted listing entries plus the next-page affordance.
#[derive(Debug, Clone, Default)]
pub struct ListingPage {
    pub entries: Vec<ListingEntry>,
    pub has_next: bool,
}

/// How a listing run targets a site: a title search or the browse feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListingMode {
    Search(String),
    Latest,
}

// --- Telegram Bot API wire types (the subset this bot uses) ---

#[derive(Debug, Deserialize)]
pub struct UpdatesResponse {
    pub ok: bool,
    #[serde(default)]
    pub result: Vec<TgUpdate>,
}

#[derive(Debug, Deserialize)]
pub struct TgUpdate {
    pub update_id: i64,
    pub message: Option<TgMessage>,
}

#[derive(Debug, Deserialize)]
pub struct TgMessage {
    pub from: Option<TgUser>,
    pub chat: TgChat,
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TgUser {
    pub id: i64,
}

#[derive(Debug, Deserialize)]
pub struct TgChat {
    pub id: i64,
}

/// Outgoing sendMessage payload.
#[derive(Debug, Serialize)]
pub struct OutgoingMessage<'a> {
    pub chat_id: i64,
    pub text: &'a str,
    pub disable_web_page_preview: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn site_key_round_trips() {
        for key in SiteKey::ALL {
            assert_eq!(key.as_str().parse::<SiteKey>().unwrap(), key);
        }
        assert!("netflix".parse::<SiteKey>().is_err());
    }

    #[test]
    fn download_entry_renders_label_and_url() {
        let entry = DownloadEntry {
            label: "1080p HEVC".to_string(),
            url: "https://files.example/x".to_string(),
        };
        assert_eq!(entry.render(), "1080p HEVC: https://files.example/x");
    }
}
