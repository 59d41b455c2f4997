//! HTTP fetching with a realistic browser identity and optional anti-bot
//! challenge bypass.
//!
//! Everything downstream (pagination driver, adapters, finder) depends on the
//! [`PageSource`] trait rather than on reqwest directly, so tests can swap in
//! canned documents.

pub mod solver;

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode, header};
use thiserror::Error;
use tracing::debug;

use solver::SolverClient;

/// The sites block generic clients outright; present a desktop browser.
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/117.0.0.0 Safari/537.36";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Substrings that identify a JavaScript challenge interstitial instead of
/// real page content.
const CHALLENGE_MARKERS: [&str; 2] = ["Just a moment", "Enable JavaScript and cookies"];

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {url} failed: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: StatusCode },

    #[error("anti-bot challenge at {url} was not solved")]
    Challenge { url: String },

    #[error("challenge solver failed for {url}: {message}")]
    Solver { url: String, message: String },
}

/// Source of fetched page bodies. `bypass` marks URLs that sit behind a
/// JavaScript anti-bot gate and should go through the challenge solver.
#[async_trait]
pub trait PageSource: Send + Sync {
    async fn get(&self, url: &str, bypass: bool) -> Result<String, FetchError>;
}

/// Production fetcher: plain GETs through reqwest, challenge-gated URLs
/// through the configured solver sidecar.
pub struct PageFetcher {
    client: Client,
    solver: Option<SolverClient>,
}

impl PageFetcher {
    pub fn new(solver: Option<SolverClient>) -> anyhow::Result<Self> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::ACCEPT,
            header::HeaderValue::from_static(
                "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8",
            ),
        );
        headers.insert(
            header::ACCEPT_LANGUAGE,
            header::HeaderValue::from_static("en-US,en;q=0.5"),
        );

        let client = Client::builder()
            .user_agent(BROWSER_USER_AGENT)
            .default_headers(headers)
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self { client, solver })
    }

    /// Build a fetcher from the environment. `FLARESOLVERR_URL` is optional;
    /// without it, challenge-gated sites are fetched directly and a detected
    /// interstitial surfaces as [`FetchError::Challenge`].
    pub fn from_env() -> anyhow::Result<Self> {
        let solver = std::env::var("FLARESOLVERR_URL")
            .ok()
            .filter(|url| !url.is_empty())
            .map(|url| SolverClient::new(&url));
        Self::new(solver)
    }

    async fn get_direct(&self, url: &str) -> Result<String, FetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|source| FetchError::Network {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status,
            });
        }

        response.text().await.map_err(|source| FetchError::Network {
            url: url.to_string(),
            source,
        })
    }
}

#[async_trait]
impl PageSource for PageFetcher {
    async fn get(&self, url: &str, bypass: bool) -> Result<String, FetchError> {
        if bypass && let Some(solver) = &self.solver {
            debug!(url, "fetching via challenge solver");
            return solver.get_content(url).await;
        }

        debug!(url, "fetching directly");
        let body = self.get_direct(url).await?;

        // Without a solver we can still reach bypass sites when the gate is
        // down; a served interstitial is a failed fetch, not page content.
        if bypass && looks_like_challenge(&body) {
            return Err(FetchError::Challenge {
                url: url.to_string(),
            });
        }

        Ok(body)
    }
}

pub fn looks_like_challenge(body: &str) -> bool {
    CHALLENGE_MARKERS.iter().any(|marker| body.contains(marker))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_challenge_interstitial() {
        let body = "<html><title>Just a moment...</title></html>";
        assert!(looks_like_challenge(body));

        let body = "<html><body>Please Enable JavaScript and cookies to continue</body></html>";
        assert!(looks_like_challenge(body));
    }

    #[test]
    fn regular_page_is_not_a_challenge() {
        assert!(!looks_like_challenge(
            "<html><body><article>Movie (2024) 1080p</article></body></html>"
        ));
        assert!(!looks_like_challenge(""));
    }
}
