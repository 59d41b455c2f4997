//! Telegram bot integration
//!
//! A minimal long-polling client for the Bot API plus the conversational
//! command handling: `/search` and `/latest` produce a numbered title list,
//! a numeric reply fetches that title's download links, and `/update_url`
//! repoints a site's domain. Access is restricted to the user IDs in
//! `ALLOWED_USER_IDS`; everyone else gets a refusal and no state.
//!
//! Replies are chunked under Telegram's 4096-character message limit, with
//! link previews disabled since most messages are link lists.

use std::collections::HashSet;

use anyhow::{Context, Result, bail};
use reqwest::Client;
use tracing::{error, info, warn};

use crate::database::SiteStore;
use crate::finder::MovieFinder;
use crate::models::{OutgoingMessage, TgMessage, TgUpdate, UpdatesResponse};
use crate::normalize::number_hits;
use crate::session::{Conversation, SessionStore};

const POLL_TIMEOUT_SECS: u64 = 30;
const MESSAGE_CHAR_LIMIT: usize = 4096;

pub struct TelegramBot {
    client: Client,
    api_base: String,
    allowed_users: HashSet<i64>,
    finder: MovieFinder,
    sites: SiteStore,
    sessions: SessionStore,
}

impl TelegramBot {
    pub fn from_env(finder: MovieFinder, sites: SiteStore, sessions: SessionStore) -> Result<Self> {
        let token =
            std::env::var("TELEGRAM_BOT_TOKEN").context("TELEGRAM_BOT_TOKEN not set")?;

        let allowed_users: HashSet<i64> = std::env::var("ALLOWED_USER_IDS")
            .unwrap_or_default()
            .split(',')
            .filter_map(|id| id.trim().parse().ok())
            .collect();
        if allowed_users.is_empty() {
            warn!("ALLOWED_USER_IDS is empty - every message will be refused");
        }

        // Longer than the poll timeout so long polls don't get cut off
        // client-side.
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(POLL_TIMEOUT_SECS + 20))
            .build()?;

        Ok(Self {
            client,
            api_base: format!("https://api.telegram.org/bot{token}"),
            allowed_users,
            finder,
            sites,
            sessions,
        })
    }

    /// Long-poll getUpdates forever, dispatching each incoming message.
    pub async fn run(&self) -> Result<()> {
        info!("Telegram bot started, long-polling for updates");
        let mut offset: i64 = 0;

        loop {
            match self.get_updates(offset).await {
                Ok(updates) => {
                    for update in updates {
                        offset = offset.max(update.update_id + 1);
                        let Some(message) = update.message else {
                            continue;
                        };
                        let chat_id = message.chat.id;
                        if let Err(e) = self.handle_message(message).await {
                            error!("Error handling message: {e:#}");
                            self.send_message(
                                chat_id,
                                "⚠️ An error occurred. Please try again with /search.",
                            )
                            .await;
                        }
                    }
                }
                Err(e) => {
                    error!("getUpdates failed: {e:#}");
                    tokio::time::sleep(std::time::Duration::from_secs(5)).await;
                }
            }
        }
    }

    async fn get_updates(&self, offset: i64) -> Result<Vec<TgUpdate>> {
        let response = self
            .client
            .get(format!("{}/getUpdates", self.api_base))
            .query(&[("timeout", POLL_TIMEOUT_SECS as i64), ("offset", offset)])
            .send()
            .await?;

        if !response.status().is_success() {
            bail!("getUpdates returned HTTP {}", response.status());
        }

        let body: UpdatesResponse = response.json().await?;
        if !body.ok {
            bail!("getUpdates response not ok");
        }
        Ok(body.result)
    }

    async fn send_message(&self, chat_id: i64, text: &str) {
        for chunk in chunk_lines(text, MESSAGE_CHAR_LIMIT) {
            let payload = OutgoingMessage {
                chat_id,
                text: &chunk,
                disable_web_page_preview: true,
            };
            let sent = self
                .client
                .post(format!("{}/sendMessage", self.api_base))
                .json(&payload)
                .send()
                .await;
            match sent {
                Ok(response) if !response.status().is_success() => {
                    error!("sendMessage failed: HTTP {}", response.status());
                }
                Ok(_) => {}
                Err(e) => error!("sendMessage failed: {e}"),
            }
        }
    }

    async fn handle_message(&self, message: TgMessage) -> Result<()> {
        let chat_id = message.chat.id;
        let Some(text) = message.text.as_deref().map(str::trim).filter(|t| !t.is_empty())
        else {
            return Ok(());
        };

        let authorized = message
            .from
            .as_ref()
            .is_some_and(|user| self.allowed_users.contains(&user.id));
        if !authorized {
            self.send_message(chat_id, "🚫 Unauthorized access. This bot is restricted.")
                .await;
            return Ok(());
        }

        if text.starts_with('/') {
            self.handle_command(chat_id, text).await
        } else {
            self.handle_reply(chat_id, text).await
        }
    }

    async fn handle_command(&self, chat_id: i64, text: &str) -> Result<()> {
        let command = text.split_whitespace().next().unwrap_or(text);
        match command {
            "/start" => {
                self.sessions.clear(chat_id);
                self.send_message(
                    chat_id,
                    "🎬 Welcome to the Movie Search Bot! 🎥\n\
                     Use /search to find a movie.\n\
                     Use /latest to browse the newest titles.\n\
                     Use /list_urls to view current site URLs.\n\
                     Use /update_url to change a site URL.\n\
                     Use /cancel to cancel any operation.",
                )
                .await;
            }
            "/search" => {
                self.sessions.set(chat_id, Conversation::AwaitingQuery);
                self.send_message(chat_id, "🎥 Please enter the movie name to search:")
                    .await;
            }
            "/latest" => {
                self.send_message(chat_id, "⏳ Fetching the latest titles...")
                    .await;
                let targets = self.sites.enabled_targets().await?;
                let hits = self.finder.latest(&targets).await;
                self.present_hits(chat_id, hits).await;
            }
            "/list_urls" => {
                let sites = self.sites.list_sites().await?;
                let lines: Vec<String> = sites
                    .iter()
                    .enumerate()
                    .map(|(index, site)| {
                        format!(
                            "{}. {}: {} (enabled: {})",
                            index + 1,
                            site.key,
                            site.base_url,
                            site.enabled
                        )
                    })
                    .collect();
                self.send_message(
                    chat_id,
                    &format!(
                        "🌐 Current site URLs:\n\n{}\n\nUse /update_url to change a URL.",
                        lines.join("\n")
                    ),
                )
                .await;
            }
            "/update_url" => {
                let sites = self.sites.list_sites().await?;
                let lines: Vec<String> = sites
                    .iter()
                    .enumerate()
                    .map(|(index, site)| format!("{}. {}", index + 1, site.key))
                    .collect();
                self.sessions.set(chat_id, Conversation::AwaitingSiteChoice);
                self.send_message(
                    chat_id,
                    &format!(
                        "🌐 Select the site to update the URL for:\n\n{}\n\nEnter the number:",
                        lines.join("\n")
                    ),
                )
                .await;
            }
            "/cancel" => {
                self.sessions.clear(chat_id);
                self.send_message(
                    chat_id,
                    "✅ Operation cancelled. Use /search to start a new search.",
                )
                .await;
            }
            _ => {
                self.send_message(chat_id, "❓ Unknown command. Use /start to see what I can do.")
                    .await;
            }
        }
        Ok(())
    }

    /// Non-command text: meaningful only while a conversation is pending.
    async fn handle_reply(&self, chat_id: i64, text: &str) -> Result<()> {
        match self.sessions.take(chat_id) {
            Some(Conversation::AwaitingQuery) => {
                self.send_message(chat_id, &format!("🔍 Searching for \"{text}\"..."))
                    .await;
                let targets = self.sites.enabled_targets().await?;
                let hits = self.finder.search(&targets, text).await;
                self.present_hits(chat_id, hits).await;
            }
            Some(Conversation::AwaitingSelection(hits)) => {
                match parse_selection(text, hits.len()) {
                    Some(index) => {
                        let hit = &hits[index];
                        let links = self.finder.downloads(hit.site, &hit.entry.url).await;
                        if links.is_empty() {
                            self.send_message(
                                chat_id,
                                "😔 No download links found for the selected movie.\n\
                                 Search again with /search.",
                            )
                            .await;
                        } else {
                            self.send_message(
                                chat_id,
                                &format!(
                                    "📥 Download links:\n\n{}\n\nSearch again with /search.",
                                    links.join("\n")
                                ),
                            )
                            .await;
                        }
                    }
                    None => {
                        let count = hits.len();
                        self.sessions
                            .set(chat_id, Conversation::AwaitingSelection(hits));
                        self.send_message(
                            chat_id,
                            &format!("❌ Please enter a number between 1 and {count}."),
                        )
                        .await;
                    }
                }
            }
            Some(Conversation::AwaitingSiteChoice) => {
                let sites = self.sites.list_sites().await?;
                match parse_selection(text, sites.len()) {
                    Some(index) => {
                        let key = sites[index].key;
                        self.sessions.set(chat_id, Conversation::AwaitingNewUrl(key));
                        self.send_message(
                            chat_id,
                            &format!("Enter the new URL for {key} (e.g. https://example.com):"),
                        )
                        .await;
                    }
                    None => {
                        self.sessions.set(chat_id, Conversation::AwaitingSiteChoice);
                        self.send_message(
                            chat_id,
                            &format!("❌ Please enter a number between 1 and {}.", sites.len()),
                        )
                        .await;
                    }
                }
            }
            Some(Conversation::AwaitingNewUrl(key)) => {
                if !text.starts_with("https://") {
                    self.sessions.set(chat_id, Conversation::AwaitingNewUrl(key));
                    self.send_message(
                        chat_id,
                        "❌ Please enter a valid URL starting with 'https://'.",
                    )
                    .await;
                    return Ok(());
                }
                self.sites
                    .update_base_url(key, text.trim_end_matches('/'))
                    .await?;
                self.send_message(
                    chat_id,
                    &format!("✅ URL for {key} updated to {text}.\nUse /list_urls to verify."),
                )
                .await;
            }
            None => {
                self.send_message(chat_id, "Use /search to find a movie or /start for help.")
                    .await;
            }
        }
        Ok(())
    }

    async fn present_hits(&self, chat_id: i64, hits: Vec<crate::models::SearchHit>) {
        if hits.is_empty() {
            self.send_message(
                chat_id,
                "😔 No movies found. Possible reasons:\n\
                 - Check the movie name.\n\
                 - The sites may have blocked the request.\n\
                 - A site may have moved; check /list_urls.\n\
                 Try again with /search.",
            )
            .await;
            return;
        }

        let lines = number_hits(&hits);
        self.sessions
            .set(chat_id, Conversation::AwaitingSelection(hits));
        self.send_message(
            chat_id,
            &format!(
                "🎬 Movies found:\n\n{}\n\nEnter the number of the movie to get download links:",
                lines.join("\n")
            ),
        )
        .await;
    }
}

/// Parse a 1-based selection into an index, rejecting out-of-range picks.
fn parse_selection(text: &str, count: usize) -> Option<usize> {
    let picked: usize = text.trim().parse().ok()?;
    if picked >= 1 && picked <= count {
        Some(picked - 1)
    } else {
        None
    }
}

/// Split `text` on line boundaries into chunks that fit Telegram's message
/// size limit. A single oversized line is truncated rather than split.
fn chunk_lines(text: &str, limit: usize) -> Vec<String> {
    if text.len() <= limit {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut current = String::new();
    for line in text.lines() {
        let line = if line.len() > limit {
            let mut end = limit;
            while !line.is_char_boundary(end) {
                end -= 1;
            }
            &line[..end]
        } else {
            line
        };
        if !current.is_empty() && current.len() + line.len() + 1 > limit {
            chunks.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push('\n');
        }
        current.push_str(line);
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}
