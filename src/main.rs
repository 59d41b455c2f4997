use std::sync::Arc;

use anyhow::Result;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{debug, info};

mod database;
mod fetch;
mod finder;
mod models;
mod normalize;
mod pagination;
mod retry;
mod scrapers;
mod session;
mod telegram;
mod traits;

use database::SiteStore;
use fetch::PageFetcher;
use finder::MovieFinder;
use session::SessionStore;
use telegram::TelegramBot;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    info!("Starting Movie Finder Bot");

    let sites = SiteStore::new().await?;
    let fetcher = PageFetcher::from_env()?;
    let finder = MovieFinder::new(Arc::new(fetcher));
    let sessions = SessionStore::new();

    let bot = TelegramBot::from_env(finder, sites.clone(), sessions.clone())?;

    // Sweep abandoned conversations every minute
    let sched = JobScheduler::new().await?;
    sched
        .add(Job::new_async("0 * * * * *", move |_uuid, _l| {
            let sessions = sessions.clone();
            Box::pin(async move {
                let swept = sessions.sweep_expired();
                if swept > 0 {
                    debug!(swept, "swept expired sessions");
                }
            })
        })?)
        .await?;
    sched.start().await?;

    bot.run().await
}
