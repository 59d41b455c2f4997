//! sqlite-backed site-domain store.
//!
//! The listing sites rotate domains every few weeks; the current base URL
//! per site lives here so an admin can repoint a site from chat without a
//! redeploy. The scraping core never reads this store directly — it only
//! sees base URLs resolved from it per request.

use anyhow::Result;
use chrono::Utc;
use sqlx::{Row, Sqlite, SqlitePool, migrate::MigrateDatabase};
use tracing::{info, warn};

use crate::models::{SiteKey, SiteTarget};

#[derive(Debug, Clone)]
pub struct SiteRecord {
    pub key: SiteKey,
    pub base_url: String,
    pub enabled: bool,
}

impl SiteRecord {
    pub fn target(&self) -> SiteTarget {
        SiteTarget {
            key: self.key,
            base_url: self.base_url.clone(),
        }
    }
}

pub struct SiteStore {
    pool: SqlitePool,
}

impl SiteStore {
    pub async fn new() -> Result<Self> {
        let db_url =
            std::env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite:sites.db".to_string());

        // Create database file if it doesn't exist
        if !Sqlite::database_exists(&db_url).await.unwrap_or(false) {
            info!("Creating database file");
            Sqlite::create_database(&db_url).await?;
        }

        let pool = SqlitePool::connect(&db_url).await?;

        info!("Running database migrations");
        sqlx::migrate!("./migrations").run(&pool).await?;

        Ok(Self { pool })
    }

    /// All sites in their seeded order, disabled ones included.
    pub async fn list_sites(&self) -> Result<Vec<SiteRecord>> {
        let rows = sqlx::query("SELECT key, base_url, enabled FROM sites ORDER BY rowid")
            .fetch_all(&self.pool)
            .await?;

        let mut sites = Vec::new();
        for row in rows {
            let key: String = row.get("key");
            match key.parse::<SiteKey>() {
                Ok(key) => sites.push(SiteRecord {
                    key,
                    base_url: row.get("base_url"),
                    enabled: row.get("enabled"),
                }),
                Err(_) => warn!(key, "ignoring unknown site key in store"),
            }
        }
        Ok(sites)
    }

    /// Resolved targets for the sites a listing run should cover.
    pub async fn enabled_targets(&self) -> Result<Vec<SiteTarget>> {
        Ok(self
            .list_sites()
            .await?
            .into_iter()
            .filter(|site| site.enabled)
            .map(|site| site.target())
            .collect())
    }

    pub async fn update_base_url(&self, key: SiteKey, base_url: &str) -> Result<()> {
        sqlx::query("UPDATE sites SET base_url = ?, updated_at = ? WHERE key = ?")
            .bind(base_url)
            .bind(Utc::now())
            .bind(key.as_str())
            .execute(&self.pool)
            .await?;

        info!(site = %key, base_url, "site base URL updated");
        Ok(())
    }
}

impl Clone for SiteStore {
    fn clone(&self) -> Self {
        Self {
            pool: self.pool.clone(),
        }
    }
}
