use std::{sync::Arc, time::Duration};

use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::{
    billing::{BillingClient, LocalBilling, StripeBilling},
    cache::PageCache,
    config::AppConfig,
    users::{InMemoryUserStore, PgUserStore, UserStore},
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub users: Arc<dyn UserStore>,
    pub billing: Arc<dyn BillingClient>,
    pub pages: Arc<PageCache>,
}

impl AppState {
    /// Build the state from config. Returns the pool too so the caller can
    /// run migrations against it.
    pub async fn init(config: AppConfig) -> anyhow::Result<(Self, Option<PgPool>)> {
        let config = Arc::new(config);

        let (users, pool) = match &config.database_url {
            Some(url) => {
                let db = PgPoolOptions::new()
                    .max_connections(10)
                    .connect(url)
                    .await
                    .context("connect to database")?;
                let store = Arc::new(PgUserStore::new(db.clone())) as Arc<dyn UserStore>;
                (store, Some(db))
            }
            None => {
                tracing::warn!("DATABASE_URL not set; user records are kept in memory");
                (
                    Arc::new(InMemoryUserStore::new()) as Arc<dyn UserStore>,
                    None,
                )
            }
        };

        let billing = match &config.billing.stripe_secret_key {
            Some(key) => Arc::new(
                StripeBilling::new(&config.billing.api_base, key, config.billing.timeout())
                    .context("build billing client")?,
            ) as Arc<dyn BillingClient>,
            None => {
                tracing::warn!("STRIPE_SECRET_KEY not set; using local billing customers");
                Arc::new(LocalBilling::new()) as Arc<dyn BillingClient>
            }
        };

        let pages = Arc::new(PageCache::new(Duration::from_secs(config.page_cache_ttl_secs)));

        Ok((
            Self {
                config,
                users,
                billing,
                pages,
            },
            pool,
        ))
    }

    pub fn from_parts(
        config: Arc<AppConfig>,
        users: Arc<dyn UserStore>,
        billing: Arc<dyn BillingClient>,
    ) -> Self {
        let pages = Arc::new(PageCache::new(Duration::from_secs(config.page_cache_ttl_secs)));
        Self {
            config,
            users,
            billing,
            pages,
        }
    }

    pub fn fake() -> Self {
        Self::from_parts(
            Arc::new(AppConfig::for_tests()),
            Arc::new(InMemoryUserStore::new()),
            Arc::new(LocalBilling::new()),
        )
    }
}
