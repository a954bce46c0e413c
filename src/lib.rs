pub mod analysis;
pub mod commands;
pub mod config;
pub mod core;
pub mod db;
pub mod error;
pub mod fetcher;
pub mod indicators;
pub mod llm;
pub mod models;

use chrono::Utc;
use sqlx::SqlitePool;
use std::sync::Arc;
use tracing::info;

use crate::config::Config;
use crate::core::coordinator::Dashboard;
use crate::core::scheduler::PriceRefresher;
use crate::core::store::IndicatorStore;
use crate::fetcher::binance::BinanceFetcher;
use crate::indicators::registry::REALIZED_PRICE_ID;

/// Install the `tracing` subscriber (`RUST_LOG`, default `info`).
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .try_init();
}

/// Everything a command needs: the pool, the live dashboard and the config.
pub struct AppContext {
    pub pool: SqlitePool,
    pub dashboard: Arc<Dashboard>,
    pub config: Config,
}

impl AppContext {
    pub async fn init(config: Config) -> anyhow::Result<Self> {
        let pool = db::init(&config.db_path).await?;
        Self::with_pool(pool, config).await
    }

    pub async fn with_pool(pool: SqlitePool, config: Config) -> anyhow::Result<Self> {
        let backend = Arc::new(db::SqliteSettingsStore::new(pool.clone()));
        let dashboard = Dashboard::open(IndicatorStore::new(backend), Utc::now()).await?;
        info!("Dashboard ready ({} indicators)", dashboard.snapshot().indicators.len());
        Ok(AppContext {
            pool,
            dashboard: Arc::new(dashboard),
            config,
        })
    }

    /// Refresher feeding the configured spot price into the realized-price card.
    pub fn price_refresher(&self) -> anyhow::Result<Arc<PriceRefresher>> {
        let source = BinanceFetcher::new(
            &self.config.price_api_base,
            &self.config.price_symbol,
            self.config.http_timeout,
        )?;
        Ok(Arc::new(PriceRefresher::new(
            self.dashboard.clone(),
            Arc::new(source),
            REALIZED_PRICE_ID,
        )))
    }
}
