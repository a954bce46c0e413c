use crate::error::{DashboardError, Result};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    pub db_path: PathBuf,
    pub price_symbol: String,
    pub price_api_base: String,
    pub refresh_interval: Duration,
    pub refresh_startup_delay: Duration,
    pub http_timeout: Duration,
    pub llm_provider: String,
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    pub openai_api_key: Option<String>,
    pub openai_model: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            db_path: PathBuf::from("./data/dashboard.db"),
            price_symbol: "BTCUSDT".to_string(),
            price_api_base: "https://api.binance.com".to_string(),
            refresh_interval: Duration::from_secs(3600),
            refresh_startup_delay: Duration::ZERO,
            http_timeout: Duration::from_secs(10),
            llm_provider: "gemini".to_string(),
            gemini_api_key: None,
            gemini_model: "gemini-2.5-flash".to_string(),
            openai_api_key: None,
            openai_model: "gpt-4o-mini".to_string(),
        }
    }
}

impl Config {
    /// Load config from a specific .env file, or the default `.env` if None.
    pub fn from_env_file(path: Option<&str>) -> Result<Self> {
        match path {
            Some(p) => { dotenvy::from_filename(p).ok(); }
            None => { dotenvy::dotenv().ok(); }
        }
        Self::build_from_env()
    }

    pub fn from_env() -> Result<Self> {
        Self::from_env_file(None)
    }

    fn build_from_env() -> Result<Self> {
        let defaults = Config::default();

        let refresh_secs = env_u64("REFRESH_INTERVAL_SECS", defaults.refresh_interval.as_secs());
        if refresh_secs == 0 {
            return Err(DashboardError::Config("REFRESH_INTERVAL_SECS must be greater than 0".to_string()));
        }

        Ok(Config {
            db_path: env_opt("DASHBOARD_DB_PATH").map(PathBuf::from).unwrap_or(defaults.db_path),
            price_symbol: env("PRICE_SYMBOL", &defaults.price_symbol),
            price_api_base: env("PRICE_API_BASE", &defaults.price_api_base),
            refresh_interval: Duration::from_secs(refresh_secs),
            refresh_startup_delay: Duration::from_secs(env_u64("REFRESH_STARTUP_DELAY_SECS", defaults.refresh_startup_delay.as_secs())),
            http_timeout: Duration::from_secs(env_u64("HTTP_TIMEOUT_SECS", defaults.http_timeout.as_secs())),
            llm_provider: env("LLM_PROVIDER", &defaults.llm_provider).to_lowercase(),
            gemini_api_key: env_opt("GEMINI_API_KEY"),
            gemini_model: env("GEMINI_MODEL", &defaults.gemini_model),
            openai_api_key: env_opt("OPENAI_API_KEY"),
            openai_model: env("OPENAI_MODEL", &defaults.openai_model),
        })
    }
}

fn env(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn env_u64(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}
