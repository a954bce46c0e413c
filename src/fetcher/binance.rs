use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use super::PriceSource;
use crate::error::{DashboardError, Result};

pub struct BinanceFetcher {
    client: Client,
    base_url: String,
    symbol: String,
}

#[derive(Debug, Deserialize)]
struct TickerPrice {
    symbol: String,
    price: String,
}

impl BinanceFetcher {
    pub fn new(base_url: &str, symbol: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DashboardError::Config(format!("HTTP client: {}", e)))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            symbol: symbol.to_string(),
        })
    }

    /// Parse a `/api/v3/ticker/price` body into a usable spot price.
    pub fn parse_ticker(body: &serde_json::Value) -> Result<f64> {
        let ticker: TickerPrice = serde_json::from_value(body.clone())
            .map_err(|e| DashboardError::RefreshFailure(format!("Malformed ticker: {}", e)))?;

        let price = ticker
            .price
            .trim()
            .parse::<f64>()
            .map_err(|_| DashboardError::RefreshFailure(format!("Invalid price '{}' for {}", ticker.price, ticker.symbol)))?;

        if !price.is_finite() || price <= 0.0 {
            return Err(DashboardError::RefreshFailure(format!("Unusable price {} for {}", price, ticker.symbol)));
        }
        Ok(price)
    }
}

#[async_trait]
impl PriceSource for BinanceFetcher {
    fn name(&self) -> &str {
        "binance"
    }

    async fn fetch_price(&self) -> Result<f64> {
        let url = format!("{}/api/v3/ticker/price", self.base_url);

        // Ticker is public
        let resp = self.client
            .get(&url)
            .query(&[("symbol", self.symbol.as_str())])
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(DashboardError::RefreshFailure(format!("Binance Ticker Error: {}", resp.status())));
        }

        let json: serde_json::Value = resp.json().await?;
        let price = Self::parse_ticker(&json)?;
        debug!(symbol = %self.symbol, price, "Fetched spot price");
        Ok(price)
    }
}
