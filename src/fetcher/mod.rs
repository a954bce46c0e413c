use async_trait::async_trait;
use crate::error::Result;

pub mod binance;

/// External spot quote source. Any failure is a soft `RefreshFailure`.
#[async_trait]
pub trait PriceSource: Send + Sync {
    fn name(&self) -> &str;
    async fn fetch_price(&self) -> Result<f64>;
}
