//! TTL cache in front of a market data provider
//!
//! Uses moka async cache. Only successful fetches are stored, so a transient
//! upstream failure is retried on the next call.

use async_trait::async_trait;
use moka::future::Cache;
use std::sync::Arc;
use std::time::Duration;

use super::{DailyClose, MarketData};
use crate::error::Result;

/// Caching wrapper keyed by `(symbol, lookback_days)`
#[derive(Clone)]
pub struct CachedMarketData {
    inner: Arc<dyn MarketData>,
    series: Cache<(String, u32), Arc<Vec<DailyClose>>>,
}

impl CachedMarketData {
    /// Wrap a provider with the given time-to-live
    pub fn new(inner: Arc<dyn MarketData>, ttl: Duration) -> Self {
        CachedMarketData {
            inner,
            series: Cache::builder().max_capacity(500).time_to_live(ttl).build(),
        }
    }
}

#[async_trait]
impl MarketData for CachedMarketData {
    async fn daily_closes(&self, symbol: &str, lookback_days: u32) -> Result<Vec<DailyClose>> {
        let key = (symbol.trim().to_uppercase(), lookback_days);
        if let Some(hit) = self.series.get(&key).await {
            return Ok(hit.as_ref().clone());
        }

        let closes = self.inner.daily_closes(symbol, lookback_days).await?;
        self.series.insert(key, Arc::new(closes.clone())).await;
        Ok(closes)
    }
}
