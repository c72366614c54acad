//! Market data providers
//!
//! The stock tools only need daily closing prices. `MarketData` is the seam;
//! `YahooChart` is the production provider and `CachedMarketData` puts a short
//! TTL cache in front of any provider.

mod cache;
mod yahoo;

pub use cache::CachedMarketData;
pub use yahoo::YahooChart;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// One daily bar, reduced to its close
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DailyClose {
    /// Trading day (exchange-local date as reported by the provider)
    pub date: NaiveDate,
    /// Closing price
    pub close: f64,
}

/// Source of daily closing prices
#[async_trait]
pub trait MarketData: Send + Sync {
    /// Daily closes covering roughly the last `lookback_days` calendar days,
    /// oldest first. An unknown symbol yields an empty series.
    async fn daily_closes(&self, symbol: &str, lookback_days: u32) -> Result<Vec<DailyClose>>;
}

/// Keep only the most recent `count` closes
pub fn trailing(closes: &[DailyClose], count: usize) -> &[DailyClose] {
    &closes[closes.len().saturating_sub(count)..]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series(values: &[f64]) -> Vec<DailyClose> {
        values
            .iter()
            .enumerate()
            .map(|(i, close)| DailyClose {
                date: NaiveDate::from_ymd_opt(2024, 1, 1 + i as u32).unwrap(),
                close: *close,
            })
            .collect()
    }

    #[test]
    fn test_trailing_takes_latest() {
        let closes = series(&[1.0, 2.0, 3.0, 4.0]);
        let window = trailing(&closes, 2);
        assert_eq!(window.len(), 2);
        assert_eq!(window[0].close, 3.0);
        assert_eq!(window[1].close, 4.0);
    }

    #[test]
    fn test_trailing_shorter_series() {
        let closes = series(&[1.0]);
        assert_eq!(trailing(&closes, 5).len(), 1);
        assert!(trailing(&[], 3).is_empty());
    }
}
