//! Yahoo Finance chart API

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;
use url::Url;

use super::{DailyClose, MarketData};
use crate::config::MarketConfig;
use crate::error::{Error, Result};

const USER_AGENT: &str = "Mozilla/5.0 (compatible; lineagent/0.1)";

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: Chart,
}

#[derive(Debug, Deserialize)]
struct Chart {
    #[serde(default)]
    result: Option<Vec<ChartResult>>,
    #[serde(default)]
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    #[serde(default)]
    code: String,
    #[serde(default)]
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    #[serde(default)]
    meta: Option<ChartMeta>,
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChartMeta {
    #[serde(default)]
    current_trading_period: Option<TradingPeriods>,
}

#[derive(Debug, Deserialize)]
struct TradingPeriods {
    #[serde(default)]
    regular: Option<TradingPeriod>,
}

/// Unix seconds bounding a session
#[derive(Debug, Deserialize)]
struct TradingPeriod {
    start: i64,
    end: i64,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    #[serde(default)]
    quote: Vec<Quote>,
}

#[derive(Debug, Deserialize)]
struct Quote {
    #[serde(default)]
    close: Vec<Option<f64>>,
}

/// Chart API provider
#[derive(Clone)]
pub struct YahooChart {
    client: Client,
    base_url: Url,
}

impl YahooChart {
    /// Create a provider from config
    pub fn new(config: &MarketConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        let base_url = Url::parse(&config.base_url)
            .map_err(|e| Error::Config(format!("Invalid market base_url '{}': {}", config.base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(Error::Config(format!("Invalid market base_url '{}'", config.base_url)));
        }

        Ok(YahooChart { client, base_url })
    }

    /// `{base}/v8/finance/chart/{symbol}` with the symbol as one path segment
    fn chart_url(&self, symbol: &str) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| Error::Config(format!("Invalid market base_url '{}'", self.base_url)))?
            .pop_if_empty()
            .extend(["v8", "finance", "chart", symbol]);
        Ok(url)
    }
}

#[async_trait]
impl MarketData for YahooChart {
    async fn daily_closes(&self, symbol: &str, lookback_days: u32) -> Result<Vec<DailyClose>> {
        let symbol = symbol.trim().to_uppercase();
        if symbol.is_empty() {
            return Err(Error::InvalidInput("Empty ticker symbol".to_string()));
        }

        let now = Utc::now();
        let start = now - ChronoDuration::days(i64::from(lookback_days.max(1)));
        let url = self.chart_url(&symbol)?;

        debug!("Fetching {} daily closes since {}", symbol, start.date_naive());

        let response = self
            .client
            .get(url)
            .query(&[
                ("period1", start.timestamp().to_string()),
                ("period2", now.timestamp().to_string()),
                ("interval", "1d".to_string()),
            ])
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        // Unknown tickers come back as 404 with a chart.error body.
        if status.as_u16() == 404 {
            return Ok(Vec::new());
        }
        if status.as_u16() == 429 {
            return Err(Error::RateLimit(format!("Market data rate limited for {}", symbol)));
        }
        if !status.is_success() {
            return Err(Error::Provider(format!("Chart API error ({}): {}", status, body)));
        }

        parse_chart(&body, now.timestamp())
    }
}

/// Turn a chart response into closes, skipping days without a close.
///
/// While the regular session is open, the bar for it carries the latest
/// trade rather than a close and is dropped.
fn parse_chart(body: &str, now: i64) -> Result<Vec<DailyClose>> {
    let response: ChartResponse = serde_json::from_str(body)
        .map_err(|e| Error::Provider(format!("Malformed chart response: {}", e)))?;

    if let Some(err) = response.chart.error {
        if err.code.eq_ignore_ascii_case("not found") {
            return Ok(Vec::new());
        }
        return Err(Error::Provider(format!("{}: {}", err.code, err.description)));
    }

    let Some(result) = response.chart.result.and_then(|r| r.into_iter().next()) else {
        return Ok(Vec::new());
    };
    let Some(quote) = result.indicators.quote.into_iter().next() else {
        return Ok(Vec::new());
    };

    let open_session_start = result
        .meta
        .and_then(|meta| meta.current_trading_period)
        .and_then(|period| period.regular)
        .filter(|session| now < session.end)
        .map(|session| session.start);

    let closes = result
        .timestamp
        .iter()
        .zip(quote.close)
        .filter_map(|(ts, close)| {
            if matches!(open_session_start, Some(start) if *ts >= start) {
                debug!("Dropping in-progress bar at {}", ts);
                return None;
            }
            let close = close?;
            let date = DateTime::from_timestamp(*ts, 0)?.date_naive();
            Some(DailyClose { date, close })
        })
        .collect();

    Ok(closes)
}
