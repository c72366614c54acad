//! Stock tools
//!
//! Three tools over daily closing prices: latest close, percent change over a
//! trailing window, and best performer among several symbols. The arithmetic
//! lives in plain functions over `DailyClose` slices; the `Tool` impls only
//! fetch data and serialize the outcome.
//!
//! Every outcome is either a full success payload or a single `StockFailure`.
//! Both serialize to JSON with a `status` field so the model can tell a failed
//! lookup apart from a legitimate 0% or negative change.

use async_trait::async_trait;
use chrono::NaiveDate;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

use super::traits::{parse_args, schema_for, Tool, ToolResult};
use crate::error::Result;
use crate::market::{trailing, DailyClose, MarketData};

/// Calendar days fetched for a latest-price lookup
pub const PRICE_LOOKBACK_DAYS: u32 = 7;

/// Why a stock computation produced no figure
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StockFailure {
    /// The symbol returned no prices at all
    #[error("No price data found for {symbol}")]
    NoData { symbol: String },

    /// Fewer than two closes inside the window
    #[error("Not enough price history for {symbol}: {points} data point(s) in the last {days} day(s)")]
    InsufficientData { symbol: String, days: u32, points: usize },

    /// Window length of zero
    #[error("Period must be at least 1 day")]
    InvalidPeriod,

    /// The first close of the window is zero, so no percentage exists
    #[error("First close of the window for {symbol} is zero")]
    ZeroBasePrice { symbol: String },

    /// The market data provider could not be reached or answered garbage
    #[error("Market data unavailable for {symbol}: {detail}")]
    DataUnavailable { symbol: String, detail: String },

    /// Nothing left to compare: empty input, or every symbol failed
    #[error("No symbol had enough data to compare")]
    NoComparableData { skipped: Vec<String> },
}

impl StockFailure {
    /// Stable machine-readable reason
    pub fn reason(&self) -> &'static str {
        match self {
            StockFailure::NoData { .. } => "no_data",
            StockFailure::InsufficientData { .. } => "insufficient_data",
            StockFailure::InvalidPeriod => "invalid_period",
            StockFailure::ZeroBasePrice { .. } => "zero_base_price",
            StockFailure::DataUnavailable { .. } => "data_unavailable",
            StockFailure::NoComparableData { .. } => "no_comparable_data",
        }
    }

    /// JSON payload handed to the model
    pub fn to_payload(&self) -> Value {
        serde_json::json!({
            "status": "error",
            "reason": self.reason(),
            "message": self.to_string(),
        })
    }
}

/// Latest close of one symbol
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StockPrice {
    pub symbol: String,
    pub price: f64,
    pub as_of: NaiveDate,
}

/// Percent change over a trailing window
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceChange {
    pub symbol: String,
    pub days: u32,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub start_price: f64,
    pub end_price: f64,
    /// Full precision; only `display` is rounded
    pub percent_change: f64,
}

/// Winner of a best-performer comparison
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BestPerformer {
    pub symbol: String,
    pub days: u32,
    pub percent_change: f64,
    /// Symbols left out of the comparison because they failed
    pub skipped: Vec<String>,
}

/// Render a percentage with sign and two decimals
pub fn format_percent(value: f64) -> String {
    format!("{:+.2}%", value)
}

/// Serialize a success value with `status` and a rounded display string
fn success_payload<T: Serialize>(value: &T, display: String) -> Value {
    let mut payload = serde_json::to_value(value).unwrap_or_else(|_| serde_json::json!({}));
    if let Some(obj) = payload.as_object_mut() {
        obj.insert("status".into(), Value::from("success"));
        obj.insert("display".into(), Value::from(display));
    }
    payload
}

impl StockPrice {
    pub fn to_payload(&self) -> Value {
        success_payload(self, format!("{} closed at {:.2} on {}", self.symbol, self.price, self.as_of))
    }
}

impl PriceChange {
    pub fn to_payload(&self) -> Value {
        success_payload(
            self,
            format!(
                "{} {} over the last {} trading day(s) ({:.2} -> {:.2})",
                self.symbol,
                format_percent(self.percent_change),
                self.days,
                self.start_price,
                self.end_price
            ),
        )
    }
}

impl BestPerformer {
    pub fn to_payload(&self) -> Value {
        success_payload(
            self,
            format!(
                "{} performed best with {} over the last {} trading day(s)",
                self.symbol,
                format_percent(self.percent_change),
                self.days
            ),
        )
    }
}

/// Latest close in a series
pub fn latest_close(symbol: &str, closes: &[DailyClose]) -> std::result::Result<StockPrice, StockFailure> {
    let last = closes.last().ok_or_else(|| StockFailure::NoData { symbol: symbol.to_string() })?;
    Ok(StockPrice {
        symbol: symbol.to_string(),
        price: last.close,
        as_of: last.date,
    })
}

/// `(last - first) / first * 100` over the most recent `days` closes
pub fn percent_change(
    symbol: &str,
    closes: &[DailyClose],
    days: u32,
) -> std::result::Result<PriceChange, StockFailure> {
    if days == 0 {
        return Err(StockFailure::InvalidPeriod);
    }
    if closes.is_empty() {
        return Err(StockFailure::NoData { symbol: symbol.to_string() });
    }

    let window = trailing(closes, days as usize);
    let (first, last) = match window {
        [first, .., last] => (first, last),
        _ => {
            return Err(StockFailure::InsufficientData {
                symbol: symbol.to_string(),
                days,
                points: window.len(),
            })
        }
    };

    if first.close == 0.0 {
        return Err(StockFailure::ZeroBasePrice { symbol: symbol.to_string() });
    }

    Ok(PriceChange {
        symbol: symbol.to_string(),
        days,
        start_date: first.date,
        end_date: last.date,
        start_price: first.close,
        end_price: last.close,
        percent_change: (last.close - first.close) / first.close * 100.0,
    })
}

/// Pick the maximum among successful changes. Ties keep the earlier symbol.
pub fn best_performer(
    days: u32,
    outcomes: Vec<(String, std::result::Result<PriceChange, StockFailure>)>,
) -> std::result::Result<BestPerformer, StockFailure> {
    if days == 0 {
        return Err(StockFailure::InvalidPeriod);
    }

    let mut best: Option<PriceChange> = None;
    let mut skipped = Vec::new();

    for (symbol, outcome) in outcomes {
        match outcome {
            Ok(change) => {
                let better = match &best {
                    Some(current) => change.percent_change > current.percent_change,
                    None => true,
                };
                if better {
                    best = Some(change);
                }
            }
            Err(failure) => {
                debug!("Skipping {} in comparison: {}", symbol, failure);
                skipped.push(symbol);
            }
        }
    }

    match best {
        Some(winner) => Ok(BestPerformer {
            symbol: winner.symbol,
            days,
            percent_change: winner.percent_change,
            skipped,
        }),
        None => Err(StockFailure::NoComparableData { skipped }),
    }
}

/// Calendar days to request so that `days` trading days fit, weekends and holidays included
fn lookback_for(days: u32) -> u32 {
    days.saturating_mul(7) / 5 + 10
}

fn normalize_symbol(symbol: &str) -> String {
    symbol.trim().to_uppercase()
}

async fn fetch(
    market: &dyn MarketData,
    symbol: &str,
    lookback_days: u32,
) -> std::result::Result<Vec<DailyClose>, StockFailure> {
    market.daily_closes(symbol, lookback_days).await.map_err(|e| {
        warn!("Market data fetch failed for {}: {}", symbol, e);
        StockFailure::DataUnavailable {
            symbol: symbol.to_string(),
            detail: e.to_string(),
        }
    })
}

/// Latest known close of `symbol`
pub async fn get_stock_price(market: &dyn MarketData, symbol: &str) -> std::result::Result<StockPrice, StockFailure> {
    let symbol = normalize_symbol(symbol);
    let closes = fetch(market, &symbol, PRICE_LOOKBACK_DAYS).await?;
    latest_close(&symbol, &closes)
}

/// Percent change of `symbol` over its last `days` closes
pub async fn get_price_change_percent(
    market: &dyn MarketData,
    symbol: &str,
    days: u32,
) -> std::result::Result<PriceChange, StockFailure> {
    if days == 0 {
        return Err(StockFailure::InvalidPeriod);
    }
    let symbol = normalize_symbol(symbol);
    let closes = fetch(market, &symbol, lookback_for(days)).await?;
    percent_change(&symbol, &closes, days)
}

/// Best percent change among `symbols` over the same window
pub async fn get_best_performing(
    market: &dyn MarketData,
    symbols: &[String],
    days: u32,
) -> std::result::Result<BestPerformer, StockFailure> {
    if days == 0 {
        return Err(StockFailure::InvalidPeriod);
    }

    let mut outcomes = Vec::with_capacity(symbols.len());
    for symbol in symbols {
        let outcome = get_price_change_percent(market, symbol, days).await;
        outcomes.push((normalize_symbol(symbol), outcome));
    }
    best_performer(days, outcomes)
}

fn to_tool_result<T>(outcome: std::result::Result<T, StockFailure>, payload: impl Fn(&T) -> Value) -> ToolResult {
    match outcome {
        Ok(value) => ToolResult::json(&payload(&value)),
        Err(failure) => ToolResult::failure_json(&failure.to_payload(), failure.to_string()),
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
struct StockPriceArgs {
    /// Ticker symbol, e.g. "AAPL" or "2330.TW"
    symbol: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct PriceChangeArgs {
    /// Ticker symbol, e.g. "AAPL" or "2330.TW"
    symbol: String,
    /// Number of most recent trading days in the window (at least 2 for a change)
    days: u32,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct BestPerformingArgs {
    /// Ticker symbols to compare
    symbols: Vec<String>,
    /// Number of most recent trading days in the window
    days: u32,
}

/// `get_stock_price` tool
pub struct StockPriceTool {
    market: Arc<dyn MarketData>,
}

impl StockPriceTool {
    pub fn new(market: Arc<dyn MarketData>) -> Self {
        Self { market }
    }
}

#[async_trait]
impl Tool for StockPriceTool {
    fn name(&self) -> &str {
        "get_stock_price"
    }

    fn description(&self) -> &str {
        "Get the most recent closing price of a stock."
    }

    fn parameters_schema(&self) -> Value {
        schema_for::<StockPriceArgs>()
    }

    async fn execute(&self, args: Value) -> Result<ToolResult> {
        let args: StockPriceArgs = parse_args(args)?;
        let outcome = get_stock_price(self.market.as_ref(), &args.symbol).await;
        Ok(to_tool_result(outcome, StockPrice::to_payload))
    }
}

/// `get_price_change_percent` tool
pub struct PriceChangeTool {
    market: Arc<dyn MarketData>,
}

impl PriceChangeTool {
    pub fn new(market: Arc<dyn MarketData>) -> Self {
        Self { market }
    }
}

#[async_trait]
impl Tool for PriceChangeTool {
    fn name(&self) -> &str {
        "get_price_change_percent"
    }

    fn description(&self) -> &str {
        "Calculate the percentage change of a stock's closing price over the last N trading days."
    }

    fn parameters_schema(&self) -> Value {
        schema_for::<PriceChangeArgs>()
    }

    async fn execute(&self, args: Value) -> Result<ToolResult> {
        let args: PriceChangeArgs = parse_args(args)?;
        let outcome = get_price_change_percent(self.market.as_ref(), &args.symbol, args.days).await;
        Ok(to_tool_result(outcome, PriceChange::to_payload))
    }
}

/// `get_best_performing` tool
pub struct BestPerformingTool {
    market: Arc<dyn MarketData>,
}

impl BestPerformingTool {
    pub fn new(market: Arc<dyn MarketData>) -> Self {
        Self { market }
    }
}

#[async_trait]
impl Tool for BestPerformingTool {
    fn name(&self) -> &str {
        "get_best_performing"
    }

    fn description(&self) -> &str {
        "Find which stock in a list had the highest percentage change over the last N trading days."
    }

    fn parameters_schema(&self) -> Value {
        schema_for::<BestPerformingArgs>()
    }

    async fn execute(&self, args: Value) -> Result<ToolResult> {
        let args: BestPerformingArgs = parse_args(args)?;
        let outcome = get_best_performing(self.market.as_ref(), &args.symbols, args.days).await;
        Ok(to_tool_result(outcome, BestPerformer::to_payload))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use std::collections::HashMap;

    fn series(values: &[f64]) -> Vec<DailyClose> {
        values
            .iter()
            .enumerate()
            .map(|(i, close)| DailyClose {
                date: NaiveDate::from_ymd_opt(2024, 5, 1 + i as u32).unwrap(),
                close: *close,
            })
            .collect()
    }

    /// Serves fixed series; symbols mapped to `None` fail upstream
    struct FixedMarket(HashMap<String, Option<Vec<f64>>>);

    impl FixedMarket {
        fn new(entries: &[(&str, Option<&[f64]>)]) -> Arc<Self> {
            Arc::new(FixedMarket(
                entries
                    .iter()
                    .map(|(s, v)| (s.to_string(), v.map(|v| v.to_vec())))
                    .collect(),
            ))
        }
    }

    #[async_trait]
    impl MarketData for FixedMarket {
        async fn daily_closes(&self, symbol: &str, _lookback_days: u32) -> Result<Vec<DailyClose>> {
            match self.0.get(symbol) {
                Some(Some(values)) => Ok(series(values)),
                Some(None) => Err(Error::Provider("upstream down".into())),
                None => Ok(Vec::new()),
            }
        }
    }

    fn change(symbol: &str, pct: f64) -> (String, std::result::Result<PriceChange, StockFailure>) {
        let date = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        (
            symbol.to_string(),
            Ok(PriceChange {
                symbol: symbol.to_string(),
                days: 5,
                start_date: date,
                end_date: date,
                start_price: 100.0,
                end_price: 100.0 + pct,
                percent_change: pct,
            }),
        )
    }

    fn failed(symbol: &str) -> (String, std::result::Result<PriceChange, StockFailure>) {
        (symbol.to_string(), Err(StockFailure::NoData { symbol: symbol.to_string() }))
    }

    #[test]
    fn test_percent_change_uses_trailing_window() {
        let closes = series(&[50.0, 100.0, 90.0, 110.0, 120.0]);
        let change = percent_change("AAPL", &closes, 3).unwrap();
        assert_eq!(change.start_price, 90.0);
        assert_eq!(change.end_price, 120.0);
        assert!((change.percent_change - 33.333_333_333).abs() < 1e-6);

        // Window longer than the series covers everything available.
        let all = percent_change("AAPL", &closes, 30).unwrap();
        assert!((all.percent_change - 140.0).abs() < 1e-9);
    }

    #[test]
    fn test_percent_change_failures() {
        assert_eq!(percent_change("X", &series(&[1.0, 2.0]), 0), Err(StockFailure::InvalidPeriod));
        assert!(matches!(percent_change("X", &[], 5), Err(StockFailure::NoData { .. })));
        assert!(matches!(
            percent_change("X", &series(&[1.0, 2.0, 3.0]), 1),
            Err(StockFailure::InsufficientData { points: 1, .. })
        ));
        assert!(matches!(
            percent_change("X", &series(&[0.0, 2.0]), 2),
            Err(StockFailure::ZeroBasePrice { .. })
        ));
    }

    #[test]
    fn test_best_performer_picks_max() {
        let best = best_performer(5, vec![change("A", 1.5), failed("B"), change("C", 4.25), change("D", -3.0)]).unwrap();
        assert_eq!(best.symbol, "C");
        assert_eq!(best.percent_change, 4.25);
        assert_eq!(best.skipped, vec!["B".to_string()]);
    }

    #[test]
    fn test_best_performer_tie_keeps_first() {
        let best = best_performer(5, vec![change("A", 2.0), change("B", 2.0)]).unwrap();
        assert_eq!(best.symbol, "A");
    }

    #[test]
    fn test_best_performer_compares_full_precision() {
        // Both round to 2.00 but B is strictly larger.
        let best = best_performer(5, vec![change("A", 2.001), change("B", 2.004)]).unwrap();
        assert_eq!(best.symbol, "B");
    }

    #[test]
    fn test_empty_and_all_failing_lists_fail_the_same_way() {
        let empty = best_performer(5, Vec::new()).unwrap_err();
        let all_failed = best_performer(5, vec![failed("A"), failed("B")]).unwrap_err();
        assert_eq!(empty.reason(), "no_comparable_data");
        assert_eq!(all_failed.reason(), empty.reason());
        assert_eq!(all_failed.to_payload()["status"], empty.to_payload()["status"]);
    }

    #[test]
    fn test_failure_distinguishable_from_zero_and_negative() {
        let flat = percent_change("F", &series(&[10.0, 10.0]), 2).unwrap().to_payload();
        let down = percent_change("D", &series(&[10.0, 8.0]), 2).unwrap().to_payload();
        let failure = StockFailure::NoData { symbol: "N".into() }.to_payload();

        assert_eq!(flat["status"], "success");
        assert_eq!(flat["percent_change"], 0.0);
        assert_eq!(down["status"], "success");
        assert_eq!(down["display"].as_str().unwrap().split_whitespace().nth(1), Some("-20.00%"));
        assert_eq!(failure["status"], "error");
        assert!(failure.get("percent_change").is_none());
    }

    #[test]
    fn test_format_percent() {
        assert_eq!(format_percent(3.14159), "+3.14%");
        assert_eq!(format_percent(-1.234), "-1.23%");
        assert_eq!(format_percent(0.0), "+0.00%");
    }

    #[tokio::test]
    async fn test_get_stock_price_latest_close() {
        let market = FixedMarket::new(&[("AAPL", Some(&[180.0, 182.5][..]))]);
        let price = get_stock_price(market.as_ref(), " aapl ").await.unwrap();
        assert_eq!(price.symbol, "AAPL");
        assert_eq!(price.price, 182.5);

        let missing = get_stock_price(market.as_ref(), "NOPE").await.unwrap_err();
        assert_eq!(missing.reason(), "no_data");
    }

    #[tokio::test]
    async fn test_get_best_performing_skips_failures() {
        let market = FixedMarket::new(&[
            ("AAPL", Some(&[100.0, 105.0][..])),
            ("MSFT", None),
            ("NVDA", Some(&[100.0, 120.0][..])),
        ]);
        let symbols: Vec<String> = ["AAPL", "MSFT", "NVDA", "ZZZZ"].iter().map(|s| s.to_string()).collect();
        let best = get_best_performing(market.as_ref(), &symbols, 2).await.unwrap();
        assert_eq!(best.symbol, "NVDA");
        assert!((best.percent_change - 20.0).abs() < 1e-9);
        assert_eq!(best.skipped, vec!["MSFT".to_string(), "ZZZZ".to_string()]);

        let none = get_best_performing(market.as_ref(), &[], 2).await.unwrap_err();
        let bad = get_best_performing(market.as_ref(), &["MSFT".to_string()], 2).await.unwrap_err();
        assert_eq!(none.reason(), bad.reason());
    }

    #[tokio::test]
    async fn test_tools_return_structured_payloads() {
        let market = FixedMarket::new(&[("AAPL", Some(&[100.0, 110.0][..]))]);
        let tool = PriceChangeTool::new(market.clone());

        let ok = tool.execute(serde_json::json!({"symbol": "AAPL", "days": 2})).await.unwrap();
        assert!(ok.success);
        let payload: Value = serde_json::from_str(ok.content.as_deref().unwrap()).unwrap();
        assert_eq!(payload["status"], "success");
        assert_eq!(payload["symbol"], "AAPL");

        let zero = tool.execute(serde_json::json!({"symbol": "AAPL", "days": 0})).await.unwrap();
        assert!(!zero.success);
        let payload: Value = serde_json::from_str(&zero.to_string()).unwrap();
        assert_eq!(payload["reason"], "invalid_period");

        assert!(tool.execute(serde_json::json!({"symbol": "AAPL"})).await.is_err());
        assert_eq!(StockPriceTool::new(market).name(), "get_stock_price");
    }
}
