//! Tools module - function tools exposed to the agents
//!
//! Each tool implements the `Tool` trait with a schemars-generated parameter
//! schema. Agents get their own `ToolRegistry` holding only their tools.
//!
//! ## Built-in Tools
//!
//! - **web_search**: DuckDuckGo web search (no API key required)
//! - **get_stock_price**, **get_price_change_percent**, **get_best_performing**:
//!   daily-close stock figures from a `MarketData` provider
//! - **search_arxiv_papers**, **summarize_arxiv_paper**, **answer_paper_question**:
//!   arXiv lookups

mod arxiv;
mod registry;
mod stock;
mod traits;
mod web_search;

// Core trait and types
pub use traits::{parse_args, schema_for, Tool, ToolCall, ToolResult};

// Registry
pub use registry::ToolRegistry;

// Built-in tools
pub use arxiv::{
    extract_arxiv_id, match_abstract, parse_feed, question_keywords, AbstractMatch, ArxivClient, Paper,
    PaperQuestionTool, SearchPapersTool, SummarizePaperTool, ARXIV_API_URL,
};
pub use stock::{
    best_performer, format_percent, get_best_performing, get_price_change_percent, get_stock_price, latest_close,
    percent_change, BestPerformer, BestPerformingTool, PriceChange, PriceChangeTool, StockFailure, StockPrice,
    StockPriceTool, PRICE_LOOKBACK_DAYS,
};
pub use web_search::{format_search_results, SearchResult, WebSearchTool};
