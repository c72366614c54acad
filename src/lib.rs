//! # LineAgent
//!
//! A LINE Messaging API webhook bot backed by tool-calling LLM agents.
//!
//! ## Features
//!
//! - **Signed Webhooks:** HMAC-SHA256 verification of every inbound LINE request
//! - **Agents:** general suggestion (web search), stock analysis and arXiv research personas
//! - **Function Tools:** statically declared tools with typed JSON Schema parameters
//! - **OpenAI-compatible Runtime:** Gemini (AI Studio or Vertex AI) or any compatible endpoint
//! - **Market Data:** daily closing prices from Yahoo Finance with a short-TTL cache

pub mod agent;
pub mod config;
pub mod error;
pub mod gateway;
pub mod line;
pub mod market;
pub mod tools;

pub use config::Config;
pub use error::{Error, Result};

/// Application version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const NAME: &str = env!("CARGO_PKG_NAME");
