//! Gateway module - the LINE webhook HTTP server
//!
//! ```text
//!  LINE platform ──POST / (x-line-signature)──▶ handler ──▶ Dispatcher
//!                                                              │
//!                                             Router ◀─────────┤
//!                                          AgentRuntime ◀──────┤
//!                                            Messenger ◀───────┘
//! ```

mod dispatch;
mod handler;

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::line::SignatureVerifier;

pub use dispatch::{DispatchSummary, Dispatcher, FALLBACK_REPLY};
pub use handler::{health, webhook, WebhookRejection};

/// Shared handler state, built once at startup
pub struct AppState {
    pub verifier: SignatureVerifier,
    pub dispatcher: Dispatcher,
}

/// Build the webhook router
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", post(webhook))
        .route("/callback", post(webhook))
        .route("/health", get(health))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}
