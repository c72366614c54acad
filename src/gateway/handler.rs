//! HTTP handlers

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use tracing::{debug, warn};

use crate::error::Error;
use crate::gateway::AppState;
use crate::line::{parse_events, SIGNATURE_HEADER};

/// A webhook request refused before any event ran
#[derive(Debug)]
pub struct WebhookRejection(pub Error);

impl IntoResponse for WebhookRejection {
    fn into_response(self) -> Response {
        let status = match self.0 {
            Error::InvalidSignature => StatusCode::UNAUTHORIZED,
            Error::Parse(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, self.0.to_string()).into_response()
    }
}

impl From<Error> for WebhookRejection {
    fn from(err: Error) -> Self {
        WebhookRejection(err)
    }
}

/// `POST /` and `POST /callback`
pub async fn webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<&'static str, WebhookRejection> {
    let signature = headers.get(SIGNATURE_HEADER).and_then(|v| v.to_str().ok());
    if let Err(e) = state.verifier.verify(&body, signature) {
        warn!("Rejected webhook with missing or invalid signature");
        return Err(e.into());
    }

    let events = parse_events(&body)?;
    debug!("Webhook carried {} events", events.len());

    state.dispatcher.dispatch(&events).await;
    Ok("OK")
}

/// `GET /health`
pub async fn health() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(serde_json::json!({
            "status": "healthy",
            "service": crate::NAME,
            "version": crate::VERSION,
        })),
    )
}
