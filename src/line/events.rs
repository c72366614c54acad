//! Webhook event payloads
//!
//! Only the parts of the LINE webhook schema the bot acts on are modelled;
//! unknown event and message types deserialize to `Other` instead of failing
//! the whole batch.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Request body delivered to the webhook
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookPayload {
    /// Bot user ID that received the events
    #[serde(default)]
    pub destination: Option<String>,
    /// Events in delivery order
    pub events: Vec<WebhookEvent>,
}

/// A single webhook event
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum WebhookEvent {
    /// A user sent a message
    Message(MessageEvent),
    /// Follow, unfollow, postback, join, ... (not handled)
    #[serde(other)]
    Other,
}

/// Message event body
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageEvent {
    /// Token for the reply API; absent for redelivered events
    #[serde(default)]
    pub reply_token: Option<String>,
    /// Where the message came from
    pub source: Source,
    /// The message itself
    pub message: EventMessage,
    /// Milliseconds since epoch
    #[serde(default)]
    pub timestamp: Option<i64>,
    /// Unique webhook event ID
    #[serde(default)]
    pub webhook_event_id: Option<String>,
}

/// Event source
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Source {
    /// `user`, `group` or `room`
    #[serde(rename = "type")]
    pub kind: String,
    /// Sending user, when the user allows it
    #[serde(default)]
    pub user_id: Option<String>,
    /// Group chat ID
    #[serde(default)]
    pub group_id: Option<String>,
    /// Multi-person chat ID
    #[serde(default)]
    pub room_id: Option<String>,
}

impl Source {
    /// Identifier used to key the conversation session
    pub fn conversation_key(&self) -> String {
        self.user_id
            .as_ref()
            .or(self.group_id.as_ref())
            .or(self.room_id.as_ref())
            .cloned()
            .unwrap_or_else(|| "anonymous".to_string())
    }
}

/// Message content of a message event
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum EventMessage {
    /// Plain text
    Text {
        /// Message ID
        id: String,
        /// Text content
        text: String,
    },
    /// Image upload
    Image {
        /// Message ID
        id: String,
    },
    /// Stickers, audio, video, location, files, ...
    #[serde(other)]
    Other,
}

/// A text message ready for dispatch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundText {
    /// Reply target
    pub reply_token: String,
    /// Session key of the sender
    pub user_id: String,
    /// Message text
    pub text: String,
}

impl WebhookEvent {
    /// Extract the text message this event carries, if any
    pub fn as_text(&self) -> Option<InboundText> {
        match self {
            WebhookEvent::Message(MessageEvent {
                reply_token: Some(reply_token),
                source,
                message: EventMessage::Text { text, .. },
                ..
            }) => Some(InboundText {
                reply_token: reply_token.clone(),
                user_id: source.conversation_key(),
                text: text.clone(),
            }),
            _ => None,
        }
    }

    /// Short label for logs
    pub fn kind(&self) -> &'static str {
        match self {
            WebhookEvent::Message(m) => match m.message {
                EventMessage::Text { .. } => "message/text",
                EventMessage::Image { .. } => "message/image",
                EventMessage::Other => "message/other",
            },
            WebhookEvent::Other => "other",
        }
    }
}

/// Parse a raw webhook body
pub fn parse_events(body: &[u8]) -> Result<Vec<WebhookEvent>> {
    let payload: WebhookPayload =
        serde_json::from_slice(body).map_err(|e| Error::Parse(format!("Invalid webhook payload: {}", e)))?;
    Ok(payload.events)
}
