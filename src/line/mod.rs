//! LINE Messaging API - webhook events, signatures and the reply client

mod client;
mod events;
mod signature;

pub use client::{LineClient, Messenger, MAX_TEXT_LENGTH};
pub use events::{parse_events, EventMessage, InboundText, MessageEvent, Source, WebhookEvent, WebhookPayload};
pub use signature::{SignatureVerifier, SIGNATURE_HEADER};
