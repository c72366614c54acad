//! Event dispatch
//!
//! Events of one webhook request are handled one after another, in delivery
//! order. A failing event gets the fallback reply and never affects the
//! events after it.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::agent::{AgentRuntime, Router};
use crate::error::{Error, Result};
use crate::line::{InboundText, Messenger, WebhookEvent};

/// Reply sent when the agent fails or times out
pub const FALLBACK_REPLY: &str = "Sorry, I encountered an error. Please try again later.";

/// Counts for one dispatched batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchSummary {
    /// Text events answered by an agent
    pub answered: usize,
    /// Text events answered with the fallback text
    pub fallbacks: usize,
    /// Events that produce no reply (non-text, no reply token)
    pub skipped: usize,
    /// Replies the messaging API did not accept
    pub undelivered: usize,
}

/// Routes text events to agents and sends the replies
#[derive(Clone)]
pub struct Dispatcher {
    runtime: Arc<dyn AgentRuntime>,
    messenger: Arc<dyn Messenger>,
    router: Router,
    timeout: Duration,
}

impl Dispatcher {
    pub fn new(runtime: Arc<dyn AgentRuntime>, messenger: Arc<dyn Messenger>, router: Router, timeout: Duration) -> Self {
        Dispatcher {
            runtime,
            messenger,
            router,
            timeout,
        }
    }

    /// Handle a batch of events sequentially
    pub async fn dispatch(&self, events: &[WebhookEvent]) -> DispatchSummary {
        let mut summary = DispatchSummary::default();

        for event in events {
            let Some(inbound) = event.as_text() else {
                debug!("Skipping {} event", event.kind());
                summary.skipped += 1;
                continue;
            };

            let text = match self.answer(&inbound).await {
                Ok(reply) => {
                    summary.answered += 1;
                    reply
                }
                Err(e) => {
                    error!("Agent failed for {}: {}", inbound.user_id, e);
                    summary.fallbacks += 1;
                    FALLBACK_REPLY.to_string()
                }
            };

            if let Err(e) = self.messenger.reply(&inbound.reply_token, &text).await {
                warn!("Reply to {} was not delivered: {}", inbound.user_id, e);
                summary.undelivered += 1;
            }
        }

        info!(
            "Dispatched {} events: answered={}, fallbacks={}, skipped={}",
            events.len(),
            summary.answered,
            summary.fallbacks,
            summary.skipped
        );
        summary
    }

    async fn answer(&self, inbound: &InboundText) -> Result<String> {
        let route = self.router.route(&inbound.text);
        info!("Message from {} routed to {} agent", inbound.user_id, route.agent);

        tokio::time::timeout(self.timeout, self.runtime.run(route.agent, &inbound.user_id, &route.input))
            .await
            .map_err(|_| Error::Timeout(format!("agent did not answer within {:?}", self.timeout)))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AgentKind;
    use crate::line::parse_events;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct SlowRuntime;

    #[async_trait]
    impl AgentRuntime for SlowRuntime {
        async fn run(&self, _agent: AgentKind, _user_id: &str, _input: &str) -> Result<String> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok("late".into())
        }
    }

    struct RoutedTo(Mutex<Vec<(AgentKind, String)>>);

    #[async_trait]
    impl AgentRuntime for RoutedTo {
        async fn run(&self, agent: AgentKind, _user_id: &str, input: &str) -> Result<String> {
            self.0.lock().unwrap().push((agent, input.to_string()));
            Ok("ok".into())
        }
    }

    #[derive(Default)]
    struct Outbox(Mutex<Vec<(String, String)>>);

    #[async_trait]
    impl Messenger for Outbox {
        async fn reply(&self, reply_token: &str, text: &str) -> Result<()> {
            self.0.lock().unwrap().push((reply_token.to_string(), text.to_string()));
            Ok(())
        }
    }

    struct Unreachable;

    #[async_trait]
    impl Messenger for Unreachable {
        async fn reply(&self, _reply_token: &str, _text: &str) -> Result<()> {
            Err(Error::Messaging("Invalid reply token".into()))
        }
    }

    fn text_events(texts: &[&str]) -> Vec<WebhookEvent> {
        let events: Vec<_> = texts
            .iter()
            .enumerate()
            .map(|(i, text)| {
                serde_json::json!({
                    "type": "message",
                    "replyToken": format!("r{}", i),
                    "source": {"type": "user", "userId": "U1"},
                    "message": {"type": "text", "id": format!("m{}", i), "text": text}
                })
            })
            .collect();
        let body = serde_json::json!({ "events": events }).to_string();
        parse_events(body.as_bytes()).unwrap()
    }

    #[tokio::test]
    async fn test_timeout_sends_fallback() {
        let outbox = Arc::new(Outbox::default());
        let dispatcher = Dispatcher::new(Arc::new(SlowRuntime), outbox.clone(), Router::default(), Duration::from_millis(20));

        let summary = dispatcher.dispatch(&text_events(&["hi"])).await;
        assert_eq!(summary.fallbacks, 1);
        assert_eq!(outbox.0.lock().unwrap()[0], ("r0".to_string(), FALLBACK_REPLY.to_string()));
    }

    #[tokio::test]
    async fn test_messages_are_routed() {
        let runtime = Arc::new(RoutedTo(Mutex::new(Vec::new())));
        let dispatcher = Dispatcher::new(
            runtime.clone(),
            Arc::new(Outbox::default()),
            Router::new(AgentKind::Suggestion),
            Duration::from_secs(1),
        );

        dispatcher.dispatch(&text_events(&["/stock AAPL", "lunch?"])).await;
        let seen = runtime.0.lock().unwrap();
        assert_eq!(seen[0], (AgentKind::Stock, "AAPL".to_string()));
        assert_eq!(seen[1], (AgentKind::Suggestion, "lunch?".to_string()));
    }

    #[tokio::test]
    async fn test_delivery_failure_does_not_stop_batch() {
        let runtime = Arc::new(RoutedTo(Mutex::new(Vec::new())));
        let dispatcher = Dispatcher::new(runtime.clone(), Arc::new(Unreachable), Router::default(), Duration::from_secs(1));

        let summary = dispatcher.dispatch(&text_events(&["a", "b"])).await;
        assert_eq!(summary.answered, 2);
        assert_eq!(summary.undelivered, 2);
        assert_eq!(runtime.0.lock().unwrap().len(), 2);
    }
}
