//! Message routing
//!
//! Picks the agent for an incoming text. A leading slash command (`/stock`,
//! `/search`, `/arxiv`) selects an agent explicitly and is stripped; anything
//! else goes to the configured default agent.

use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::config::AgentKind;

static HF_PAPER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"https?://(?:www\.)?huggingface\.co/papers/(\d{4}\.\d{4,5})").unwrap()
});

/// Input sent to an agent when a command carries no text
pub const EMPTY_COMMAND_PROMPT: &str = "Briefly introduce what you can help me with.";

/// Where a message goes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub agent: AgentKind,
    pub input: String,
}

/// Rewrite Hugging Face paper links to `arXiv:<id>`
///
/// Returns the rewritten text and whether anything changed.
pub fn rewrite_paper_links(text: &str) -> (String, bool) {
    let rewritten = HF_PAPER_RE.replace_all(text, "arXiv:$1");
    let changed = rewritten != text;
    (rewritten.into_owned(), changed)
}

/// Chooses an agent per message
#[derive(Debug, Clone, Copy, Default)]
pub struct Router {
    default: AgentKind,
}

impl Router {
    pub fn new(default: AgentKind) -> Self {
        Router { default }
    }

    /// Default agent
    pub fn default_agent(&self) -> AgentKind {
        self.default
    }

    /// Route one message
    pub fn route(&self, text: &str) -> Route {
        let (text, had_paper_link) = rewrite_paper_links(text.trim());

        if let Some((agent, rest)) = split_command(&text) {
            let input = if rest.is_empty() { EMPTY_COMMAND_PROMPT } else { rest };
            debug!("Routing command to {} agent", agent);
            return Route {
                agent,
                input: input.to_string(),
            };
        }

        let agent = if had_paper_link { AgentKind::Arxiv } else { self.default };
        Route { agent, input: text }
    }
}

// `/name rest...` where name is a known agent. Unknown commands are plain text.
fn split_command(text: &str) -> Option<(AgentKind, &str)> {
    let body = text.strip_prefix('/')?;
    let (name, rest) = match body.find(char::is_whitespace) {
        Some(pos) => (&body[..pos], body[pos..].trim()),
        None => (body, ""),
    };
    let agent = name.parse::<AgentKind>().ok()?;
    Some((agent, rest))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_goes_to_default() {
        let router = Router::new(AgentKind::Suggestion);
        let route = router.route("  Where should I eat in Taipei?  ");
        assert_eq!(route.agent, AgentKind::Suggestion);
        assert_eq!(route.input, "Where should I eat in Taipei?");

        let router = Router::new(AgentKind::Stock);
        assert_eq!(router.route("AAPL?").agent, AgentKind::Stock);
    }

    #[test]
    fn test_command_prefixes() {
        let router = Router::default();

        let route = router.route("/stock best of AAPL, MSFT over 5 days");
        assert_eq!(route.agent, AgentKind::Stock);
        assert_eq!(route.input, "best of AAPL, MSFT over 5 days");

        assert_eq!(router.route("/search weather tomorrow").agent, AgentKind::Suggestion);
        assert_eq!(router.route("/ARXIV diffusion models").agent, AgentKind::Arxiv);
    }

    #[test]
    fn test_bare_command() {
        let route = Router::default().route("/stock");
        assert_eq!(route.agent, AgentKind::Stock);
        assert_eq!(route.input, EMPTY_COMMAND_PROMPT);
    }

    #[test]
    fn test_unknown_command_is_text() {
        let route = Router::default().route("/help me");
        assert_eq!(route.agent, AgentKind::Suggestion);
        assert_eq!(route.input, "/help me");
    }

    #[test]
    fn test_paper_link_rewritten_and_routed() {
        let route = Router::default().route("What is https://huggingface.co/papers/2303.10130 about?");
        assert_eq!(route.agent, AgentKind::Arxiv);
        assert_eq!(route.input, "What is arXiv:2303.10130 about?");
    }

    #[test]
    fn test_explicit_command_wins_over_paper_link() {
        let route = Router::default().route("/search https://huggingface.co/papers/2401.00001");
        assert_eq!(route.agent, AgentKind::Suggestion);
        assert_eq!(route.input, "arXiv:2401.00001");
    }

    #[test]
    fn test_rewrite_without_links() {
        assert_eq!(rewrite_paper_links("hello"), ("hello".to_string(), false));
    }
}
