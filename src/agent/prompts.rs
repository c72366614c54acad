//! Prompt templates and agent instructions

use chrono::{NaiveDate, Utc};
use handlebars::Handlebars;
use serde::Serialize;

use crate::config::AgentKind;
use crate::error::{Error, Result};

/// A prompt template using Handlebars syntax
pub struct PromptTemplate {
    /// Template name
    name: String,
    /// Handlebars registry
    registry: Handlebars<'static>,
}

impl PromptTemplate {
    /// Create a new prompt template
    pub fn new(name: impl Into<String>, template: &str) -> Result<Self> {
        let name = name.into();
        let mut registry = Handlebars::new();
        registry.set_strict_mode(true);
        // Prompts are plain text, not HTML.
        registry.register_escape_fn(handlebars::no_escape);

        registry
            .register_template_string(&name, template)
            .map_err(|e| Error::Internal(format!("Invalid template: {}", e)))?;

        Ok(PromptTemplate { name, registry })
    }

    /// Render the template with given data
    pub fn render<T: Serialize>(&self, data: &T) -> Result<String> {
        self.registry
            .render(&self.name, data)
            .map_err(|e| Error::Internal(format!("Template render error: {}", e)))
    }
}

/// Values available to every instruction template
#[derive(Debug, Clone, Serialize)]
pub struct InstructionContext {
    /// BCP 47 tag of the language replies must be written in
    pub reply_language: String,
    /// Today's date, so relative periods ("last week") can be resolved
    pub today: NaiveDate,
}

impl InstructionContext {
    pub fn new(reply_language: impl Into<String>) -> Self {
        Self {
            reply_language: reply_language.into(),
            today: Utc::now().date_naive(),
        }
    }
}

const SHARED_RULES: &str = r#"
Keep answers short enough to read comfortably in a chat app. Use plain text, not Markdown tables.
If a tool reports an error or finds nothing, say so politely and suggest what the user could try instead.
Today is {{today}}.
Reply in {{reply_language}}."#;

const SUGGESTION_INSTRUCTION: &str = r#"You are a helpful assistant that answers everyday questions and gives practical suggestions.
Use the `web_search` tool when the question depends on current events, prices, opening hours or any fact you are not sure about, and mention the sources you relied on.
Answer directly from your own knowledge when no lookup is needed."#;

const STOCK_INSTRUCTION: &str = r#"You are a stock market assistant. You answer questions about share prices and recent performance.
Use `get_stock_price` for the latest closing price of one ticker.
Use `get_price_change_percent` for how much one ticker moved over the last N trading days.
Use `get_best_performing` to compare several tickers over the same number of trading days.
Tool results are JSON. A result with "status": "error" means the figure could not be computed; never present it as a 0% change.
Use exchange suffixes where needed, for example 2330.TW for TSMC on the Taiwan exchange.
Quote percentages with two decimals and note that prices are daily closes, not live quotes. Do not give investment advice."#;

const ARXIV_INSTRUCTION: &str = r#"You are an AI assistant specializing in the arXiv paper repository.
When the user gives a general topic, use `search_arxiv_papers`.
When the user gives an arXiv link or ID (for example arXiv:2303.10130) and asks for a summary, or gives only the ID, use `summarize_arxiv_paper`. The abstract is the basis of the summary.
When the user gives an arXiv link or ID and asks a specific question about the paper, use `answer_paper_question` and answer from the returned abstract.
When presenting a paper, include its title, authors, arXiv ID and a short summary."#;

/// Instruction template for an agent
pub fn instruction_template(kind: AgentKind) -> String {
    let body = match kind {
        AgentKind::Suggestion => SUGGESTION_INSTRUCTION,
        AgentKind::Stock => STOCK_INSTRUCTION,
        AgentKind::Arxiv => ARXIV_INSTRUCTION,
    };
    format!("{}\n{}", body, SHARED_RULES)
}

/// Render the system instruction for an agent
pub fn render_instruction(kind: AgentKind, context: &InstructionContext) -> Result<String> {
    PromptTemplate::new(kind.as_str(), &instruction_template(kind))?.render(context)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_render() {
        let template = PromptTemplate::new("greet", "Hello {{name}} & co").unwrap();
        let out = template.render(&serde_json::json!({"name": "<Ada>"})).unwrap();
        assert_eq!(out, "Hello <Ada> & co");
    }

    #[test]
    fn test_strict_mode_rejects_missing_fields() {
        let template = PromptTemplate::new("t", "{{missing}}").unwrap();
        assert!(template.render(&serde_json::json!({})).is_err());
    }

    #[test]
    fn test_invalid_template() {
        assert!(PromptTemplate::new("bad", "{{#if x}}never closed").is_err());
    }

    #[test]
    fn test_instructions_carry_language_and_date() {
        let context = InstructionContext {
            reply_language: "zh-TW".into(),
            today: NaiveDate::from_ymd_opt(2024, 6, 3).unwrap(),
        };
        for kind in AgentKind::ALL {
            let text = render_instruction(kind, &context).unwrap();
            assert!(text.ends_with("Reply in zh-TW."), "{}", kind);
            assert!(text.contains("Today is 2024-06-03."));
        }
        assert!(render_instruction(AgentKind::Stock, &context)
            .unwrap()
            .contains("get_best_performing"));
    }
}
