//! Agent definitions
//!
//! An agent is a persona (instruction template), a model and the ordered list
//! of tools the model may call. Definitions are built once at startup and
//! shared read-only.

use std::collections::HashMap;
use std::sync::Arc;

use crate::agent::prompts::{instruction_template, InstructionContext, PromptTemplate};
use crate::agent::types::GenerationOptions;
use crate::config::{AgentKind, Config};
use crate::error::{Error, Result};
use crate::market::MarketData;
use crate::tools::{
    ArxivClient, BestPerformingTool, PaperQuestionTool, PriceChangeTool, SearchPapersTool, StockPriceTool,
    SummarizePaperTool, ToolRegistry, WebSearchTool,
};

/// One agent persona
pub struct AgentDefinition {
    pub kind: AgentKind,
    pub description: String,
    pub model: String,
    pub tools: ToolRegistry,
    pub generation: GenerationOptions,
    instruction: PromptTemplate,
    reply_language: String,
}

impl AgentDefinition {
    /// Build a definition from its parts
    pub fn new(
        kind: AgentKind,
        model: impl Into<String>,
        reply_language: impl Into<String>,
        tools: ToolRegistry,
    ) -> Result<Self> {
        Ok(Self {
            kind,
            description: describe(kind).to_string(),
            model: model.into(),
            tools,
            generation: match kind {
                AgentKind::Suggestion => GenerationOptions::balanced(),
                AgentKind::Stock | AgentKind::Arxiv => GenerationOptions::precise(),
            },
            instruction: PromptTemplate::new(kind.as_str(), &instruction_template(kind))?,
            reply_language: reply_language.into(),
        })
    }

    /// Agent name
    pub fn name(&self) -> &'static str {
        self.kind.as_str()
    }

    /// System instruction rendered for today
    pub fn instruction(&self) -> Result<String> {
        self.instruction.render(&InstructionContext::new(&self.reply_language))
    }
}

impl std::fmt::Debug for AgentDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentDefinition")
            .field("name", &self.name())
            .field("model", &self.model)
            .field("tools", &self.tools)
            .finish_non_exhaustive()
    }
}

fn describe(kind: AgentKind) -> &'static str {
    match kind {
        AgentKind::Suggestion => "General assistant that answers questions and gives suggestions, with web search.",
        AgentKind::Stock => "Stock assistant for closing prices, price changes and best performers.",
        AgentKind::Arxiv => "Research assistant that searches, summarizes and answers questions about arXiv papers.",
    }
}

/// External clients the tools are built on
#[derive(Clone)]
pub struct Toolkit {
    pub market: Arc<dyn MarketData>,
    pub arxiv: ArxivClient,
    pub web_search: Arc<WebSearchTool>,
}

impl Toolkit {
    /// Ordered tool list of one agent
    pub fn tools_for(&self, kind: AgentKind) -> ToolRegistry {
        let mut registry = ToolRegistry::new();
        match kind {
            AgentKind::Suggestion => registry.register_arc(self.web_search.clone()),
            AgentKind::Stock => {
                registry.register(StockPriceTool::new(self.market.clone()));
                registry.register(PriceChangeTool::new(self.market.clone()));
                registry.register(BestPerformingTool::new(self.market.clone()));
            }
            AgentKind::Arxiv => {
                registry.register(SearchPapersTool::new(self.arxiv.clone()));
                registry.register(SummarizePaperTool::new(self.arxiv.clone()));
                registry.register(PaperQuestionTool::new(self.arxiv.clone()));
            }
        }
        registry
    }
}

/// Every configured agent, by kind
#[derive(Debug, Clone)]
pub struct AgentCatalog {
    agents: HashMap<AgentKind, Arc<AgentDefinition>>,
}

impl AgentCatalog {
    /// Build all agents from config
    pub fn build(config: &Config, toolkit: &Toolkit) -> Result<Self> {
        let model = config.provider.model_id();
        let mut agents = HashMap::new();
        for kind in AgentKind::ALL {
            let definition = AgentDefinition::new(kind, &model, &config.agent.reply_language, toolkit.tools_for(kind))?;
            agents.insert(kind, Arc::new(definition));
        }
        Ok(Self { agents })
    }

    /// Catalog from prebuilt definitions
    pub fn from_definitions(definitions: impl IntoIterator<Item = AgentDefinition>) -> Self {
        Self {
            agents: definitions.into_iter().map(|d| (d.kind, Arc::new(d))).collect(),
        }
    }

    /// Look up an agent
    pub fn get(&self, kind: AgentKind) -> Result<Arc<AgentDefinition>> {
        self.agents
            .get(&kind)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("Agent not configured: {}", kind)))
    }

    /// Number of agents
    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::DailyClose;
    use async_trait::async_trait;

    struct NoMarket;

    #[async_trait]
    impl MarketData for NoMarket {
        async fn daily_closes(&self, _symbol: &str, _lookback_days: u32) -> Result<Vec<DailyClose>> {
            Ok(Vec::new())
        }
    }

    fn toolkit() -> Toolkit {
        Toolkit {
            market: Arc::new(NoMarket),
            arxiv: ArxivClient::new().unwrap(),
            web_search: Arc::new(WebSearchTool::new().unwrap()),
        }
    }

    #[test]
    fn test_agent_tool_lists() {
        let kit = toolkit();
        assert_eq!(kit.tools_for(AgentKind::Suggestion).names(), vec!["web_search"]);
        assert_eq!(
            kit.tools_for(AgentKind::Stock).names(),
            vec!["get_stock_price", "get_price_change_percent", "get_best_performing"]
        );
        assert_eq!(
            kit.tools_for(AgentKind::Arxiv).names(),
            vec!["search_arxiv_papers", "summarize_arxiv_paper", "answer_paper_question"]
        );
    }

    #[test]
    fn test_catalog_builds_every_agent() {
        let catalog = AgentCatalog::build(&Config::default(), &toolkit()).unwrap();
        assert_eq!(catalog.len(), 3);

        let stock = catalog.get(AgentKind::Stock).unwrap();
        assert_eq!(stock.name(), "stock");
        assert_eq!(stock.model, "gemini-2.0-flash");
        assert!(stock.instruction().unwrap().contains("Reply in zh-TW."));
    }

    #[test]
    fn test_missing_agent_is_not_found() {
        let only_stock = AgentDefinition::new(AgentKind::Stock, "m", "en", ToolRegistry::new()).unwrap();
        let catalog = AgentCatalog::from_definitions([only_stock]);
        assert!(matches!(catalog.get(AgentKind::Arxiv), Err(Error::NotFound(_))));
    }
}
