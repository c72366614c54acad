//! arXiv tools
//!
//! Search, fetch-by-ID and a keyword check of a question against a paper's
//! abstract. Talks to the public export API, which answers with an Atom feed.

use async_trait::async_trait;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use regex::Regex;
use reqwest::Client;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::LazyLock;
use std::time::Duration;
use tracing::debug;

use super::traits::{parse_args, schema_for, Tool, ToolResult};
use crate::error::{Error, Result};

/// Public export API
pub const ARXIV_API_URL: &str = "http://export.arxiv.org/api/query";

const SEARCH_LIMIT: usize = 5;
const DEFAULT_TIMEOUT_SECS: u64 = 20;

static ARXIV_ID_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d{4}\.\d{4,5}(?:v\d+)?|[a-zA-Z][a-zA-Z.-]*/\d{7}(?:v\d+)?)").unwrap()
});

const STOP_WORDS: &[&str] = &[
    "a", "an", "the", "is", "are", "was", "were", "be", "been", "being", "have", "has", "had", "do", "does", "did",
    "will", "would", "should", "can", "could", "may", "might", "must", "and", "but", "or", "nor", "for", "so", "yet",
    "in", "on", "at", "by", "from", "to", "with", "about", "above", "after", "again", "against", "all", "am", "as",
    "because", "before", "below", "between", "both", "during", "each", "few", "further", "here", "how", "i", "if",
    "into", "it", "its", "itself", "just", "me", "more", "most", "my", "myself", "no", "not", "now", "of", "off",
    "once", "only", "other", "our", "ours", "ourselves", "out", "over", "own", "same", "she", "he", "they", "them",
    "their", "theirs", "themselves", "then", "there", "these", "this", "those", "through", "too", "under", "until",
    "up", "very", "we", "what", "when", "where", "which", "while", "who", "whom", "why", "you", "your", "yours",
    "yourself", "yourselves",
];

/// Pull an arXiv identifier out of a bare ID, an abs/pdf URL or free text
pub fn extract_arxiv_id(input: &str) -> Option<String> {
    ARXIV_ID_RE.find(input).map(|m| m.as_str().to_string())
}

/// Lowercased words of a question minus stop words
pub fn question_keywords(question: &str) -> Vec<String> {
    question
        .to_lowercase()
        .split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .filter(|w| !w.is_empty() && !STOP_WORDS.contains(w))
        .map(str::to_string)
        .collect()
}

/// How well an abstract covers a question
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AbstractMatch {
    /// More than half of the keywords occur in the abstract
    FoundInAbstract,
    /// Half or fewer occur
    NotFoundInAbstract,
    /// Nothing left after dropping stop words
    NotEnoughKeywords,
}

impl AbstractMatch {
    fn message(&self) -> &'static str {
        match self {
            AbstractMatch::FoundInAbstract => {
                "The abstract may contain information relevant to the question. Review it to answer."
            }
            AbstractMatch::NotFoundInAbstract => {
                "The abstract does not appear to cover this question."
            }
            AbstractMatch::NotEnoughKeywords => {
                "The question has no significant keywords after removing common words. Ask the user to be more specific."
            }
        }
    }
}

/// Substring match of question keywords against an abstract
pub fn match_abstract(question: &str, abstract_text: &str) -> AbstractMatch {
    let keywords = question_keywords(question);
    if keywords.is_empty() {
        return AbstractMatch::NotEnoughKeywords;
    }

    let haystack = abstract_text.to_lowercase();
    let found = keywords.iter().filter(|k| haystack.contains(k.as_str())).count();

    if found * 2 > keywords.len() {
        AbstractMatch::FoundInAbstract
    } else {
        AbstractMatch::NotFoundInAbstract
    }
}

/// One paper from the feed
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Paper {
    pub arxiv_id: String,
    pub title: String,
    pub authors: Vec<String>,
    pub published_date: String,
    pub summary: String,
    pub primary_category: Option<String>,
    pub pdf_link: Option<String>,
}

/// Leaf elements whose text is captured
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EntryField {
    Id,
    Title,
    Summary,
    Published,
    AuthorName,
}

impl EntryField {
    fn for_element(name: &[u8], in_author: bool) -> Option<Self> {
        match name {
            b"id" => Some(EntryField::Id),
            b"title" => Some(EntryField::Title),
            b"summary" => Some(EntryField::Summary),
            b"published" => Some(EntryField::Published),
            b"name" if in_author => Some(EntryField::AuthorName),
            _ => None,
        }
    }
}

#[derive(Debug, Default)]
struct EntryBuilder {
    id_url: String,
    title: String,
    summary: String,
    published: String,
    authors: Vec<String>,
    primary_category: Option<String>,
    pdf_link: Option<String>,
}

impl EntryBuilder {
    fn set(&mut self, field: EntryField, text: String) {
        match field {
            EntryField::Id => self.id_url = text,
            EntryField::Title => self.title = text,
            EntryField::Summary => self.summary = text,
            EntryField::Published => self.published = text,
            EntryField::AuthorName => self.authors.push(text),
        }
    }

    /// Pick up `<link>` and `<arxiv:primary_category>` attributes
    fn element(&mut self, element: &BytesStart<'_>) -> Result<()> {
        match element.local_name().as_ref() {
            b"link" if self.pdf_link.is_none() => {
                let is_pdf = attribute(element, "title")?.as_deref() == Some("pdf")
                    || attribute(element, "type")?.as_deref() == Some("application/pdf");
                if is_pdf {
                    self.pdf_link = attribute(element, "href")?;
                }
            }
            b"primary_category" => self.primary_category = attribute(element, "term")?,
            _ => {}
        }
        Ok(())
    }

    fn finish(self) -> Option<Paper> {
        // Unknown IDs come back as a pseudo-entry pointing at the error docs.
        if self.id_url.is_empty() || self.id_url.contains("/api/errors") {
            return None;
        }
        let arxiv_id = self
            .id_url
            .split_once("/abs/")
            .map(|(_, id)| id.to_string())
            .unwrap_or_else(|| self.id_url.clone());

        Some(Paper {
            arxiv_id,
            title: self.title,
            authors: self.authors,
            published_date: self.published.chars().take(10).collect(),
            summary: self.summary,
            primary_category: self.primary_category,
            pdf_link: self.pdf_link,
        })
    }
}

fn malformed(e: impl std::fmt::Display) -> Error {
    Error::Provider(format!("Malformed arXiv feed: {}", e))
}

fn attribute(element: &BytesStart<'_>, name: &str) -> Result<Option<String>> {
    match element.try_get_attribute(name).map_err(malformed)? {
        Some(attr) => Ok(Some(attr.unescape_value().map_err(malformed)?.into_owned())),
        None => Ok(None),
    }
}

/// Parse an Atom feed into papers. Error entries are dropped.
pub fn parse_feed(xml: &str) -> Result<Vec<Paper>> {
    let mut reader = Reader::from_str(xml);
    let mut papers = Vec::new();
    let mut entry: Option<EntryBuilder> = None;
    let mut in_author = false;
    let mut field: Option<EntryField> = None;
    let mut text = String::new();

    loop {
        match reader.read_event().map_err(malformed)? {
            Event::Start(element) => match element.local_name().as_ref() {
                b"entry" => entry = Some(EntryBuilder::default()),
                b"author" => in_author = true,
                name => {
                    if let Some(entry) = entry.as_mut() {
                        entry.element(&element)?;
                        field = EntryField::for_element(name, in_author);
                        text.clear();
                    }
                }
            },
            Event::Empty(element) => {
                if let Some(entry) = entry.as_mut() {
                    entry.element(&element)?;
                }
            }
            Event::Text(content) if field.is_some() => {
                text.push_str(&content.unescape().map_err(malformed)?);
            }
            Event::CData(content) if field.is_some() => {
                text.push_str(&String::from_utf8_lossy(&content.into_inner()));
            }
            Event::End(element) => match element.local_name().as_ref() {
                b"entry" => {
                    if let Some(paper) = entry.take().and_then(EntryBuilder::finish) {
                        papers.push(paper);
                    }
                    field = None;
                }
                b"author" => in_author = false,
                _ => {
                    if let (Some(done), Some(entry)) = (field.take(), entry.as_mut()) {
                        entry.set(done, collapse_whitespace(&text));
                    }
                }
            },
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(papers)
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// arXiv export API client
#[derive(Clone)]
pub struct ArxivClient {
    client: Client,
    base_url: String,
}

impl ArxivClient {
    /// Client for the public API
    pub fn new() -> Result<Self> {
        Self::with_base_url(ARXIV_API_URL)
    }

    /// Client for another endpoint
    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    async fn query(&self, params: &[(&str, &str)]) -> Result<Vec<Paper>> {
        let response = self
            .client
            .get(&self.base_url)
            .query(params)
            .send()
            .await
            .map_err(|e| Error::Provider(format!("arXiv request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(Error::Provider(format!("arXiv API returned status {}", response.status())));
        }

        let body = response.text().await?;
        parse_feed(&body)
    }

    /// Top papers for a free-text query, by relevance
    pub async fn search(&self, query: &str) -> Result<Vec<Paper>> {
        let search_query = format!("all:{}", query.trim());
        let limit = SEARCH_LIMIT.to_string();
        debug!("arXiv search: {}", search_query);
        self.query(&[
            ("search_query", search_query.as_str()),
            ("start", "0"),
            ("max_results", limit.as_str()),
            ("sortBy", "relevance"),
        ])
        .await
    }

    /// Fetch one paper by ID
    pub async fn fetch(&self, arxiv_id: &str) -> Result<Option<Paper>> {
        let papers = self.query(&[("id_list", arxiv_id), ("max_results", "1")]).await?;
        Ok(papers.into_iter().next())
    }
}

fn error_result(message: impl Into<String>) -> ToolResult {
    let message = message.into();
    ToolResult::failure_json(&serde_json::json!({"status": "error", "message": message}), message)
}

async fn resolve_paper(client: &ArxivClient, id_or_url: &str) -> std::result::Result<Paper, ToolResult> {
    let Some(arxiv_id) = extract_arxiv_id(id_or_url) else {
        return Err(error_result("Invalid arXiv ID or URL format."));
    };
    match client.fetch(&arxiv_id).await {
        Ok(Some(paper)) => Ok(paper),
        Ok(None) => Err(error_result(format!("Paper with ID '{}' not found.", arxiv_id))),
        Err(e) => Err(error_result(e.to_string())),
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
struct SearchPapersArgs {
    /// Topic, title words or author names to search for
    query: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct PaperArgs {
    /// arXiv ID (e.g. "2303.10130") or abs/pdf URL
    arxiv_id_or_url: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct PaperQuestionArgs {
    /// arXiv ID (e.g. "2303.10130") or abs/pdf URL
    arxiv_id_or_url: String,
    /// The user's question about the paper
    question: String,
}

/// `search_arxiv_papers` tool
pub struct SearchPapersTool {
    client: ArxivClient,
}

impl SearchPapersTool {
    pub fn new(client: ArxivClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Tool for SearchPapersTool {
    fn name(&self) -> &str {
        "search_arxiv_papers"
    }

    fn description(&self) -> &str {
        "Search arXiv for papers matching a query. Returns up to 5 papers ranked by relevance."
    }

    fn parameters_schema(&self) -> Value {
        schema_for::<SearchPapersArgs>()
    }

    async fn execute(&self, args: Value) -> Result<ToolResult> {
        let args: SearchPapersArgs = parse_args(args)?;
        match self.client.search(&args.query).await {
            Ok(papers) if papers.is_empty() => Ok(ToolResult::json(&serde_json::json!({
                "status": "success",
                "papers": [],
                "message": "No papers found matching the query.",
            }))),
            Ok(papers) => Ok(ToolResult::json(&serde_json::json!({"status": "success", "papers": papers}))),
            Err(e) => Ok(error_result(e.to_string())),
        }
    }
}

/// `summarize_arxiv_paper` tool
pub struct SummarizePaperTool {
    client: ArxivClient,
}

impl SummarizePaperTool {
    pub fn new(client: ArxivClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Tool for SummarizePaperTool {
    fn name(&self) -> &str {
        "summarize_arxiv_paper"
    }

    fn description(&self) -> &str {
        "Fetch an arXiv paper by ID or URL and return its metadata and abstract for summarizing."
    }

    fn parameters_schema(&self) -> Value {
        schema_for::<PaperArgs>()
    }

    async fn execute(&self, args: Value) -> Result<ToolResult> {
        let args: PaperArgs = parse_args(args)?;
        Ok(match resolve_paper(&self.client, &args.arxiv_id_or_url).await {
            Ok(paper) => ToolResult::json(&serde_json::json!({"status": "success", "paper": paper})),
            Err(failure) => failure,
        })
    }
}

/// `answer_paper_question` tool
pub struct PaperQuestionTool {
    client: ArxivClient,
}

impl PaperQuestionTool {
    pub fn new(client: ArxivClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Tool for PaperQuestionTool {
    fn name(&self) -> &str {
        "answer_paper_question"
    }

    fn description(&self) -> &str {
        "Check whether an arXiv paper's abstract covers a question. Returns the abstract and a match verdict."
    }

    fn parameters_schema(&self) -> Value {
        schema_for::<PaperQuestionArgs>()
    }

    async fn execute(&self, args: Value) -> Result<ToolResult> {
        let args: PaperQuestionArgs = parse_args(args)?;
        let paper = match resolve_paper(&self.client, &args.arxiv_id_or_url).await {
            Ok(paper) => paper,
            Err(failure) => return Ok(failure),
        };

        let verdict = match_abstract(&args.question, &paper.summary);
        Ok(ToolResult::json(&serde_json::json!({
            "status": "success",
            "answer_type": verdict,
            "message": verdict.message(),
            "title": paper.title,
            "abstract": paper.summary,
        })))
    }
}
