//! Web search tool
//!
//! DuckDuckGo needs no API key. The Instant Answer API is tried first and the
//! HTML endpoint is scraped when it has nothing to say, which is common for
//! news-style or non-English queries.

use async_trait::async_trait;
use reqwest::Client;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use super::traits::{parse_args, schema_for, Tool, ToolResult};
use crate::error::{Error, Result};

const DEFAULT_TIMEOUT_SECS: u64 = 20;
const DEFAULT_COUNT: u8 = 5;
const MAX_COUNT: u8 = 10;

const INSTANT_ANSWER_URL: &str = "https://api.duckduckgo.com/";
const HTML_SEARCH_URL: &str = "https://html.duckduckgo.com/html/";

#[derive(Debug, Deserialize)]
struct InstantAnswer {
    #[serde(rename = "AbstractText")]
    abstract_text: Option<String>,
    #[serde(rename = "AbstractURL")]
    abstract_url: Option<String>,
    #[serde(rename = "AbstractSource")]
    abstract_source: Option<String>,
    #[serde(rename = "Heading")]
    heading: Option<String>,
    #[serde(rename = "RelatedTopics", default)]
    related_topics: Vec<Topic>,
    #[serde(rename = "Results", default)]
    results: Vec<Topic>,
}

#[derive(Debug, Deserialize)]
struct Topic {
    #[serde(rename = "Text")]
    text: Option<String>,
    #[serde(rename = "FirstURL")]
    first_url: Option<String>,
}

/// A single search hit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    /// Title of the page
    pub title: String,
    /// URL of the page
    pub url: String,
    /// Snippet or description
    pub snippet: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct SearchArgs {
    /// The search query
    query: String,
    /// Number of results to return (1-10, default 5)
    #[serde(default)]
    count: Option<u8>,
}

/// `web_search` tool backed by DuckDuckGo
pub struct WebSearchTool {
    client: Client,
    instant_answer_url: String,
    html_url: String,
}

impl WebSearchTool {
    /// Create a search tool against the public endpoints
    pub fn new() -> Result<Self> {
        Self::with_endpoints(INSTANT_ANSWER_URL, HTML_SEARCH_URL)
    }

    /// Point the tool at other endpoints
    pub fn with_endpoints(instant_answer_url: impl Into<String>, html_url: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .user_agent(concat!("lineagent/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            instant_answer_url: instant_answer_url.into(),
            html_url: html_url.into(),
        })
    }

    async fn search_instant(&self, query: &str, count: usize) -> Result<Vec<SearchResult>> {
        let response = self
            .client
            .get(&self.instant_answer_url)
            .query(&[("q", query), ("format", "json"), ("no_html", "1"), ("skip_disambig", "1")])
            .send()
            .await
            .map_err(|e| Error::Provider(format!("DuckDuckGo request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(Error::Provider(format!(
                "DuckDuckGo search failed with status {}",
                response.status()
            )));
        }

        // The API answers with `application/x-javascript`, so parse the text ourselves.
        let body = response.text().await?;
        let answer: InstantAnswer = serde_json::from_str(&body)
            .map_err(|e| Error::Provider(format!("Failed to parse DuckDuckGo response: {}", e)))?;

        Ok(collect_instant_results(answer, count))
    }

    async fn search_html(&self, query: &str, count: usize) -> Result<Vec<SearchResult>> {
        let response = self
            .client
            .get(&self.html_url)
            .query(&[("q", query)])
            .send()
            .await
            .map_err(|e| Error::Provider(format!("DuckDuckGo HTML request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(Error::Provider(format!(
                "DuckDuckGo HTML search failed with status {}",
                response.status()
            )));
        }

        let html = response.text().await?;
        Ok(scrape_html_results(&html, count))
    }

    /// Run a search, falling back to the HTML endpoint
    pub async fn search(&self, query: &str, count: u8) -> Vec<SearchResult> {
        let count = usize::from(count.clamp(1, MAX_COUNT));

        match self.search_instant(query, count).await {
            Ok(results) if !results.is_empty() => return results,
            Ok(_) => debug!("No instant answer for '{}', scraping HTML results", query),
            Err(e) => debug!("Instant answer lookup failed ({}), scraping HTML results", e),
        }

        match self.search_html(query, count).await {
            Ok(results) => results,
            Err(e) => {
                debug!("HTML search failed: {}", e);
                Vec::new()
            }
        }
    }
}

#[async_trait]
impl Tool for WebSearchTool {
    fn name(&self) -> &str {
        "web_search"
    }

    fn description(&self) -> &str {
        "Search the web. Returns relevant pages with titles, URLs and snippets. Use it for current events and facts you are unsure about."
    }

    fn parameters_schema(&self) -> Value {
        schema_for::<SearchArgs>()
    }

    async fn execute(&self, args: Value) -> Result<ToolResult> {
        let args: SearchArgs = parse_args(args)?;
        let query = args.query.trim();
        if query.is_empty() {
            return Ok(ToolResult::failure("Search query is empty"));
        }

        let results = self.search(query, args.count.unwrap_or(DEFAULT_COUNT)).await;
        if results.is_empty() {
            Ok(ToolResult::success(format!(
                "No direct results found for '{}'. Try rephrasing your query.",
                query
            )))
        } else {
            Ok(ToolResult::success(format_search_results(&results)))
        }
    }
}

fn collect_instant_results(answer: InstantAnswer, count: usize) -> Vec<SearchResult> {
    let mut results = Vec::new();

    if let (Some(text), Some(url)) = (&answer.abstract_text, &answer.abstract_url) {
        if !text.is_empty() {
            let title = answer
                .heading
                .clone()
                .or_else(|| answer.abstract_source.clone())
                .unwrap_or_default();
            results.push(SearchResult {
                title,
                url: url.clone(),
                snippet: text.clone(),
            });
        }
    }

    for topic in answer.results.into_iter().chain(answer.related_topics) {
        if results.len() >= count {
            break;
        }
        if let (Some(text), Some(url)) = (topic.text, topic.first_url) {
            let title = text.split(" - ").next().unwrap_or(&text).chars().take(100).collect();
            results.push(SearchResult { title, url, snippet: text });
        }
    }

    results.truncate(count);
    results
}

fn scrape_html_results(html: &str, count: usize) -> Vec<SearchResult> {
    let mut results = Vec::new();

    for chunk in html.split("class=\"result__a\"").skip(1) {
        if results.len() >= count {
            break;
        }

        let url = chunk
            .split("href=\"")
            .nth(1)
            .and_then(|s| s.split('"').next())
            .map(unwrap_redirect);

        let title = chunk
            .split('>')
            .nth(1)
            .and_then(|s| s.split('<').next())
            .map(html_decode);

        let snippet = chunk
            .split("class=\"result__snippet\"")
            .nth(1)
            .and_then(|s| s.split_once('>'))
            .and_then(|(_, s)| s.split("</a>").next())
            .map(strip_tags)
            .map(|s| html_decode(&s));

        if let (Some(url), Some(title)) = (url, title) {
            if !url.is_empty() && !title.is_empty() {
                results.push(SearchResult {
                    title,
                    url,
                    snippet: snippet.unwrap_or_default(),
                });
            }
        }
    }

    results
}

/// DuckDuckGo wraps result links as `//duckduckgo.com/l/?uddg=<encoded>&rut=...`
fn unwrap_redirect(href: &str) -> String {
    let decoded_href = href.replace("&amp;", "&");
    match decoded_href.split_once("uddg=") {
        Some((_, rest)) => {
            let encoded = rest.split('&').next().unwrap_or(rest);
            url::form_urlencoded::parse(format!("u={}", encoded).as_bytes())
                .next()
                .map(|(_, v)| v.into_owned())
                .unwrap_or_else(|| encoded.to_string())
        }
        None => decoded_href,
    }
}

fn strip_tags(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut in_tag = false;
    for c in s.chars() {
        match c {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => out.push(c),
            _ => {}
        }
    }
    out.trim().to_string()
}

fn html_decode(s: &str) -> String {
    s.replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#x27;", "'")
        .replace("&nbsp;", " ")
}

/// Format search results for the model
pub fn format_search_results(results: &[SearchResult]) -> String {
    let mut output = String::new();

    for (i, result) in results.iter().enumerate() {
        output.push_str(&format!(
            "{}. **{}**\n   URL: {}\n   {}\n\n",
            i + 1,
            result.title,
            result.url,
            result.snippet
        ));
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instant_answer_abstract_first() {
        let answer: InstantAnswer = serde_json::from_str(
            r#"{
                "Heading": "Rust (programming language)",
                "AbstractText": "Rust is a general-purpose programming language.",
                "AbstractURL": "https://en.wikipedia.org/wiki/Rust_(programming_language)",
                "AbstractSource": "Wikipedia",
                "Results": [],
                "RelatedTopics": [
                    {"Text": "Cargo - Rust's package manager", "FirstURL": "https://duckduckgo.com/Cargo"},
                    {"Name": "Category", "Topics": []}
                ]
            }"#,
        )
        .unwrap();

        let results = collect_instant_results(answer, 5);
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].title, "Rust (programming language)");
        assert_eq!(results[1].title, "Cargo");
    }

    #[test]
    fn test_instant_answer_respects_count() {
        let answer: InstantAnswer = serde_json::from_str(
            r#"{"RelatedTopics": [
                {"Text": "a", "FirstURL": "https://a"},
                {"Text": "b", "FirstURL": "https://b"},
                {"Text": "c", "FirstURL": "https://c"}
            ]}"#,
        )
        .unwrap();
        assert_eq!(collect_instant_results(answer, 2).len(), 2);
    }

    #[test]
    fn test_scrape_html_results() {
        let html = r#"
            <div class="result">
              <a rel="nofollow" class="result__a" href="//duckduckgo.com/l/?uddg=https%3A%2F%2Fexample.com%2Fnews%3Fid%3D1&amp;rut=abc">Example &amp; News</a>
              <a class="result__snippet" href="x">Latest <b>TSMC</b> earnings</a>
            </div>
            <div class="result">
              <a rel="nofollow" class="result__a" href="https://direct.example.org/">Direct</a>
            </div>
        "#;

        let results = scrape_html_results(html, 5);
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].url, "https://example.com/news?id=1");
        assert_eq!(results[0].title, "Example & News");
        assert_eq!(results[0].snippet, "Latest TSMC earnings");
        assert_eq!(results[1].url, "https://direct.example.org/");
        assert_eq!(results[1].snippet, "");
    }

    #[test]
    fn test_html_decode() {
        assert_eq!(html_decode("Hello &amp; World"), "Hello & World");
        assert_eq!(html_decode("&lt;tag&gt;"), "<tag>");
    }

    #[test]
    fn test_format_search_results() {
        let results = vec![SearchResult {
            title: "Test Title".to_string(),
            url: "https://example.com".to_string(),
            snippet: "Test snippet".to_string(),
        }];

        let formatted = format_search_results(&results);
        assert!(formatted.starts_with("1. **Test Title**"));
        assert!(formatted.contains("https://example.com"));
    }
}
