//! DuckDuckGo Instant Answer client

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::DomainError;

#[derive(Debug, Clone)]
pub struct SearchConfig {
    pub base_url: String,
    /// Site linked from the placeholder result when nothing matched
    pub fallback_url: String,
    pub timeout: Duration,
    /// Cap on related topics included
    pub max_related: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.duckduckgo.com".to_string(),
            fallback_url: "https://duckduckgo.com".to_string(),
            timeout: Duration::from_secs(10),
            max_related: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResult {
    pub title: String,
    pub snippet: String,
    pub url: String,
    pub source: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub results: Vec<SearchResult>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct InstantAnswer {
    #[serde(rename = "Abstract")]
    abstract_html: String,
    #[serde(rename = "AbstractText")]
    abstract_text: String,
    #[serde(rename = "Heading")]
    heading: String,
    #[serde(rename = "AbstractURL")]
    abstract_url: String,
    #[serde(rename = "AbstractSource")]
    abstract_source: String,
    #[serde(rename = "RelatedTopics")]
    related_topics: Vec<RelatedTopic>,
}

/// Either a topic or a named group of topics; groups carry no `Text`
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RelatedTopic {
    #[serde(rename = "Text")]
    text: Option<String>,
    #[serde(rename = "FirstURL")]
    first_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct WebSearchClient {
    config: SearchConfig,
    client: reqwest::Client,
}

impl WebSearchClient {
    pub fn new(config: SearchConfig) -> Result<Self, DomainError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| DomainError::configuration(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { config, client })
    }

    pub async fn search(&self, query: &str) -> Result<SearchResponse, DomainError> {
        let url = format!("{}/", self.config.base_url.trim_end_matches('/'));

        let response = self
            .client
            .get(&url)
            .query(&[
                ("q", query),
                ("format", "json"),
                ("no_html", "1"),
                ("skip_disambig", "1"),
            ])
            .send()
            .await
            .map_err(|e| DomainError::upstream(format!("Search request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DomainError::upstream(format!(
                "Search API returned HTTP {}",
                status
            )));
        }

        // The API labels its JSON as javascript, so parse the text directly
        let text = response
            .text()
            .await
            .map_err(|e| DomainError::upstream(format!("Failed to read search response: {}", e)))?;
        let answer: InstantAnswer = serde_json::from_str(&text)
            .map_err(|e| DomainError::upstream(format!("Failed to parse search response: {}", e)))?;

        let mut results = self.collect_results(query, answer);
        if results.is_empty() {
            results.push(self.fallback_result(query));
        }

        debug!(query = %query, results = results.len(), "Web search complete");

        Ok(SearchResponse {
            query: query.to_string(),
            results,
            timestamp: Utc::now(),
        })
    }

    fn collect_results(&self, query: &str, answer: InstantAnswer) -> Vec<SearchResult> {
        let mut results = Vec::new();

        if !answer.abstract_html.is_empty() && !answer.abstract_text.is_empty() {
            results.push(SearchResult {
                title: non_empty_or(answer.heading, query),
                snippet: answer.abstract_text,
                url: answer.abstract_url,
                source: non_empty_or(answer.abstract_source, "DuckDuckGo"),
            });
        }

        let related = answer
            .related_topics
            .into_iter()
            .filter_map(|topic| match (topic.text, topic.first_url) {
                (Some(text), Some(url)) if !text.is_empty() && !url.is_empty() => Some(SearchResult {
                    title: text.split(" - ").next().unwrap_or(&text).to_string(),
                    snippet: text,
                    url,
                    source: "Related".to_string(),
                }),
                _ => None,
            })
            .take(self.config.max_related);

        results.extend(related);
        results
    }

    fn fallback_result(&self, query: &str) -> SearchResult {
        let base = format!("{}/", self.config.fallback_url.trim_end_matches('/'));
        let url = reqwest::Url::parse_with_params(&base, &[("q", query)])
            .map(String::from)
            .unwrap_or(base);

        SearchResult {
            title: format!("Search results for \"{}\"", query),
            snippet: format!("No instant answer found. View full results for \"{}\".", query),
            url,
            source: "DuckDuckGo".to_string(),
        }
    }
}

fn non_empty_or(value: String, fallback: &str) -> String {
    if value.is_empty() {
        fallback.to_string()
    } else {
        value
    }
}
