//! WebSearch Tool
//!
//! Web search against a self-hosted SearxNG instance, with a keyless
//! DuckDuckGo instant-answer fallback when no instance is configured
//! or the instance fails.

use crate::gate::ProviderGate;
use crate::spec::{DirectHandler, ExecContext, ToolFailure, ToolSpec};
use async_trait::async_trait;
use driftwood_foundation::{ArgSchema, ErrorCode, SideEffect};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);
const DEFAULT_MAX_RESULTS: usize = 8;
const MAX_RESULTS_CEILING: f64 = 25.0;

/// A single search hit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    pub title: String,
    pub url: String,
    pub snippet: String,
}

/// WebSearch tool
///
/// Also used directly by the research pipeline, bypassing the model loop.
pub struct WebSearchTool {
    client: Client,
    searx_url: Option<String>,
    gate: ProviderGate,
}

impl WebSearchTool {
    pub fn new(searx_url: Option<String>, gate: ProviderGate) -> Self {
        Self {
            client: Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .user_agent("Driftwood/0.1")
                .build()
                .unwrap_or_default(),
            searx_url,
            gate,
        }
    }

    /// Run a search, preferring SearxNG when configured.
    pub async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchHit>, ToolFailure> {
        if let Some(base) = &self.searx_url {
            let _turn = self.gate.acquire("searx").await;
            match self.search_searx(base, query, max_results).await {
                Ok(hits) => return Ok(hits),
                Err(e) => {
                    warn!("SearxNG search failed, falling back to DuckDuckGo: {}", e);
                }
            }
        }

        let _turn = self.gate.acquire("duckduckgo").await;
        self.search_duckduckgo(query, max_results).await
    }

    /// SearxNG JSON API: `GET {base}/search?q=...&format=json`
    async fn search_searx(
        &self,
        base: &str,
        query: &str,
        max_results: usize,
    ) -> Result<Vec<SearchHit>, ToolFailure> {
        let url = format!(
            "{}/search?q={}&format=json",
            base.trim_end_matches('/'),
            urlencoding::encode(query)
        );
        debug!("SearxNG request: {}", url);

        let response = self
            .client
            .get(&url)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| ToolFailure::exception(&e))?;

        if !response.status().is_success() {
            return Err(ToolFailure::new(
                ErrorCode::Exception,
                format!("SearxNG returned HTTP {}", response.status()),
            ));
        }

        let data: Value = response
            .json()
            .await
            .map_err(|e| ToolFailure::exception(&e))?;

        let mut hits = Vec::new();
        if let Some(results) = data["results"].as_array() {
            for item in results.iter().take(max_results) {
                let title = item["title"].as_str().unwrap_or_default();
                let url = item["url"].as_str().unwrap_or_default();
                if title.is_empty() || url.is_empty() {
                    continue;
                }
                hits.push(SearchHit {
                    title: title.to_string(),
                    url: url.to_string(),
                    snippet: item["content"].as_str().unwrap_or_default().to_string(),
                });
            }
        }
        Ok(hits)
    }

    /// DuckDuckGo instant-answer API (no key required)
    async fn search_duckduckgo(
        &self,
        query: &str,
        max_results: usize,
    ) -> Result<Vec<SearchHit>, ToolFailure> {
        let url = format!(
            "https://api.duckduckgo.com/?q={}&format=json&no_html=1&skip_disambig=1",
            urlencoding::encode(query)
        );

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ToolFailure::exception(&e))?;

        let data: Value = response
            .json()
            .await
            .map_err(|e| ToolFailure::exception(&e))?;

        let mut hits = Vec::new();

        if let Some(abstract_text) = data["AbstractText"].as_str() {
            if !abstract_text.is_empty() {
                hits.push(SearchHit {
                    title: data["Heading"].as_str().unwrap_or("Answer").to_string(),
                    url: data["AbstractURL"].as_str().unwrap_or_default().to_string(),
                    snippet: abstract_text.to_string(),
                });
            }
        }

        if let Some(topics) = data["RelatedTopics"].as_array() {
            for topic in topics.iter() {
                if hits.len() >= max_results {
                    break;
                }
                if let (Some(text), Some(url)) =
                    (topic["Text"].as_str(), topic["FirstURL"].as_str())
                {
                    hits.push(SearchHit {
                        title: text.chars().take(100).collect(),
                        url: url.to_string(),
                        snippet: text.to_string(),
                    });
                }
            }
        }

        Ok(hits)
    }
}

pub fn format_hits(query: &str, hits: &[SearchHit]) -> Value {
    json!({
        "query": query,
        "count": hits.len(),
        "results": hits,
    })
}

#[async_trait]
impl DirectHandler for WebSearchTool {
    async fn run(&self, args: Value, _ctx: &ExecContext) -> Result<Value, ToolFailure> {
        // Arguments already validated against the registered schema
        let query = args["query"].as_str().unwrap_or_default();
        let max_results = args["max_results"]
            .as_u64()
            .map(|n| n as usize)
            .unwrap_or(DEFAULT_MAX_RESULTS);

        info!("web_search: query='{}', max_results={}", query, max_results);
        let hits = self.search(query, max_results).await?;
        Ok(format_hits(query, &hits))
    }
}

/// Registry entry for the web search tool
pub fn web_search_spec(searx_url: Option<String>, gate: ProviderGate) -> ToolSpec {
    ToolSpec::direct(
        "web_search",
        "Search the web. Returns a list of results with titles, URLs, and snippets.",
        ArgSchema::new()
            .string("query", "The search query", true)
            .integer("max_results", "Maximum number of results", false)
            .bounded(1.0, MAX_RESULTS_CEILING),
        Arc::new(WebSearchTool::new(searx_url, gate)),
    )
    .side_effect(SideEffect::Network)
}
