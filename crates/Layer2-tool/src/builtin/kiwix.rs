//! KiwixSearch Tool
//!
//! Full-text search against a local Kiwix server (offline Wikipedia and
//! friends). Uses the `/search` endpoint with `pattern` and scrapes the
//! modest HTML result list; Kiwix has no JSON search API.

use crate::builtin::fetch_page::html_to_text;
use crate::gate::ProviderGate;
use crate::spec::{DirectHandler, ExecContext, ToolFailure, ToolSpec};
use async_trait::async_trait;
use driftwood_foundation::{ArgSchema, ErrorCode, SideEffect};
use reqwest::Client;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);
const DEFAULT_PAGE_SIZE: usize = 10;

pub struct KiwixSearchTool {
    client: Client,
    kiwix_url: Option<String>,
    gate: ProviderGate,
}

impl KiwixSearchTool {
    pub fn new(kiwix_url: Option<String>, gate: ProviderGate) -> Self {
        Self {
            client: Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .build()
                .unwrap_or_default(),
            kiwix_url,
            gate,
        }
    }

    pub async fn search(
        &self,
        pattern: &str,
        books: Option<&str>,
        page_size: usize,
    ) -> Result<Vec<(String, String)>, ToolFailure> {
        let base = self.kiwix_url.as_deref().ok_or_else(|| {
            ToolFailure::dependency_missing(
                "no Kiwix server configured; set [search].kiwix_url",
            )
        })?;

        let mut url = format!(
            "{}/search?pattern={}&pageLength={}",
            base.trim_end_matches('/'),
            urlencoding::encode(pattern),
            page_size
        );
        if let Some(books) = books {
            url.push_str(&format!("&books.name={}", urlencoding::encode(books)));
        }

        let _turn = self.gate.acquire("kiwix").await;
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ToolFailure::exception(&e))?;

        if !response.status().is_success() {
            return Err(ToolFailure::new(
                ErrorCode::Exception,
                format!("Kiwix returned HTTP {}", response.status()),
            ));
        }

        let html = response
            .text()
            .await
            .map_err(|e| ToolFailure::exception(&e))?;
        Ok(parse_search_page(&html, page_size))
    }
}

/// Extract `(title, href)` pairs from the Kiwix search result page.
///
/// Result entries look like `<a href="/viewer#...">Title</a>` inside the
/// results list; anchors without a viewer href are navigation chrome.
fn parse_search_page(html: &str, limit: usize) -> Vec<(String, String)> {
    let mut results = Vec::new();
    let mut rest = html;

    while let Some(start) = rest.find("<a href=\"") {
        let after = &rest[start + 9..];
        let Some(href_end) = after.find('"') else { break };
        let href = &after[..href_end];

        let after_href = &after[href_end..];
        let (text, next) = match (after_href.find('>'), after_href.find("</a>")) {
            (Some(open), Some(close)) if open < close => {
                (html_to_text(&after_href[open + 1..close]), &after_href[close + 4..])
            }
            _ => break,
        };

        if href.contains("/viewer#") && !text.is_empty() {
            results.push((text, href.to_string()));
            if results.len() >= limit {
                break;
            }
        }
        rest = next;
    }

    results
}

#[async_trait]
impl DirectHandler for KiwixSearchTool {
    async fn run(&self, args: Value, _ctx: &ExecContext) -> Result<Value, ToolFailure> {
        let pattern = args["pattern"].as_str().unwrap_or_default();
        let books = args["books"].as_str();
        let page_size = args["page_size"]
            .as_u64()
            .map(|n| n as usize)
            .unwrap_or(DEFAULT_PAGE_SIZE);

        info!("kiwix_search: pattern='{}', books={:?}", pattern, books);
        let results = self.search(pattern, books, page_size).await?;

        Ok(json!({
            "pattern": pattern,
            "count": results.len(),
            "results": results
                .into_iter()
                .map(|(title, path)| json!({"title": title, "path": path}))
                .collect::<Vec<_>>(),
        }))
    }
}

pub fn kiwix_search_spec(kiwix_url: Option<String>, gate: ProviderGate) -> ToolSpec {
    ToolSpec::direct(
        "kiwix_search",
        "Search offline content (Wikipedia etc.) on a local Kiwix server.",
        ArgSchema::new()
            .string("pattern", "The search pattern", true)
            .string("books", "Restrict to a specific book name", false)
            .integer("page_size", "Number of results", false)
            .bounded(1.0, 50.0),
        Arc::new(KiwixSearchTool::new(kiwix_url, gate)),
    )
    .side_effect(SideEffect::Network)
}
