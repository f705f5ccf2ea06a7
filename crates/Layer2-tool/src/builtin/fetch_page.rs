//! FetchPage Tool
//!
//! HTTP GET plus a hand-rolled HTML-to-text pass. Used by the research
//! pipeline to open sources, and registered as `fetch_page` so the model
//! can read a page it found via search.

use crate::spec::{DirectHandler, ExecContext, ToolFailure, ToolSpec};
use async_trait::async_trait;
use driftwood_foundation::{ArgSchema, ErrorCode, SideEffect};
use reqwest::Client;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const MAX_BODY_BYTES: usize = 1_000_000;
const DEFAULT_TEXT_CAP: usize = 20_000;

pub struct FetchPageTool {
    client: Client,
}

impl FetchPageTool {
    pub fn new() -> Self {
        Self {
            client: Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .redirect(reqwest::redirect::Policy::limited(10))
                .user_agent("Driftwood/0.1")
                .build()
                .unwrap_or_default(),
        }
    }

    /// Fetch a URL and return `(title, text)` with the text capped at
    /// `text_cap` characters.
    pub async fn fetch_text(
        &self,
        url: &str,
        text_cap: usize,
    ) -> Result<(Option<String>, String), ToolFailure> {
        let parsed = url::Url::parse(url).map_err(|e| {
            ToolFailure::new(ErrorCode::InvalidArgs, format!("invalid URL: {}", e))
        })?;
        if !["http", "https"].contains(&parsed.scheme()) {
            return Err(ToolFailure::new(
                ErrorCode::InvalidArgs,
                format!("only http/https URLs are allowed, got: {}", parsed.scheme()),
            ));
        }

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ToolFailure::exception(&e))?;

        if !response.status().is_success() {
            return Err(ToolFailure::new(
                ErrorCode::Exception,
                format!("HTTP {} fetching {}", response.status(), url),
            ));
        }

        let content_type = response
            .headers()
            .get("content-type")
            .and_then(|h| h.to_str().ok())
            .unwrap_or("text/plain")
            .to_string();

        let body = response
            .bytes()
            .await
            .map_err(|e| ToolFailure::exception(&e))?;
        let body = &body[..body.len().min(MAX_BODY_BYTES)];
        let raw = String::from_utf8_lossy(body);

        let (title, text) = if content_type.contains("text/html") {
            (extract_title(&raw), html_to_text(&raw))
        } else {
            (None, raw.to_string())
        };

        let capped: String = text.chars().take(text_cap).collect();
        Ok((title, capped))
    }
}

impl Default for FetchPageTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DirectHandler for FetchPageTool {
    async fn run(&self, args: Value, _ctx: &ExecContext) -> Result<Value, ToolFailure> {
        let url = args["url"].as_str().unwrap_or_default();
        info!("fetch_page: url='{}'", url);

        match self.fetch_text(url, DEFAULT_TEXT_CAP).await {
            Ok((title, text)) => Ok(json!({
                "url": url,
                "title": title,
                "text": text,
            })),
            Err(e) => {
                warn!("fetch_page failed: {}", e);
                Err(e)
            }
        }
    }
}

pub fn fetch_page_spec() -> ToolSpec {
    ToolSpec::direct(
        "fetch_page",
        "Fetch a web page and return its readable text content.",
        ArgSchema::new().string("url", "The http(s) URL to fetch", true),
        Arc::new(FetchPageTool::new()),
    )
    .side_effect(SideEffect::Network)
}

// ============================================================================
// HTML to text
// ============================================================================

fn extract_title(html: &str) -> Option<String> {
    let start = html.find("<title")?;
    let open_end = html[start..].find('>')? + start + 1;
    let close = html[open_end..].find("</title>")? + open_end;
    let title = decode_entities(html[open_end..close].trim());
    if title.is_empty() {
        None
    } else {
        Some(title)
    }
}

/// Plain-text extraction without an HTML parser.
///
/// Script/style/comment blocks are dropped, block-level closing tags
/// become newlines, everything else is tag-stripped and entity-decoded.
pub fn html_to_text(html: &str) -> String {
    let mut content = remove_between(html, "<script", "</script>");
    content = remove_between(&content, "<style", "</style>");
    content = remove_between(&content, "<!--", "-->");

    for tag in ["</p>", "</div>", "</li>", "</tr>", "</h1>", "</h2>", "</h3>", "</h4>"] {
        content = content.replace(tag, "\n");
    }
    for tag in ["<br>", "<br/>", "<br />"] {
        content = content.replace(tag, "\n");
    }

    let stripped = strip_tags(&content);
    clean_whitespace(&decode_entities(&stripped))
}

fn remove_between(s: &str, start_tag: &str, end_tag: &str) -> String {
    let mut result = s.to_string();
    while let Some(start) = result.find(start_tag) {
        match result[start..].find(end_tag) {
            Some(end) => {
                result.replace_range(start..start + end + end_tag.len(), "");
            }
            None => break,
        }
    }
    result
}

fn strip_tags(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut in_tag = false;
    for c in s.chars() {
        match c {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => result.push(c),
            _ => {}
        }
    }
    result
}

fn decode_entities(s: &str) -> String {
    s.replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&nbsp;", " ")
        .replace("&hellip;", "...")
}

fn clean_whitespace(s: &str) -> String {
    let mut out = Vec::new();
    let mut last_empty = false;
    for line in s.lines() {
        let line = line.trim();
        if line.is_empty() {
            if !last_empty {
                out.push("");
                last_empty = true;
            }
        } else {
            out.push(line);
            last_empty = false;
        }
    }
    out.join("\n").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_html_to_text_strips_script_and_tags() {
        let html = "<html><head><script>alert(1)</script></head>\
                    <body><p>Hello <b>world</b></p><div>next</div></body></html>";
        let text = html_to_text(html);
        assert_eq!(text, "Hello world\nnext");
        assert!(!text.contains("alert"));
    }

    #[test]
    fn test_html_to_text_decodes_entities() {
        assert_eq!(html_to_text("<p>a &amp; b &lt;c&gt;</p>"), "a & b <c>");
    }

    #[test]
    fn test_extract_title() {
        let html = "<html><head><title> Driftwood Docs </title></head></html>";
        assert_eq!(extract_title(html), Some("Driftwood Docs".to_string()));
        assert_eq!(extract_title("<p>no title</p>"), None);
    }

    #[test]
    fn test_clean_whitespace_collapses_blank_runs() {
        let text = clean_whitespace("a\n\n\n\nb\n  \n c ");
        assert_eq!(text, "a\n\nb\n\nc");
    }

    #[tokio::test]
    async fn test_fetch_rejects_non_http_scheme() {
        let tool = FetchPageTool::new();
        let err = tool.fetch_text("ftp://example.com/x", 100).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidArgs);
    }
}
