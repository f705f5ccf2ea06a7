//! DocSearch Tool
//!
//! RAG document retrieval through a black-box `Retriever` seam. The
//! embedding store itself is an external collaborator; this tool only
//! forwards queries and normalizes passages.
//!
//! Implemented as a streaming handler: it emits a progress notice while
//! the retrieval provider works, then the passage list as the final
//! chunk.

use crate::spec::{HandlerEvent, StreamingHandler, ToolFailure, ToolSpec};
use async_stream::stream;
use async_trait::async_trait;
use driftwood_foundation::{ArgSchema, SideEffect, ToolProgress};
use futures::stream::BoxStream;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_TOP_K: usize = 4;

/// A retrieved passage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Passage {
    pub source: String,
    pub text: String,
    pub score: f64,
}

/// Black-box retrieval provider
#[async_trait]
pub trait Retriever: Send + Sync {
    async fn retrieve(&self, query: &str, top_k: usize) -> Result<Vec<Passage>, ToolFailure>;
}

/// HTTP retrieval provider: `POST {base}/query {"query", "top_k"}`
/// returning `{"passages": [{"source", "text", "score"}]}`.
pub struct HttpRetriever {
    client: Client,
    base_url: String,
}

impl HttpRetriever {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .build()
                .unwrap_or_default(),
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl Retriever for HttpRetriever {
    async fn retrieve(&self, query: &str, top_k: usize) -> Result<Vec<Passage>, ToolFailure> {
        let url = format!("{}/query", self.base_url.trim_end_matches('/'));
        debug!("Retrieval request: {} top_k={}", url, top_k);

        let response = self
            .client
            .post(&url)
            .json(&json!({ "query": query, "top_k": top_k }))
            .send()
            .await
            .map_err(|e| ToolFailure::exception(&e))?;

        if !response.status().is_success() {
            return Err(ToolFailure::new(
                driftwood_foundation::ErrorCode::Exception,
                format!("retrieval provider returned HTTP {}", response.status()),
            ));
        }

        #[derive(Deserialize)]
        struct QueryResponse {
            #[serde(default)]
            passages: Vec<Passage>,
        }

        let parsed: QueryResponse = response
            .json()
            .await
            .map_err(|e| ToolFailure::exception(&e))?;
        Ok(parsed.passages)
    }
}

/// DocSearch tool
///
/// Holds its retriever by injection so tests can substitute a canned one.
pub struct DocSearchTool {
    retriever: Arc<dyn Retriever>,
}

impl DocSearchTool {
    pub fn new(retriever: Arc<dyn Retriever>) -> Self {
        Self { retriever }
    }
}

impl StreamingHandler for DocSearchTool {
    fn run(&self, args: Value) -> BoxStream<'static, Result<HandlerEvent, ToolFailure>> {
        let retriever = Arc::clone(&self.retriever);
        Box::pin(stream! {
            let query = args["query"].as_str().unwrap_or_default().to_string();
            let top_k = args["top_k"].as_u64().map(|n| n as usize).unwrap_or(DEFAULT_TOP_K);

            info!("doc_search: query='{}', top_k={}", query, top_k);
            yield Ok(HandlerEvent::Progress(
                ToolProgress::new("retrieve", 0, 1).with_message(format!("searching documents for '{}'", query)),
            ));

            let passages = retriever.retrieve(&query, top_k).await?;
            yield Ok(HandlerEvent::Chunk(json!({
                "query": query,
                "count": passages.len(),
                "passages": passages,
            })));
        })
    }
}

/// Registry entry; `retriever_url` unset means the tool reports
/// `dependency_missing` instead of silently returning nothing.
pub fn doc_search_spec(retriever_url: Option<String>) -> ToolSpec {
    let retriever: Arc<dyn Retriever> = match retriever_url {
        Some(url) => Arc::new(HttpRetriever::new(url)),
        None => Arc::new(MissingRetriever),
    };
    ToolSpec::streaming(
        "doc_search",
        "Search the local document index and return relevant passages.",
        ArgSchema::new()
            .string("query", "The search query", true)
            .integer("top_k", "Number of passages to return", false)
            .bounded(1.0, 20.0),
        Arc::new(DocSearchTool::new(retriever)),
    )
    .side_effect(SideEffect::Network)
}

/// Placeholder used when no retrieval provider is configured
struct MissingRetriever;

#[async_trait]
impl Retriever for MissingRetriever {
    async fn retrieve(&self, _query: &str, _top_k: usize) -> Result<Vec<Passage>, ToolFailure> {
        Err(ToolFailure::dependency_missing(
            "no retrieval provider configured; set [search].retriever_url",
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    struct Canned;

    #[async_trait]
    impl Retriever for Canned {
        async fn retrieve(&self, query: &str, top_k: usize) -> Result<Vec<Passage>, ToolFailure> {
            Ok((0..top_k)
                .map(|i| Passage {
                    source: format!("doc-{}", i),
                    text: format!("passage about {}", query),
                    score: 1.0 - i as f64 * 0.1,
                })
                .collect())
        }
    }

    #[tokio::test]
    async fn test_progress_then_passages() {
        let tool = DocSearchTool::new(Arc::new(Canned));
        let mut stream = tool.run(json!({"query": "ownership", "top_k": 2}));

        match stream.next().await.unwrap().unwrap() {
            HandlerEvent::Progress(p) => assert_eq!(p.step, "retrieve"),
            other => panic!("expected progress, got {:?}", other),
        }
        match stream.next().await.unwrap().unwrap() {
            HandlerEvent::Chunk(value) => {
                assert_eq!(value["count"], 2);
                assert_eq!(value["passages"][0]["source"], "doc-0");
            }
            other => panic!("expected chunk, got {:?}", other),
        }
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn test_unconfigured_retriever_is_dependency_missing() {
        let tool = DocSearchTool::new(Arc::new(MissingRetriever));
        let mut stream = tool.run(json!({"query": "x"}));

        // progress first, then the failure
        assert!(matches!(
            stream.next().await.unwrap().unwrap(),
            HandlerEvent::Progress(_)
        ));
        let err = stream.next().await.unwrap().unwrap_err();
        assert_eq!(err.code, driftwood_foundation::ErrorCode::DependencyMissing);
    }
}
