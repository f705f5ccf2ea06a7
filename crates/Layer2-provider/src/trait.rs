//! ChatClient trait and request/response types
//!
//! The orchestrator depends only on this seam, so tests can script model
//! responses without a running server.

use crate::error::ProviderError;
use async_trait::async_trait;
use driftwood_foundation::{Message, ToolCall};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A tool declaration advertised to the model.
///
/// `parameters` is a flat JSON-Schema-like object (`type`/`properties`/
/// `required`, no `$ref`/`anyOf`) - see `driftwood_foundation::schema`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDecl {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

/// A non-streaming chat completion request.
#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<Message>,

    /// Tools to advertise. Empty means tools are not sent at all,
    /// which forces a natural-language answer.
    pub tools: Vec<ToolDecl>,

    /// Sampling options forwarded verbatim (e.g. temperature, num_ctx)
    pub options: Option<Value>,

    /// Server-side model keep-alive (e.g. "5m")
    pub keep_alive: Option<String>,
}

impl ChatRequest {
    pub fn new(model: impl Into<String>, messages: Vec<Message>) -> Self {
        Self {
            model: model.into(),
            messages,
            tools: Vec::new(),
            options: None,
            keep_alive: None,
        }
    }

    pub fn with_tools(mut self, tools: Vec<ToolDecl>) -> Self {
        self.tools = tools;
        self
    }

    pub fn with_keep_alive(mut self, keep_alive: impl Into<String>) -> Self {
        self.keep_alive = Some(keep_alive.into());
        self
    }
}

/// A complete (non-streaming) model response.
#[derive(Debug, Clone)]
pub struct ChatResponse {
    /// Text content (may be empty when the model only requests tools)
    pub content: String,

    /// Tool invocations the model requested, ids always populated
    /// (synthesized when the server omitted them)
    pub tool_calls: Vec<ToolCall>,
}

impl ChatResponse {
    /// True when the model produced a final answer with no tool requests.
    pub fn is_final(&self) -> bool {
        self.tool_calls.is_empty()
    }
}

/// Chat completion client.
///
/// Implemented by `OllamaClient`; test code implements it with scripted
/// responses.
#[async_trait]
pub trait ChatClient: Send + Sync {
    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, ProviderError>;
}
