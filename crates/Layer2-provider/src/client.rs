//! Ollama (local) client implementation
//!
//! Non-streaming `/api/chat` with tool declarations, plus `/api/tags`
//! for model listing and a bounded `ping` health check.

use crate::error::ProviderError;
use crate::r#trait::{ChatClient, ChatRequest, ChatResponse, ToolDecl};
use async_trait::async_trait;
use driftwood_foundation::{Message, Role, ToolCall};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

const DEFAULT_TIMEOUT_SECS: u64 = 600; // Longer timeout for local models

/// Client for an Ollama-compatible model server
pub struct OllamaClient {
    client: Client,
    base_url: String,
}

impl OllamaClient {
    /// Create a new client with default settings
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
                .build()
                .unwrap_or_default(),
            base_url: base_url.into(),
        }
    }

    /// Set custom timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();
        self
    }

    fn chat_url(&self) -> String {
        format!("{}/api/chat", self.base_url)
    }

    /// Check if the server is reachable
    pub async fn ping(&self) -> bool {
        let url = format!("{}/api/tags", self.base_url);
        self.client
            .get(&url)
            .timeout(Duration::from_secs(5))
            .send()
            .await
            .map(|r| r.status().is_success())
            .unwrap_or(false)
    }

    /// List available models
    pub async fn list_models(&self) -> Result<Vec<String>, ProviderError> {
        let url = format!("{}/api/tags", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ProviderError::ServerError(
                "Failed to list models".to_string(),
            ));
        }

        #[derive(Deserialize)]
        struct TagsResponse {
            models: Vec<ModelEntry>,
        }

        #[derive(Deserialize)]
        struct ModelEntry {
            name: String,
        }

        let tags: TagsResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;

        Ok(tags.models.into_iter().map(|m| m.name).collect())
    }

    fn build_request(&self, request: &ChatRequest) -> OllamaRequest {
        let api_messages = request.messages.iter().map(WireMessage::from).collect();
        let api_tools: Vec<WireTool> = request.tools.iter().map(WireTool::from).collect();

        OllamaRequest {
            model: request.model.clone(),
            messages: api_messages,
            tools: if api_tools.is_empty() {
                None
            } else {
                Some(api_tools)
            },
            stream: false,
            options: request.options.clone(),
            keep_alive: request.keep_alive.clone(),
        }
    }
}

#[async_trait]
impl ChatClient for OllamaClient {
    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, ProviderError> {
        let model = request.model.clone();
        let body = self.build_request(&request);
        debug!(
            model = %model,
            messages = request.messages.len(),
            tools = request.tools.len(),
            "Chat request"
        );

        let response = self
            .client
            .post(self.chat_url())
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::from_http_status(status, &body, &model));
        }

        let api_response: OllamaResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;

        Ok(decode_response(api_response))
    }
}

fn decode_response(api_response: OllamaResponse) -> ChatResponse {
    let content = api_response.message.content;
    let tool_calls = api_response
        .message
        .tool_calls
        .unwrap_or_default()
        .into_iter()
        .map(|tc| {
            // The server may omit ids; arguments may be an object or a
            // JSON-encoded string. Both are tolerated.
            let id = tc.id.unwrap_or_else(ToolCall::generate_id);
            let arguments = ToolCall::decode_arguments(&tc.function.arguments);
            ToolCall::new(id, tc.function.name, arguments)
        })
        .collect();

    ChatResponse {
        content,
        tool_calls,
    }
}

// ============================================================================
// Ollama API Types
// ============================================================================

#[derive(Debug, Serialize)]
struct OllamaRequest {
    model: String,
    messages: Vec<WireMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<WireTool>>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    keep_alive: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireMessage {
    role: String,
    content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<WireToolCall>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
struct WireToolCall {
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    function: WireFunctionCall,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
struct WireFunctionCall {
    name: String,
    arguments: Value,
}

#[derive(Debug, Serialize)]
struct WireTool {
    #[serde(rename = "type")]
    tool_type: String,
    function: WireFunction,
}

#[derive(Debug, Serialize)]
struct WireFunction {
    name: String,
    description: String,
    parameters: Value,
}

#[derive(Debug, Deserialize)]
struct OllamaResponse {
    message: WireMessage2,
}

// Response-side message: tool_calls only, no outgoing-only fields
#[derive(Debug, Deserialize)]
struct WireMessage2 {
    #[serde(default)]
    content: String,
    #[serde(default)]
    tool_calls: Option<Vec<WireToolCall>>,
}

// ============================================================================
// Conversions
// ============================================================================

impl From<&Message> for WireMessage {
    fn from(msg: &Message) -> Self {
        let role = match msg.role {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::Tool => "tool",
        };

        let tool_calls = msg.tool_calls.as_ref().map(|tcs| {
            tcs.iter()
                .map(|tc| WireToolCall {
                    id: Some(tc.id.clone()),
                    function: WireFunctionCall {
                        name: tc.name.clone(),
                        arguments: tc.arguments.clone(),
                    },
                })
                .collect()
        });

        WireMessage {
            role: role.to_string(),
            content: msg.content.clone(),
            tool_calls,
            name: msg.name.clone(),
            tool_call_id: msg.tool_call_id.clone(),
        }
    }
}

impl From<&ToolDecl> for WireTool {
    fn from(tool: &ToolDecl) -> Self {
        WireTool {
            tool_type: "function".to_string(),
            function: WireFunction {
                name: tool.name.clone(),
                description: tool.description.clone(),
                parameters: tool.parameters.clone(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_chat_url() {
        let client = OllamaClient::new("http://localhost:11434");
        assert_eq!(client.chat_url(), "http://localhost:11434/api/chat");
    }

    #[test]
    fn test_tool_message_wire_shape() {
        let msg = Message::tool("web_search", "call_1", "{\"ok\":true}");
        let wire = WireMessage::from(&msg);
        let value = serde_json::to_value(&wire).unwrap();
        assert_eq!(value["role"], "tool");
        assert_eq!(value["name"], "web_search");
        assert_eq!(value["tool_call_id"], "call_1");
    }

    #[test]
    fn test_tool_decl_wire_shape() {
        let decl = ToolDecl {
            name: "get_time".into(),
            description: "Current time".into(),
            parameters: json!({"type": "object", "properties": {}, "required": []}),
        };
        let wire = WireTool::from(&decl);
        let value = serde_json::to_value(&wire).unwrap();
        assert_eq!(value["type"], "function");
        assert_eq!(value["function"]["name"], "get_time");
        assert!(value["function"]["parameters"]["properties"].is_object());
    }

    #[test]
    fn test_decode_response_arguments_as_string() {
        let raw: OllamaResponse = serde_json::from_value(json!({
            "message": {
                "role": "assistant",
                "content": "",
                "tool_calls": [
                    {"function": {"name": "web_search", "arguments": "{\"query\":\"rust\"}"}}
                ]
            }
        }))
        .unwrap();

        let decoded = decode_response(raw);
        assert_eq!(decoded.tool_calls.len(), 1);
        assert_eq!(decoded.tool_calls[0].name, "web_search");
        assert_eq!(decoded.tool_calls[0].arguments, json!({"query": "rust"}));
        assert!(decoded.tool_calls[0].id.starts_with("call_"));
    }

    #[test]
    fn test_decode_response_arguments_as_object() {
        let raw: OllamaResponse = serde_json::from_value(json!({
            "message": {
                "role": "assistant",
                "content": "done",
                "tool_calls": [
                    {"id": "abc", "function": {"name": "read_file", "arguments": {"path": "/tmp/x"}}}
                ]
            }
        }))
        .unwrap();

        let decoded = decode_response(raw);
        assert_eq!(decoded.tool_calls[0].id, "abc");
        assert_eq!(decoded.tool_calls[0].arguments, json!({"path": "/tmp/x"}));
    }

    #[tokio::test]
    async fn test_ping_unreachable_server() {
        // nothing listens on port 1
        let client = OllamaClient::new("http://127.0.0.1:1");
        assert!(!client.ping().await);
    }

    #[test]
    fn test_decode_response_no_tools_is_final() {
        let raw: OllamaResponse = serde_json::from_value(json!({
            "message": {"role": "assistant", "content": "hello"}
        }))
        .unwrap();
        let decoded = decode_response(raw);
        assert!(decoded.is_final());
        assert_eq!(decoded.content, "hello");
    }
}
