//! Tool-Calling Loop Orchestrator
//!
//! 유한 라운드 루프:
//!
//! ```text
//! [모델 호출(도구 광고)] → tool_calls 없음 → 최종 답변
//!        │ tool_calls 있음
//!        ▼
//! [라운드 내 호출 동시 디스패치 (순서 보존)] → tool 메시지 추가 → 다음 라운드
//!
//! 라운드 예산 소진 → [도구 광고 없는 마무리 호출] → 답변 (비면 고정 폴백)
//! ```
//!
//! 호출 수준 실패는 ToolOutcome 데이터로 대화에 흘러갑니다.
//! 전송 실패(ProviderError)만 에러로 전파됩니다.

use crate::conversation::cap_tool_content;
use driftwood_foundation::{Error, LoopConfig, Message, Result};
use driftwood_provider::{ChatClient, ChatRequest, ToolDecl};
use driftwood_tool::{ExecContext, ToolRuntime};
use futures::future::join_all;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// 마무리 호출조차 빈 내용을 반환했을 때의 고정 답변
pub const FALLBACK_ANSWER: &str =
    "I was unable to produce a final answer within the tool budget.";

/// 루프 실행 결과
#[derive(Debug)]
pub struct LoopResult {
    /// 최종 답변 텍스트
    pub answer: String,

    /// 최종 대화 전체 (감사/이어가기용)
    pub conversation: Vec<Message>,

    /// 모델이 도구를 요청한 라운드 수
    pub rounds_used: usize,

    /// 실행된 도구 호출 수
    pub tool_calls_made: usize,
}

/// 도구 호출 루프 오케스트레이터
pub struct Orchestrator {
    client: Arc<dyn ChatClient>,
    runtime: Arc<ToolRuntime>,
    config: LoopConfig,
    model: String,
    options: Option<Value>,
    keep_alive: Option<String>,
}

impl Orchestrator {
    pub fn new(
        client: Arc<dyn ChatClient>,
        runtime: Arc<ToolRuntime>,
        config: LoopConfig,
        model: impl Into<String>,
    ) -> Self {
        Self {
            client,
            runtime,
            config,
            model: model.into(),
            options: None,
            keep_alive: None,
        }
    }

    pub fn with_options(mut self, options: Value) -> Self {
        self.options = Some(options);
        self
    }

    pub fn with_keep_alive(mut self, keep_alive: impl Into<String>) -> Self {
        self.keep_alive = Some(keep_alive.into());
        self
    }

    fn declarations(&self) -> Vec<ToolDecl> {
        self.runtime
            .registry()
            .declarations()
            .into_iter()
            .map(|(name, description, parameters)| ToolDecl {
                name,
                description,
                parameters,
            })
            .collect()
    }

    fn request(&self, messages: Vec<Message>, tools: Vec<ToolDecl>) -> ChatRequest {
        let mut request = ChatRequest::new(&self.model, messages).with_tools(tools);
        request.options = self.options.clone();
        request.keep_alive = self.keep_alive.clone();
        request
    }

    /// 루프 실행
    ///
    /// `messages`는 시스템/사용자 메시지를 포함한 초기 대화입니다.
    pub async fn run(&self, messages: Vec<Message>, ctx: &ExecContext) -> Result<LoopResult> {
        let mut conversation = messages;
        let decls = self.declarations();
        let mut tool_calls_made = 0usize;

        for round in 0..self.config.max_rounds {
            let response = self
                .client
                .chat(self.request(conversation.clone(), decls.clone()))
                .await
                .map_err(Error::from)?;

            if response.is_final() {
                debug!(round, "Model produced final answer");
                conversation.push(Message::assistant(&response.content));
                return Ok(LoopResult {
                    answer: response.content,
                    conversation,
                    rounds_used: round,
                    tool_calls_made,
                });
            }

            info!(
                round,
                calls = response.tool_calls.len(),
                "Model requested tools"
            );

            // 모델이 보낸 tool_calls를 그대로 보존 (감사용)
            conversation.push(Message::assistant_with_tools(
                &response.content,
                response.tool_calls.clone(),
            ));

            // 라운드 내 동시 디스패치 - join_all이 요청 순서를 보존
            let outcomes = join_all(
                response
                    .tool_calls
                    .iter()
                    .map(|call| self.runtime.execute(call, ctx)),
            )
            .await;

            for (call, outcome) in response.tool_calls.iter().zip(outcomes) {
                tool_calls_made += 1;
                if !outcome.ok {
                    warn!(
                        tool = %call.name,
                        call_id = %call.id,
                        code = ?outcome.code,
                        "Tool call failed"
                    );
                }
                let content =
                    cap_tool_content(&outcome.to_json_string(), self.config.tool_message_cap);
                conversation.push(Message::tool(&call.name, &call.id, content));
            }
        }

        // 예산 소진 - 도구 광고 없이 한 번 더 물어 자연어 답변을 강제
        info!(max_rounds = self.config.max_rounds, "Round budget exhausted, finalizing");
        let response = self
            .client
            .chat(self.request(conversation.clone(), Vec::new()))
            .await
            .map_err(Error::from)?;

        let answer = if response.content.trim().is_empty() {
            FALLBACK_ANSWER.to_string()
        } else {
            response.content
        };
        conversation.push(Message::assistant(&answer));

        Ok(LoopResult {
            answer,
            conversation,
            rounds_used: self.config.max_rounds,
            tool_calls_made,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use driftwood_foundation::{ArgSchema, Role, RuntimeConfig, ToolCall};
    use driftwood_provider::{ChatResponse, ProviderError};
    use driftwood_tool::{DirectHandler, ToolFailure, ToolRegistry, ToolSpec};
    use parking_lot::Mutex;
    use serde_json::json;
    use std::result::Result;
    use std::time::Duration;

    /// 스크립트된 가짜 모델 클라이언트
    ///
    /// 응답 목록을 순서대로 소비하고, 받은 요청을 기록합니다.
    struct ScriptedClient {
        responses: Mutex<Vec<Result<ChatResponse, ProviderError>>>,
        requests: Mutex<Vec<ChatRequest>>,
    }

    impl ScriptedClient {
        fn new(responses: Vec<Result<ChatResponse, ProviderError>>) -> Self {
            Self {
                responses: Mutex::new(responses),
                requests: Mutex::new(Vec::new()),
            }
        }

        fn request_count(&self) -> usize {
            self.requests.lock().len()
        }

        fn request_at(&self, index: usize) -> ChatRequest {
            self.requests.lock()[index].clone()
        }
    }

    #[async_trait]
    impl ChatClient for ScriptedClient {
        async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, ProviderError> {
            self.requests.lock().push(request);
            let mut responses = self.responses.lock();
            if responses.is_empty() {
                return Ok(ChatResponse {
                    content: "out of script".into(),
                    tool_calls: vec![],
                });
            }
            responses.remove(0)
        }
    }

    fn final_response(content: &str) -> Result<ChatResponse, ProviderError> {
        Ok(ChatResponse {
            content: content.into(),
            tool_calls: vec![],
        })
    }

    fn tool_response(calls: Vec<ToolCall>) -> Result<ChatResponse, ProviderError> {
        Ok(ChatResponse {
            content: String::new(),
            tool_calls: calls,
        })
    }

    struct Echo;

    #[async_trait]
    impl DirectHandler for Echo {
        async fn run(
            &self,
            args: Value,
            _ctx: &ExecContext,
        ) -> Result<Value, ToolFailure> {
            Ok(json!({ "echo": args }))
        }
    }

    /// 첫 번째 호출이 더 오래 걸리게 해 순서 보존을 검증
    struct SlowEcho;

    #[async_trait]
    impl DirectHandler for SlowEcho {
        async fn run(
            &self,
            args: Value,
            _ctx: &ExecContext,
        ) -> Result<Value, ToolFailure> {
            tokio::time::sleep(Duration::from_millis(50)).await;
            Ok(json!({ "slow": args }))
        }
    }

    struct Big;

    #[async_trait]
    impl DirectHandler for Big {
        async fn run(&self, _args: Value, _ctx: &ExecContext) -> Result<Value, ToolFailure> {
            Ok(json!({ "blob": "z".repeat(10_000) }))
        }
    }

    fn runtime() -> Arc<ToolRuntime> {
        let mut registry = ToolRegistry::new();
        registry
            .register(ToolSpec::direct(
                "slow_echo",
                "Slow echo",
                ArgSchema::empty(),
                Arc::new(SlowEcho),
            ))
            .unwrap();
        registry
            .register(ToolSpec::direct(
                "echo",
                "Echo",
                ArgSchema::empty(),
                Arc::new(Echo),
            ))
            .unwrap();
        registry
            .register(ToolSpec::direct(
                "big",
                "Big output",
                ArgSchema::empty(),
                Arc::new(Big),
            ))
            .unwrap();
        Arc::new(ToolRuntime::new(Arc::new(registry), RuntimeConfig::default()))
    }

    fn orchestrator(client: Arc<ScriptedClient>, config: LoopConfig) -> Orchestrator {
        Orchestrator::new(client, runtime(), config, "test-model")
    }

    #[tokio::test]
    async fn test_final_on_first_round() {
        let client = Arc::new(ScriptedClient::new(vec![final_response("done")]));
        let orch = orchestrator(Arc::clone(&client), LoopConfig::default());

        let result = orch
            .run(vec![Message::user("hi")], &ExecContext::new())
            .await
            .unwrap();

        assert_eq!(result.answer, "done");
        assert_eq!(result.rounds_used, 0);
        assert_eq!(result.tool_calls_made, 0);
        assert_eq!(client.request_count(), 1);
        // 도구는 광고되었음
        assert!(!client.request_at(0).tools.is_empty());
    }

    #[tokio::test]
    async fn test_tool_round_then_final() {
        let client = Arc::new(ScriptedClient::new(vec![
            tool_response(vec![ToolCall::new("call_1", "echo", json!({}))]),
            final_response("answer after tool"),
        ]));
        let orch = orchestrator(Arc::clone(&client), LoopConfig::default());

        let result = orch
            .run(vec![Message::user("hi")], &ExecContext::new())
            .await
            .unwrap();

        assert_eq!(result.answer, "answer after tool");
        assert_eq!(result.rounds_used, 1);
        assert_eq!(result.tool_calls_made, 1);
        assert_eq!(client.request_count(), 2);

        // 대화: user, assistant(tool_calls), tool, assistant(final)
        let roles: Vec<Role> = result.conversation.iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![Role::User, Role::Assistant, Role::Tool, Role::Assistant]);

        // assistant 메시지에 tool_calls가 그대로 보존됨
        let assistant = &result.conversation[1];
        assert_eq!(assistant.tool_calls.as_ref().unwrap()[0].id, "call_1");

        // tool 메시지는 유효한 JSON envelope
        let tool_msg = &result.conversation[2];
        assert_eq!(tool_msg.tool_call_id.as_deref(), Some("call_1"));
        let parsed: Value = serde_json::from_str(&tool_msg.content).unwrap();
        assert_eq!(parsed["ok"], true);
    }

    #[tokio::test]
    async fn test_budget_exhaustion_forces_tools_off_finalization() {
        let always_tools = || tool_response(vec![ToolCall::new("call_x", "echo", json!({}))]);
        let client = Arc::new(ScriptedClient::new(vec![
            always_tools(),
            always_tools(),
            final_response("forced answer"),
        ]));
        let config = LoopConfig {
            max_rounds: 2,
            ..LoopConfig::default()
        };
        let orch = orchestrator(Arc::clone(&client), config);

        let result = orch
            .run(vec![Message::user("hi")], &ExecContext::new())
            .await
            .unwrap();

        assert_eq!(result.answer, "forced answer");
        assert_eq!(result.rounds_used, 2);
        // 라운드 2회 + 마무리 1회
        assert_eq!(client.request_count(), 3);
        // 마무리 호출에는 도구가 광고되지 않음
        assert!(client.request_at(2).tools.is_empty());
        assert!(!client.request_at(0).tools.is_empty());
    }

    #[tokio::test]
    async fn test_empty_finalization_uses_fallback() {
        let client = Arc::new(ScriptedClient::new(vec![
            tool_response(vec![ToolCall::new("call_x", "echo", json!({}))]),
            final_response("   "),
        ]));
        let config = LoopConfig {
            max_rounds: 1,
            ..LoopConfig::default()
        };
        let orch = orchestrator(client, config);

        let result = orch
            .run(vec![Message::user("hi")], &ExecContext::new())
            .await
            .unwrap();
        assert_eq!(result.answer, FALLBACK_ANSWER);
    }

    #[tokio::test]
    async fn test_concurrent_round_preserves_call_order() {
        // 첫 호출(slow_echo)이 더 오래 걸려도 tool 메시지는 요청 순서대로
        let client = Arc::new(ScriptedClient::new(vec![
            tool_response(vec![
                ToolCall::new("call_a", "slow_echo", json!({})),
                ToolCall::new("call_b", "echo", json!({})),
            ]),
            final_response("done"),
        ]));
        let orch = orchestrator(client, LoopConfig::default());

        let result = orch
            .run(vec![Message::user("hi")], &ExecContext::new())
            .await
            .unwrap();

        let tool_ids: Vec<&str> = result
            .conversation
            .iter()
            .filter(|m| m.role == Role::Tool)
            .map(|m| m.tool_call_id.as_deref().unwrap())
            .collect();
        assert_eq!(tool_ids, vec!["call_a", "call_b"]);
    }

    #[tokio::test]
    async fn test_failed_call_flows_as_data() {
        // 등록되지 않은 도구 호출 - 루프는 계속되고 실패는 데이터로 전달
        let client = Arc::new(ScriptedClient::new(vec![
            tool_response(vec![ToolCall::new("call_1", "no_such_tool", json!({}))]),
            final_response("recovered"),
        ]));
        let orch = orchestrator(client, LoopConfig::default());

        let result = orch
            .run(vec![Message::user("hi")], &ExecContext::new())
            .await
            .unwrap();

        assert_eq!(result.answer, "recovered");
        let tool_msg = result
            .conversation
            .iter()
            .find(|m| m.role == Role::Tool)
            .unwrap();
        let parsed: Value = serde_json::from_str(&tool_msg.content).unwrap();
        assert_eq!(parsed["ok"], false);
        assert_eq!(parsed["code"], "not_found");
    }

    #[tokio::test]
    async fn test_oversized_tool_message_is_capped() {
        let client = Arc::new(ScriptedClient::new(vec![
            tool_response(vec![ToolCall::new("call_1", "big", json!({}))]),
            final_response("done"),
        ]));
        let config = LoopConfig {
            tool_message_cap: 500,
            ..LoopConfig::default()
        };
        let orch = orchestrator(client, config);

        let result = orch
            .run(vec![Message::user("hi")], &ExecContext::new())
            .await
            .unwrap();

        let tool_msg = result
            .conversation
            .iter()
            .find(|m| m.role == Role::Tool)
            .unwrap();
        assert!(tool_msg.content.ends_with(crate::conversation::TRUNCATION_MARKER));
        assert!(tool_msg.content.chars().count() <= 500 + 20);
    }

    #[tokio::test]
    async fn test_transport_error_propagates() {
        let client = Arc::new(ScriptedClient::new(vec![Err(ProviderError::Network(
            "connection refused".into(),
        ))]));
        let orch = orchestrator(client, LoopConfig::default());

        let err = orch
            .run(vec![Message::user("hi")], &ExecContext::new())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("connection refused"));
    }
}
