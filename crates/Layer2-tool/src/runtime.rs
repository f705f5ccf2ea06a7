//! Tool Execution Runtime - 단일 호출 실행 상태 기계
//!
//! 하나의 ToolCall은 다음 단계를 순서대로 통과합니다:
//!
//! ```text
//! Lookup → Validate → Confirmation → Dispatch(timeout) → Terminal
//! ```
//!
//! 어떤 경로로 끝나든 정확히 하나의 `ToolOutcome`이 반환되며,
//! 모든 결과가 `meta.tool`과 `meta.call_id`를 가집니다. 핸들러
//! 실패는 값으로 전파됩니다 - 이 함수는 에러를 반환하지 않습니다.

use crate::registry::{RegisteredTool, ToolRegistry};
use crate::spec::{ExecContext, HandlerEvent, ToolEvent, ToolFailure, ToolHandler};
use driftwood_foundation::{ErrorCode, RuntimeConfig, ToolCall, ToolOutcome};
use futures::StreamExt;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Instant;
use tokio::time::timeout;

/// 확인 게이트 정책
///
/// - `Standard`: 미확인 호출을 `confirmation_required`로 보고.
///   호출자가 확인을 받아 재시도할 수 있습니다.
/// - `Strict`: 미확인 호출을 `access_denied`로 보고. 재시도 의미가
///   없는 비대화형 환경용입니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConfirmPolicy {
    #[default]
    Standard,
    Strict,
}

/// 도구 실행 런타임
pub struct ToolRuntime {
    registry: Arc<ToolRegistry>,
    config: RuntimeConfig,
    confirm_policy: ConfirmPolicy,
}

impl ToolRuntime {
    pub fn new(registry: Arc<ToolRegistry>, config: RuntimeConfig) -> Self {
        Self {
            registry,
            config,
            confirm_policy: ConfirmPolicy::default(),
        }
    }

    pub fn with_confirm_policy(mut self, policy: ConfirmPolicy) -> Self {
        self.confirm_policy = policy;
        self
    }

    pub fn registry(&self) -> &Arc<ToolRegistry> {
        &self.registry
    }

    /// 단일 도구 호출 실행
    pub async fn execute(&self, call: &ToolCall, ctx: &ExecContext) -> ToolOutcome {
        let started = Instant::now();

        // 1. Lookup - 비활성 도구도 모델 입장에서는 존재하지 않음
        let tool = match self.registry.get(&call.name) {
            Some(t) if t.spec.enabled => Arc::clone(t),
            _ => {
                tracing::warn!(tool = %call.name, call_id = %call.id, "Unknown tool requested");
                return ToolOutcome::failure(
                    &call.name,
                    &call.id,
                    ErrorCode::NotFound,
                    format!("unknown tool: {}", call.name),
                    elapsed_ms(started),
                );
            }
        };

        // 2. Validate - 핸들러는 검증 통과 전에 호출되지 않음
        if let Err(violations) = tool.spec.args.validate(&call.arguments) {
            tracing::warn!(
                tool = %call.name,
                call_id = %call.id,
                violations = violations.len(),
                "Argument validation failed"
            );
            return ToolOutcome::failure(
                &call.name,
                &call.id,
                ErrorCode::InvalidArgs,
                format!("invalid arguments for {}", call.name),
                elapsed_ms(started),
            )
            .with_detail(json!({ "violations": violations }));
        }

        // 3. Confirmation gate
        if tool.spec.requires_confirmation && !ctx.is_confirmed(&call.name) {
            let (code, message) = match self.confirm_policy {
                ConfirmPolicy::Standard => (
                    ErrorCode::ConfirmationRequired,
                    format!("{} requires user confirmation", call.name),
                ),
                ConfirmPolicy::Strict => (
                    ErrorCode::AccessDenied,
                    format!("{} is not permitted in this session", call.name),
                ),
            };
            return ToolOutcome::failure(&call.name, &call.id, code, message, elapsed_ms(started));
        }

        // 4. Dispatch - 전체 실행을 타임아웃으로 감쌈
        let budget = self.config.timeout();
        let dispatched = timeout(budget, self.dispatch(&tool, call, ctx));

        let outcome = match dispatched.await {
            Ok(terminal) => self.finish(&tool, call, terminal, started),
            Err(_) => {
                tracing::warn!(
                    tool = %call.name,
                    call_id = %call.id,
                    timeout_s = self.config.timeout_s,
                    "Tool execution timed out"
                );
                ToolOutcome::failure(
                    &call.name,
                    &call.id,
                    ErrorCode::Timeout,
                    format!("{} timed out after {}s", call.name, self.config.timeout_s),
                    elapsed_ms(started),
                )
                .with_detail(json!({ "timeout_s": self.config.timeout_s }))
            }
        };

        tracing::debug!(
            tool = %call.name,
            call_id = %call.id,
            ok = outcome.ok,
            duration_ms = outcome.meta.duration_ms,
            "Tool call finished"
        );
        outcome
    }

    /// 핸들러 변형별 디스패치
    ///
    /// 반환값은 "크기 검사 전의 종단 결과"입니다.
    async fn dispatch(
        &self,
        tool: &RegisteredTool,
        call: &ToolCall,
        ctx: &ExecContext,
    ) -> Result<Value, ToolFailure> {
        match &tool.spec.handler {
            ToolHandler::Direct(handler) => handler.run(call.arguments.clone(), ctx).await,
            ToolHandler::Streaming(handler) => {
                self.drain_stream(handler.run(call.arguments.clone()), ctx)
                    .await
            }
        }
    }

    /// 스트림 소비
    ///
    /// 모든 yield 항목(진행 알림 포함)이 청크 한도에 계산됩니다.
    /// 한도를 넘는 항목이 나오는 즉시 중단하며, 그 항목은 전달되지
    /// 않습니다. 정확히 한도만큼 내보내고 소진되는 것은 정상입니다.
    async fn drain_stream(
        &self,
        mut stream: futures::stream::BoxStream<'static, Result<HandlerEvent, ToolFailure>>,
        ctx: &ExecContext,
    ) -> Result<Value, ToolFailure> {
        let mut count: usize = 0;
        let mut last_chunk: Option<Value> = None;

        while let Some(item) = stream.next().await {
            let event = item?;

            count += 1;
            if count > self.config.max_chunks {
                return Err(ToolFailure::new(
                    ErrorCode::MaxChunksExceeded,
                    format!("stream exceeded {} chunks", self.config.max_chunks),
                ));
            }

            match event {
                HandlerEvent::Progress(progress) => {
                    ctx.emit(ToolEvent::Progress(progress));
                }
                HandlerEvent::Chunk(value) => {
                    ctx.emit(ToolEvent::Chunk(value.clone()));
                    last_chunk = Some(value);
                }
            }
        }

        // 진행 알림은 종단이 아님 - 청크 없이 소진되면 결과 없음
        last_chunk.ok_or_else(|| {
            ToolFailure::new(ErrorCode::NoResult, "stream ended without a result chunk")
        })
    }

    /// 종단 결과를 ToolOutcome으로 정규화 (성공 경로는 크기 검사 포함)
    fn finish(
        &self,
        tool: &RegisteredTool,
        call: &ToolCall,
        terminal: Result<Value, ToolFailure>,
        started: Instant,
    ) -> ToolOutcome {
        match terminal {
            Ok(result) => {
                let size = serde_json::to_vec(&result).map(|v| v.len()).unwrap_or(0);
                if size > self.config.max_result_bytes {
                    // 페이로드는 버리고 크기만 보고
                    return ToolOutcome::failure(
                        &tool.spec.name,
                        &call.id,
                        ErrorCode::OutputTooLarge,
                        format!(
                            "result of {} bytes exceeds limit of {} bytes",
                            size, self.config.max_result_bytes
                        ),
                        elapsed_ms(started),
                    )
                    .with_detail(json!({ "result_bytes": size }));
                }
                ToolOutcome::success(&tool.spec.name, &call.id, result, elapsed_ms(started))
            }
            Err(failure) => {
                let outcome = ToolOutcome::failure(
                    &tool.spec.name,
                    &call.id,
                    failure.code,
                    failure.message,
                    elapsed_ms(started),
                );
                match failure.kind {
                    Some(kind) => outcome.with_detail(json!({ "kind": kind })),
                    None => outcome,
                }
            }
        }
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis() as u64
}
