//! Tool Spec - 도구 정의와 핸들러 변형
//!
//! 핸들러는 등록 시점에 선택된 두 가지 닫힌 변형 중 하나입니다:
//! - `Direct`: 한 번 await하면 끝나는 핸들러
//! - `Streaming`: 진행 알림/청크를 순차적으로 내보내는 핸들러
//!
//! 호출 시점에 반환값 모양을 들여다보는 대신, 런타임은 변형별로
//! 한 번만 분기합니다.

use async_trait::async_trait;
use driftwood_foundation::{ArgSchema, ErrorCode, SideEffect, ToolProgress};
use futures::stream::BoxStream;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::mpsc;

// ============================================================================
// ToolFailure - 태그된 핸들러 실패
// ============================================================================

/// 핸들러 실패
///
/// 모든 실패 경로는 이 태그된 값으로 표현됩니다 - 런타임 경계에서
/// 문자열 매칭하는 catch-all 예외 처리가 아니라, 코드가 정적으로
/// 검사 가능하도록.
#[derive(Debug, Clone)]
pub struct ToolFailure {
    pub code: ErrorCode,
    pub message: String,

    /// 원인 타입 이름 (exception일 때, meta.detail로 전달)
    pub kind: Option<String>,
}

impl ToolFailure {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            kind: None,
        }
    }

    /// 외부 의존 서비스가 설정되지 않음
    pub fn dependency_missing(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::DependencyMissing, message)
    }

    /// 접근 거부
    pub fn access_denied(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::AccessDenied, message)
    }

    /// 분류되지 않은 실패
    ///
    /// 원인 에러의 타입 이름만 기록합니다. 원시 트레이스는 모델에
    /// 되돌려 보내기에 안전하지 않으므로 포함하지 않습니다.
    pub fn exception<E: std::fmt::Display>(err: &E) -> Self {
        Self {
            code: ErrorCode::Exception,
            message: err.to_string(),
            kind: Some(short_type_name::<E>()),
        }
    }
}

fn short_type_name<T: ?Sized>() -> String {
    let full = std::any::type_name::<T>();
    full.rsplit("::").next().unwrap_or(full).to_string()
}

impl std::fmt::Display for ToolFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

// ============================================================================
// Handler Traits
// ============================================================================

/// 실행 컨텍스트
///
/// 호출자가 넘긴 확인(confirmation) 상태와 진행 이벤트 수신처를
/// 담습니다. 한 라운드의 호출들 사이에서 공유되며 읽기 전용입니다.
#[derive(Default)]
pub struct ExecContext {
    confirmed: HashSet<String>,
    confirm_all: bool,
    events: Option<mpsc::UnboundedSender<ToolEvent>>,
}

impl ExecContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// 특정 도구 실행을 확인
    pub fn confirm(mut self, tool_name: impl Into<String>) -> Self {
        self.confirmed.insert(tool_name.into());
        self
    }

    /// 모든 도구 실행을 확인 (비대화형 배치 등)
    pub fn confirm_all(mut self) -> Self {
        self.confirm_all = true;
        self
    }

    /// 진행/청크 이벤트 수신처 연결
    pub fn with_events(mut self, tx: mpsc::UnboundedSender<ToolEvent>) -> Self {
        self.events = Some(tx);
        self
    }

    pub fn is_confirmed(&self, tool_name: &str) -> bool {
        self.confirm_all || self.confirmed.contains(tool_name)
    }

    /// 이벤트 전달 (수신처가 없거나 닫혔으면 무시)
    pub fn emit(&self, event: ToolEvent) {
        if let Some(tx) = &self.events {
            let _ = tx.send(event);
        }
    }
}

/// 런타임이 호출자에게 전달하는 비종단 이벤트
#[derive(Debug, Clone)]
pub enum ToolEvent {
    Progress(ToolProgress),
    Chunk(Value),
}

/// 스트리밍 핸들러가 내보내는 항목
#[derive(Debug, Clone)]
pub enum HandlerEvent {
    /// 진행 알림 - 종단 결과로 취급되지 않음
    Progress(ToolProgress),

    /// 결과 청크 - 스트림 소진 직전의 마지막 청크가 종단 결과가 됨
    Chunk(Value),
}

/// 직접 반환 핸들러
#[async_trait]
pub trait DirectHandler: Send + Sync {
    async fn run(&self, args: Value, ctx: &ExecContext) -> Result<Value, ToolFailure>;
}

/// 스트리밍 핸들러
///
/// 진행 알림만 내보내고 청크 없이 소진되면 런타임이 `no_result`로
/// 보고합니다 - 스트리밍 도구는 최종 페이로드를 명시적으로 전달해야
/// 합니다.
pub trait StreamingHandler: Send + Sync {
    fn run(&self, args: Value) -> BoxStream<'static, Result<HandlerEvent, ToolFailure>>;
}

/// 핸들러 능력 (등록 시점에 선택)
#[derive(Clone)]
pub enum ToolHandler {
    Direct(Arc<dyn DirectHandler>),
    Streaming(Arc<dyn StreamingHandler>),
}

// ============================================================================
// ToolSpec - 등록된 도구 정의
// ============================================================================

/// 등록된 도구 정의
///
/// 레지스트리 조립 시점에 한 번 생성되고 이후 불변입니다.
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    pub args: ArgSchema,
    pub handler: ToolHandler,
    pub side_effect: SideEffect,
    pub requires_confirmation: bool,
    pub enabled: bool,
}

impl ToolSpec {
    /// 직접 반환 핸들러로 생성
    pub fn direct(
        name: impl Into<String>,
        description: impl Into<String>,
        args: ArgSchema,
        handler: Arc<dyn DirectHandler>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            args,
            handler: ToolHandler::Direct(handler),
            side_effect: SideEffect::ReadOnly,
            requires_confirmation: false,
            enabled: true,
        }
    }

    /// 스트리밍 핸들러로 생성
    pub fn streaming(
        name: impl Into<String>,
        description: impl Into<String>,
        args: ArgSchema,
        handler: Arc<dyn StreamingHandler>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            args,
            handler: ToolHandler::Streaming(handler),
            side_effect: SideEffect::ReadOnly,
            requires_confirmation: false,
            enabled: true,
        }
    }

    pub fn side_effect(mut self, side_effect: SideEffect) -> Self {
        self.side_effect = side_effect;
        self
    }

    /// dangerous로 분류하고 확인을 요구
    pub fn dangerous(mut self) -> Self {
        self.side_effect = SideEffect::Dangerous;
        self.requires_confirmation = true;
        self
    }

    pub fn requires_confirmation(mut self, value: bool) -> Self {
        self.requires_confirmation = value;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }
}
