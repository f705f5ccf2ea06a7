//! Core Types - 공용 타입 정의
//!
//! 모든 레이어에서 공통으로 사용하는 타입들:
//! - 대화 메시지 (`Message`, `Role`)
//! - 도구 호출 요청/결과 (`ToolCall`, `ToolOutcome`)
//! - 진행 알림 (`ToolProgress`)
//! - 안정적인 에러 코드 어휘 (`ErrorCode`)

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

// ============================================================================
// Message - 대화 메시지
// ============================================================================

/// 메시지 역할
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

/// 대화 메시지
///
/// tool 역할 메시지는 반드시 `name`과 `tool_call_id`를 가지며,
/// content는 항상 JSON으로 파싱 가능한 문자열입니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,

    /// Assistant가 요청한 도구 호출들 (assistant 역할만)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,

    /// 응답 대상 도구 이름 (tool 역할만)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// 응답 대상 호출 ID (tool 역할만)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
            tool_calls: None,
            name: None,
            tool_call_id: None,
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            tool_calls: None,
            name: None,
            tool_call_id: None,
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            tool_calls: None,
            name: None,
            tool_call_id: None,
        }
    }

    /// 도구 호출을 포함한 assistant 메시지
    ///
    /// 모델이 보낸 tool_calls를 그대로 보존합니다 (감사/디버깅용).
    pub fn assistant_with_tools(content: impl Into<String>, tool_calls: Vec<ToolCall>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            tool_calls: Some(tool_calls),
            name: None,
            tool_call_id: None,
        }
    }

    /// 도구 결과 메시지
    ///
    /// content는 호출자가 이미 JSON 직렬화 + 길이 제한을 적용한 문자열입니다.
    pub fn tool(
        tool_name: impl Into<String>,
        tool_call_id: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            role: Role::Tool,
            content: content.into(),
            tool_calls: None,
            name: Some(tool_name.into()),
            tool_call_id: Some(tool_call_id.into()),
        }
    }
}

// ============================================================================
// ToolCall - 도구 호출 요청
// ============================================================================

/// 모델 응답에서 추출한 단일 도구 호출 요청
///
/// `name`이 레지스트리에 없어도 유효한 요청입니다. unknown-tool은
/// 실행 런타임이 `not_found` 결과로 보고합니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    /// 상관관계 ID (없으면 생성됨)
    pub id: String,

    /// 호출할 도구 이름
    pub name: String,

    /// 검증 전의 원시 인자
    pub arguments: Value,
}

impl ToolCall {
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: Value) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments,
        }
    }

    /// 상관관계 ID 생성 (모델이 ID를 생략한 경우)
    pub fn generate_id() -> String {
        let uuid = Uuid::new_v4().simple().to_string();
        format!("call_{}", &uuid[..12])
    }

    /// 인자 디코딩 (방어적)
    ///
    /// 모델에 따라 arguments가 JSON 객체 또는 JSON 인코딩된 문자열로
    /// 도착합니다. 문자열 디코딩에 실패하면 빈 객체로 대체합니다 -
    /// 라운드를 중단하는 대신 도구 검증 단계가 invalid_args로 보고하도록.
    pub fn decode_arguments(raw: &Value) -> Value {
        match raw {
            Value::String(s) => match serde_json::from_str::<Value>(s) {
                Ok(Value::Object(map)) => Value::Object(map),
                Ok(other) => {
                    tracing::warn!("Tool arguments decoded to non-object: {}", other);
                    Value::Object(serde_json::Map::new())
                }
                Err(e) => {
                    tracing::warn!("Failed to decode tool arguments: {}", e);
                    Value::Object(serde_json::Map::new())
                }
            },
            Value::Object(_) => raw.clone(),
            Value::Null => Value::Object(serde_json::Map::new()),
            other => {
                tracing::warn!("Unexpected tool arguments shape: {}", other);
                Value::Object(serde_json::Map::new())
            }
        }
    }
}

// ============================================================================
// ToolProgress - 중간 진행 알림
// ============================================================================

/// 핸들러가 최종 결과 전에 보낼 수 있는 진행 알림
///
/// 비종단(non-terminal) 신호입니다. 런타임은 진행 알림을 관찰한 뒤에도
/// 청크 한도까지 최종 결과를 계속 기다립니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolProgress {
    /// 단계 레이블
    pub step: String,

    /// 현재 진행 수
    pub current: u32,

    /// 전체 수
    pub total: u32,

    /// 사람이 읽을 수 있는 메시지
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ToolProgress {
    pub fn new(step: impl Into<String>, current: u32, total: u32) -> Self {
        Self {
            step: step.into(),
            current,
            total,
            message: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

// ============================================================================
// ErrorCode - 안정적인 에러 코드 어휘
// ============================================================================

/// 도구 호출 실패 코드
///
/// 내부와 HTTP 경계에서 동일하게 사용하는 고정 어휘입니다.
/// 문자열 매칭 대신 이 enum으로 분기하세요.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    NotFound,
    InvalidArgs,
    Timeout,
    OutputTooLarge,
    MaxChunksExceeded,
    NoResult,
    Exception,
    AccessDenied,
    ConfirmationRequired,
    DependencyMissing,
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ErrorCode::NotFound => "not_found",
            ErrorCode::InvalidArgs => "invalid_args",
            ErrorCode::Timeout => "timeout",
            ErrorCode::OutputTooLarge => "output_too_large",
            ErrorCode::MaxChunksExceeded => "max_chunks_exceeded",
            ErrorCode::NoResult => "no_result",
            ErrorCode::Exception => "exception",
            ErrorCode::AccessDenied => "access_denied",
            ErrorCode::ConfirmationRequired => "confirmation_required",
            ErrorCode::DependencyMissing => "dependency_missing",
        };
        write!(f, "{}", s)
    }
}

// ============================================================================
// SideEffect - 부수효과 분류
// ============================================================================

/// 도구의 부수효과 분류
///
/// 확인(confirmation) 없이 실행해도 되는지 판단하는 데 사용합니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SideEffect {
    ReadOnly,
    Network,
    FilesystemWrite,
    Dangerous,
}

// ============================================================================
// ToolOutcome - 정규화된 종단 결과
// ============================================================================

/// 결과 메타데이터
///
/// not_found 경로를 포함한 모든 종단 결과가 tool 이름과 call_id를
/// 가집니다 - 오케스트레이터가 항상 원래 ToolCall과 매칭할 수 있도록.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutcomeMeta {
    pub tool: String,
    pub call_id: String,
    pub duration_ms: u64,

    /// 성공 시 결과 크기 (바이트)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result_bytes: Option<usize>,

    /// 실패 상세 (검증 위반 목록, 예외 타입 이름, timeout_s 등)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<Value>,
}

/// 도구 호출 하나의 정규화된 종단 결과
///
/// 불변식: `result`와 `error` 중 정확히 하나만 채워집니다.
/// `code`는 `ok=false`일 때만 존재합니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolOutcome {
    pub ok: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<ErrorCode>,

    pub meta: OutcomeMeta,
}

impl ToolOutcome {
    /// 성공 결과 생성
    pub fn success(
        tool: impl Into<String>,
        call_id: impl Into<String>,
        result: Value,
        duration_ms: u64,
    ) -> Self {
        let result_bytes = serde_json::to_vec(&result).map(|v| v.len()).unwrap_or(0);
        Self {
            ok: true,
            result: Some(result),
            error: None,
            code: None,
            meta: OutcomeMeta {
                tool: tool.into(),
                call_id: call_id.into(),
                duration_ms,
                result_bytes: Some(result_bytes),
                detail: None,
            },
        }
    }

    /// 실패 결과 생성
    pub fn failure(
        tool: impl Into<String>,
        call_id: impl Into<String>,
        code: ErrorCode,
        error: impl Into<String>,
        duration_ms: u64,
    ) -> Self {
        Self {
            ok: false,
            result: None,
            error: Some(error.into()),
            code: Some(code),
            meta: OutcomeMeta {
                tool: tool.into(),
                call_id: call_id.into(),
                duration_ms,
                result_bytes: None,
                detail: None,
            },
        }
    }

    /// 실패 상세 첨부
    pub fn with_detail(mut self, detail: Value) -> Self {
        self.meta.detail = Some(detail);
        self
    }

    /// 대화에 넣을 JSON 문자열로 직렬화
    pub fn to_json_string(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| {
            // serde_json은 이 타입에서 실패하지 않지만, 만약을 위한 최소 폴백
            format!(
                r#"{{"ok":false,"error":"serialization failed","code":"exception","meta":{{"tool":"{}","call_id":"{}","duration_ms":0}}}}"#,
                self.meta.tool, self.meta.call_id
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_error_code_serialization() {
        let code = ErrorCode::MaxChunksExceeded;
        assert_eq!(
            serde_json::to_string(&code).unwrap(),
            "\"max_chunks_exceeded\""
        );
        assert_eq!(code.to_string(), "max_chunks_exceeded");
    }

    #[test]
    fn test_outcome_exactly_one_of_result_error() {
        let ok = ToolOutcome::success("get_time", "call_1", json!("12:00"), 3);
        assert!(ok.ok);
        assert!(ok.result.is_some());
        assert!(ok.error.is_none());
        assert!(ok.code.is_none());
        assert_eq!(ok.meta.result_bytes, Some(7)); // "\"12:00\""

        let err = ToolOutcome::failure("get_time", "call_2", ErrorCode::Timeout, "timed out", 30);
        assert!(!err.ok);
        assert!(err.result.is_none());
        assert!(err.error.is_some());
        assert_eq!(err.code, Some(ErrorCode::Timeout));
    }

    #[test]
    fn test_outcome_meta_always_carries_identity() {
        let err = ToolOutcome::failure("nope", "call_9", ErrorCode::NotFound, "unknown tool", 0);
        assert_eq!(err.meta.tool, "nope");
        assert_eq!(err.meta.call_id, "call_9");
        let s = err.to_json_string();
        let parsed: Value = serde_json::from_str(&s).unwrap();
        assert_eq!(parsed["code"], "not_found");
        assert_eq!(parsed["meta"]["call_id"], "call_9");
    }

    #[test]
    fn test_decode_arguments_object_passthrough() {
        let raw = json!({"query": "hello"});
        assert_eq!(ToolCall::decode_arguments(&raw), raw);
    }

    #[test]
    fn test_decode_arguments_json_string() {
        let raw = json!(r#"{"query": "hello"}"#);
        assert_eq!(ToolCall::decode_arguments(&raw), json!({"query": "hello"}));
    }

    #[test]
    fn test_decode_arguments_invalid_falls_back_to_empty() {
        let raw = json!("{not json");
        assert_eq!(ToolCall::decode_arguments(&raw), json!({}));
        assert_eq!(ToolCall::decode_arguments(&Value::Null), json!({}));
    }

    #[test]
    fn test_generate_id_unique() {
        let a = ToolCall::generate_id();
        let b = ToolCall::generate_id();
        assert!(a.starts_with("call_"));
        assert_ne!(a, b);
    }

    #[test]
    fn test_tool_message_carries_correlation() {
        let msg = Message::tool("web_search", "call_3", "{\"ok\":true}");
        assert_eq!(msg.role, Role::Tool);
        assert_eq!(msg.name.as_deref(), Some("web_search"));
        assert_eq!(msg.tool_call_id.as_deref(), Some("call_3"));
        assert!(serde_json::from_str::<Value>(&msg.content).is_ok());
    }
}
