//! Error types for Driftwood
//!
//! 모든 에러를 중앙에서 관리
//!
//! 주의: 개별 도구 호출의 실패는 여기의 에러가 아니라 `ToolOutcome`
//! 데이터로 표현됩니다 (core/types.rs 참조). 여기의 에러는 설정 오류,
//! 전송 오류 등 복구 불가능한 경우에만 사용합니다.

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Driftwood 에러 타입
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // 설정 관련 (시작 시점에 치명적)
    // ========================================================================
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Duplicate tool registration: {0}")]
    DuplicateTool(String),

    // ========================================================================
    // Provider 관련 (전송 계층)
    // ========================================================================
    #[error("Provider error: {0}")]
    Provider(String),

    #[error("API error: {provider} - {message}")]
    Api { provider: String, message: String },

    // ========================================================================
    // Tool 관련
    // ========================================================================
    #[error("Tool error: {0}")]
    Tool(String),

    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    // ========================================================================
    // 실행 관련
    // ========================================================================
    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Cancelled")]
    Cancelled,

    // ========================================================================
    // 일반
    // ========================================================================
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Validation error: {0}")]
    Validation(String),

    // ========================================================================
    // 외부 에러 변환
    // ========================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(String),

    // ========================================================================
    // 기타
    // ========================================================================
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// 재시도 가능한 에러인지 확인
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Timeout(_) | Error::Http(_))
    }

    /// 사용자에게 보여줄 수 있는 에러인지 확인
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            Error::InvalidInput(_) | Error::Validation(_) | Error::Cancelled
        )
    }

    /// API 에러 생성 헬퍼
    pub fn api(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Api {
            provider: provider.into(),
            message: message.into(),
        }
    }
}

impl From<String> for Error {
    fn from(s: String) -> Self {
        Error::Internal(s)
    }
}

impl From<&str> for Error {
    fn from(s: &str) -> Self {
        Error::Internal(s.to_string())
    }
}
