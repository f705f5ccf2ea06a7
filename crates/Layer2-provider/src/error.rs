//! Provider-specific error types
//!
//! ProviderError는 모델 서버와의 전송 계층 에러를 관리합니다.
//! 이 에러들은 루프 전체에 치명적입니다 - 모델 없이는 대화를 이어갈
//! 방법이 없으므로 오케스트레이터 밖으로 전파됩니다.

use driftwood_foundation::Error as FoundationError;
use thiserror::Error;

/// Errors that can occur talking to the model server
#[derive(Error, Debug, Clone)]
pub enum ProviderError {
    /// Network error (connection refused, DNS, timeout)
    #[error("Network error: {0}")]
    Network(String),

    /// Server returned non-2xx status
    #[error("Server error: {0}")]
    ServerError(String),

    /// Model not found on the server
    #[error("Model not found: {0}")]
    ModelNotFound(String),

    /// Response body was not the expected JSON shape
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Bad request parameters
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl ProviderError {
    /// Create from HTTP status code and body
    pub fn from_http_status(status: u16, body: &str, model: &str) -> Self {
        match status {
            404 => ProviderError::ModelNotFound(format!(
                "Model '{}' not found. Run 'ollama pull {}' first.",
                model, model
            )),
            400 => ProviderError::InvalidRequest(body.to_string()),
            _ => ProviderError::ServerError(format!("HTTP {}: {}", status, body)),
        }
    }

    /// 일시적인 에러인지 (상위 재시도 정책용)
    pub fn is_transient(&self) -> bool {
        matches!(self, ProviderError::Network(_) | ProviderError::ServerError(_))
    }
}

impl From<ProviderError> for FoundationError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::Network(msg) => FoundationError::Http(msg),
            ProviderError::ServerError(msg) => FoundationError::api("ollama", msg),
            ProviderError::ModelNotFound(msg) => FoundationError::Provider(msg),
            ProviderError::InvalidResponse(msg) => {
                FoundationError::Provider(format!("Invalid response: {}", msg))
            }
            ProviderError::InvalidRequest(msg) => FoundationError::InvalidInput(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_http_status_404_hints_pull() {
        let err = ProviderError::from_http_status(404, "", "llama3.2");
        assert!(matches!(err, ProviderError::ModelNotFound(_)));
        assert!(err.to_string().contains("ollama pull llama3.2"));
    }

    #[test]
    fn test_transient_classification() {
        assert!(ProviderError::Network("refused".into()).is_transient());
        assert!(!ProviderError::InvalidRequest("bad".into()).is_transient());
    }
}
