//! Configuration - 설정 로드 및 실행 제한
//!
//! `~/.driftwood/config.toml`에서 로드합니다 (`DRIFTWOOD_CONFIG`
//! 환경변수로 경로 재정의 가능). 파일이 없으면 기본값, 일부만 있으면
//! 필드별 기본값으로 채웁니다.
//!
//! `RuntimeConfig`는 한 번 로드된 뒤 불변이며, 동시 실행되는 도구
//! 호출들 사이에서 읽기 전용으로 공유됩니다.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

// ============================================================================
// RuntimeConfig - 도구 실행 제한
// ============================================================================

/// 도구 실행 런타임 제한
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// 호출당 타임아웃 (초)
    #[serde(default = "default_timeout_s")]
    pub timeout_s: f64,

    /// 호출당 최대 청크 수 (진행 알림 포함)
    #[serde(default = "default_max_chunks")]
    pub max_chunks: usize,

    /// 최대 결과 크기 (바이트)
    #[serde(default = "default_max_result_bytes")]
    pub max_result_bytes: usize,
}

fn default_timeout_s() -> f64 {
    30.0
}

fn default_max_chunks() -> usize {
    200
}

fn default_max_result_bytes() -> usize {
    2 * 1024 * 1024
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            timeout_s: default_timeout_s(),
            max_chunks: default_max_chunks(),
            max_result_bytes: default_max_result_bytes(),
        }
    }
}

impl RuntimeConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs_f64(self.timeout_s)
    }
}

// ============================================================================
// LoopConfig - 도구 호출 루프 제한
// ============================================================================

/// 도구 호출 루프 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoopConfig {
    /// 최대 라운드 수
    #[serde(default = "default_max_rounds")]
    pub max_rounds: usize,

    /// tool 메시지 content 길이 제한 (문자)
    ///
    /// 도구 출력은 모델 컨텍스트보다 수십 배 클 수 있습니다.
    /// 제한 없이 되돌려 보내면 다음 라운드의 프롬프트 예산을
    /// 조용히 고갈시킵니다.
    #[serde(default = "default_tool_message_cap")]
    pub tool_message_cap: usize,
}

fn default_max_rounds() -> usize {
    3
}

fn default_tool_message_cap() -> usize {
    4000
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            max_rounds: default_max_rounds(),
            tool_message_cap: default_tool_message_cap(),
        }
    }
}

// ============================================================================
// ModelConfig - 모델 서버 설정
// ============================================================================

/// 모델 서버 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Ollama 호환 서버 주소
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// 채팅 모델 이름
    #[serde(default = "default_chat_model")]
    pub chat_model: String,

    /// keep_alive 값 (예: "5m")
    #[serde(default)]
    pub keep_alive: Option<String>,
}

fn default_base_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_chat_model() -> String {
    "qwen2.5:7b".to_string()
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            chat_model: default_chat_model(),
            keep_alive: None,
        }
    }
}

// ============================================================================
// SearchConfig - 검색 서비스 주소
// ============================================================================

/// 검색/콘텐츠 서비스 주소
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchConfig {
    /// SearxNG 인스턴스 주소 (없으면 DuckDuckGo 폴백)
    #[serde(default)]
    pub searx_url: Option<String>,

    /// Kiwix 서버 주소 (오프라인 콘텐츠)
    #[serde(default)]
    pub kiwix_url: Option<String>,

    /// RAG 검색 제공자 주소
    #[serde(default)]
    pub retriever_url: Option<String>,
}

// ============================================================================
// ResearchConfig - 리서치 파이프라인 예산
// ============================================================================

/// 리서치 파이프라인 예산
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchConfig {
    /// 계획 단계에서 생성할 최대 쿼리 수
    #[serde(default = "default_max_queries")]
    pub max_queries: usize,

    /// 열어볼 최대 소스 수
    #[serde(default = "default_max_sources")]
    pub max_sources: usize,

    /// 소스당 최대 문자 수
    #[serde(default = "default_per_source_chars")]
    pub per_source_chars: usize,

    /// 주장 검증 단계 실행 여부
    #[serde(default)]
    pub verify: bool,
}

fn default_max_queries() -> usize {
    4
}

fn default_max_sources() -> usize {
    5
}

fn default_per_source_chars() -> usize {
    6000
}

impl Default for ResearchConfig {
    fn default() -> Self {
        Self {
            max_queries: default_max_queries(),
            max_sources: default_max_sources(),
            per_source_chars: default_per_source_chars(),
            verify: false,
        }
    }
}

// ============================================================================
// DriftConfig - 전체 설정
// ============================================================================

/// Driftwood 전체 설정
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DriftConfig {
    #[serde(default)]
    pub model: ModelConfig,

    #[serde(default)]
    pub runtime: RuntimeConfig,

    #[serde(default, rename = "loop")]
    pub loop_cfg: LoopConfig,

    #[serde(default)]
    pub search: SearchConfig,

    #[serde(default)]
    pub research: ResearchConfig,
}

impl DriftConfig {
    /// 기본 설정 파일 경로
    pub fn default_path() -> PathBuf {
        if let Ok(path) = std::env::var("DRIFTWOOD_CONFIG") {
            return PathBuf::from(path);
        }
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".driftwood")
            .join("config.toml")
    }

    /// 파일에서 로드, 없으면 기본값
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::default_path())
    }

    /// 지정 경로에서 로드
    ///
    /// 파일이 없으면 기본값을 반환합니다. 파일이 있지만 파싱에
    /// 실패하면 에러입니다 - 설정 오타를 조용히 무시하지 않습니다.
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!("No config file at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)?;
        toml::from_str(&raw).map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_runtime_defaults() {
        let cfg = RuntimeConfig::default();
        assert_eq!(cfg.timeout_s, 30.0);
        assert_eq!(cfg.max_chunks, 200);
        assert_eq!(cfg.max_result_bytes, 2 * 1024 * 1024);
        assert_eq!(cfg.timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_load_missing_file_is_default() {
        let cfg = DriftConfig::load_from(std::path::Path::new("/nonexistent/config.toml")).unwrap();
        assert_eq!(cfg.loop_cfg.max_rounds, 3);
        assert_eq!(cfg.model.base_url, "http://localhost:11434");
    }

    #[test]
    fn test_load_partial_file_fills_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[model]\nchat_model = \"llama3.2\"\n\n[loop]\nmax_rounds = 5\n"
        )
        .unwrap();

        let cfg = DriftConfig::load_from(file.path()).unwrap();
        assert_eq!(cfg.model.chat_model, "llama3.2");
        assert_eq!(cfg.model.base_url, "http://localhost:11434");
        assert_eq!(cfg.loop_cfg.max_rounds, 5);
        assert_eq!(cfg.loop_cfg.tool_message_cap, 4000);
        assert_eq!(cfg.runtime.max_chunks, 200);
    }

    #[test]
    fn test_load_invalid_file_is_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[runtime]\ntimeout_s = \"fast\"").unwrap();
        assert!(DriftConfig::load_from(file.path()).is_err());
    }
}
