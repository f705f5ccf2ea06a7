//! # driftwood-provider
//!
//! Ollama 호환 모델 서버 클라이언트.
//!
//! 오케스트레이터는 `ChatClient` trait에만 의존합니다. 실제 서버는
//! `OllamaClient`, 테스트는 스크립트된 가짜 구현을 사용합니다.

mod client;
mod error;
mod r#trait;

pub use client::OllamaClient;
pub use error::ProviderError;
pub use r#trait::{ChatClient, ChatRequest, ChatResponse, ToolDecl};
