//! # driftwood-foundation
//!
//! Foundation layer for Driftwood:
//! - Core: 공용 타입 (Message, ToolCall, ToolOutcome, ErrorCode)
//! - Schema: 도구 인자 스키마 정의/검증/정리
//! - Config: 통합 설정 (DriftConfig, RuntimeConfig, LoopConfig)
//! - Error: 중앙 에러 타입
//!
//! ## 아키텍처
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │  Layer4-cli (clap, tracing-subscriber)                  │
//! ├─────────────────────────────────────────────────────────┤
//! │  Layer3-agent (tool-calling loop, research pipeline)    │
//! ├─────────────────────────────────────────────────────────┤
//! │  Layer2-provider (Ollama client)   Layer2-tool (runtime)│
//! ├─────────────────────────────────────────────────────────┤
//! │  Layer1-foundation (이 레이어)                           │
//! │  ├── 공용 타입 및 에러                                    │
//! │  ├── 인자 스키마 검증                                     │
//! │  └── 설정 로드                                           │
//! └─────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod core;
pub mod error;
pub mod schema;

// ============================================================================
// Error
// ============================================================================
pub use error::{Error, Result};

// ============================================================================
// Core (공용 타입)
// ============================================================================
pub use core::{
    ErrorCode, Message, OutcomeMeta, Role, SideEffect, ToolCall, ToolOutcome, ToolProgress,
};

// ============================================================================
// Schema
// ============================================================================
pub use schema::{sanitize_schema, ArgField, ArgSchema, ArgType};

// ============================================================================
// Config
// ============================================================================
pub use config::{
    DriftConfig, LoopConfig, ModelConfig, ResearchConfig, RuntimeConfig, SearchConfig,
};
