//! # driftwood-agent
//!
//! 에이전트 레이어:
//! - Orchestrator: 유한 라운드 도구 호출 루프
//! - Conversation: 대화 구성과 tool 메시지 캡
//! - Research: 계획 → 검색 → 열람 → (검증) → 종합 파이프라인
//! - Blocking: 동기 컨텍스트용 전용 스레드 실행기

pub mod blocking;
pub mod conversation;
pub mod orchestrator;
pub mod research;

pub use blocking::run_blocking;
pub use conversation::{cap_tool_content, seed_conversation, TRUNCATION_MARKER};
pub use orchestrator::{LoopResult, Orchestrator, FALLBACK_ANSWER};
pub use research::{ResearchPipeline, ResearchReport, SourceDigest};
