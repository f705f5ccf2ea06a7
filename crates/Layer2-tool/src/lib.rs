//! # driftwood-tool
//!
//! 도구 서브시스템:
//! - Spec: 도구 정의와 두 가지 핸들러 변형 (Direct / Streaming)
//! - Registry: 이름 기반 레지스트리, 등록 시점 스키마 캐시
//! - Runtime: 호출당 실행 상태 기계 (검증 → 확인 → 타임아웃 디스패치)
//! - Gate: 외부 검색 서비스별 직렬화
//! - Builtin: web_search, doc_search, kiwix_search, fetch_page,
//!   read_file, shell, get_time
//!
//! 호출 수준 실패는 항상 `ToolOutcome` 값으로 보고됩니다.
//! `execute()`는 에러를 반환하지 않습니다.

pub mod builtin;
pub mod gate;
pub mod registry;
pub mod runtime;
pub mod spec;

pub use gate::ProviderGate;
pub use registry::{RegisteredTool, ToolRegistry};
pub use runtime::{ConfirmPolicy, ToolRuntime};
pub use spec::{
    DirectHandler, ExecContext, HandlerEvent, StreamingHandler, ToolEvent, ToolFailure,
    ToolHandler, ToolSpec,
};
