//! Core - 공용 타입 모듈

mod types;

pub use types::{
    ErrorCode, Message, OutcomeMeta, Role, SideEffect, ToolCall, ToolOutcome, ToolProgress,
};
