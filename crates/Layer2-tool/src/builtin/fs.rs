//! ReadFile Tool
//!
//! Bounded file read. Returns at most `max_bytes` of UTF-8 text plus a
//! truncation flag, so a model cannot pull an arbitrarily large file
//! into the conversation.

use crate::spec::{DirectHandler, ExecContext, ToolFailure, ToolSpec};
use async_trait::async_trait;
use driftwood_foundation::{ArgSchema, ErrorCode, SideEffect};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::info;

const DEFAULT_MAX_BYTES: usize = 100_000;

pub struct ReadFileTool {
    max_bytes: usize,
}

impl ReadFileTool {
    pub fn new() -> Self {
        Self {
            max_bytes: DEFAULT_MAX_BYTES,
        }
    }

    pub fn with_max_bytes(mut self, max_bytes: usize) -> Self {
        self.max_bytes = max_bytes;
        self
    }
}

impl Default for ReadFileTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DirectHandler for ReadFileTool {
    async fn run(&self, args: Value, _ctx: &ExecContext) -> Result<Value, ToolFailure> {
        let path = args["path"].as_str().unwrap_or_default();
        info!("read_file: path='{}'", path);

        let metadata = tokio::fs::metadata(path).await.map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => {
                ToolFailure::new(ErrorCode::NotFound, format!("file not found: {}", path))
            }
            std::io::ErrorKind::PermissionDenied => {
                ToolFailure::access_denied(format!("permission denied: {}", path))
            }
            _ => ToolFailure::exception(&e),
        })?;

        if !metadata.is_file() {
            return Err(ToolFailure::new(
                ErrorCode::InvalidArgs,
                format!("not a regular file: {}", path),
            ));
        }

        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| ToolFailure::exception(&e))?;

        let truncated = bytes.len() > self.max_bytes;
        let slice = &bytes[..bytes.len().min(self.max_bytes)];
        let content = String::from_utf8_lossy(slice).to_string();

        Ok(json!({
            "path": path,
            "size_bytes": metadata.len(),
            "content": content,
            "truncated": truncated,
        }))
    }
}

pub fn read_file_spec() -> ToolSpec {
    ToolSpec::direct(
        "read_file",
        "Read a text file from the local filesystem (bounded).",
        ArgSchema::new().string("path", "Absolute or relative file path", true),
        Arc::new(ReadFileTool::new()),
    )
    .side_effect(SideEffect::ReadOnly)
}
