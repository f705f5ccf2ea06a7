//! GetTime Tool
//!
//! No-argument demo tool. Doubles as the smallest possible handler
//! example.

use crate::spec::{DirectHandler, ExecContext, ToolFailure, ToolSpec};
use async_trait::async_trait;
use chrono::{Local, Utc};
use driftwood_foundation::ArgSchema;
use serde_json::{json, Value};
use std::sync::Arc;

pub struct GetTimeTool;

#[async_trait]
impl DirectHandler for GetTimeTool {
    async fn run(&self, _args: Value, _ctx: &ExecContext) -> Result<Value, ToolFailure> {
        Ok(json!({
            "utc": Utc::now().to_rfc3339(),
            "local": Local::now().to_rfc3339(),
        }))
    }
}

pub fn get_time_spec() -> ToolSpec {
    ToolSpec::direct(
        "get_time",
        "Get the current date and time.",
        ArgSchema::empty(),
        Arc::new(GetTimeTool),
    )
}
