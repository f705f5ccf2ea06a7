//! Shell Tool
//!
//! Executes a command through the system shell. Classified `dangerous`
//! and registered with `requires_confirmation = true`; the runtime's
//! confirmation gate keeps it from running on the model's say-so alone.

use crate::spec::{DirectHandler, ExecContext, ToolFailure, ToolSpec};
use async_trait::async_trait;
use driftwood_foundation::ArgSchema;
use serde_json::{json, Value};
use std::process::Stdio;
use std::sync::Arc;
use tokio::process::Command;
use tracing::info;

const MAX_OUTPUT_CHARS: usize = 30_000;

pub struct ShellTool;

impl ShellTool {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ShellTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DirectHandler for ShellTool {
    async fn run(&self, args: Value, _ctx: &ExecContext) -> Result<Value, ToolFailure> {
        let command = args["command"].as_str().unwrap_or_default();
        let cwd = args["cwd"].as_str();

        // Display form only; the shell does the real parsing
        let shown = shlex::split(command)
            .map(|parts| parts.join(" "))
            .unwrap_or_else(|| command.to_string());
        info!("shell: {}", shown);

        let mut cmd = Command::new("sh");
        cmd.arg("-c")
            .arg(command)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(dir) = cwd {
            cmd.current_dir(dir);
        }

        let output = cmd.output().await.map_err(|e| ToolFailure::exception(&e))?;

        let stdout = cap(&String::from_utf8_lossy(&output.stdout));
        let stderr = cap(&String::from_utf8_lossy(&output.stderr));

        Ok(json!({
            "command": command,
            "exit_code": output.status.code(),
            "stdout": stdout,
            "stderr": stderr,
        }))
    }
}

fn cap(s: &str) -> String {
    if s.chars().count() > MAX_OUTPUT_CHARS {
        let head: String = s.chars().take(MAX_OUTPUT_CHARS).collect();
        format!("{}\n…[output truncated]", head)
    } else {
        s.to_string()
    }
}

pub fn shell_spec() -> ToolSpec {
    ToolSpec::direct(
        "shell",
        "Execute a shell command and return its exit code and output. Requires user confirmation.",
        ArgSchema::new()
            .string("command", "The command to run", true)
            .string("cwd", "Working directory", false),
        Arc::new(ShellTool::new()),
    )
    .dangerous()
}
