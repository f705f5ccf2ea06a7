//! Interactive chat REPL
//!
//! Line-oriented loop over stdin. The conversation accumulates across
//! turns, so the model keeps context. Dangerous tools stay gated until
//! the user confirms them with `/confirm <tool>` for the session.

use anyhow::Context;
use driftwood_agent::Orchestrator;
use driftwood_foundation::Message;
use driftwood_tool::ExecContext;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

pub async fn run_repl(orchestrator: Orchestrator, system_prompt: &str) -> anyhow::Result<()> {
    let stdin = BufReader::new(tokio::io::stdin());
    let mut lines = stdin.lines();
    let mut stdout = tokio::io::stdout();

    let mut conversation: Vec<Message> = vec![Message::system(system_prompt)];
    let mut confirmed: Vec<String> = Vec::new();

    println!("Driftwood chat. /confirm <tool> to allow a gated tool, /reset to clear, /quit to exit.");

    loop {
        stdout.write_all(b"> ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let input = line.trim();
        if input.is_empty() {
            continue;
        }

        match input {
            "/quit" | "/exit" => break,
            "/reset" => {
                conversation = vec![Message::system(system_prompt)];
                println!("(conversation cleared)");
                continue;
            }
            _ if input.starts_with("/confirm ") => {
                let tool = input.trim_start_matches("/confirm ").trim();
                confirmed.push(tool.to_string());
                println!("(confirmed '{}' for this session)", tool);
                continue;
            }
            _ => {}
        }

        conversation.push(Message::user(input));

        let mut ctx = ExecContext::new();
        for tool in &confirmed {
            ctx = ctx.confirm(tool.clone());
        }

        let result = orchestrator
            .run(conversation.clone(), &ctx)
            .await
            .context("chat turn failed")?;

        println!("{}\n", result.answer);
        conversation = result.conversation;
    }

    Ok(())
}
