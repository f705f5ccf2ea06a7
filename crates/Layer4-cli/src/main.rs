//! Driftwood CLI - Main entry point

mod chat;

use anyhow::Context;
use clap::{Parser, Subcommand};
use driftwood_agent::{seed_conversation, Orchestrator, ResearchPipeline};
use driftwood_foundation::DriftConfig;
use driftwood_provider::OllamaClient;
use driftwood_tool::builtin::{register_builtins, WebSearchTool};
use driftwood_tool::{ExecContext, ProviderGate, ToolEvent, ToolRegistry, ToolRuntime};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const SYSTEM_PROMPT: &str = "You are Driftwood, a local research assistant. \
Use the available tools when they help answer the question, and cite URLs \
you relied on.";

/// Driftwood - local-first LLM chat and research toolkit
#[derive(Parser, Debug)]
#[command(name = "drift")]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Config file path (default: ~/.driftwood/config.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Model to use (overrides config)
    #[arg(short, long)]
    model: Option<String>,

    /// Model server base URL (overrides config)
    #[arg(long)]
    base_url: Option<String>,

    /// Maximum tool-calling rounds (overrides config)
    #[arg(long)]
    max_rounds: Option<usize>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Ask a single question and print the answer
    Ask {
        /// The question
        prompt: String,

        /// Pre-confirm all tools, including dangerous ones
        #[arg(short, long)]
        yes: bool,
    },
    /// Interactive chat session
    Chat,
    /// Run the research pipeline on a topic
    Research {
        /// The topic to research
        topic: String,

        /// Run the claim-verification stage
        #[arg(long)]
        verify: bool,
    },
    /// List registered tools
    Tools,
    /// List models available on the server
    Models,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let log_level = if args.debug { "debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let mut config = match &args.config {
        Some(path) => DriftConfig::load_from(path)?,
        None => DriftConfig::load()?,
    };
    if let Some(model) = &args.model {
        config.model.chat_model = model.clone();
    }
    if let Some(base_url) = &args.base_url {
        config.model.base_url = base_url.clone();
    }
    if let Some(max_rounds) = args.max_rounds {
        config.loop_cfg.max_rounds = max_rounds;
    }

    let gate = ProviderGate::default();
    let mut registry = ToolRegistry::new();
    register_builtins(&mut registry, &config.search, &gate)?;
    let registry = Arc::new(registry);
    let runtime = Arc::new(ToolRuntime::new(
        Arc::clone(&registry),
        config.runtime.clone(),
    ));

    let client = Arc::new(OllamaClient::new(&config.model.base_url));

    match args.command {
        Command::Ask { prompt, yes } => {
            let orchestrator = build_orchestrator(Arc::clone(&client), runtime, &config);
            let ctx = build_context(yes);

            let result = orchestrator
                .run(seed_conversation(Some(SYSTEM_PROMPT), &prompt), &ctx)
                .await
                .context("chat loop failed")?;
            println!("{}", result.answer);
        }
        Command::Chat => {
            let orchestrator = build_orchestrator(Arc::clone(&client), runtime, &config);
            chat::run_repl(orchestrator, SYSTEM_PROMPT).await?;
        }
        Command::Research { topic, verify } => {
            let mut research_cfg = config.research.clone();
            research_cfg.verify = research_cfg.verify || verify;

            let search = Arc::new(WebSearchTool::new(
                config.search.searx_url.clone(),
                gate.clone(),
            ));
            let pipeline = ResearchPipeline::new(
                Arc::clone(&client) as Arc<dyn driftwood_provider::ChatClient>,
                &config.model.chat_model,
                search,
                research_cfg,
            );

            let report = pipeline.run(&topic).await.context("research failed")?;
            println!("{}", report.answer);
            if !report.sources.is_empty() {
                println!("\nSources:");
                for source in &report.sources {
                    println!("  - {} - {}", source.title, source.url);
                }
            }
        }
        Command::Tools => {
            for tool in registry.iter() {
                let gate_mark = if tool.spec.requires_confirmation {
                    " (requires confirmation)"
                } else {
                    ""
                };
                println!(
                    "{:<14} {:?}{}  {}",
                    tool.spec.name, tool.spec.side_effect, gate_mark, tool.spec.description
                );
            }
        }
        Command::Models => {
            if !client.ping().await {
                anyhow::bail!(
                    "model server at {} is not reachable",
                    config.model.base_url
                );
            }
            for model in client.list_models().await? {
                println!("{}", model);
            }
        }
    }

    Ok(())
}

fn build_orchestrator(
    client: Arc<OllamaClient>,
    runtime: Arc<ToolRuntime>,
    config: &DriftConfig,
) -> Orchestrator {
    let mut orchestrator = Orchestrator::new(
        client,
        runtime,
        config.loop_cfg.clone(),
        &config.model.chat_model,
    );
    if let Some(keep_alive) = &config.model.keep_alive {
        orchestrator = orchestrator.with_keep_alive(keep_alive.clone());
    }
    orchestrator
}

/// 실행 컨텍스트 구성 - 진행 이벤트는 stderr로 흘려보냄
fn build_context(confirm_all: bool) -> ExecContext {
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            if let ToolEvent::Progress(p) = event {
                eprintln!(
                    "  [{} {}/{}] {}",
                    p.step,
                    p.current,
                    p.total,
                    p.message.unwrap_or_default()
                );
            }
        }
    });

    let ctx = ExecContext::new().with_events(tx);
    if confirm_all {
        ctx.confirm_all()
    } else {
        ctx
    }
}
