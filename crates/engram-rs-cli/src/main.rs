//! Interactive command-line client for the Engram agent.

mod repl;

use anyhow::{bail, Context};
use clap::Parser;
use engram_rs_config::EngramConfig;
use engram_rs_core::{AgentRuntime, ToolRegistry, TurnProcessor};
use engram_rs_llm::{ChatClient, EmbeddingClient, OpenAiChatClient, OpenAiEmbeddingClient};
use engram_rs_mcp::{remote_tools, McpSession};
use engram_rs_memory::{MemoryStore, MemoryTools, SaveMemoryTool, SearchMemoriesTool};
use engram_rs_protocol::Tool;
use log::info;
use repl::run_repl;
use std::path::PathBuf;
use std::sync::Arc;

/// Command-line options for the interactive agent.
#[derive(Parser)]
#[command(name = "engram", version)]
struct Cli {
    /// Optional path to a .env file with credentials
    #[arg(long)]
    env_file: Option<PathBuf>,
    /// Chat model override
    #[arg(long)]
    model: Option<String>,
    /// Memory database path override
    #[arg(long)]
    db_path: Option<String>,
    /// MCP server command line override, e.g. "python pr_analyzer.py"
    #[arg(long)]
    mcp: Option<String>,
}

/// Entry point for the interactive agent.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = env_logger::builder()
        .format_timestamp_millis()
        .parse_default_env()
        .try_init();

    let cli = Cli::parse();
    match cli.env_file.as_ref() {
        Some(path) => {
            dotenvy::from_path(path)
                .with_context(|| format!("failed to load env file {}", path.display()))?;
        }
        None => {
            let _ = dotenvy::dotenv();
        }
    }

    let mut config = EngramConfig::from_env().context("failed to load config")?;
    if let Some(model) = cli.model {
        config.llm.model = model;
    }
    if let Some(db_path) = cli.db_path {
        config.memory.db_path = db_path;
    }
    if let Some(mcp) = cli.mcp.as_deref() {
        let mut parts = mcp.split_whitespace().map(str::to_string);
        config.mcp.command = parts.next().unwrap_or_default();
        config.mcp.args = parts.collect();
    }
    if config.mcp.command.is_empty() {
        bail!("no MCP server configured; set ENGRAM_MCP_COMMAND or pass --mcp");
    }

    info!(
        "starting engram (model={}, db_path={}, mcp_command={})",
        config.llm.model, config.memory.db_path, config.mcp.command
    );

    let store = Arc::new(
        MemoryStore::open(&config.memory.db_path, config.embedding.dimension)
            .context("failed to open memory store")?,
    );
    info!(
        "memory store ready (conversations={}, memories={})",
        store.count_conversations().unwrap_or(0),
        store.count_memories().unwrap_or(0)
    );

    let embedder: Arc<dyn EmbeddingClient> = Arc::new(OpenAiEmbeddingClient::new(
        config.llm.api_key.clone(),
        config.embedding.clone(),
    ));
    let memory_tools = Arc::new(MemoryTools::new(
        store.clone(),
        embedder,
        config.memory.similarity_threshold,
        config.memory.match_count,
    ));
    let chat: Arc<dyn ChatClient> = Arc::new(OpenAiChatClient::new(config.llm.clone()));

    let session = Arc::new(
        McpSession::connect(&config.mcp)
            .await
            .context("failed to connect to MCP tool server")?,
    );

    let result = assemble_and_run(&config, chat, memory_tools, store, session.clone()).await;

    // Release the tool server whether the loop ended normally or not.
    session.shutdown().await;
    result
}

async fn assemble_and_run(
    config: &EngramConfig,
    chat: Arc<dyn ChatClient>,
    memory_tools: Arc<MemoryTools>,
    store: Arc<MemoryStore>,
    session: Arc<McpSession>,
) -> anyhow::Result<()> {
    let registry = ToolRegistry::new();
    let discovered = remote_tools(session)
        .await
        .context("failed to discover MCP tools")?;
    let mut names: Vec<String> = discovered
        .iter()
        .map(|tool| tool.name().to_string())
        .collect();
    names.sort();
    println!("Connected to tool server ({} tools: {})", names.len(), names.join(", "));

    for tool in discovered {
        registry.register(tool);
    }
    registry.register(Arc::new(SaveMemoryTool::new(memory_tools.clone())));
    registry.register(Arc::new(SearchMemoriesTool::new(memory_tools.clone())));

    let runtime = AgentRuntime::new(chat, registry, config.agent.max_tool_rounds);
    let processor = TurnProcessor::new(runtime, memory_tools, store);

    run_repl(&processor).await
}
