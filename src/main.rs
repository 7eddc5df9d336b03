use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use hearth::retrieval::SearchMode;
use hearth::{cli, config, server};

#[derive(Parser)]
#[command(name = "hearth", version, about = "Memory retrieval server with keyword, semantic, and hybrid search")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start the HTTP server (REST + MCP at /mcp) and the sync daemon
    Serve,
    /// Start the MCP server on stdio
    Mcp,
    /// Search memories from the terminal
    Search {
        query: String,
        /// keyword, semantic, or hybrid
        #[arg(long, default_value = "hybrid")]
        mode: SearchMode,
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Show memory statistics
    Stats,
    /// Export all memories as JSON to stdout
    Export {
        /// Only export memories of this type
        #[arg(long = "type")]
        memory_type: Option<String>,
    },
    /// Embed and upload every memory to the remote vector index
    Migrate {
        #[arg(long)]
        batch_size: Option<usize>,
        #[arg(long)]
        delay_ms: Option<u64>,
        /// Re-upload memories the index already has
        #[arg(long)]
        force: bool,
    },
    /// Check database health and remote reachability
    Doctor,
    /// Print the SQL the remote Postgres needs
    RemoteSchema,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load config (for log level)
    let config = config::HearthConfig::load()?;

    // Log to stderr so stdout stays clean for MCP JSON-RPC and CLI output.
    let filter = EnvFilter::try_new(&config.server.log_level)
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Serve => server::serve_http(config).await?,
        Command::Mcp => server::serve_stdio(config).await?,
        Command::Search { query, mode, limit } => {
            cli::search::search(config, &query, mode, limit).await?;
        }
        Command::Stats => cli::stats::stats(&config).await?,
        Command::Export { memory_type } => cli::export::export(&config, memory_type).await?,
        Command::Migrate {
            batch_size,
            delay_ms,
            force,
        } => cli::migrate::migrate(config, batch_size, delay_ms, force).await?,
        Command::Doctor => cli::doctor::doctor(&config).await?,
        Command::RemoteSchema => cli::remote_schema::remote_schema(),
    }

    Ok(())
}
