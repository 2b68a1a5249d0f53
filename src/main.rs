use std::path::PathBuf;

use clap::{Parser, Subcommand};
use rag_chat::Result;
use rag_chat::commands::{ask, chat, clear, load, search, status};
use rag_chat::config::{Config, run_interactive_config, show_config};

#[derive(Parser)]
#[command(name = "rag-chat")]
#[command(about = "Ask questions about local documents using retrieval-augmented generation")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Load the documents directory and start an interactive session (default)
    Chat {
        /// Number of chunks to retrieve per question
        #[arg(long)]
        top_k: Option<usize>,
    },
    /// Chunk, embed and store documents
    Load {
        /// Text or Markdown files to load
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
    /// Answer a single question
    Ask {
        question: String,
        /// Number of chunks to retrieve
        #[arg(long)]
        top_k: Option<usize>,
    },
    /// Show the stored chunks closest to a query
    Search {
        query: String,
        /// Number of results to show
        #[arg(long)]
        top_k: Option<usize>,
    },
    /// Check the language model, embedding service and vector index
    Status,
    /// Delete every stored chunk
    Clear {
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
    /// Configure services and models
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let command = cli.command.unwrap_or(Commands::Chat { top_k: None });

    if let Commands::Config { show } = command {
        if show {
            show_config(&Config::load()?);
        } else {
            run_interactive_config()?;
        }
        return Ok(());
    }

    let config = Config::load()?;
    match command {
        Commands::Chat { top_k } => chat(&config, top_k).await?,
        Commands::Load { paths } => load(&config, &paths).await?,
        Commands::Ask { question, top_k } => ask(&config, &question, top_k).await?,
        Commands::Search { query, top_k } => search(&config, &query, top_k).await?,
        Commands::Status => status(&config).await?,
        Commands::Clear { yes } => clear(&config, yes).await?,
        Commands::Config { .. } => {}
    }

    Ok(())
}
