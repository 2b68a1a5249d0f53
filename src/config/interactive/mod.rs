
use std::time::Duration;

use anyhow::{Context, Result};
use console::style;
use dialoguer::{Confirm, Input, Select};

use super::{Config, ConfigError, EmbeddingConfig, GenerationConfig, IndexConfig, IndexKind};

#[inline]
pub fn run_interactive_config() -> Result<()> {
    eprintln!("{}", style("🔧 RAG Chat Configuration Setup").bold().cyan());
    eprintln!();

    let mut config = load_existing_config()?;

    eprintln!("{}", style("Vector Index").bold().yellow());
    configure_index(&mut config.index)?;

    eprintln!();
    eprintln!("{}", style("Embedding Model (Ollama)").bold().yellow());
    configure_embedding(&mut config.embedding)?;

    eprintln!();
    eprintln!("{}", style("Language Model (Ollama)").bold().yellow());
    configure_generation(&mut config.generation)?;

    eprintln!();
    eprintln!("{}", style("Testing configuration...").yellow());

    if test_ollama_connection(&config.generation) {
        eprintln!("{}", style("✓ Ollama connection successful!").green());
    } else {
        eprintln!(
            "{}",
            style("⚠ Warning: Could not connect to Ollama").yellow()
        );
        eprintln!("You can continue, but make sure Ollama is running before chatting.");
    }

    eprintln!();
    if Confirm::new()
        .with_prompt("Save configuration?")
        .default(true)
        .interact()?
    {
        config.save().context("Failed to save configuration")?;
        eprintln!("{}", style("✓ Configuration saved successfully!").green());
        eprintln!(
            "Configuration saved to: {}",
            style(config.config_file_path().display()).cyan()
        );
    } else {
        eprintln!("Configuration not saved.");
    }

    Ok(())
}

#[inline]
pub fn show_config(config: &Config) {
    eprintln!("{}", style("📋 Current Configuration").bold().cyan());
    eprintln!();

    eprintln!("{}", style("Vector Index:").bold().yellow());
    eprintln!("  Backend: {}", style(config.index.backend.as_str()).cyan());
    match config.index.backend {
        IndexKind::Qdrant => match config.index.url() {
            Ok(url) => eprintln!("  URL: {}", style(url).cyan()),
            Err(e) => eprintln!("  URL: {} ({})", style("Invalid").red(), e),
        },
        IndexKind::Lancedb => eprintln!(
            "  Path: {}",
            style(config.vector_database_path().display()).cyan()
        ),
    }
    eprintln!("  Collection: {}", style(&config.index.collection).cyan());
    eprintln!("  Vector Size: {}", style(config.index.vector_size).cyan());

    eprintln!();
    eprintln!("{}", style("Embeddings:").bold().yellow());
    match config.embedding.url() {
        Ok(url) => eprintln!("  URL: {}", style(url).cyan()),
        Err(e) => eprintln!("  URL: {} ({})", style("Invalid").red(), e),
    }
    eprintln!("  Model: {}", style(&config.embedding.model).cyan());
    eprintln!("  Batch Size: {}", style(config.embedding.batch_size).cyan());

    eprintln!();
    eprintln!("{}", style("Generation:").bold().yellow());
    eprintln!("  URL: {}", style(&config.generation.base_url).cyan());
    eprintln!("  Model: {}", style(&config.generation.model).cyan());
    eprintln!(
        "  Temperature: {}  Top-p: {}  Max Tokens: {}",
        style(config.generation.temperature).cyan(),
        style(config.generation.top_p).cyan(),
        style(config.generation.max_tokens).cyan()
    );

    eprintln!();
    eprintln!("{}", style("Retrieval:").bold().yellow());
    eprintln!(
        "  Chunk Size: {}  Overlap: {}  Top-k: {}",
        style(config.chunking.chunk_size).cyan(),
        style(config.chunking.overlap).cyan(),
        style(config.retrieval.top_k).cyan()
    );

    eprintln!();
    eprintln!(
        "Config file: {}",
        style(config.config_file_path().display()).dim()
    );
    eprintln!(
        "Documents: {}",
        style(config.documents_dir().display()).dim()
    );
}

fn load_existing_config() -> Result<Config> {
    Config::load().map_or_else(
        |_| {
            eprintln!(
                "{}",
                style("No usable configuration found. Using defaults.").yellow()
            );
            Ok(Config::default())
        },
        |config| {
            eprintln!("{}", style("Loaded existing configuration.").green());
            Ok(config)
        },
    )
}

fn configure_index(index: &mut IndexConfig) -> Result<()> {
    let backends = [IndexKind::Qdrant, IndexKind::Lancedb];
    let labels = &["qdrant (server)", "lancedb (embedded)"];
    let default_index = backends
        .iter()
        .position(|&b| b == index.backend)
        .unwrap_or(0);

    let choice = Select::new()
        .with_prompt("Vector index backend")
        .default(default_index)
        .items(labels)
        .interact()?;
    index.backend = backends[choice];

    if index.backend == IndexKind::Qdrant {
        let host: String = Input::new()
            .with_prompt("Qdrant host")
            .default(index.host.clone())
            .validate_with(|input: &String| -> Result<(), ConfigError> {
                let temp_config = IndexConfig {
                    host: input.clone(),
                    ..index.clone()
                };
                temp_config.validate()
            })
            .interact_text()?;

        let port: u16 = Input::new()
            .with_prompt("Qdrant port")
            .default(index.port)
            .validate_with(|input: &u16| -> Result<(), &str> {
                if *input == 0 {
                    Err("Port must be greater than 0")
                } else {
                    Ok(())
                }
            })
            .interact_text()?;

        index.host = host;
        index.port = port;
    }

    let collection: String = Input::new()
        .with_prompt("Collection name")
        .default(index.collection.clone())
        .interact_text()?;

    let vector_size: usize = Input::new()
        .with_prompt("Vector size (must match the embedding model)")
        .default(index.vector_size)
        .interact_text()?;

    index.set_collection(collection)?;
    index.set_vector_size(vector_size)?;

    Ok(())
}

fn configure_embedding(embedding: &mut EmbeddingConfig) -> Result<()> {
    let host: String = Input::new()
        .with_prompt("Ollama host")
        .default(embedding.host.clone())
        .validate_with(|input: &String| -> Result<(), ConfigError> {
            let temp_config = EmbeddingConfig {
                host: input.clone(),
                ..embedding.clone()
            };
            temp_config.validate()
        })
        .interact_text()?;

    let model: String = Input::new()
        .with_prompt("Embedding model")
        .default(embedding.model.clone())
        .interact_text()?;

    embedding.host = host;
    embedding.set_model(model)?;

    Ok(())
}

fn configure_generation(generation: &mut GenerationConfig) -> Result<()> {
    let base_url: String = Input::new()
        .with_prompt("Ollama URL")
        .default(generation.base_url.clone())
        .validate_with(|input: &String| -> Result<(), ConfigError> {
            let temp_config = GenerationConfig {
                base_url: input.clone(),
                ..generation.clone()
            };
            temp_config.url().map(|_| ())
        })
        .interact_text()?;

    let model: String = Input::new()
        .with_prompt("Language model")
        .default(generation.model.clone())
        .interact_text()?;

    generation.set_base_url(base_url)?;
    generation.set_model(model)?;

    Ok(())
}

fn test_ollama_connection(generation: &GenerationConfig) -> bool {
    let Ok(url) = generation.url().and_then(|base| {
        base.join("/api/version")
            .map_err(|_| ConfigError::InvalidUrl(generation.base_url.clone()))
    }) else {
        return false;
    };

    let agent: ureq::Agent = ureq::Agent::config_builder()
        .timeout_global(Some(Duration::from_secs(5)))
        .build()
        .into();

    match agent.get(url.as_str()).call() {
        Ok(_) => true,
        Err(ureq::Error::StatusCode(code)) => (400..500).contains(&code),
        Err(_) => false,
    }
}
