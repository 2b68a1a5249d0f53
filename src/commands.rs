use std::io::{self, Write};
use std::path::PathBuf;
use std::time::Duration;

use console::style;
use dialoguer::Confirm;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{error, info};

use crate::chat::{run_chat, start_session};
use crate::config::Config;
use crate::index::VectorIndex;
use crate::pipeline::RagPipeline;
use crate::{RagError, Result};

const PREVIEW_CHARS: usize = 200;

fn spinner(message: String) -> ProgressBar {
    let bar = if console::user_attended_stderr() {
        ProgressBar::new_spinner().with_style(
            ProgressStyle::with_template("{spinner} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        )
    } else {
        ProgressBar::hidden()
    };
    bar.set_message(message);
    bar.enable_steady_tick(Duration::from_millis(100));
    bar
}

/// Interactive question answering over the documents directory
#[inline]
pub async fn chat(config: &Config, top_k: Option<usize>) -> Result<()> {
    config.ensure_dirs()?;
    let pipeline = RagPipeline::from_config(config).await?;

    let mut stdout = io::stdout();
    if let Err(e) = start_session(&pipeline, &config.documents_dir(), &mut stdout).await {
        error!("Startup failed: {}", e);
        eprintln!("{} {}", style("✗").red(), e);
        return Err(e);
    }

    let top_k = top_k.unwrap_or(config.retrieval.top_k);
    run_chat(&pipeline, io::stdin().lock(), &mut stdout, top_k).await
}

/// Index one or more documents
#[inline]
pub async fn load(config: &Config, paths: &[PathBuf]) -> Result<()> {
    let pipeline = RagPipeline::from_config(config).await?;

    let mut failed = 0;
    for path in paths {
        let bar = spinner(format!("Loading {}", path.display()));
        let result = pipeline.load_document(path).await;
        bar.finish_and_clear();

        match result {
            Ok(summary) => println!(
                "{} {} ({} chunks)",
                style("✓").green(),
                summary.source,
                summary.chunks
            ),
            Err(e) => {
                failed += 1;
                println!("{} {}: {}", style("✗").red(), path.display(), e);
            }
        }
    }

    if failed > 0 {
        return Err(RagError::InvalidInput(format!(
            "{} of {} documents failed to load",
            failed,
            paths.len()
        )));
    }
    Ok(())
}

/// Answer a single question and exit
#[inline]
pub async fn ask(config: &Config, question: &str, top_k: Option<usize>) -> Result<()> {
    let pipeline = RagPipeline::from_config(config).await?;
    let top_k = top_k.unwrap_or(config.retrieval.top_k);

    let bar = spinner("Thinking...".to_string());
    let answer = pipeline.answer(question, top_k).await;
    bar.finish_and_clear();

    println!("{}", answer);
    Ok(())
}

/// Show the chunks most similar to a query, with scores
#[inline]
pub async fn search(config: &Config, query: &str, top_k: Option<usize>) -> Result<()> {
    let pipeline = RagPipeline::from_config(config).await?;
    let top_k = top_k.unwrap_or(config.retrieval.top_k);

    let results = pipeline.retrieve(query, top_k).await?;
    if results.is_empty() {
        println!("No matching chunks found.");
        return Ok(());
    }

    for (rank, result) in results.iter().enumerate() {
        println!(
            "{} score {} {}",
            style(format!("#{}", rank + 1)).bold(),
            style(format!("{:.4}", result.score)).cyan(),
            style(format!(
                "{} [chunk {}]",
                result.payload.source, result.payload.chunk_id
            ))
            .dim()
        );
        println!("   {}", preview(result.text()));
    }
    Ok(())
}

fn preview(text: &str) -> String {
    let flattened = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flattened.chars().count() <= PREVIEW_CHARS {
        flattened
    } else {
        let cut: String = flattened.chars().take(PREVIEW_CHARS).collect();
        format!("{}...", cut)
    }
}

/// Report reachability of each collaborating service
#[inline]
pub async fn status(config: &Config) -> Result<()> {
    let pipeline = RagPipeline::from_config(config).await?;
    let status = pipeline.status().await;

    let mark = |ok: bool| {
        if ok {
            style("✓ ready").green()
        } else {
            style("✗ unavailable").red()
        }
    };

    println!("{}", style("RAG Chat Status").bold().cyan());
    println!(
        "  Language model ({}): {}",
        status.model_name,
        mark(status.llm_reachable)
    );
    println!(
        "  Embeddings ({}): {}",
        config.embedding.model,
        mark(status.embedder_reachable)
    );
    println!(
        "  Vector index ({} '{}'): {}",
        config.index.backend.as_str(),
        pipeline.index().collection(),
        mark(status.index_ready)
    );
    if let Some(count) = status.record_count {
        println!("  Stored chunks: {}", count);
    }

    io::stdout().flush()?;
    Ok(())
}

/// Drop every stored chunk, asking first unless `yes` is set
#[inline]
pub async fn clear(config: &Config, yes: bool) -> Result<()> {
    if !yes {
        let confirmed = Confirm::new()
            .with_prompt(format!(
                "Delete all chunks in collection '{}'? This cannot be undone.",
                config.index.collection
            ))
            .default(false)
            .interact()
            .map_err(|e| RagError::Other(e.into()))?;
        if !confirmed {
            println!("Cancelled.");
            return Ok(());
        }
    }

    let pipeline = RagPipeline::from_config(config).await?;
    pipeline.clear().await?;

    info!("Cleared collection {}", config.index.collection);
    println!("{} Collection '{}' cleared", style("✓").green(), config.index.collection);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preview_keeps_short_text() {
        assert_eq!(preview("short\n  text"), "short text");
    }

    #[test]
    fn preview_truncates_on_char_boundary() {
        let text = "é".repeat(PREVIEW_CHARS + 10);
        let result = preview(&text);
        assert!(result.ends_with("..."));
        assert_eq!(result.chars().count(), PREVIEW_CHARS + 3);
    }
}
