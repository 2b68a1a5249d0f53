
use std::io::{BufRead, Write};
use std::path::Path;

use tracing::{info, warn};

use crate::documents::list_documents;
use crate::embeddings::Embedder;
use crate::generation::Generator;
use crate::index::VectorIndex;
use crate::pipeline::RagPipeline;
use crate::{RagError, Result};

/// Inputs that end the session, compared case-insensitively
pub const EXIT_COMMANDS: [&str; 3] = ["quit", "exit", "q"];

#[inline]
pub fn is_exit_command(input: &str) -> bool {
    EXIT_COMMANDS
        .iter()
        .any(|command| input.eq_ignore_ascii_case(command))
}

/// Prepare a chat session.
///
/// Fails when the language model cannot be reached. Otherwise every document
/// in `documents_dir` is loaded, with failures reported and skipped, and the
/// number of documents loaded is returned.
#[inline]
pub async fn start_session<E, I, G, W>(
    pipeline: &RagPipeline<E, I, G>,
    documents_dir: &Path,
    output: &mut W,
) -> Result<usize>
where
    E: Embedder,
    I: VectorIndex,
    G: Generator,
    W: Write,
{
    writeln!(output, "Checking language model...")?;
    if !pipeline.generator().is_reachable().await {
        return Err(RagError::BackendUnavailable(format!(
            "Language model '{}' is not reachable; is Ollama running?",
            pipeline.generator().model_name()
        )));
    }

    let documents = list_documents(documents_dir)?;
    if documents.is_empty() {
        writeln!(
            output,
            "No documents found in {}. Answers will rely on what is already indexed.",
            documents_dir.display()
        )?;
        return Ok(0);
    }

    let mut loaded = 0;
    for path in &documents {
        match pipeline.load_document(path).await {
            Ok(summary) => {
                writeln!(output, "Loaded {} ({} chunks)", summary.source, summary.chunks)?;
                loaded += 1;
            }
            Err(e) => {
                warn!("Failed to load {}: {}", path.display(), e);
                writeln!(output, "Could not load {}: {}", path.display(), e)?;
            }
        }
    }

    info!("Loaded {} of {} documents", loaded, documents.len());
    Ok(loaded)
}

/// Read questions from `input` and print answers to `output` until an exit
/// command or end of input
#[inline]
pub async fn run_chat<E, I, G, R, W>(
    pipeline: &RagPipeline<E, I, G>,
    mut input: R,
    output: &mut W,
    top_k: usize,
) -> Result<()>
where
    E: Embedder,
    I: VectorIndex,
    G: Generator,
    R: BufRead,
    W: Write,
{
    writeln!(output, "Ask a question about your documents. Type 'quit' to exit.")?;

    let mut line = String::new();
    loop {
        write!(output, "\nYou: ")?;
        output.flush()?;

        line.clear();
        if input.read_line(&mut line)? == 0 {
            writeln!(output)?;
            break;
        }

        let question = line.trim();
        if question.is_empty() {
            continue;
        }
        if is_exit_command(question) {
            break;
        }

        writeln!(output, "Thinking...")?;
        let answer = pipeline.answer(question, top_k).await;
        writeln!(output, "Bot: {}", answer)?;
    }

    writeln!(output, "Goodbye!")?;
    Ok(())
}
