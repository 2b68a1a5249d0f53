// Generation gateway: asks a language model to answer from retrieved context

pub mod ollama;


use async_trait::async_trait;

use crate::Result;

pub use ollama::OllamaGenerator;

/// A language model that turns a prompt into an answer
#[async_trait]
pub trait Generator: Send + Sync {
    /// Answer `question`, grounding the prompt in `context` when given
    async fn generate(&self, question: &str, context: Option<&[String]>) -> Result<String>;

    /// Lightweight connectivity check
    async fn is_reachable(&self) -> bool;

    fn model_name(&self) -> &str;
}

/// Build the prompt sent to the model.
///
/// With context, every passage is included (separated by blank lines)
/// ahead of the question, and the model is told to answer from it alone.
/// Without context, or with an empty one, the question is sent as-is.
#[inline]
pub fn build_prompt(question: &str, context: Option<&[String]>) -> String {
    match context {
        Some(passages) if !passages.is_empty() => format!(
            "Answer the question using only the context below. \
             If the context does not contain the answer, say so.\n\n\
             Context:\n{}\n\nQuestion: {}\n\nAnswer:",
            passages.join("\n\n"),
            question
        ),
        _ => question.to_string(),
    }
}
