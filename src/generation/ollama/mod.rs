
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use url::Url;

use super::{Generator, build_prompt};
use crate::config::GenerationConfig;
use crate::http::HttpClient;
use crate::{RagError, Result};

/// Text generation through Ollama's `/api/generate` endpoint
#[derive(Debug, Clone)]
pub struct OllamaGenerator {
    base_url: Url,
    model: String,
    options: GenerationOptions,
    http: HttpClient,
}

/// Sampling parameters, favouring short deterministic answers
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GenerationOptions {
    pub temperature: f32,
    pub top_p: f32,
    pub num_predict: u32,
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerationOptions,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}

impl OllamaGenerator {
    #[inline]
    pub fn new(config: &GenerationConfig) -> Result<Self> {
        let base_url = config
            .url()
            .map_err(|e| RagError::Config(format!("Invalid generation service URL: {}", e)))?;

        Ok(Self {
            base_url,
            model: config.model.clone(),
            options: GenerationOptions {
                temperature: config.temperature,
                top_p: config.top_p,
                num_predict: config.max_tokens,
            },
            http: HttpClient::new("Ollama generation")
                .with_timeout(Duration::from_secs(config.timeout_seconds)),
        })
    }

    #[inline]
    pub fn with_retry_attempts(mut self, attempts: u32) -> Self {
        self.http = self.http.with_retry_attempts(attempts);
        self
    }

    /// Send a raw prompt and return the trimmed completion
    #[inline]
    pub fn complete(&self, prompt: &str) -> Result<String> {
        let url = self
            .base_url
            .join("/api/generate")
            .map_err(|e| RagError::Config(format!("Failed to build Ollama URL: {}", e)))?;

        let request = GenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
            options: self.options,
        };

        debug!("Generating with model {} ({} prompt chars)", self.model, prompt.len());
        let response: GenerateResponse = self.http.post_json(&url, &request)?;

        Ok(response.response.trim().to_string())
    }
}

#[async_trait]
impl Generator for OllamaGenerator {
    async fn generate(&self, question: &str, context: Option<&[String]>) -> Result<String> {
        let prompt = build_prompt(question, context);
        let answer = self.complete(&prompt)?;
        info!("Generated {} character answer", answer.len());
        Ok(answer)
    }

    async fn is_reachable(&self) -> bool {
        match self.complete("Hello") {
            Ok(_) => true,
            Err(e) => {
                warn!("Generation backend is not reachable: {}", e);
                false
            }
        }
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
