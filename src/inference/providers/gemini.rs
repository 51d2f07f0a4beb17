//! Google Gemini provider using the `generateContent` endpoint.
//!
//! Gemini authenticates with a `key` query parameter rather than a header,
//! so the full request URL is never logged.

use async_trait::async_trait;
use log::info;
use serde::{Deserialize, Serialize};

use super::send_json;
use crate::Provider;
use crate::inference::{
    Completion, CompletionProvider, CompletionRequest, ProviderError, TransportError,
};

pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

// ============================================================================
// Gemini API Types
// ============================================================================

#[derive(Serialize, Debug)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize, Debug)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
}

/// The request body for `models/{model}:generateContent`
#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    usage_metadata: Option<serde_json::Value>,
}

#[derive(Deserialize, Debug)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Deserialize, Debug)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize, Debug)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}

// ============================================================================
// Translation Layer
// ============================================================================

fn generate_body<'a>(request: &CompletionRequest<'a>) -> GenerateContentRequest<'a> {
    GenerateContentRequest {
        contents: vec![Content {
            parts: vec![Part {
                text: request.prompt,
            }],
        }],
        generation_config: GenerationConfig {
            temperature: request.temperature,
            max_output_tokens: request.max_tokens,
        },
    }
}

/// Pulls `candidates[0].content.parts[0].text`. Other candidates are ignored.
fn first_candidate_text(response: GenerateContentResponse) -> Result<String, TransportError> {
    response
        .candidates
        .into_iter()
        .next()
        .ok_or_else(|| TransportError::Parse("response contained no candidates".to_string()))?
        .content
        .and_then(|c| c.parts.into_iter().next())
        .and_then(|p| p.text)
        .ok_or_else(|| TransportError::Parse("first candidate has no text part".to_string()))
}

// ============================================================================
// Provider Implementation
// ============================================================================

/// Google Gemini API provider
pub struct GeminiProvider {
    api_key: String,
    base_url: String,
    client: reqwest::Client,
}

impl GeminiProvider {
    /// Creates a new Gemini provider.
    ///
    /// # Arguments
    /// * `api_key` - Google AI Studio API key
    /// * `base_url` - Optional custom base URL (defaults to the v1beta API)
    pub fn new(api_key: String, base_url: Option<String>) -> Self {
        Self::with_client(
            api_key,
            base_url.unwrap_or_else(|| DEFAULT_GEMINI_BASE_URL.to_string()),
            reqwest::Client::new(),
        )
    }

    /// Creates a provider that shares an existing connection pool.
    pub fn with_client(api_key: String, base_url: String, client: reqwest::Client) -> Self {
        Self {
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        }
    }

    fn endpoint(&self, model: &str) -> String {
        format!("{}/models/{model}:generateContent", self.base_url)
    }
}

#[async_trait]
impl CompletionProvider for GeminiProvider {
    fn provider(&self) -> Provider {
        Provider::Gemini
    }

    async fn complete(&self, request: CompletionRequest<'_>) -> Result<Completion, ProviderError> {
        let body = generate_body(&request);
        let endpoint = self.endpoint(request.model);
        info!(
            "Gemini generateContent request: {} temperature={}, max_output_tokens={}, prompt_len={}",
            endpoint,
            request.temperature,
            request.max_tokens,
            request.prompt.len()
        );

        let http = self
            .client
            .post(endpoint)
            .query(&[("key", self.api_key.as_str())]);
        let mut response: GenerateContentResponse = send_json(http, &body, "Gemini").await?;
        let usage = response.usage_metadata.take();
        let text = first_candidate_text(response)?;

        Ok(Completion {
            text,
            usage,
            provider: Provider::Gemini,
        })
    }
}
