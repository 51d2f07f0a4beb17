//! OpenAI provider: chat completions, image generation and vision.
//!
//! Endpoints used:
//! - `POST /chat/completions` for text completion and image understanding
//! - `POST /images/generations` for image generation

use async_trait::async_trait;
use log::info;
use serde::{Deserialize, Serialize};

use super::send_json;
use crate::Provider;
use crate::inference::{
    Completion, CompletionProvider, CompletionRequest, ImageGeneration, ImageResult,
    ImageUnderstanding, ProviderError, TransportError,
};

pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

// ============================================================================
// OpenAI API Types
// ============================================================================

#[derive(Serialize, Debug, Clone, Copy)]
#[serde(rename_all = "lowercase")]
enum Role {
    User,
}

/// Plain text for ordinary chat turns, typed parts for vision turns.
#[derive(Serialize, Debug)]
#[serde(untagged)]
enum MessageContent<'a> {
    Text(&'a str),
    Parts(Vec<ContentPart<'a>>),
}

#[derive(Serialize, Debug)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart<'a> {
    Text { text: &'a str },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Serialize, Debug)]
struct ImageUrl {
    url: String,
}

#[derive(Serialize, Debug)]
struct ChatMessage<'a> {
    role: Role,
    content: MessageContent<'a>,
}

/// The request body for `/chat/completions`
#[derive(Serialize, Debug)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    max_tokens: u32,
}

/// The request body for `/images/generations`
#[derive(Serialize, Debug)]
struct ImageGenerationRequest<'a> {
    prompt: &'a str,
    n: u32,
    size: &'a str,
}

#[derive(Deserialize, Debug)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<serde_json::Value>,
}

#[derive(Deserialize, Debug)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize, Debug)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize, Debug)]
struct ImagesResponse {
    #[serde(default)]
    data: Vec<GeneratedImage>,
}

#[derive(Deserialize, Debug)]
struct GeneratedImage {
    #[serde(default)]
    url: Option<String>,
}

// ============================================================================
// Translation Layer
// ============================================================================

fn completion_body<'a>(request: &CompletionRequest<'a>) -> ChatRequest<'a> {
    ChatRequest {
        model: request.model,
        messages: vec![ChatMessage {
            role: Role::User,
            content: MessageContent::Text(request.prompt),
        }],
        temperature: Some(request.temperature),
        max_tokens: request.max_tokens,
    }
}

fn vision_body<'a>(request: &'a ImageUnderstanding, model: &'a str) -> ChatRequest<'a> {
    ChatRequest {
        model,
        messages: vec![ChatMessage {
            role: Role::User,
            content: MessageContent::Parts(vec![
                ContentPart::Text {
                    text: request.prompt(),
                },
                ContentPart::ImageUrl {
                    image_url: ImageUrl {
                        url: request.image.to_url(),
                    },
                },
            ]),
        }],
        temperature: None,
        max_tokens: request.max_tokens(),
    }
}

/// Takes the first choice's message. Later choices are ignored.
fn first_choice_text(
    response: ChatResponse,
) -> Result<(String, Option<serde_json::Value>), TransportError> {
    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| TransportError::Parse("response contained no choices".to_string()))?;
    let text = choice
        .message
        .content
        .ok_or_else(|| TransportError::Parse("first choice has no content".to_string()))?;
    Ok((text, response.usage))
}

// ============================================================================
// Provider Implementation
// ============================================================================

/// OpenAI API provider
pub struct OpenAiProvider {
    api_key: String,
    base_url: String,
    client: reqwest::Client,
}

impl OpenAiProvider {
    /// Creates a new OpenAI provider.
    ///
    /// # Arguments
    /// * `api_key` - OpenAI API key
    /// * `base_url` - Optional custom base URL (defaults to OpenAI's API)
    pub fn new(api_key: String, base_url: Option<String>) -> Self {
        Self::with_client(
            api_key,
            base_url.unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.to_string()),
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

    fn post(&self, endpoint: &str) -> reqwest::RequestBuilder {
        self.client
            .post(format!("{}/{endpoint}", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
    }

    /// Generates images from a text prompt and returns their URLs in order.
    pub async fn generate_images(
        &self,
        request: &ImageGeneration,
    ) -> Result<ImageResult, ProviderError> {
        let body = ImageGenerationRequest {
            prompt: &request.prompt,
            n: request.count(),
            size: request.size(),
        };
        info!(
            "OpenAI image generation request: n={}, size={}, prompt_len={}",
            body.n,
            body.size,
            body.prompt.len()
        );

        let response: ImagesResponse =
            send_json(self.post("images/generations"), &body, "OpenAI").await?;
        let images: Vec<String> = response.data.into_iter().filter_map(|img| img.url).collect();

        info!("OpenAI returned {} image(s)", images.len());
        Ok(ImageResult::Generated {
            images,
            provider: Provider::OpenAi,
        })
    }

    /// Asks a vision-capable model to describe an image.
    pub async fn describe_image(
        &self,
        request: &ImageUnderstanding,
        model: &str,
    ) -> Result<ImageResult, ProviderError> {
        let body = vision_body(request, model);
        info!(
            "OpenAI image understanding request: model={}, max_tokens={}",
            model, body.max_tokens
        );

        let response: ChatResponse =
            send_json(self.post("chat/completions"), &body, "OpenAI").await?;
        let (description, _) = first_choice_text(response)?;

        Ok(ImageResult::Described {
            description,
            provider: Provider::OpenAi,
        })
    }
}

#[async_trait]
impl CompletionProvider for OpenAiProvider {
    fn provider(&self) -> Provider {
        Provider::OpenAi
    }

    async fn complete(&self, request: CompletionRequest<'_>) -> Result<Completion, ProviderError> {
        let body = completion_body(&request);
        info!(
            "OpenAI chat completion request: model={}, temperature={}, max_tokens={}, prompt_len={}",
            request.model,
            request.temperature,
            request.max_tokens,
            request.prompt.len()
        );

        let response: ChatResponse =
            send_json(self.post("chat/completions"), &body, "OpenAI").await?;
        let (text, usage) = first_choice_text(response)?;

        Ok(Completion {
            text,
            usage,
            provider: Provider::OpenAi,
        })
    }
}
