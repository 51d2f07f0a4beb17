//! # Provider Client
//!
//! The dispatcher the front-end talks to. It owns per-provider credentials
//! and the active provider, and routes each request to the matching handler.
//!
//! ```text
//! ProviderClient
//! ├── credentials: HashMap<Provider, String>   // never persisted here
//! ├── active: Provider                         // always a known provider
//! ├── settings: ClientSettings                 // base URLs, models, defaults
//! └── http: reqwest::Client                    // shared connection pool
//! ```
//!
//! Setters take `&mut self`; requests take `&self`, so any number of requests
//! can be in flight while configuration changes are serialized by the borrow.

use std::collections::HashMap;

use log::{debug, info, warn};

use crate::Provider;
use crate::core::config::{
    DEFAULT_GEMINI_MODEL, DEFAULT_OPENAI_MODEL, DEFAULT_VISION_MODEL, ResolvedConfig,
};
use crate::inference::providers::gemini::DEFAULT_GEMINI_BASE_URL;
use crate::inference::providers::openai::DEFAULT_OPENAI_BASE_URL;
use crate::inference::types::{DEFAULT_MAX_TOKENS, DEFAULT_TEMPERATURE};
use crate::inference::{
    Completion, CompletionOptions, CompletionProvider, CompletionRequest, GeminiProvider,
    ImageRequest, ImageResult, OpenAiProvider, ProviderError,
};

/// Static, per-process settings for the client.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientSettings {
    pub openai_base_url: String,
    pub gemini_base_url: String,
    pub openai_model: String,
    pub gemini_model: String,
    pub vision_model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            openai_base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
            gemini_base_url: DEFAULT_GEMINI_BASE_URL.to_string(),
            openai_model: DEFAULT_OPENAI_MODEL.to_string(),
            gemini_model: DEFAULT_GEMINI_MODEL.to_string(),
            vision_model: DEFAULT_VISION_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }
}

impl ClientSettings {
    /// Completion defaults for a given provider.
    pub fn completion_defaults(&self, provider: Provider) -> CompletionOptions {
        let model = match provider {
            Provider::OpenAi => &self.openai_model,
            Provider::Gemini => &self.gemini_model,
        };
        CompletionOptions {
            model: Some(model.clone()),
            temperature: Some(self.temperature),
            max_tokens: Some(self.max_tokens),
        }
    }
}

pub struct ProviderClient {
    credentials: HashMap<Provider, String>,
    active: Provider,
    settings: ClientSettings,
    http: reqwest::Client,
}

impl Default for ProviderClient {
    fn default() -> Self {
        Self::new(ClientSettings::default())
    }
}

impl ProviderClient {
    /// Creates a client with no credentials and `openai` active.
    pub fn new(settings: ClientSettings) -> Self {
        Self {
            credentials: HashMap::new(),
            active: Provider::default(),
            settings,
            http: reqwest::Client::new(),
        }
    }

    /// Builds a client from resolved config, applying any keys and the chosen provider.
    pub fn from_config(config: &ResolvedConfig) -> Self {
        let mut client = Self::new(config.settings.clone());
        for (provider, key) in [
            (Provider::OpenAi, &config.openai_api_key),
            (Provider::Gemini, &config.gemini_api_key),
        ] {
            if let Some(key) = key
                && !client.set_credential(provider.id(), key)
            {
                warn!("Ignoring blank API key for {}", provider);
            }
        }
        client.active = config.provider;
        info!(
            "Provider client ready: active={}, credentials={:?}",
            client.active,
            Provider::ALL
                .iter()
                .filter(|p| client.has_credential(**p))
                .collect::<Vec<_>>()
        );
        client
    }

    /// Stores (or overwrites) the secret for `provider`.
    ///
    /// Returns false and changes nothing if either argument is blank or the
    /// provider name is unknown.
    pub fn set_credential(&mut self, provider: &str, secret: &str) -> bool {
        let secret = secret.trim();
        if provider.trim().is_empty() || secret.is_empty() {
            return false;
        }
        match provider.parse::<Provider>() {
            Ok(provider) => {
                self.credentials.insert(provider, secret.to_string());
                debug!("Credential set for {}", provider);
                true
            }
            Err(e) => {
                warn!("set_credential: {e}");
                false
            }
        }
    }

    pub fn has_credential(&self, provider: Provider) -> bool {
        self.credentials.contains_key(&provider)
    }

    /// Makes `provider` the active backend if it is a known one.
    pub fn select_provider(&mut self, provider: &str) -> bool {
        match provider.parse::<Provider>() {
            Ok(provider) => {
                self.active = provider;
                info!("Active provider: {}", provider);
                true
            }
            Err(e) => {
                warn!("select_provider: {e}, keeping {}", self.active);
                false
            }
        }
    }

    pub fn active_provider(&self) -> Provider {
        self.active
    }

    fn secret_for(&self, provider: Provider) -> Result<&str, ProviderError> {
        match self.credentials.get(&provider) {
            Some(secret) => Ok(secret.as_str()),
            None => {
                warn!("No API key set for {}", provider);
                Err(ProviderError::CredentialMissing(provider))
            }
        }
    }

    fn openai(&self, secret: &str) -> OpenAiProvider {
        OpenAiProvider::with_client(
            secret.to_string(),
            self.settings.openai_base_url.clone(),
            self.http.clone(),
        )
    }

    fn completion_handler(&self, provider: Provider, secret: &str) -> Box<dyn CompletionProvider> {
        match provider {
            Provider::OpenAi => Box::new(self.openai(secret)),
            Provider::Gemini => Box::new(GeminiProvider::with_client(
                secret.to_string(),
                self.settings.gemini_base_url.clone(),
                self.http.clone(),
            )),
        }
    }

    /// Sends `prompt` as a single user turn to the active provider.
    pub async fn request_completion(
        &self,
        prompt: &str,
        options: &CompletionOptions,
    ) -> Result<Completion, ProviderError> {
        let provider = self.active;
        let secret = self.secret_for(provider)?;

        if prompt.trim().is_empty() {
            return Err(ProviderError::InvalidRequest("prompt must not be empty".to_string()));
        }
        let effective = options.merged_over(&self.settings.completion_defaults(provider));
        effective.validate()?;

        let request = CompletionRequest {
            prompt,
            model: effective.model.as_deref().unwrap_or_default(),
            temperature: effective.temperature.unwrap_or(DEFAULT_TEMPERATURE),
            max_tokens: effective.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
        };
        debug!("Dispatching completion to {}", provider);

        let handler = self.completion_handler(provider, secret);
        handler.complete(request).await
    }

    /// Runs an image generation or understanding request on the active provider.
    pub async fn request_image(
        &self,
        request: &ImageRequest,
    ) -> Result<ImageResult, ProviderError> {
        let provider = self.active;
        let secret = self.secret_for(provider)?;
        let operation = request.operation();
        debug!("Dispatching image {} to {}", operation, provider);

        match (request, provider) {
            (ImageRequest::Generation(generation), Provider::OpenAi) => {
                generation.validate()?;
                self.openai(secret).generate_images(generation).await
            }
            (ImageRequest::Understanding(understanding), Provider::OpenAi) => {
                understanding.validate()?;
                self.openai(secret)
                    .describe_image(understanding, &self.settings.vision_model)
                    .await
            }
            (_, Provider::Gemini) => {
                warn!("Image {} not supported for {}", operation, provider);
                Err(ProviderError::UnsupportedOperation {
                    operation,
                    provider,
                })
            }
        }
    }
}
