use std::fmt;

use async_trait::async_trait;

use super::types::{Completion, ImageOperation};
use crate::Provider;

/// Errors that can occur during provider operations.
/// Local variants never reach the network; `Transport` wraps everything that did.
#[derive(Debug)]
pub enum ProviderError {
    /// No credential stored for the active provider.
    CredentialMissing(Provider),
    /// Provider name doesn't match any known backend.
    UnsupportedProvider(String),
    /// The active provider doesn't implement the requested image operation.
    UnsupportedOperation {
        operation: ImageOperation,
        provider: Provider,
    },
    /// Empty prompt or out-of-range option, rejected before sending.
    InvalidRequest(String),
    /// Network, HTTP or body parsing failure. Never retried.
    Transport(TransportError),
}

/// Underlying cause of a `ProviderError::Transport`.
#[derive(Debug)]
pub enum TransportError {
    /// Network-level failure (timeout, DNS, connection refused).
    Network(String),
    /// API returned a non-2xx response.
    Api { status: u16, message: String },
    /// Failed to parse the provider's response, or an expected field was absent.
    Parse(String),
}

impl TransportError {
    /// HTTP status of the failed response, if the server answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            TransportError::Api { status, .. } => Some(*status),
            TransportError::Network(_) | TransportError::Parse(_) => None,
        }
    }
}

impl ProviderError {
    /// Shortcut to the transport cause, if this is a transport failure.
    pub fn transport(&self) -> Option<&TransportError> {
        match self {
            ProviderError::Transport(cause) => Some(cause),
            _ => None,
        }
    }
}

impl From<TransportError> for ProviderError {
    fn from(cause: TransportError) -> Self {
        ProviderError::Transport(cause)
    }
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportError::Network(msg) => write!(f, "network error: {msg}"),
            TransportError::Api { status, message } => {
                write!(f, "API error (HTTP {status}): {message}")
            }
            TransportError::Parse(msg) => write!(f, "parse error: {msg}"),
        }
    }
}

impl std::error::Error for TransportError {}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderError::CredentialMissing(provider) => {
                write!(f, "API key not set for {provider}")
            }
            ProviderError::UnsupportedProvider(name) => {
                write!(f, "provider {name} not supported")
            }
            ProviderError::UnsupportedOperation {
                operation,
                provider,
            } => write!(f, "image {operation} not supported for provider {provider}"),
            ProviderError::InvalidRequest(msg) => write!(f, "invalid request: {msg}"),
            ProviderError::Transport(cause) => write!(f, "transport error: {cause}"),
        }
    }
}

impl std::error::Error for ProviderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ProviderError::Transport(cause) => Some(cause),
            _ => None,
        }
    }
}

/// Everything a provider needs to fulfill a completion request.
/// Defaults have already been merged in by the caller.
#[derive(Debug, Clone, Copy)]
pub struct CompletionRequest<'a> {
    pub prompt: &'a str,
    pub model: &'a str,
    pub temperature: f32,
    pub max_tokens: u32,
}

#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Returns which backend this handler talks to.
    fn provider(&self) -> Provider;

    /// Sends a single-turn completion and returns the first generated message.
    async fn complete(&self, request: CompletionRequest<'_>) -> Result<Completion, ProviderError>;
}
