pub mod provider;
pub mod providers;
pub mod types;

pub use provider::{CompletionProvider, CompletionRequest, ProviderError, TransportError};
pub use providers::{GeminiProvider, OpenAiProvider};
pub use types::{
    Completion, CompletionOptions, ImageGeneration, ImageOperation, ImageRequest, ImageResult,
    ImageSource, ImageUnderstanding,
};
