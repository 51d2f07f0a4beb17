use std::fmt;
use std::path::Path;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};

use super::ProviderError;
use crate::Provider;

pub const DEFAULT_TEMPERATURE: f32 = 0.7;
pub const DEFAULT_MAX_TOKENS: u32 = 500;
pub const DEFAULT_IMAGE_COUNT: u32 = 1;
pub const DEFAULT_IMAGE_SIZE: &str = "1024x1024";
pub const DEFAULT_VISION_PROMPT: &str = "What's in this image?";

// ============================================================================
// Request Options
// ============================================================================

/// Optional knobs for a completion. Anything left `None` falls back to the
/// client's defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompletionOptions {
    pub model: Option<String>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

impl CompletionOptions {
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Returns `self` with any unset field filled from `base`.
    pub fn merged_over(&self, base: &CompletionOptions) -> CompletionOptions {
        CompletionOptions {
            model: self.model.clone().or_else(|| base.model.clone()),
            temperature: self.temperature.or(base.temperature),
            max_tokens: self.max_tokens.or(base.max_tokens),
        }
    }

    /// Rejects explicitly-set values outside their valid range.
    pub fn validate(&self) -> Result<(), ProviderError> {
        if let Some(t) = self.temperature
            && !(0.0..=1.0).contains(&t)
        {
            return Err(ProviderError::InvalidRequest(format!(
                "temperature must be within [0, 1], got {t}"
            )));
        }
        if self.max_tokens == Some(0) {
            return Err(ProviderError::InvalidRequest(
                "max_tokens must be greater than zero".to_string(),
            ));
        }
        if let Some(model) = &self.model
            && model.trim().is_empty()
        {
            return Err(ProviderError::InvalidRequest("model must not be empty".to_string()));
        }
        Ok(())
    }
}

/// Which kind of image work a request asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageOperation {
    Generation,
    Understanding,
}

impl fmt::Display for ImageOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageOperation::Generation => f.write_str("generation"),
            ImageOperation::Understanding => f.write_str("understanding"),
        }
    }
}

/// Text prompt in, image URLs out.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageGeneration {
    pub prompt: String,
    pub count: Option<u32>,
    pub size: Option<String>,
}

impl ImageGeneration {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            count: None,
            size: None,
        }
    }

    pub fn count(&self) -> u32 {
        self.count.unwrap_or(DEFAULT_IMAGE_COUNT)
    }

    pub fn size(&self) -> &str {
        self.size.as_deref().unwrap_or(DEFAULT_IMAGE_SIZE)
    }

    pub fn validate(&self) -> Result<(), ProviderError> {
        if self.prompt.trim().is_empty() {
            return Err(ProviderError::InvalidRequest(
                "image generation requires a prompt".to_string(),
            ));
        }
        if self.count() == 0 {
            return Err(ProviderError::InvalidRequest(
                "image count must be at least 1".to_string(),
            ));
        }
        if parse_size(self.size()).is_none() {
            return Err(ProviderError::InvalidRequest(format!(
                "image size must look like WxH, got {:?}",
                self.size()
            )));
        }
        Ok(())
    }
}

/// Parses a "WxH" size string into (width, height). Both sides must be positive.
pub fn parse_size(size: &str) -> Option<(u32, u32)> {
    let (w, h) = size.split_once('x')?;
    let w: u32 = w.parse().ok()?;
    let h: u32 = h.parse().ok()?;
    (w > 0 && h > 0).then_some((w, h))
}

/// Where the image for an understanding request comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum ImageSource {
    /// Remote image, passed through as-is.
    Url(String),
    /// Raw bytes, sent inline as a base64 `data:` URL.
    Inline { mime_type: String, data: Vec<u8> },
}

impl ImageSource {
    /// Reads a local image file. The MIME type is guessed from the extension.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ProviderError> {
        let path = path.as_ref();
        let mime_type = mime_for_path(path).ok_or_else(|| {
            ProviderError::InvalidRequest(format!(
                "unrecognized image type: {}",
                path.display()
            ))
        })?;
        let data = std::fs::read(path).map_err(|e| {
            ProviderError::InvalidRequest(format!("failed to read {}: {e}", path.display()))
        })?;
        Ok(ImageSource::Inline {
            mime_type: mime_type.to_string(),
            data,
        })
    }

    /// The URL form the vision endpoint expects.
    pub fn to_url(&self) -> String {
        match self {
            ImageSource::Url(url) => url.clone(),
            ImageSource::Inline { mime_type, data } => {
                format!("data:{mime_type};base64,{}", STANDARD.encode(data))
            }
        }
    }

    fn is_empty(&self) -> bool {
        match self {
            ImageSource::Url(url) => url.trim().is_empty(),
            ImageSource::Inline { data, .. } => data.is_empty(),
        }
    }
}

fn mime_for_path(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        _ => None,
    }
}

/// Image plus optional question in, text out.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageUnderstanding {
    pub image: ImageSource,
    pub prompt: Option<String>,
    pub max_tokens: Option<u32>,
}

impl ImageUnderstanding {
    pub fn new(image: ImageSource) -> Self {
        Self {
            image,
            prompt: None,
            max_tokens: None,
        }
    }

    /// The question to ask about the image. Blank prompts fall back to the default.
    pub fn prompt(&self) -> &str {
        self.prompt
            .as_deref()
            .filter(|p| !p.trim().is_empty())
            .unwrap_or(DEFAULT_VISION_PROMPT)
    }

    pub fn max_tokens(&self) -> u32 {
        self.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS)
    }

    pub fn validate(&self) -> Result<(), ProviderError> {
        if self.image.is_empty() {
            return Err(ProviderError::InvalidRequest(
                "image understanding requires an image".to_string(),
            ));
        }
        if self.max_tokens() == 0 {
            return Err(ProviderError::InvalidRequest(
                "max_tokens must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// An image request. The variant decides the operation.
#[derive(Debug, Clone, PartialEq)]
pub enum ImageRequest {
    Generation(ImageGeneration),
    Understanding(ImageUnderstanding),
}

impl ImageRequest {
    pub fn operation(&self) -> ImageOperation {
        match self {
            ImageRequest::Generation(_) => ImageOperation::Generation,
            ImageRequest::Understanding(_) => ImageOperation::Understanding,
        }
    }
}

// ============================================================================
// Normalized Results
// ============================================================================

/// A completion, reduced to the first generated message.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Completion {
    pub text: String,
    /// Provider-specific token accounting, passed through untouched.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<serde_json::Value>,
    pub provider: Provider,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ImageResult {
    Generated { images: Vec<String>, provider: Provider },
    Described { description: String, provider: Provider },
}

impl ImageResult {
    pub fn provider(&self) -> Provider {
        match self {
            ImageResult::Generated { provider, .. } | ImageResult::Described { provider, .. } => {
                *provider
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_options_merge_prefers_explicit_values() {
        let base = CompletionOptions {
            model: Some("base-model".to_string()),
            temperature: Some(DEFAULT_TEMPERATURE),
            max_tokens: Some(DEFAULT_MAX_TOKENS),
        };
        let merged = CompletionOptions::default()
            .with_temperature(0.2)
            .merged_over(&base);
        assert_eq!(merged.model.as_deref(), Some("base-model"));
        assert_eq!(merged.temperature, Some(0.2));
        assert_eq!(merged.max_tokens, Some(500));
    }

    #[test]
    fn test_zero_temperature_is_kept() {
        let base = CompletionOptions::default().with_temperature(0.7);
        let merged = CompletionOptions::default().with_temperature(0.0).merged_over(&base);
        assert_eq!(merged.temperature, Some(0.0));
    }

    #[test]
    fn test_options_validation() {
        assert!(CompletionOptions::default().validate().is_ok());
        assert!(CompletionOptions::default().with_temperature(1.0).validate().is_ok());
        assert!(matches!(
            CompletionOptions::default().with_temperature(1.5).validate(),
            Err(ProviderError::InvalidRequest(_))
        ));
        assert!(matches!(
            CompletionOptions::default().with_max_tokens(0).validate(),
            Err(ProviderError::InvalidRequest(_))
        ));
        assert!(matches!(
            CompletionOptions::default().with_model("  ").validate(),
            Err(ProviderError::InvalidRequest(_))
        ));
    }

    #[test]
    fn test_image_generation_defaults() {
        let req = ImageGeneration::new("a red fox");
        assert_eq!(req.count(), 1);
        assert_eq!(req.size(), "1024x1024");
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_image_generation_rejects_bad_input() {
        assert!(ImageGeneration::new("   ").validate().is_err());

        let mut zero = ImageGeneration::new("fox");
        zero.count = Some(0);
        assert!(zero.validate().is_err());

        let mut bad_size = ImageGeneration::new("fox");
        bad_size.size = Some("big".to_string());
        assert!(bad_size.validate().is_err());
    }

    #[test]
    fn test_parse_size() {
        assert_eq!(parse_size("512x512"), Some((512, 512)));
        assert_eq!(parse_size("1792x1024"), Some((1792, 1024)));
        assert_eq!(parse_size("0x512"), None);
        assert_eq!(parse_size("512"), None);
        assert_eq!(parse_size("axb"), None);
    }

    #[test]
    fn test_inline_image_becomes_data_url() {
        let source = ImageSource::Inline {
            mime_type: "image/png".to_string(),
            data: b"hello".to_vec(),
        };
        assert_eq!(source.to_url(), "data:image/png;base64,aGVsbG8=");
    }

    #[test]
    fn test_url_image_passes_through() {
        let source = ImageSource::Url("https://example.com/cat.jpg".to_string());
        assert_eq!(source.to_url(), "https://example.com/cat.jpg");
    }

    #[test]
    fn test_from_path_reads_and_guesses_mime() {
        let path = std::env::temp_dir().join(format!("muse-test-{}.JPG", std::process::id()));
        std::fs::write(&path, [0xff, 0xd8, 0xff]).unwrap();

        let source = ImageSource::from_path(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(
            source,
            ImageSource::Inline {
                mime_type: "image/jpeg".to_string(),
                data: vec![0xff, 0xd8, 0xff],
            }
        );
    }

    #[test]
    fn test_from_path_rejects_unknown_extension() {
        let err = ImageSource::from_path("notes.txt").unwrap_err();
        assert!(matches!(err, ProviderError::InvalidRequest(_)));
    }

    #[test]
    fn test_understanding_prompt_falls_back_to_default() {
        let mut req = ImageUnderstanding::new(ImageSource::Url("https://x/y.png".to_string()));
        assert_eq!(req.prompt(), DEFAULT_VISION_PROMPT);
        req.prompt = Some(" ".to_string());
        assert_eq!(req.prompt(), DEFAULT_VISION_PROMPT);
        req.prompt = Some("Count the cats".to_string());
        assert_eq!(req.prompt(), "Count the cats");
    }

    #[test]
    fn test_understanding_requires_image() {
        let req = ImageUnderstanding::new(ImageSource::Url(String::new()));
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_image_request_operation() {
        let generation = ImageRequest::Generation(ImageGeneration::new("fox"));
        assert_eq!(generation.operation(), ImageOperation::Generation);
        let understanding = ImageRequest::Understanding(ImageUnderstanding::new(
            ImageSource::Url("https://x/y.png".to_string()),
        ));
        assert_eq!(understanding.operation(), ImageOperation::Understanding);
        assert_eq!(ImageOperation::Understanding.to_string(), "understanding");
    }

    #[test]
    fn test_completion_omits_missing_usage() {
        let completion = Completion {
            text: "hi".to_string(),
            usage: None,
            provider: Provider::Gemini,
        };
        let json = serde_json::to_string(&completion).unwrap();
        assert_eq!(json, r#"{"text":"hi","provider":"gemini"}"#);
    }
}
