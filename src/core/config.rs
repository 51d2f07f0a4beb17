//! # Configuration
//!
//! Centralizes all settings with a clear override hierarchy:
//! defaults → config file → env vars → CLI flags.
//!
//! Config lives at `~/.muse/config.toml`. If missing on first run, a
//! commented-out default is generated so users can discover all options.
//! API keys are only ever read from here, never written back.

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use crate::Provider;
use crate::core::client::ClientSettings;
use crate::inference::ProviderError;
use crate::inference::providers::gemini::DEFAULT_GEMINI_BASE_URL;
use crate::inference::providers::openai::DEFAULT_OPENAI_BASE_URL;
use crate::inference::types::{DEFAULT_MAX_TOKENS, DEFAULT_TEMPERATURE};

// ============================================================================
// Config Structs (all fields Option<T> for sparse TOML)
// ============================================================================

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct MuseConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub openai: OpenAiConfig,
    #[serde(default)]
    pub gemini: GeminiConfig,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct GeneralConfig {
    pub default_provider: Option<String>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct OpenAiConfig {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub model: Option<String>,
    pub vision_model: Option<String>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct GeminiConfig {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub model: Option<String>,
}

// ============================================================================
// Defaults
// ============================================================================

pub const DEFAULT_OPENAI_MODEL: &str = "gpt-3.5-turbo";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-pro";
pub const DEFAULT_VISION_MODEL: &str = "gpt-4-vision-preview";

// ============================================================================
// Resolved Config (concrete values, no Options except secrets)
// ============================================================================

#[derive(Clone)]
pub struct ResolvedConfig {
    pub provider: Provider,
    pub settings: ClientSettings,
    pub openai_api_key: Option<String>,
    pub gemini_api_key: Option<String>,
}

// Keys stay out of debug logs.
impl fmt::Debug for ResolvedConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedConfig")
            .field("provider", &self.provider)
            .field("settings", &self.settings)
            .field("openai_api_key", &self.openai_api_key.as_ref().map(|_| "<set>"))
            .field("gemini_api_key", &self.gemini_api_key.as_ref().map(|_| "<set>"))
            .finish()
    }
}

// ============================================================================
// Error Type
// ============================================================================

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "config I/O error: {e}"),
            ConfigError::Parse(e) => write!(f, "config parse error: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {}

// ============================================================================
// Loading
// ============================================================================

/// Returns the path to `~/.muse/config.toml`.
pub fn config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".muse").join("config.toml"))
}

/// Load config from `~/.muse/config.toml`.
///
/// If the file doesn't exist, generates a commented-out default and
/// returns `MuseConfig::default()`. If it exists but is malformed,
/// returns `ConfigError::Parse`.
pub fn load_config() -> Result<MuseConfig, ConfigError> {
    let path = match config_path() {
        Some(p) => p,
        None => {
            warn!("Could not determine home directory, using default config");
            return Ok(MuseConfig::default());
        }
    };
    load_config_from(&path)
}

/// Same as [`load_config`], for an explicit path.
pub fn load_config_from(path: &Path) -> Result<MuseConfig, ConfigError> {
    if !path.exists() {
        info!("No config file found, generating default at {}", path.display());
        generate_default_config(path);
        return Ok(MuseConfig::default());
    }

    let contents = fs::read_to_string(path).map_err(ConfigError::Io)?;
    let config: MuseConfig = toml::from_str(&contents).map_err(ConfigError::Parse)?;
    info!("Loaded config from {}", path.display());
    debug!(
        "Config: provider={:?}, openai_key={}, gemini_key={}",
        config.general.default_provider,
        config.openai.api_key.is_some(),
        config.gemini.api_key.is_some()
    );
    Ok(config)
}

const DEFAULT_CONFIG_TEMPLATE: &str = r#"# Muse Configuration
# All settings are optional; defaults are used for anything not specified.
# Override hierarchy: defaults → this file → env vars → CLI flags.

# [general]
# default_provider = "openai"        # "openai" or "gemini" (or MUSE_PROVIDER)
# temperature = 0.7                  # 0.0 to 1.0
# max_tokens = 500

# [openai]
# api_key = "sk-..."                 # Or set OPENAI_API_KEY env var
# base_url = "https://api.openai.com/v1"
# model = "gpt-3.5-turbo"
# vision_model = "gpt-4-vision-preview"

# [gemini]
# api_key = "..."                    # Or set GEMINI_API_KEY env var
# base_url = "https://generativelanguage.googleapis.com/v1beta"
# model = "gemini-pro"
"#;

/// Generates a commented-out default config file at the given path.
fn generate_default_config(path: &Path) {
    if let Some(parent) = path.parent()
        && let Err(e) = fs::create_dir_all(parent)
    {
        warn!("Failed to create config directory: {}", e);
        return;
    }
    if let Err(e) = fs::write(path, DEFAULT_CONFIG_TEMPLATE) {
        warn!("Failed to write default config: {}", e);
    }
}

// ============================================================================
// Resolution
// ============================================================================

/// Resolve the final config by collapsing: defaults → config file → env vars → CLI.
///
/// `cli_provider` is from the CLI flag (None = not specified).
pub fn resolve(
    config: &MuseConfig,
    cli_provider: Option<Provider>,
) -> Result<ResolvedConfig, ProviderError> {
    resolve_with(config, cli_provider, |key| std::env::var(key).ok())
}

/// Like [`resolve`], but reads environment variables through `env`.
pub fn resolve_with(
    config: &MuseConfig,
    cli_provider: Option<Provider>,
    env: impl Fn(&str) -> Option<String>,
) -> Result<ResolvedConfig, ProviderError> {
    // Provider: CLI → env → config → default
    let provider = match cli_provider {
        Some(p) => p,
        None => match env("MUSE_PROVIDER").or_else(|| config.general.default_provider.clone()) {
            Some(name) => name.parse()?,
            None => Provider::default(),
        },
    };

    let openai_api_key = env("OPENAI_API_KEY").or_else(|| config.openai.api_key.clone());
    let gemini_api_key = env("GEMINI_API_KEY").or_else(|| config.gemini.api_key.clone());

    let settings = ClientSettings {
        openai_base_url: env("OPENAI_BASE_URL")
            .or_else(|| config.openai.base_url.clone())
            .unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.to_string()),
        gemini_base_url: env("GEMINI_BASE_URL")
            .or_else(|| config.gemini.base_url.clone())
            .unwrap_or_else(|| DEFAULT_GEMINI_BASE_URL.to_string()),
        openai_model: config
            .openai
            .model
            .clone()
            .unwrap_or_else(|| DEFAULT_OPENAI_MODEL.to_string()),
        gemini_model: config
            .gemini
            .model
            .clone()
            .unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string()),
        vision_model: config
            .openai
            .vision_model
            .clone()
            .unwrap_or_else(|| DEFAULT_VISION_MODEL.to_string()),
        temperature: config.general.temperature.unwrap_or(DEFAULT_TEMPERATURE),
        max_tokens: config.general.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
    };

    Ok(ResolvedConfig {
        provider,
        settings,
        openai_api_key,
        gemini_api_key,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_default_config_parses() {
        let config: MuseConfig = toml::from_str(DEFAULT_CONFIG_TEMPLATE).unwrap();
        assert!(config.general.default_provider.is_none());
        assert!(config.openai.api_key.is_none());
    }

    #[test]
    fn test_resolve_uses_defaults_when_empty() {
        let resolved = resolve_with(&MuseConfig::default(), None, no_env).unwrap();
        assert_eq!(resolved.provider, Provider::OpenAi);
        assert_eq!(resolved.settings, ClientSettings::default());
        assert!(resolved.openai_api_key.is_none());
        assert!(resolved.gemini_api_key.is_none());
    }

    #[test]
    fn test_resolve_config_values_override_defaults() {
        let config = MuseConfig {
            general: GeneralConfig {
                default_provider: Some("gemini".to_string()),
                temperature: Some(0.2),
                max_tokens: Some(1024),
            },
            gemini: GeminiConfig {
                api_key: Some("g-from-file".to_string()),
                model: Some("gemini-1.5-flash".to_string()),
                ..Default::default()
            },
            ..Default::default()
        };
        let resolved = resolve_with(&config, None, no_env).unwrap();
        assert_eq!(resolved.provider, Provider::Gemini);
        assert_eq!(resolved.settings.temperature, 0.2);
        assert_eq!(resolved.settings.max_tokens, 1024);
        assert_eq!(resolved.settings.gemini_model, "gemini-1.5-flash");
        assert_eq!(resolved.gemini_api_key.as_deref(), Some("g-from-file"));
    }

    #[test]
    fn test_env_wins_over_config() {
        let config = MuseConfig {
            general: GeneralConfig {
                default_provider: Some("openai".to_string()),
                ..Default::default()
            },
            openai: OpenAiConfig {
                api_key: Some("sk-file".to_string()),
                base_url: Some("http://file".to_string()),
                ..Default::default()
            },
            ..Default::default()
        };
        let env: HashMap<&str, &str> = HashMap::from([
            ("MUSE_PROVIDER", "gemini"),
            ("OPENAI_API_KEY", "sk-env"),
            ("OPENAI_BASE_URL", "http://env"),
        ]);
        let resolved =
            resolve_with(&config, None, |k| env.get(k).map(|v| v.to_string())).unwrap();
        assert_eq!(resolved.provider, Provider::Gemini);
        assert_eq!(resolved.openai_api_key.as_deref(), Some("sk-env"));
        assert_eq!(resolved.settings.openai_base_url, "http://env");
    }

    #[test]
    fn test_resolve_cli_provider_wins() {
        let config = MuseConfig {
            general: GeneralConfig {
                default_provider: Some("gemini".to_string()),
                ..Default::default()
            },
            ..Default::default()
        };
        let resolved = resolve_with(&config, Some(Provider::OpenAi), |_| {
            Some("gemini".to_string())
        })
        .unwrap();
        assert_eq!(resolved.provider, Provider::OpenAi);
    }

    #[test]
    fn test_unknown_provider_in_config_is_an_error() {
        let config = MuseConfig {
            general: GeneralConfig {
                default_provider: Some("mistral".to_string()),
                ..Default::default()
            },
            ..Default::default()
        };
        let err = resolve_with(&config, None, no_env).unwrap_err();
        assert!(matches!(err, ProviderError::UnsupportedProvider(ref name) if name == "mistral"));
    }

    #[test]
    fn test_toml_round_trip() {
        let toml_str = r#"
[general]
default_provider = "gemini"
temperature = 0.5
max_tokens = 800

[openai]
api_key = "sk-test-123"
vision_model = "gpt-4o"

[gemini]
base_url = "http://192.168.1.100:8080/v1beta"
"#;
        let config: MuseConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.general.default_provider.as_deref(), Some("gemini"));
        assert_eq!(config.general.max_tokens, Some(800));
        assert_eq!(config.openai.api_key.as_deref(), Some("sk-test-123"));
        assert_eq!(config.openai.vision_model.as_deref(), Some("gpt-4o"));
        assert!(config.gemini.api_key.is_none());
    }

    #[test]
    fn test_sparse_toml_parses() {
        // Only override one thing, everything else stays default
        let toml_str = r#"
[openai]
model = "gpt-4o-mini"
"#;
        let config: MuseConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.openai.model.as_deref(), Some("gpt-4o-mini"));
        assert!(config.general.default_provider.is_none());
        assert!(config.gemini.model.is_none());
    }

    #[test]
    fn test_load_config_generates_template_when_missing() {
        let dir = std::env::temp_dir().join(format!("muse-config-{}", std::process::id()));
        let path = dir.join("config.toml");
        fs::remove_dir_all(&dir).ok();

        let config = load_config_from(&path).unwrap();
        assert!(config.general.default_provider.is_none());
        let written = fs::read_to_string(&path).unwrap();
        assert!(written.starts_with("# Muse Configuration"));

        fs::write(&path, "[general]\ndefault_provider = \"gemini\"\n").unwrap();
        let config = load_config_from(&path).unwrap();
        assert_eq!(config.general.default_provider.as_deref(), Some("gemini"));

        fs::write(&path, "[general\n").unwrap();
        assert!(matches!(load_config_from(&path), Err(ConfigError::Parse(_))));

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_debug_hides_keys() {
        let resolved = ResolvedConfig {
            provider: Provider::OpenAi,
            settings: ClientSettings::default(),
            openai_api_key: Some("sk-secret".to_string()),
            gemini_api_key: None,
        };
        let debug = format!("{:?}", resolved);
        assert!(!debug.contains("sk-secret"));
        assert!(debug.contains("<set>"));
    }
}
