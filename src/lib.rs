//! Muse library exports for testing

use std::fmt;
use std::str::FromStr;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

pub mod core;
pub mod inference;

#[cfg(test)]
pub mod test_support;

use inference::ProviderError;

/// The generative-AI backends Muse knows how to talk to.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    #[default]
    #[value(name = "openai")]
    OpenAi,
    #[value(name = "gemini")]
    Gemini,
}

impl Provider {
    pub const ALL: [Provider; 2] = [Provider::OpenAi, Provider::Gemini];

    /// Wire identifier, as used in config files and error messages.
    pub fn id(self) -> &'static str {
        match self {
            Provider::OpenAi => "openai",
            Provider::Gemini => "gemini",
        }
    }

    /// Human-readable label for display
    pub fn label(self) -> &'static str {
        match self {
            Provider::OpenAi => "OpenAI",
            Provider::Gemini => "Google Gemini",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for Provider {
    type Err = ProviderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_ascii_lowercase();
        Provider::ALL
            .into_iter()
            .find(|p| p.id() == name)
            .ok_or_else(|| ProviderError::UnsupportedProvider(s.trim().to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_parses_known_ids() {
        assert_eq!("openai".parse::<Provider>().unwrap(), Provider::OpenAi);
        assert_eq!(" Gemini ".parse::<Provider>().unwrap(), Provider::Gemini);
    }

    #[test]
    fn test_provider_rejects_unknown_id() {
        let err = "anthropic".parse::<Provider>().unwrap_err();
        assert!(matches!(err, ProviderError::UnsupportedProvider(ref name) if name == "anthropic"));
    }

    #[test]
    fn test_provider_default_is_openai() {
        assert_eq!(Provider::default(), Provider::OpenAi);
    }

    #[test]
    fn test_provider_serde_uses_wire_ids() {
        assert_eq!(serde_json::to_string(&Provider::Gemini).unwrap(), "\"gemini\"");
        let parsed: Provider = serde_json::from_str("\"openai\"").unwrap();
        assert_eq!(parsed, Provider::OpenAi);
    }
}
