//! Test utilities shared across the crate.
//!
//! This module is only compiled during tests (`#[cfg(test)]`).

use crate::core::client::{ClientSettings, ProviderClient};

/// Port 9 (discard) on loopback; nothing should ever be sent here.
const UNREACHABLE_BASE_URL: &str = "http://127.0.0.1:9/v1";

/// Settings with both providers pointed at `base_url`.
pub fn settings_at(base_url: &str) -> ClientSettings {
    ClientSettings {
        openai_base_url: base_url.to_string(),
        gemini_base_url: base_url.to_string(),
        ..ClientSettings::default()
    }
}

/// A client with no credentials whose requests can't leave the machine.
/// Used by tests that expect to fail before any network call.
pub fn unreachable_client() -> ProviderClient {
    ProviderClient::new(settings_at(UNREACHABLE_BASE_URL))
}
