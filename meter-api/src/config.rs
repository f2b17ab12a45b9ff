//! Configuration resolution for meter-api
//!
//! Gemini settings resolve with ENV → TOML priority; model and endpoint fall
//! back to compiled defaults.

use meter_common::config::{CompiledDefaults, TomlConfig};
use meter_common::{Error, Result};
use tracing::{info, warn};

/// Environment variable holding the Gemini API key
pub const ENV_GEMINI_API_KEY: &str = "GEMINI_API_KEY";

/// Resolved settings for the vision model client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeminiSettings {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
}

/// Resolve the Gemini API key
///
/// **Priority:** ENV → TOML
pub fn resolve_gemini_api_key(toml_config: &TomlConfig) -> Result<String> {
    let env_key = std::env::var(ENV_GEMINI_API_KEY)
        .ok()
        .filter(|key| is_valid_key(key));
    let toml_key = toml_config
        .gemini_api_key
        .as_ref()
        .filter(|key| is_valid_key(key));

    if env_key.is_some() && toml_key.is_some() {
        warn!("Gemini API key found in environment and TOML. Using environment (highest priority).");
    }

    if let Some(key) = env_key {
        info!("Gemini API key loaded from environment variable");
        return Ok(key);
    }

    if let Some(key) = toml_key {
        info!("Gemini API key loaded from TOML config");
        return Ok(key.clone());
    }

    Err(Error::Config(format!(
        "Gemini API key not configured. Please configure using one of:\n\
         1. Environment: {}=your-key-here\n\
         2. TOML config: ~/.config/meter-reader/config.toml (gemini_api_key = \"your-key\")",
        ENV_GEMINI_API_KEY
    )))
}

/// Validate API key (non-empty, non-whitespace)
pub fn is_valid_key(key: &str) -> bool {
    !key.trim().is_empty()
}

/// Resolve key, model and endpoint for the Gemini client
pub fn resolve_gemini_settings(toml_config: &TomlConfig) -> Result<GeminiSettings> {
    let defaults = CompiledDefaults::for_current_platform();
    let api_key = resolve_gemini_api_key(toml_config)?;

    let model = toml_config
        .gemini_model
        .clone()
        .filter(|m| !m.trim().is_empty())
        .unwrap_or(defaults.gemini_model);
    let base_url = toml_config
        .gemini_base_url
        .clone()
        .filter(|u| !u.trim().is_empty())
        .unwrap_or(defaults.gemini_base_url)
        .trim_end_matches('/')
        .to_string();

    Ok(GeminiSettings {
        api_key,
        model,
        base_url,
    })
}
