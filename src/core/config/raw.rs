//! Raw TOML deserialization types.
//!
//! These structs mirror the TOML file shape and use `serde` defaults.
//! The `load` module resolves them, together with env overrides, into the
//! public `types` structs. Secrets never appear here.

use serde::Deserialize;

use super::types::{DEFAULT_SYSTEM_PROMPT, DEFAULT_TIMEOUT_SECONDS};

/// Raw TOML shape — serde target before resolution.
#[derive(Deserialize, Default)]
pub(super) struct RawConfig {
    #[serde(default)]
    pub bot: RawBot,
    #[serde(default)]
    pub llm: RawLlm,
}

#[derive(Deserialize)]
pub(super) struct RawBot {
    #[serde(default = "default_bot_name")]
    pub name: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub log_file: Option<String>,
}

impl Default for RawBot {
    fn default() -> Self {
        Self {
            name: default_bot_name(),
            log_level: default_log_level(),
            log_file: None,
        }
    }
}

/// `[llm]` section. `base_url` and `model` have no default: they must come
/// from the file or from `BASE_URL` / `MODEL_NAME`.
#[derive(Deserialize)]
pub(super) struct RawLlm {
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,
    /// Operator override of the 60 s completion bound.
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

impl Default for RawLlm {
    fn default() -> Self {
        Self {
            base_url: None,
            model: None,
            system_prompt: default_system_prompt(),
            timeout_seconds: default_timeout_seconds(),
        }
    }
}

pub(super) fn default_bot_name() -> String {
    "relay-bot".to_string()
}

pub(super) fn default_log_level() -> String {
    "info".to_string()
}

pub(super) fn default_system_prompt() -> String {
    DEFAULT_SYSTEM_PROMPT.to_string()
}

pub(super) fn default_timeout_seconds() -> u64 {
    DEFAULT_TIMEOUT_SECONDS
}
