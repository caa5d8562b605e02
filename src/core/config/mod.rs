//! Configuration loading with env-var overrides.
//!
//! Reads an optional TOML file (`-f <path>` or `config/default.toml`), then
//! applies `TG_TOKEN`, `BASE_URL`, `API_KEY`, `MODEL_NAME`, `SYSTEM_PROMPT`
//! and `RELAY_LOG_LEVEL` from the environment. Secrets are env-only.
//!
//! # Module layout
//!
//! - **types** — resolved configuration structs (`Config`, `LlmConfig`, …).
//! - **raw** — TOML deserialization types; kept private.
//! - **load** — `load`, `load_from`, `[meta] base` chains and validation.

mod load;
mod raw;
mod types;

pub use load::{EnvOverrides, load, load_from};
pub use types::*;

#[cfg(test)]
impl Config {
    /// Config for unit tests pointed at `base_url`; no env access.
    pub fn test_default(base_url: &str) -> Self {
        Self {
            bot_name: "test".into(),
            log_level: "info".into(),
            log_file: None,
            telegram: TelegramConfig { bot_token: None },
            llm: LlmConfig {
                base_url: base_url.into(),
                api_key: "sk-test".into(),
                model: "test-model".into(),
                system_prompt: DEFAULT_SYSTEM_PROMPT.into(),
                timeout_seconds: 1,
            },
        }
    }
}
