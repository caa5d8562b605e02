//! Public configuration types.
//!
//! These are the resolved, validated structs the rest of the crate consumes.
//! Raw TOML deserialization types live in `raw.rs`.

use std::path::PathBuf;

/// System prompt used when neither the file nor `SYSTEM_PROMPT` sets one.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful assistant.";

/// Upper bound on a single completion round-trip, including the body.
/// The required bound is 60 s; any other `llm.timeout_seconds` is an
/// operator override.
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 60;

// ── Telegram ────────────────────────────────────────────────────────────────

/// Telegram channel configuration.
#[derive(Debug, Clone)]
pub struct TelegramConfig {
    /// Bot token from `TG_TOKEN`. Only the Telegram channel requires it.
    pub bot_token: Option<String>,
}

// ── LLM ──────────────────────────────────────────────────────────────────────

/// Upstream completion API configuration.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// Operator-supplied base URL, with or without a trailing `/v1`.
    pub base_url: String,
    /// Sent as `Authorization: Bearer <key>`. Sourced from env only.
    pub api_key: String,
    /// Model name passed in the request body.
    pub model: String,
    /// Prepended to every request as the `system` message.
    pub system_prompt: String,
    pub timeout_seconds: u64,
}

// ── Top-level ────────────────────────────────────────────────────────────────

/// Fully resolved process configuration. Immutable after [`super::load`].
#[derive(Debug, Clone)]
pub struct Config {
    pub bot_name: String,
    pub log_level: String,
    pub log_file: Option<PathBuf>,
    pub telegram: TelegramConfig,
    pub llm: LlmConfig,
}
