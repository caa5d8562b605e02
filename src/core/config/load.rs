//! Configuration loading with env-var overrides.
//!
//! Reads TOML files, supports `[meta] base = "..."` inheritance chains,
//! then layers the process environment on top and validates the result.

use std::collections::HashSet;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::AppError;

use super::raw::RawConfig;
use super::types::*;

/// Values read from the process environment (and `.env`, once dotenvy has run).
///
/// Blank values are stored as `None`, so an empty `API_KEY=` in `.env` is
/// reported as missing rather than sent upstream. `SYSTEM_PROMPT` is the
/// exception: once set, even to an empty string, it is used as-is.
#[derive(Debug, Clone, Default)]
pub struct EnvOverrides {
    pub tg_token: Option<String>,
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    pub model_name: Option<String>,
    pub system_prompt: Option<String>,
    pub log_level: Option<String>,
}

impl EnvOverrides {
    pub fn from_env() -> Self {
        Self {
            tg_token: non_blank_var("TG_TOKEN"),
            base_url: non_blank_var("BASE_URL"),
            api_key: non_blank_var("API_KEY"),
            model_name: non_blank_var("MODEL_NAME"),
            system_prompt: env::var("SYSTEM_PROMPT").ok(),
            log_level: non_blank_var("RELAY_LOG_LEVEL"),
        }
    }
}

fn non_blank_var(key: &str) -> Option<String> {
    env::var(key).ok().and_then(non_blank)
}

fn non_blank(value: String) -> Option<String> {
    if value.trim().is_empty() { None } else { Some(value) }
}

/// Deep-merge two TOML values.
/// Tables merge recursively; for every other type the overlay value replaces
/// the base value wholesale.
fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_tbl), toml::Value::Table(overlay_tbl)) => {
            for (key, ov_val) in overlay_tbl {
                let merged = match base_tbl.remove(&key) {
                    Some(base_val) => merge_toml(base_val, ov_val),
                    None => ov_val,
                };
                base_tbl.insert(key, merged);
            }
            toml::Value::Table(base_tbl)
        }
        (_, overlay) => overlay,
    }
}

/// Read a config file, follow any `[meta] base = "..."` chain, and return the
/// merged `toml::Value`. `visited` holds the canonical paths already seen so
/// a cycle is rejected instead of recursing forever.
fn load_raw_merged(path: &Path, visited: &mut HashSet<PathBuf>) -> Result<toml::Value, AppError> {
    let canonical = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
    if !visited.insert(canonical) {
        return Err(AppError::Config(format!(
            "circular base reference detected at: {}",
            path.display()
        )));
    }

    let text = fs::read_to_string(path)
        .map_err(|e| AppError::Config(format!("cannot read {}: {e}", path.display())))?;

    let overlay: toml::Value = toml::from_str(&text)
        .map_err(|e| AppError::Config(format!("parse error in {}: {e}", path.display())))?;

    let base_ref = overlay
        .get("meta")
        .and_then(|m| m.get("base"))
        .and_then(|b| b.as_str())
        .map(str::to_owned);

    match base_ref {
        Some(base_str) => {
            let base_path = if Path::new(&base_str).is_absolute() {
                PathBuf::from(base_str)
            } else {
                path.parent().unwrap_or(Path::new(".")).join(base_str)
            };
            let base = load_raw_merged(&base_path, visited)?;
            Ok(merge_toml(base, overlay))
        }
        None => Ok(overlay),
    }
}

/// Load config from the given path, or `config/default.toml` when present,
/// then apply the process environment.
///
/// Without any file, every setting comes from env vars and built-in defaults.
pub fn load(config_path: Option<&str>) -> Result<Config, AppError> {
    let overrides = EnvOverrides::from_env();

    if let Some(path) = config_path {
        return load_from(Path::new(path), &overrides);
    }

    let default_path = Path::new("config/default.toml");
    if default_path.exists() {
        load_from(default_path, &overrides)
    } else {
        resolve(RawConfig::default(), &overrides)
    }
}

/// Internal loader — explicit path and overrides so tests never touch the
/// real environment.
pub fn load_from(path: &Path, overrides: &EnvOverrides) -> Result<Config, AppError> {
    let merged = load_raw_merged(path, &mut HashSet::new())?;

    let parsed: RawConfig = Deserialize::deserialize(merged).map_err(|e: toml::de::Error| {
        AppError::Config(format!("config error in {}: {e}", path.display()))
    })?;

    resolve(parsed, overrides)
}

/// Env wins over file. Every missing required key is reported in one error.
fn resolve(raw: RawConfig, env: &EnvOverrides) -> Result<Config, AppError> {
    let base_url = env.base_url.clone().or(raw.llm.base_url.and_then(non_blank));
    let model = env.model_name.clone().or(raw.llm.model.and_then(non_blank));
    let api_key = env.api_key.clone();

    let mut missing = Vec::new();
    if base_url.is_none() {
        missing.push("BASE_URL");
    }
    if api_key.is_none() {
        missing.push("API_KEY");
    }
    if model.is_none() {
        missing.push("MODEL_NAME");
    }

    let (Some(base_url), Some(api_key), Some(model)) = (base_url, api_key, model) else {
        return Err(AppError::Config(format!(
            "missing required settings: {} (check your .env file)",
            missing.join(", ")
        )));
    };

    if raw.llm.timeout_seconds == 0 {
        return Err(AppError::Config("llm.timeout_seconds must be greater than 0".into()));
    }

    // An unset prompt falls back through the file to the default; a set but
    // empty one is sent empty.
    let system_prompt = env.system_prompt.clone().unwrap_or(raw.llm.system_prompt);

    Ok(Config {
        bot_name: raw.bot.name,
        log_level: env.log_level.clone().unwrap_or(raw.bot.log_level),
        log_file: raw.bot.log_file.map(PathBuf::from),
        telegram: TelegramConfig {
            bot_token: env.tg_token.clone(),
        },
        llm: LlmConfig {
            base_url,
            api_key,
            model,
            system_prompt,
            timeout_seconds: raw.llm.timeout_seconds,
        },
    })
}
