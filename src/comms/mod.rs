//! Comms — the transports that feed the relay.
//!
//! Each channel implements [`crate::relay::ReplySink`] for its outbound half
//! and owns its own receive loop. Exactly one channel runs per process:
//! Telegram by default, the console with `-i`.

#[cfg(feature = "channel-pty")]
pub mod pty;
#[cfg(feature = "channel-telegram")]
pub mod telegram;

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::config::Config;
use crate::error::AppError;
use crate::relay::Relay;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelKind {
    Telegram,
    Pty,
}

impl ChannelKind {
    pub fn from_interactive(interactive: bool) -> Self {
        if interactive { ChannelKind::Pty } else { ChannelKind::Telegram }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ChannelKind::Telegram => "telegram",
            ChannelKind::Pty => "pty",
        }
    }
}

/// Fail fast on anything the chosen channel needs before it starts.
pub fn check(kind: ChannelKind, config: &Config) -> Result<(), AppError> {
    match kind {
        ChannelKind::Telegram => {
            if !cfg!(feature = "channel-telegram") {
                return Err(AppError::Channel("telegram channel not compiled in".into()));
            }
            if config.telegram.bot_token.is_none() {
                return Err(AppError::Config(
                    "missing required settings: TG_TOKEN (check your .env file)".into(),
                ));
            }
            Ok(())
        }
        ChannelKind::Pty => {
            if cfg!(feature = "channel-pty") {
                Ok(())
            } else {
                Err(AppError::Channel("pty channel not compiled in".into()))
            }
        }
    }
}

/// Run the chosen channel until it exits or `shutdown` is cancelled.
pub async fn run(
    kind: ChannelKind,
    config: &Config,
    relay: Arc<Relay>,
    shutdown: CancellationToken,
) -> Result<(), AppError> {
    check(kind, config)?;
    info!(channel = kind.as_str(), "starting channel");

    match kind {
        #[cfg(feature = "channel-telegram")]
        ChannelKind::Telegram => {
            let token = config
                .telegram
                .bot_token
                .clone()
                .ok_or_else(|| AppError::Config("missing required settings: TG_TOKEN".into()))?;
            telegram::run(token, relay, shutdown).await
        }
        #[cfg(feature = "channel-pty")]
        ChannelKind::Pty => pty::run(relay, shutdown).await,
        #[allow(unreachable_patterns)]
        _ => Err(AppError::Channel(format!("{} channel not compiled in", kind.as_str()))),
    }
}
