//! PTY (console) channel — reads lines from stdin, relays each one, prints
//! the reply to stdout.
//!
//! Selected with `-i`. Useful for checking an upstream provider without a
//! Telegram bot. Runs until the `shutdown` token is cancelled or stdin closes.

use std::io::Write as _;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::AppError;
use crate::relay::{ConversationId, InboundMessage, Relay, ReplySink};

/// The console is a single conversation.
const CONSOLE_CONVERSATION: ConversationId = ConversationId(0);

/// Writes replies to stdout.
#[derive(Debug, Default)]
pub struct PtySink;

impl ReplySink for PtySink {
    async fn send_typing(&self, _conversation: ConversationId) -> Result<(), AppError> {
        let mut out = std::io::stdout().lock();
        write!(out, "…\r")?;
        out.flush()?;
        Ok(())
    }

    async fn send_reply(&self, _message: &InboundMessage, text: String) -> Result<(), AppError> {
        let mut out = std::io::stdout().lock();
        writeln!(out, "{text}")?;
        out.flush()?;
        Ok(())
    }
}

pub async fn run(relay: Arc<Relay>, shutdown: CancellationToken) -> Result<(), AppError> {
    info!("pty channel started — type a message and press Enter. Ctrl-C to quit.");
    println!("─────────────────────────────────");
    println!(" relay-bot console  (Ctrl-C to quit)");
    println!("─────────────────────────────────");

    let sink = PtySink;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("> ");
        let _ = std::io::stdout().flush();

        tokio::select! {
            biased;

            _ = shutdown.cancelled() => {
                info!("pty channel shutting down");
                break;
            }

            line = lines.next_line() => {
                match line {
                    Err(e) => {
                        warn!("pty read error: {e}");
                        break;
                    }
                    Ok(None) => {
                        info!("pty stdin closed");
                        break;
                    }
                    Ok(Some(input)) => {
                        if input.trim().is_empty() {
                            continue;
                        }
                        debug!(input_len = input.len(), "pty received line");
                        let message = InboundMessage {
                            conversation: CONSOLE_CONVERSATION,
                            message_id: None,
                            text: input,
                        };
                        relay.handle(&sink, &message).await;
                    }
                }
            }
        }
    }

    Ok(())
}
