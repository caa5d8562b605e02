//! Telegram comms channel — long-polls the Bot API, relays every text
//! message, and replies in the originating chat.

use std::sync::Arc;

use teloxide::payloads::SendMessageSetters;
use teloxide::prelude::*;
use teloxide::types::{ChatAction, ChatId, MessageId, ReplyParameters};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::AppError;
use crate::relay::{ConversationId, InboundMessage, Relay, ReplySink};

// ── Constants ────────────────────────────────────────────────────────────────

/// Telegram caps a message at 4096 UTF-16 code units; chunk below that.
const MAX_MESSAGE_UTF16_UNITS: usize = 4000;

/// Telegram rejects empty message text.
const EMPTY_REPLY_PLACEHOLDER: &str = "(empty response)";

// ── TelegramSink ─────────────────────────────────────────────────────────────

/// Sends replies through the Bot API, threaded under the triggering message.
#[derive(Clone)]
pub struct TelegramSink {
    bot: Bot,
}

impl TelegramSink {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

impl ReplySink for TelegramSink {
    async fn send_typing(&self, conversation: ConversationId) -> Result<(), AppError> {
        self.bot
            .send_chat_action(ChatId(conversation.0), ChatAction::Typing)
            .await
            .map(|_| ())
            .map_err(|e| AppError::Channel(format!("send_chat_action failed: {e}")))
    }

    async fn send_reply(&self, message: &InboundMessage, text: String) -> Result<(), AppError> {
        let chat_id = ChatId(message.conversation.0);
        let reply_params = message
            .message_id
            .map(|id| ReplyParameters::new(MessageId(id)).allow_sending_without_reply());

        for (i, chunk) in split_for_telegram(&text).into_iter().enumerate() {
            let mut req = self.bot.send_message(chat_id, chunk);
            // Only the first chunk is threaded; the rest follow it.
            if i == 0 {
                if let Some(rp) = reply_params.clone() {
                    req = req.reply_parameters(rp);
                }
            }
            req.await
                .map_err(|e| AppError::Channel(format!("send_message failed: {e}")))?;
        }
        Ok(())
    }
}

/// Split a reply into Telegram-sized chunks, measured in UTF-16 code units.
/// Chunks end on `char` boundaries, so a surrogate pair is never split.
/// Always yields at least one non-empty chunk.
fn split_for_telegram(text: &str) -> Vec<String> {
    if text.is_empty() {
        return vec![EMPTY_REPLY_PLACEHOLDER.to_string()];
    }

    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut units = 0;
    for ch in text.chars() {
        let width = ch.len_utf16();
        if units + width > MAX_MESSAGE_UTF16_UNITS {
            chunks.push(std::mem::take(&mut current));
            units = 0;
        }
        current.push(ch);
        units += width;
    }
    chunks.push(current);
    chunks
}

// ── run ──────────────────────────────────────────────────────────────────────

/// Run the long-polling dispatcher until `shutdown` is cancelled.
///
/// Updates from different chats are handled concurrently; updates from one
/// chat are handled in order. Non-text messages are skipped.
pub async fn run(token: String, relay: Arc<Relay>, shutdown: CancellationToken) -> Result<(), AppError> {
    info!("telegram channel starting");

    let bot = Bot::new(token);

    let handler = Update::filter_message().endpoint(move |bot: Bot, msg: Message| {
        let relay = relay.clone();
        async move {
            match msg.text() {
                Some(text) => {
                    let inbound = InboundMessage {
                        conversation: ConversationId(msg.chat.id.0),
                        message_id: Some(msg.id.0),
                        text: text.to_string(),
                    };
                    debug!(
                        chat_id = msg.chat.id.0,
                        from = ?msg.from.as_ref().and_then(|u| u.username.as_ref()),
                        "telegram received message"
                    );
                    relay.handle(&TelegramSink::new(bot), &inbound).await;
                }
                None => debug!(chat_id = msg.chat.id.0, "skipping non-text message"),
            }
            respond(())
        }
    });

    let mut dispatcher = Dispatcher::builder(bot, handler).build();

    tokio::select! {
        biased;

        _ = shutdown.cancelled() => {
            info!("shutdown signal received — closing telegram channel");
        }
        _ = dispatcher.dispatch() => {
            warn!("telegram dispatcher exited unexpectedly");
        }
    }

    Ok(())
}
