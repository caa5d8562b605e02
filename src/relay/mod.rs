//! Message relay — one inbound message in, one completion call, one reply out.
//!
//! The relay owns no mutable state. Channels hand it an [`InboundMessage`]
//! and a [`ReplySink`]; [`Relay::handle`] always ends in exactly one
//! `send_reply` call, whichever way the upstream call went.

use std::future::Future;

use tracing::{debug, info, warn};

use crate::error::AppError;
use crate::llm::{CompletionError, OpenAiCompatibleProvider};

/// Reply sent when a success body lacks `choices[0].message.content`.
pub const PARSE_FAILURE_NOTICE: &str = "⚠️ The API returned data that could not be parsed.";

// ── Inbound side ─────────────────────────────────────────────────────────────

/// Transport-assigned handle identifying where a reply must go.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConversationId(pub i64);

impl std::fmt::Display for ConversationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone)]
pub struct InboundMessage {
    pub conversation: ConversationId,
    /// Transport message id, used to thread the reply. `None` for channels
    /// without message ids.
    pub message_id: Option<i32>,
    pub text: String,
}

/// Outbound half of a channel.
///
/// Futures must be `Send` so the relay can run inside multi-threaded
/// dispatchers.
pub trait ReplySink: Send + Sync {
    /// Best-effort "typing…" indicator. Callers ignore the result.
    fn send_typing(
        &self,
        conversation: ConversationId,
    ) -> impl Future<Output = Result<(), AppError>> + Send;

    /// Deliver `text` to the conversation `message` came from.
    fn send_reply(
        &self,
        message: &InboundMessage,
        text: String,
    ) -> impl Future<Output = Result<(), AppError>> + Send;
}

// ── Outcome ──────────────────────────────────────────────────────────────────

/// Terminal state of one relayed message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayOutcome {
    Success,
    UpstreamError,
    ParseFailure,
    InternalError,
}

impl RelayOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            RelayOutcome::Success => "success",
            RelayOutcome::UpstreamError => "upstream_error",
            RelayOutcome::ParseFailure => "parse_failure",
            RelayOutcome::InternalError => "internal_error",
        }
    }
}

/// The single reply a completion result maps to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub outcome: RelayOutcome,
    pub text: String,
}

impl From<Result<String, CompletionError>> for Reply {
    fn from(result: Result<String, CompletionError>) -> Self {
        match result {
            Ok(text) => Reply { outcome: RelayOutcome::Success, text },
            // Status and raw body go back verbatim so the user can take it up
            // with the provider.
            Err(CompletionError::Upstream { status, body }) => Reply {
                outcome: RelayOutcome::UpstreamError,
                text: format!("❌ Provider error ({status}):\n{body}"),
            },
            Err(CompletionError::Parse) => Reply {
                outcome: RelayOutcome::ParseFailure,
                text: PARSE_FAILURE_NOTICE.to_string(),
            },
            Err(CompletionError::Transport(reason)) => Reply {
                outcome: RelayOutcome::InternalError,
                text: format!("💥 Internal error: {reason}"),
            },
        }
    }
}

// ── Relay ────────────────────────────────────────────────────────────────────

/// Stateless relay between channels and the completion provider.
///
/// Cheap to clone; share one instance across all handler invocations.
#[derive(Debug, Clone)]
pub struct Relay {
    provider: OpenAiCompatibleProvider,
}

impl Relay {
    pub fn new(provider: OpenAiCompatibleProvider) -> Self {
        Self { provider }
    }

    /// Relay one message and send exactly one reply through `sink`.
    ///
    /// A failed typing indicator is ignored. A failed reply delivery is
    /// logged; the outcome still reflects the completion result.
    pub async fn handle<S: ReplySink>(&self, sink: &S, message: &InboundMessage) -> RelayOutcome {
        let conversation = message.conversation;

        if let Err(e) = sink.send_typing(conversation).await {
            debug!(%conversation, error = %e, "typing indicator failed, ignoring");
        }

        let reply = Reply::from(self.provider.complete(&message.text).await);
        let outcome = reply.outcome;

        info!(%conversation, outcome = outcome.as_str(), reply_len = reply.text.len(), "relayed message");

        if let Err(e) = sink.send_reply(message, reply.text).await {
            warn!(%conversation, error = %e, "failed to deliver reply");
        }

        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_is_verbatim() {
        let reply = Reply::from(Ok(" hi \n".to_string()));
        assert_eq!(reply.outcome, RelayOutcome::Success);
        assert_eq!(reply.text, " hi \n");
    }

    #[test]
    fn upstream_embeds_status_and_raw_body() {
        let reply = Reply::from(Err(CompletionError::Upstream {
            status: 429,
            body: "{\"error\":{\"message\":\"quota\"}}".into(),
        }));
        assert_eq!(reply.outcome, RelayOutcome::UpstreamError);
        assert!(reply.text.contains("429"));
        assert!(reply.text.ends_with("{\"error\":{\"message\":\"quota\"}}"));
    }

    #[test]
    fn parse_failure_is_fixed_notice() {
        let reply = Reply::from(Err(CompletionError::Parse));
        assert_eq!(reply.outcome, RelayOutcome::ParseFailure);
        assert_eq!(reply.text, PARSE_FAILURE_NOTICE);
    }

    #[test]
    fn transport_embeds_reason() {
        let reply = Reply::from(Err(CompletionError::Transport("connection refused".into())));
        assert_eq!(reply.outcome, RelayOutcome::InternalError);
        assert!(reply.text.contains("connection refused"));
    }

    #[test]
    fn outcome_labels() {
        assert_eq!(RelayOutcome::Success.as_str(), "success");
        assert_eq!(RelayOutcome::InternalError.as_str(), "internal_error");
    }
}
