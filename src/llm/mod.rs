//! Upstream chat-completion access.
//!
//! - **endpoint** — base URL → `/v1/chat/completions` normalisation.
//! - **openai_compatible** — the HTTP client and wire types.
//!
//! A completion round-trip yields `Result<String, CompletionError>`; each
//! failure mode is its own variant so callers can map them independently.

pub mod endpoint;
pub mod openai_compatible;

use thiserror::Error;

pub use openai_compatible::OpenAiCompatibleProvider;

#[derive(Debug, Error)]
pub enum CompletionError {
    /// No usable HTTP response: connect failure, invalid URL, timeout, or a
    /// body that could not be read.
    #[error("{0}")]
    Transport(String),

    /// The upstream answered with a non-success status. `body` is verbatim.
    #[error("upstream returned HTTP {status}: {body}")]
    Upstream { status: u16, body: String },

    /// Success status, but no string at `choices[0].message.content`.
    #[error("response did not contain choices[0].message.content")]
    Parse,
}
