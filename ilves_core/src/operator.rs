//! Operator messaging channel
//!
//! The human behind the agent can watch a running command and interrupt it
//! with feedback. This module only specifies the seam: `say` streams output
//! to the operator fire-and-forget, `ask` blocks until the operator reacts.
//! A feedback reply to an `ask` is what turns into a user interruption in the
//! execution race.

use async_trait::async_trait;

/// What an `ask` is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AskKind {
    /// A running command produced output; does the operator want to step in?
    CommandOutput,
}

/// What a `say` is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SayKind {
    CommandOutput,
}

/// The operator's reaction to an `ask`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperatorReply {
    /// Seen, no objection; the command keeps running under the race.
    Acknowledged,
    /// The operator typed feedback: the call is handed back to them and the
    /// command is left running in the background.
    Feedback { text: String, images: Vec<String> },
}

#[derive(Debug, thiserror::Error)]
pub enum OperatorError {
    #[error("operator channel disconnected")]
    Disconnected,
}

#[async_trait]
pub trait OperatorChannel: Send + Sync {
    /// Ask the operator about `payload` and wait for a reply.
    async fn ask(&self, kind: AskKind, payload: &str) -> Result<OperatorReply, OperatorError>;

    /// Relay `text` to the operator without waiting.
    async fn say(&self, kind: SayKind, text: &str);
}
