//! Lifecycle event emission
//!
//! Every call that reaches the execution race emits exactly one
//! `commandExecuted` event carrying the normalized outcome, so callers can
//! record command history without re-deriving anything from the report text.
//! The sink is a trait so hosts can route events wherever they like; channel,
//! logging and no-op implementations are provided.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::{fmt, sync::Arc};
use tokio::sync::mpsc;

/// A normalized record of one finished (or relinquished) command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum LifecycleEvent {
    #[serde(rename = "commandExecuted", rename_all = "camelCase")]
    CommandExecuted {
        session_id: String,
        command: String,
        exit_code: Option<i32>,
        output: String,
        succeeded: bool,
        failure_reason: Option<String>,
        duration_ms: u64,
    },
}

impl fmt::Display for LifecycleEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LifecycleEvent::CommandExecuted {
                session_id,
                command,
                succeeded,
                duration_ms,
                failure_reason,
                ..
            } => {
                let status = if *succeeded { "OK" } else { "FAILED" };
                write!(f, "[{session_id}] {status} after {duration_ms}ms: {command}")?;
                if let Some(reason) = failure_reason {
                    write!(f, " ({reason})")?;
                }
                Ok(())
            }
        }
    }
}

/// Errors that can occur when delivering a lifecycle event
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("failed to deliver lifecycle event: {0}")]
    SendFailed(String),

    #[error("lifecycle event receiver disconnected")]
    Disconnected,
}

/// Destination for lifecycle events. Emission failures never fail the call
/// that produced the event; the executor logs and moves on.
#[async_trait]
pub trait EventSink: Send + Sync {
    async fn emit(&self, event: LifecycleEvent) -> Result<(), SinkError>;
}

/// Channel-backed sink for hosts that consume events asynchronously.
pub struct ChannelEventSink {
    sender: mpsc::UnboundedSender<LifecycleEvent>,
}

impl ChannelEventSink {
    pub fn new(sender: mpsc::UnboundedSender<LifecycleEvent>) -> Self {
        Self { sender }
    }
}

#[async_trait]
impl EventSink for ChannelEventSink {
    async fn emit(&self, event: LifecycleEvent) -> Result<(), SinkError> {
        self.sender.send(event).map_err(|_| SinkError::Disconnected)
    }
}

/// Sink that drops events; for callers that keep no history.
pub struct NoOpEventSink;

#[async_trait]
impl EventSink for NoOpEventSink {
    async fn emit(&self, _event: LifecycleEvent) -> Result<(), SinkError> {
        Ok(())
    }
}

/// Sink that writes each event to the log.
pub struct LoggingEventSink;

#[async_trait]
impl EventSink for LoggingEventSink {
    async fn emit(&self, event: LifecycleEvent) -> Result<(), SinkError> {
        tracing::info!("{event}");
        Ok(())
    }
}

/// Utility function to create a no-op sink
pub fn no_sink() -> Arc<dyn EventSink> {
    Arc::new(NoOpEventSink)
}

/// Utility function to create a logging sink
pub fn logging_sink() -> Arc<dyn EventSink> {
    Arc::new(LoggingEventSink)
}

/// Utility function to create a channel-backed sink with its receiver
pub fn channel_sink() -> (Arc<dyn EventSink>, mpsc::UnboundedReceiver<LifecycleEvent>) {
    let (sender, receiver) = mpsc::unbounded_channel();
    (Arc::new(ChannelEventSink::new(sender)), receiver)
}
