//! The execution race
//!
//! Drives one started command to exactly one terminal outcome. Three sources
//! compete: the terminal's completion notification, an optional timeout
//! timer, and an optional pending operator ask. The first to fire wins; the
//! timer is dropped and a pending ask is abandoned when they lose. Output
//! lines are appended to one buffer in arrival order and survive into the
//! outcome no matter which source wins.
//!
//! Process disposition is decided exactly once here: completion leaves the
//! process alone, timeout aborts it, operator interruption detaches it (the
//! command may still be doing useful work, so it keeps running).

use crate::config::AskPolicy;
use crate::operator::{AskKind, OperatorChannel, OperatorError, OperatorReply, SayKind};
use crate::outcome::ExecutionOutcome;
use crate::terminal::{CommandCallbacks, CommandEnd, ProcessHandle};
use futures::future::BoxFuture;
use std::sync::Arc;
use tokio::{
    sync::mpsc,
    time::{Duration, Instant},
};

/// What the terminal's callback surface feeds into the race.
#[derive(Debug)]
pub(crate) enum TerminalEvent {
    Line(String),
    ShellExecutionStarted(Option<u32>),
    Completed(Option<String>),
    ShellExecutionComplete(CommandEnd),
}

/// Callback surface that forwards every invocation into a channel. Sends into
/// a closed channel are deliberately ignored: after the race resolves, late
/// callbacks from an aborted or detached command have nowhere to go.
struct ChannelCallbacks {
    tx: mpsc::UnboundedSender<TerminalEvent>,
}

impl CommandCallbacks for ChannelCallbacks {
    fn on_line(&self, line: &str) {
        let _ = self.tx.send(TerminalEvent::Line(line.to_string()));
    }

    fn on_shell_execution_started(&self, pid: Option<u32>) {
        let _ = self.tx.send(TerminalEvent::ShellExecutionStarted(pid));
    }

    fn on_completed(&self, final_output: Option<&str>) {
        let _ = self
            .tx
            .send(TerminalEvent::Completed(final_output.map(str::to_string)));
    }

    fn on_shell_execution_complete(&self, end: CommandEnd) {
        let _ = self.tx.send(TerminalEvent::ShellExecutionComplete(end));
    }
}

pub(crate) fn callback_channel() -> (
    Arc<dyn CommandCallbacks>,
    mpsc::UnboundedReceiver<TerminalEvent>,
) {
    let (tx, rx) = mpsc::unbounded_channel();
    (Arc::new(ChannelCallbacks { tx }), rx)
}

/// What happened to the process handle. Exactly one per call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ProcessDisposition {
    Completed,
    Aborted,
    Continued,
}

pub(crate) struct RaceResolution {
    pub outcome: ExecutionOutcome,
    pub disposition: ProcessDisposition,
    /// Operator feedback text, present only for interrupted calls.
    pub feedback: Option<String>,
}

pub(crate) struct ExecutionRace<'a> {
    pub process: Box<dyn ProcessHandle>,
    pub events: mpsc::UnboundedReceiver<TerminalEvent>,
    pub timeout_ms: Option<u64>,
    pub operator: Option<&'a dyn OperatorChannel>,
    pub ask_policy: AskPolicy,
}

impl<'a> ExecutionRace<'a> {
    pub(crate) async fn run(self) -> RaceResolution {
        let ExecutionRace {
            process,
            mut events,
            timeout_ms,
            operator,
            ask_policy,
        } = self;

        let deadline = timeout_ms.map(|ms| Instant::now() + Duration::from_millis(ms));
        let mut buffer = String::new();
        let mut ask_spent = false;
        let mut pending_ask: Option<BoxFuture<'a, Result<OperatorReply, OperatorError>>> = None;

        loop {
            tokio::select! {
                event = events.recv() => match event {
                    Some(TerminalEvent::Line(line)) => {
                        if !buffer.is_empty() {
                            buffer.push('\n');
                        }
                        buffer.push_str(&line);

                        if let Some(op) = operator {
                            op.say(SayKind::CommandOutput, &line).await;
                            if !ask_spent && ask_policy == AskPolicy::AfterFirstLine {
                                ask_spent = true;
                                let payload = line.clone();
                                pending_ask = Some(Box::pin(async move {
                                    op.ask(AskKind::CommandOutput, &payload).await
                                }));
                            }
                        }
                    }
                    Some(TerminalEvent::ShellExecutionStarted(pid)) => {
                        tracing::debug!(?pid, "shell execution started");
                    }
                    Some(TerminalEvent::Completed(final_output)) => {
                        // A backend that tracks command boundaries hands over the
                        // authoritative transcript; prefer it over line assembly.
                        if let Some(text) = final_output {
                            if !text.trim().is_empty() {
                                buffer = text;
                            }
                        }
                    }
                    Some(TerminalEvent::ShellExecutionComplete(end)) => {
                        return RaceResolution {
                            outcome: ExecutionOutcome::completed(end, buffer),
                            disposition: ProcessDisposition::Completed,
                            feedback: None,
                        };
                    }
                    None => {
                        tracing::warn!(
                            "terminal dropped its callback surface without reporting completion"
                        );
                        return RaceResolution {
                            outcome: ExecutionOutcome::completed(CommandEnd::default(), buffer),
                            disposition: ProcessDisposition::Completed,
                            feedback: None,
                        };
                    }
                },
                _ = sleep_until_deadline(deadline) => {
                    process.abort().await;
                    return RaceResolution {
                        outcome: ExecutionOutcome::timed_out(timeout_ms.unwrap_or(0), buffer),
                        disposition: ProcessDisposition::Aborted,
                        feedback: None,
                    };
                }
                reply = await_ask(&mut pending_ask) => {
                    pending_ask = None;
                    match reply {
                        Ok(OperatorReply::Feedback { text, .. }) => {
                            process.detach().await;
                            return RaceResolution {
                                outcome: ExecutionOutcome::interrupted(buffer),
                                disposition: ProcessDisposition::Continued,
                                feedback: Some(text),
                            };
                        }
                        Ok(OperatorReply::Acknowledged) => {
                            tracing::debug!("operator acknowledged the running command");
                        }
                        Err(e) => {
                            tracing::warn!("operator ask failed, continuing the race: {e}");
                        }
                    }
                }
            }
        }
    }
}

/// Without a deadline this source never fires.
async fn sleep_until_deadline(deadline: Option<Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(at).await,
        None => std::future::pending().await,
    }
}

/// Poll the pending ask in place so a lost select round keeps its progress.
/// An empty slot never fires.
async fn await_ask<'f>(
    slot: &mut Option<BoxFuture<'f, Result<OperatorReply, OperatorError>>>,
) -> Result<OperatorReply, OperatorError> {
    match slot.as_mut() {
        Some(ask) => ask.await,
        None => std::future::pending().await,
    }
}
