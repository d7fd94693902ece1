//! Outcome normalization
//!
//! Every way a command can end (clean exit, non-zero exit, signal, timeout,
//! operator interruption) collapses into one `ExecutionOutcome` shape so the
//! reporting layer and the lifecycle event never branch on how the race was
//! won. Classification of a completion notification is a pure function of
//! that notification: buffered output plays no part in it.

use crate::terminal::CommandEnd;
use serde::{Deserialize, Serialize};

/// How the execution race resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutcomeKind {
    /// The terminal delivered its completion notification.
    Completed,
    /// The configured timeout fired first; the process was aborted.
    TimedOut,
    /// The operator interrupted with feedback; the process was detached.
    UserInterrupted,
}

/// Success flag plus the report fragment for a completed command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionStatus {
    pub succeeded: bool,
    pub detail: String,
}

/// Map a completion notification to its status line.
pub fn classify_completion(end: &CommandEnd) -> CompletionStatus {
    match (end.exit_code, end.signal_name.as_deref()) {
        (Some(0), _) => CompletionStatus {
            succeeded: true,
            detail: "Exit code: 0".to_string(),
        },
        (Some(code), _) => CompletionStatus {
            succeeded: false,
            detail: format!("Command execution was not successful.\nExit code: {code}"),
        },
        (None, Some(signal)) => CompletionStatus {
            succeeded: false,
            detail: format!("Process terminated by signal {signal}"),
        },
        (None, None) => CompletionStatus {
            succeeded: false,
            detail: "Command execution was not successful.\nExit status unknown.".to_string(),
        },
    }
}

/// Render a millisecond duration as seconds with one decimal place, the way
/// timeouts appear in reports ("0.1s", "30.0s").
pub fn format_timeout_seconds(ms: u64) -> String {
    format!("{:.1}", ms as f64 / 1000.0)
}

pub(crate) fn timeout_reason(timeout_ms: u64) -> String {
    format!("Command timed out after {}s", format_timeout_seconds(timeout_ms))
}

pub(crate) const INTERRUPT_REASON: &str = "Command is still running (user provided feedback)";

/// The normalized result of one call. Constructed exactly once when the race
/// resolves, consumed by the reporter, then discarded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionOutcome {
    pub kind: OutcomeKind,
    pub exit_code: Option<i32>,
    pub signal_name: Option<String>,
    /// Output accumulated up to the winning moment, whichever branch won.
    pub output: String,
    pub succeeded: bool,
    /// Set iff `succeeded` is false.
    pub failure_reason: Option<String>,
    /// Status line for the report; equals `failure_reason` on failure.
    pub detail: String,
}

impl ExecutionOutcome {
    pub fn completed(end: CommandEnd, output: String) -> Self {
        let status = classify_completion(&end);
        let failure_reason = (!status.succeeded).then(|| status.detail.clone());
        Self {
            kind: OutcomeKind::Completed,
            exit_code: end.exit_code,
            signal_name: end.signal_name,
            output,
            succeeded: status.succeeded,
            failure_reason,
            detail: status.detail,
        }
    }

    pub fn timed_out(timeout_ms: u64, output: String) -> Self {
        let reason = timeout_reason(timeout_ms);
        Self {
            kind: OutcomeKind::TimedOut,
            exit_code: None,
            signal_name: None,
            output,
            succeeded: false,
            failure_reason: Some(reason.clone()),
            detail: reason,
        }
    }

    pub fn interrupted(output: String) -> Self {
        Self {
            kind: OutcomeKind::UserInterrupted,
            exit_code: None,
            signal_name: None,
            output,
            succeeded: false,
            failure_reason: Some(INTERRUPT_REASON.to_string()),
            detail: INTERRUPT_REASON.to_string(),
        }
    }
}
