//! Report assembly and output compression
//!
//! Builds the caller-facing report string for a resolved call. The working
//! directory is always the terminal's directory *at report time*: a
//! shell-integrated terminal may have changed directory while the command ran,
//! and the agent should read where things actually ended up.

use crate::outcome::{ExecutionOutcome, OutcomeKind, format_timeout_seconds};
use std::path::Path;

/// Bounds command output before it reaches the report and the lifecycle
/// event. `line_limit` is the total line budget; zero disables truncation.
pub trait OutputCompressor: Send + Sync {
    fn compress(&self, output: &str, line_limit: usize) -> String;
}

/// Keeps the head and tail of over-budget output with an elision marker in
/// between. The head gets a fifth of the budget: the end of a command's
/// output is usually where the errors are.
pub struct LineLimitCompressor;

impl OutputCompressor for LineLimitCompressor {
    fn compress(&self, output: &str, line_limit: usize) -> String {
        let trimmed = output.trim_end();
        if trimmed.trim().is_empty() {
            return String::new();
        }

        let lines: Vec<&str> = trimmed.lines().collect();
        if line_limit == 0 || lines.len() <= line_limit {
            return trimmed.to_string();
        }

        let head = (line_limit / 5).max(1);
        let tail = line_limit.saturating_sub(head).max(1);
        if lines.len() <= head + tail {
            return trimmed.to_string();
        }

        let omitted = lines.len() - head - tail;
        let mut compressed = lines[..head].join("\n");
        compressed.push_str(&format!("\n[... {omitted} lines omitted ...]\n"));
        compressed.push_str(&lines[lines.len() - tail..].join("\n"));
        compressed
    }
}

/// Assemble the report for one resolved call.
///
/// `compressed_output` has already been through the compressor; `feedback` is
/// the operator's interruption text, present only for interrupted calls.
pub fn build_report(
    cwd: &Path,
    outcome: &ExecutionOutcome,
    compressed_output: &str,
    timeout_ms: Option<u64>,
    feedback: Option<&str>,
) -> String {
    let mut report = match outcome.kind {
        OutcomeKind::UserInterrupted => format!(
            "Command is still running within working directory '{}'.",
            cwd.display()
        ),
        _ => format!(
            "Command executed within working directory '{}'.",
            cwd.display()
        ),
    };

    match outcome.kind {
        OutcomeKind::Completed => {
            report.push('\n');
            report.push_str(&outcome.detail);
        }
        OutcomeKind::TimedOut => {
            report.push_str(&format!(
                "\nThe command was terminated after exceeding the configured timeout of {}s.",
                format_timeout_seconds(timeout_ms.unwrap_or(0))
            ));
        }
        OutcomeKind::UserInterrupted => {}
    }

    if compressed_output.is_empty() {
        report.push_str("\nThe command produced no output.");
    } else {
        let label = match outcome.kind {
            OutcomeKind::Completed => "Output:",
            OutcomeKind::TimedOut => "Partial output before termination:",
            OutcomeKind::UserInterrupted => "Output so far:",
        };
        report.push_str(&format!("\n{label}\n{compressed_output}"));
    }

    if outcome.kind == OutcomeKind::UserInterrupted {
        if let Some(feedback) = feedback {
            report.push_str(&format!(
                "\nThe user provided the following feedback:\n{feedback}"
            ));
        }
    }

    report
}
