//! Command execution orchestrator
//!
//! `CommandExecutor` is the produced contract of this crate: resolve and
//! validate the working directory, borrow a terminal from the registry, start
//! the command, race completion against timeout and operator interruption,
//! normalize the ending, report it, and emit the one lifecycle event.
//!
//! Error handling is deliberately lopsided. A missing override directory is a
//! normal verdict, not an error: the agent is told the directory does not
//! exist and decides what to do next. Registry or spawn failures are errors:
//! nothing ran, there is nothing to report on.

use crate::config::{AskPolicy, ExecutionConfig};
use crate::events::{EventSink, LifecycleEvent};
use crate::operator::OperatorChannel;
use crate::outcome::OutcomeKind;
use crate::race::{ExecutionRace, callback_channel};
use crate::registry::{RegistryError, TerminalKey, TerminalRegistry};
use crate::report::{OutputCompressor, build_report};
use crate::terminal::{ProviderKind, TerminalError};
use crate::workdir::{FileSystem, resolve_working_directory};
use std::{path::PathBuf, sync::Arc, time::Instant};

/// The caller's standing context, shared across calls in one session.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    /// Correlates terminals and lifecycle events across calls.
    pub session_id: String,
    /// Default launch directory when a request carries no override.
    pub base_directory: PathBuf,
}

/// One command to run. Immutable for the call's lifetime.
#[derive(Debug, Clone)]
pub struct ExecutionRequest {
    pub command: String,
    /// Correlates this call with external messaging.
    pub execution_id: String,
    pub override_directory: Option<PathBuf>,
    pub disable_shell_integration: bool,
    /// Line budget for the output compressor.
    pub output_line_limit: usize,
    /// Milliseconds; `None` falls back to the configured default.
    pub timeout_ms: Option<u64>,
}

/// What the caller gets back. `rejected` is true only when the operator
/// interrupted the command with feedback; execution failures (non-zero exit,
/// signal, timeout) are reported with `rejected = false`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandVerdict {
    pub rejected: bool,
    pub report: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ExecuteError {
    #[error("command text must not be empty")]
    EmptyCommand,

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Terminal(#[from] TerminalError),
}

/// The orchestrator. Cheap to clone-by-`Arc` into whatever host loop owns it.
pub struct CommandExecutor {
    fs: Arc<dyn FileSystem>,
    registry: Arc<dyn TerminalRegistry>,
    compressor: Arc<dyn OutputCompressor>,
    sink: Arc<dyn EventSink>,
    operator: Option<Arc<dyn OperatorChannel>>,
    config: ExecutionConfig,
}

impl CommandExecutor {
    pub fn new(
        fs: Arc<dyn FileSystem>,
        registry: Arc<dyn TerminalRegistry>,
        compressor: Arc<dyn OutputCompressor>,
        sink: Arc<dyn EventSink>,
        config: ExecutionConfig,
    ) -> Self {
        Self {
            fs,
            registry,
            compressor,
            sink,
            operator: None,
            config,
        }
    }

    /// Attach the operator channel that can interrupt running commands.
    pub fn with_operator(mut self, operator: Arc<dyn OperatorChannel>) -> Self {
        self.operator = Some(operator);
        self
    }

    /// Run one command to one verdict. See the module docs for the flow.
    pub async fn execute_command(
        &self,
        context: &ExecutionContext,
        request: &ExecutionRequest,
    ) -> Result<CommandVerdict, ExecuteError> {
        if request.command.trim().is_empty() {
            return Err(ExecuteError::EmptyCommand);
        }

        tracing::info!(
            execution_id = %request.execution_id,
            session_id = %context.session_id,
            "executing command: {}",
            request.command
        );

        let resolved = match resolve_working_directory(
            self.fs.as_ref(),
            &context.base_directory,
            request.override_directory.as_deref(),
        )
        .await
        {
            Ok(resolved) => resolved,
            Err(missing) => {
                // Precondition failure: no terminal, no race, no event.
                return Ok(CommandVerdict {
                    rejected: false,
                    report: missing.to_string(),
                });
            }
        };

        let kind = ProviderKind::select(
            request.disable_shell_integration || self.config.disable_shell_integration,
        );
        let key = TerminalKey {
            directory: resolved.directory.clone(),
            has_override: resolved.has_override,
            session_id: context.session_id.clone(),
            kind,
        };
        let terminal = self.registry.acquire(key.clone()).await?;

        let started = Instant::now();
        let (callbacks, events) = callback_channel();
        let process = match terminal.run_command(&request.command, callbacks).await {
            Ok(process) => process,
            Err(e) => {
                self.registry.release(&key, terminal).await;
                return Err(e.into());
            }
        };

        let timeout_ms = request.timeout_ms.or(self.config.default_timeout_ms);
        let ask_policy = if self.operator.is_some() {
            self.config.ask_policy
        } else {
            AskPolicy::Never
        };
        let resolution = ExecutionRace {
            process,
            events,
            timeout_ms,
            operator: self.operator.as_deref(),
            ask_policy,
        }
        .run()
        .await;

        // Queried after the race on purpose: shell-integrated terminals may
        // have changed directory while the command ran.
        let cwd = terminal.current_working_directory().await;
        self.registry.release(&key, terminal).await;

        let compressed = self
            .compressor
            .compress(&resolution.outcome.output, request.output_line_limit);
        let report = build_report(
            &cwd,
            &resolution.outcome,
            &compressed,
            timeout_ms,
            resolution.feedback.as_deref(),
        );

        let event = LifecycleEvent::CommandExecuted {
            session_id: context.session_id.clone(),
            command: request.command.clone(),
            exit_code: resolution.outcome.exit_code,
            output: compressed,
            succeeded: resolution.outcome.succeeded,
            failure_reason: resolution.outcome.failure_reason.clone(),
            duration_ms: started.elapsed().as_millis() as u64,
        };
        if let Err(e) = self.sink.emit(event).await {
            tracing::warn!(
                execution_id = %request.execution_id,
                "failed to emit lifecycle event: {e}"
            );
        }

        let rejected = resolution.outcome.kind == OutcomeKind::UserInterrupted;
        tracing::info!(
            execution_id = %request.execution_id,
            rejected,
            succeeded = resolution.outcome.succeeded,
            "command resolved as {:?}, process {:?}",
            resolution.outcome.kind,
            resolution.disposition
        );
        Ok(CommandVerdict { rejected, report })
    }
}
