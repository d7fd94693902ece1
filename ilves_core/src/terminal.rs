//! Terminal backend capability traits
//!
//! The orchestrator is written against these traits only, never against a
//! concrete backend. A backend must be able to report its provider kind,
//! answer "where are you now" (shell-integrated terminals can change directory
//! mid-session), and start a command while driving the callback surface the
//! orchestrator hands it.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::{fmt, path::PathBuf, sync::Arc};

/// Which flavor of terminal backend a handle represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    /// A host terminal with shell integration: command boundaries and
    /// directory changes are tracked precisely.
    Integrated,
    /// A plain spawned process; no shell integration.
    Process,
}

impl ProviderKind {
    /// Pure, total selection between the two backends.
    pub fn select(shell_integration_disabled: bool) -> Self {
        if shell_integration_disabled {
            ProviderKind::Process
        } else {
            ProviderKind::Integrated
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderKind::Integrated => write!(f, "integrated"),
            ProviderKind::Process => write!(f, "process"),
        }
    }
}

/// The terminal's final word on a command.
///
/// A process either exits (`exit_code`) or is terminated by a signal
/// (`signal_name`); both absent means the backend lost track of the command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandEnd {
    pub exit_code: Option<i32>,
    pub signal_name: Option<String>,
    /// Informational only; some backends can tell a core dump may exist.
    pub core_dump_possible: bool,
}

/// Callback surface implemented by the orchestrator, invoked by the backend.
///
/// Invocation order for a command that runs to completion: zero or more
/// `on_line` calls, `on_shell_execution_started` once the backend knows the
/// pid, then `on_completed` and finally `on_shell_execution_complete`.
pub trait CommandCallbacks: Send + Sync {
    /// One line of output, without its trailing newline, in arrival order.
    fn on_line(&self, line: &str);

    /// The backend resolved a process id for the command. Informational.
    fn on_shell_execution_started(&self, pid: Option<u32>);

    /// The command finished producing output. Backends that track command
    /// boundaries pass the authoritative full output; `None` means "what you
    /// saw line by line is all there is".
    fn on_completed(&self, final_output: Option<&str>);

    /// The canonical completion signal. Exactly one per command.
    fn on_shell_execution_complete(&self, end: CommandEnd);
}

/// Ownership token for a running command.
///
/// Exactly one of {implicit completion, `detach`, `abort`} happens per call.
#[async_trait]
pub trait ProcessHandle: Send + Sync {
    /// Release the command to keep running in the background.
    async fn detach(&self);

    /// Forcibly terminate the command.
    async fn abort(&self);
}

#[derive(Debug, thiserror::Error)]
pub enum TerminalError {
    #[error("failed to spawn terminal process: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("terminal backend rejected the command: {0}")]
    Rejected(String),
}

/// A terminal handle, owned by the registry and borrowed for one call.
#[async_trait]
pub trait Terminal: Send + Sync {
    fn kind(&self) -> ProviderKind;

    /// The directory the terminal is in *now*, which for shell-integrated
    /// backends may differ from the directory it was launched with.
    async fn current_working_directory(&self) -> PathBuf;

    /// Start `command` and drive `callbacks` until the command ends.
    async fn run_command(
        &self,
        command: &str,
        callbacks: Arc<dyn CommandCallbacks>,
    ) -> Result<Box<dyn ProcessHandle>, TerminalError>;

    /// Whether the handle can be pooled for reuse. Backends holding a live
    /// shell process override this; the default handle is always reusable.
    fn is_healthy(&self) -> bool {
        true
    }
}
