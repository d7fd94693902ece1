//! Plain spawned-process terminal backend
//!
//! The fallback backend for hosts without a shell-integration-capable
//! terminal. Each command is `sh -c <command>` with piped output; stdout and
//! stderr are streamed line by line into the callback surface, and the exit
//! status is mapped to the same completion shape integrated backends report.
//!
//! This backend cannot observe `cd` inside the command, so its current
//! working directory is always the directory it was created for.

use crate::registry::TerminalFactory;
use crate::terminal::{
    CommandCallbacks, CommandEnd, ProcessHandle, ProviderKind, Terminal, TerminalError,
};
use async_trait::async_trait;
use std::{
    path::{Path, PathBuf},
    process::Stdio,
    sync::Arc,
};
use tokio::{
    io::{AsyncBufReadExt, AsyncRead, BufReader},
    process::Command,
};
use tokio_util::sync::CancellationToken;

/// Terminal that spawns one `sh` per command in a fixed directory.
pub struct ProcessTerminal {
    directory: PathBuf,
}

impl ProcessTerminal {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }
}

#[async_trait]
impl Terminal for ProcessTerminal {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Process
    }

    async fn current_working_directory(&self) -> PathBuf {
        self.directory.clone()
    }

    async fn run_command(
        &self,
        command: &str,
        callbacks: Arc<dyn CommandCallbacks>,
    ) -> Result<Box<dyn ProcessHandle>, TerminalError> {
        tracing::debug!("spawning `sh -c` in {:?}: {command}", self.directory);

        let mut child = Command::new("sh")
            .arg("-c")
            .arg(command)
            .current_dir(&self.directory)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        callbacks.on_shell_execution_started(child.id());

        let stdout = child.stdout.take().ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::BrokenPipe, "failed to get stdout")
        })?;
        let stderr = child.stderr.take().ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::BrokenPipe, "failed to get stderr")
        })?;

        let stdout_task = tokio::spawn(stream_lines(stdout, callbacks.clone()));
        let stderr_task = tokio::spawn(stream_lines(stderr, callbacks.clone()));

        let abort = CancellationToken::new();
        let abort_for_task = abort.clone();

        tokio::spawn(async move {
            let status = tokio::select! {
                status = child.wait() => status,
                _ = abort_for_task.cancelled() => {
                    tracing::debug!("abort requested, killing command process");
                    if let Err(e) = child.start_kill() {
                        tracing::warn!("failed to kill command process: {e}");
                    }
                    child.wait().await
                }
            };

            // Drain both streams before reporting completion so every line
            // event precedes the completion notification.
            let _ = stdout_task.await;
            let _ = stderr_task.await;

            match status {
                Ok(status) => {
                    // Lines were already streamed in arrival order; there is
                    // no more authoritative transcript to hand over.
                    callbacks.on_completed(None);
                    callbacks.on_shell_execution_complete(end_from_status(status));
                }
                Err(e) => {
                    tracing::warn!("failed to await command process: {e}");
                    callbacks.on_completed(None);
                    callbacks.on_shell_execution_complete(CommandEnd::default());
                }
            }
        });

        Ok(Box::new(SpawnedProcess { abort }))
    }
}

/// Process handle for a spawned command. Detach is a no-op by construction:
/// the wait task runs independently and keeps the command alive.
struct SpawnedProcess {
    abort: CancellationToken,
}

#[async_trait]
impl ProcessHandle for SpawnedProcess {
    async fn detach(&self) {
        tracing::debug!("command process detached, left running");
    }

    async fn abort(&self) {
        self.abort.cancel();
    }
}

async fn stream_lines<R>(reader: R, callbacks: Arc<dyn CommandCallbacks>)
where
    R: AsyncRead + Unpin + Send,
{
    let mut lines = BufReader::new(reader).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => callbacks.on_line(&line),
            Ok(None) => break,
            Err(e) => {
                tracing::warn!("error reading command output: {e}");
                break;
            }
        }
    }
}

fn end_from_status(status: std::process::ExitStatus) -> CommandEnd {
    if let Some(code) = status.code() {
        return CommandEnd {
            exit_code: Some(code),
            signal_name: None,
            core_dump_possible: false,
        };
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return CommandEnd {
                exit_code: None,
                signal_name: Some(signal_name(signal)),
                core_dump_possible: status.core_dumped(),
            };
        }
    }

    CommandEnd::default()
}

#[cfg(unix)]
fn signal_name(signal: i32) -> String {
    match signal {
        1 => "SIGHUP".to_string(),
        2 => "SIGINT".to_string(),
        3 => "SIGQUIT".to_string(),
        4 => "SIGILL".to_string(),
        6 => "SIGABRT".to_string(),
        8 => "SIGFPE".to_string(),
        9 => "SIGKILL".to_string(),
        11 => "SIGSEGV".to_string(),
        13 => "SIGPIPE".to_string(),
        14 => "SIGALRM".to_string(),
        15 => "SIGTERM".to_string(),
        other => format!("signal {other}"),
    }
}

/// Factory handing out [`ProcessTerminal`] handles.
pub struct ProcessTerminalFactory;

#[async_trait]
impl TerminalFactory for ProcessTerminalFactory {
    async fn create(&self, directory: &Path) -> Result<Box<dyn Terminal>, TerminalError> {
        Ok(Box::new(ProcessTerminal::new(directory)))
    }
}
