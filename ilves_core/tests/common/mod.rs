//! Shared test doubles for the integration suites.
//!
//! Everything here is a scripted or recording stand-in for one of the
//! executor's collaborators, so the orchestration logic can be exercised as a
//! unit without real terminals, filesystems or operators.
#![allow(dead_code)]

use async_trait::async_trait;
use ilves_core::events::{EventSink, LifecycleEvent, SinkError};
use ilves_core::operator::{AskKind, OperatorChannel, OperatorError, OperatorReply, SayKind};
use ilves_core::registry::{RegistryError, TerminalKey, TerminalRegistry};
use ilves_core::terminal::{
    CommandCallbacks, CommandEnd, ProcessHandle, ProviderKind, Terminal, TerminalError,
};
use ilves_core::workdir::FileSystem;
use std::{
    path::{Path, PathBuf},
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
    time::Duration,
};

// ---------------------------------------------------------------------------
// Filesystem
// ---------------------------------------------------------------------------

/// Answers every existence check with a fixed flag and records the paths.
pub struct StubFileSystem {
    exists: bool,
    pub checked: Mutex<Vec<PathBuf>>,
}

impl StubFileSystem {
    pub fn new(exists: bool) -> Arc<Self> {
        Arc::new(Self {
            exists,
            checked: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl FileSystem for StubFileSystem {
    async fn exists(&self, path: &Path) -> bool {
        self.checked.lock().unwrap().push(path.to_path_buf());
        self.exists
    }
}

// ---------------------------------------------------------------------------
// Terminal and process handle
// ---------------------------------------------------------------------------

/// Records which disposition the executor chose for the process.
#[derive(Default)]
pub struct RecordingProcess {
    pub detached: AtomicBool,
    pub aborted: AtomicBool,
}

impl RecordingProcess {
    pub fn was_detached(&self) -> bool {
        self.detached.load(Ordering::SeqCst)
    }

    pub fn was_aborted(&self) -> bool {
        self.aborted.load(Ordering::SeqCst)
    }
}

struct RecordingHandle(Arc<RecordingProcess>);

#[async_trait]
impl ProcessHandle for RecordingHandle {
    async fn detach(&self) {
        self.0.detached.store(true, Ordering::SeqCst);
    }

    async fn abort(&self) {
        self.0.aborted.store(true, Ordering::SeqCst);
    }
}

/// One step of a scripted terminal session.
#[derive(Debug, Clone)]
pub enum ScriptStep {
    Line(String),
    Started(u32),
    Completed(Option<String>),
    End(CommandEnd),
    Delay(u64),
    /// Keep the callback surface alive forever without completing, so the
    /// timeout and interruption branches can win the race.
    Never,
}

pub fn line(text: &str) -> ScriptStep {
    ScriptStep::Line(text.to_string())
}

pub fn exit_end(code: i32) -> ScriptStep {
    ScriptStep::End(CommandEnd {
        exit_code: Some(code),
        signal_name: None,
        core_dump_possible: false,
    })
}

pub fn signal_end(signal: &str) -> ScriptStep {
    ScriptStep::End(CommandEnd {
        exit_code: None,
        signal_name: Some(signal.to_string()),
        core_dump_possible: false,
    })
}

/// Terminal that replays a fixed script into the callback surface.
pub struct ScriptedTerminal {
    kind: ProviderKind,
    script: Vec<ScriptStep>,
    report_dir: PathBuf,
    pub process: Arc<RecordingProcess>,
    pub commands: Mutex<Vec<String>>,
    healthy: bool,
}

impl ScriptedTerminal {
    pub fn new(report_dir: &str, script: Vec<ScriptStep>) -> Self {
        Self {
            kind: ProviderKind::Integrated,
            script,
            report_dir: PathBuf::from(report_dir),
            process: Arc::new(RecordingProcess::default()),
            commands: Mutex::new(Vec::new()),
            healthy: true,
        }
    }

    pub fn unhealthy(mut self) -> Self {
        self.healthy = false;
        self
    }
}

#[async_trait]
impl Terminal for ScriptedTerminal {
    fn kind(&self) -> ProviderKind {
        self.kind
    }

    async fn current_working_directory(&self) -> PathBuf {
        self.report_dir.clone()
    }

    async fn run_command(
        &self,
        command: &str,
        callbacks: Arc<dyn CommandCallbacks>,
    ) -> Result<Box<dyn ProcessHandle>, TerminalError> {
        self.commands.lock().unwrap().push(command.to_string());
        let script = self.script.clone();
        tokio::spawn(async move {
            for step in script {
                match step {
                    ScriptStep::Line(text) => callbacks.on_line(&text),
                    ScriptStep::Started(pid) => callbacks.on_shell_execution_started(Some(pid)),
                    ScriptStep::Completed(text) => callbacks.on_completed(text.as_deref()),
                    ScriptStep::End(end) => callbacks.on_shell_execution_complete(end),
                    ScriptStep::Delay(ms) => tokio::time::sleep(Duration::from_millis(ms)).await,
                    ScriptStep::Never => std::future::pending::<()>().await,
                }
            }
        });
        Ok(Box::new(RecordingHandle(self.process.clone())))
    }

    fn is_healthy(&self) -> bool {
        self.healthy
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Hands out one prepared terminal and records every acquire/release.
pub struct SingleTerminalRegistry {
    terminal: tokio::sync::Mutex<Option<Box<dyn Terminal>>>,
    pub acquires: Mutex<Vec<TerminalKey>>,
    pub releases: AtomicUsize,
}

impl SingleTerminalRegistry {
    pub fn new(terminal: Box<dyn Terminal>) -> Arc<Self> {
        Arc::new(Self {
            terminal: tokio::sync::Mutex::new(Some(terminal)),
            acquires: Mutex::new(Vec::new()),
            releases: AtomicUsize::new(0),
        })
    }

    pub fn acquire_count(&self) -> usize {
        self.acquires.lock().unwrap().len()
    }

    pub fn release_count(&self) -> usize {
        self.releases.load(Ordering::SeqCst)
    }

    pub fn acquired_keys(&self) -> Vec<TerminalKey> {
        self.acquires.lock().unwrap().clone()
    }
}

#[async_trait]
impl TerminalRegistry for SingleTerminalRegistry {
    async fn acquire(&self, key: TerminalKey) -> Result<Box<dyn Terminal>, RegistryError> {
        self.acquires.lock().unwrap().push(key);
        self.terminal
            .lock()
            .await
            .take()
            .ok_or(RegistryError::PoolFull(1))
    }

    async fn release(&self, _key: &TerminalKey, terminal: Box<dyn Terminal>) {
        self.releases.fetch_add(1, Ordering::SeqCst);
        *self.terminal.lock().await = Some(terminal);
    }
}

// ---------------------------------------------------------------------------
// Lifecycle sink
// ---------------------------------------------------------------------------

/// Collects every emitted lifecycle event.
#[derive(Default)]
pub struct RecordingSink {
    pub events: Mutex<Vec<LifecycleEvent>>,
}

impl RecordingSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn emitted(&self) -> Vec<LifecycleEvent> {
        self.events.lock().unwrap().clone()
    }
}

#[async_trait]
impl EventSink for RecordingSink {
    async fn emit(&self, event: LifecycleEvent) -> Result<(), SinkError> {
        self.events.lock().unwrap().push(event);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Operator
// ---------------------------------------------------------------------------

/// Replies to every ask with a fixed reply after a fixed delay, recording
/// what it was asked and told along the way.
pub struct ScriptedOperator {
    reply: OperatorReply,
    delay_ms: u64,
    pub asks: Mutex<Vec<String>>,
    pub says: Mutex<Vec<String>>,
}

impl ScriptedOperator {
    pub fn feedback(text: &str, delay_ms: u64) -> Arc<Self> {
        Arc::new(Self {
            reply: OperatorReply::Feedback {
                text: text.to_string(),
                images: Vec::new(),
            },
            delay_ms,
            asks: Mutex::new(Vec::new()),
            says: Mutex::new(Vec::new()),
        })
    }

    pub fn acknowledging(delay_ms: u64) -> Arc<Self> {
        Arc::new(Self {
            reply: OperatorReply::Acknowledged,
            delay_ms,
            asks: Mutex::new(Vec::new()),
            says: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl OperatorChannel for ScriptedOperator {
    async fn ask(&self, _kind: AskKind, payload: &str) -> Result<OperatorReply, OperatorError> {
        self.asks.lock().unwrap().push(payload.to_string());
        tokio::time::sleep(Duration::from_millis(self.delay_ms)).await;
        Ok(self.reply.clone())
    }

    async fn say(&self, _kind: SayKind, text: &str) {
        self.says.lock().unwrap().push(text.to_string());
    }
}
