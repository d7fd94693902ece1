//! # Ilves CLI
//!
//! Thin command-line front end over `ilves_core`: runs one shell command
//! through the execution orchestrator and prints the same report an embedding
//! agent would receive. Since there is no host terminal to integrate with,
//! every call uses the plain spawned-process backend.
//!
//! ## Execution Flow
//!
//! 1. `Cli::parse()` reads the command and per-call overrides.
//! 2. Logging is initialized (file by default, stderr with `--log-to-stderr`).
//! 3. `ExecutionConfig` is loaded from `--config` when given.
//! 4. A pooled registry with the process backend, the real filesystem, the
//!    line-limit compressor and a channel event sink are wired into a
//!    `CommandExecutor`.
//! 5. The report is printed to stdout; the exit code reflects the outcome.

use anyhow::{Context, Result};
use clap::Parser;
use ilves_core::config::ExecutionConfig;
use ilves_core::events::{LifecycleEvent, channel_sink};
use ilves_core::executor::{CommandExecutor, ExecutionContext, ExecutionRequest};
use ilves_core::process::ProcessTerminalFactory;
use ilves_core::registry::{PooledTerminalRegistry, RegistryConfig};
use ilves_core::report::LineLimitCompressor;
use ilves_core::terminal::ProviderKind;
use ilves_core::utils::logging::init_logging;
use ilves_core::workdir::RealFileSystem;
use std::{path::PathBuf, sync::Arc};

/// Run one shell command the way an agent would, and print its report.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    /// The shell command to execute.
    command: String,

    /// Working directory override (absolute, or relative to the current
    /// directory).
    #[arg(long)]
    working_directory: Option<PathBuf>,

    /// Timeout in milliseconds; the command is killed when it fires.
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Line budget for the output included in the report.
    #[arg(long)]
    line_limit: Option<usize>,

    /// Path to a TOML execution config.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Session id used for terminal pooling and lifecycle events.
    #[arg(long, default_value = "ilves-cli")]
    session: String,

    /// Print the lifecycle event as JSON on stderr after the report.
    #[arg(long)]
    emit_event: bool,

    /// Enable debug logging.
    #[arg(short, long)]
    debug: bool,

    /// Log to stderr instead of the cache-directory log file.
    #[arg(long)]
    log_to_stderr: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.debug { "debug" } else { "info" };
    init_logging(log_level, !cli.log_to_stderr);
    tracing::debug!("cli arguments: {cli:?}");

    let mut config = match &cli.config {
        Some(path) => ExecutionConfig::load(path)
            .await
            .context("failed to load execution config")?,
        None => ExecutionConfig::default(),
    };
    // No embedding host, no integrated terminal.
    config.disable_shell_integration = true;

    let registry = Arc::new(
        PooledTerminalRegistry::new(RegistryConfig {
            max_live_terminals: config.max_live_terminals,
        })
        .with_factory(ProviderKind::Process, Arc::new(ProcessTerminalFactory)),
    );
    let (sink, mut events) = channel_sink();
    let executor = CommandExecutor::new(
        Arc::new(RealFileSystem),
        registry,
        Arc::new(LineLimitCompressor),
        sink,
        config.clone(),
    );

    let base_directory = std::env::current_dir().context("failed to resolve current directory")?;
    let context = ExecutionContext {
        session_id: cli.session.clone(),
        base_directory,
    };
    let request = ExecutionRequest {
        command: cli.command.clone(),
        execution_id: format!("{}-0", cli.session),
        override_directory: cli.working_directory.clone(),
        disable_shell_integration: true,
        output_line_limit: cli.line_limit.unwrap_or(config.output_line_limit),
        timeout_ms: cli.timeout_ms.or(config.default_timeout_ms),
    };

    let verdict = executor
        .execute_command(&context, &request)
        .await
        .context("command execution failed")?;

    println!("{}", verdict.report);

    // The missing-directory path emits no event; treat it as a failure.
    let mut succeeded = false;
    if let Ok(event) = events.try_recv() {
        let LifecycleEvent::CommandExecuted {
            succeeded: event_succeeded,
            ..
        } = &event;
        succeeded = *event_succeeded;
        if cli.emit_event {
            eprintln!("{}", serde_json::to_string_pretty(&event)?);
        }
    }

    if verdict.rejected || !succeeded {
        std::process::exit(1);
    }
    Ok(())
}
