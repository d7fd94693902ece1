//! Logging initialization
//!
//! One global `tracing` subscriber for the whole process, initialized at most
//! once. By default logs go to a daily rolling file in the user cache
//! directory so an embedding agent's stdio stays clean; `log_to_file = false`
//! sends them to stderr with ANSI colors for interactive debugging. If the
//! cache directory cannot be written, the file path falls back to stderr.

use directories::ProjectDirs;
use std::{io::stderr, path::Path, sync::Once};
use tracing_subscriber::{EnvFilter, fmt::layer, prelude::*};

static INIT: Once = Once::new();

/// Initialize verbose stderr logging for tests.
pub fn init_test_logging() {
    init_logging("trace", false);
}

/// Initializes the logging system.
///
/// Verbosity comes from `RUST_LOG` when set, otherwise from `log_level` with
/// this crate raised to `debug`.
pub fn init_logging(log_level: &str, log_to_file: bool) {
    INIT.call_once(|| {
        let env_filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(format!("{log_level},ilves_core=debug")));

        if log_to_file
            && let Some(proj_dirs) = ProjectDirs::from("fi", "Ilves", "ilves")
        {
            let log_dir = proj_dirs.cache_dir();

            // tracing-appender panics on unwritable directories, so probe
            // write access first instead of catching the panic.
            if can_write_to(log_dir) {
                let file_appender = tracing_appender::rolling::daily(log_dir, "ilves.log");
                let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(layer().with_writer(non_blocking).with_ansi(false))
                    .init();

                // Leak the guard so logs keep flushing until process exit.
                Box::leak(Box::new(guard));
                return;
            }
        }

        tracing_subscriber::registry()
            .with(env_filter)
            .with(layer().with_writer(stderr).with_ansi(true))
            .init();
    });
}

fn can_write_to(dir: &Path) -> bool {
    if std::fs::create_dir_all(dir).is_err() {
        return false;
    }

    let probe = dir.join(".ilves_log_probe");
    match std::fs::write(&probe, "probe") {
        Ok(()) => {
            let _ = std::fs::remove_file(&probe);
            true
        }
        Err(_) => false,
    }
}
