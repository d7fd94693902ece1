//! Execution configuration
//!
//! Call-level knobs come in on the `ExecutionRequest`; this module holds the
//! session-level defaults behind them, loadable from a TOML file by embedding
//! hosts and the `ilves_shell` binary.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// When the orchestrator asks the operator about a running command.
///
/// The interruption trigger is deliberately a policy, not a constant: hosts
/// that surface every line to the operator anyway want `Never`, interactive
/// agents want the prompt as soon as there is something to react to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AskPolicy {
    /// Never ask; only completion and timeout can end the race.
    Never,
    /// Ask once, when the first line of output arrives.
    #[default]
    AfterFirstLine,
}

/// Session-level execution defaults.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExecutionConfig {
    /// Applied when a request carries no timeout of its own. `None` means
    /// commands may run forever.
    pub default_timeout_ms: Option<u64>,
    /// Line budget handed to the output compressor.
    pub output_line_limit: usize,
    pub ask_policy: AskPolicy,
    /// Force the plain-process backend for every call.
    pub disable_shell_integration: bool,
    /// Cap on live terminals in the pooled registry.
    pub max_live_terminals: usize,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            default_timeout_ms: None,
            output_line_limit: 500,
            ask_policy: AskPolicy::default(),
            disable_shell_integration: false,
            max_live_terminals: 16,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

impl ExecutionConfig {
    /// Load configuration from a TOML file.
    pub async fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })?;
        toml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}
