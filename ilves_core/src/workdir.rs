//! Working-directory resolution
//!
//! Resolves the directory a command will launch in from the caller's base
//! directory and an optional per-call override, and validates that an
//! override actually exists before any terminal is acquired. A missing
//! override is a terminal, non-retried outcome for the call.

use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Filesystem existence collaborator. Consulted once per call, and only when
/// an override directory was supplied.
#[async_trait]
pub trait FileSystem: Send + Sync {
    async fn exists(&self, path: &Path) -> bool;
}

/// The real filesystem.
pub struct RealFileSystem;

#[async_trait]
impl FileSystem for RealFileSystem {
    async fn exists(&self, path: &Path) -> bool {
        tokio::fs::try_exists(path).await.unwrap_or(false)
    }
}

/// The directory context a call actually launches in. Created once, before
/// terminal acquisition; never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedContext {
    /// Absolute directory used to launch the command.
    pub directory: PathBuf,
    /// The caller's base directory.
    pub base_directory: PathBuf,
    /// True iff an override directory was supplied.
    pub has_override: bool,
}

/// The override directory did not pass the existence check.
///
/// The message is the caller-facing report for this outcome, so it names the
/// override as the caller wrote it, not the resolved absolute path.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("Working directory '{path}' does not exist.")]
pub struct MissingWorkingDirectory {
    pub path: String,
}

/// Resolve the launch directory for one call.
///
/// Relative overrides resolve against the base directory; absolute overrides
/// are used as-is. Without an override the base directory is trusted and no
/// existence check is performed.
pub async fn resolve_working_directory(
    fs: &dyn FileSystem,
    base: &Path,
    override_dir: Option<&Path>,
) -> Result<ResolvedContext, MissingWorkingDirectory> {
    let Some(requested) = override_dir else {
        return Ok(ResolvedContext {
            directory: base.to_path_buf(),
            base_directory: base.to_path_buf(),
            has_override: false,
        });
    };

    let resolved = if requested.is_absolute() {
        requested.to_path_buf()
    } else {
        base.join(requested)
    };

    if !fs.exists(&resolved).await {
        tracing::info!(
            "rejecting command launch, override directory {:?} does not exist",
            resolved
        );
        return Err(MissingWorkingDirectory {
            path: requested.display().to_string(),
        });
    }

    Ok(ResolvedContext {
        directory: resolved,
        base_directory: base.to_path_buf(),
        has_override: true,
    })
}
