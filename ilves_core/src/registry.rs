//! Keyed terminal registry
//!
//! Terminal handles are expensive to create and cheap to reuse, so they live
//! in a pool keyed by execution context. A call borrows a handle for its
//! duration and returns it afterwards; the registry never hands the same
//! handle to two calls at once, which is what lets the orchestrator run
//! lock-free against it.
//!
//! Keys carry the session id and the override flag in addition to directory
//! and provider kind: a command run in an override directory must not land in
//! the session's long-lived default terminal, and sessions never share
//! terminals with each other.

use crate::terminal::{ProviderKind, Terminal, TerminalError};
use async_trait::async_trait;
use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::Arc,
};
use tokio::sync::Mutex;

/// Identity of a pooled terminal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TerminalKey {
    pub directory: PathBuf,
    pub has_override: bool,
    pub session_id: String,
    pub kind: ProviderKind,
}

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("no terminal factory registered for provider kind '{0}'")]
    UnsupportedProvider(ProviderKind),

    #[error("terminal registry is at capacity ({0} live terminals)")]
    PoolFull(usize),

    #[error(transparent)]
    Terminal(#[from] TerminalError),
}

/// Creates terminal handles for one provider kind.
#[async_trait]
pub trait TerminalFactory: Send + Sync {
    async fn create(&self, directory: &Path) -> Result<Box<dyn Terminal>, TerminalError>;
}

/// The acquire/release seam the orchestrator runs against.
#[async_trait]
pub trait TerminalRegistry: Send + Sync {
    /// Borrow a terminal for one call. Reuses an idle handle for the same key
    /// when one exists, otherwise creates a fresh one.
    async fn acquire(&self, key: TerminalKey) -> Result<Box<dyn Terminal>, RegistryError>;

    /// Return a borrowed terminal to the pool.
    async fn release(&self, key: &TerminalKey, terminal: Box<dyn Terminal>);
}

#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// Cap on terminals alive across all keys.
    pub max_live_terminals: usize,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            max_live_terminals: 16,
        }
    }
}

struct RegistryState {
    idle: HashMap<TerminalKey, Vec<Box<dyn Terminal>>>,
    live: usize,
}

/// Pool-backed registry with per-kind factories.
pub struct PooledTerminalRegistry {
    factories: HashMap<ProviderKind, Arc<dyn TerminalFactory>>,
    state: Mutex<RegistryState>,
    config: RegistryConfig,
}

impl PooledTerminalRegistry {
    pub fn new(config: RegistryConfig) -> Self {
        Self {
            factories: HashMap::new(),
            state: Mutex::new(RegistryState {
                idle: HashMap::new(),
                live: 0,
            }),
            config,
        }
    }

    /// Install the factory used for `kind`.
    pub fn with_factory(mut self, kind: ProviderKind, factory: Arc<dyn TerminalFactory>) -> Self {
        self.factories.insert(kind, factory);
        self
    }

    /// Number of idle handles currently pooled.
    pub async fn idle_count(&self) -> usize {
        let state = self.state.lock().await;
        state.idle.values().map(Vec::len).sum()
    }

    /// Drop every idle handle. Borrowed handles are the borrowers' problem;
    /// they are counted out of the pool when released against a shut-down
    /// registry state just like an unhealthy handle would be.
    pub async fn shutdown_all(&self) {
        let mut state = self.state.lock().await;
        let dropped: usize = state.idle.values().map(Vec::len).sum();
        state.idle.clear();
        state.live = state.live.saturating_sub(dropped);
        tracing::info!("terminal registry shut down, dropped {dropped} idle terminals");
    }
}

#[async_trait]
impl TerminalRegistry for PooledTerminalRegistry {
    async fn acquire(&self, key: TerminalKey) -> Result<Box<dyn Terminal>, RegistryError> {
        let factory = self
            .factories
            .get(&key.kind)
            .cloned()
            .ok_or(RegistryError::UnsupportedProvider(key.kind))?;

        {
            let mut state = self.state.lock().await;
            if let Some(bucket) = state.idle.get_mut(&key) {
                if let Some(terminal) = bucket.pop() {
                    tracing::debug!(
                        "reusing pooled {} terminal for {:?}",
                        key.kind,
                        key.directory
                    );
                    return Ok(terminal);
                }
            }
            if state.live >= self.config.max_live_terminals {
                return Err(RegistryError::PoolFull(state.live));
            }
            state.live += 1;
        }

        match factory.create(&key.directory).await {
            Ok(terminal) => {
                tracing::debug!("created {} terminal for {:?}", key.kind, key.directory);
                Ok(terminal)
            }
            Err(e) => {
                let mut state = self.state.lock().await;
                state.live = state.live.saturating_sub(1);
                Err(e.into())
            }
        }
    }

    async fn release(&self, key: &TerminalKey, terminal: Box<dyn Terminal>) {
        let mut state = self.state.lock().await;
        if terminal.is_healthy() {
            state.idle.entry(key.clone()).or_default().push(terminal);
        } else {
            tracing::debug!("culling unhealthy terminal for {:?}", key.directory);
            state.live = state.live.saturating_sub(1);
        }
    }
}
