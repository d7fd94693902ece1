//! Pooling behavior of `PooledTerminalRegistry`.

mod common;

use async_trait::async_trait;
use common::{ScriptedTerminal, exit_end};
use ilves_core::registry::{
    PooledTerminalRegistry, RegistryConfig, RegistryError, TerminalFactory, TerminalKey,
    TerminalRegistry,
};
use ilves_core::terminal::{ProviderKind, Terminal, TerminalError};
use ilves_core::utils::logging::init_test_logging;
use std::{
    path::{Path, PathBuf},
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
};

/// Factory that counts how many terminals it was asked to create.
struct CountingFactory {
    created: AtomicUsize,
    healthy: bool,
}

impl CountingFactory {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            created: AtomicUsize::new(0),
            healthy: true,
        })
    }

    fn unhealthy() -> Arc<Self> {
        Arc::new(Self {
            created: AtomicUsize::new(0),
            healthy: false,
        })
    }

    fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TerminalFactory for CountingFactory {
    async fn create(&self, _directory: &Path) -> Result<Box<dyn Terminal>, TerminalError> {
        self.created.fetch_add(1, Ordering::SeqCst);
        let terminal = ScriptedTerminal::new("/work", vec![exit_end(0)]);
        if self.healthy {
            Ok(Box::new(terminal))
        } else {
            Ok(Box::new(terminal.unhealthy()))
        }
    }
}

fn key(kind: ProviderKind, session_id: &str) -> TerminalKey {
    TerminalKey {
        directory: PathBuf::from("/work"),
        has_override: false,
        session_id: session_id.to_string(),
        kind,
    }
}

fn registry_with(factory: Arc<CountingFactory>, max: usize) -> PooledTerminalRegistry {
    PooledTerminalRegistry::new(RegistryConfig {
        max_live_terminals: max,
    })
    .with_factory(ProviderKind::Integrated, factory)
}

#[tokio::test]
async fn released_terminal_is_reused_for_the_same_key() {
    init_test_logging();
    let factory = CountingFactory::new();
    let registry = registry_with(factory.clone(), 4);
    let key = key(ProviderKind::Integrated, "sess-1");

    let terminal = registry.acquire(key.clone()).await.unwrap();
    registry.release(&key, terminal).await;
    assert_eq!(registry.idle_count().await, 1);

    let _again = registry.acquire(key.clone()).await.unwrap();
    assert_eq!(factory.created(), 1);
    assert_eq!(registry.idle_count().await, 0);
}

#[tokio::test]
async fn different_sessions_never_share_terminals() {
    init_test_logging();
    let factory = CountingFactory::new();
    let registry = registry_with(factory.clone(), 4);

    let first_key = key(ProviderKind::Integrated, "sess-1");
    let terminal = registry.acquire(first_key.clone()).await.unwrap();
    registry.release(&first_key, terminal).await;

    let _other = registry
        .acquire(key(ProviderKind::Integrated, "sess-2"))
        .await
        .unwrap();

    assert_eq!(factory.created(), 2);
    assert_eq!(registry.idle_count().await, 1);
}

#[tokio::test]
async fn acquire_beyond_capacity_is_refused() {
    init_test_logging();
    let factory = CountingFactory::new();
    let registry = registry_with(factory, 1);

    let _held = registry
        .acquire(key(ProviderKind::Integrated, "sess-1"))
        .await
        .unwrap();

    let refused = registry
        .acquire(key(ProviderKind::Integrated, "sess-2"))
        .await;
    assert!(matches!(refused, Err(RegistryError::PoolFull(1))));
}

#[tokio::test]
async fn unknown_provider_kind_is_refused() {
    init_test_logging();
    let registry = registry_with(CountingFactory::new(), 4);

    let refused = registry.acquire(key(ProviderKind::Process, "sess-1")).await;
    assert!(matches!(
        refused,
        Err(RegistryError::UnsupportedProvider(ProviderKind::Process))
    ));
}

#[tokio::test]
async fn unhealthy_terminals_are_culled_instead_of_pooled() {
    init_test_logging();
    let factory = CountingFactory::unhealthy();
    let registry = registry_with(factory.clone(), 1);
    let key = key(ProviderKind::Integrated, "sess-1");

    let terminal = registry.acquire(key.clone()).await.unwrap();
    registry.release(&key, terminal).await;
    assert_eq!(registry.idle_count().await, 0);

    // Culling freed the capacity slot, so the next acquire succeeds even
    // with a cap of one.
    let _fresh = registry.acquire(key.clone()).await.unwrap();
    assert_eq!(factory.created(), 2);
}

#[tokio::test]
async fn shutdown_drops_idle_terminals() {
    init_test_logging();
    let factory = CountingFactory::new();
    let registry = registry_with(factory.clone(), 4);
    let key = key(ProviderKind::Integrated, "sess-1");

    let terminal = registry.acquire(key.clone()).await.unwrap();
    registry.release(&key, terminal).await;
    registry.shutdown_all().await;
    assert_eq!(registry.idle_count().await, 0);

    let _fresh = registry.acquire(key).await.unwrap();
    assert_eq!(factory.created(), 2);
}
