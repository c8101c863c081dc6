use std::sync::Arc;
use std::time::Duration;

use super::*;
use crate::engine::sim::SimBrowser;
use crate::error::ContextError;
use crate::stores::Stores;
use crate::vm::VmEngine;

fn manager_with(config: ManagerConfig) -> (Arc<ContextManager>, Arc<SimBrowser>) {
    let browser = SimBrowser::new();
    let manager = ContextManager::new(
        browser.clone(),
        Arc::new(VmEngine::with_session_key(7)),
        Arc::new(Stores::new()),
        config,
    );
    (manager, browser)
}

fn small_pool(max_contexts: usize, idle_ttl: Duration) -> ManagerConfig {
    ManagerConfig {
        max_contexts,
        idle_ttl,
        cleanup_interval: Duration::from_millis(20),
        shutdown_timeout: Duration::from_millis(200),
        ..ManagerConfig::default()
    }
}

#[tokio::test]
async fn test_create_assigns_monotonic_ids() {
    let (manager, _browser) = manager_with(ManagerConfig::default());
    let a = manager.create_context(ContextOptions::default()).await.unwrap();
    let b = manager.create_context(ContextOptions::default()).await.unwrap();
    assert_eq!(a, "ctx_1");
    assert_eq!(b, "ctx_2");
    assert_eq!(manager.list().await, vec!["ctx_1", "ctx_2"]);
}

#[tokio::test]
async fn test_create_fails_before_engine_ready() {
    let browser = SimBrowser::uninitialized();
    let manager = ContextManager::new(
        browser.clone(),
        Arc::new(VmEngine::new()),
        Arc::new(Stores::new()),
        ManagerConfig::default(),
    );
    assert!(matches!(
        manager.create_context(ContextOptions::default()).await,
        Err(ContextError::NotReady)
    ));
    browser.mark_ready();
    assert!(manager.create_context(ContextOptions::default()).await.is_ok());
}

#[tokio::test]
async fn test_lookup_of_missing_context() {
    let (manager, _browser) = manager_with(ManagerConfig::default());
    assert!(matches!(
        manager.get("ctx_99").await,
        Err(ContextError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_release_keeps_context_alive() {
    let (manager, _browser) = manager_with(ManagerConfig::default());
    let id = manager.create_context(ContextOptions::default()).await.unwrap();
    manager.release_context(&id).await.unwrap();
    let handle = manager.get(&id).await.unwrap();
    assert!(!handle.in_use());
    assert_eq!(manager.len().await, 1);
}

#[tokio::test]
async fn test_close_destroys_and_clears_caches() {
    let browser = SimBrowser::new();
    let vm = Arc::new(VmEngine::with_session_key(7));
    let stores = Arc::new(Stores::new());
    let manager = ContextManager::new(
        browser.clone(),
        vm.clone(),
        stores.clone(),
        ManagerConfig::default(),
    );
    let id = manager.create_context(ContextOptions::default()).await.unwrap();
    stores.console.push(&id, "log", "hello");
    assert!(vm.fingerprint(&id).is_some());

    manager.close_context(&id).await.unwrap();
    assert!(matches!(manager.get(&id).await, Err(ContextError::NotFound(_))));
    assert!(vm.fingerprint(&id).is_none());
    assert!(stores.console.read(&id).is_empty());
}

#[tokio::test]
async fn test_close_unknown_context() {
    let (manager, _browser) = manager_with(ManagerConfig::default());
    assert!(manager.close_context("ctx_9").await.is_err());
}

#[tokio::test]
async fn test_active_op_guard_pairs_increment_and_decrement() {
    let (manager, _browser) = manager_with(ManagerConfig::default());
    let id = manager.create_context(ContextOptions::default()).await.unwrap();
    let handle = manager.get(&id).await.unwrap();
    assert_eq!(handle.active_ops(), 0);
    {
        let _a = handle.begin_op();
        let _b = handle.begin_op();
        assert_eq!(handle.active_ops(), 2);
    }
    assert_eq!(handle.active_ops(), 0);
}

#[tokio::test]
async fn test_context_with_active_ops_is_not_evictable() {
    let (manager, _browser) = manager_with(small_pool(10, Duration::ZERO));
    let id = manager.create_context(ContextOptions::default()).await.unwrap();
    manager.release_context(&id).await.unwrap();
    let handle = manager.get(&id).await.unwrap();

    let _guard = handle.begin_op();
    manager.run_cleanup_pass().await;
    assert_eq!(manager.len().await, 1, "in-flight context must survive cleanup");
}

#[tokio::test]
async fn test_in_use_context_is_not_evictable() {
    let (manager, _browser) = manager_with(small_pool(10, Duration::ZERO));
    let _id = manager.create_context(ContextOptions::default()).await.unwrap();
    // Created contexts are in_use until released.
    manager.run_cleanup_pass().await;
    assert_eq!(manager.len().await, 1);
}

#[tokio::test]
async fn test_ttl_eviction_takes_least_recently_used() {
    let (manager, _browser) = manager_with(small_pool(10, Duration::from_millis(30)));
    let old = manager.create_context(ContextOptions::default()).await.unwrap();
    let newer = manager.create_context(ContextOptions::default()).await.unwrap();
    manager.release_context(&old).await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    manager.release_context(&newer).await.unwrap();

    manager.run_cleanup_pass().await;
    let remaining = manager.list().await;
    assert_eq!(remaining, vec![newer]);
    assert!(manager.get(&old).await.is_err());
}

#[tokio::test]
async fn test_capacity_eviction_on_create() {
    // max_contexts = 2, the first two released and idle past TTL.
    let (manager, _browser) = manager_with(small_pool(2, Duration::from_millis(10)));
    let first = manager.create_context(ContextOptions::default()).await.unwrap();
    let second = manager.create_context(ContextOptions::default()).await.unwrap();
    manager.release_context(&first).await.unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;
    manager.release_context(&second).await.unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;

    let third = manager.create_context(ContextOptions::default()).await.unwrap();
    let ids = manager.list().await;
    assert_eq!(ids.len(), 2);
    assert!(ids.contains(&third));
    assert!(!ids.contains(&first), "LRU idle context should be gone");
}

#[tokio::test]
async fn test_pool_exhausted_when_nothing_evictable() {
    let (manager, _browser) = manager_with(small_pool(1, Duration::from_secs(300)));
    let _busy = manager.create_context(ContextOptions::default()).await.unwrap();
    // The only context is in_use; creation must fail, not crash.
    assert!(matches!(
        manager.create_context(ContextOptions::default()).await,
        Err(ContextError::PoolExhausted(_))
    ));
    assert_eq!(manager.len().await, 1);
}

#[tokio::test]
async fn test_shutdown_refuses_new_contexts_and_drains() {
    let (manager, _browser) = manager_with(small_pool(10, Duration::from_secs(300)));
    manager.create_context(ContextOptions::default()).await.unwrap();
    manager.create_context(ContextOptions::default()).await.unwrap();

    manager.shutdown().await;
    assert!(manager.is_empty().await);
    assert!(matches!(
        manager.create_context(ContextOptions::default()).await,
        Err(ContextError::ShuttingDown)
    ));
}

#[tokio::test]
async fn test_cleanup_task_evicts_in_background() {
    let (manager, _browser) = manager_with(small_pool(10, Duration::from_millis(10)));
    let id = manager.create_context(ContextOptions::default()).await.unwrap();
    manager.release_context(&id).await.unwrap();
    manager.start_cleanup();

    tokio::time::sleep(Duration::from_millis(120)).await;
    assert!(manager.is_empty().await, "cleanup task should evict the idle context");
}

#[tokio::test]
async fn test_last_used_is_monotonic_per_context() {
    let (manager, _browser) = manager_with(ManagerConfig::default());
    let id = manager.create_context(ContextOptions::default()).await.unwrap();
    let handle = manager.get(&id).await.unwrap();
    let mut previous = handle.last_used_ms();
    for _ in 0..5 {
        tokio::time::sleep(Duration::from_millis(5)).await;
        handle.touch();
        let current = handle.last_used_ms();
        assert!(current >= previous);
        previous = current;
    }
}

#[tokio::test]
async fn test_per_context_fingerprint_is_stable() {
    let (manager, _browser) = manager_with(ManagerConfig::default());
    let id = manager.create_context(ContextOptions::default()).await.unwrap();
    let first = manager.get(&id).await.unwrap().fingerprint().clone();
    let second = manager.get(&id).await.unwrap().fingerprint().clone();
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_os_filter_flows_into_fingerprint() {
    let (manager, _browser) = manager_with(ManagerConfig::default());
    let id = manager
        .create_context(ContextOptions::builder().os_filter("macos").build())
        .await
        .unwrap();
    let handle = manager.get(&id).await.unwrap();
    assert_eq!(handle.fingerprint().vm.os.name, "macOS");
}
