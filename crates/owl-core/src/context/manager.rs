//! The process-wide context registry.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

use tokio::sync::RwLock;
use tokio::time::sleep;
use tracing::{debug, info, instrument, warn};

use crate::engine::{BrowserEngine, PageOptions};
use crate::error::ContextError;
use crate::profile::Profile;
use crate::stores::Stores;
use crate::vm::{VmEngine, VmFilter, injection_payload};

use super::types::{ContextOptions, ManagerConfig};
use super::{ActiveOpGuard, ContextHandle};

/// Owns the registry of contexts; allocates, looks up, releases, and
/// evicts them under concurrent access while enforcing the global caps.
pub struct ContextManager {
    engine: Arc<dyn BrowserEngine>,
    vm: Arc<VmEngine>,
    stores: Arc<Stores>,
    config: ManagerConfig,
    registry: RwLock<HashMap<String, Arc<ContextHandle>>>,
    next_id: AtomicU64,
    accepting: AtomicBool,
    epoch: Instant,
    cleanup: parking_lot::Mutex<Option<tokio::task::JoinHandle<()>>>,
}

impl std::fmt::Debug for ContextManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContextManager")
            .field("accepting", &self.accepting.load(Ordering::Relaxed))
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl ContextManager {
    /// A manager over the given engine, VM engine, and stores.
    pub fn new(
        engine: Arc<dyn BrowserEngine>,
        vm: Arc<VmEngine>,
        stores: Arc<Stores>,
        config: ManagerConfig,
    ) -> Arc<Self> {
        Arc::new(Self {
            engine,
            vm,
            stores,
            config,
            registry: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            accepting: AtomicBool::new(true),
            epoch: Instant::now(),
            cleanup: parking_lot::Mutex::new(None),
        })
    }

    /// Start the background cleanup task. Idempotent.
    pub fn start_cleanup(self: &Arc<Self>) {
        let mut slot = self.cleanup.lock();
        if slot.is_some() {
            return;
        }
        let weak = Arc::downgrade(self);
        let interval = self.config.cleanup_interval;
        *slot = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let Some(manager) = weak.upgrade() else {
                    break;
                };
                manager.run_cleanup_pass().await;
            }
        }));
        debug!(interval_s = interval.as_secs(), "Cleanup task started");
    }

    /// The manager configuration.
    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    /// Whether the underlying engine is initialized.
    pub fn engine_ready(&self) -> bool {
        self.engine.is_ready()
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Create a new context.
    ///
    /// # Errors
    ///
    /// - [`ContextError::NotReady`] before the engine is initialized.
    /// - [`ContextError::ShuttingDown`] once shutdown began.
    /// - [`ContextError::PoolExhausted`] when caps are exceeded and no
    ///   context is evictable.
    #[instrument(level = "info", skip(self, options))]
    pub async fn create_context(&self, options: ContextOptions) -> Result<String, ContextError> {
        if !self.accepting.load(Ordering::Acquire) {
            return Err(ContextError::ShuttingDown);
        }
        if !self.engine.is_ready() {
            return Err(ContextError::NotReady);
        }

        self.make_room().await?;

        let serial = self.next_id.fetch_add(1, Ordering::Relaxed);
        let id = format!("ctx_{serial}");
        let filter = VmFilter {
            os: options.os_filter.clone(),
            gpu: options.gpu_filter.clone(),
        };

        // A persisted profile overrides seed generation before resolution.
        let mut restored = None;
        if let Some(path) = &options.profile_path {
            let profile = Profile::load(path).await?;
            self.vm
                .set_seeds(&id, profile.seeds, &filter)
                .map_err(|e| ContextError::CreateFailed(e.to_string()))?;
            restored = Some(profile);
        }

        let fingerprint = self
            .vm
            .get_or_create(&id, &filter)
            .map_err(|e| ContextError::CreateFailed(e.to_string()))?;

        let page_options = PageOptions {
            init_script: Some(injection_payload(&fingerprint)),
            proxy: options.proxy.as_ref().map(|p| p.server.clone()),
            block_resources: options.block_resources,
            viewport: (
                fingerprint.vm.screen.avail_width.min(1920),
                fingerprint.vm.screen.avail_height.min(1080),
            ),
        };
        let page = self.engine.create_page(&id, &page_options).await?;

        let handle = Arc::new(ContextHandle::new(
            id.clone(),
            page,
            fingerprint,
            options,
            serial,
            self.epoch,
        ));

        if let Some(profile) = restored {
            *handle.cookies().lock() = profile.cookies;
            *handle.local_storage().lock() = profile.local_storage;
        }

        self.registry.write().await.insert(id.clone(), handle);
        self.stores.tabs.init(&id, "about:blank");
        info!(context_id = %id, total = self.vm.len(), "Context created");
        Ok(id)
    }

    /// Mark a context released: reusable by later operations, eligible for
    /// eviction once idle past the TTL.
    pub async fn release_context(&self, id: &str) -> Result<(), ContextError> {
        let handle = self.get(id).await?;
        handle.release();
        debug!(context_id = %id, "Context released");
        Ok(())
    }

    /// Destroy a context now. Waits for in-flight operations to drain
    /// (bounded by the shutdown timeout), then tears down outside the
    /// registry lock.
    #[instrument(level = "info", skip(self))]
    pub async fn close_context(&self, id: &str) -> Result<(), ContextError> {
        // Phase one: extract under the exclusive lock.
        let handle = self
            .registry
            .write()
            .await
            .remove(id)
            .ok_or_else(|| ContextError::NotFound(id.to_string()))?;

        // Phase two: drain and tear down with no registry lock held.
        self.drain_handle(&handle).await;
        self.teardown(handle).await;
        Ok(())
    }

    /// Look up a context.
    ///
    /// # Errors
    ///
    /// [`ContextError::NotFound`] if the id does not resolve.
    pub async fn get(&self, id: &str) -> Result<Arc<ContextHandle>, ContextError> {
        self.registry
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| ContextError::NotFound(id.to_string()))
    }

    /// Resolve a context and begin an operation on it in one step.
    pub async fn begin_op(
        &self,
        id: &str,
    ) -> Result<(Arc<ContextHandle>, ActiveOpGuard), ContextError> {
        let handle = self.get(id).await?;
        let guard = handle.begin_op();
        Ok((handle, guard))
    }

    /// All live context ids, in creation order.
    pub async fn list(&self) -> Vec<String> {
        let registry = self.registry.read().await;
        let mut handles: Vec<_> = registry.values().collect();
        handles.sort_by_key(|h| h.creation_index());
        handles.iter().map(|h| h.id().to_string()).collect()
    }

    /// Number of live contexts.
    pub async fn len(&self) -> usize {
        self.registry.read().await.len()
    }

    /// Whether the registry is empty.
    pub async fn is_empty(&self) -> bool {
        self.registry.read().await.is_empty()
    }

    /// Advisory memory estimate across all contexts.
    pub async fn memory_estimate_mb(&self) -> u64 {
        self.len().await as u64 * self.config.estimated_context_mb
    }

    // =========================================================================
    // Eviction
    // =========================================================================

    /// Ensure capacity for one more context, evicting the LRU idle context
    /// if needed.
    async fn make_room(&self) -> Result<(), ContextError> {
        loop {
            let count = self.len().await;
            let over_count = count >= self.config.max_contexts;
            let over_memory = (count as u64 + 1) * self.config.estimated_context_mb
                > self.config.max_memory_mb;
            if !over_count && !over_memory {
                return Ok(());
            }
            // Capacity pressure ignores the idle TTL; any idle context is
            // fair game, least recently used first.
            match self.evict_one(Duration::ZERO).await {
                Some(evicted) => {
                    info!(context_id = %evicted, "Evicted context under capacity pressure");
                }
                None => {
                    return Err(ContextError::PoolExhausted(format!(
                        "{count} contexts live, none evictable"
                    )));
                }
            }
        }
    }

    /// Two-phase eviction of the least-recently-used eligible context.
    /// Returns the evicted id, or `None` if nothing is eligible.
    async fn evict_one(&self, idle_ttl: Duration) -> Option<String> {
        let handle = {
            let mut registry = self.registry.write().await;
            let victim_id = registry
                .values()
                .filter(|h| h.evictable(idle_ttl))
                .min_by_key(|h| h.last_used_ms())
                .map(|h| h.id().to_string())?;
            registry.remove(&victim_id)?
        };
        let id = handle.id().to_string();
        // Teardown happens outside the registry lock; it may dispatch to
        // the render thread and must not stall unrelated operations.
        self.teardown(handle).await;
        Some(id)
    }

    /// One pass of the background cleanup: TTL eviction, then memory
    /// pressure relief.
    pub async fn run_cleanup_pass(&self) {
        while let Some(id) = self.evict_one(self.config.idle_ttl).await {
            debug!(context_id = %id, "Evicted idle context past TTL");
        }
        while self.memory_estimate_mb().await > self.config.max_memory_mb {
            match self.evict_one(Duration::ZERO).await {
                Some(id) => debug!(context_id = %id, "Evicted context for memory pressure"),
                None => break,
            }
        }
    }

    // =========================================================================
    // Shutdown
    // =========================================================================

    /// Drain and destroy everything: stop the cleanup task, refuse new
    /// contexts, wait for in-flight operations (bounded), then tear down
    /// all contexts in reverse creation order.
    #[instrument(level = "info", skip(self))]
    pub async fn shutdown(&self) {
        self.accepting.store(false, Ordering::Release);
        if let Some(task) = self.cleanup.lock().take() {
            task.abort();
        }

        let deadline = Instant::now() + self.config.shutdown_timeout;
        loop {
            let active: u32 = {
                let registry = self.registry.read().await;
                registry.values().map(|h| h.active_ops()).sum()
            };
            if active == 0 {
                break;
            }
            if Instant::now() >= deadline {
                warn!(active, "Shutdown drain timed out with operations still active");
                break;
            }
            sleep(Duration::from_millis(10)).await;
        }

        let mut handles: Vec<_> = {
            let mut registry = self.registry.write().await;
            registry.drain().map(|(_, h)| h).collect()
        };
        handles.sort_by_key(|h| std::cmp::Reverse(h.creation_index()));
        for handle in handles {
            self.teardown(handle).await;
        }
        self.engine.shutdown().await;
        info!("Context manager shut down");
    }

    /// Wait for a single context's operations to drain, bounded.
    async fn drain_handle(&self, handle: &Arc<ContextHandle>) {
        let deadline = Instant::now() + self.config.shutdown_timeout;
        while handle.active_ops() > 0 {
            if Instant::now() >= deadline {
                warn!(
                    context_id = %handle.id(),
                    active = handle.active_ops(),
                    "Close drain timed out; destroying anyway"
                );
                break;
            }
            sleep(Duration::from_millis(10)).await;
        }
    }

    /// Release engine resources and sweep every per-context store entry.
    async fn teardown(&self, handle: Arc<ContextHandle>) {
        handle.page().close().await;
        self.vm.clear(handle.id());
        self.stores.clear_for_context(handle.id());
        debug!(context_id = %handle.id(), "Context destroyed");
    }
}
