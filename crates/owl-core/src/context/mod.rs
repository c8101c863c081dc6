//! # Browser Context Management
//!
//! A context is a logically isolated browsing session: its own page,
//! fingerprint, cookie jar, navigation state, and frame cache. The
//! [`manager::ContextManager`] owns the process-wide registry and enforces
//! pool size, memory caps, and idle-TTL eviction.
//!
//! Concurrency discipline:
//! - The registry is behind a reader-writer lock; lookups share, creation
//!   and destruction are exclusive.
//! - Each context has one operation mutex serializing browser-visible
//!   mutations.
//! - `active_ops` is an atomic counter guarded by [`ActiveOpGuard`] (RAII);
//!   a context with in-flight operations is never evicted.
//! - Eviction is two-phase: the victim is extracted under the registry
//!   lock, torn down outside it.

pub mod manager;
mod types;

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use crate::engine::PageEngine;
use crate::framecache::FrameCache;
use crate::nav::NavigationTracker;
use crate::vm::Fingerprint;

pub use manager::ContextManager;
pub use types::{
    ContextOptions, ContextOptionsBuilder, Cookie, LlmConfig, ManagerConfig, ProxyConfig, SameSite,
};

/// Video recording book-keeping for one context.
#[derive(Debug, Clone)]
pub struct RecordingState {
    pub path: String,
    pub started_at: DateTime<Utc>,
}

/// Live-stream book-keeping for one context. Encoding happens outside the
/// core; this only tracks whether the frame tap is on.
#[derive(Debug, Clone)]
pub struct StreamState {
    pub started_at: DateTime<Utc>,
}

/// One live context.
#[derive(Debug)]
pub struct ContextHandle {
    id: String,
    page: Arc<dyn PageEngine>,
    fingerprint: Fingerprint,
    options: ContextOptions,
    creation_index: u64,
    created_at: Instant,
    /// Shared epoch for the atomic `last_used` timestamp.
    epoch: Instant,
    last_used_ms: AtomicU64,
    in_use: AtomicBool,
    active_ops: AtomicU32,
    /// Serializes operations that mutate browser-visible state.
    op_lock: tokio::sync::Mutex<()>,
    nav: Mutex<NavigationTracker>,
    cookies: Mutex<Vec<Cookie>>,
    local_storage: Mutex<HashMap<String, HashMap<String, String>>>,
    proxy: Mutex<Option<ProxyConfig>>,
    frame_cache: FrameCache,
    video: Mutex<Option<RecordingState>>,
    stream: Mutex<Option<StreamState>>,
}

impl ContextHandle {
    pub(crate) fn new(
        id: String,
        page: Arc<dyn PageEngine>,
        fingerprint: Fingerprint,
        options: ContextOptions,
        creation_index: u64,
        epoch: Instant,
    ) -> Self {
        let proxy = options.proxy.clone();
        let handle = Self {
            id,
            page,
            fingerprint,
            options,
            creation_index,
            created_at: Instant::now(),
            epoch,
            last_used_ms: AtomicU64::new(0),
            in_use: AtomicBool::new(true),
            active_ops: AtomicU32::new(0),
            op_lock: tokio::sync::Mutex::new(()),
            nav: Mutex::new(NavigationTracker::new()),
            cookies: Mutex::new(Vec::new()),
            local_storage: Mutex::new(HashMap::new()),
            proxy: Mutex::new(proxy),
            frame_cache: FrameCache::new(),
            video: Mutex::new(None),
            stream: Mutex::new(None),
        };
        handle.touch();
        handle
    }

    /// Context id, form `ctx_<n>`.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The page backing this context.
    pub fn page(&self) -> &Arc<dyn PageEngine> {
        &self.page
    }

    /// The context's fingerprint.
    pub fn fingerprint(&self) -> &Fingerprint {
        &self.fingerprint
    }

    /// Creation options.
    pub fn options(&self) -> &ContextOptions {
        &self.options
    }

    /// Monotonic creation index (shutdown tears down in reverse order).
    pub fn creation_index(&self) -> u64 {
        self.creation_index
    }

    /// When the context was created.
    pub fn created_at(&self) -> Instant {
        self.created_at
    }

    /// Refresh `last_used_at`. Monotonic per context: the atomic only ever
    /// grows because the epoch clock does.
    pub fn touch(&self) {
        let now_ms = self.epoch.elapsed().as_millis() as u64;
        self.last_used_ms.fetch_max(now_ms, Ordering::Relaxed);
    }

    /// Time since the context was last used.
    pub fn idle_for(&self) -> Duration {
        let last = self.last_used_ms.load(Ordering::Relaxed);
        self.epoch.elapsed().saturating_sub(Duration::from_millis(last))
    }

    /// Milliseconds-since-epoch form of `last_used_at`, for LRU ordering.
    pub fn last_used_ms(&self) -> u64 {
        self.last_used_ms.load(Ordering::Relaxed)
    }

    /// Whether a caller currently holds the context.
    pub fn in_use(&self) -> bool {
        self.in_use.load(Ordering::Acquire)
    }

    /// Mark the context held. Returns false if it already was.
    pub fn mark_in_use(&self) -> bool {
        !self.in_use.swap(true, Ordering::AcqRel)
    }

    /// Release the context back to the pool.
    pub fn release(&self) {
        self.in_use.store(false, Ordering::Release);
        self.touch();
    }

    /// Current in-flight operation count.
    pub fn active_ops(&self) -> u32 {
        self.active_ops.load(Ordering::Acquire)
    }

    /// Begin an operation: bump `active_ops` and get the RAII guard.
    pub fn begin_op(self: &Arc<Self>) -> ActiveOpGuard {
        self.active_ops.fetch_add(1, Ordering::AcqRel);
        self.touch();
        ActiveOpGuard {
            handle: Arc::clone(self),
        }
    }

    /// Acquire the per-context operation mutex.
    pub async fn lock_ops(&self) -> tokio::sync::MutexGuard<'_, ()> {
        self.op_lock.lock().await
    }

    /// Whether the cleanup task may evict this context.
    pub fn evictable(&self, idle_ttl: Duration) -> bool {
        !self.in_use() && self.active_ops() == 0 && self.idle_for() > idle_ttl
    }

    /// The navigation tracker.
    pub fn nav(&self) -> &Mutex<NavigationTracker> {
        &self.nav
    }

    /// The cookie jar.
    pub fn cookies(&self) -> &Mutex<Vec<Cookie>> {
        &self.cookies
    }

    /// Local-storage capture (origin → key → value).
    pub fn local_storage(&self) -> &Mutex<HashMap<String, HashMap<String, String>>> {
        &self.local_storage
    }

    /// The proxy configuration.
    pub fn proxy(&self) -> &Mutex<Option<ProxyConfig>> {
        &self.proxy
    }

    /// The frozen-frame cache.
    pub fn frame_cache(&self) -> &FrameCache {
        &self.frame_cache
    }

    /// Video recording state.
    pub fn video(&self) -> &Mutex<Option<RecordingState>> {
        &self.video
    }

    /// Live-stream state.
    pub fn stream(&self) -> &Mutex<Option<StreamState>> {
        &self.stream
    }
}

/// RAII guard pairing every `active_ops` increment with its decrement.
pub struct ActiveOpGuard {
    handle: Arc<ContextHandle>,
}

impl Drop for ActiveOpGuard {
    fn drop(&mut self) {
        let previous = self.handle.active_ops.fetch_sub(1, Ordering::AcqRel);
        // An unpaired decrement is a real invariant violation, not an
        // expected failure.
        assert!(previous > 0, "active_ops underflow on {}", self.handle.id);
        self.handle.touch();
    }
}

#[cfg(test)]
mod tests;
