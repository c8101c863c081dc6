//! # Virtual Machine Engine
//!
//! Produces and caches one [`Fingerprint`] per context id: seven 64-bit
//! seeds, nine derived hashes, and a fully resolved, internally consistent
//! [`VirtualMachine`] profile picked from the built-in template database.
//!
//! The engine is process-wide. Within a run, seeds derive deterministically
//! from a per-run session key and the context id — repeated calls for the
//! same context always return the same fingerprint. Across runs the session
//! key changes, so identities are unpredictable unless restored from a
//! persisted profile via [`VmEngine::set_seeds`].

mod inject;
mod seeds;
mod templates;
mod types;

use std::collections::HashMap;

use parking_lot::Mutex;
use rand::Rng;
use tracing::{debug, instrument};

use crate::error::VmError;

pub use inject::{GUARD_SYMBOL, injection_payload};
pub use seeds::{
    AUDIO_FINGERPRINT_MAX, AUDIO_FINGERPRINT_MIN, FingerprintHashes, FingerprintSeeds,
};
pub use templates::{VmFilter, VmTemplate, resolve, templates};
pub use types::{
    AudioProfile, BatteryProfile, BrowserProfile, CanvasProfile, ClientHints, CpuProfile,
    Fingerprint, GpuCapabilities, GpuProfile, LanguageProfile, MediaProfile, NetworkProfile,
    OsProfile, ScreenProfile, ShaderPrecision, StorageProfile, TimezoneProfile, VirtualMachine,
};

/// Process-wide fingerprint engine.
///
/// Critical sections are brief: the cache mutex only guards map access,
/// never template resolution for an already-cached entry.
#[derive(Debug)]
pub struct VmEngine {
    session_key: u64,
    cache: Mutex<HashMap<String, Fingerprint>>,
}

impl Default for VmEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl VmEngine {
    /// An engine with a random per-run session key.
    pub fn new() -> Self {
        Self::with_session_key(rand::thread_rng().r#gen())
    }

    /// An engine with a fixed session key (reproducible identities).
    pub fn with_session_key(session_key: u64) -> Self {
        Self {
            session_key,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Get the cached fingerprint for a context, generating one on first
    /// call. Idempotent: later calls return the identical fingerprint.
    ///
    /// # Errors
    ///
    /// Returns [`VmError::NoMatchingTemplate`] if the filters exclude every
    /// template.
    #[instrument(level = "debug", skip(self, filter))]
    pub fn get_or_create(
        &self,
        context_id: &str,
        filter: &VmFilter,
    ) -> Result<Fingerprint, VmError> {
        if let Some(existing) = self.cache.lock().get(context_id) {
            return Ok(existing.clone());
        }
        // Resolution happens outside the lock; a racing creator for the
        // same id derives identical seeds, so either insert wins.
        let seeds = FingerprintSeeds::derive(self.session_key, context_id);
        let fingerprint = Self::resolve_fingerprint(seeds, filter)?;
        debug!(context_id, template_gpu = %fingerprint.vm.gpu.unmasked_renderer, "Generated fingerprint");
        Ok(self
            .cache
            .lock()
            .entry(context_id.to_string())
            .or_insert(fingerprint)
            .clone())
    }

    /// Override seeds for a context (profile restore). Replaces any cached
    /// fingerprint; the VM is re-resolved from the supplied seeds.
    ///
    /// # Errors
    ///
    /// Returns [`VmError::InvalidSeeds`] for out-of-range seeds, or
    /// [`VmError::NoMatchingTemplate`] for unsatisfiable filters.
    #[instrument(level = "debug", skip(self, seeds, filter))]
    pub fn set_seeds(
        &self,
        context_id: &str,
        seeds: FingerprintSeeds,
        filter: &VmFilter,
    ) -> Result<Fingerprint, VmError> {
        seeds.validate()?;
        let fingerprint = Self::resolve_fingerprint(seeds, filter)?;
        self.cache
            .lock()
            .insert(context_id.to_string(), fingerprint.clone());
        debug!(context_id, "Installed fingerprint from persisted seeds");
        Ok(fingerprint)
    }

    /// The cached seeds for a context, if any.
    pub fn seeds(&self, context_id: &str) -> Option<FingerprintSeeds> {
        self.cache.lock().get(context_id).map(|fp| fp.seeds)
    }

    /// The cached fingerprint for a context, if any.
    pub fn fingerprint(&self, context_id: &str) -> Option<Fingerprint> {
        self.cache.lock().get(context_id).cloned()
    }

    /// Evict the cache entry for a destroyed context.
    pub fn clear(&self, context_id: &str) {
        self.cache.lock().remove(context_id);
    }

    /// Number of cached fingerprints.
    pub fn len(&self) -> usize {
        self.cache.lock().len()
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.cache.lock().is_empty()
    }

    fn resolve_fingerprint(
        seeds: FingerprintSeeds,
        filter: &VmFilter,
    ) -> Result<Fingerprint, VmError> {
        let vm = templates::resolve(&seeds, filter)?;
        Ok(Fingerprint {
            hashes: FingerprintHashes::derive(&seeds),
            seeds,
            vm,
        })
    }
}

#[cfg(test)]
mod tests;
