//! Profile persistence.
//!
//! A profile is a JSON document capturing everything needed to resurrect a
//! context's identity in a later run: fingerprint seeds, derived hashes,
//! the resolved VM, cookies, and local storage. The schema mirrors the
//! fingerprint data model exactly, so save → load round-trips.

use std::collections::HashMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::context::Cookie;
use crate::error::ProfileError;
use crate::vm::{FingerprintHashes, FingerprintSeeds, VirtualMachine};

/// The persisted profile document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub seeds: FingerprintSeeds,
    pub hashes: FingerprintHashes,
    pub resolved_vm: VirtualMachine,
    pub cookies: Vec<Cookie>,
    /// origin → key → value.
    pub local_storage: HashMap<String, HashMap<String, String>>,
    pub saved_at: DateTime<Utc>,
}

impl Profile {
    /// Write the profile to `path` as pretty-printed JSON.
    #[instrument(level = "debug", skip(self), fields(path = %path.as_ref().display()))]
    pub async fn save(&self, path: impl AsRef<Path>) -> Result<(), ProfileError> {
        let json = serde_json::to_vec_pretty(self)?;
        tokio::fs::write(path.as_ref(), json).await?;
        debug!("Profile saved");
        Ok(())
    }

    /// Read a profile from `path`.
    #[instrument(level = "debug", fields(path = %path.as_ref().display()))]
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, ProfileError> {
        let bytes = tokio::fs::read(path.as_ref()).await?;
        let profile: Self = serde_json::from_slice(&bytes)?;
        debug!(cookie_count = profile.cookies.len(), "Profile loaded");
        Ok(profile)
    }
}
