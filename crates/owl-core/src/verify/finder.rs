//! Natural-language element resolution.
//!
//! The finder is a pluggable collaborator: the production implementation is
//! backed by the LLM integration outside the core; [`StaticFinder`] is the
//! deterministic implementation used in tests and as a safe default.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::engine::PageEngine;
use crate::error::VerifyError;

/// Resolves a natural-language description to a CSS selector.
#[async_trait]
pub trait Finder: Send + Sync {
    /// Resolve `description` against the current page.
    ///
    /// # Errors
    ///
    /// Returns [`VerifyError::FinderUnresolved`] if no element matches the
    /// description.
    async fn resolve(
        &self,
        description: &str,
        page: &dyn PageEngine,
    ) -> Result<String, VerifyError>;
}

/// Deterministic finder over a fixed description → selector map.
#[derive(Debug, Default)]
pub struct StaticFinder {
    mappings: HashMap<String, String>,
}

impl StaticFinder {
    /// An empty finder; every resolution fails.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a mapping.
    pub fn with_mapping(mut self, description: &str, selector: &str) -> Self {
        self.mappings
            .insert(description.to_lowercase(), selector.to_string());
        self
    }
}

#[async_trait]
impl Finder for StaticFinder {
    async fn resolve(
        &self,
        description: &str,
        _page: &dyn PageEngine,
    ) -> Result<String, VerifyError> {
        self.mappings
            .get(&description.to_lowercase())
            .cloned()
            .ok_or_else(|| VerifyError::FinderUnresolved(description.to_string()))
    }
}
