//! Context configuration types.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Cookie SameSite attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum SameSite {
    Strict,
    Lax,
    None,
}

/// One cookie in a context's jar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cookie {
    pub name: String,
    pub value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Unix seconds; `None` for session cookies.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_only: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secure: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub same_site: Option<SameSite>,
}

impl Cookie {
    /// A session cookie with just a name and value.
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            domain: None,
            path: None,
            expires: None,
            http_only: None,
            secure: None,
            same_site: None,
        }
    }

    pub fn domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn secure(mut self, secure: bool) -> Self {
        self.secure = Some(secure);
        self
    }

    pub fn http_only(mut self, http_only: bool) -> Self {
        self.http_only = Some(http_only);
        self
    }

    pub fn same_site(mut self, same_site: SameSite) -> Self {
        self.same_site = Some(same_site);
        self
    }
}

/// Proxy configuration for a context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxyConfig {
    /// Proxy URL, e.g. "socks5://127.0.0.1:9050".
    pub server: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

/// LLM collaborator configuration; the client itself lives outside the core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Provider tag, e.g. "openai", "anthropic", "local".
    pub provider: String,
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
}

/// Options for `create_context`. All fields optional.
#[derive(Debug, Clone, Default)]
pub struct ContextOptions {
    pub llm: Option<LlmConfig>,
    pub proxy: Option<ProxyConfig>,
    /// Persisted fingerprint & cookies to restore.
    pub profile_path: Option<PathBuf>,
    pub block_resources: bool,
    /// OS filter for VM template selection.
    pub os_filter: Option<String>,
    /// GPU filter for VM template selection.
    pub gpu_filter: Option<String>,
}

impl ContextOptions {
    pub fn builder() -> ContextOptionsBuilder {
        ContextOptionsBuilder::default()
    }
}

/// Builder for [`ContextOptions`].
#[derive(Debug, Default)]
pub struct ContextOptionsBuilder {
    options: ContextOptions,
}

impl ContextOptionsBuilder {
    pub fn llm(mut self, llm: LlmConfig) -> Self {
        self.options.llm = Some(llm);
        self
    }

    pub fn proxy(mut self, proxy: ProxyConfig) -> Self {
        self.options.proxy = Some(proxy);
        self
    }

    pub fn profile_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.options.profile_path = Some(path.into());
        self
    }

    pub fn block_resources(mut self, block: bool) -> Self {
        self.options.block_resources = block;
        self
    }

    pub fn os_filter(mut self, os: impl Into<String>) -> Self {
        self.options.os_filter = Some(os.into());
        self
    }

    pub fn gpu_filter(mut self, gpu: impl Into<String>) -> Self {
        self.options.gpu_filter = Some(gpu.into());
        self
    }

    pub fn build(self) -> ContextOptions {
        self.options
    }
}

/// Context manager caps and timings.
#[derive(Debug, Clone)]
pub struct ManagerConfig {
    /// Hard cap on live contexts.
    pub max_contexts: usize,
    /// Advisory memory cap across all contexts.
    pub max_memory_mb: u64,
    /// Fixed advisory per-context estimate.
    pub estimated_context_mb: u64,
    /// Idle time before a released context becomes evictable.
    pub idle_ttl: Duration,
    /// Cleanup task wake interval.
    pub cleanup_interval: Duration,
    /// Bound on waiting for in-flight operations at close/shutdown.
    pub shutdown_timeout: Duration,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            max_contexts: 1000,
            max_memory_mb: 32 * 1024,
            estimated_context_mb: 150,
            idle_ttl: Duration::from_secs(120),
            cleanup_interval: Duration::from_secs(30),
            shutdown_timeout: Duration::from_secs(30),
        }
    }
}
