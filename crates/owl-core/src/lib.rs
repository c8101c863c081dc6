//! # Owl Core - Stealth Browser Control Core
//!
//! The control core of the Owl Browser automation engine: pooled browser
//! contexts, a deterministic fingerprint ("virtual machine") engine, an
//! action verifier, and the dispatcher behind the IPC command surface.
//!
//! ## Architecture
//!
//! - [`engine`] - The browser-engine contract. The renderer is a
//!   collaborator; the core only sees the [`engine::PageEngine`]
//!   primitives. [`engine::sim`] is the deterministic in-memory
//!   implementation used in tests.
//! - [`vm`] - Per-context synthetic device identity: seeds, hashes,
//!   template resolution, and the injection payload.
//! - [`context`] - The context registry: creation, pooled release,
//!   idle-TTL eviction, capacity pressure, drain-then-destroy shutdown.
//! - [`verify`] - Pre-action and post-action checks producing structured
//!   `ActionResult`s; selector grammar; the natural-language finder seam.
//! - [`nav`] - The navigation state machine fed by engine observations.
//! - [`detector`] - Data-driven captcha/firewall classification.
//! - [`stores`] - Per-context console/dialog/download/tab/network-rule
//!   stores.
//! - [`actions`] - The command dispatcher and the operation handlers.
//! - [`runtime`] - Dependency-injected assembly of all of the above.
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use owl_core::actions::Dispatcher;
//! use owl_core::engine::sim::SimBrowser;
//! use owl_core::runtime::Runtime;
//! use owl_wire::CommandEnvelope;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let engine = SimBrowser::new();
//! let runtime = Runtime::builder(engine).build();
//! let dispatcher = Dispatcher::new(runtime);
//!
//! let created = dispatcher
//!     .dispatch(&CommandEnvelope::new(1, "createContext"))
//!     .await?;
//! let ctx = created.as_context_id().unwrap().to_string();
//!
//! let result = dispatcher
//!     .dispatch(
//!         &CommandEnvelope::new(2, "navigate")
//!             .param("context_id", ctx)
//!             .param("url", "about:blank"),
//!     )
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod actions;
pub mod context;
pub mod detector;
pub mod engine;
pub mod error;
pub mod framecache;
pub mod nav;
pub mod profile;
pub mod runtime;
pub mod stores;
pub mod verify;
pub mod vm;

pub use actions::Dispatcher;
pub use context::{
    ContextHandle, ContextManager, ContextOptions, ContextOptionsBuilder, Cookie, LlmConfig,
    ManagerConfig, ProxyConfig, SameSite,
};
pub use detector::{Detection, DetectorRules};
pub use engine::{BrowserEngine, ElementSnapshot, MouseButton, NavSnapshot, PageEngine, Rect};
pub use error::{
    ContextError, CoreError, DispatchError, EngineError, ProfileError, VerifyError, VmError,
};
pub use framecache::FrameCache;
pub use nav::{NavigationInfo, NavigationState, NavigationTracker};
pub use profile::Profile;
pub use runtime::{Runtime, RuntimeBuilder};
pub use verify::{Finder, Selector, StaticFinder, VerificationLevel, Verifier};
pub use vm::{Fingerprint, FingerprintHashes, FingerprintSeeds, VirtualMachine, VmEngine, VmFilter};
